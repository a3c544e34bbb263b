//! Round observers and the console board dump

use super::context::SimContext;
use super::game_state::GameState;
use super::grid;
use super::types::Position;

/// Hooks called by the simulator as a round progresses
///
/// Every method has an empty default, so an observer only overrides what it
/// needs. Observers get read-only snapshots and cannot influence the run.
pub trait IterationObserver {
    fn round_started(&mut self, _round_id: usize, _game: &GameState) {}

    fn iteration_finished(&mut self, _round_id: usize, _iteration_id: usize, _game: &GameState) {}

    fn round_finished(&mut self, _round_id: usize, _game: &GameState) {}
}

/// Prints the queue length of every cell to stdout when verbosity is 2 or more
pub struct ConsoleRenderer {
    verbosity: u8,
}

impl ConsoleRenderer {
    pub fn new(ctx: &SimContext) -> Self {
        Self {
            verbosity: ctx.verbosity(),
        }
    }

    fn enabled(&self) -> bool {
        self.verbosity >= 2
    }

    fn draw(&self, round_id: usize, iteration_id: usize, game: &GameState) {
        if self.enabled() {
            println!("State: round={} iteration={}", round_id, iteration_id);
            print!("{}", render_board(game));
        }
    }
}

impl IterationObserver for ConsoleRenderer {
    fn round_started(&mut self, round_id: usize, game: &GameState) {
        self.draw(round_id, 0, game);
    }

    fn iteration_finished(&mut self, round_id: usize, iteration_id: usize, game: &GameState) {
        self.draw(round_id, iteration_id, game);
    }

    fn round_finished(&mut self, round_id: usize, game: &GameState) {
        self.draw(round_id, game.iteration(), game);
    }
}

/// ASCII map of queue lengths with the flow direction of every street
///
/// Off-road cells are blank and empty road cells are `.`. Arrows on the
/// margins show which way each street flows.
pub fn render_board(game: &GameState) -> String {
    let board = game.board();
    let (width, height) = (board.width(), board.height());
    let mut out = String::new();

    out.push_str("  ");
    for x in 0..width {
        out.push_str(if x % 4 == 3 { "^ " } else { "  " });
    }
    out.push('\n');

    for y in 0..height {
        out.push_str(if y % 4 == 3 { "<-" } else { "  " });
        for x in 0..width {
            let position = Position::new(x, y);
            let count = board.queue_len(position);
            if !grid::is_road(position) {
                out.push(' ');
            } else if count == 0 {
                out.push('.');
            } else if count < 10 {
                out.push_str(&count.to_string());
            } else {
                out.push('+');
            }
            out.push(' ');
        }
        out.push_str(if y % 4 == 1 { "->" } else { "  " });
        out.push('\n');
    }

    out.push_str("  ");
    for x in 0..width {
        out.push_str(if x % 4 == 1 { "v " } else { "  " });
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_follows_context_verbosity() {
        assert!(!ConsoleRenderer::new(&SimContext::new(Some(1), 1)).enabled());
        assert!(ConsoleRenderer::new(&SimContext::new(Some(1), 2)).enabled());
    }
}
