//! Bounded lookahead over simulated futures
//!
//! To price letting a queue go first, the neighbourhood a `horizon`-step
//! simulation can touch is copied into a throwaway game state driven by a
//! neutral random protocol. The candidate's head car is forced through on the
//! first step; whenever it meets another non-empty queue later on, both
//! resolutions are priced recursively with the remaining horizon and the
//! cheaper one is forced. Nothing is memoized.

use std::cmp::Ordering;

use log::trace;
use ordered_float::OrderedFloat;

use super::Protocol;
use crate::simulation::context::SimContext;
use crate::simulation::error::{Result, SimError};
use crate::simulation::game_state::{Forced, GameState};
use crate::simulation::grid;
use crate::simulation::types::Position;

/// Lets through whichever side has the lower estimated cost; ties go to a coin flip
pub(super) fn resolve(
    position_0: Position,
    position_1: Position,
    game: &GameState,
    horizon: usize,
    ctx: &mut SimContext,
) -> Result<Position> {
    let cost_0 = externality(game, horizon, position_0, ctx)?;
    let cost_1 = externality(game, horizon, position_1, ctx)?;
    trace!(
        "lookahead({}): {} costs {:.2}, {} costs {:.2}",
        horizon,
        position_0,
        cost_0,
        position_1,
        cost_1
    );

    Ok(match OrderedFloat(cost_0).cmp(&OrderedFloat(cost_1)) {
        Ordering::Less => position_0,
        Ordering::Greater => position_1,
        Ordering::Equal if ctx.coin_flip() => position_0,
        Ordering::Equal => position_1,
    })
}

/// Estimated cost imposed on everyone else by letting `position` go first
pub(super) fn externality(game: &GameState, horizon: usize, position: Position, ctx: &mut SimContext) -> Result<f64> {
    let mut copy = game.neighborhood_copy(position, horizon)?;
    let mut neutral = Protocol::neutral(game.high_cost());

    let focal = copy.head_slot(position).ok_or(SimError::EmptyQueue(position))?;
    if copy.car(focal).has_arrived() {
        return Ok(0.0);
    }

    let mut cost = grid::competing_position(position).map_or(0.0, |rival| copy.queue_cost(rival));
    let own_queue_cost = copy.queue_cost(position);

    let mut forced = Some(Forced::Win(position));
    for iteration in 0..horizon {
        copy.step(&mut neutral, ctx, forced.take())?;

        let car = copy.car(focal);
        if car.has_arrived() {
            break;
        }
        let here = car.position;

        // Stuck behind another car: the whole queue keeps paying
        if copy.head_slot(here) != Some(focal) {
            cost += own_queue_cost;
            continue;
        }
        if grid::is_intersection(here) {
            continue;
        }
        let Some(rival) = grid::competing_position(here) else {
            continue;
        };
        if copy.queue_len(rival) == 0 {
            continue;
        }

        let rival_cost = copy.queue_cost(rival);
        cost += rival_cost;

        let remaining = horizon - iteration - 1;
        let proceed = externality(&copy, remaining, here, ctx)?;
        let give_way = externality(&copy, remaining, rival, ctx)?;
        let yields = match OrderedFloat(proceed).cmp(&OrderedFloat(give_way)) {
            Ordering::Greater => true,
            Ordering::Equal => ctx.coin_flip(),
            Ordering::Less => false,
        };

        if yields {
            forced = Some(Forced::Lose(here));
        } else {
            forced = Some(Forced::Win(here));
            cost += rival_cost;
        }
    }

    Ok(cost)
}
