//! Conflict-resolution protocols
//!
//! A protocol decides which of the (at most two) queues feeding a cell gets
//! to move, and keeps a reward ledger per car that persists across rounds.
//! Mechanisms are a closed set, so they are dispatched through an enum.

mod button;
mod ledger;
mod lookahead;

use std::cmp::Ordering;
use std::fmt;

use log::trace;
use ordered_float::OrderedFloat;

use super::config::{ProtocolKind, SimConfig, VALUATION_HORIZON};
use super::context::SimContext;
use super::error::Result;
use super::game_state::GameState;
use super::types::{side_valuation, Bid, CarId, Position};

pub use button::ButtonState;
pub use ledger::RewardLedger;

/// The bids on each side of one conflict
#[derive(Debug, Clone, Copy)]
pub struct Conflict<'a> {
    pub position_0: Position,
    pub actions_0: &'a [Bid],
    /// `None` when every contender waits in the same queue
    pub position_1: Option<Position>,
    pub actions_1: &'a [Bid],
}

impl<'a> Conflict<'a> {
    pub fn involves(&self, position: Position) -> bool {
        position == self.position_0 || Some(position) == self.position_1
    }

    /// The side facing `position`, if there is one
    pub fn opponent(&self, position: Position) -> Option<Position> {
        if position == self.position_0 {
            self.position_1
        } else {
            Some(self.position_0)
        }
    }

    /// The side that wins without contest, if only one side is populated
    pub fn uncontested(&self) -> Option<Position> {
        let Some(position_1) = self.position_1 else {
            return Some(self.position_0);
        };
        match (self.actions_0.is_empty(), self.actions_1.is_empty()) {
            (false, true) => Some(self.position_0),
            (true, false) => Some(position_1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Mechanism {
    Random,
    Vcg,
    Button(ButtonState),
    Optimal { horizon: usize },
    OptimalRandom { horizon: usize, optimal_probability: f64 },
}

#[derive(Debug, Clone)]
pub struct Protocol {
    kind: ProtocolKind,
    mechanism: Mechanism,
    ledger: RewardLedger,
    unlimited_reward: bool,
    high_cost: f64,
}

impl Protocol {
    /// Builds the configured protocol with a ledger account for every car
    pub fn new(config: &SimConfig, ctx: &mut SimContext) -> Result<Self> {
        config.validate()?;
        let forced = config.force_unlimited_reward;
        let (mechanism, ledger, unlimited_reward) = match config.protocol {
            ProtocolKind::Random => (
                Mechanism::Random,
                RewardLedger::new(config.num_cars, 0.0),
                true,
            ),
            ProtocolKind::Vcg => (
                Mechanism::Vcg,
                RewardLedger::new(config.num_cars, 0.0),
                forced,
            ),
            ProtocolKind::Button => {
                let state = ButtonState::new(config.high_priority_probability, config.button_horizon);
                let ledger = state.seed_counters(config.num_cars, ctx);
                (Mechanism::Button(state), ledger, forced)
            }
            ProtocolKind::Optimal(horizon) => (
                Mechanism::Optimal { horizon },
                RewardLedger::new(config.num_cars, 0.0),
                true,
            ),
            ProtocolKind::OptimalRandom => (
                Mechanism::OptimalRandom {
                    horizon: VALUATION_HORIZON,
                    optimal_probability: config.optimal_probability,
                },
                RewardLedger::new(config.num_cars, 0.0),
                true,
            ),
        };

        Ok(Self {
            kind: config.protocol,
            mechanism,
            ledger,
            unlimited_reward,
            high_cost: config.high_cost,
        })
    }

    /// Random protocol with an empty ledger, used inside lookahead copies
    pub fn neutral(high_cost: f64) -> Self {
        Self {
            kind: ProtocolKind::Random,
            mechanism: Mechanism::Random,
            ledger: RewardLedger::empty(0.0),
            unlimited_reward: true,
            high_cost,
        }
    }

    /// Button state, when this is the Button protocol
    pub fn button(&self) -> Option<&ButtonState> {
        match &self.mechanism {
            Mechanism::Button(state) => Some(state),
            _ => None,
        }
    }

    /// Whether actions are fixed once per round instead of elicited per conflict
    pub fn fixed_actions_per_round(&self) -> bool {
        matches!(self.mechanism, Mechanism::Button(_))
    }

    pub fn init_round(&mut self, round_id: usize) {
        if let Mechanism::Button(state) = &mut self.mechanism {
            state.init_round(round_id, &mut self.ledger);
        }
    }

    pub fn set_car_round_action(&mut self, car_id: CarId, action: Bid) -> Result<()> {
        match &mut self.mechanism {
            Mechanism::Button(state) => state.set_round_action(&mut self.ledger, car_id, action),
            _ => Ok(()),
        }
    }

    /// The action fixed for this round; only meaningful in fixed-action mode
    pub fn car_round_action(&self, car_id: CarId) -> Result<Bid> {
        match &self.mechanism {
            Mechanism::Button(state) => state.round_action(car_id),
            _ => Ok(Bid::Low),
        }
    }

    /// True if the car has enough reward to bid high
    pub fn can_bid_high(&self, car_id: CarId) -> Result<bool> {
        if self.unlimited_reward {
            return Ok(true);
        }
        Ok(self.ledger.get(car_id)? > 0.0)
    }

    pub fn car_reward(&self, car_id: CarId) -> Result<f64> {
        self.ledger.get(car_id)
    }

    /// Reward summed over car ids `0..num_cars`
    pub fn total_reward(&self, num_cars: usize) -> f64 {
        self.ledger.total(num_cars)
    }

    /// Picks the position whose head car proceeds
    pub fn win_position(&self, conflict: &Conflict<'_>, game: &GameState, ctx: &mut SimContext) -> Result<Position> {
        let winner = match &self.mechanism {
            Mechanism::Random => Self::random_win_position(conflict, ctx),
            Mechanism::Vcg => self.optimal_win_position(conflict, game, VALUATION_HORIZON, ctx)?,
            Mechanism::Button(state) => self.optimal_win_position(conflict, game, state.horizon(), ctx)?,
            Mechanism::Optimal { horizon } => self.optimal_win_position(conflict, game, *horizon, ctx)?,
            Mechanism::OptimalRandom {
                horizon,
                optimal_probability,
            } => match conflict.uncontested() {
                Some(position) => position,
                None if ctx.chance(*optimal_probability) => {
                    self.optimal_win_position(conflict, game, *horizon, ctx)?
                }
                None => Self::random_win_position(conflict, ctx),
            },
        };
        trace!(
            "{}: {} ({} bids) vs {:?} ({} bids) -> {}",
            self.kind,
            conflict.position_0,
            conflict.actions_0.len(),
            conflict.position_1,
            conflict.actions_1.len(),
            winner
        );
        Ok(winner)
    }

    fn random_win_position(conflict: &Conflict<'_>, ctx: &mut SimContext) -> Position {
        if let Some(position) = conflict.uncontested() {
            return position;
        }
        match conflict.position_1 {
            Some(position_1) if !ctx.coin_flip() => position_1,
            _ => conflict.position_0,
        }
    }

    fn optimal_win_position(
        &self,
        conflict: &Conflict<'_>,
        game: &GameState,
        horizon: usize,
        ctx: &mut SimContext,
    ) -> Result<Position> {
        let Some(position_1) = conflict.position_1 else {
            return Ok(conflict.position_0);
        };

        if horizon != VALUATION_HORIZON {
            return lookahead::resolve(conflict.position_0, position_1, game, horizon, ctx);
        }

        // Higher total valuation wins
        let bids_0 = side_valuation(conflict.actions_0, self.high_cost);
        let bids_1 = side_valuation(conflict.actions_1, self.high_cost);
        Ok(match OrderedFloat(bids_0).cmp(&OrderedFloat(bids_1)) {
            Ordering::Greater => conflict.position_0,
            Ordering::Less => position_1,
            Ordering::Equal if ctx.coin_flip() => conflict.position_0,
            Ordering::Equal => position_1,
        })
    }

    /// Settles the reward of one contender once the conflict is resolved
    ///
    /// Returns the reward attributed for this conflict (Button reports the
    /// car's current balance, since it only changes between rounds).
    pub fn update_car_reward(
        &mut self,
        car_id: CarId,
        position: Position,
        win_position: Position,
        action: Bid,
        conflict: &Conflict<'_>,
    ) -> Result<f64> {
        match &self.mechanism {
            Mechanism::Vcg => {
                if conflict.position_1.is_none() {
                    return Ok(0.0);
                }
                let reward = self.vcg_reward(position, win_position, action, conflict);
                self.ledger.credit(car_id, reward)?;
                Ok(reward)
            }
            Mechanism::Button(_) => self.ledger.get(car_id),
            Mechanism::Random | Mechanism::Optimal { .. } | Mechanism::OptimalRandom { .. } => Ok(0.0),
        }
    }

    /// Negative of the externality the car's presence and bid imposed on the
    /// rest of the conflict
    fn vcg_reward(&self, position: Position, win_position: Position, action: Bid, conflict: &Conflict<'_>) -> f64 {
        let bids_0 = side_valuation(conflict.actions_0, self.high_cost);
        let bids_1 = side_valuation(conflict.actions_1, self.high_cost);
        let (own, other) = if position == conflict.position_0 {
            (bids_0, bids_1)
        } else {
            (bids_1, bids_0)
        };
        let car_value = action.valuation(self.high_cost);

        let utility_without_car = (other - (own - car_value)).abs();
        let mut utility_with_car = (other - own).abs();
        if position == win_position {
            utility_with_car -= car_value;
        } else {
            utility_with_car += car_value;
        }

        utility_with_car - utility_without_car
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}
