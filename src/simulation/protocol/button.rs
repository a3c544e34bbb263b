//! Cooldown-gated escalation ("button")
//!
//! Each car picks one action per round. Pressing the button (bidding high)
//! resets the car's counter to `-(latency - 1)`; every round adds one, and the
//! car may press again once the counter is positive.

use std::collections::HashMap;

use log::debug;

use super::ledger::RewardLedger;
use crate::simulation::context::SimContext;
use crate::simulation::error::{Result, SimError};
use crate::simulation::types::{Bid, CarId};

#[derive(Debug, Clone)]
pub struct ButtonState {
    latency: i64,
    horizon: usize,
    round_actions: HashMap<CarId, Bid>,
}

impl ButtonState {
    pub fn new(high_priority_probability: f64, horizon: usize) -> Self {
        let latency = (1.0 / high_priority_probability).round().max(1.0) as i64;
        Self {
            latency,
            horizon,
            round_actions: HashMap::new(),
        }
    }

    /// Rounds a car waits after pressing before it may press again
    pub fn latency(&self) -> i64 {
        self.latency
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    fn reset_value(&self) -> f64 {
        (1 - self.latency) as f64
    }

    /// Starts every counter at a random point of its cooldown cycle
    ///
    /// Whether the randomized start is meant to model cars joining mid-stream
    /// is unverified.
    pub fn seed_counters(&self, num_cars: usize, ctx: &mut SimContext) -> RewardLedger {
        let balances = (0..num_cars)
            .map(|id| (CarId(id), ctx.range_inclusive(1 - self.latency, 1) as f64))
            .collect::<Vec<_>>();
        RewardLedger::from_balances(balances, 0.0)
    }

    pub fn init_round(&mut self, round_id: usize, ledger: &mut RewardLedger) {
        debug!("button: starting round {} (latency {})", round_id, self.latency);
        self.round_actions.clear();
        ledger.credit_all(1.0);
    }

    pub fn set_round_action(&mut self, ledger: &mut RewardLedger, car_id: CarId, bid: Bid) -> Result<()> {
        if bid == Bid::High {
            ledger.set(car_id, self.reset_value())?;
        }
        self.round_actions.insert(car_id, bid);
        Ok(())
    }

    pub fn round_action(&self, car_id: CarId) -> Result<Bid> {
        self.round_actions
            .get(&car_id)
            .copied()
            .ok_or(SimError::MissingRoundAction(car_id))
    }
}
