//! Per-car reward accounts kept by a protocol for its whole lifetime

use std::collections::BTreeMap;

use crate::simulation::error::{Result, SimError};
use crate::simulation::types::CarId;

#[derive(Debug, Clone, Default)]
pub struct RewardLedger {
    rewards: BTreeMap<CarId, f64>,
    initial: f64,
}

impl RewardLedger {
    /// Ledger with an account at `initial` for car ids `0..num_cars`
    pub fn new(num_cars: usize, initial: f64) -> Self {
        let rewards = (0..num_cars).map(|id| (CarId(id), initial)).collect();
        Self { rewards, initial }
    }

    pub fn from_balances(balances: impl IntoIterator<Item = (CarId, f64)>, initial: f64) -> Self {
        Self {
            rewards: balances.into_iter().collect(),
            initial,
        }
    }

    /// Ledger with no registered accounts
    pub fn empty(initial: f64) -> Self {
        Self {
            rewards: BTreeMap::new(),
            initial,
        }
    }

    pub fn get(&self, car_id: CarId) -> Result<f64> {
        self.rewards
            .get(&car_id)
            .copied()
            .ok_or(SimError::UnregisteredCar(car_id))
    }

    pub fn set(&mut self, car_id: CarId, value: f64) -> Result<()> {
        let reward = self
            .rewards
            .get_mut(&car_id)
            .ok_or(SimError::UnregisteredCar(car_id))?;
        *reward = value;
        Ok(())
    }

    /// Adds `delta` to one account and returns the new balance
    pub fn credit(&mut self, car_id: CarId, delta: f64) -> Result<f64> {
        let reward = self
            .rewards
            .get_mut(&car_id)
            .ok_or(SimError::UnregisteredCar(car_id))?;
        *reward += delta;
        Ok(*reward)
    }

    pub fn credit_all(&mut self, delta: f64) {
        for reward in self.rewards.values_mut() {
            *reward += delta;
        }
    }

    /// Sum over ids `0..num_cars`, counting unseen ids at the initial value
    pub fn total(&self, num_cars: usize) -> f64 {
        (0..num_cars)
            .map(|id| self.rewards.get(&CarId(id)).copied().unwrap_or(self.initial))
            .sum()
    }
}
