//! Simulation parameters
//!
//! Everything the simulator needs before a run starts. Invalid values are
//! rejected here so the core never sees them.

use std::fmt;
use std::str::FromStr;

use super::car::CarKind;
use super::error::{Result, SimError};

/// Default cost per iteration of a high-priority car
pub const DEFAULT_HIGH_COST: f64 = 3.0;

/// Default probability that a trip is high priority
pub const DEFAULT_HIGH_PRIORITY_PROBABILITY: f64 = 0.1;

/// Probability with which OptimalRandom uses the optimal resolution
pub const DEFAULT_OPTIMAL_PROBABILITY: f64 = 0.5;

/// Horizon at which lookahead resolution is the plain bid-valuation rule
pub const VALUATION_HORIZON: usize = 1;

/// Which conflict-resolution mechanism to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    Random,
    Vcg,
    Button,
    /// Lookahead resolution with the given horizon (1 is the greedy valuation)
    Optimal(usize),
    OptimalRandom,
}

impl FromStr for ProtocolKind {
    type Err = SimError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.to_ascii_lowercase();
        match name.as_str() {
            "random" => Ok(ProtocolKind::Random),
            "vcg" => Ok(ProtocolKind::Vcg),
            "button" => Ok(ProtocolKind::Button),
            "greedy" | "optimal" => Ok(ProtocolKind::Optimal(VALUATION_HORIZON)),
            "greedy_random" | "optimal_random" => Ok(ProtocolKind::OptimalRandom),
            _ => name
                .strip_prefix("generalized_greedy_")
                .and_then(|horizon| horizon.parse().ok())
                .map(ProtocolKind::Optimal)
                .ok_or_else(|| SimError::UnknownProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Random => f.write_str("random"),
            ProtocolKind::Vcg => f.write_str("vcg"),
            ProtocolKind::Button => f.write_str("button"),
            ProtocolKind::Optimal(VALUATION_HORIZON) => f.write_str("greedy"),
            ProtocolKind::Optimal(horizon) => write!(f, "greedy_externality_{}", horizon),
            ProtocolKind::OptimalRandom => f.write_str("greedy_random"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub protocol: ProtocolKind,
    pub car_kind: CarKind,
    /// Kind of the focal car (id `num_cars - 1`), if one is tracked
    pub my_car_kind: Option<CarKind>,
    pub num_cars: usize,
    /// Number of streets in each axis; the board is `2 * num_roads + 1` wide
    pub num_roads: usize,
    pub num_rounds: usize,
    /// Cost per iteration of a high-priority car (low-priority cars cost 1)
    pub high_cost: f64,
    pub high_priority_probability: f64,
    /// Let every car escalate regardless of its reward balance
    pub force_unlimited_reward: bool,
    /// Horizon the Button protocol resolves conflicts with
    pub button_horizon: usize,
    pub optimal_probability: f64,
    pub seed: Option<u64>,
    pub verbosity: u8,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolKind::Random,
            car_kind: CarKind::Truthful,
            my_car_kind: None,
            num_cars: 100,
            num_roads: 5,
            num_rounds: 10,
            high_cost: DEFAULT_HIGH_COST,
            high_priority_probability: DEFAULT_HIGH_PRIORITY_PROBABILITY,
            force_unlimited_reward: false,
            button_horizon: VALUATION_HORIZON,
            optimal_probability: DEFAULT_OPTIMAL_PROBABILITY,
            seed: None,
            verbosity: 0,
        }
    }
}

impl SimConfig {
    pub fn width(&self) -> i32 {
        (self.num_roads * 2 + 1) as i32
    }

    pub fn height(&self) -> i32 {
        self.width()
    }

    /// Car id of the focal car, if one is configured
    pub fn my_car_id(&self) -> Option<usize> {
        match (self.my_car_kind, self.num_cars) {
            (Some(_), n) if n > 0 => Some(n - 1),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_roads == 0 {
            return Err(SimError::InvalidParameter(
                "num_roads must be at least 1".to_string(),
            ));
        }
        if !(self.high_cost >= 1.0) {
            return Err(SimError::InvalidParameter(format!(
                "high_cost must be at least 1.0, got {}",
                self.high_cost
            )));
        }
        if !(0.0..=1.0).contains(&self.high_priority_probability) {
            return Err(SimError::InvalidParameter(format!(
                "high_priority_probability must be in [0, 1], got {}",
                self.high_priority_probability
            )));
        }
        if self.protocol == ProtocolKind::Button && self.high_priority_probability <= 0.0 {
            return Err(SimError::InvalidParameter(
                "button protocol needs a positive high_priority_probability".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.optimal_probability) {
            return Err(SimError::InvalidParameter(format!(
                "optimal_probability must be in [0, 1], got {}",
                self.optimal_probability
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SimConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "protocol={} car={} my_car={} num_cars={} num_roads={} num_rounds={} high_cost={} high_priority_probability={}",
            self.protocol,
            self.car_kind,
            self.my_car_kind
                .map_or_else(|| "none".to_string(), |kind| kind.to_string()),
            self.num_cars,
            self.num_roads,
            self.num_rounds,
            self.high_cost,
            self.high_priority_probability
        )
    }
}
