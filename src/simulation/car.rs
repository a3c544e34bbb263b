//! Car trip state and bidding strategies
//!
//! A car is created once per simulation and handed a fresh trip every round.
//! The reward ledger lives in the protocol, so a car never holds a reference
//! back to it; eligibility is passed in when a bid is requested.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use super::context::SimContext;
use super::error::{Result, SimError};
use super::types::{Bid, CarId, Direction, Leg, Position, Priority, Trip};

/// Bidding strategy of a car
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarKind {
    /// Escalates with a fair coin whenever eligible
    Random,
    /// Reports its own priority
    Truthful,
    /// Always escalates when eligible
    Aggressive,
    /// Escalates when high priority or when its own queue is outnumbered
    StatisticallyAggressive,
}

impl FromStr for CarKind {
    type Err = SimError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(CarKind::Random),
            "truthful" => Ok(CarKind::Truthful),
            "aggressive" => Ok(CarKind::Aggressive),
            "statistically_aggressive" => Ok(CarKind::StatisticallyAggressive),
            other => Err(SimError::UnknownCarKind(other.to_string())),
        }
    }
}

impl fmt::Display for CarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CarKind::Random => "random",
            CarKind::Truthful => "truthful",
            CarKind::Aggressive => "aggressive",
            CarKind::StatisticallyAggressive => "statistically_aggressive",
        };
        f.write_str(name)
    }
}

/// What a car is told about the conflict it is bidding in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConflictView {
    pub position_0: Position,
    pub count_0: usize,
    pub position_1: Option<Position>,
    pub count_1: usize,
}

impl ConflictView {
    /// A conflict with no opposing queue (used for per-round actions)
    pub fn solo(position: Position) -> Self {
        Self {
            position_0: position,
            count_0: 1,
            position_1: None,
            count_1: 0,
        }
    }
}

/// A car in the simulation
#[derive(Debug, Clone)]
pub struct SimCar {
    pub id: CarId,
    pub kind: CarKind,
    pub priority: Priority,
    pub position: Position,
    pub destination: Position,
    pub route: VecDeque<Leg>,
    /// Direction of the leg currently being driven
    pub direction: Option<Direction>,
}

impl SimCar {
    pub fn new(id: CarId, kind: CarKind) -> Self {
        Self {
            id,
            kind,
            priority: Priority::Low,
            position: Position::default(),
            destination: Position::default(),
            route: VecDeque::new(),
            direction: None,
        }
    }

    /// Resets all trip state for a new round
    pub fn init_trip(&mut self, trip: Trip) {
        self.position = trip.origin;
        self.destination = trip.destination;
        self.route = trip.route.into_iter().collect();
        self.priority = trip.priority;
        self.direction = self.route.front().map(|leg| leg.direction);
    }

    pub fn has_arrived(&self) -> bool {
        self.position == self.destination
    }

    /// Cost this car accrues per iteration while traveling
    pub fn cost(&self, high_cost: f64) -> f64 {
        self.priority.cost(high_cost)
    }

    /// Cost of driving straight to the destination without ever waiting
    pub fn lower_bound_cost(&self, high_cost: f64) -> f64 {
        self.cost(high_cost) * self.position.manhattan_distance(&self.destination) as f64
    }

    /// The adjacent cell the head leg of the route leads to
    pub fn next_position(&self) -> Result<Position> {
        let leg = self.route.front().ok_or(SimError::RouteExhausted(self.id))?;
        Ok(self.position.offset(leg.direction, 1))
    }

    /// Moves the car, consuming one step of the head leg if it actually moved
    pub fn update_position(&mut self, position: Position) {
        if position != self.position {
            if let Some(leg) = self.route.front_mut() {
                leg.steps = leg.steps.saturating_sub(1);
                if leg.steps == 0 {
                    self.route.pop_front();
                    self.direction = self.route.front().map(|leg| leg.direction);
                }
            }
        }
        self.position = position;
    }

    /// The car's bid for a conflict; always `Bid::Low` when not eligible
    pub fn action(&self, eligible: bool, view: &ConflictView, ctx: &mut SimContext) -> Bid {
        if !eligible {
            return Bid::Low;
        }

        match self.kind {
            CarKind::Random => {
                if ctx.coin_flip() {
                    Bid::High
                } else {
                    Bid::Low
                }
            }
            CarKind::Truthful => self.priority.into(),
            CarKind::Aggressive => Bid::High,
            CarKind::StatisticallyAggressive => {
                let (own, other) = if self.position == view.position_0 {
                    (view.count_0, view.count_1)
                } else {
                    (view.count_1, view.count_0)
                };
                if self.priority.is_high() || own < other {
                    Bid::High
                } else {
                    Bid::Low
                }
            }
        }
    }
}
