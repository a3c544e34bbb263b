//! Core types for the intersection simulation
//!
//! Plain value types shared by the board, the cars and the protocols.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::error::SimError;
use super::grid;

/// Identifier of a car in the roster
/// Stable across rounds so reward ledgers can follow a car between trips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarId(pub usize);

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "car#{}", self.0)
    }
}

/// An integer cell on the street grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell `steps` cells away in the given direction
    pub fn offset(&self, direction: Direction, steps: i32) -> Position {
        let (dx, dy) = direction.delta();
        Position {
            x: self.x + dx * steps,
            y: self.y + dy * steps,
        }
    }

    pub fn manhattan_distance(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Direction of travel on the grid. `Down` increases y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

impl FromStr for Direction {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(SimError::UnknownDirection(other.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// One straight stretch of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub direction: Direction,
    pub steps: u32,
}

impl Leg {
    pub fn new(direction: Direction, steps: u32) -> Self {
        Self { direction, steps }
    }
}

/// Priority class of a car for the current trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    #[default]
    Low,
    High,
}

impl Priority {
    /// Cost a car of this class accrues per iteration spent traveling
    pub fn cost(self, high_cost: f64) -> f64 {
        match self {
            Priority::Low => 1.0,
            Priority::High => high_cost,
        }
    }

    pub fn is_high(self) -> bool {
        self == Priority::High
    }
}

/// A 0/1 claim to priority submitted during a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Bid {
    #[default]
    Low,
    High,
}

impl Bid {
    /// Monetary-equivalent queue cost of this bid under truthful bidding
    pub fn valuation(self, high_cost: f64) -> f64 {
        match self {
            Bid::Low => 1.0,
            Bid::High => high_cost,
        }
    }
}

impl From<Priority> for Bid {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => Bid::Low,
            Priority::High => Bid::High,
        }
    }
}

/// Sum of the valuations of every bid on one side of a conflict
pub fn side_valuation(bids: &[Bid], high_cost: f64) -> f64 {
    bids.iter().map(|bid| bid.valuation(high_cost)).sum()
}

/// A trip handed to a car at the start of a round
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub origin: Position,
    pub destination: Position,
    pub route: Vec<Leg>,
    pub priority: Priority,
}

impl Trip {
    pub fn new(origin: Position, destination: Position, route: Vec<Leg>, priority: Priority) -> Self {
        Self {
            origin,
            destination,
            route,
            priority,
        }
    }

    /// Checks that the route is a simple path from origin to destination
    /// that stays on the streets of a `width` x `height` board and follows
    /// their flow
    pub fn validate(&self, car_id: CarId, width: i32, height: i32) -> Result<(), SimError> {
        let malformed = |reason: String| SimError::MalformedRoute { car_id, reason };

        if !grid::in_bounds(self.origin, width, height) {
            return Err(malformed(format!("origin {} is off the board", self.origin)));
        }
        if !grid::is_road(self.origin) {
            return Err(malformed(format!("origin {} is not on a street", self.origin)));
        }

        let mut visited = BTreeSet::from([self.origin]);
        let mut position = self.origin;
        for leg in &self.route {
            if leg.steps == 0 {
                return Err(malformed(format!("leg {} has zero steps", leg.direction)));
            }
            for _ in 0..leg.steps {
                let next = position.offset(leg.direction, 1);
                if !grid::in_bounds(next, width, height) {
                    return Err(malformed(format!(
                        "leg {} {} leaves the board at {}",
                        leg.direction, leg.steps, next
                    )));
                }
                if !grid::is_road(next) {
                    return Err(malformed(format!("route crosses off-road cell {}", next)));
                }
                // Leaving an intersection follows the street being entered
                let flow = if grid::is_intersection(position) {
                    grid::street_direction(next)
                } else {
                    grid::street_direction(position)
                };
                if flow != Some(leg.direction) {
                    return Err(malformed(format!(
                        "moving {} from {} runs against the street flow",
                        leg.direction, position
                    )));
                }
                if !visited.insert(next) {
                    return Err(malformed(format!("route visits {} twice", next)));
                }
                position = next;
            }
        }

        if position != self.destination {
            return Err(malformed(format!(
                "route ends at {} but destination is {}",
                position, self.destination
            )));
        }
        Ok(())
    }
}
