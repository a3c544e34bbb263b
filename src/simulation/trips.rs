//! Trip generation
//!
//! Every round, each car asks a trip generator for its origin, destination,
//! route and priority.

use std::path::Path;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::context::SimContext;
use super::error::{Result, SimError};
use super::grid;
use super::types::{CarId, Direction, Leg, Position, Priority, Trip};

/// Source of per-round trips
pub trait TripGenerator {
    fn next_car_trip(&mut self, round_id: usize, car_id: CarId, ctx: &mut SimContext) -> Result<Trip>;
}

/// Shape of generated routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteStyle {
    /// Enter on an edge street and cross the whole board
    #[default]
    Straight,
    /// Drive a random number of cells, then turn onto the crossing street
    Turning,
}

/// Random edge-to-edge trips on a `width` x `height` board
#[derive(Debug, Clone)]
pub struct RandomTrips {
    width: i32,
    height: i32,
    high_priority_probability: f64,
    style: RouteStyle,
    seed: Option<u64>,
}

impl RandomTrips {
    pub fn new(width: i32, height: i32, high_priority_probability: f64, seed: Option<u64>) -> Self {
        Self {
            width,
            height,
            high_priority_probability,
            style: RouteStyle::Straight,
            seed,
        }
    }

    pub fn with_style(mut self, style: RouteStyle) -> Self {
        self.style = style;
        self
    }

    fn trip_seed(seed: u64, round_id: usize, car_id: CarId) -> u64 {
        let mix = 43u64.wrapping_mul((car_id.0 as u64).wrapping_add(37u64.wrapping_mul(round_id as u64)));
        seed.wrapping_add(mix)
    }

    fn generate<R: Rng>(&self, rng: &mut R) -> Trip {
        let (origin, destination, route) = match self.style {
            RouteStyle::Straight => self.straight_route(rng),
            RouteStyle::Turning => self.turning_route(rng),
        };
        let priority = if rng.random_bool(self.high_priority_probability.clamp(0.0, 1.0)) {
            Priority::High
        } else {
            Priority::Low
        };
        Trip::new(origin, destination, route, priority)
    }

    /// Random street flowing in the given parity class: 1 (down/right) or 3 (up/left)
    fn street<R: Rng>(rng: &mut R, extent: i32, class: i32) -> i32 {
        let last = (extent - 1 - class) / 4;
        rng.random_range(0..=last.max(0)) * 4 + class
    }

    fn straight_route<R: Rng>(&self, rng: &mut R) -> (Position, Position, Vec<Leg>) {
        let (w, h) = (self.width, self.height);
        let mut sides = vec![Direction::Down, Direction::Right];
        if w >= 4 {
            sides.push(Direction::Up);
        }
        if h >= 4 {
            sides.push(Direction::Left);
        }
        let heading = sides[rng.random_range(0..sides.len())];

        match heading {
            Direction::Down => {
                let x = Self::street(rng, w, 1);
                (Position::new(x, 0), Position::new(x, h - 1), vec![Leg::new(heading, (h - 1) as u32)])
            }
            Direction::Right => {
                let y = Self::street(rng, h, 1);
                (Position::new(0, y), Position::new(w - 1, y), vec![Leg::new(heading, (w - 1) as u32)])
            }
            Direction::Up => {
                let x = Self::street(rng, w, 3);
                (Position::new(x, h - 1), Position::new(x, 0), vec![Leg::new(heading, (h - 1) as u32)])
            }
            Direction::Left => {
                let y = Self::street(rng, h, 3);
                (Position::new(w - 1, y), Position::new(0, y), vec![Leg::new(heading, (w - 1) as u32)])
            }
        }
    }

    fn turning_route<R: Rng>(&self, rng: &mut R) -> (Position, Position, Vec<Leg>) {
        let (w, h) = (self.width, self.height);
        let mut sides = vec![Direction::Down, Direction::Right];
        if w >= 5 {
            sides.push(Direction::Up);
        }
        if h >= 5 {
            sides.push(Direction::Left);
        }
        let heading = sides[rng.random_range(0..sides.len())];
        // Odd number of cells, so the car stops on a crossing street
        let odd = |rng: &mut R, extent: i32| rng.random_range(0..((extent - 1) / 2).max(1)) * 2 + 1;

        match heading {
            Direction::Down => {
                let x = Self::street(rng, w, 1);
                let y = odd(rng, h);
                let (turn, destination) = if y % 4 == 1 {
                    (Leg::new(Direction::Right, (w - 1 - x) as u32), Position::new(w - 1, y))
                } else {
                    (Leg::new(Direction::Left, x as u32), Position::new(0, y))
                };
                (Position::new(x, 0), destination, vec![Leg::new(heading, y as u32), turn])
            }
            Direction::Right => {
                let y = Self::street(rng, h, 1);
                let x = odd(rng, w);
                let (turn, destination) = if x % 4 == 1 {
                    (Leg::new(Direction::Down, (h - 1 - y) as u32), Position::new(x, h - 1))
                } else {
                    (Leg::new(Direction::Up, y as u32), Position::new(x, 0))
                };
                (Position::new(0, y), destination, vec![Leg::new(heading, x as u32), turn])
            }
            Direction::Up => {
                let x = Self::street(rng, w, 3);
                let steps = odd(rng, h);
                let y = h - 1 - steps;
                let (turn, destination) = if y % 4 == 1 {
                    (Leg::new(Direction::Right, (w - 1 - x) as u32), Position::new(w - 1, y))
                } else {
                    (Leg::new(Direction::Left, x as u32), Position::new(0, y))
                };
                (Position::new(x, h - 1), destination, vec![Leg::new(heading, steps as u32), turn])
            }
            Direction::Left => {
                let y = Self::street(rng, h, 3);
                let steps = odd(rng, w);
                let x = w - 1 - steps;
                let (turn, destination) = if x % 4 == 1 {
                    (Leg::new(Direction::Down, (h - 1 - y) as u32), Position::new(x, h - 1))
                } else {
                    (Leg::new(Direction::Up, y as u32), Position::new(x, 0))
                };
                (Position::new(w - 1, y), destination, vec![Leg::new(heading, steps as u32), turn])
            }
        }
    }
}

impl TripGenerator for RandomTrips {
    fn next_car_trip(&mut self, round_id: usize, car_id: CarId, ctx: &mut SimContext) -> Result<Trip> {
        match self.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(Self::trip_seed(seed, round_id, car_id));
                Ok(self.generate(&mut rng))
            }
            None => Ok(self.generate(ctx.rng())),
        }
    }
}

/// Fixed trips, one per car id, repeated every round
#[derive(Debug, Clone)]
pub struct ScriptedTrips {
    num_roads: usize,
    trips: Vec<Trip>,
}

impl ScriptedTrips {
    pub fn new(num_roads: usize, trips: Vec<Trip>) -> Self {
        Self { num_roads, trips }
    }

    pub fn num_cars(&self) -> usize {
        self.trips.len()
    }

    pub fn num_roads(&self) -> usize {
        self.num_roads
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    /// Parses the trip file format:
    ///
    /// ```text
    /// <num_cars>
    /// <num_roads>
    /// <side> <position> <priority>     (side: top | left | bottom | right)
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let mut header = |what: &str| -> Result<usize> {
            let (line, value) = lines.next().ok_or_else(|| SimError::TripFile {
                line: 0,
                reason: format!("missing {} header", what),
            })?;
            value.parse().map_err(|_| SimError::TripFile {
                line,
                reason: format!("{} must be an integer, got '{}'", what, value),
            })
        };
        let num_cars = header("num_cars")?;
        let num_roads = header("num_roads")?;

        let extent = (num_roads * 2 + 1) as i32;
        let mut trips = Vec::new();
        for (line, text) in lines {
            trips.push(Self::parse_trip(line, text, extent)?);
        }

        if trips.len() < num_cars {
            return Err(SimError::TripFile {
                line: 0,
                reason: format!("expected {} trips, found {}", num_cars, trips.len()),
            });
        }
        trips.truncate(num_cars);
        Ok(Self { num_roads, trips })
    }

    fn parse_trip(line: usize, text: &str, extent: i32) -> Result<Trip> {
        let bad = |reason: String| SimError::TripFile { line, reason };
        let values: Vec<&str> = text.split_whitespace().collect();
        let [side, position, priority] = values.as_slice() else {
            return Err(bad(format!(
                "expected 'side position priority', got '{}'",
                text
            )));
        };
        let position: i32 = position
            .parse()
            .map_err(|_| bad(format!("position must be an integer, got '{}'", position)))?;
        let priority: f64 = priority
            .parse()
            .map_err(|_| bad(format!("priority must be a number, got '{}'", priority)))?;
        let priority = if priority > 0.5 { Priority::High } else { Priority::Low };

        let last = extent - 1;
        let (origin, destination, leg) = match *side {
            "top" => (Position::new(position, 0), Position::new(position, last), Direction::Down),
            "left" => (Position::new(0, position), Position::new(last, position), Direction::Right),
            "bottom" => (Position::new(position, last), Position::new(position, 0), Direction::Up),
            "right" => (Position::new(last, position), Position::new(0, position), Direction::Left),
            other => {
                return Err(bad(format!(
                    "side must be top, left, bottom or right, got '{}'",
                    other
                )))
            }
        };
        if grid::street_direction(origin) != Some(leg) {
            return Err(bad(format!("no street flowing {} from the {} edge at {}", leg, side, position)));
        }
        Ok(Trip::new(origin, destination, vec![Leg::new(leg, last as u32)], priority))
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read trip file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Failed to parse trip file {}", path.display()))
    }
}

impl TripGenerator for ScriptedTrips {
    fn next_car_trip(&mut self, _round_id: usize, car_id: CarId, _ctx: &mut SimContext) -> Result<Trip> {
        self.trips.get(car_id.0).cloned().ok_or_else(|| {
            SimError::InvalidParameter(format!("no scripted trip for {}", car_id))
        })
    }
}
