//! Intersection auction simulation
//!
//! Cars queue on a grid of one-way streets. Whenever two queues want the same
//! cell, the configured protocol decides which head car moves, optionally
//! settling rewards the cars can spend on later conflicts. Everything here
//! runs headless and single-threaded.

mod board;
mod car;
mod config;
mod context;
mod error;
mod game_state;
pub mod grid;
mod protocol;
mod render;
mod simulator;
mod trips;
mod types;

pub use board::{Board, CarSlot, CostBoard, Grid};
pub use car::{CarKind, ConflictView, SimCar};
pub use config::{
    ProtocolKind, SimConfig, DEFAULT_HIGH_COST, DEFAULT_HIGH_PRIORITY_PROBABILITY,
    DEFAULT_OPTIMAL_PROBABILITY, VALUATION_HORIZON,
};
pub use context::SimContext;
pub use error::{Result, SimError};
pub use game_state::{BoardParams, GameState};
pub use protocol::{ButtonState, Conflict, Protocol, RewardLedger};
pub use render::{render_board, ConsoleRenderer, IterationObserver};
pub use simulator::{RoundReport, SimulationSummary, Simulator};
pub use trips::{RandomTrips, RouteStyle, ScriptedTrips, TripGenerator};
pub use types::{side_valuation, Bid, CarId, Direction, Leg, Position, Priority, Trip};
