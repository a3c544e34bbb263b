use thiserror::Error;

use super::types::{CarId, Position};

/// Errors raised by the simulation core
///
/// Configuration errors are detected before a run starts. Invariant
/// violations signal an engine or caller bug and abort the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    // === Configuration ===
    #[error("Unrecognized protocol name: {0}")]
    UnknownProtocol(String),
    #[error("Unrecognized car kind: {0}")]
    UnknownCarKind(String),
    #[error("Unrecognized direction: {0}")]
    UnknownDirection(String),
    #[error("Malformed route for {car_id}: {reason}")]
    MalformedRoute { car_id: CarId, reason: String },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Trip file line {line}: {reason}")]
    TripFile { line: usize, reason: String },

    // === Invariant violations ===
    #[error("Next position requested for {0} with an empty route")]
    RouteExhausted(CarId),
    #[error("{0} is not registered in the protocol's reward ledger")]
    UnregisteredCar(CarId),
    #[error("No round action recorded for {0}")]
    MissingRoundAction(CarId),
    #[error("Queue at {0} is empty")]
    EmptyQueue(Position),
    #[error("Cannot copy the neighbourhood of intersection {0}")]
    IntersectionCopy(Position),
    #[error("More than two queues feed {0}")]
    TooManySides(Position),
}

impl SimError {
    /// True for errors caused by bad input rather than an engine bug
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SimError::UnknownProtocol(_)
                | SimError::UnknownCarKind(_)
                | SimError::UnknownDirection(_)
                | SimError::MalformedRoute { .. }
                | SimError::InvalidParameter(_)
                | SimError::TripFile { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
