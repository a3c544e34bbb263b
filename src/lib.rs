//! Signal-free intersection simulation library
//!
//! A grid of one-way streets where queued cars contend for right-of-way each
//! step under a pluggable auction/priority protocol.

pub mod simulation;
