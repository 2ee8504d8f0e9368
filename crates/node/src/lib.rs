//! Operational surface of the ringlet simulation.
//!
//! The core protocol engine lives in [ringlet_core]; this crate adds the
//! pieces an operator touches: logging setup and a scenario driver that
//! spawns a ring, issues commands against named nodes and prints what
//! each node knows.

pub mod logging;
pub mod scenario;
