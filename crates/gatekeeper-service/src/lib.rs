//! Gatekeeper service — process wiring.
//!
//! Reads configuration, sets up tracing, chooses the event store, and
//! registers every identity handler with the dispatcher.

pub mod config;
pub mod error;
pub mod inspect;
pub mod state;
pub mod telemetry;
pub mod wiring;
