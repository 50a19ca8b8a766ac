//! Gatekeeper Core — event-sourced aggregate framework.
//!
//! This crate defines the identifier, event, aggregate, event store and
//! publisher abstractions, plus the in-process command/query dispatcher.
//! It contains no infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod identifier;
pub mod publisher;
pub mod query;
pub mod store;
