//! Gatekeeper — User identity bounded context.
//!
//! Responsible for user registration, email and username changes, and
//! enabling/disabling accounts, all derived from the user's event history.

pub mod application;
pub mod domain;
pub mod infrastructure;
