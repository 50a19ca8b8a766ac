//! Domain layer: value objects, events, the `User` aggregate and its factory.

pub mod aggregates;
pub mod commands;
pub mod directory;
pub mod events;
pub mod factory;
pub mod queries;
pub mod value_objects;
