//! Domain layer: pure rules with no I/O.

pub mod actor;
pub mod aggregates;
pub mod events;
pub mod value_objects;
