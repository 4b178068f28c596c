//! Mock implementations of the core traits.

pub mod components;
pub mod events;
