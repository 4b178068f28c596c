/// Documents exchanged between components
pub mod document;

/// Socket declarations and type compatibility
pub mod socket;

/// The pipeline graph and its connection registry
pub mod pipeline;

/// Run events
pub mod events;
