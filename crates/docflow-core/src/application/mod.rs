/// Pipeline scheduler
pub mod scheduler;

/// Cooperative run cancellation
pub mod cancellation;
