// Module definitions for the various component categories

pub mod builders;
pub mod converters;
pub mod joiner;
pub mod preprocessors;
pub mod retrievers;
pub mod routers;
pub mod writers;

// Re-export common components
pub use builders::*;
pub use converters::*;
pub use joiner::*;
pub use preprocessors::*;
pub use retrievers::*;
pub use routers::*;
pub use writers::*;
