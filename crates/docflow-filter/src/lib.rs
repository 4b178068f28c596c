//! Metadata filter predicates
//!
//! A predicate is either a comparison leaf
//! `{"field": "meta.version", "operator": ">", "value": 1.21}` or a logical
//! node `{"operator": "AND", "conditions": [...]}`. Predicates are parsed
//! from JSON (or YAML) and evaluated against documents; evaluation is pure.

#![forbid(unsafe_code)]

mod error;
mod evaluator;
mod predicate;

pub use error::FilterError;
pub use evaluator::{evaluate, filter_documents};
pub use predicate::{ComparisonOperator, FilterPredicate, LogicalOperator};
