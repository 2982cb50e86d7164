//! nilarg analysis - finds function parameters that cause a panic when
//! the caller passes nil, and propagates those facts across call edges.

pub mod analysis;
pub mod nilcheck;
pub mod rules;

pub use analysis::{PanicArgsAnalyzer, UnitOutcome};
