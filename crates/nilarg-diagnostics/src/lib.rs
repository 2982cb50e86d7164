//! nilarg diagnostics - the diagnostic model shared by the analysis
//! and its consumers.

pub mod diagnostic;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, Location, Severity};
