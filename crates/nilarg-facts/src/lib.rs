//! nilarg facts - panic-argument facts keyed by function identity,
//! with in-memory storage for a single run and JSON archives for
//! cross-unit exchange.

pub mod store;

pub use store::{
    belongs_to_package, package_of, FactStore, FactsError, MemoryFactStore, PackageFacts,
    PanicArgs,
};
