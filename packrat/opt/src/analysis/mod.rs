//! Analyses over whole modules.
//!
//! The analyses construct data-structures that make answering queries about
//! the references between productions easier.
mod fixpoint;
mod production_graph;

pub use fixpoint::{GreatestFixpoint, Status};
pub use production_graph::{ProductionGraph, ReferenceGraph};
