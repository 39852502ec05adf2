//! Entity graph model shared by the timeline and novel adapters.
//!
//! # Responsibility
//! - Define canonical scene/chapter/world-entity records.
//! - Provide an ordered, id-addressed container with run-scoped id
//!   allocation.
//!
//! # Invariants
//! - Titles are the cross-document join key and must be unique per kind.
//! - Deletion is represented by the `unused` soft-delete flag; the engine
//!   never removes scenes.

pub mod graph;
pub mod scene;
