//! Domain model for the Topic -> SubTopic -> Question hierarchy.
//!
//! # Responsibility
//! - Define the canonical records shared by service, sync and persistence.
//! - Provide validation predicates and normalization for enum-like fields.
//!
//! # Invariants
//! - Every node is identified by a stable string id that is never reused.
//! - Titles are non-empty after trim.
//! - Removal is immediate; there are no tombstones.

pub mod sheet;
