//! Ordered sibling sequences.
//!
//! # Responsibility
//! - Keep sibling `order` fields consistent with sequence position.
//! - Provide the move primitive behind every reorder gesture.
//!
//! # Invariants
//! - After any engine call, sibling orders are exactly `0..n-1`.
//! - A failing call leaves the sequence untouched.

pub mod siblings;
