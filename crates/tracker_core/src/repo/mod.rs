//! Snapshot persistence for the authoritative sheet.
//!
//! # Responsibility
//! - Define the repository contract used by the mutation service.
//! - Keep SQLite details inside the persistence boundary.
//!
//! # Invariants
//! - Saves are last-write-wins and all-or-nothing.
//! - Loads return sequences in the exact saved order.

pub mod sheet_repo;
