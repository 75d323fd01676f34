//! Core use-case services.
//!
//! # Responsibility
//! - Compose id-path lookup with the sibling engine into tree mutations.
//! - Keep transport layers decoupled from storage details.

pub mod mutation;
pub mod sheet_service;
