//! Client-side reconciliation of confirmed mutations.
//!
//! # Responsibility
//! - Keep a local sheet copy consistent with server-confirmed outcomes
//!   without full refetches.
//!
//! # See also
//! - `crate::service::mutation` for the request/outcome pair.

pub mod projection;
