//! Transport-agnostic request surface.
//!
//! # Responsibility
//! - Wrap every sheet operation in a `{success, data, message}` envelope.
//! - Serialize access to the service with one critical section per call.
//!
//! HTTP routing, auth and retries live outside this crate.

pub mod envelope;
pub mod sheet_api;
