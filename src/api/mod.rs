//! Catalog API access
//!
//! This module provides the fetch adapter that turns a `(page, limit)`
//! request into an HTTP call against the remote catalog, parses the JSON
//! page, and surfaces failures as typed errors. Cancellation is cooperative
//! through a `CancelToken` passed along with every request.

pub mod cancel;
pub mod client;
pub mod errors;
pub mod types;

pub use cancel::*;
pub use client::*;
pub use errors::*;
pub use types::*;
