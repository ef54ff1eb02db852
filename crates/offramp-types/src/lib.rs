//! Common types module for the off-ramp bridge.
//!
//! This module defines the data types shared by the confirmation poller, the
//! disbursement executors, the payment orchestrator and the HTTP service. It
//! provides a single place for domain types so that every crate agrees on
//! the shape of a confirmation verdict and a payment request.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Chain identifiers and transaction references.
pub mod chain;
/// Confirmation verdicts produced by the chain poller.
pub mod confirmation;
/// Payment requests, disbursement instructions and outcomes.
pub mod payment;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Redacting wrapper for credentials.
pub mod secret_string;
/// Formatting helpers for log output.
pub mod utils;

pub use api::*;
pub use chain::*;
pub use confirmation::*;
pub use payment::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::truncate_id;
