//! Payment orchestration for the off-ramp bridge.
//!
//! Ties the confirmation poller to the disbursement executors. A payment
//! request is validated, its on-chain transfer confirmed, and only then is
//! money sent out. Every branch ends in an explicit success or error that
//! the HTTP layer turns into a response.

pub mod banks;
pub mod builder;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod validation;

pub use banks::BankDirectory;
pub use builder::{BridgeBuilder, BridgeFactories, BuilderError};
pub use error::PaymentError;
pub use guard::ReferenceGuard;
pub use orchestrator::PaymentOrchestrator;
pub use validation::validate_payment_request;
