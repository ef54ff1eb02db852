//! Request handlers behind the HTTP routes.
//!
//! Each function takes the decoded request and the shared orchestrator and
//! returns the response body or a `PaymentError`; status mapping happens in
//! the server.

pub mod account;
pub mod balance;
pub mod payment;
