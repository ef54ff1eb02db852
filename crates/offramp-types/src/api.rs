//! API types for the off-ramp HTTP surface.
//!
//! Request bodies arrive from untrusted clients, so every field of the
//! inbound types is optional and loosely typed; the orchestrator decides
//! what is missing or malformed. Error bodies keep the `{"error": "..."}`
//! shape the web client already understands.

use crate::payment::DisbursementOutcome;
use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /initiate-payment`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
	pub payment_type: Option<String>,
	/// Type-specific fields, validated once the payment type is known.
	pub details: Option<serde_json::Value>,
	pub transaction_hash: Option<String>,
	pub user_address: Option<String>,
	/// Chain the transfer was made on; defaults to the configured chain.
	pub chain: Option<String>,
}

/// Successful response of `POST /initiate-payment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentResponse {
	pub success: bool,
	pub result: DisbursementOutcome,
}

/// Body of `POST /resolve-account`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAccountRequest {
	pub account_number: Option<String>,
	pub bank_name: Option<String>,
}

/// Query string of `GET /get-balance/{accountId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceQuery {
	pub chain: Option<String>,
}

/// Response of `GET /get-balance/{accountId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
	/// Balance in the chain's smallest unit, as a decimal string.
	pub balance: String,
}

/// API error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
}

/// API error with its HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Invalid input or a failed confirmation (400).
	BadRequest { message: String },
	/// The same transaction is already being processed (409).
	Conflict { message: String },
	/// The payout provider rejected a confirmed payment (502).
	BadGateway { message: String },
	/// Unexpected failure (500).
	InternalServerError { message: String },
}

impl APIError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			APIError::BadRequest { .. } => StatusCode::BAD_REQUEST,
			APIError::Conflict { .. } => StatusCode::CONFLICT,
			APIError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
			APIError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn message(&self) -> &str {
		match self {
			APIError::BadRequest { message }
			| APIError::Conflict { message }
			| APIError::BadGateway { message }
			| APIError::InternalServerError { message } => message,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		ErrorResponse {
			error: self.message().to_string(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.message(), self.status_code())
	}
}

impl std::error::Error for APIError {}

impl IntoResponse for APIError {
	fn into_response(self) -> Response {
		(self.status_code(), Json(self.to_error_response())).into_response()
	}
}
