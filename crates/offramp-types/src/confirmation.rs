//! Confirmation verdicts produced by the chain poller.
//!
//! A `ConfirmationResult` is the only thing the poller hands back to its
//! caller. Its `outcome` is the single gate for disbursement: only
//! `ConfirmationOutcome::Confirmed` may lead to money leaving the treasury.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Chain-specific fields attached to a verdict (version, block number, gas).
///
/// Informational only; never consulted for control flow.
pub type ChainMetadata = BTreeMap<String, serde_json::Value>;

/// Terminal state of a confirmation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmationOutcome {
	/// Committed, finalized and executed successfully.
	Confirmed,
	/// Finalized with a failing execution, or rejected for a non-retryable reason.
	Failed,
	/// The deadline passed after the transaction had been seen pending, or
	/// without a single successful answer from the remote API.
	TimedOut,
	/// The deadline passed and every answer from the remote API was
	/// "not found".
	NotFound,
}

impl fmt::Display for ConfirmationOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ConfirmationOutcome::Confirmed => "confirmed",
			ConfirmationOutcome::Failed => "failed",
			ConfirmationOutcome::TimedOut => "timed out",
			ConfirmationOutcome::NotFound => "not found",
		};
		f.write_str(s)
	}
}

/// The poller's verdict for one transaction reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
	pub outcome: ConfirmationOutcome,
	/// Present only when the remote API returned a committed transaction.
	pub chain_timestamp: Option<DateTime<Utc>>,
	/// Human readable reason; always set unless the outcome is `Confirmed`.
	pub diagnostic: Option<String>,
	#[serde(default)]
	pub chain_metadata: ChainMetadata,
}

impl ConfirmationResult {
	pub fn confirmed(chain_timestamp: Option<DateTime<Utc>>, chain_metadata: ChainMetadata) -> Self {
		Self {
			outcome: ConfirmationOutcome::Confirmed,
			chain_timestamp,
			diagnostic: None,
			chain_metadata,
		}
	}

	pub fn failed(
		diagnostic: impl Into<String>,
		chain_timestamp: Option<DateTime<Utc>>,
		chain_metadata: ChainMetadata,
	) -> Self {
		Self {
			outcome: ConfirmationOutcome::Failed,
			chain_timestamp,
			diagnostic: Some(diagnostic.into()),
			chain_metadata,
		}
	}

	pub fn timed_out(diagnostic: impl Into<String>) -> Self {
		Self {
			outcome: ConfirmationOutcome::TimedOut,
			chain_timestamp: None,
			diagnostic: Some(diagnostic.into()),
			chain_metadata: ChainMetadata::new(),
		}
	}

	pub fn not_found(diagnostic: impl Into<String>) -> Self {
		Self {
			outcome: ConfirmationOutcome::NotFound,
			chain_timestamp: None,
			diagnostic: Some(diagnostic.into()),
			chain_metadata: ChainMetadata::new(),
		}
	}

	/// True only for a committed, finalized, successful transaction.
	pub fn is_confirmed(&self) -> bool {
		self.outcome == ConfirmationOutcome::Confirmed
	}

	/// Diagnostic text, falling back to a description of the outcome.
	pub fn diagnostic_or_default(&self) -> String {
		self.diagnostic
			.clone()
			.unwrap_or_else(|| format!("Transaction confirmation {}", self.outcome))
	}
}
