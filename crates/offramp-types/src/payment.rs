//! Payment types for the off-ramp bridge.
//!
//! A `PaymentRequest` is the validated, typed form of what a client submits
//! to `POST /initiate-payment`. Once the on-chain transfer is confirmed it
//! is turned into a `Disbursement` instruction for one of the executors,
//! which answers with a `DisbursementOutcome`.

use crate::chain::{ChainKind, TransactionReference};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of real-world payout the client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
	Bank,
	Airtime,
}

impl FromStr for PaymentType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"bank" => Ok(PaymentType::Bank),
			"airtime" => Ok(PaymentType::Airtime),
			other => Err(other.to_string()),
		}
	}
}

impl fmt::Display for PaymentType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PaymentType::Bank => f.write_str("bank"),
			PaymentType::Airtime => f.write_str("airtime"),
		}
	}
}

/// Bank transfer details as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransferDetails {
	pub account_number: String,
	pub bank_name: String,
	/// Amount in major currency units (naira).
	pub amount: Decimal,
	pub account_name: String,
}

/// Airtime top-up details as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirtimeDetails {
	pub phone_number: String,
	/// Amount in major currency units (naira).
	pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "paymentType", content = "details", rename_all = "lowercase")]
pub enum PaymentDetails {
	Bank(BankTransferDetails),
	Airtime(AirtimeDetails),
}

/// A fully validated payment request.
///
/// Transient: built per HTTP call and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
	pub details: PaymentDetails,
	pub transaction_reference: TransactionReference,
	pub originator_address: String,
	/// Chain the client paid on; `None` selects the configured default.
	pub chain: Option<ChainKind>,
}

impl PaymentRequest {
	pub fn payment_type(&self) -> PaymentType {
		match self.details {
			PaymentDetails::Bank(_) => PaymentType::Bank,
			PaymentDetails::Airtime(_) => PaymentType::Airtime,
		}
	}
}

/// Instruction for the bank transfer executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransfer {
	pub account_number: String,
	pub bank_code: String,
	/// Amount in minor currency units (kobo).
	pub amount_minor_units: i64,
	pub account_name: String,
	pub reason: Option<String>,
}

/// Instruction for the airtime executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirtimePurchase {
	pub phone_number: String,
	pub amount_major_units: Decimal,
}

/// A payout that may only be executed after a confirmed on-chain payment.
#[derive(Debug, Clone, PartialEq)]
pub enum Disbursement {
	Bank(BankTransfer),
	Airtime(AirtimePurchase),
}

impl Disbursement {
	pub fn payment_type(&self) -> PaymentType {
		match self {
			Disbursement::Bank(_) => PaymentType::Bank,
			Disbursement::Airtime(_) => PaymentType::Airtime,
		}
	}
}

/// Structured result of an executor call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisbursementOutcome {
	pub success: bool,
	/// Provider-side reference of the payout, when one was created.
	pub provider_reference: Option<String>,
	pub message: String,
}

impl DisbursementOutcome {
	pub fn succeeded(provider_reference: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			success: true,
			provider_reference: Some(provider_reference.into()),
			message: message.into(),
		}
	}

	pub fn rejected(message: impl Into<String>) -> Self {
		Self {
			success: false,
			provider_reference: None,
			message: message.into(),
		}
	}
}

/// Account holder details returned by an account lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAccount {
	pub account_name: String,
	pub account_number: String,
}
