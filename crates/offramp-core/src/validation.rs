//! Turns untrusted request bodies into typed payment requests.
//!
//! Everything here is pure and runs before any remote call, so a malformed
//! request never costs a chain query.

use crate::PaymentError;
use offramp_types::{
	AirtimeDetails, BankTransferDetails, ChainKind, InitiatePaymentRequest, PaymentDetails,
	PaymentRequest, PaymentType, TransactionReference,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value};
use std::str::FromStr;

pub(crate) const MISSING_PAYMENT_FIELDS: &str =
	"paymentType, details, transactionHash, and userAddress are required";

/// Validates an `initiate-payment` body.
///
/// Checks run in a fixed order: top-level presence, transaction hash
/// format, payment type, the type-specific details, then the chain name.
pub fn validate_payment_request(
	request: &InitiatePaymentRequest,
) -> Result<PaymentRequest, PaymentError> {
	let payment_type = non_blank(request.payment_type.as_deref());
	let details = request.details.as_ref().filter(|d| !d.is_null());
	let reference = non_blank(request.transaction_hash.as_deref());
	let originator = non_blank(request.user_address.as_deref());

	let (Some(payment_type), Some(details), Some(reference), Some(originator)) =
		(payment_type, details, reference, originator)
	else {
		return Err(PaymentError::MissingFields(MISSING_PAYMENT_FIELDS));
	};
	let reference = TransactionReference::new(reference)
		.ok_or_else(|| PaymentError::InvalidTransactionHash(reference.to_string()))?;

	let payment_type = PaymentType::from_str(payment_type).map_err(PaymentError::InvalidPaymentType)?;
	let fields = details
		.as_object()
		.ok_or_else(|| PaymentError::InvalidDetails("details must be an object".to_string()))?;

	let details = match payment_type {
		PaymentType::Bank => {
			let amount = required_amount(fields)?;
			minor_units(amount)?;
			PaymentDetails::Bank(BankTransferDetails {
				account_number: required_text(fields, "accountNumber")?,
				bank_name: required_text(fields, "bankName")?,
				amount,
				account_name: required_text(fields, "accountName")?,
			})
		},
		PaymentType::Airtime => PaymentDetails::Airtime(AirtimeDetails {
			phone_number: required_text(fields, "phoneNumber")?,
			amount: required_amount(fields)?,
		}),
	};

	let chain = match non_blank(request.chain.as_deref()) {
		Some(name) => Some(
			ChainKind::from_str(name).map_err(|e| PaymentError::UnsupportedChain(e.0))?,
		),
		None => None,
	};

	Ok(PaymentRequest {
		details,
		transaction_reference: reference,
		originator_address: originator.to_string(),
		chain,
	})
}

/// Converts a major-unit amount to minor units, rounding half away from zero.
pub fn minor_units(amount: Decimal) -> Result<i64, PaymentError> {
	let too_large = || PaymentError::InvalidDetails("amount is too large".to_string());
	let minor = amount
		.checked_mul(Decimal::ONE_HUNDRED)
		.ok_or_else(too_large)?
		.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
		.to_i64()
		.ok_or_else(too_large)?;
	if minor <= 0 {
		return Err(PaymentError::InvalidDetails(
			"amount is below the smallest currency unit".to_string(),
		));
	}
	Ok(minor)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|v| !v.is_empty())
}

fn required_text(fields: &Map<String, Value>, key: &str) -> Result<String, PaymentError> {
	let value = match fields.get(key) {
		Some(Value::String(s)) => non_blank(Some(s.as_str())).map(str::to_string),
		// Account and phone numbers sometimes arrive as JSON numbers.
		Some(Value::Number(n)) => Some(n.to_string()),
		_ => None,
	};
	value.ok_or_else(|| PaymentError::InvalidDetails(format!("details.{} is required", key)))
}

fn required_amount(fields: &Map<String, Value>) -> Result<Decimal, PaymentError> {
	let raw = match fields.get("amount") {
		Some(Value::Number(n)) => n.to_string(),
		Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
		Some(_) => {
			return Err(PaymentError::InvalidDetails(
				"details.amount must be a number".to_string(),
			))
		},
		None => {
			return Err(PaymentError::InvalidDetails(
				"details.amount is required".to_string(),
			))
		},
	};

	let amount = Decimal::from_str(&raw)
		.or_else(|_| Decimal::from_scientific(&raw))
		.map_err(|_| PaymentError::InvalidDetails(format!("Invalid amount: {}", raw)))?;
	if amount <= Decimal::ZERO {
		return Err(PaymentError::InvalidDetails(
			"details.amount must be greater than zero".to_string(),
		));
	}
	Ok(amount)
}
