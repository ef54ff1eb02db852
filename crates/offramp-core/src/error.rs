//! Errors surfaced by the payment orchestrator.

use offramp_confirmation::ChainQueryError;
use offramp_disbursement::DisbursementError;
use offramp_types::{APIError, ConfirmationOutcome, DisbursementOutcome};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
	/// A required top-level field is absent or blank.
	#[error("{0}")]
	MissingFields(&'static str),
	#[error("Invalid transaction hash: {0}")]
	InvalidTransactionHash(String),
	#[error("Invalid payment type. Must be 'bank' or 'airtime'")]
	InvalidPaymentType(String),
	#[error("Invalid bank name: {0}")]
	InvalidBank(String),
	/// Type-specific details are missing or malformed.
	#[error("{0}")]
	InvalidDetails(String),
	#[error("Unsupported chain: {0}")]
	UnsupportedChain(String),
	/// The same transaction is being confirmed by another request, or has
	/// already been paid out.
	#[error("Transaction {0} has already been submitted")]
	DuplicateSubmission(String),
	/// The chain did not confirm the payment; nothing was disbursed.
	#[error("{diagnostic}")]
	ConfirmationFailed {
		outcome: ConfirmationOutcome,
		diagnostic: String,
	},
	/// The payment was confirmed but the provider refused the payout.
	#[error("{}", .outcome.message)]
	DisbursementFailed { outcome: DisbursementOutcome },
	#[error(transparent)]
	Disbursement(#[from] DisbursementError),
	/// A direct chain read (balance) failed.
	#[error(transparent)]
	ChainQuery(#[from] ChainQueryError),
}

impl From<PaymentError> for APIError {
	fn from(err: PaymentError) -> Self {
		let message = err.to_string();
		match err {
			PaymentError::MissingFields(_)
			| PaymentError::InvalidTransactionHash(_)
			| PaymentError::InvalidPaymentType(_)
			| PaymentError::InvalidBank(_)
			| PaymentError::InvalidDetails(_)
			| PaymentError::UnsupportedChain(_)
			| PaymentError::ConfirmationFailed { .. }
			| PaymentError::Disbursement(DisbursementError::AccountNotFound) => {
				APIError::BadRequest { message }
			},
			PaymentError::DuplicateSubmission(_) => APIError::Conflict { message },
			PaymentError::DisbursementFailed { .. } | PaymentError::ChainQuery(_) => {
				APIError::BadGateway { message }
			},
			PaymentError::Disbursement(_) => APIError::InternalServerError { message },
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn status(err: PaymentError) -> u16 {
		APIError::from(err).status_code().as_u16()
	}

	#[test]
	fn test_status_mapping() {
		assert_eq!(status(PaymentError::InvalidBank("Foo Bank".into())), 400);
		assert_eq!(status(PaymentError::InvalidTransactionHash("0x1/..".into())), 400);
		assert_eq!(
			status(PaymentError::ConfirmationFailed {
				outcome: ConfirmationOutcome::TimedOut,
				diagnostic: "Transaction confirmation timeout after 6s".into(),
			}),
			400
		);
		assert_eq!(status(PaymentError::DuplicateSubmission("0xabc".into())), 409);
		assert_eq!(
			status(PaymentError::DisbursementFailed {
				outcome: DisbursementOutcome::rejected("no"),
			}),
			502
		);
		assert_eq!(
			status(PaymentError::Disbursement(DisbursementError::Provider("down".into()))),
			500
		);
	}

	#[test]
	fn test_messages_are_client_facing() {
		let err = PaymentError::MissingFields(
			"paymentType, details, transactionHash, and userAddress are required",
		);
		assert_eq!(
			APIError::from(err).message(),
			"paymentType, details, transactionHash, and userAddress are required"
		);

		let err = PaymentError::ConfirmationFailed {
			outcome: ConfirmationOutcome::Failed,
			diagnostic: "Transaction failed on-chain: Move abort".into(),
		};
		assert_eq!(err.to_string(), "Transaction failed on-chain: Move abort");
	}
}
