//! Request-level payment state machine.
//!
//! validate → resolve bank code → claim reference → confirm on-chain →
//! disburse. The executor is reached only through a `Confirmed` verdict.

use crate::banks::BankDirectory;
use crate::guard::ReferenceGuard;
use crate::validation::{minor_units, validate_payment_request};
use crate::PaymentError;
use offramp_confirmation::{ConfirmationError, ConfirmationService};
use offramp_disbursement::DisbursementService;
use offramp_types::{
	is_hex_identifier, truncate_id, AirtimePurchase, BankTransfer, ChainKind, Disbursement,
	DisbursementOutcome, InitiatePaymentRequest, PaymentDetails, PaymentRequest,
	ResolveAccountRequest, ResolvedAccount,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

/// Sequences confirmation and disbursement for one payment at a time.
///
/// Shared by every HTTP request; all per-request state lives on the stack
/// of `process_payment`.
pub struct PaymentOrchestrator {
	confirmation: Arc<ConfirmationService>,
	disbursement: Arc<DisbursementService>,
	banks: BankDirectory,
	guard: ReferenceGuard,
}

impl PaymentOrchestrator {
	pub fn new(
		confirmation: Arc<ConfirmationService>,
		disbursement: Arc<DisbursementService>,
		banks: BankDirectory,
		guard: ReferenceGuard,
	) -> Self {
		Self {
			confirmation,
			disbursement,
			banks,
			guard,
		}
	}

	/// Validates an untrusted body and processes it.
	pub async fn initiate_payment(
		&self,
		body: &InitiatePaymentRequest,
	) -> Result<DisbursementOutcome, PaymentError> {
		let request = validate_payment_request(body).inspect_err(|e| {
			tracing::info!(error = %e, "Rejected payment request");
		})?;
		self.process_payment(&request).await
	}

	/// Confirms the on-chain payment and, only if it is confirmed, runs the
	/// matching disbursement.
	#[instrument(skip_all, fields(payment_type = %request.payment_type(), tx_hash = %truncate_id(request.transaction_reference.as_str())))]
	pub async fn process_payment(
		&self,
		request: &PaymentRequest,
	) -> Result<DisbursementOutcome, PaymentError> {
		let chain = request.chain.unwrap_or(self.confirmation.default_chain());
		if !self.confirmation.supports(chain) {
			return Err(PaymentError::UnsupportedChain(chain.to_string()));
		}

		let bank_code = match &request.details {
			PaymentDetails::Bank(details) => Some(self.banks.code_for(&details.bank_name)?.to_string()),
			PaymentDetails::Airtime(_) => None,
		};

		let claim = self.guard.acquire(chain, &request.transaction_reference)?;

		tracing::info!(chain = %chain, "Confirming transaction");
		let verdict = self
			.confirmation
			.confirm(&request.transaction_reference, Some(chain))
			.await
			.map_err(|e| match e {
				ConfirmationError::UnsupportedChain(chain) => {
					PaymentError::UnsupportedChain(chain.to_string())
				},
				ConfirmationError::Query(e) => PaymentError::ChainQuery(e),
			})?;

		if !verdict.is_confirmed() {
			let diagnostic = verdict.diagnostic_or_default();
			tracing::warn!(outcome = %verdict.outcome, diagnostic = %diagnostic, "Transaction not confirmed, skipping disbursement");
			return Err(PaymentError::ConfirmationFailed {
				outcome: verdict.outcome,
				diagnostic,
			});
		}

		let disbursement = build_disbursement(request, bank_code)?;
		tracing::info!(payment_type = %disbursement.payment_type(), "Transaction confirmed, disbursing");

		let result = self.disbursement.execute(&disbursement).await;
		match result {
			Ok(outcome) if outcome.success => {
				self.guard.mark_processed(&claim);
				tracing::info!(
					provider_reference = outcome.provider_reference.as_deref().unwrap_or(""),
					"Disbursement completed"
				);
				Ok(outcome)
			},
			Ok(outcome) => {
				tracing::error!(message = %outcome.message, "Provider rejected disbursement after confirmed payment");
				Err(PaymentError::DisbursementFailed { outcome })
			},
			Err(e) => {
				// The provider may or may not have moved money.
				self.guard.mark_processed(&claim);
				tracing::error!(error = %e, "Disbursement failed after confirmed payment");
				Err(e.into())
			},
		}
	}

	/// Looks up the holder of a bank account.
	pub async fn resolve_account(
		&self,
		body: &ResolveAccountRequest,
	) -> Result<ResolvedAccount, PaymentError> {
		let account_number = body.account_number.as_deref().map(str::trim).unwrap_or("");
		let bank_name = body.bank_name.as_deref().map(str::trim).unwrap_or("");
		if account_number.is_empty() || bank_name.is_empty() {
			return Err(PaymentError::MissingFields(
				"accountNumber and bankName are required",
			));
		}

		let bank_code = self.banks.code_for(bank_name)?;
		Ok(self
			.disbursement
			.resolve_account(account_number, bank_code)
			.await?)
	}

	/// Reads an account balance on `chain`, or on the default chain.
	pub async fn get_balance(
		&self,
		account_id: &str,
		chain: Option<&str>,
	) -> Result<String, PaymentError> {
		let account_id = account_id.trim();
		if account_id.is_empty() {
			return Err(PaymentError::MissingFields("accountId is required"));
		}
		if !is_hex_identifier(account_id) {
			return Err(PaymentError::InvalidDetails(
				"accountId must be a 0x-prefixed hex address".to_string(),
			));
		}
		let chain = match chain.map(str::trim).filter(|c| !c.is_empty()) {
			Some(name) => {
				Some(ChainKind::from_str(name).map_err(|e| PaymentError::UnsupportedChain(e.0))?)
			},
			None => None,
		};

		self.confirmation
			.get_balance(chain, account_id)
			.await
			.map_err(|e| match e {
				ConfirmationError::UnsupportedChain(chain) => {
					PaymentError::UnsupportedChain(chain.to_string())
				},
				ConfirmationError::Query(e) => PaymentError::ChainQuery(e),
			})
	}
}

fn build_disbursement(
	request: &PaymentRequest,
	bank_code: Option<String>,
) -> Result<Disbursement, PaymentError> {
	match (&request.details, bank_code) {
		(PaymentDetails::Bank(details), Some(bank_code)) => Ok(Disbursement::Bank(BankTransfer {
			account_number: details.account_number.clone(),
			bank_code,
			amount_minor_units: minor_units(details.amount)?,
			account_name: details.account_name.clone(),
			reason: None,
		})),
		(PaymentDetails::Bank(details), None) => Err(PaymentError::InvalidBank(details.bank_name.clone())),
		(PaymentDetails::Airtime(details), _) => Ok(Disbursement::Airtime(AirtimePurchase {
			phone_number: details.phone_number.clone(),
			amount_major_units: details.amount,
		})),
	}
}
