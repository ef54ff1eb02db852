//! Disbursement executors for the off-ramp bridge.
//!
//! An executor moves real-world money once the orchestrator has a confirmed
//! on-chain payment: a bank transfer or an airtime top-up. Executors never
//! poll; they answer synchronously with a `DisbursementOutcome`. Account
//! resolution lives here too, as a read-only call the client uses to check a
//! recipient before paying.

use async_trait::async_trait;
use offramp_types::{
	AirtimePurchase, BankTransfer, Disbursement, DisbursementOutcome, ImplementationRegistry,
	ResolvedAccount,
};
use std::collections::HashMap;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod simulated;
}

/// Errors raised by disbursement providers.
#[derive(Debug, Error)]
pub enum DisbursementError {
	/// The provider knows no account with this number at this bank.
	#[error("Account not found")]
	AccountNotFound,
	/// The instruction cannot be executed as given.
	#[error("Invalid disbursement: {0}")]
	InvalidInstruction(String),
	/// The provider could not be reached or answered unexpectedly.
	#[error("Provider error: {0}")]
	Provider(String),
	/// The provider could not be built from its configuration.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Interface every payout provider implements.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait DisbursementInterface: Send + Sync {
	/// Sends `amount_minor_units` to a bank account.
	///
	/// A provider-side rejection is an `Ok` outcome with `success: false`;
	/// `Err` is reserved for failures to talk to the provider at all.
	async fn bank_transfer(
		&self,
		transfer: &BankTransfer,
	) -> Result<DisbursementOutcome, DisbursementError>;

	/// Tops up a phone number with airtime.
	async fn airtime(
		&self,
		purchase: &AirtimePurchase,
	) -> Result<DisbursementOutcome, DisbursementError>;

	/// Looks up the holder of a bank account.
	async fn resolve_account(
		&self,
		account_number: &str,
		bank_code: &str,
	) -> Result<ResolvedAccount, DisbursementError>;
}

/// Type alias for disbursement provider factory functions.
pub type DisbursementFactory =
	fn(&toml::Value) -> Result<Box<dyn DisbursementInterface>, DisbursementError>;

/// Registry trait for disbursement provider implementations.
pub trait DisbursementRegistry: ImplementationRegistry<Factory = DisbursementFactory> {}

/// Returns every built-in provider as `(name, factory)`.
pub fn get_all_implementations() -> Vec<(&'static str, DisbursementFactory)> {
	use implementations::simulated;

	vec![(simulated::Registry::NAME, simulated::Registry::factory())]
}

/// Routes disbursements to the primary provider.
pub struct DisbursementService {
	providers: HashMap<String, Box<dyn DisbursementInterface>>,
	primary: String,
}

impl DisbursementService {
	/// Creates the service. Fails when `primary` names no provider.
	pub fn new(
		providers: HashMap<String, Box<dyn DisbursementInterface>>,
		primary: impl Into<String>,
	) -> Result<Self, DisbursementError> {
		let primary = primary.into();
		if !providers.contains_key(&primary) {
			return Err(DisbursementError::Configuration(format!(
				"Primary disbursement provider '{}' is not configured",
				primary
			)));
		}
		Ok(Self { providers, primary })
	}

	fn provider(&self) -> Result<&dyn DisbursementInterface, DisbursementError> {
		self.providers
			.get(&self.primary)
			.map(|p| p.as_ref())
			.ok_or_else(|| DisbursementError::Configuration("No primary provider".to_string()))
	}

	/// Dispatches to the executor matching the disbursement kind and
	/// returns its outcome verbatim.
	pub async fn execute(
		&self,
		disbursement: &Disbursement,
	) -> Result<DisbursementOutcome, DisbursementError> {
		let provider = self.provider()?;
		match disbursement {
			Disbursement::Bank(transfer) => {
				if transfer.amount_minor_units <= 0 {
					return Err(DisbursementError::InvalidInstruction(
						"amount must be positive".to_string(),
					));
				}
				provider.bank_transfer(transfer).await
			},
			Disbursement::Airtime(purchase) => {
				if purchase.amount_major_units.is_sign_negative() || purchase.amount_major_units.is_zero()
				{
					return Err(DisbursementError::InvalidInstruction(
						"amount must be positive".to_string(),
					));
				}
				provider.airtime(purchase).await
			},
		}
	}

	pub async fn resolve_account(
		&self,
		account_number: &str,
		bank_code: &str,
	) -> Result<ResolvedAccount, DisbursementError> {
		self.provider()?
			.resolve_account(account_number, bank_code)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	fn service() -> DisbursementService {
		let mut providers = HashMap::new();
		for (name, factory) in get_all_implementations() {
			let config = toml::Value::Table(toml::Table::new());
			providers.insert(name.to_string(), factory(&config).unwrap());
		}
		DisbursementService::new(providers, "simulated").unwrap()
	}

	#[test]
	fn test_primary_must_exist() {
		let result = DisbursementService::new(HashMap::new(), "paystack");
		assert!(matches!(result, Err(DisbursementError::Configuration(_))));
	}

	#[tokio::test]
	async fn test_execute_dispatches_by_kind() {
		let service = service();

		let bank = Disbursement::Bank(BankTransfer {
			account_number: "0123456789".to_string(),
			bank_code: "058".to_string(),
			amount_minor_units: 500_000,
			account_name: "Ada Obi".to_string(),
			reason: None,
		});
		let outcome = service.execute(&bank).await.unwrap();
		assert!(outcome.success);
		assert!(outcome.provider_reference.unwrap().starts_with("TRF_SIM_"));

		let airtime = Disbursement::Airtime(AirtimePurchase {
			phone_number: "08012345678".to_string(),
			amount_major_units: dec!(100),
		});
		let outcome = service.execute(&airtime).await.unwrap();
		assert!(outcome.success);
		assert!(outcome.provider_reference.unwrap().starts_with("AIR_SIM_"));
	}

	#[tokio::test]
	async fn test_execute_rejects_non_positive_amounts() {
		let service = service();
		let bank = Disbursement::Bank(BankTransfer {
			account_number: "0123456789".to_string(),
			bank_code: "058".to_string(),
			amount_minor_units: 0,
			account_name: "Ada Obi".to_string(),
			reason: None,
		});
		assert!(matches!(
			service.execute(&bank).await,
			Err(DisbursementError::InvalidInstruction(_))
		));
	}
}
