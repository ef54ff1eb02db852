//! Simulated payout provider.
//!
//! Stands in for a real bank/airtime gateway. Every payout succeeds with a
//! freshly generated reference, except transfers to the configured failure
//! account, which are rejected the way a gateway rejects payouts from an
//! unverified business.

use crate::{
	DisbursementError, DisbursementFactory, DisbursementInterface, DisbursementRegistry,
};
use async_trait::async_trait;
use offramp_types::{
	AirtimePurchase, BankTransfer, DisbursementOutcome, ImplementationRegistry, ResolvedAccount,
};
use serde::Deserialize;
use uuid::Uuid;

/// Rejection text returned for transfers to the failure account.
pub const SIMULATED_REJECTION: &str =
	"SIMULATED ERROR: You cannot initiate third party payouts as a starter business";

#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedConfig {
	/// Account number that always fails resolution and transfers.
	#[serde(default = "default_failure_account")]
	pub failure_account: String,
	/// Holder name returned by account resolution.
	#[serde(default = "default_account_name")]
	pub account_name: String,
}

fn default_failure_account() -> String {
	"9999999999".to_string()
}

fn default_account_name() -> String {
	"Simulated Account Holder".to_string()
}

pub struct SimulatedProvider {
	config: SimulatedConfig,
}

impl SimulatedProvider {
	pub fn new(config: SimulatedConfig) -> Self {
		Self { config }
	}
}

#[async_trait]
impl DisbursementInterface for SimulatedProvider {
	async fn bank_transfer(
		&self,
		transfer: &BankTransfer,
	) -> Result<DisbursementOutcome, DisbursementError> {
		tracing::info!(
			account_number = %transfer.account_number,
			bank_code = %transfer.bank_code,
			amount_minor_units = transfer.amount_minor_units,
			"Simulating bank transfer"
		);

		if transfer.account_number == self.config.failure_account {
			tracing::warn!("Simulated provider rejected the transfer");
			return Ok(DisbursementOutcome::rejected(SIMULATED_REJECTION));
		}

		Ok(DisbursementOutcome::succeeded(
			format!("TRF_SIM_{}", Uuid::new_v4().simple()),
			"Transfer successful",
		))
	}

	async fn airtime(
		&self,
		purchase: &AirtimePurchase,
	) -> Result<DisbursementOutcome, DisbursementError> {
		tracing::info!(
			phone_number = %purchase.phone_number,
			amount = %purchase.amount_major_units,
			"Simulating airtime purchase"
		);

		Ok(DisbursementOutcome::succeeded(
			format!("AIR_SIM_{}", Uuid::new_v4().simple()),
			"Airtime purchase simulated.",
		))
	}

	async fn resolve_account(
		&self,
		account_number: &str,
		bank_code: &str,
	) -> Result<ResolvedAccount, DisbursementError> {
		tracing::debug!(account_number, bank_code, "Simulating account resolution");

		if account_number == self.config.failure_account {
			return Err(DisbursementError::AccountNotFound);
		}
		Ok(ResolvedAccount {
			account_name: self.config.account_name.clone(),
			account_number: account_number.to_string(),
		})
	}
}

/// Registry for the simulated provider.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "simulated";
	type Factory = DisbursementFactory;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn DisbursementInterface>, DisbursementError> {
			let simulated_config: SimulatedConfig = config.clone().try_into().map_err(|e| {
				DisbursementError::Configuration(format!("Invalid simulated config: {}", e))
			})?;

			Ok(Box::new(SimulatedProvider::new(simulated_config)))
		}
	}
}

impl DisbursementRegistry for Registry {}
