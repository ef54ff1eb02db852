//! Builder for wiring a `PaymentOrchestrator` from configuration.
//!
//! Every chain listed under `[confirmation.implementations]` and every
//! provider under `[disbursement.implementations]` is instantiated with the
//! factory registered under the same name. A configured implementation with
//! no factory, or a factory that rejects its table, fails the build.

use crate::banks::BankDirectory;
use crate::guard::ReferenceGuard;
use crate::orchestrator::PaymentOrchestrator;
use offramp_config::Config;
use offramp_confirmation::{build_poller, ChainQueryFactory, ConfirmationService};
use offramp_disbursement::{DisbursementFactory, DisbursementService};
use offramp_types::ChainKind;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by implementation name.
#[derive(Default)]
pub struct BridgeFactories {
	pub chain_factories: HashMap<String, ChainQueryFactory>,
	pub disbursement_factories: HashMap<String, DisbursementFactory>,
}

pub struct BridgeBuilder {
	config: Config,
}

impl BridgeBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub fn build(self, factories: BridgeFactories) -> Result<PaymentOrchestrator, BuilderError> {
		let mut pollers = HashMap::new();
		for (name, table) in &self.config.confirmation.implementations {
			let chain = ChainKind::from_str(name)
				.map_err(|e| BuilderError::Config(e.to_string()))?;
			let factory = factories
				.chain_factories
				.get(name)
				.ok_or_else(|| BuilderError::MissingComponent(format!("chain implementation '{}'", name)))?;

			let poller = build_poller(*factory, table).map_err(|e| {
				tracing::error!(
					component = "confirmation",
					implementation = %name,
					error = %e,
					"Failed to create chain client"
				);
				BuilderError::Config(format!("Failed to create chain client '{}': {}", name, e))
			})?;
			let policy = poller.policy();
			tracing::info!(
				component = "confirmation",
				implementation = %name,
				poll_interval_ms = policy.poll_interval.as_millis() as u64,
				poll_timeout_ms = policy.poll_timeout.as_millis() as u64,
				max_network_retries = policy.max_network_retries,
				"Loaded"
			);
			pollers.insert(chain, poller);
		}

		let default_chain = self.config.confirmation.default_chain;
		let confirmation = ConfirmationService::new(pollers, default_chain)
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		let mut providers = HashMap::new();
		for (name, table) in &self.config.disbursement.implementations {
			let factory = factories.disbursement_factories.get(name).ok_or_else(|| {
				BuilderError::MissingComponent(format!("disbursement implementation '{}'", name))
			})?;
			let provider = factory(table).map_err(|e| {
				tracing::error!(
					component = "disbursement",
					implementation = %name,
					error = %e,
					"Failed to create disbursement provider"
				);
				BuilderError::Config(format!(
					"Failed to create disbursement provider '{}': {}",
					name, e
				))
			})?;
			let is_primary = &self.config.disbursement.primary == name;
			tracing::info!(component = "disbursement", implementation = %name, enabled = %is_primary, "Loaded");
			providers.insert(name.clone(), provider);
		}

		let disbursement = DisbursementService::new(providers, &self.config.disbursement.primary)
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		let banks = BankDirectory::new(self.config.payments.banks.clone());
		if banks.is_empty() {
			return Err(BuilderError::Config("No banks configured".into()));
		}

		Ok(PaymentOrchestrator::new(
			Arc::new(confirmation),
			Arc::new(disbursement),
			banks,
			ReferenceGuard::new(self.config.payments.reject_replayed_references),
		))
	}
}

impl BridgeFactories {
	/// Every built-in chain client and disbursement provider.
	pub fn builtin() -> Self {
		Self {
			chain_factories: offramp_confirmation::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			disbursement_factories: offramp_disbursement::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use offramp_config::builders::ConfigBuilder;

	#[test]
	fn test_build_with_builtin_factories() {
		let config = ConfigBuilder::new().build();
		let orchestrator = BridgeBuilder::new(config).build(BridgeFactories::builtin());
		assert!(orchestrator.is_ok());
	}

	#[test]
	fn test_missing_factory_fails() {
		let config = ConfigBuilder::new().build();
		let result = BridgeBuilder::new(config).build(BridgeFactories::default());
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}

	#[test]
	fn test_invalid_chain_table_fails() {
		let config = ConfigBuilder::new()
			.chain(
				ChainKind::Aptos,
				toml::Value::Table(toml::toml! { network = "testnet" }),
			)
			.build();
		let result = BridgeBuilder::new(config).build(BridgeFactories::builtin());
		assert!(matches!(result, Err(BuilderError::Config(msg)) if msg.contains("aptos")));
	}
}
