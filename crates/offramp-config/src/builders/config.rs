//! Configuration builder for tests and local development.

use crate::{
	default_banks, ApiConfig, Config, ConfirmationConfig, DisbursementConfig, PaymentsConfig,
	ServiceConfig,
};
use offramp_types::ChainKind;
use std::collections::HashMap;

/// Builder for `Config` with defaults suited to tests.
///
/// The default chain tables point at unroutable local addresses and use
/// short polling windows.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	default_chain: ChainKind,
	chains: HashMap<String, toml::Value>,
	reject_replayed_references: bool,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		let mut chains = HashMap::new();
		chains.insert(
			ChainKind::Aptos.as_str().to_string(),
			toml::Value::Table(toml::toml! {
				network = "testnet"
				base_url = "http://127.0.0.1:9/v1"
				api_key = "test-key"
				poll_interval_ms = 100
				poll_timeout_ms = 300
			}),
		);
		Self {
			service_id: "offramp-test".to_string(),
			default_chain: ChainKind::Aptos,
			chains,
			reject_replayed_references: false,
			api: None,
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	pub fn default_chain(mut self, chain: ChainKind) -> Self {
		self.default_chain = chain;
		self
	}

	/// Replaces the table of one chain.
	pub fn chain(mut self, chain: ChainKind, table: toml::Value) -> Self {
		self.chains.insert(chain.as_str().to_string(), table);
		self
	}

	pub fn reject_replayed_references(mut self, reject: bool) -> Self {
		self.reject_replayed_references = reject;
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		let mut disbursement_implementations = HashMap::new();
		disbursement_implementations.insert(
			"simulated".to_string(),
			toml::Value::Table(toml::Table::new()),
		);

		Config {
			service: ServiceConfig {
				id: self.service_id,
			},
			confirmation: ConfirmationConfig {
				default_chain: self.default_chain,
				implementations: self.chains,
			},
			payments: PaymentsConfig {
				banks: default_banks(),
				reject_replayed_references: self.reject_replayed_references,
			},
			disbursement: DisbursementConfig {
				primary: "simulated".to_string(),
				implementations: disbursement_implementations,
			},
			api: self.api,
		}
	}
}
