//! Configuration module for the off-ramp bridge.
//!
//! Configuration is a single TOML file. Values may reference environment
//! variables with `${VAR}` or `${VAR:-default}`; references are resolved
//! before parsing so credentials such as the indexer API key never have to
//! be written to disk. The parsed configuration is validated before use.

use offramp_types::ChainKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use thiserror::Error;

#[cfg(any(test, feature = "testing"))]
pub mod builders;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default rendering echoes the whole input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the bridge.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this bridge instance.
	pub service: ServiceConfig,
	/// Chains payments can be confirmed on.
	pub confirmation: ConfirmationConfig,
	/// Payment validation settings.
	#[serde(default)]
	pub payments: PaymentsConfig,
	/// Payout providers.
	pub disbursement: DisbursementConfig,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Instance name used in logs.
	pub id: String,
}

/// Chain client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfirmationConfig {
	/// Chain used when a payment request does not name one.
	pub default_chain: ChainKind,
	/// Map of chain implementation names to their raw TOML tables.
	///
	/// Each table carries the client settings plus the optional polling
	/// overrides `poll_interval_ms`, `poll_timeout_ms`, `max_network_retries`
	/// and `request_timeout_ms`.
	pub implementations: HashMap<String, toml::Value>,
}

/// Payment validation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentsConfig {
	/// Bank display name to bank code.
	#[serde(default = "default_banks")]
	pub banks: BTreeMap<String, String>,
	/// Refuse references whose payout already succeeded in this process.
	#[serde(default)]
	pub reject_replayed_references: bool,
}

impl Default for PaymentsConfig {
	fn default() -> Self {
		Self {
			banks: default_banks(),
			reject_replayed_references: false,
		}
	}
}

/// Returns the banks supported out of the box.
pub fn default_banks() -> BTreeMap<String, String> {
	[
		("GTBank", "058"),
		("Zenith Bank", "057"),
		("Access Bank", "044"),
		("UBA", "033"),
	]
	.into_iter()
	.map(|(name, code)| (name.to_string(), code.to_string()))
	.collect()
}

/// Payout provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisbursementConfig {
	/// Which implementation executes payouts.
	pub primary: String,
	/// Map of provider implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Upper bound on a whole request, including confirmation polling.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// CORS configuration; permissive when absent.
	pub cors: Option<CorsConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	pub allowed_origins: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// The rollup may poll for a full minute, so leave headroom above that.
fn default_api_timeout() -> u64 {
	90
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, or with the text after
/// `:-` in `${VAR_NAME:-default}` when the variable is unset. Input is
/// limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				}
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read config file {}: {}", path, e),
			))
		})?;
		let config: Config = content.parse()?;
		tracing::debug!(
			chains = config.confirmation.implementations.len(),
			"Loaded configuration from {}",
			path
		);
		Ok(config)
	}

	/// Returns the raw TOML table of a configured chain.
	pub fn chain_config(&self, chain: ChainKind) -> Option<&toml::Value> {
		self.confirmation.implementations.get(chain.as_str())
	}

	/// Validates the configuration.
	///
	/// - service id is not empty
	/// - at least one chain is configured, every chain name is known, and the
	///   default chain is among them
	/// - polling overrides are positive and the timeout covers one interval
	/// - the bank table is not empty and has no blank codes
	/// - the primary payout provider is configured
	/// - with the API enabled, its request timeout outlasts every chain's
	///   polling window plus one request
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.confirmation.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one confirmation implementation must be configured".into(),
			));
		}
		for (name, table) in &self.confirmation.implementations {
			ChainKind::from_str(name)
				.map_err(|e| ConfigError::Validation(format!("confirmation.implementations: {}", e)))?;
			validate_polling(name, table)?;
		}
		if self.chain_config(self.confirmation.default_chain).is_none() {
			return Err(ConfigError::Validation(format!(
				"Default chain '{}' not found in confirmation.implementations",
				self.confirmation.default_chain
			)));
		}

		if self.payments.banks.is_empty() {
			return Err(ConfigError::Validation(
				"At least one bank must be configured in payments.banks".into(),
			));
		}
		if let Some((name, _)) = self
			.payments
			.banks
			.iter()
			.find(|(_, code)| code.trim().is_empty())
		{
			return Err(ConfigError::Validation(format!(
				"Bank '{}' has an empty bank code",
				name
			)));
		}

		if !self
			.disbursement
			.implementations
			.contains_key(&self.disbursement.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary disbursement '{}' not found in implementations",
				self.disbursement.primary
			)));
		}

		if let Some(api) = self.api.as_ref().filter(|api| api.enabled) {
			if api.timeout_seconds == 0 {
				return Err(ConfigError::Validation(
					"api.timeout_seconds must be greater than 0".into(),
				));
			}
			// A request that times out first would cut confirmation polling short.
			let request_budget_ms = api.timeout_seconds.saturating_mul(1000);
			for (name, table) in &self.confirmation.implementations {
				let chain = ChainKind::from_str(name)
					.map_err(|e| ConfigError::Validation(e.to_string()))?;
				let poll_ms = effective_ms(table, "poll_timeout_ms", chain.default_poll_timeout_ms());
				let request_ms =
					effective_ms(table, "request_timeout_ms", chain.default_request_timeout_ms());
				let polling_ms = poll_ms.saturating_add(request_ms);
				if request_budget_ms <= polling_ms {
					return Err(ConfigError::Validation(format!(
						"api.timeout_seconds ({}s) must exceed the {} polling window plus one request ({}ms)",
						api.timeout_seconds, name, polling_ms
					)));
				}
			}
		}

		Ok(())
	}
}

/// Value of a millisecond override, or `default` when unset.
fn effective_ms(table: &toml::Value, key: &str, default: u64) -> u64 {
	table
		.get(key)
		.and_then(toml::Value::as_integer)
		.and_then(|v| u64::try_from(v).ok())
		.unwrap_or(default)
}

/// Checks the optional polling overrides of one chain table.
fn validate_polling(name: &str, table: &toml::Value) -> Result<(), ConfigError> {
	let field = |key: &str| -> Result<Option<i64>, ConfigError> {
		match table.get(key) {
			None => Ok(None),
			Some(value) => value.as_integer().map(Some).ok_or_else(|| {
				ConfigError::Validation(format!("{}.{} must be an integer", name, key))
			}),
		}
	};

	let interval = field("poll_interval_ms")?;
	let timeout = field("poll_timeout_ms")?;

	if matches!(interval, Some(i) if i <= 0) {
		return Err(ConfigError::Validation(format!(
			"{}.poll_interval_ms must be greater than 0",
			name
		)));
	}
	if matches!(timeout, Some(t) if t <= 0) {
		return Err(ConfigError::Validation(format!(
			"{}.poll_timeout_ms must be greater than 0",
			name
		)));
	}
	if let (Some(interval), Some(timeout)) = (interval, timeout) {
		if timeout < interval {
			return Err(ConfigError::Validation(format!(
				"{}.poll_timeout_ms ({}) must not be shorter than poll_interval_ms ({})",
				name, timeout, interval
			)));
		}
	}
	for key in ["max_network_retries", "request_timeout_ms"] {
		if matches!(field(key)?, Some(v) if v < 0) {
			return Err(ConfigError::Validation(format!(
				"{}.{} cannot be negative",
				name, key
			)));
		}
	}

	Ok(())
}

/// Parses, resolves and validates a configuration string.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
