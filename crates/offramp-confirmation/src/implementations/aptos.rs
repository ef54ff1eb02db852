//! Account-based chain client backed by the Nodit REST indexer.
//!
//! Transactions are read from `GET {base}/transactions/by_hash/{hash}`. The
//! indexer answers 404 while a freshly submitted transaction propagates, a
//! `pending_transaction` while it sits in the mempool, and a
//! `user_transaction` once it is committed. Committed transactions are final
//! on this chain, so a committed success is a confirmation.

use crate::transport::{build_client, check_status, request_error};
use crate::{
	ChainQueryError, ChainQueryFactory, ChainQueryInterface, ChainQueryRegistry, PollPolicy,
	TransactionStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use offramp_types::{
	ChainKind, ChainMetadata, ImplementationRegistry, Network, SecretString, TransactionReference,
};
use serde::Deserialize;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

/// Resource type of the native coin store of an account.
const COIN_STORE_RESOURCE: &str = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>";

/// Configuration for the indexer client.
#[derive(Debug, Clone, Deserialize)]
pub struct AptosQueryConfig {
	/// Selects the indexer base URL.
	#[serde(default)]
	pub network: Network,
	/// Overrides the network-derived base URL.
	#[serde(default)]
	pub base_url: Option<String>,
	/// Sent as `X-API-KEY` on every request.
	pub api_key: SecretString,
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
	ChainKind::Aptos.default_request_timeout_ms()
}

impl AptosQueryConfig {
	fn resolved_base_url(&self) -> String {
		match &self.base_url {
			Some(url) => url.trim_end_matches('/').to_string(),
			None => match self.network {
				Network::Mainnet => "https://aptos-mainnet.nodit.io/v1".to_string(),
				Network::Testnet => "https://aptos-testnet.nodit.io/v1".to_string(),
			},
		}
	}
}

/// REST indexer client.
pub struct AptosQuery {
	client: reqwest::Client,
	base_url: Url,
	api_key: SecretString,
}

impl AptosQuery {
	pub fn new(config: AptosQueryConfig) -> Result<Self, ChainQueryError> {
		if config.api_key.is_empty() {
			return Err(ChainQueryError::Configuration(
				"api_key is required for the aptos indexer".to_string(),
			));
		}
		let base_url = Url::parse(&config.resolved_base_url())
			.ok()
			.filter(|url| !url.cannot_be_a_base())
			.ok_or_else(|| {
				ChainQueryError::Configuration(format!(
					"Invalid aptos base_url: {}",
					config.resolved_base_url()
				))
			})?;
		let client = build_client(Duration::from_millis(config.request_timeout_ms))?;
		Ok(Self {
			client,
			base_url,
			api_key: config.api_key,
		})
	}

	/// Appends `segments` to the base URL. Each segment is percent-encoded,
	/// so `/`, `?` and `#` in client input cannot change the endpoint.
	fn endpoint(&self, segments: &[&str]) -> Url {
		let mut url = self.base_url.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}
		url
	}

	async fn get(&self, url: Url) -> Result<(u16, String), ChainQueryError> {
		let response = self
			.client
			.get(url)
			.header("X-API-KEY", self.api_key.expose_secret())
			.header("accept", "application/json")
			.send()
			.await
			.map_err(request_error)?;

		let status = response.status().as_u16();
		let body = response.text().await.map_err(request_error)?;
		Ok((status, body))
	}
}

#[async_trait]
impl ChainQueryInterface for AptosQuery {
	fn chain(&self) -> ChainKind {
		ChainKind::Aptos
	}

	fn default_policy(&self) -> PollPolicy {
		PollPolicy::new(
			Duration::from_millis(2000),
			Duration::from_millis(ChainKind::Aptos.default_poll_timeout_ms()),
			3,
		)
	}

	async fn transaction_status(
		&self,
		reference: &TransactionReference,
	) -> Result<TransactionStatus, ChainQueryError> {
		let url = self.endpoint(&["transactions", "by_hash", reference.as_str()]);
		let (status, body) = self.get(url).await?;
		if status == 404 {
			return Ok(TransactionStatus::NotFound);
		}
		check_status(status, &body)?;

		match serde_json::from_str::<Value>(&body) {
			Ok(value) => Ok(classify_transaction(&value)),
			Err(e) => Ok(TransactionStatus::Unrecognized {
				description: format!("Malformed indexer response: {}", e),
			}),
		}
	}

	async fn get_balance(&self, account: &str) -> Result<String, ChainQueryError> {
		let url = self.endpoint(&["accounts", account, "resource", COIN_STORE_RESOURCE]);
		let (status, body) = self.get(url).await?;
		if status == 404 {
			// Accounts without a coin store hold nothing.
			return Ok("0".to_string());
		}
		check_status(status, &body)?;

		let value: Value = serde_json::from_str(&body)
			.map_err(|e| ChainQueryError::InvalidResponse(e.to_string()))?;
		value
			.pointer("/data/coin/value")
			.and_then(Value::as_str)
			.map(str::to_string)
			.ok_or_else(|| {
				ChainQueryError::InvalidResponse("coin store without data.coin.value".to_string())
			})
	}
}

/// Maps an indexer transaction body to a status.
pub fn classify_transaction(txn: &Value) -> TransactionStatus {
	let kind = txn.get("type").and_then(Value::as_str).unwrap_or("unknown");

	match kind {
		"pending_transaction" => TransactionStatus::Pending {
			detail: kind.to_string(),
		},
		"user_transaction" => {
			let timestamp = txn.get("timestamp").and_then(parse_micros);
			let metadata = collect_metadata(txn);
			match txn.get("success").and_then(Value::as_bool) {
				Some(true) => TransactionStatus::Succeeded {
					timestamp,
					metadata,
				},
				Some(false) => {
					let vm_status = txn
						.get("vm_status")
						.and_then(Value::as_str)
						.filter(|s| !s.is_empty())
						.unwrap_or("Unknown VM error");
					TransactionStatus::Reverted {
						reason: format!("Transaction failed on-chain: {}", vm_status),
						timestamp,
						metadata,
					}
				},
				None => TransactionStatus::Unrecognized {
					description: "User transaction without a success flag".to_string(),
				},
			}
		},
		other => TransactionStatus::Unrecognized {
			description: format!("Unexpected transaction type: {}", other),
		},
	}
}

fn collect_metadata(txn: &Value) -> ChainMetadata {
	["version", "gas_used", "vm_status"]
		.into_iter()
		.filter_map(|key| txn.get(key).map(|v| (key.to_string(), v.clone())))
		.collect()
}

/// Indexer timestamps are microseconds since the epoch, encoded as strings.
fn parse_micros(value: &Value) -> Option<DateTime<Utc>> {
	let micros = match value {
		Value::String(s) => s.parse::<i64>().ok()?,
		Value::Number(n) => n.as_i64()?,
		_ => return None,
	};
	DateTime::from_timestamp_micros(micros)
}

/// Registry for the aptos indexer client.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "aptos";
	type Factory = ChainQueryFactory;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn ChainQueryInterface>, ChainQueryError> {
			let aptos_config: AptosQueryConfig = config
				.clone()
				.try_into()
				.map_err(|e| ChainQueryError::Configuration(format!("Invalid aptos config: {}", e)))?;

			Ok(Box::new(AptosQuery::new(aptos_config)?))
		}
	}
}

impl ChainQueryRegistry for Registry {}
