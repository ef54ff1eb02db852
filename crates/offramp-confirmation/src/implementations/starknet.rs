//! Rollup chain client backed by a Starknet JSON-RPC endpoint.
//!
//! Receipts are read with `starknet_getTransactionReceipt`. A receipt carries
//! two independent fields: `finality_status` (how far the transaction has
//! progressed towards finality) and `execution_status` (whether it ran
//! successfully). Only a receipt at an accepted finality tier resolves the
//! loop; everything earlier is pending.

use crate::transport::{build_client, check_status, request_error};
use crate::{
	ChainQueryError, ChainQueryFactory, ChainQueryInterface, ChainQueryRegistry, PollPolicy,
	TransactionStatus,
};
use alloy_primitives::U256;
use async_trait::async_trait;
use offramp_types::{ChainKind, ChainMetadata, ImplementationRegistry, TransactionReference};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// JSON-RPC error code for an unknown transaction hash.
const TXN_HASH_NOT_FOUND: i64 = 29;

/// `sn_keccak("balanceOf")`
const BALANCE_OF_SELECTOR: &str =
	"0x2e4263afad30923c891518314c3c95dbe830a16874e8abc5777a9a20b54c76e";

/// Finality tiers that are visible but not yet accepted.
const PENDING_FINALITY: [&str; 4] = ["RECEIVED", "PENDING", "PRE_CONFIRMED", "ACCEPTED_ON_L1"];

/// Configuration for the JSON-RPC client.
#[derive(Debug, Clone, Deserialize)]
pub struct StarknetQueryConfig {
	#[serde(default = "default_rpc_url")]
	pub rpc_url: String,
	/// Finality tiers treated as final enough to resolve.
	#[serde(default = "default_accepted_finality")]
	pub accepted_finality: Vec<String>,
	/// ERC-20 contract used for balance lookups.
	#[serde(default = "default_usdc_contract")]
	pub usdc_contract: String,
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
}

fn default_rpc_url() -> String {
	"https://starknet-mainnet.public.blastapi.io/rpc/v0_8".to_string()
}

fn default_accepted_finality() -> Vec<String> {
	vec!["ACCEPTED_ON_L2".to_string()]
}

fn default_usdc_contract() -> String {
	"0x053c91253bc9682c04929ca02ed00b3e423f6710d2ee7e0d5ebb06f3ecf368a8".to_string()
}

fn default_request_timeout_ms() -> u64 {
	ChainKind::Starknet.default_request_timeout_ms()
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
	code: i64,
	#[serde(default)]
	message: String,
}

pub struct StarknetQuery {
	client: reqwest::Client,
	config: StarknetQueryConfig,
}

impl StarknetQuery {
	pub fn new(config: StarknetQueryConfig) -> Result<Self, ChainQueryError> {
		if config.accepted_finality.is_empty() {
			return Err(ChainQueryError::Configuration(
				"accepted_finality must name at least one finality status".to_string(),
			));
		}
		let client = build_client(Duration::from_millis(config.request_timeout_ms))?;
		Ok(Self { client, config })
	}

	async fn call(&self, method: &str, params: Value) -> Result<RpcResponse, ChainQueryError> {
		let payload = json!({
			"jsonrpc": "2.0",
			"id": 1,
			"method": method,
			"params": params,
		});

		let response = self
			.client
			.post(&self.config.rpc_url)
			.json(&payload)
			.send()
			.await
			.map_err(request_error)?;

		let status = response.status().as_u16();
		let body = response.text().await.map_err(request_error)?;
		check_status(status, &body)?;

		serde_json::from_str(&body).map_err(|e| ChainQueryError::InvalidResponse(e.to_string()))
	}
}

#[async_trait]
impl ChainQueryInterface for StarknetQuery {
	fn chain(&self) -> ChainKind {
		ChainKind::Starknet
	}

	fn default_policy(&self) -> PollPolicy {
		PollPolicy::new(
			Duration::from_millis(3000),
			Duration::from_millis(ChainKind::Starknet.default_poll_timeout_ms()),
			3,
		)
	}

	async fn transaction_status(
		&self,
		reference: &TransactionReference,
	) -> Result<TransactionStatus, ChainQueryError> {
		let response = match self
			.call(
				"starknet_getTransactionReceipt",
				json!({ "transaction_hash": reference.as_str() }),
			)
			.await
		{
			Ok(response) => response,
			Err(ChainQueryError::InvalidResponse(e)) => {
				return Ok(TransactionStatus::Unrecognized {
					description: format!("Malformed RPC response: {}", e),
				})
			},
			Err(e) => return Err(e),
		};

		if let Some(error) = response.error {
			return classify_rpc_error(error.code, &error.message);
		}
		match response.result {
			Some(receipt) => Ok(classify_receipt(&receipt, &self.config.accepted_finality)),
			None => Ok(TransactionStatus::Unrecognized {
				description: "RPC response without result or error".to_string(),
			}),
		}
	}

	async fn get_balance(&self, account: &str) -> Result<String, ChainQueryError> {
		let response = self
			.call(
				"starknet_call",
				json!({
					"request": {
						"contract_address": self.config.usdc_contract,
						"entry_point_selector": BALANCE_OF_SELECTOR,
						"calldata": [account],
					},
					"block_id": "latest",
				}),
			)
			.await?;

		if let Some(error) = response.error {
			return Err(ChainQueryError::Rpc {
				code: error.code,
				message: error.message,
			});
		}
		let felts: Vec<String> = response
			.result
			.map(serde_json::from_value::<Vec<String>>)
			.transpose()
			.map_err(|e| ChainQueryError::InvalidResponse(e.to_string()))?
			.unwrap_or_default();
		combine_u256(&felts).map(|balance| balance.to_string())
	}
}

/// Splits RPC errors into "not visible yet" and genuine failures.
pub fn classify_rpc_error(code: i64, message: &str) -> Result<TransactionStatus, ChainQueryError> {
	if code == TXN_HASH_NOT_FOUND
		|| message.contains("TXN_HASH_NOT_FOUND")
		|| message.contains("Transaction hash not found")
	{
		Ok(TransactionStatus::NotFound)
	} else {
		Err(ChainQueryError::Rpc {
			code,
			message: message.to_string(),
		})
	}
}

/// Maps a receipt to a status given the finality tiers that resolve.
pub fn classify_receipt(receipt: &Value, accepted_finality: &[String]) -> TransactionStatus {
	let finality = receipt
		.get("finality_status")
		.and_then(Value::as_str)
		.unwrap_or("");
	let execution = receipt
		.get("execution_status")
		.and_then(Value::as_str)
		.unwrap_or("");

	if accepted_finality.iter().any(|accepted| accepted == finality) {
		let metadata = collect_metadata(receipt);
		if execution == "SUCCEEDED" {
			TransactionStatus::Succeeded {
				timestamp: None,
				metadata,
			}
		} else {
			let reason = receipt
				.get("revert_reason")
				.and_then(Value::as_str)
				.filter(|s| !s.is_empty())
				.unwrap_or("Transaction execution failed");
			TransactionStatus::Reverted {
				reason: format!("Transaction failed: {}", reason),
				timestamp: None,
				metadata,
			}
		}
	} else if PENDING_FINALITY.contains(&finality) {
		TransactionStatus::Pending {
			detail: finality.to_string(),
		}
	} else {
		TransactionStatus::Unrecognized {
			description: format!("Unexpected finality status: {}", finality),
		}
	}
}

fn collect_metadata(receipt: &Value) -> ChainMetadata {
	let mut metadata: ChainMetadata = ["block_number", "finality_status", "execution_status", "actual_fee"]
		.into_iter()
		.filter_map(|key| receipt.get(key).map(|v| (key.to_string(), v.clone())))
		.collect();
	metadata.insert(
		"observed_at".to_string(),
		Value::String(chrono::Utc::now().to_rfc3339()),
	);
	metadata
}

/// Combines the `(low, high)` 128-bit limbs of a Cairo u256.
fn combine_u256(felts: &[String]) -> Result<U256, ChainQueryError> {
	let parse = |felt: &String| {
		felt.parse::<U256>()
			.map_err(|e| ChainQueryError::InvalidResponse(format!("invalid felt {}: {}", felt, e)))
	};
	match felts {
		[low] => parse(low),
		[low, high, ..] => Ok((parse(high)? << 128usize) | parse(low)?),
		[] => Err(ChainQueryError::InvalidResponse(
			"balanceOf returned no values".to_string(),
		)),
	}
}

/// Registry for the starknet JSON-RPC client.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "starknet";
	type Factory = ChainQueryFactory;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn ChainQueryInterface>, ChainQueryError> {
			let starknet_config: StarknetQueryConfig = config.clone().try_into().map_err(|e| {
				ChainQueryError::Configuration(format!("Invalid starknet config: {}", e))
			})?;

			Ok(Box::new(StarknetQuery::new(starknet_config)?))
		}
	}
}

impl ChainQueryRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::test_server::serve;

	fn accepted() -> Vec<String> {
		default_accepted_finality()
	}

	#[test]
	fn test_accepted_success_confirms() {
		let receipt = json!({
			"finality_status": "ACCEPTED_ON_L2",
			"execution_status": "SUCCEEDED",
			"block_number": 1234567,
			"actual_fee": { "amount": "0x1", "unit": "FRI" }
		});
		match classify_receipt(&receipt, &accepted()) {
			TransactionStatus::Succeeded {
				timestamp,
				metadata,
			} => {
				assert!(timestamp.is_none());
				assert_eq!(metadata["block_number"], 1234567);
				assert!(metadata.contains_key("observed_at"));
			},
			other => panic!("unexpected status: {:?}", other),
		}
	}

	#[test]
	fn test_accepted_revert_fails() {
		let receipt = json!({
			"finality_status": "ACCEPTED_ON_L2",
			"execution_status": "REVERTED",
			"revert_reason": "u256_sub Overflow"
		});
		assert!(matches!(
			classify_receipt(&receipt, &accepted()),
			TransactionStatus::Reverted { reason, .. } if reason == "Transaction failed: u256_sub Overflow"
		));

		let receipt = json!({ "finality_status": "ACCEPTED_ON_L2", "execution_status": "REVERTED" });
		assert!(matches!(
			classify_receipt(&receipt, &accepted()),
			TransactionStatus::Reverted { reason, .. } if reason == "Transaction failed: Transaction execution failed"
		));
	}

	#[test]
	fn test_weaker_finality_is_pending() {
		for finality in ["RECEIVED", "PENDING", "PRE_CONFIRMED", "ACCEPTED_ON_L1"] {
			let receipt = json!({ "finality_status": finality, "execution_status": "SUCCEEDED" });
			assert!(matches!(
				classify_receipt(&receipt, &accepted()),
				TransactionStatus::Pending { .. }
			));
		}
	}

	#[test]
	fn test_accepted_finality_is_configurable() {
		let receipt = json!({ "finality_status": "ACCEPTED_ON_L1", "execution_status": "SUCCEEDED" });
		let accepted = vec!["ACCEPTED_ON_L2".to_string(), "ACCEPTED_ON_L1".to_string()];
		assert!(matches!(
			classify_receipt(&receipt, &accepted),
			TransactionStatus::Succeeded { .. }
		));
	}

	#[test]
	fn test_unknown_finality_is_unrecognized() {
		let receipt = json!({ "finality_status": "REJECTED" });
		assert_eq!(
			classify_receipt(&receipt, &accepted()),
			TransactionStatus::Unrecognized {
				description: "Unexpected finality status: REJECTED".to_string()
			}
		);
	}

	#[test]
	fn test_rpc_not_found_errors() {
		assert_eq!(
			classify_rpc_error(29, "Transaction hash not found"),
			Ok(TransactionStatus::NotFound)
		);
		assert_eq!(
			classify_rpc_error(-32000, "TXN_HASH_NOT_FOUND"),
			Ok(TransactionStatus::NotFound)
		);
		assert!(matches!(
			classify_rpc_error(-32602, "Invalid params"),
			Err(ChainQueryError::Rpc { code: -32602, .. })
		));
	}

	#[test]
	fn test_u256_limbs_combine() {
		let felts = vec!["0x5".to_string(), "0x1".to_string()];
		let expected = (U256::from(1u64) << 128usize) + U256::from(5u64);
		assert_eq!(combine_u256(&felts).unwrap(), expected);

		let felts = vec!["0xf4240".to_string(), "0x0".to_string()];
		assert_eq!(combine_u256(&felts).unwrap().to_string(), "1000000");

		assert!(combine_u256(&[]).is_err());
	}

	#[test]
	fn test_config_defaults() {
		let config: StarknetQueryConfig = toml::Value::Table(toml::Table::new()).try_into().unwrap();
		assert_eq!(config.rpc_url, default_rpc_url());
		assert_eq!(config.accepted_finality, vec!["ACCEPTED_ON_L2"]);
		assert_eq!(config.request_timeout_ms, 5000);

		let factory = Registry::factory();
		let empty = toml::Value::Table(toml::toml! { accepted_finality = [] });
		assert!(factory(&empty).is_err());
	}
	fn local_query(url: &str) -> StarknetQuery {
		let mut config: StarknetQueryConfig = toml::Value::Table(toml::Table::new()).try_into().unwrap();
		config.rpc_url = url.to_string();
		StarknetQuery::new(config).unwrap()
	}

	#[tokio::test]
	async fn test_receipt_envelopes() {
		let (url, server) = serve(vec![
			(
				200,
				r#"{"jsonrpc":"2.0","id":1,"error":{"code":29,"message":"Transaction hash not found"}}"#,
			),
			(200, r#"{"jsonrpc":"2.0","id":1}"#),
			(200, "<html>bad gateway</html>"),
			(
				200,
				r#"{"jsonrpc":"2.0","id":1,"result":{"finality_status":"ACCEPTED_ON_L2","execution_status":"SUCCEEDED","block_number":7}}"#,
			),
		])
		.await;
		let query = local_query(&url);
		let reference = TransactionReference::new("0x5a1").unwrap();

		assert_eq!(
			query.transaction_status(&reference).await.unwrap(),
			TransactionStatus::NotFound
		);
		assert_eq!(
			query.transaction_status(&reference).await.unwrap(),
			TransactionStatus::Unrecognized {
				description: "RPC response without result or error".to_string()
			}
		);
		assert!(matches!(
			query.transaction_status(&reference).await.unwrap(),
			TransactionStatus::Unrecognized { description } if description.starts_with("Malformed RPC response")
		));
		assert!(matches!(
			query.transaction_status(&reference).await.unwrap(),
			TransactionStatus::Succeeded { .. }
		));

		let lines = server.await.unwrap();
		assert_eq!(lines.len(), 4);
		assert!(lines.iter().all(|line| line == "POST / HTTP/1.1"));
	}

	#[tokio::test]
	async fn test_rpc_error_other_than_not_found() {
		let (url, _server) = serve(vec![(
			200,
			r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid params"}}"#,
		)])
		.await;
		let query = local_query(&url);
		let reference = TransactionReference::new("0x5a1").unwrap();

		assert_eq!(
			query.transaction_status(&reference).await,
			Err(ChainQueryError::Rpc {
				code: -32602,
				message: "Invalid params".to_string()
			})
		);
	}
}
