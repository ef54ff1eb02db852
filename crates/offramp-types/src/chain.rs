//! Chain identifiers and transaction references.
//!
//! The bridge accepts payments on two chains: an account-based chain whose
//! transactions are looked up through a REST indexer, and a rollup whose
//! receipts are read over JSON-RPC. A `TransactionReference` is whatever
//! identifier the client's wallet produced when it submitted the transfer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chains the bridge can confirm payments on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
	/// Account-based chain queried through the Nodit REST indexer.
	Aptos,
	/// Rollup queried through a JSON-RPC receipt endpoint.
	Starknet,
}

impl ChainKind {
	/// Name used for the chain in configuration files and request bodies.
	pub fn as_str(&self) -> &'static str {
		match self {
			ChainKind::Aptos => "aptos",
			ChainKind::Starknet => "starknet",
		}
	}

	/// Polling window when the chain table sets no `poll_timeout_ms`.
	pub fn default_poll_timeout_ms(&self) -> u64 {
		match self {
			ChainKind::Aptos => 6_000,
			ChainKind::Starknet => 60_000,
		}
	}

	/// Per-request HTTP timeout when the chain table sets no `request_timeout_ms`.
	pub fn default_request_timeout_ms(&self) -> u64 {
		match self {
			ChainKind::Aptos => 2_000,
			ChainKind::Starknet => 5_000,
		}
	}
}

impl fmt::Display for ChainKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when a chain name is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unsupported chain: {0}")]
pub struct UnknownChain(pub String);

impl FromStr for ChainKind {
	type Err = UnknownChain;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"aptos" => Ok(ChainKind::Aptos),
			"starknet" => Ok(ChainKind::Starknet),
			other => Err(UnknownChain(other.to_string())),
		}
	}
}

/// Target network for a chain client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	Mainnet,
	#[default]
	Testnet,
}

/// Hash of a blockchain transaction, as supplied by the client.
///
/// The server never generates these. Only `0x`-prefixed hex of at most 256
/// bits is accepted, since the value ends up in indexer URLs and RPC params.
/// The remote API decides whether it names a real transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionReference(String);

impl TransactionReference {
	/// Wraps a client-supplied reference. Returns `None` unless the trimmed
	/// input is a hex identifier.
	pub fn new(reference: impl Into<String>) -> Option<Self> {
		let reference = reference.into();
		let trimmed = reference.trim();
		is_hex_identifier(trimmed).then(|| Self(trimmed.to_string()))
	}

	/// Hex digits without prefix, case or leading zeros. Two references with
	/// the same canonical form name the same transaction.
	pub fn canonical(&self) -> String {
		let significant = self.0[2..].trim_start_matches('0');
		if significant.is_empty() {
			"0x0".to_string()
		} else {
			format!("0x{}", significant.to_ascii_lowercase())
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

/// Longest accepted hex digit run (256 bits).
const MAX_HEX_DIGITS: usize = 64;

/// True for `0x` followed by 1 to 64 hex digits.
pub fn is_hex_identifier(value: &str) -> bool {
	let Some(digits) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) else {
		return false;
	};
	!digits.is_empty() && digits.len() <= MAX_HEX_DIGITS && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

impl fmt::Display for TransactionReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for TransactionReference {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_chain_kind_parsing() {
		assert_eq!("aptos".parse::<ChainKind>(), Ok(ChainKind::Aptos));
		assert_eq!(" StarkNet ".parse::<ChainKind>(), Ok(ChainKind::Starknet));
		assert_eq!(
			"solana".parse::<ChainKind>(),
			Err(UnknownChain("solana".to_string()))
		);
	}

	#[test]
	fn test_transaction_reference_rejects_blank() {
		assert!(TransactionReference::new("").is_none());
		assert!(TransactionReference::new("   ").is_none());

		let reference = TransactionReference::new(" 0xabc ").unwrap();
		assert_eq!(reference.as_str(), "0xabc");
	}

	#[test]
	fn test_transaction_reference_must_be_hex() {
		for bad in [
			"0xdead/../../by_version/1?x=",
			"0xabc?limit=1",
			"abc123",
			"0x",
			"0xg1",
			"0x 1",
		] {
			assert!(TransactionReference::new(bad).is_none(), "{}", bad);
		}
		assert!(TransactionReference::new(format!("0x{}", "f".repeat(65))).is_none());
		assert!(TransactionReference::new(format!("0x{}", "f".repeat(64))).is_some());
		assert!(TransactionReference::new("0XAbC").is_some());
	}

	#[test]
	fn test_canonical_reference() {
		let canonical = |s: &str| TransactionReference::new(s).unwrap().canonical();
		assert_eq!(canonical("0x00ABc"), "0xabc");
		assert_eq!(canonical("0Xabc"), "0xabc");
		assert_eq!(canonical("0x000"), "0x0");
	}
}
