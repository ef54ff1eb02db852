//! Transaction confirmation for the off-ramp bridge.
//!
//! A client pays on-chain and hands the bridge the resulting transaction
//! reference. This crate decides whether that reference names a committed,
//! finalized, successful transaction. It queries the chain's indexer or RPC
//! endpoint repeatedly until the transaction reaches a terminal state or the
//! chain's polling budget is spent.
//!
//! Chain-specific knowledge (endpoint shape, finality rules, error codes)
//! lives behind `ChainQueryInterface`. The retry and backoff loop is written
//! once in `ConfirmationPoller` and shared by every chain.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use offramp_types::{
	ChainKind, ChainMetadata, ConfirmationResult, ImplementationRegistry, TransactionReference,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod policy;
pub mod poller;
mod transport;

/// Re-export implementations
pub mod implementations {
	pub mod aptos;
	pub mod starknet;
}

pub use policy::PollPolicy;
pub use poller::ConfirmationPoller;

/// Errors raised by a single query against a chain endpoint.
///
/// The poller treats each variant differently: network faults are retried
/// with backoff, authorization faults end the loop, rate limits wait longer,
/// and everything else is retried until the deadline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainQueryError {
	/// Timeout, connection failure or 5xx from the endpoint.
	#[error("Network error: {0}")]
	Network(String),
	/// The endpoint rejected our credential (401/403).
	#[error("Unauthorized (HTTP {0})")]
	Unauthorized(u16),
	/// The endpoint asked us to slow down (429).
	#[error("Rate limited by endpoint")]
	RateLimited,
	/// Any other non-success HTTP status.
	#[error("Endpoint returned HTTP {status}: {message}")]
	Rejected { status: u16, message: String },
	/// JSON-RPC error object other than "transaction not found".
	#[error("RPC error {code}: {message}")]
	Rpc { code: i64, message: String },
	/// A response that could not be interpreted (balance lookups).
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// The client could not be built from its configuration.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// What the remote API currently says about a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionStatus {
	/// Not visible yet (mempool propagation) or unknown to the endpoint.
	NotFound,
	/// Visible but not at the finality tier we require.
	Pending { detail: String },
	/// Finalized with a successful execution.
	Succeeded {
		timestamp: Option<DateTime<Utc>>,
		metadata: ChainMetadata,
	},
	/// Finalized with a failing execution. Can never become a success.
	Reverted {
		reason: String,
		timestamp: Option<DateTime<Utc>>,
		metadata: ChainMetadata,
	},
	/// A response shape we do not know how to interpret.
	Unrecognized { description: String },
}

/// Per-chain query interface.
///
/// Implementations translate one endpoint's responses into
/// `TransactionStatus` and its failures into `ChainQueryError`. They hold no
/// per-request state and are shared across requests.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ChainQueryInterface: Send + Sync {
	/// Chain this client talks to.
	fn chain(&self) -> ChainKind;

	/// Polling parameters suited to the chain's block time.
	fn default_policy(&self) -> PollPolicy;

	/// Looks up a transaction once.
	async fn transaction_status(
		&self,
		reference: &TransactionReference,
	) -> Result<TransactionStatus, ChainQueryError>;

	/// Returns an account's balance in the chain's smallest unit.
	async fn get_balance(&self, account: &str) -> Result<String, ChainQueryError>;
}

/// Type alias for chain query factory functions.
pub type ChainQueryFactory = fn(&toml::Value) -> Result<Box<dyn ChainQueryInterface>, ChainQueryError>;

/// Registry trait for chain query implementations.
pub trait ChainQueryRegistry: ImplementationRegistry<Factory = ChainQueryFactory> {}

/// Returns every built-in chain implementation as `(name, factory)`.
pub fn get_all_implementations() -> Vec<(&'static str, ChainQueryFactory)> {
	use implementations::{aptos, starknet};

	vec![
		(aptos::Registry::NAME, aptos::Registry::factory()),
		(starknet::Registry::NAME, starknet::Registry::factory()),
	]
}

/// Errors surfaced by `ConfirmationService`.
#[derive(Debug, Error)]
pub enum ConfirmationError {
	/// No poller is configured for the requested chain.
	#[error("Unsupported chain: {0}")]
	UnsupportedChain(ChainKind),
	/// A query made outside the polling loop failed.
	#[error(transparent)]
	Query(#[from] ChainQueryError),
}

/// One configured poller per chain, built once at startup.
pub struct ConfirmationService {
	pollers: HashMap<ChainKind, ConfirmationPoller>,
	default_chain: ChainKind,
}

impl ConfirmationService {
	/// Creates the service. Fails when the default chain has no poller.
	pub fn new(
		pollers: HashMap<ChainKind, ConfirmationPoller>,
		default_chain: ChainKind,
	) -> Result<Self, ConfirmationError> {
		if !pollers.contains_key(&default_chain) {
			return Err(ConfirmationError::UnsupportedChain(default_chain));
		}
		Ok(Self {
			pollers,
			default_chain,
		})
	}

	pub fn default_chain(&self) -> ChainKind {
		self.default_chain
	}

	pub fn supports(&self, chain: ChainKind) -> bool {
		self.pollers.contains_key(&chain)
	}

	fn poller(&self, chain: Option<ChainKind>) -> Result<&ConfirmationPoller, ConfirmationError> {
		let chain = chain.unwrap_or(self.default_chain);
		self.pollers
			.get(&chain)
			.ok_or(ConfirmationError::UnsupportedChain(chain))
	}

	/// Polls the chain until the transaction is terminal or the chain's timeout elapses.
	pub async fn confirm(
		&self,
		reference: &TransactionReference,
		chain: Option<ChainKind>,
	) -> Result<ConfirmationResult, ConfirmationError> {
		let poller = self.poller(chain)?;
		Ok(poller.confirm(reference).await)
	}

	/// Reads an account balance on the given chain (default chain when `None`).
	pub async fn get_balance(
		&self,
		chain: Option<ChainKind>,
		account: &str,
	) -> Result<String, ConfirmationError> {
		let poller = self.poller(chain)?;
		Ok(poller.query().get_balance(account).await?)
	}
}

/// Builds a poller from an implementation's config table.
///
/// Polling overrides in the table are applied on top of the
/// implementation's default policy.
pub fn build_poller(
	factory: ChainQueryFactory,
	config: &toml::Value,
) -> Result<ConfirmationPoller, ChainQueryError> {
	let query: Arc<dyn ChainQueryInterface> = Arc::from(factory(config)?);
	let policy = query.default_policy().with_overrides(config)?;
	Ok(ConfirmationPoller::new(query, policy))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	struct StaticQuery(ChainKind);

	#[async_trait]
	impl ChainQueryInterface for StaticQuery {
		fn chain(&self) -> ChainKind {
			self.0
		}

		fn default_policy(&self) -> PollPolicy {
			PollPolicy::new(Duration::from_millis(10), Duration::from_millis(50), 1)
		}

		async fn transaction_status(
			&self,
			_reference: &TransactionReference,
		) -> Result<TransactionStatus, ChainQueryError> {
			Ok(TransactionStatus::Succeeded {
				timestamp: None,
				metadata: ChainMetadata::new(),
			})
		}

		async fn get_balance(&self, account: &str) -> Result<String, ChainQueryError> {
			Ok(format!("{}:{}", self.0, account))
		}
	}

	fn service(chains: &[ChainKind], default_chain: ChainKind) -> Result<ConfirmationService, ConfirmationError> {
		let pollers = chains
			.iter()
			.map(|chain| {
				let query: Arc<dyn ChainQueryInterface> = Arc::new(StaticQuery(*chain));
				let policy = query.default_policy();
				(*chain, ConfirmationPoller::new(query, policy))
			})
			.collect();
		ConfirmationService::new(pollers, default_chain)
	}

	#[test]
	fn test_default_chain_must_have_poller() {
		let result = service(&[ChainKind::Aptos], ChainKind::Starknet);
		assert!(matches!(
			result,
			Err(ConfirmationError::UnsupportedChain(ChainKind::Starknet))
		));
	}

	#[tokio::test]
	async fn test_confirm_routes_by_chain() {
		let service = service(&[ChainKind::Aptos], ChainKind::Aptos).unwrap();
		let reference = TransactionReference::new("0xabc").unwrap();

		let result = service.confirm(&reference, None).await.unwrap();
		assert!(result.is_confirmed());

		let unsupported = service.confirm(&reference, Some(ChainKind::Starknet)).await;
		assert!(matches!(
			unsupported,
			Err(ConfirmationError::UnsupportedChain(ChainKind::Starknet))
		));
	}

	#[tokio::test]
	async fn test_balance_uses_requested_chain() {
		let service = service(&[ChainKind::Aptos, ChainKind::Starknet], ChainKind::Aptos).unwrap();
		assert_eq!(service.get_balance(None, "0x1").await.unwrap(), "aptos:0x1");
		assert_eq!(
			service
				.get_balance(Some(ChainKind::Starknet), "0x2")
				.await
				.unwrap(),
			"starknet:0x2"
		);
	}

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["aptos", "starknet"]);
	}
}
