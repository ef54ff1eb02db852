//! Chain-agnostic confirmation loop.
//!
//! Queries a chain endpoint until the transaction reaches a terminal state or
//! the policy's timeout elapses. Only a finalized, successful transaction
//! reported by the endpoint produces a `Confirmed` verdict; absence of
//! errors never does.

use crate::{ChainQueryError, ChainQueryInterface, PollPolicy, TransactionStatus};
use offramp_types::{truncate_id, ConfirmationResult, TransactionReference};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::instrument;

/// Confirmation loop bound to one chain client and its policy.
///
/// Holds no per-request state; every call to `confirm` owns its own
/// counters and timers, so one poller serves concurrent requests.
#[derive(Clone)]
pub struct ConfirmationPoller {
	query: Arc<dyn ChainQueryInterface>,
	policy: PollPolicy,
}

/// Bookkeeping of a single `confirm` call.
#[derive(Default)]
struct PollState {
	attempts: u32,
	network_retries: u32,
	observed_pending: bool,
	observed_not_found: bool,
	last_diagnostic: Option<String>,
}

impl ConfirmationPoller {
	pub fn new(query: Arc<dyn ChainQueryInterface>, policy: PollPolicy) -> Self {
		Self { query, policy }
	}

	pub fn policy(&self) -> &PollPolicy {
		&self.policy
	}

	pub fn query(&self) -> &Arc<dyn ChainQueryInterface> {
		&self.query
	}

	/// Polls until the transaction is terminal or the timeout elapses.
	///
	/// Attempts are strictly sequential. Every sleep is clamped to the
	/// remaining budget.
	#[instrument(skip_all, fields(chain = %self.query.chain(), tx_hash = %truncate_id(reference.as_str())))]
	pub async fn confirm(&self, reference: &TransactionReference) -> ConfirmationResult {
		let started = Instant::now();
		let interval = self.policy.poll_interval;
		let mut state = PollState::default();

		loop {
			if started.elapsed() >= self.policy.poll_timeout {
				return self.deadline_result(state);
			}

			state.attempts += 1;
			let delay = match self.query.transaction_status(reference).await {
				Ok(status) => {
					state.network_retries = 0;
					state.last_diagnostic = None;
					match status {
						TransactionStatus::Succeeded {
							timestamp,
							metadata,
						} => {
							tracing::info!(
								attempt = state.attempts,
								elapsed_ms = started.elapsed().as_millis() as u64,
								"Transaction confirmed"
							);
							return ConfirmationResult::confirmed(timestamp, metadata);
						},
						TransactionStatus::Reverted {
							reason,
							timestamp,
							metadata,
						} => {
							tracing::warn!(reason = %reason, "Transaction failed on-chain");
							return ConfirmationResult::failed(reason, timestamp, metadata);
						},
						TransactionStatus::Unrecognized { description } => {
							tracing::warn!(description = %description, "Unrecognized transaction response");
							return ConfirmationResult::failed(description, None, Default::default());
						},
						TransactionStatus::Pending { detail } => {
							state.observed_pending = true;
							tracing::debug!(attempt = state.attempts, detail = %detail, "Transaction pending");
							interval
						},
						TransactionStatus::NotFound => {
							state.observed_not_found = true;
							tracing::debug!(attempt = state.attempts, "Transaction not visible yet");
							interval
						},
					}
				},
				Err(ChainQueryError::Unauthorized(status)) => {
					tracing::error!(status, "Chain endpoint rejected the API credential");
					return ConfirmationResult::failed(
						format!("Invalid API key or insufficient permissions (HTTP {})", status),
						None,
						Default::default(),
					);
				},
				Err(ChainQueryError::RateLimited) => {
					tracing::warn!(attempt = state.attempts, "Rate limited, backing off");
					state.last_diagnostic = Some(ChainQueryError::RateLimited.to_string());
					interval * 2
				},
				Err(err @ ChainQueryError::Network(_)) => {
					state.network_retries += 1;
					state.last_diagnostic = Some(err.to_string());
					if state.network_retries <= self.policy.max_network_retries {
						tracing::warn!(
							retry = state.network_retries,
							max_retries = self.policy.max_network_retries,
							error = %err,
							"Network error, retrying"
						);
						interval * state.network_retries
					} else {
						tracing::warn!(error = %err, "Network retries exhausted, polling until timeout");
						interval
					}
				},
				Err(err) => {
					tracing::warn!(attempt = state.attempts, error = %err, "Error checking transaction status");
					state.last_diagnostic = Some(err.to_string());
					interval
				},
			};

			let remaining = self.policy.poll_timeout.saturating_sub(started.elapsed());
			tokio::time::sleep(delay.min(remaining)).await;
		}
	}

	fn deadline_result(&self, state: PollState) -> ConfirmationResult {
		let diagnostic = state.last_diagnostic.unwrap_or_else(|| {
			format!(
				"Transaction confirmation timeout after {}",
				self.policy.timeout_label()
			)
		});
		tracing::warn!(attempts = state.attempts, diagnostic = %diagnostic, "Confirmation deadline reached");

		if state.observed_not_found && !state.observed_pending {
			ConfirmationResult::not_found(diagnostic)
		} else {
			ConfirmationResult::timed_out(diagnostic)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use offramp_types::{ChainKind, ChainMetadata, ConfirmationOutcome};
	use std::collections::VecDeque;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;
	use std::time::Duration;

	type Step = Result<TransactionStatus, ChainQueryError>;

	/// Replays scripted responses, repeating the last one forever.
	struct ScriptedQuery {
		steps: Mutex<VecDeque<Step>>,
		last: Mutex<Option<Step>>,
		calls: AtomicUsize,
	}

	impl ScriptedQuery {
		fn new(steps: Vec<Step>) -> Arc<Self> {
			Arc::new(Self {
				steps: Mutex::new(steps.into()),
				last: Mutex::new(None),
				calls: AtomicUsize::new(0),
			})
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl ChainQueryInterface for ScriptedQuery {
		fn chain(&self) -> ChainKind {
			ChainKind::Aptos
		}

		fn default_policy(&self) -> PollPolicy {
			policy(6, 3)
		}

		async fn transaction_status(
			&self,
			_reference: &TransactionReference,
		) -> Result<TransactionStatus, ChainQueryError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			let next = self.steps.lock().unwrap().pop_front();
			let mut last = self.last.lock().unwrap();
			match next {
				Some(step) => {
					*last = Some(step.clone());
					step
				},
				None => last.clone().expect("script must not be empty"),
			}
		}

		async fn get_balance(&self, _account: &str) -> Result<String, ChainQueryError> {
			Ok("0".to_string())
		}
	}

	fn policy(timeout_secs: u64, retries: u32) -> PollPolicy {
		PollPolicy::new(
			Duration::from_secs(2),
			Duration::from_secs(timeout_secs),
			retries,
		)
	}

	fn reference() -> TransactionReference {
		TransactionReference::new("0xfeedbeef00112233").unwrap()
	}

	fn succeeded() -> Step {
		let mut metadata = ChainMetadata::new();
		metadata.insert("version".to_string(), serde_json::json!("42"));
		Ok(TransactionStatus::Succeeded {
			timestamp: None,
			metadata,
		})
	}

	fn pending() -> Step {
		Ok(TransactionStatus::Pending {
			detail: "pending_transaction".to_string(),
		})
	}

	fn network() -> Step {
		Err(ChainQueryError::Network("connection reset".to_string()))
	}

	async fn run(query: Arc<ScriptedQuery>, policy: PollPolicy) -> (ConfirmationResult, Duration) {
		let poller = ConfirmationPoller::new(query, policy);
		let started = Instant::now();
		let result = poller.confirm(&reference()).await;
		(result, started.elapsed())
	}

	#[tokio::test(start_paused = true)]
	async fn test_confirmed_on_first_poll() {
		let query = ScriptedQuery::new(vec![succeeded()]);
		let (result, elapsed) = run(query.clone(), policy(6, 3)).await;

		assert_eq!(result.outcome, ConfirmationOutcome::Confirmed);
		assert_eq!(result.chain_metadata["version"], "42");
		assert_eq!(elapsed, Duration::ZERO);
		assert_eq!(query.calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_revert_is_terminal_without_waiting_for_timeout() {
		let query = ScriptedQuery::new(vec![
			pending(),
			Ok(TransactionStatus::Reverted {
				reason: "Transaction failed on-chain: Move abort".to_string(),
				timestamp: None,
				metadata: ChainMetadata::new(),
			}),
			succeeded(),
		]);
		let (result, elapsed) = run(query.clone(), policy(60, 3)).await;

		assert_eq!(result.outcome, ConfirmationOutcome::Failed);
		assert_eq!(
			result.diagnostic.as_deref(),
			Some("Transaction failed on-chain: Move abort")
		);
		assert_eq!(elapsed, Duration::from_secs(2));
		assert_eq!(query.calls(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn test_unrecognized_response_fails() {
		let query = ScriptedQuery::new(vec![Ok(TransactionStatus::Unrecognized {
			description: "Unexpected transaction type: state_checkpoint_transaction".to_string(),
		})]);
		let (result, _) = run(query, policy(6, 3)).await;

		assert_eq!(result.outcome, ConfirmationOutcome::Failed);
		assert!(result
			.diagnostic_or_default()
			.contains("state_checkpoint_transaction"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_never_found_reports_not_found_at_deadline() {
		let query = ScriptedQuery::new(vec![Ok(TransactionStatus::NotFound)]);
		let (result, elapsed) = run(query.clone(), policy(6, 3)).await;

		assert_eq!(result.outcome, ConfirmationOutcome::NotFound);
		assert_eq!(
			result.diagnostic.as_deref(),
			Some("Transaction confirmation timeout after 6s")
		);
		assert_eq!(elapsed, Duration::from_secs(6));
		// t = 0, 2, 4
		assert_eq!(query.calls(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_pending_until_deadline_times_out() {
		let query = ScriptedQuery::new(vec![Ok(TransactionStatus::NotFound), pending()]);
		let (result, elapsed) = run(query, policy(6, 3)).await;

		assert_eq!(result.outcome, ConfirmationOutcome::TimedOut);
		assert!(result.chain_timestamp.is_none());
		assert_eq!(elapsed, Duration::from_secs(6));
	}

	#[tokio::test(start_paused = true)]
	async fn test_persistent_network_errors_keep_polling_until_timeout() {
		let query = ScriptedQuery::new(vec![network()]);
		let (result, elapsed) = run(query.clone(), policy(20, 1)).await;

		assert_eq!(result.outcome, ConfirmationOutcome::TimedOut);
		assert_eq!(
			result.diagnostic.as_deref(),
			Some("Network error: connection reset")
		);
		assert_eq!(elapsed, Duration::from_secs(20));
		// one backoff step, then plain interval: t = 0, 2, 4, ..., 18
		assert_eq!(query.calls(), 10);
	}

	#[tokio::test(start_paused = true)]
	async fn test_network_backoff_is_linear_and_resets() {
		let query = ScriptedQuery::new(vec![network(), network(), pending(), network(), succeeded()]);
		let (result, elapsed) = run(query, policy(60, 3)).await;

		assert_eq!(result.outcome, ConfirmationOutcome::Confirmed);
		// 2 + 4 (backoff), 2 (pending), 2 (counter reset)
		assert_eq!(elapsed, Duration::from_secs(10));
	}

	#[tokio::test(start_paused = true)]
	async fn test_unauthorized_fails_immediately() {
		let query = ScriptedQuery::new(vec![Err(ChainQueryError::Unauthorized(401)), succeeded()]);
		let (result, elapsed) = run(query.clone(), policy(6, 3)).await;

		assert_eq!(result.outcome, ConfirmationOutcome::Failed);
		assert!(result
			.diagnostic_or_default()
			.starts_with("Invalid API key or insufficient permissions"));
		assert_eq!(elapsed, Duration::ZERO);
		assert_eq!(query.calls(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_rate_limit_waits_double_interval() {
		let query = ScriptedQuery::new(vec![Err(ChainQueryError::RateLimited), succeeded()]);
		let (result, elapsed) = run(query, policy(60, 0)).await;

		assert_eq!(result.outcome, ConfirmationOutcome::Confirmed);
		assert_eq!(elapsed, Duration::from_secs(4));
	}

	#[tokio::test(start_paused = true)]
	async fn test_other_errors_retry_at_interval() {
		let query = ScriptedQuery::new(vec![
			Err(ChainQueryError::Rejected {
				status: 400,
				message: "bad hash".to_string(),
			}),
			succeeded(),
		]);
		let (result, elapsed) = run(query, policy(60, 3)).await;

		assert_eq!(result.outcome, ConfirmationOutcome::Confirmed);
		assert_eq!(elapsed, Duration::from_secs(2));
	}

	#[tokio::test(start_paused = true)]
	async fn test_sleep_clamped_to_deadline() {
		// 2s + 4s of backoff would overshoot a 5s budget
		let query = ScriptedQuery::new(vec![network()]);
		let (result, elapsed) = run(query, policy(5, 3)).await;

		assert_eq!(result.outcome, ConfirmationOutcome::TimedOut);
		assert_eq!(elapsed, Duration::from_secs(5));
	}

	#[tokio::test(start_paused = true)]
	async fn test_concurrent_confirmations_do_not_share_state() {
		let poller = ConfirmationPoller::new(
			ScriptedQuery::new(vec![pending(), pending(), succeeded()]),
			policy(60, 3),
		);
		let other = poller.clone();
		let reference = reference();
		let (a, b) = tokio::join!(poller.confirm(&reference), other.confirm(&reference));

		assert!(a.is_confirmed());
		assert!(b.is_confirmed());
	}
}
