//! On-chain balance passthrough.

use offramp_core::{PaymentError, PaymentOrchestrator};
use offramp_types::{BalanceQuery, BalanceResponse};

/// Reads the balance of `account_id`, optionally on a specific chain.
///
/// The balance is returned as the chain reports it, in the smallest unit of
/// the asset.
pub async fn get_balance(
	account_id: &str,
	query: BalanceQuery,
	orchestrator: &PaymentOrchestrator,
) -> Result<BalanceResponse, PaymentError> {
	let balance = orchestrator
		.get_balance(account_id, query.chain.as_deref())
		.await?;
	Ok(BalanceResponse { balance })
}
