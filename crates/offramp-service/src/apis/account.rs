use offramp_core::{PaymentError, PaymentOrchestrator};
use offramp_types::{ResolveAccountRequest, ResolvedAccount};

/// Looks up the name on a bank account before the user commits funds.
pub async fn resolve_account(
	request: ResolveAccountRequest,
	orchestrator: &PaymentOrchestrator,
) -> Result<ResolvedAccount, PaymentError> {
	orchestrator.resolve_account(&request).await
}
