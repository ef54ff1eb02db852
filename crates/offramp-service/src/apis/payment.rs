//! Payment initiation.

use offramp_core::{PaymentError, PaymentOrchestrator};
use offramp_types::{truncate_id, InitiatePaymentRequest, InitiatePaymentResponse};

/// Confirms the user's transfer and runs the requested payout.
pub async fn initiate_payment(
	request: InitiatePaymentRequest,
	orchestrator: &PaymentOrchestrator,
) -> Result<InitiatePaymentResponse, PaymentError> {
	tracing::debug!(
		payment_type = request.payment_type.as_deref().unwrap_or(""),
		user = %truncate_id(request.user_address.as_deref().unwrap_or("")),
		"Received payment request"
	);
	let outcome = orchestrator.initiate_payment(&request).await?;
	Ok(InitiatePaymentResponse {
		success: true,
		result: outcome,
	})
}
