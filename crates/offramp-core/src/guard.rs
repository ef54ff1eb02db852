//! Per-reference submission guard.
//!
//! A transaction reference may be confirmed by at most one request at a
//! time. Optionally, references whose payout went out are remembered for
//! the life of the process and refused afterwards. Nothing is persisted.

use crate::PaymentError;
use dashmap::DashSet;
use offramp_types::{ChainKind, TransactionReference};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ReferenceGuard {
	in_flight: Arc<DashSet<String>>,
	processed: Option<Arc<DashSet<String>>>,
}

/// Holds a reference in the in-flight set until dropped.
#[derive(Debug)]
pub struct InFlight {
	key: String,
	in_flight: Arc<DashSet<String>>,
}

impl Drop for InFlight {
	fn drop(&mut self) {
		self.in_flight.remove(&self.key);
	}
}

impl ReferenceGuard {
	pub fn new(reject_replayed_references: bool) -> Self {
		Self {
			in_flight: Arc::new(DashSet::new()),
			processed: reject_replayed_references.then(|| Arc::new(DashSet::new())),
		}
	}

	fn key(chain: ChainKind, reference: &TransactionReference) -> String {
		format!("{}:{}", chain, reference.canonical())
	}

	/// Claims `reference` for the caller.
	pub fn acquire(
		&self,
		chain: ChainKind,
		reference: &TransactionReference,
	) -> Result<InFlight, PaymentError> {
		let key = Self::key(chain, reference);
		if let Some(processed) = &self.processed {
			if processed.contains(&key) {
				return Err(PaymentError::DuplicateSubmission(reference.to_string()));
			}
		}
		if !self.in_flight.insert(key.clone()) {
			return Err(PaymentError::DuplicateSubmission(reference.to_string()));
		}
		Ok(InFlight {
			key,
			in_flight: self.in_flight.clone(),
		})
	}

	/// Records that a payout was attempted for the claimed reference.
	pub fn mark_processed(&self, claim: &InFlight) {
		if let Some(processed) = &self.processed {
			processed.insert(claim.key.clone());
		}
	}

	#[cfg(test)]
	fn in_flight_count(&self) -> usize {
		self.in_flight.len()
	}
}
