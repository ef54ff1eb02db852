//! Bank display name to bank code lookup.

use crate::PaymentError;
use std::collections::BTreeMap;

/// Maps the bank names shown to users onto the codes payout providers expect.
#[derive(Debug, Clone)]
pub struct BankDirectory {
	banks: BTreeMap<String, String>,
}

impl BankDirectory {
	pub fn new(banks: BTreeMap<String, String>) -> Self {
		Self { banks }
	}

	/// Returns the code for `name`. Matching ignores case and surrounding spaces.
	pub fn code_for(&self, name: &str) -> Result<&str, PaymentError> {
		let wanted = name.trim();
		self.banks
			.get(wanted)
			.or_else(|| {
				self.banks
					.iter()
					.find(|(bank, _)| bank.eq_ignore_ascii_case(wanted))
					.map(|(_, code)| code)
			})
			.map(String::as_str)
			.ok_or_else(|| PaymentError::InvalidBank(wanted.to_string()))
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		self.banks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.banks.is_empty()
	}
}
