//! Polling parameters for one chain.

use crate::ChainQueryError;
use std::time::Duration;

/// Interval, overall budget and network retry ceiling of a confirmation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
	pub poll_interval: Duration,
	pub poll_timeout: Duration,
	/// Consecutive network failures tolerated with linear backoff.
	pub max_network_retries: u32,
}

impl PollPolicy {
	pub fn new(poll_interval: Duration, poll_timeout: Duration, max_network_retries: u32) -> Self {
		Self {
			poll_interval,
			poll_timeout,
			max_network_retries,
		}
	}

	/// Applies `poll_interval_ms`, `poll_timeout_ms` and `max_network_retries`
	/// from an implementation table when present.
	pub fn with_overrides(mut self, config: &toml::Value) -> Result<Self, ChainQueryError> {
		if let Some(ms) = read_u64(config, "poll_interval_ms")? {
			self.poll_interval = Duration::from_millis(ms);
		}
		if let Some(ms) = read_u64(config, "poll_timeout_ms")? {
			self.poll_timeout = Duration::from_millis(ms);
		}
		if let Some(retries) = read_u64(config, "max_network_retries")? {
			self.max_network_retries = u32::try_from(retries).map_err(|_| {
				ChainQueryError::Configuration("max_network_retries is too large".to_string())
			})?;
		}

		if self.poll_interval.is_zero() {
			return Err(ChainQueryError::Configuration(
				"poll_interval_ms must be greater than 0".to_string(),
			));
		}
		if self.poll_timeout < self.poll_interval {
			return Err(ChainQueryError::Configuration(
				"poll_timeout_ms must not be shorter than poll_interval_ms".to_string(),
			));
		}
		Ok(self)
	}

	/// Human readable form of the timeout used in diagnostics.
	pub fn timeout_label(&self) -> String {
		let millis = self.poll_timeout.as_millis();
		if millis % 1000 == 0 {
			format!("{}s", millis / 1000)
		} else {
			format!("{}ms", millis)
		}
	}
}

fn read_u64(config: &toml::Value, key: &str) -> Result<Option<u64>, ChainQueryError> {
	match config.get(key) {
		None => Ok(None),
		Some(value) => value
			.as_integer()
			.and_then(|v| u64::try_from(v).ok())
			.map(Some)
			.ok_or_else(|| {
				ChainQueryError::Configuration(format!("{} must be a non-negative integer", key))
			}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base() -> PollPolicy {
		PollPolicy::new(Duration::from_secs(2), Duration::from_secs(6), 3)
	}

	#[test]
	fn test_overrides_apply() {
		let table = toml::Value::Table(toml::toml! {
			poll_interval_ms = 500
			poll_timeout_ms = 1500
			max_network_retries = 1
		});
		let policy = base().with_overrides(&table).unwrap();
		assert_eq!(policy.poll_interval, Duration::from_millis(500));
		assert_eq!(policy.poll_timeout, Duration::from_millis(1500));
		assert_eq!(policy.max_network_retries, 1);
	}

	#[test]
	fn test_missing_keys_keep_defaults() {
		let table = toml::Value::Table(toml::Table::new());
		assert_eq!(base().with_overrides(&table).unwrap(), base());
	}

	#[test]
	fn test_invalid_overrides_rejected() {
		let negative = toml::Value::Table(toml::toml! { poll_interval_ms = -1 });
		assert!(base().with_overrides(&negative).is_err());

		let inverted = toml::Value::Table(toml::toml! {
			poll_interval_ms = 5000
			poll_timeout_ms = 1000
		});
		assert!(base().with_overrides(&inverted).is_err());
	}

	#[test]
	fn test_timeout_label() {
		assert_eq!(base().timeout_label(), "6s");
		let short = PollPolicy::new(Duration::from_millis(100), Duration::from_millis(250), 0);
		assert_eq!(short.timeout_label(), "250ms");
	}
}
