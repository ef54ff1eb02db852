//! Registry trait for self-registering implementations.
//!
//! Chain clients and disbursement providers each expose a `Registry` type
//! that names the implementation as it appears in configuration and hands
//! out the factory that builds it.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// Key of the implementation's table in the configuration file, for example
	/// `aptos` for `[confirmation.implementations.aptos]`.
	const NAME: &'static str;

	/// Factory function type for the implementation family.
	type Factory;

	/// Returns the factory that builds this implementation from its config table.
	fn factory() -> Self::Factory;
}
