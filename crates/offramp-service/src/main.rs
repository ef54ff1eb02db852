//! Main entry point for the off-ramp bridge service.
//!
//! Loads the configuration, builds the payment orchestrator with every
//! configured chain client and payout provider, and serves the HTTP API.

use clap::Parser;
use offramp_config::Config;
use offramp_core::{BridgeBuilder, BridgeFactories};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

/// Command-line arguments for the bridge service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started off-ramp bridge");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let api_config = match config.api.as_ref().filter(|api| api.enabled) {
		Some(api) => api.clone(),
		None => {
			tracing::warn!("API server disabled in configuration, nothing to serve");
			return Ok(());
		},
	};

	let orchestrator = BridgeBuilder::new(config).build(BridgeFactories::builtin())?;
	server::start_server(api_config, Arc::new(orchestrator)).await?;

	tracing::info!("Stopped off-ramp bridge");
	Ok(())
}
