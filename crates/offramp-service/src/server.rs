//! HTTP server for the off-ramp API.
//!
//! Routes live under `/api`. Every failure is answered with
//! `{"error": "<message>"}`, including malformed JSON bodies.

use crate::apis;
use axum::{
	extract::{rejection::JsonRejection, Path, Query, State},
	http::{header, HeaderValue, Method},
	response::Json,
	routing::{get, post},
	Router,
};
use offramp_config::{ApiConfig, CorsConfig};
use offramp_core::PaymentOrchestrator;
use offramp_types::{
	APIError, BalanceQuery, BalanceResponse, InitiatePaymentRequest, InitiatePaymentResponse,
	ResolveAccountRequest, ResolvedAccount,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub orchestrator: Arc<PaymentOrchestrator>,
}

/// Binds the configured address and serves the API until ctrl-c.
pub async fn start_server(
	api_config: ApiConfig,
	orchestrator: Arc<PaymentOrchestrator>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(&api_config, AppState { orchestrator })?;

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Off-ramp API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	Ok(())
}

/// Builds the `/api` router with CORS, tracing and the request timeout.
pub fn build_router(
	api_config: &ApiConfig,
	state: AppState,
) -> Result<Router, Box<dyn std::error::Error>> {
	let cors = cors_layer(api_config.cors.as_ref())?;

	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/initiate-payment", post(handle_initiate_payment))
				.route("/resolve-account", post(handle_resolve_account))
				.route("/get-balance/{account_id}", get(handle_get_balance)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors)
				.layer(TimeoutLayer::new(Duration::from_secs(
					api_config.timeout_seconds,
				))),
		)
		.with_state(state);

	Ok(app)
}

/// Permissive when no origins are configured. A `*` entry allows any origin
/// but drops credentials.
fn cors_layer(cors: Option<&CorsConfig>) -> Result<CorsLayer, header::InvalidHeaderValue> {
	let Some(cors) = cors.filter(|c| !c.allowed_origins.is_empty()) else {
		return Ok(CorsLayer::permissive());
	};

	let layer = CorsLayer::new()
		.allow_methods([
			Method::GET,
			Method::POST,
			Method::PUT,
			Method::DELETE,
			Method::OPTIONS,
		])
		.allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

	if cors.allowed_origins.iter().any(|o| o.trim() == "*") {
		return Ok(layer.allow_origin(Any));
	}

	let origins = cors
		.allowed_origins
		.iter()
		.map(|o| HeaderValue::from_str(o.trim()))
		.collect::<Result<Vec<_>, _>>()?;
	Ok(layer
		.allow_origin(AllowOrigin::list(origins))
		.allow_credentials(true))
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!("Failed to listen for shutdown signal: {}", e);
		std::future::pending::<()>().await;
	}
	tracing::info!("Shutdown signal received");
}

fn bad_json(rejection: JsonRejection) -> APIError {
	APIError::BadRequest {
		message: rejection.body_text(),
	}
}

/// Handles POST /api/initiate-payment requests.
async fn handle_initiate_payment(
	State(state): State<AppState>,
	payload: Result<Json<InitiatePaymentRequest>, JsonRejection>,
) -> Result<Json<InitiatePaymentResponse>, APIError> {
	let Json(request) = payload.map_err(bad_json)?;
	match apis::payment::initiate_payment(request, &state.orchestrator).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Payment request failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

/// Handles POST /api/resolve-account requests.
async fn handle_resolve_account(
	State(state): State<AppState>,
	payload: Result<Json<ResolveAccountRequest>, JsonRejection>,
) -> Result<Json<ResolvedAccount>, APIError> {
	let Json(request) = payload.map_err(bad_json)?;
	match apis::account::resolve_account(request, &state.orchestrator).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Account resolution failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

/// Handles GET /api/get-balance/{accountId} requests.
async fn handle_get_balance(
	Path(account_id): Path<String>,
	Query(query): Query<BalanceQuery>,
	State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, APIError> {
	match apis::balance::get_balance(&account_id, query, &state.orchestrator).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Balance lookup failed: {}", e);
			Err(APIError::from(e))
		},
	}
}
