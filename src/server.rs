//! HTTP surface consumed by the map client: `/api/token`, `/api/config`, `/api/products`.

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Json, Router,
	extract::Extension,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
// self
use crate::{
	_prelude::*,
	auth::{IssuedToken, TokenCache, TokenSecret, UpstreamAuthClient},
	catalog::ProductCatalog,
	config::ProxyConfig,
	http::ReqwestHttpClient,
	imagery::UrlBuilder,
};

/// Settings the map client needs before it can request tiles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
	/// API key for the API-key auth mode.
	pub api_key: TokenSecret,
	/// Upstream imagery API base URL.
	pub api_base_url: String,
}

/// Shared state injected into every handler.
#[derive(Debug)]
pub struct AppState {
	/// Single-slot token cache.
	pub tokens: Arc<TokenCache>,
	/// Memoized product catalog.
	pub catalog: ProductCatalog,
	/// API key exposed through `/api/config`.
	pub api_key: TokenSecret,
	/// Upstream imagery API base URL.
	pub api_base_url: Url,
}
impl AppState {
	/// Wires the token cache and catalog against the configured upstream endpoints.
	pub fn from_config(config: &ProxyConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout)?;
		let exchange = UpstreamAuthClient::new(
			&config.auth_base_url,
			&config.credentials,
			http_client.clone(),
		)?;

		Ok(Self {
			tokens: Arc::new(TokenCache::new(Arc::new(exchange))),
			catalog: ProductCatalog::new(http_client, config.reference_point),
			api_key: config.api_key.clone(),
			api_base_url: config.api_base_url.clone(),
		})
	}

	/// Settings served by `/api/config`.
	pub fn runtime_config(&self) -> RuntimeConfig {
		RuntimeConfig { api_key: self.api_key.clone(), api_base_url: self.api_base_url.to_string() }
	}
}

/// JSON error body: `{ "error": "..." }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Human-readable failure.
	pub error: String,
}

/// Handler failure rendered as a status plus [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error: Error,
}
impl ApiError {
	/// Token acquisition failed.
	pub fn unauthorized(error: Error) -> Self {
		Self { status: StatusCode::UNAUTHORIZED, error }
	}

	/// The upstream catalog could not be loaded.
	pub fn bad_gateway(error: Error) -> Self {
		Self { status: StatusCode::BAD_GATEWAY, error }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		tracing::warn!(status = %self.status, error = %self.error, "request failed");

		(self.status, Json(ErrorBody { error: self.error.to_string() })).into_response()
	}
}

/// Builds the router with tracing and permissive CORS.
pub fn router(state: Arc<AppState>) -> Router {
	Router::new()
		.route("/api/token", get(token_handler))
		.route("/api/config", get(config_handler))
		.route("/api/products", get(products_handler))
		.layer(Extension(state))
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// Serves the proxy on `listen` until Ctrl-C.
pub async fn serve(config: &ProxyConfig, listen: SocketAddr) -> Result<()> {
	let state = Arc::new(AppState::from_config(config)?);
	let listener = TcpListener::bind(listen).await.map_err(Error::Serve)?;

	tracing::info!(
		addr = %listener.local_addr().map_err(Error::Serve)?,
		api_base = %config.api_base_url,
		"imagery proxy listening"
	);

	axum::serve(listener, router(state))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.map_err(Error::Serve)
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for ctrl-c");
	}

	tracing::info!("shutting down");
}

/// GET /api/token
async fn token_handler(
	Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<IssuedToken>, ApiError> {
	state.tokens.token().await.map(Json).map_err(ApiError::unauthorized)
}

/// GET /api/config
async fn config_handler(Extension(state): Extension<Arc<AppState>>) -> Json<RuntimeConfig> {
	Json(state.runtime_config())
}

/// GET /api/products
async fn products_handler(
	Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, ApiError> {
	let issued = state.tokens.token().await.map_err(ApiError::unauthorized)?;
	let urls = UrlBuilder::with_token(state.api_base_url.as_str(), &issued.access_token);
	let products = state.catalog.products(&urls).await.map_err(ApiError::bad_gateway)?;

	Ok(Json(&*products).into_response())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::TransportError;

	#[test]
	fn api_error_renders_status_and_message() {
		let response = ApiError::unauthorized(Error::UpstreamAuth {
			reason: "invalid_client".into(),
			status: Some(400),
		})
		.into_response();

		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

		let response = ApiError::bad_gateway(
			TransportError::Status { url: "https://example.com/v1/".into(), status: 503 }.into(),
		)
		.into_response();

		assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
	}

	#[test]
	fn runtime_config_uses_camel_case() {
		let config = RuntimeConfig {
			api_key: TokenSecret::new("key"),
			api_base_url: "https://api.example.com/v1/".into(),
		};
		let payload = serde_json::to_value(&config).expect("Runtime config should serialize.");

		assert_eq!(payload["apiKey"], "key");
		assert_eq!(payload["apiBaseUrl"], "https://api.example.com/v1/");
	}
}
