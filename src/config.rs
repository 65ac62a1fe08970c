//! Proxy configuration: validated settings plus the command-line/environment front end.

// std
use std::{net::SocketAddr, time::Duration as StdDuration};
// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, TokenSecret},
	catalog::Coordinate,
	error::ConfigError,
	http::DEFAULT_REQUEST_TIMEOUT,
};

/// Default upstream imagery API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.au.eagleview.com/api/imagery/v1/";
/// Default upstream identity base URL (the token endpoint is `connect/token` below it).
pub const DEFAULT_AUTH_BASE_URL: &str = "https://internalapi.au.eagleview.com/identity/";
/// Default listen address for the proxy.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:9090";

/// Validated proxy settings.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
	/// Credentials used for the client-credentials grant.
	pub credentials: ClientCredentials,
	/// API key handed to the browser for the API-key auth mode.
	pub api_key: TokenSecret,
	/// Upstream imagery API base URL (ends with `/`).
	pub api_base_url: Url,
	/// Upstream identity base URL (ends with `/`).
	pub auth_base_url: Url,
	/// Catalog entries must cover this point.
	pub reference_point: Coordinate,
	/// Timeout applied to every upstream request.
	pub request_timeout: StdDuration,
}
impl ProxyConfig {
	/// Creates a new builder.
	pub fn builder() -> ProxyConfigBuilder {
		ProxyConfigBuilder::default()
	}
}

/// Builder for [`ProxyConfig`] values.
#[derive(Debug, Default)]
pub struct ProxyConfigBuilder {
	client_id: Option<String>,
	client_secret: Option<String>,
	scope: Option<String>,
	api_key: Option<String>,
	api_base_url: Option<String>,
	auth_base_url: Option<String>,
	reference_point: Option<Coordinate>,
	request_timeout: Option<StdDuration>,
}
impl ProxyConfigBuilder {
	/// Sets the OAuth client identifier.
	pub fn client_id(mut self, value: impl Into<String>) -> Self {
		self.client_id = Some(value.into());

		self
	}

	/// Sets the OAuth client secret.
	pub fn client_secret(mut self, value: impl Into<String>) -> Self {
		self.client_secret = Some(value.into());

		self
	}

	/// Overrides the requested scope (defaults to `api:imagery`).
	pub fn scope(mut self, value: impl Into<String>) -> Self {
		self.scope = Some(value.into());

		self
	}

	/// Sets the API key exposed through `/api/config`.
	pub fn api_key(mut self, value: impl Into<String>) -> Self {
		self.api_key = Some(value.into());

		self
	}

	/// Overrides the imagery API base URL.
	pub fn api_base_url(mut self, value: impl Into<String>) -> Self {
		self.api_base_url = Some(value.into());

		self
	}

	/// Overrides the identity base URL.
	pub fn auth_base_url(mut self, value: impl Into<String>) -> Self {
		self.auth_base_url = Some(value.into());

		self
	}

	/// Overrides the point catalog entries must cover (defaults to Perth).
	pub fn reference_point(mut self, point: Coordinate) -> Self {
		self.reference_point = Some(point);

		self
	}

	/// Overrides the upstream request timeout.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ProxyConfig, ConfigError> {
		let client_id = self.client_id.ok_or(ConfigError::Missing("client_id"))?;
		let client_secret = self.client_secret.ok_or(ConfigError::Missing("client_secret"))?;
		let mut credentials = ClientCredentials::new(client_id, client_secret);

		if let Some(scope) = self.scope {
			credentials = credentials.with_scope(scope);
		}

		let api_base_url = parse_base_url(
			"api base",
			self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL),
		)?;
		let auth_base_url = parse_base_url(
			"auth base",
			self.auth_base_url.as_deref().unwrap_or(DEFAULT_AUTH_BASE_URL),
		)?;

		Ok(ProxyConfig {
			credentials,
			api_key: TokenSecret::new(self.api_key.unwrap_or_default()),
			api_base_url,
			auth_base_url,
			reference_point: self.reference_point.unwrap_or(Coordinate::PERTH),
			request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
		})
	}
}

fn parse_base_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })?;

	if !url.path().ends_with('/') {
		return Err(ConfigError::MissingTrailingSlash { field, url: url.to_string() });
	}
	if url.scheme() != "https" && !is_loopback(&url) {
		return Err(ConfigError::InsecureEndpoint { field, url: url.to_string() });
	}

	Ok(url)
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain == "localhost",
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

/// Command-line and environment settings for the `imagery-proxy` binary.
#[derive(Debug, Parser)]
#[command(name = "imagery-proxy", version, about = "Client-credentials proxy for imagery maps")]
pub struct ProxyArgs {
	/// Listen address.
	#[arg(short, long, env = "IMAGERY_LISTEN", default_value = DEFAULT_LISTEN)]
	pub listen: SocketAddr,
	/// OAuth client identifier.
	#[arg(long, env = "IMAGERY_CLIENT_ID")]
	pub client_id: String,
	/// OAuth client secret.
	#[arg(long, env = "IMAGERY_CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: String,
	/// API key handed to the browser.
	#[arg(long, env = "IMAGERY_API_KEY", default_value = "", hide_env_values = true)]
	pub api_key: String,
	/// Imagery API base URL.
	#[arg(long, env = "IMAGERY_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
	pub api_base_url: String,
	/// Identity base URL.
	#[arg(long, env = "IMAGERY_AUTH_BASE_URL", default_value = DEFAULT_AUTH_BASE_URL)]
	pub auth_base_url: String,
	/// OAuth scope.
	#[arg(long, env = "IMAGERY_SCOPE", default_value = ClientCredentials::DEFAULT_SCOPE)]
	pub scope: String,
	/// Latitude catalog entries must cover.
	#[arg(
		long,
		env = "IMAGERY_REFERENCE_LAT",
		default_value_t = Coordinate::PERTH.latitude,
		allow_hyphen_values = true
	)]
	pub reference_lat: f64,
	/// Longitude catalog entries must cover.
	#[arg(
		long,
		env = "IMAGERY_REFERENCE_LNG",
		default_value_t = Coordinate::PERTH.longitude,
		allow_hyphen_values = true
	)]
	pub reference_lng: f64,
	/// Upstream request timeout in seconds.
	#[arg(
		long,
		env = "IMAGERY_REQUEST_TIMEOUT_SECS",
		default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs()
	)]
	pub request_timeout_secs: u64,
	/// Log filter directive (e.g. `info`, `imagery_proxy=debug`).
	#[arg(long, env = "RUST_LOG", default_value = "info")]
	pub log_level: String,
	/// Emit logs as JSON lines.
	#[arg(long, env = "IMAGERY_LOG_JSON")]
	pub log_json: bool,
}
impl ProxyArgs {
	/// Validates the arguments into a [`ProxyConfig`].
	pub fn to_config(&self) -> Result<ProxyConfig, ConfigError> {
		ProxyConfig::builder()
			.client_id(&self.client_id)
			.client_secret(&self.client_secret)
			.scope(&self.scope)
			.api_key(&self.api_key)
			.api_base_url(&self.api_base_url)
			.auth_base_url(&self.auth_base_url)
			.reference_point(Coordinate::new(self.reference_lat, self.reference_lng))
			.request_timeout(StdDuration::from_secs(self.request_timeout_secs))
			.build()
	}
}
