//! Client-credentials exchange against the upstream OAuth token endpoint.
//!
//! [`UpstreamAuthClient`] posts `grant_type=client_credentials` plus the configured scope with
//! HTTP basic client authentication. The endpoint's `error` field, whether returned with an
//! error status or hidden inside a `200` body, surfaces as [`Error::UpstreamAuth`]; network
//! failures surface as [`Error::Transport`].

// crates.io
use oauth2::{
	ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RequestTokenError, Scope,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenGrant, TokenSecret},
	error::{ConfigError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	obs::{OpKind, OpSpan},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Boxed future returned by [`TokenExchange::exchange`].
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenGrant>> + 'a + Send>>;

/// Source of fresh access tokens consumed by [`TokenCache`](crate::auth::TokenCache).
pub trait TokenExchange
where
	Self: Send + Sync,
{
	/// Requests a brand-new token from upstream.
	fn exchange(&self) -> ExchangeFuture<'_>;
}

/// Credentials the proxy holds on behalf of the browser.
#[derive(Clone)]
pub struct ClientCredentials {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret; never sent to the browser.
	pub client_secret: TokenSecret,
	/// Space-delimited scope requested with every exchange.
	pub scope: String,
}
impl ClientCredentials {
	/// Scope needed to read imagery tiles.
	pub const DEFAULT_SCOPE: &'static str = "api:imagery";

	/// Creates credentials requesting [`Self::DEFAULT_SCOPE`].
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			scope: Self::DEFAULT_SCOPE.into(),
		}
	}

	/// Overrides the requested scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("scope", &self.scope)
			.finish()
	}
}

/// Performs the client-credentials grant against `<auth base>connect/token`.
#[derive(Clone)]
pub struct UpstreamAuthClient {
	oauth_client: ConfiguredBasicClient,
	http_client: ReqwestHttpClient,
	scopes: Vec<String>,
}
impl UpstreamAuthClient {
	/// Path of the token endpoint relative to the identity base URL.
	pub const TOKEN_PATH: &'static str = "connect/token";

	/// Builds a client for the identity service rooted at `auth_base`.
	pub fn new(
		auth_base: &Url,
		credentials: &ClientCredentials,
		http_client: ReqwestHttpClient,
	) -> Result<Self> {
		let token_url = auth_base
			.join(Self::TOKEN_PATH)
			.map_err(|source| ConfigError::InvalidUrl { field: "auth base", source })?;
		let oauth_client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
			.set_client_secret(ClientSecret::new(credentials.client_secret.expose().to_owned()))
			.set_token_uri(TokenUrl::from_url(token_url));
		let scopes = credentials.scope.split_whitespace().map(str::to_owned).collect();

		Ok(Self { oauth_client, http_client, scopes })
	}

	/// Exchanges the client credentials for a short-lived bearer token.
	pub async fn exchange_client_credentials(&self) -> Result<TokenGrant> {
		OpSpan::new(OpKind::TokenExchange, "exchange_client_credentials")
			.observe(async move {
				let meta = ResponseMetadataSlot::default();
				let instrumented = self.http_client.instrumented(meta.clone());
				let mut request = self.oauth_client.exchange_client_credentials();

				for scope in &self.scopes {
					request = request.add_scope(Scope::new(scope.clone()));
				}

				let response = request
					.request_async(&instrumented)
					.await
					.map_err(|err| map_request_error(meta.take(), err))?;
				let expires_in =
					response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
				let expires_in =
					i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

				if expires_in <= 0 {
					return Err(ConfigError::NonPositiveExpiresIn.into());
				}

				Ok(TokenGrant {
					access_token: TokenSecret::new(response.access_token().secret().to_owned()),
					expires_in: Duration::seconds(expires_in),
				})
			})
			.await
	}
}
impl TokenExchange for UpstreamAuthClient {
	fn exchange(&self) -> ExchangeFuture<'_> {
		Box::pin(self.exchange_client_credentials())
	}
}
impl Debug for UpstreamAuthClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UpstreamAuthClient")
			.field("client_id", self.oauth_client.client_id())
			.field("token_uri", self.oauth_client.token_uri())
			.field("scopes", &self.scopes)
			.finish()
	}
}

/// Minimal view used to spot an `error` field inside a body that failed token parsing.
#[derive(Deserialize)]
struct ErrorBody {
	error: Option<serde_json::Value>,
	error_description: Option<String>,
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, status),
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::Parse(source, body) => match error_field(&body) {
			Some(reason) => Error::UpstreamAuth { reason, status },
			None => TransportError::Decode { source }.into(),
		},
		RequestTokenError::Other(message) => TransportError::Unexpected { message }.into(),
	}
}

fn map_server_response_error(response: BasicErrorResponse, status: Option<u16>) -> Error {
	let reason = match response.error_description() {
		Some(description) => format!("{} ({description})", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	};

	Error::UpstreamAuth { reason, status }
}

fn map_transport_error(err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Unexpected { message }.into(),
		_ => TransportError::Unexpected { message: "unknown HTTP client error".into() }.into(),
	}
}

fn error_field(body: &[u8]) -> Option<String> {
	let parsed = serde_json::from_slice::<ErrorBody>(body).ok()?;
	let error = match parsed.error? {
		serde_json::Value::String(code) => code,
		other => other.to_string(),
	};

	Some(match parsed.error_description {
		Some(description) => format!("{error} ({description})"),
		None => error,
	})
}
