//! Proxy-level error types shared across the token cache, catalog, server, and map client.

// self
use crate::_prelude::*;

/// Proxy-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, HTTP status, malformed body).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The OAuth endpoint rejected the client-credentials exchange.
	#[error("Authentication error: {reason}.")]
	UpstreamAuth {
		/// Provider-supplied `error` (and description, when present).
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The map client lacks state an operation depends on.
	#[error("Map client is not ready: {0}.")]
	NotReady(&'static str),
	/// The HTTP listener could not be bound or stopped unexpectedly.
	#[error("Proxy server failed.")]
	Serve(#[source] std::io::Error),
	/// A single product's detail lookup failed; the catalog drops the product.
	#[error("Unable to retrieve product details for {title}.")]
	EnrichmentMiss {
		/// Title of the product that could not be enriched.
		title: String,
		/// Underlying lookup failure.
		#[source]
		source: Box<Error>,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A configured URL cannot be parsed.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Which setting failed to parse.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A required setting was not supplied.
	#[error("Missing required setting `{0}`.")]
	Missing(&'static str),
	/// Base URLs are joined by concatenation and must end with a slash.
	#[error("The {field} URL must end with `/`: {url}.")]
	MissingTrailingSlash {
		/// Which setting failed validation.
		field: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// Non-loopback endpoints must use HTTPS.
	#[error("The {field} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which setting failed validation.
		field: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, HTTP status, body decoding).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("HTTP error: {source}.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling upstream.")]
	Io(#[from] std::io::Error),
	/// Upstream answered with a non-success status.
	#[error("HTTP {status} from {url}.")]
	Status {
		/// Requested URL with credentials stripped.
		url: String,
		/// HTTP status code.
		status: u16,
	},
	/// Upstream responded with JSON that does not match the expected shape.
	#[error("Upstream returned malformed JSON at `{}`.", .source.path())]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// HTTP client reported a failure it could not classify.
	#[error("Unexpected upstream response: {message}.")]
	Unexpected {
		/// Client-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		// Imagery URLs carry credentials in the query string.
		Self::network(e.without_url())
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for TransportError {
	fn from(source: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::Decode { source }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn enrichment_miss_exposes_lookup_failure_as_source() {
		let lookup: Error =
			TransportError::Status { url: "https://example.com/B".into(), status: 404 }.into();
		let miss = Error::EnrichmentMiss { title: "B".into(), source: Box::new(lookup) };

		assert_eq!(miss.to_string(), "Unable to retrieve product details for B.");

		let source =
			StdError::source(&miss).expect("Enrichment miss should expose the lookup failure.");

		assert_eq!(source.to_string(), "HTTP 404 from https://example.com/B.");
	}

	#[test]
	fn upstream_auth_message_names_provider_error() {
		let err = Error::UpstreamAuth { reason: "invalid_client".into(), status: Some(400) };

		assert_eq!(err.to_string(), "Authentication error: invalid_client.");
	}
}
