//! Transport primitives shared by the token exchange, the catalog, and the map client.
//!
//! [`ReqwestHttpClient`] wraps one [`ReqwestClient`] so every upstream call shares the same
//! connection pool and timeout. Token exchanges go through [`InstrumentedHandle`], an
//! [`AsyncHttpClient`] adapter that records the response status in a
//! [`ResponseMetadataSlot`] so error mapping can report it. JSON lookups go through
//! [`ReqwestHttpClient::get_json`].

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Default timeout applied to every outbound request.
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by upstream, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects are not followed: the token endpoint must answer directly, and imagery
/// endpoints carry credentials in the query string that must not leak to another host.
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Builds a client with the provided request timeout.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(Policy::none()).timeout(timeout).build()?;

		Ok(Self(client))
	}

	/// Builds an instrumented handle that captures response metadata.
	pub fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle::new(self.0.clone(), slot)
	}

	/// Issues a `GET` and decodes a JSON body.
	///
	/// Network failures, non-success statuses, and bodies that do not match `T` all surface as
	/// [`TransportError`]s. Error messages never include the query string.
	pub async fn get_json<T>(&self, url: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.0.get(url).send().await.map_err(TransportError::from)?;
		let status = response.status();

		if !status.is_success() {
			return Err(
				TransportError::Status { url: redact_query(url), status: status.as_u16() }.into()
			);
		}

		let body = response.bytes().await.map_err(TransportError::from)?;

		decode_json(&body)
	}
}
impl Default for ReqwestHttpClient {
	fn default() -> Self {
		Self::with_timeout(DEFAULT_REQUEST_TIMEOUT).unwrap_or_else(|e| {
			tracing::warn!(error = %e, "http client build failed; retrying without a timeout");

			Self(ReqwestClient::builder().redirect(Policy::none()).build().unwrap_or_default())
		})
	}
}

/// Instrumented adapter that implements [`AsyncHttpClient`] for reqwest.
struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Handle returned by [`ReqwestHttpClient::instrumented`].
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot }))
	}
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Decodes a JSON body with path-aware error reporting.
pub(crate) fn decode_json<T>(body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de).map_err(|e| TransportError::from(e).into())
}

/// Drops the query string so credentials never reach logs or error bodies.
pub(crate) fn redact_query(url: &str) -> String {
	match url.split_once('?') {
		Some((head, _)) => head.to_owned(),
		None => url.to_owned(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn redact_query_strips_credentials() {
		assert_eq!(
			redact_query("https://example.com/v1/limits?access_token=secret&x=1"),
			"https://example.com/v1/limits"
		);
		assert_eq!(redact_query("https://example.com/v1/"), "https://example.com/v1/");
	}

	#[test]
	fn decode_json_reports_failing_path() {
		#[derive(Debug, Deserialize)]
		struct Limits {
			#[allow(dead_code)]
			inner: Inner,
		}
		#[derive(Debug, Deserialize)]
		struct Inner {
			#[allow(dead_code)]
			zoom: u8,
		}

		let err = decode_json::<Limits>(br#"{"inner":{"zoom":"high"}}"#)
			.expect_err("A string zoom should fail to decode.");

		assert!(err.to_string().contains("inner.zoom"), "unexpected message: {err}");
	}

	#[test]
	fn metadata_slot_is_consumed_on_take() {
		let slot = ResponseMetadataSlot::default();

		slot.store(ResponseMetadata { status: Some(401) });

		assert_eq!(slot.take().and_then(|meta| meta.status), Some(401));
		assert!(slot.take().is_none());
	}
}
