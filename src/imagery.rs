//! Upstream imagery API addressing: authenticated URLs, tile templates, limits, and per-pixel
//! capture lookups.

pub mod tile;

pub use tile::*;

// self
use crate::{_prelude::*, auth::TokenSecret, http::ReqwestHttpClient};

/// Credential appended to every imagery request.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthParam {
	/// `api_key=<key>`.
	ApiKey(TokenSecret),
	/// `access_token=<token>`.
	AccessToken(TokenSecret),
}
impl AuthParam {
	/// Renders the `name=value` query pair.
	pub fn as_query(&self) -> String {
		match self {
			Self::ApiKey(key) => format!("api_key={}", key.expose()),
			Self::AccessToken(token) => format!("access_token={}", token.expose()),
		}
	}
}
impl Debug for AuthParam {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::ApiKey(_) => f.write_str("AuthParam::ApiKey(<redacted>)"),
			Self::AccessToken(_) => f.write_str("AuthParam::AccessToken(<redacted>)"),
		}
	}
}

/// Joins paths onto an imagery base URL and appends the auth parameter.
///
/// `build(path, extra)` yields `{base}{path}?{auth}` followed by `&{extra}` when supplied. The
/// builder holds no other state; make a new one whenever the credential changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlBuilder {
	base: String,
	auth: AuthParam,
}
impl UrlBuilder {
	/// Creates a builder for an arbitrary credential.
	pub fn new(base: impl Into<String>, auth: AuthParam) -> Self {
		Self { base: base.into(), auth }
	}

	/// Creates a builder authenticating with `access_token=<token>`.
	pub fn with_token(base: impl Into<String>, token: &TokenSecret) -> Self {
		Self::new(base, AuthParam::AccessToken(token.clone()))
	}

	/// Creates a builder authenticating with `api_key=<key>`.
	pub fn with_api_key(base: impl Into<String>, key: &TokenSecret) -> Self {
		Self::new(base, AuthParam::ApiKey(key.clone()))
	}

	/// Base URL every path is appended to.
	pub fn base(&self) -> &str {
		&self.base
	}

	/// Credential appended to every URL.
	pub fn auth(&self) -> &AuthParam {
		&self.auth
	}

	/// Builds `{base}{path}?{auth}[&{extra}]`.
	pub fn build(&self, path: &str, extra: Option<&str>) -> String {
		let auth = self.auth.as_query();

		match extra {
			Some(query) => format!("{}{path}?{auth}&{query}", self.base),
			None => format!("{}{path}?{auth}", self.base),
		}
	}
}

/// Zoom range served by the tile endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLimits {
	/// Lowest zoom level with tiles.
	pub minimum_zoom: u8,
	/// Highest zoom level with tiles.
	pub maximum_zoom: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LimitsBody {
	tiles_limits: TileLimits,
}

/// Capture metadata for a single pixel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelInfo {
	/// Capture date as reported by upstream.
	pub capture_date: String,
}

/// Client for the imagery endpoints the map needs.
#[derive(Clone, Debug)]
pub struct ImageryApi {
	http_client: ReqwestHttpClient,
	urls: UrlBuilder,
}
impl ImageryApi {
	/// Creates a client issuing requests through `urls`.
	pub fn new(http_client: ReqwestHttpClient, urls: UrlBuilder) -> Self {
		Self { http_client, urls }
	}

	/// Fetches `GET <base>limits`.
	pub async fn limits(&self) -> Result<TileLimits> {
		let body =
			self.http_client.get_json::<LimitsBody>(&self.urls.build("limits", None)).await?;

		Ok(body.tiles_limits)
	}

	/// Tile URL template with `{z}`, `{x}`, `{y}` placeholders for the map widget.
	pub fn tile_template(&self, product: &str) -> String {
		format!(
			"{}{product}/tiles/{{z}}/{{x}}/{{y}}?format=image/jpeg&{}",
			self.urls.base(),
			self.urls.auth().as_query()
		)
	}

	/// Fetches the capture metadata of the pixel at `address` in `product`.
	pub async fn pixel_info(&self, product: &str, address: &TileAddress) -> Result<PixelInfo> {
		self.http_client.get_json(&self.urls.build(&address.info_path(product), None)).await
	}
}
