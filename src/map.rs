//! Headless map client: talks to the proxy, describes the tile layer, and answers clicks.
//!
//! [`MapController`] holds what a map widget would: the runtime config from `/api/config`, the
//! chosen auth method, the latest access token, the product list, and the active
//! [`TileLayer`]. Rendering is left to whoever consumes the layer description.

pub mod refresh;

pub use refresh::*;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::{IssuedToken, TokenSecret},
	catalog::{Coordinate, ProductDetails},
	error::ConfigError,
	http::ReqwestHttpClient,
	imagery::{
		AuthParam, ImageryApi, Projection, TileResolver, TileScheme, UrlBuilder, ViewState,
		WebMercator,
	},
	obs::{OpKind, OpSpan},
	server::RuntimeConfig,
};

/// Product requested when none has been picked: the latest imagery available.
pub const DEFAULT_PRODUCT: &str = "Best";

/// Client for the proxy's `/api/*` endpoints.
#[derive(Clone, Debug)]
pub struct ProxyClient {
	http_client: ReqwestHttpClient,
	base: Url,
}
impl ProxyClient {
	/// Address of a proxy running locally with default settings.
	pub const DEFAULT_BASE_URL: &'static str = "http://localhost:9090/";

	/// Creates a client for the proxy rooted at `base`.
	pub fn new(http_client: ReqwestHttpClient, base: Url) -> Self {
		Self { http_client, base }
	}

	/// Fetches `GET /api/config`.
	pub async fn config(&self) -> Result<RuntimeConfig> {
		self.get("api/config").await
	}

	/// Fetches `GET /api/token`.
	pub async fn token(&self) -> Result<IssuedToken> {
		self.get("api/token").await
	}

	/// Fetches `GET /api/products`.
	pub async fn products(&self) -> Result<Vec<ProductDetails>> {
		self.get("api/products").await
	}

	async fn get<T>(&self, path: &str) -> Result<T>
	where
		T: serde::de::DeserializeOwned,
	{
		let url = self
			.base
			.join(path)
			.map_err(|source| ConfigError::InvalidUrl { field: "proxy base", source })?;

		self.http_client.get_json(url.as_str()).await
	}
}

/// How tile and info requests authenticate upstream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMethod {
	/// `api_key=<key>` from `/api/config`.
	#[default]
	ApiKey,
	/// `access_token=<token>` from `/api/token`.
	ClientCredentials,
}

/// Tile layer description handed to the map widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayer {
	/// URL template with `{z}`, `{x}`, `{y}` placeholders.
	pub url_template: String,
	/// Lowest zoom level with tiles.
	pub min_zoom: u8,
	/// Highest zoom level with tiles.
	pub max_zoom: u8,
	/// Row convention of the tile URLs.
	pub scheme: TileScheme,
}

/// Result of a click lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureInfo {
	/// Clicked location.
	pub at: Coordinate,
	/// Capture date reported upstream.
	pub capture_date: String,
}
impl Display for CaptureInfo {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(
			f,
			"Lat long {}, {} captured on {}",
			self.at.latitude, self.at.longitude, self.capture_date
		)
	}
}

#[derive(Debug, Default)]
struct MapState {
	config: Option<RuntimeConfig>,
	auth: AuthMethod,
	access_token: Option<TokenSecret>,
	products: Option<Vec<ProductDetails>>,
	selected: Option<String>,
	layer: Option<TileLayer>,
}

/// Drives a map view against the proxy and the upstream imagery API.
pub struct MapController {
	proxy: ProxyClient,
	http_client: ReqwestHttpClient,
	resolver: TileResolver,
	projection: Box<dyn Projection>,
	state: Mutex<MapState>,
}
impl MapController {
	/// Creates a controller using Web Mercator and TMS tile rows.
	pub fn new(proxy: ProxyClient, http_client: ReqwestHttpClient) -> Self {
		Self {
			proxy,
			http_client,
			resolver: TileResolver::new(TileScheme::Tms),
			projection: Box::new(WebMercator),
			state: Mutex::new(MapState::default()),
		}
	}

	/// Overrides the click resolver (tile size and row convention).
	pub fn with_resolver(mut self, resolver: TileResolver) -> Self {
		self.resolver = resolver;

		self
	}

	/// Overrides the projection used to resolve clicks.
	pub fn with_projection(mut self, projection: impl 'static + Projection) -> Self {
		self.projection = Box::new(projection);

		self
	}

	/// Loads the runtime config, then the product list, then the initial layer.
	///
	/// Only a missing runtime config fails the boot. Product and layer failures are logged and
	/// leave the controller without products or without a layer.
	pub async fn boot(&self) -> Result<()> {
		let config = self.proxy.config().await?;

		self.state.lock().config = Some(config);

		match self.proxy.products().await {
			Ok(products) => {
				tracing::info!(count = products.len(), "loaded products");

				self.state.lock().products = Some(products);
			},
			Err(e) => tracing::warn!(error = %e, "failed to load products"),
		}

		if let Err(e) = self.setup_layer().await {
			tracing::warn!(error = %e, "failed to set up tile layer");
		}

		Ok(())
	}

	/// Replaces the tile layer for the current auth method and product.
	///
	/// The previous layer is removed first, so a failed limits lookup leaves no layer.
	pub async fn setup_layer(&self) -> Result<TileLayer> {
		let product = {
			let mut state = self.state.lock();

			state.layer = None;

			product_id(&state).to_owned()
		};
		let api = self.imagery_api()?;
		let limits = OpSpan::new(OpKind::LayerSetup, "setup_layer").observe(api.limits()).await?;
		let layer = TileLayer {
			url_template: api.tile_template(&product),
			min_zoom: limits.minimum_zoom,
			max_zoom: limits.maximum_zoom,
			scheme: self.resolver.scheme,
		};

		self.state.lock().layer = Some(layer.clone());

		Ok(layer)
	}

	/// Switches the auth method and rebuilds the layer.
	pub async fn change_auth(&self, auth: AuthMethod) -> Result<TileLayer> {
		self.state.lock().auth = auth;

		self.setup_layer().await
	}

	/// Selects a loaded product by title and rebuilds the layer.
	///
	/// Returns `Ok(None)` without changing anything when products are not loaded yet or no
	/// product has that title.
	pub async fn select_product(&self, title: &str) -> Result<Option<TileLayer>> {
		{
			let mut state = self.state.lock();
			let known = state
				.products
				.as_ref()
				.is_some_and(|products| products.iter().any(|product| product.title() == title));

			if !known {
				return Ok(None);
			}

			state.selected = Some(title.to_owned());
		}

		self.setup_layer().await.map(Some)
	}

	/// Fetches a token from the proxy, stores it, and rebuilds the layer.
	///
	/// A failed rebuild is logged; the token is still returned.
	pub async fn refresh_token(&self) -> Result<IssuedToken> {
		let issued = self.proxy.token().await?;

		self.state.lock().access_token = Some(issued.access_token.clone());

		if let Err(e) = self.setup_layer().await {
			tracing::warn!(error = %e, "failed to rebuild tile layer after token refresh");
		}

		Ok(issued)
	}

	/// Starts refreshing the token `margin` before each expiry, beginning immediately.
	pub fn start_token_refresh(self: &Arc<Self>, margin: StdDuration) -> TokenRefresher {
		TokenRefresher::spawn(self.clone(), margin)
	}

	/// Resolves a click and fetches the capture date of that pixel.
	pub async fn click(&self, at: Coordinate, view: ViewState) -> Result<CaptureInfo> {
		let product = {
			let state = self.state.lock();

			if state.layer.is_none() {
				return Err(Error::NotReady("no tile layer"));
			}

			product_id(&state).to_owned()
		};
		let api = self.imagery_api()?;
		let address =
			self.resolver.resolve(at, view.zoom, view.pixel_origin, self.projection.as_ref());
		let info = OpSpan::new(OpKind::PixelInfo, "click")
			.observe(api.pixel_info(&product, &address))
			.await?;

		Ok(CaptureInfo { at, capture_date: info.capture_date })
	}

	/// Active tile layer, if one is set up.
	pub fn layer(&self) -> Option<TileLayer> {
		self.state.lock().layer.clone()
	}

	/// Current auth method.
	pub fn auth_method(&self) -> AuthMethod {
		self.state.lock().auth
	}

	/// Loaded products; `None` while loading or after a failed load.
	pub fn products(&self) -> Option<Vec<ProductDetails>> {
		self.state.lock().products.clone()
	}

	/// Product id used for tile and info requests.
	pub fn product_id(&self) -> String {
		product_id(&self.state.lock()).to_owned()
	}

	fn imagery_api(&self) -> Result<ImageryApi> {
		let state = self.state.lock();
		let config = state.config.as_ref().ok_or(Error::NotReady("runtime config not loaded"))?;
		let auth = match state.auth {
			AuthMethod::ApiKey => AuthParam::ApiKey(config.api_key.clone()),
			AuthMethod::ClientCredentials => AuthParam::AccessToken(
				state.access_token.clone().ok_or(Error::NotReady("no access token"))?,
			),
		};

		Ok(ImageryApi::new(
			self.http_client.clone(),
			UrlBuilder::new(config.api_base_url.clone(), auth),
		))
	}
}
impl Debug for MapController {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MapController")
			.field("proxy", &self.proxy)
			.field("resolver", &self.resolver)
			.field("state", &self.state)
			.finish()
	}
}

fn product_id(state: &MapState) -> &str {
	state.selected.as_deref().unwrap_or(DEFAULT_PRODUCT)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn capture_info_renders_popup_text() {
		let info = CaptureInfo {
			at: Coordinate::new(-31.95, 115.89),
			capture_date: "2019-05-01".into(),
		};

		assert_eq!(info.to_string(), "Lat long -31.95, 115.89 captured on 2019-05-01");
	}

	#[test]
	fn product_defaults_to_best() {
		let mut state = MapState::default();

		assert_eq!(product_id(&state), "Best");

		state.selected = Some("Perth 2019".into());

		assert_eq!(product_id(&state), "Perth 2019");
	}

	#[tokio::test]
	async fn operations_before_boot_are_not_ready() {
		let controller = MapController::new(
			ProxyClient::new(
				ReqwestHttpClient::default(),
				Url::parse(ProxyClient::DEFAULT_BASE_URL).expect("Default proxy URL should parse."),
			),
			ReqwestHttpClient::default(),
		);
		let err = controller.setup_layer().await.expect_err("Setup without config should fail.");

		assert!(matches!(err, Error::NotReady(_)));

		let err = controller
			.click(Coordinate::PERTH, ViewState { zoom: 18, pixel_origin: Default::default() })
			.await
			.expect_err("Clicks without a layer should fail.");

		assert!(matches!(err, Error::NotReady("no tile layer")));
		assert_eq!(controller.select_product("Best").await.ok(), Some(None));
	}
}
