//! Boots the headless map client against a running proxy, then prints the tile layer template
//! and the capture date of one coordinate.

// crates.io
use clap::{Parser, ValueEnum};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
use url::Url;
// self
use imagery_proxy::{
	catalog::Coordinate,
	http::ReqwestHttpClient,
	imagery::{Point, ViewState, WebMercator},
	map::{AuthMethod, MapController, ProxyClient},
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Auth {
	ApiKey,
	ClientCredentials,
}
impl From<Auth> for AuthMethod {
	fn from(auth: Auth) -> Self {
		match auth {
			Auth::ApiKey => Self::ApiKey,
			Auth::ClientCredentials => Self::ClientCredentials,
		}
	}
}

#[derive(Debug, Parser)]
#[command(name = "tile-info", version, about = "Look up imagery capture dates through the proxy")]
struct Args {
	/// Proxy base URL.
	#[arg(long, env = "IMAGERY_PROXY_URL", default_value = ProxyClient::DEFAULT_BASE_URL)]
	proxy: Url,
	/// Latitude to look up.
	#[arg(long, default_value_t = Coordinate::PERTH.latitude, allow_hyphen_values = true)]
	lat: f64,
	/// Longitude to look up.
	#[arg(long, default_value_t = Coordinate::PERTH.longitude, allow_hyphen_values = true)]
	lng: f64,
	/// Zoom level of the simulated view.
	#[arg(long, default_value_t = 18, value_parser = clap::value_parser!(u8).range(0..=30))]
	zoom: u8,
	/// Product title; the latest imagery (`Best`) when omitted.
	#[arg(long)]
	product: Option<String>,
	/// How tile requests authenticate upstream.
	#[arg(long, value_enum, default_value_t = Auth::ApiKey)]
	auth: Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	dotenvy::dotenv().ok();
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let args = Args::parse();
	let http_client = ReqwestHttpClient::default();
	let controller =
		MapController::new(ProxyClient::new(http_client.clone(), args.proxy), http_client);

	controller.boot().await?;

	let auth = AuthMethod::from(args.auth);

	if auth == AuthMethod::ClientCredentials {
		controller.refresh_token().await?;
		controller.change_auth(auth).await?;
	}
	if let Some(title) = &args.product
		&& controller.select_product(title).await?.is_none()
	{
		tracing::warn!(%title, fallback = %controller.product_id(), "unknown product");
	}

	let layer = controller.setup_layer().await?;
	let at = Coordinate::new(args.lat, args.lng);
	let view = ViewState::centered(at, args.zoom, Point::new(1024., 768.), &WebMercator);
	let info = controller.click(at, view).await?;

	println!("Tiles: {} (zoom {}-{}).", layer.url_template, layer.min_zoom, layer.max_zoom);
	println!("{info}.");

	Ok(())
}
