//! `imagery-proxy` binary: serves `/api/token`, `/api/config`, and `/api/products`.

// crates.io
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
// self
use imagery_proxy::{config::ProxyArgs, server};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	dotenvy::dotenv().ok();

	let args = ProxyArgs::parse();
	let subscriber =
		tracing_subscriber::fmt().with_env_filter(EnvFilter::try_new(&args.log_level)?);

	if args.log_json {
		subscriber.json().init();
	} else {
		subscriber.init();
	}

	let config = args.to_config()?;

	server::serve(&config, args.listen).await?;

	Ok(())
}
