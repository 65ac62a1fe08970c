//! Client-credentials token proxy for licensed aerial imagery maps.
//!
//! The server keeps the client secret and hands every caller the same expiry-aware bearer
//! token. It also serves a product catalog filtered to an area of interest. The [`map`] module
//! turns map clicks into the upstream tile/pixel addressing scheme.

#![deny(clippy::all, missing_docs)]

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod imagery;
pub mod map;
pub mod obs;
pub mod server;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::{OnceCell, RwLock as AsyncRwLock};
	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tower as _};
