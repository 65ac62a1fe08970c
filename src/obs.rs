//! Observability helpers for proxy operations.
//!
//! - Every instrumented operation runs inside a `tracing` span named `imagery_proxy.op` with the
//!   `op` (operation) and `stage` (call site) fields.
//! - Enable the `metrics` feature to increment the `imagery_proxy_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Client-credentials exchange against the OAuth endpoint.
	TokenExchange,
	/// Token cache renewal (write path).
	TokenRenewal,
	/// Product index fetch, filter, enrichment, and sort.
	CatalogLoad,
	/// Per-pixel capture lookup issued by the map client.
	PixelInfo,
	/// Tile layer (re)creation in the map client.
	LayerSetup,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::TokenExchange => "token_exchange",
			OpKind::TokenRenewal => "token_renewal",
			OpKind::CatalogLoad => "catalog_load",
			OpKind::PixelInfo => "pixel_info",
			OpKind::LayerSetup => "layer_setup",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}

	/// Maps a result onto its outcome label.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		match result {
			Ok(_) => OpOutcome::Success,
			Err(_) => OpOutcome::Failure,
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
