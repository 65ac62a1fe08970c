// crates.io
use tracing::{Instrument, instrument::Instrumented};
// self
use crate::{
	_prelude::*,
	obs::{self, OpKind, OpOutcome},
};

/// A span builder used by proxy operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	kind: OpKind,
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		let span = tracing::info_span!("imagery_proxy.op", op = kind.as_str(), stage);

		Self { kind, span }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}

	/// Runs `fut` inside the span and records its attempt and outcome.
	pub async fn observe<Fut, T, E>(self, fut: Fut) -> Result<T, E>
	where
		Fut: Future<Output = Result<T, E>>,
		E: Display,
	{
		obs::record_op_outcome(self.kind, OpOutcome::Attempt);

		let result = OpSpan::instrument(&self, fut).await;

		obs::record_op_outcome(self.kind, OpOutcome::of(&result));

		if let Err(e) = &result {
			self.span.in_scope(|| tracing::debug!(error = %e, "operation failed"));
		}

		result
	}
}
