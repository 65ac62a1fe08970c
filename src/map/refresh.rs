//! Background token refresh for the map client.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::task::JoinHandle;
// self
use crate::{_prelude::*, map::MapController};

/// Handle to the refresh task started by [`MapController::start_token_refresh`].
///
/// The task stops when the handle is stopped or dropped.
#[derive(Debug)]
pub struct TokenRefresher {
	handle: JoinHandle<()>,
}
impl TokenRefresher {
	/// Refresh this long before the reported expiry.
	pub const DEFAULT_MARGIN: StdDuration = StdDuration::from_secs(30);
	/// Lower bound between two refreshes.
	pub const MIN_DELAY: StdDuration = StdDuration::from_secs(1);

	pub(crate) fn spawn(controller: Arc<MapController>, margin: StdDuration) -> Self {
		let handle = tokio::spawn(async move {
			loop {
				let issued = match controller.refresh_token().await {
					Ok(issued) => issued,
					Err(e) => {
						tracing::warn!(error = %e, "token refresh failed; refresher stopped");

						break;
					},
				};
				let delay = next_delay(issued.expires_in, margin);

				tracing::debug!(delay_secs = delay.as_secs(), "next token refresh scheduled");

				tokio::time::sleep(delay).await;
			}
		});

		Self { handle }
	}

	/// Whether the task has exited (stopped, or a refresh failed).
	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}

	/// Cancels the task.
	pub fn stop(self) {
		self.handle.abort();
	}
}
impl Drop for TokenRefresher {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

/// Sleep before the next refresh: `expires_in - margin`, never below [`TokenRefresher::MIN_DELAY`].
pub fn next_delay(expires_in: i64, margin: StdDuration) -> StdDuration {
	let expires_in = StdDuration::from_secs(u64::try_from(expires_in).unwrap_or_default());

	expires_in.saturating_sub(margin).max(TokenRefresher::MIN_DELAY)
}
