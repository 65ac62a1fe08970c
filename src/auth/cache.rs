//! Single-slot access token cache with single-flight renewal.
//!
//! Readers holding a fresh token proceed in parallel under the read lock. A stale or missing
//! token sends the caller to the write path, which excludes readers and other writers until the
//! renewal finishes. Callers that queued behind a renewal re-check the slot under the write lock
//! and reuse the token it produced, so a burst of expiring requests reaches upstream once.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, IssuedToken, TokenExchange},
	obs::{OpKind, OpSpan},
};

/// Holds at most one upstream access token plus its absolute expiry.
pub struct TokenCache {
	exchange: Arc<dyn TokenExchange>,
	slot: AsyncRwLock<Option<AccessToken>>,
	renewal_window: Duration,
}
impl TokenCache {
	/// Renew this long before the real expiry so handed-out tokens survive a round trip.
	pub const DEFAULT_RENEWAL_WINDOW: Duration = Duration::seconds(60);

	/// Creates an empty cache backed by `exchange`.
	pub fn new(exchange: Arc<dyn TokenExchange>) -> Self {
		Self {
			exchange,
			slot: AsyncRwLock::new(None),
			renewal_window: Self::DEFAULT_RENEWAL_WINDOW,
		}
	}

	/// Overrides the early-renewal window (defaults to 60 seconds).
	pub fn with_renewal_window(mut self, window: Duration) -> Self {
		self.renewal_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Returns the cached token, renewing it first when missing or inside the renewal window.
	pub async fn token(&self) -> Result<IssuedToken> {
		self.token_at(OffsetDateTime::now_utc()).await
	}

	/// Same as [`token`](Self::token) with an explicit clock reading.
	pub async fn token_at(&self, now: OffsetDateTime) -> Result<IssuedToken> {
		{
			let slot = self.slot.read().await;

			if let Some(current) = slot.as_ref().filter(|token| !self.is_stale(token, now)) {
				return Ok(current.issue_at(now));
			}
		}

		self.renew(now).await
	}

	/// Snapshot of the token currently considered valid, if any.
	pub async fn current(&self) -> Option<AccessToken> {
		self.slot.read().await.clone()
	}

	async fn renew(&self, now: OffsetDateTime) -> Result<IssuedToken> {
		let mut slot = self.slot.write().await;

		// Another caller renewed while this one waited for the write lock.
		if let Some(current) = slot.as_ref().filter(|token| !self.is_stale(token, now)) {
			return Ok(current.issue_at(now));
		}

		*slot = None;

		let grant =
			OpSpan::new(OpKind::TokenRenewal, "renew").observe(self.exchange.exchange()).await?;
		let expires_in = grant.expires_in.whole_seconds();
		let token = AccessToken::from_grant(grant, now);
		let issued = IssuedToken { access_token: token.value.clone(), expires_in };

		tracing::info!(expires_at = %token.expires_at, "renewed upstream access token");

		*slot = Some(token);

		Ok(issued)
	}

	fn is_stale(&self, token: &AccessToken, now: OffsetDateTime) -> bool {
		token.is_stale_at(now, self.renewal_window)
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache").field("renewal_window", &self.renewal_window).finish()
	}
}
