//! Cached access token and the wire shapes handed to callers.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access token granted by the upstream OAuth endpoint.
#[derive(Clone, Debug)]
pub struct TokenGrant {
	/// Bearer token value.
	pub access_token: TokenSecret,
	/// Lifetime reported by the endpoint.
	pub expires_in: Duration,
}

/// The single token held by [`TokenCache`](crate::auth::TokenCache).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	/// Bearer token value.
	pub value: TokenSecret,
	/// Absolute expiry instant.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Stamps a grant received at `issued_at` with its absolute expiry.
	pub fn from_grant(grant: TokenGrant, issued_at: OffsetDateTime) -> Self {
		Self { value: grant.access_token, expires_at: issued_at + grant.expires_in }
	}

	/// Returns `true` once `now` falls inside the early-renewal `window` before expiry.
	pub fn is_stale_at(&self, now: OffsetDateTime, window: Duration) -> bool {
		self.expires_at - window < now
	}

	/// Time left before the token expires, floored to whole seconds.
	pub fn remaining_at(&self, now: OffsetDateTime) -> i64 {
		(self.expires_at - now).whole_seconds()
	}

	/// Builds the caller-facing view at `now`.
	pub fn issue_at(&self, now: OffsetDateTime) -> IssuedToken {
		IssuedToken { access_token: self.value.clone(), expires_in: self.remaining_at(now) }
	}
}

/// Token handed to callers: `{ "access_token": ..., "expires_in": ... }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
	/// Bearer token value.
	pub access_token: TokenSecret,
	/// Seconds until the token expires.
	pub expires_in: i64,
}
