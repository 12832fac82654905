//! Bearer token issued by the client-credentials grant.

// self
use crate::{_prelude::*, auth::Secret};

/// Bearer credential attached to every search request.
///
/// `expires_at` is `None` when the grant did not state a lifetime; such tokens are reused until
/// the search endpoint rejects them.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
	/// Bearer value; callers must avoid logging it.
	pub bearer: Secret,
	/// Instant the exchange completed.
	pub acquired_at: OffsetDateTime,
	/// Expiry derived from `expires_in`, when the grant stated one.
	pub expires_at: Option<OffsetDateTime>,
}
impl Token {
	/// Creates a token without a tracked lifetime.
	pub fn new(bearer: impl Into<String>, acquired_at: OffsetDateTime) -> Self {
		Self { bearer: Secret::new(bearer), acquired_at, expires_at: None }
	}

	/// Sets an absolute expiry instant.
	pub fn expiring_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the expiry relative to `acquired_at`.
	pub fn expiring_in(self, lifetime: Duration) -> Self {
		let expires_at = self.acquired_at + lifetime;

		self.expiring_at(expires_at)
	}

	/// Returns `true` if the token is known to be expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}

	/// Returns `true` if the token should be replaced before use at `instant`, refreshing
	/// `preemptive_window` ahead of the tracked expiry.
	pub fn should_refresh_at(&self, instant: OffsetDateTime, preemptive_window: Duration) -> bool {
		match self.expires_at {
			Some(expires_at) => expires_at - instant <= preemptive_window,
			None => false,
		}
	}

	/// Returns `true` if both tokens carry the same bearer value.
	pub fn is_same_grant(&self, other: &Token) -> bool {
		self.bearer == other.bearer
	}

	/// Formats the `Authorization` header value.
	pub fn authorization_header(&self) -> String {
		format!("Bearer {}", self.bearer.expose())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("bearer", &self.bearer)
			.field("acquired_at", &self.acquired_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn untracked_tokens_never_expire() {
		let token = Token::new("opaque", macros::datetime!(2025-01-01 00:00 UTC));

		assert!(!token.is_expired_at(macros::datetime!(2030-01-01 00:00 UTC)));
		assert!(!token.should_refresh_at(macros::datetime!(2030-01-01 00:00 UTC), Duration::HOUR));
	}

	#[test]
	fn tracked_tokens_refresh_inside_the_preemptive_window() {
		let token = Token::new("opaque", macros::datetime!(2025-01-01 00:00 UTC))
			.expiring_in(Duration::hours(12));

		assert_eq!(token.expires_at, Some(macros::datetime!(2025-01-01 12:00 UTC)));
		assert!(!token.should_refresh_at(
			macros::datetime!(2025-01-01 11:58 UTC),
			Duration::seconds(60)
		));
		assert!(token.should_refresh_at(
			macros::datetime!(2025-01-01 11:59:30 UTC),
			Duration::seconds(60)
		));
		assert!(token.is_expired_at(macros::datetime!(2025-01-01 12:00 UTC)));
	}

	#[test]
	fn header_and_debug_output() {
		let token = Token::new("abc123", OffsetDateTime::now_utc());

		assert_eq!(token.authorization_header(), "Bearer abc123");
		assert!(!format!("{token:?}").contains("abc123"));
		assert!(token.is_same_grant(&token.clone()));
	}
}
