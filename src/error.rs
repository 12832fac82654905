//! Poller-level error types shared by the token session, fetcher, and poll loop.

// self
use crate::_prelude::*;

/// Poller-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical poller error exposed by public APIs.
///
/// None of these variants is fatal to the process; the poll loop reports them upward and keeps
/// scheduling cycles until it is cancelled.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential exchange failed or the search endpoint rejected the bearer token.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Non-auth HTTP failure, transport failure, or undecodable page.
	#[error(transparent)]
	Fetch(#[from] FetchError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The caller's cancellation token fired while a suspension point was pending.
	#[error("Polling was cancelled.")]
	Cancelled,
}
impl Error {
	/// Returns `true` for credential or token failures.
	pub fn is_auth(&self) -> bool {
		matches!(self, Self::Auth(_))
	}

	/// Returns `true` when the error only reflects an orderly shutdown.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

/// Token acquisition and token rejection failures.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint answered with a non-200 status and a non-OAuth body.
	#[error("Token endpoint returned HTTP {status}: {excerpt}")]
	TokenEndpoint {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Truncated response body.
		excerpt: String,
	},
	/// Token endpoint answered with a structured OAuth error.
	#[error("Token endpoint rejected the client credentials: {reason}.")]
	Rejected {
		/// OAuth `error_description`, or the `error` code when no description was sent.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint answered 200 with a body that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint returned something the exchange could not interpret.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// Summary of the unexpected response.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Network failure while calling the token endpoint.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Token endpoint did not answer within the descriptor's request timeout.
	#[error("Token endpoint did not answer within {timeout:?}.")]
	Timeout {
		/// Timeout that elapsed.
		timeout: StdDuration,
	},
	/// Search endpoint answered 401/403 for the presented bearer token.
	#[error("Search endpoint rejected the bearer token with HTTP {status}.")]
	TokenRejected {
		/// HTTP status code (401 or 403).
		status: u16,
	},
}
impl AuthError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Box::new(src) }
	}

	/// Returns the HTTP status associated with the failure, when one is known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::TokenEndpoint { status, .. } | Self::TokenRejected { status } => Some(*status),
			Self::Rejected { status, .. }
			| Self::TokenResponseParse { status, .. }
			| Self::Unexpected { status, .. } => *status,
			Self::Transport { .. } | Self::Timeout { .. } => None,
		}
	}
}

/// Failure category carried by [`FetchError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
	/// Search endpoint answered with a status outside the success allow-list.
	Status,
	/// Network failure (DNS, TCP, TLS) before a response arrived.
	Transport,
	/// No response arrived within the descriptor's request timeout.
	Timeout,
	/// Response status was accepted but the body is not a search page.
	Decode,
}
impl FetchErrorKind {
	/// Returns a stable label suitable for log or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Status => "status",
			Self::Transport => "transport",
			Self::Timeout => "timeout",
			Self::Decode => "decode",
		}
	}
}
impl Display for FetchErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Search request failure that is not an authentication problem.
#[derive(Debug, ThisError)]
#[error("{}", describe_fetch_failure(.kind, .status, .excerpt))]
pub struct FetchError {
	/// Failure category.
	pub kind: FetchErrorKind,
	/// HTTP status code, when a response arrived.
	pub status: Option<u16>,
	/// Truncated response body for diagnostics.
	pub excerpt: Option<String>,
	/// Upstream `Retry-After` hint; informational only, it never shortens the request budget.
	pub retry_after: Option<Duration>,
	#[source]
	source: Option<BoxError>,
}
impl FetchError {
	/// Builds a [`FetchErrorKind::Status`] failure.
	pub fn status(status: u16, excerpt: impl Into<String>) -> Self {
		Self {
			kind: FetchErrorKind::Status,
			status: Some(status),
			excerpt: Some(excerpt.into()),
			retry_after: None,
			source: None,
		}
	}

	/// Builds a [`FetchErrorKind::Transport`] failure wrapping the transport error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self {
			kind: FetchErrorKind::Transport,
			status: None,
			excerpt: None,
			retry_after: None,
			source: Some(Box::new(src)),
		}
	}

	/// Builds a [`FetchErrorKind::Timeout`] failure.
	pub fn timeout() -> Self {
		Self {
			kind: FetchErrorKind::Timeout,
			status: None,
			excerpt: None,
			retry_after: None,
			source: None,
		}
	}

	/// Builds a [`FetchErrorKind::Decode`] failure for an accepted status with an unusable body.
	pub fn decode(
		status: u16,
		excerpt: impl Into<String>,
		src: serde_path_to_error::Error<serde_json::Error>,
	) -> Self {
		Self {
			kind: FetchErrorKind::Decode,
			status: Some(status),
			excerpt: Some(excerpt.into()),
			retry_after: None,
			source: Some(Box::new(src)),
		}
	}

	/// Attaches an upstream retry hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}
}

fn describe_fetch_failure(
	kind: &FetchErrorKind,
	status: &Option<u16>,
	excerpt: &Option<String>,
) -> String {
	let head = match (*kind, *status) {
		(FetchErrorKind::Status, Some(status)) => format!("Search endpoint returned HTTP {status}"),
		(FetchErrorKind::Decode, Some(status)) =>
			format!("Search endpoint returned an undecodable page with HTTP {status}"),
		(FetchErrorKind::Timeout, _) => "Search endpoint did not answer in time".into(),
		(kind, _) => format!("Search request failed ({kind})"),
	};

	match excerpt.as_deref() {
		Some(excerpt) if !excerpt.is_empty() => format!("{head}: {excerpt}"),
		_ => format!("{head}."),
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// An endpoint URL could not be converted for the OAuth client.
	#[error("Descriptor contains an invalid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Descriptor validation failed.
	#[error(transparent)]
	Descriptor(#[from] crate::api::ApiDescriptorError),
	/// Identifier validation failed.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Request budget parameters are unusable.
	#[error("Request budget is invalid: {reason}.")]
	InvalidBudget {
		/// Which parameter was rejected.
		reason: &'static str,
	},
}

/// Why a required field could not be read from a raw item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MalformedReason {
	/// The key is absent.
	Missing,
	/// The key is present with a `null` value.
	Null,
	/// The value is an array or object where a scalar was required.
	NotScalar,
	/// The item itself is not a JSON object.
	NotAnObject,
}
impl MalformedReason {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Missing => "missing",
			Self::Null => "null",
			Self::NotScalar => "not_scalar",
			Self::NotAnObject => "not_an_object",
		}
	}
}

/// Single raw item that could not be normalized; the batch skips it and counts it.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error(
	"Item {} has an unusable `{field}` field ({}).",
	.item_id.as_deref().unwrap_or("<unknown>"),
	.reason.as_str()
)]
pub struct MalformedItemError {
	/// Raw key that failed.
	pub field: &'static str,
	/// Failure category.
	pub reason: MalformedReason,
	/// Upstream identifier of the item, when it could be read.
	pub item_id: Option<String>,
}

/// Truncates a response body to `limit` characters for diagnostics, appending `…` when cut.
pub fn excerpt(body: &[u8], limit: usize) -> String {
	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.chars().count() <= limit {
		return text.to_owned();
	}

	let mut buf = text.chars().take(limit).collect::<String>();

	buf.push('…');

	buf
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;

	#[test]
	fn excerpt_truncates_long_bodies() {
		let body = "x".repeat(300);
		let cut = excerpt(body.as_bytes(), 256);

		assert_eq!(cut.chars().count(), 257);
		assert!(cut.ends_with('…'));
		assert_eq!(excerpt(b"  short body \n", 256), "short body");
	}

	#[test]
	fn fetch_error_display_includes_status_and_excerpt() {
		let err = FetchError::status(502, "bad gateway");

		assert_eq!(err.to_string(), "Search endpoint returned HTTP 502: bad gateway");
		assert_eq!(err.kind, FetchErrorKind::Status);
		assert!(StdError::source(&err).is_none());

		let timeout = FetchError::timeout();

		assert_eq!(timeout.to_string(), "Search endpoint did not answer in time.");
	}

	#[test]
	fn decode_failures_keep_the_json_path_as_source() {
		let mut deserializer = serde_json::Deserializer::from_str("{\"total\":\"many\"}");
		let path_err =
			serde_path_to_error::deserialize::<_, HashMap<String, u64>>(&mut deserializer)
				.expect_err("A string total should not decode.");
		let err = FetchError::decode(405, "", path_err);

		assert_eq!(err.to_string(), "Search endpoint returned an undecodable page with HTTP 405.");

		let source = StdError::source(&err).expect("Decode failures should expose the serde error.");

		assert!(source.to_string().starts_with("total"));
	}

	#[test]
	fn transport_errors_expose_their_source() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
		let err: Error = FetchError::transport(io).into();

		assert!(!err.is_auth());
		assert!(!err.is_cancelled());

		let source = StdError::source(&err)
			.expect("Transport failures should expose the underlying error.");

		assert_eq!(source.to_string(), "reset by peer");
	}

	#[test]
	fn malformed_item_message_names_the_field() {
		let err = MalformedItemError {
			field: "price",
			reason: MalformedReason::Missing,
			item_id: Some("42".into()),
		};

		assert_eq!(err.to_string(), "Item 42 has an unusable `price` field (missing).");
	}

	#[test]
	fn auth_error_status_helper_covers_variants() {
		assert_eq!(AuthError::TokenRejected { status: 401 }.status(), Some(401));
		assert_eq!(
			AuthError::TokenEndpoint { status: 500, excerpt: "boom".into() }.status(),
			Some(500)
		);
		assert_eq!(AuthError::Timeout { timeout: StdDuration::from_secs(30) }.status(), None);
		assert!(Error::from(AuthError::TokenRejected { status: 403 }).is_auth());
	}
}
