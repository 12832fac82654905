//! Bearer-token session shared by every search that targets the same upstream account.
//!
//! [`TokenManager`] caches the token issued by the client-credentials exchange and only calls
//! the token endpoint when nothing is cached, the cached token is inside its preemptive refresh
//! window, or the search endpoint rejected it. A single async guard serializes exchanges, so
//! concurrent callers piggy-back on the in-flight exchange instead of stampeding the token
//! endpoint.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	api::ApiDescriptor,
	auth::{CredentialStore, Token},
	http::HttpTransport,
	oauth,
	obs::trace_event,
};

/// Owns the cached bearer token for one credential pair.
pub struct TokenManager<C>
where
	C: ?Sized + HttpTransport,
{
	http_client: Arc<C>,
	descriptor: Arc<ApiDescriptor>,
	credentials: CredentialStore,
	preemptive_window: Duration,
	cached: Mutex<Option<Token>>,
	exchange_guard: AsyncMutex<()>,
	exchanges: AtomicU64,
}
impl<C> TokenManager<C>
where
	C: ?Sized + HttpTransport,
{
	const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);

	/// Creates a session for the descriptor's token endpoint using the provided transport.
	pub fn new(
		descriptor: impl Into<Arc<ApiDescriptor>>,
		credentials: CredentialStore,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			descriptor: descriptor.into(),
			credentials,
			preemptive_window: Self::DEFAULT_PREEMPTIVE_WINDOW,
			cached: Mutex::new(None),
			exchange_guard: AsyncMutex::new(()),
			exchanges: AtomicU64::new(0),
		}
	}

	/// Overrides how long before a tracked expiry the token is replaced (defaults to 60 seconds).
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Returns a usable token, exchanging credentials only when no fresh token is cached.
	pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Token> {
		self.acquire_replacing(None, cancel).await
	}

	/// Forces a re-exchange after the search endpoint rejected `rejected`.
	///
	/// If another caller already replaced the rejected token, the replacement is returned
	/// without a second exchange.
	pub async fn refresh(&self, rejected: &Token, cancel: &CancellationToken) -> Result<Token> {
		self.acquire_replacing(Some(rejected), cancel).await
	}

	/// Drops the cached token so the next [`acquire`](Self::acquire) performs an exchange.
	pub fn invalidate(&self) {
		self.cached.lock().take();
	}

	/// Returns a clone of the cached token, if any.
	pub fn cached(&self) -> Option<Token> {
		self.cached.lock().clone()
	}

	/// Number of completed exchanges since construction.
	pub fn exchange_count(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Descriptor whose token endpoint this session calls.
	pub fn descriptor(&self) -> &ApiDescriptor {
		&self.descriptor
	}

	async fn acquire_replacing(
		&self,
		rejected: Option<&Token>,
		cancel: &CancellationToken,
	) -> Result<Token> {
		if let Some(token) = self.usable_cached(rejected) {
			return Ok(token);
		}

		let _singleflight = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(Error::Cancelled),
			guard = self.exchange_guard.lock() => guard,
		};

		// Another caller may have finished an exchange while this one waited on the guard.
		if let Some(token) = self.usable_cached(rejected) {
			return Ok(token);
		}

		self.invalidate();

		let token = oauth::exchange_client_credentials(
			&self.descriptor,
			self.credentials.lookup(),
			self.http_client.as_ref(),
			cancel,
		)
		.await?;

		self.exchanges.fetch_add(1, Ordering::Relaxed);
		*self.cached.lock() = Some(token.clone());

		trace_event!(
			info,
			api = %self.descriptor.id,
			expires_at = ?token.expires_at,
			forced = rejected.is_some(),
			"Bearer token acquired."
		);

		Ok(token)
	}

	fn usable_cached(&self, rejected: Option<&Token>) -> Option<Token> {
		let now = OffsetDateTime::now_utc();
		let cached = self.cached.lock();
		let token = cached.as_ref()?;

		if rejected.is_some_and(|rejected| rejected.is_same_grant(token)) {
			return None;
		}
		if token.is_expired_at(now) || token.should_refresh_at(now, self.preemptive_window) {
			trace_event!(debug, expires_at = ?token.expires_at, "Cached bearer token is stale.");

			return None;
		}

		Some(token.clone())
	}
}
impl<C> Debug for TokenManager<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("api", &self.descriptor.id)
			.field("credentials", &self.credentials)
			.field("preemptive_window", &self.preemptive_window)
			.field("token_cached", &self.cached.lock().is_some())
			.field("exchanges", &self.exchange_count())
			.finish()
	}
}
