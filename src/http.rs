//! Transport primitives shared by the token exchange and the search fetcher.
//!
//! The module exposes [`HttpTransport`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so callers can plug in custom HTTP clients (or scripted fakes)
//! without losing status capture. Implementations call [`ResponseMetadataSlot::take`] before
//! dispatching a request and [`ResponseMetadataSlot::store`] once an HTTP status or retry hint
//! is known, which lets the token session classify failures with consistent metadata.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError,
	http::{HeaderMap, header::RETRY_AFTER},
};
#[cfg(feature = "reqwest")] use oauth2::{HttpRequest, HttpResponse};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Abstraction over HTTP transports that carry both the token exchange and the search request.
///
/// The trait is the poller's only dependency on an HTTP stack. Callers provide an implementation
/// (typically behind `Arc<T>`) and the poller requests short-lived [`AsyncHttpClient`] handles
/// that each carry a clone of a [`ResponseMetadataSlot`]. Implementations must be
/// `Send + Sync + 'static` so one transport can be shared by the token session and every
/// fetcher, and the handles they return must own whatever state their request futures need.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Connection-level failure type (DNS, TLS, reset, body read).
	type TransportError: 'static + Send + Sync + StdError;

	/// Per-request client that writes what it observed into a [`ResponseMetadataSlot`].
	///
	/// The request future returned by [`AsyncHttpClient::call`] must be `Send` so poll cycles
	/// can run on multi-threaded executors.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Returns a handle for one exchange or search request whose observations land in `slot`.
	///
	/// # Slot Protocol
	///
	/// - Clear the slot with [`ResponseMetadataSlot::take`] before the request leaves.
	/// - [`ResponseMetadataSlot::store`] the status of any response that arrives, including
	///   error statuses; leave the slot empty when the connection itself failed.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Status and pacing hint of the last response a handle received.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response arrived.
	pub status: Option<u16>,
	/// Parsed `Retry-After` header, relative to the moment the response arrived.
	pub retry_after: Option<Duration>,
}

/// Shared cell through which a transport hands [`ResponseMetadata`] to the fetcher and the
/// token session.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Records the metadata of the response that just arrived.
	pub fn store(&self, metadata: ResponseMetadata) {
		self.0.lock().replace(metadata);
	}

	/// Empties the slot, returning whatever was recorded.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Default transport: one pooled [`ReqwestClient`] shared by the token session and every
/// search fetcher.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Uses a preconfigured client (proxies, custom roots, relaxed TLS in tests).
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		InstrumentedHandle { client: self.0.clone(), slot }
	}
}

/// Handle returned by [`ReqwestHttpClient`] that records every response status in its slot.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct InstrumentedHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let response =
				self.client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();

			self.slot.store(ResponseMetadata {
				status: Some(status.as_u16()),
				retry_after: parse_retry_after(response.headers()),
			});

			let headers = response.headers().clone();
			let body = response.bytes().await.map_err(Box::new)?;
			let mut converted = HttpResponse::new(body.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

/// Why a [`bounded`] future did not produce its output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Interrupted {
	Cancelled,
	TimedOut,
}

/// Drives `fut` until it completes, `timeout` elapses, or `cancel` fires.
///
/// Cancellation wins ties so shutdown is never delayed by a response racing in.
pub(crate) async fn bounded<F>(
	fut: F,
	timeout: StdDuration,
	cancel: &CancellationToken,
) -> Result<F::Output, Interrupted>
where
	F: Future,
{
	tokio::select! {
		biased;
		_ = cancel.cancelled() => Err(Interrupted::Cancelled),
		res = tokio::time::timeout(timeout, fut) => res.map_err(|_| Interrupted::TimedOut),
	}
}

/// Reads a `Retry-After` header in either delta-seconds or HTTP-date form.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
