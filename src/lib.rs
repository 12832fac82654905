//! Budget-aware polling engine for credential-gated listing search APIs.
//!
//! The poller exchanges client credentials for bearer tokens and paces requests inside a fixed
//! window. It walks result pages with a wrapping cursor and normalizes every item into a stable
//! listing schema.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod budget;
pub mod cursor;
pub mod error;
pub mod fetch;
pub mod http;
pub mod normalize;
pub mod obs;
pub mod poll;
pub mod search;
pub mod session;

mod oauth;

#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		api::ApiDescriptor,
		auth::{ApiId, CredentialStore, Credentials, SearchId},
		budget::BudgetPolicy,
		fetch::Fetcher,
		http::{HttpTransport, ReqwestHttpClient},
		normalize::Normalizer,
		poll::{PollLoop, ReqwestPollLoop},
		search::{GeoPoint, OperationKind, SearchFilter},
		session::TokenManager,
	};

	/// API key shared by the test fixtures.
	pub const TEST_KEY: &str = "test-key";
	/// API secret shared by the test fixtures.
	pub const TEST_SECRET: &str = "test-secret";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a descriptor whose token and search endpoints resolve to the provided URLs.
	pub fn test_descriptor(token_endpoint: &str, search_endpoint: &str) -> ApiDescriptor {
		ApiDescriptor::builder(ApiId::new("mock-api").expect("Mock API identifier should be valid."))
			.token_endpoint(Url::parse(token_endpoint).expect("Token endpoint should parse."))
			.search_endpoint(Url::parse(search_endpoint).expect("Search endpoint should parse."))
			.token_scope("read")
			.build()
			.expect("Mock API descriptor should build successfully.")
	}

	/// Barcelona rent search mirroring the fields a production search sends.
	pub fn test_filter() -> SearchFilter {
		SearchFilter::new(GeoPoint::new(41.3874, 2.1686), 15_000, OperationKind::Rent)
			.with_min_size(40)
			.with_max_price(2_000)
	}

	/// Budget that allows one request per millisecond so multi-cycle tests stay fast.
	pub fn fast_budget() -> BudgetPolicy {
		BudgetPolicy::new(1_000, StdDuration::from_secs(1))
			.expect("Fast test budget should be valid.")
	}

	/// Constructs a [`PollLoop`] for the `barcelona-rent` search over any transport, returning
	/// the shared [`TokenManager`] so tests can inspect exchanges.
	pub fn build_test_poller<C>(
		descriptor: ApiDescriptor,
		http_client: Arc<C>,
		policy: BudgetPolicy,
	) -> (PollLoop<C>, Arc<TokenManager<C>>)
	where
		C: HttpTransport,
	{
		let descriptor = Arc::new(descriptor);
		let credentials = CredentialStore::new(Credentials::new(TEST_KEY, TEST_SECRET));
		let tokens =
			Arc::new(TokenManager::new(descriptor.clone(), credentials, http_client.clone()));
		let fetcher = Fetcher::new(
			SearchId::new("barcelona-rent").expect("Search identifier should be valid."),
			descriptor,
			http_client,
			tokens.clone(),
			policy,
		);
		let poller = PollLoop::new(fetcher, Normalizer::new("idealista"), test_filter());

		(poller, tokens)
	}

	/// Constructs a [`PollLoop`] backed by the reqwest transport and test credentials.
	pub fn build_reqwest_test_poller(
		descriptor: ApiDescriptor,
		policy: BudgetPolicy,
	) -> (ReqwestPollLoop, Arc<TokenManager<ReqwestHttpClient>>) {
		build_test_poller(descriptor, Arc::new(test_reqwest_http_client()), policy)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
