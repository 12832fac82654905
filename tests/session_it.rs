#![cfg(all(feature = "reqwest", feature = "test"))]

// crates.io
use httpmock::prelude::*;
// self
use listing_poller::{
	_preludet::*,
	auth::{CredentialStore, Credentials, Token},
	error::AuthError,
	http::ReqwestHttpClient,
	session::TokenManager,
};

const BASIC_AUTHORIZATION: &str = "Basic dGVzdC1rZXk6dGVzdC1zZWNyZXQ=";

fn build_manager(server: &MockServer) -> TokenManager<ReqwestHttpClient> {
	let descriptor = test_descriptor(&server.url("/oauth/token"), &server.url("/search"));
	let credentials = CredentialStore::new(Credentials::new(TEST_KEY, TEST_SECRET));

	TokenManager::new(descriptor, credentials, test_reqwest_http_client())
}

#[tokio::test]
async fn acquire_sends_basic_auth_and_caches_the_token() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("authorization", BASIC_AUTHORIZATION)
				.form_urlencoded_tuple("grant_type", "client_credentials")
				.form_urlencoded_tuple("scope", "read");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"bearer-one\",\"token_type\":\"bearer\",\"expires_in\":43200}",
			);
		})
		.await;
	let manager = build_manager(&server);
	let cancel = CancellationToken::new();
	let first = manager.acquire(&cancel).await.expect("Initial exchange should succeed.");
	let second = manager.acquire(&cancel).await.expect("Cached token should be returned.");

	mock.assert_calls_async(1).await;

	assert_eq!(first.bearer.expose(), "bearer-one");
	assert!(first.is_same_grant(&second));
	assert!(first.expires_at.is_some());
	assert_eq!(manager.exchange_count(), 1);
}

#[tokio::test]
async fn concurrent_acquires_share_one_exchange() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_millis(100))
				.body("{\"access_token\":\"shared\",\"token_type\":\"bearer\"}");
		})
		.await;
	let manager = build_manager(&server);
	let cancel = CancellationToken::new();
	let (a, b, c) =
		tokio::join!(manager.acquire(&cancel), manager.acquire(&cancel), manager.acquire(&cancel));

	for token in [a, b, c] {
		assert_eq!(token.expect("Every caller should get a token.").bearer.expose(), "shared");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn token_endpoint_failure_is_an_auth_error() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(500).header("content-type", "text/plain").body("upstream unavailable");
		})
		.await;
	let manager = build_manager(&server);
	let err = manager
		.acquire(&CancellationToken::new())
		.await
		.expect_err("HTTP 500 from the token endpoint should fail.");

	mock.assert_async().await;

	match err {
		Error::Auth(AuthError::TokenEndpoint { status, excerpt }) => {
			assert_eq!(status, 500);
			assert_eq!(excerpt, "upstream unavailable");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(manager.cached().is_none());
}

#[tokio::test]
async fn oauth_error_bodies_are_rejections() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\",\"error_description\":\"unknown api key\"}");
		})
		.await;

	let err = build_manager(&server)
		.acquire(&CancellationToken::new())
		.await
		.expect_err("Rejected credentials should fail.");

	assert!(err.is_auth());
	assert!(matches!(
		err,
		Error::Auth(AuthError::Rejected { ref reason, status: Some(401) }) if reason == "unknown api key"
	));
}

#[tokio::test]
async fn short_lived_tokens_are_replaced_preemptively() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"short-lived\",\"token_type\":\"bearer\",\"expires_in\":30}",
			);
		})
		.await;
	let manager = build_manager(&server);
	let cancel = CancellationToken::new();

	manager.acquire(&cancel).await.expect("First exchange should succeed.");
	manager.acquire(&cancel).await.expect("Second exchange should succeed.");

	mock.assert_calls_async(2).await;

	let relaxed = build_manager(&server).with_preemptive_window(Duration::ZERO);

	relaxed.acquire(&cancel).await.expect("Exchange should succeed.");
	relaxed.acquire(&cancel).await.expect("Cached token should be reused.");

	mock.assert_calls_async(3).await;
}

#[tokio::test]
async fn refresh_replaces_only_the_rejected_token() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"rotating\",\"token_type\":\"bearer\"}");
		})
		.await;
	let manager = build_manager(&server);
	let cancel = CancellationToken::new();
	let first = manager.acquire(&cancel).await.expect("Initial exchange should succeed.");

	manager.refresh(&first, &cancel).await.expect("Forced exchange should succeed.");

	mock.assert_calls_async(2).await;

	let stale = Token::new("already-replaced", OffsetDateTime::now_utc());
	let current =
		manager.refresh(&stale, &cancel).await.expect("Cached replacement should be returned.");

	assert_eq!(current.bearer.expose(), "rotating");

	mock.assert_calls_async(2).await;

	manager.invalidate();
	manager.acquire(&cancel).await.expect("Exchange after invalidation should succeed.");

	mock.assert_calls_async(3).await;
	assert_eq!(manager.exchange_count(), 3);
}

#[tokio::test]
async fn cancelled_exchanges_return_promptly() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_secs(10))
				.body("{\"access_token\":\"late\",\"token_type\":\"bearer\"}");
		})
		.await;

	let manager = build_manager(&server);
	let cancel = CancellationToken::new();
	let canceller = cancel.clone();

	tokio::spawn(async move {
		tokio::time::sleep(StdDuration::from_millis(50)).await;
		canceller.cancel();
	});

	let err = manager.acquire(&cancel).await.expect_err("Cancellation should abort the exchange.");

	assert!(err.is_cancelled());
	assert!(manager.cached().is_none());
}
