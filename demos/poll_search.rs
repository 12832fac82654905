//! Polls a mocked listing search API for three budgeted cycles and prints the normalized
//! listings every cycle delivers to an in-memory sink.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use listing_poller::{
	api::ApiDescriptor,
	auth::{ApiId, CredentialStore, Credentials, SearchId},
	budget::BudgetPolicy,
	fetch::Fetcher,
	http::ReqwestHttpClient,
	normalize::Normalizer,
	poll::{ListingSink, MemorySink, PollLoop},
	reqwest::Client,
	search::{GeoPoint, OperationKind, SearchFilter},
	session::TokenManager,
	tokio_util::sync::CancellationToken,
};

const PAGE_ONE: &str = r#"{"elementList":[{"propertyCode":"101","url":"https://listings.test/101","price":950,"size":62,"rooms":2,"address":"Carrer de Mallorca","hasLift":true,"thumbnail":"https://img.test/101.jpg"}],"total":2,"totalPages":2}"#;
const PAGE_TWO: &str = r#"{"elementList":[{"propertyCode":"102","url":"https://listings.test/102","price":1200,"size":80,"rooms":3,"address":"Passeig de Gracia"},{"url":"https://listings.test/broken"}],"total":2,"totalPages":2}"#;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-bearer\",\"token_type\":\"bearer\",\"expires_in\":43200}",
			);
		})
		.await;
	let page_one = server
		.mock_async(|when, then| {
			when.method(POST).path("/search").form_urlencoded_tuple("numPage", "1");
			then.status(200).header("content-type", "application/json").body(PAGE_ONE);
		})
		.await;
	let page_two = server
		.mock_async(|when, then| {
			when.method(POST).path("/search").form_urlencoded_tuple("numPage", "2");
			then.status(200).header("content-type", "application/json").body(PAGE_TWO);
		})
		.await;
	let descriptor = Arc::new(
		ApiDescriptor::builder(ApiId::new("demo-api")?)
			.token_endpoint(Url::parse(&server.url("/oauth/token"))?)
			.search_endpoint(Url::parse(&server.url("/search"))?)
			.token_scope("read")
			.build()?,
	);
	let http_client = Arc::new(ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	));
	let tokens = Arc::new(TokenManager::<ReqwestHttpClient>::new(
		descriptor.clone(),
		CredentialStore::new(Credentials::new("demo-key", "demo-secret")),
		http_client.clone(),
	));
	let fetcher = Fetcher::<ReqwestHttpClient>::new(
		SearchId::new("barcelona-rent")?,
		descriptor,
		http_client,
		tokens.clone(),
		BudgetPolicy::new(3, Duration::from_secs(3))?,
	);
	let filter = SearchFilter::new(GeoPoint::new(41.3874, 2.1686), 15_000, OperationKind::Rent)
		.with_max_price(2_000);
	let poller = PollLoop::new(fetcher, Normalizer::new("idealista"), filter);
	let sink = MemorySink::default();
	let cancel = CancellationToken::new();

	for _ in 0..3 {
		let report = poller.run_cycle(&cancel).await?;

		println!(
			"Page {} delivered {} listing(s), skipped {}; next page is {}.",
			report.page,
			report.listings.len(),
			report.skipped,
			report.next_page
		);

		for listing in &report.listings {
			println!(
				"  {} {} ({} EUR, lift: {}).",
				listing.id, listing.address, listing.price, listing.lift
			);
		}

		sink.deliver(report).await?;
	}

	println!(
		"Collected {} report(s) using {} token exchange(s).",
		sink.len(),
		tokens.exchange_count()
	);

	token_mock.assert_async().await;
	page_one.assert_calls_async(2).await;
	page_two.assert_async().await;

	Ok(())
}
