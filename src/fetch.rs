//! One authenticated, paginated search request per call.
//!
//! A [`Fetcher`] owns the request budget and pagination cursor of a single search, so fetches
//! for that search are strictly sequential. Searches against the same upstream account share one
//! [`TokenManager`].

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue},
	},
};
// self
use crate::{
	_prelude::*,
	api::ApiDescriptor,
	auth::{SearchId, Token},
	budget::{BudgetPolicy, RequestBudget},
	cursor::PaginationCursor,
	error::{self, AuthError, ConfigError, FetchError},
	http::{self, HttpTransport, Interrupted, ResponseMetadataSlot},
	obs::{self, trace_event},
	search::{RawPage, SearchFilter},
	session::TokenManager,
};

/// Issues search requests for one configured search.
pub struct Fetcher<C>
where
	C: ?Sized + HttpTransport,
{
	search: SearchId,
	descriptor: Arc<ApiDescriptor>,
	http_client: Arc<C>,
	tokens: Arc<TokenManager<C>>,
	budget: RequestBudget,
	cursor: PaginationCursor,
}
impl<C> Fetcher<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a fetcher with an idle budget and a cursor at page 1.
	pub fn new(
		search: SearchId,
		descriptor: impl Into<Arc<ApiDescriptor>>,
		http_client: impl Into<Arc<C>>,
		tokens: Arc<TokenManager<C>>,
		policy: BudgetPolicy,
	) -> Self {
		Self {
			search,
			descriptor: descriptor.into(),
			http_client: http_client.into(),
			tokens,
			budget: RequestBudget::new(policy),
			cursor: PaginationCursor::new(),
		}
	}

	/// Replaces the cursor, e.g. to resume from a known page.
	pub fn with_cursor(mut self, cursor: PaginationCursor) -> Self {
		self.cursor = cursor;

		self
	}

	/// Name of the search this fetcher serves.
	pub fn search(&self) -> &SearchId {
		&self.search
	}

	/// Descriptor of the upstream API.
	pub fn descriptor(&self) -> &ApiDescriptor {
		&self.descriptor
	}

	/// Shared token session.
	pub fn tokens(&self) -> &TokenManager<C> {
		&self.tokens
	}

	/// Request budget owned by this search.
	pub fn budget(&self) -> &RequestBudget {
		&self.budget
	}

	/// Pagination cursor owned by this search.
	pub fn cursor(&self) -> &PaginationCursor {
		&self.cursor
	}

	/// Waits for the budget, ensures a token, and fetches the cursor's current page.
	///
	/// The cursor is not advanced; callers advance it once the page has been consumed.
	pub async fn fetch(&self, filter: &SearchFilter, cancel: &CancellationToken) -> Result<RawPage> {
		self.budget.wait_until_permitted(cancel).await?;

		let token = self.tokens.acquire(cancel).await?;

		self.dispatch(filter, self.cursor.current_page(), &token, cancel).await
	}

	/// Sends one search request for `page` with `token` and classifies the response.
	///
	/// The request is recorded against the budget before dispatch, whatever the outcome. The
	/// budget is not consulted here; callers wait on it first.
	pub async fn dispatch(
		&self,
		filter: &SearchFilter,
		page: u32,
		token: &Token,
		cancel: &CancellationToken,
	) -> Result<RawPage> {
		let request = self.build_request(filter, page, token)?;
		let handle = self.http_client.with_metadata(ResponseMetadataSlot::default());
		let timeout = self.descriptor.request_timeout;

		self.budget.record_request();

		trace_event!(debug, search = %self.search, page, "Dispatching search request.");

		let response = match http::bounded(handle.call(request), timeout, cancel).await {
			Ok(Ok(response)) => response,
			Ok(Err(err)) => {
				obs::record_request(&self.search, None);

				return Err(FetchError::transport(err).into());
			},
			Err(Interrupted::TimedOut) => {
				obs::record_request(&self.search, None);

				return Err(FetchError::timeout().into());
			},
			Err(Interrupted::Cancelled) => return Err(Error::Cancelled),
		};

		obs::record_request(&self.search, Some(response.status().as_u16()));

		self.classify(response)
	}

	fn build_request(
		&self,
		filter: &SearchFilter,
		page: u32,
		token: &Token,
	) -> Result<HttpRequest, ConfigError> {
		let mut authorization = HeaderValue::try_from(token.authorization_header())
			.map_err(|err| ConfigError::HttpRequest(err.into()))?;

		authorization.set_sensitive(true);

		let request = Request::builder()
			.method(Method::POST)
			.uri(self.descriptor.endpoints.search.as_str())
			.header(AUTHORIZATION, authorization)
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(ACCEPT, "application/json")
			.body(filter.encode_form(page))?;

		Ok(request)
	}

	fn classify(&self, response: HttpResponse) -> Result<RawPage> {
		let status = response.status().as_u16();
		let body = response.body();

		if self.descriptor.is_auth_rejection(status) {
			trace_event!(warn, search = %self.search, status, "Search endpoint rejected the bearer token.");

			return Err(AuthError::TokenRejected { status }.into());
		}

		let excerpt_limit = self.descriptor.quirks.excerpt_limit;

		if !self.descriptor.is_success_status(status) {
			let excerpt = error::excerpt(body, excerpt_limit);

			trace_event!(
				warn,
				search = %self.search,
				status,
				excerpt = %excerpt,
				"Search endpoint returned a non-success status."
			);

			return Err(FetchError::status(status, excerpt)
				.with_retry_after(http::parse_retry_after(response.headers()))
				.into());
		}

		RawPage::from_slice(body)
			.map_err(|err| FetchError::decode(status, error::excerpt(body, excerpt_limit), err).into())
	}
}
impl<C> Debug for Fetcher<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Fetcher")
			.field("search", &self.search)
			.field("api", &self.descriptor.id)
			.field("budget", &self.budget)
			.field("cursor", &self.cursor)
			.finish()
	}
}
