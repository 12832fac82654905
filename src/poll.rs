//! Poll-cycle orchestration.
//!
//! Each cycle walks `WaitForBudget → EnsureToken → Fetch → Normalize → AdvanceCursor`. A search
//! endpoint rejection of the bearer token inserts one `RefreshToken → Fetch` detour; a second
//! rejection ends the cycle. Failed cycles never advance the cursor and never crash the loop.

pub mod sink;

pub use sink::*;

// self
use crate::{
	_prelude::*,
	auth::SearchId,
	budget::BudgetDecision,
	error::AuthError,
	fetch::Fetcher,
	http::HttpTransport,
	normalize::{Listing, Normalizer},
	obs::{self, CycleOutcome, CycleSpan, CycleStage, trace_event},
	search::{RawPage, SearchFilter},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Poll loop specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestPollLoop = PollLoop<ReqwestHttpClient>;

/// Outcome of one cycle.
#[derive(Debug)]
pub struct CycleReport {
	/// Search the cycle ran for.
	pub search: SearchId,
	/// Page requested by the cycle.
	pub page: u32,
	/// Page the next cycle requests.
	pub next_page: u32,
	/// Total results reported by the upstream.
	pub total: Option<u64>,
	/// Page count reported by the upstream.
	pub total_pages: Option<u32>,
	/// Normalized listings; empty for failed cycles.
	pub listings: Vec<Listing>,
	/// Items skipped as malformed.
	pub skipped: usize,
	/// Failure that ended the cycle early.
	pub failure: Option<Error>,
}
impl CycleReport {
	/// Builds the report of a cycle that failed while requesting `page`.
	pub fn failed(search: SearchId, page: u32, failure: Error) -> Self {
		Self {
			search,
			page,
			next_page: page,
			total: None,
			total_pages: None,
			listings: Vec::new(),
			skipped: 0,
			failure: Some(failure),
		}
	}

	/// Returns `true` if the cycle ended with a failure.
	pub fn is_partial(&self) -> bool {
		self.failure.is_some()
	}
}

/// Counters accumulated by [`PollLoop::run`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollSummary {
	/// Completed cycles, failed ones included.
	pub cycles: u64,
	/// Cycles that ended with a failure.
	pub failures: u64,
	/// Listings delivered.
	pub listings: usize,
	/// Items skipped as malformed.
	pub skipped: usize,
	/// Reports the sink rejected.
	pub sink_failures: u64,
}

/// Drives the poll cycles of one search.
pub struct PollLoop<C>
where
	C: ?Sized + HttpTransport,
{
	fetcher: Fetcher<C>,
	normalizer: Normalizer,
	filter: SearchFilter,
	stage: Mutex<CycleStage>,
	failure_backoff: StdDuration,
}
impl<C> PollLoop<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a loop; the failure backoff defaults to the budget interval.
	pub fn new(fetcher: Fetcher<C>, normalizer: Normalizer, filter: SearchFilter) -> Self {
		let failure_backoff = fetcher.budget().policy().interval();

		Self { fetcher, normalizer, filter, stage: Mutex::new(CycleStage::Idle), failure_backoff }
	}

	/// Overrides the pause [`run`](Self::run) takes after a failed cycle that the budget alone
	/// would let retry immediately (e.g. a failed token exchange, which records no request).
	pub fn with_failure_backoff(mut self, backoff: StdDuration) -> Self {
		self.failure_backoff = backoff;

		self
	}

	/// Fetcher owning the budget and cursor.
	pub fn fetcher(&self) -> &Fetcher<C> {
		&self.fetcher
	}

	/// Normalizer applied to every page.
	pub fn normalizer(&self) -> &Normalizer {
		&self.normalizer
	}

	/// Filter sent with every request.
	pub fn filter(&self) -> &SearchFilter {
		&self.filter
	}

	/// Stage the loop is currently in.
	pub fn stage(&self) -> CycleStage {
		*self.stage.lock()
	}

	/// Runs one cycle.
	pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport> {
		let search = self.fetcher.search();
		let span = CycleSpan::new(search, CycleStage::WaitForBudget);

		obs::record_cycle_outcome(search, CycleOutcome::Attempt);

		let result = span.instrument(self.cycle(cancel)).await;

		self.set_stage(CycleStage::Idle);

		let outcome = match &result {
			Ok(_) => CycleOutcome::Success,
			Err(err) if err.is_cancelled() => CycleOutcome::Cancelled,
			Err(_) => CycleOutcome::Failure,
		};

		obs::record_cycle_outcome(search, outcome);

		result
	}

	/// Runs cycles until `cancel` fires, handing every report to `sink`.
	///
	/// Failed cycles are delivered as partial reports. Sink errors are logged and counted; they
	/// never stop the loop.
	pub async fn run(&self, sink: &dyn ListingSink, cancel: &CancellationToken) -> PollSummary {
		let search = self.fetcher.search();
		let mut summary = PollSummary::default();

		while !cancel.is_cancelled() {
			let page = self.fetcher.cursor().current_page();
			let report = match self.run_cycle(cancel).await {
				Ok(report) => report,
				Err(err) if err.is_cancelled() => break,
				Err(err) => {
					trace_event!(warn, search = %search, page, error = %err, "Poll cycle failed.");

					summary.failures += 1;

					CycleReport::failed(search.clone(), page, err)
				},
			};
			let failed = report.is_partial();

			summary.cycles += 1;
			summary.listings += report.listings.len();
			summary.skipped += report.skipped;

			match sink.deliver(report).await {
				Ok(()) => {},
				#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
				Err(err) => {
					trace_event!(warn, search = %search, error = %err, "Sink rejected a cycle report.");

					summary.sink_failures += 1;
				},
			}

			if failed && self.fetcher.budget().evaluate() == BudgetDecision::Allow {
				tokio::select! {
					biased;
					_ = cancel.cancelled() => break,
					_ = tokio::time::sleep(self.failure_backoff) => {},
				}
			}
		}

		trace_event!(
			info,
			search = %search,
			cycles = summary.cycles,
			failures = summary.failures,
			"Poll loop stopped."
		);

		summary
	}

	async fn cycle(&self, cancel: &CancellationToken) -> Result<CycleReport> {
		let fetcher = &self.fetcher;

		self.set_stage(CycleStage::WaitForBudget);
		fetcher.budget().wait_until_permitted(cancel).await?;
		self.set_stage(CycleStage::EnsureToken);

		let token = fetcher.tokens().acquire(cancel).await?;
		let page = fetcher.cursor().current_page();

		self.set_stage(CycleStage::Fetch);

		let raw = match fetcher.dispatch(&self.filter, page, &token, cancel).await {
			#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
			Err(Error::Auth(AuthError::TokenRejected { status })) => {
				trace_event!(info, status, "Bearer token rejected; forcing one re-exchange.");

				self.set_stage(CycleStage::RefreshToken);

				let token = fetcher.tokens().refresh(&token, cancel).await?;

				self.set_stage(CycleStage::Fetch);

				fetcher.dispatch(&self.filter, page, &token, cancel).await?
			},
			result => result?,
		};

		Ok(self.consume(page, raw))
	}

	fn consume(&self, page: u32, raw: RawPage) -> CycleReport {
		self.set_stage(CycleStage::Normalize);

		let batch = self.normalizer.normalize_batch(&raw.element_list);

		self.set_stage(CycleStage::AdvanceCursor);

		let next_page = self.fetcher.cursor().advance(raw.total_pages);

		trace_event!(
			info,
			page,
			next_page,
			total = raw.total,
			total_pages = raw.total_pages,
			listings = batch.listings.len(),
			skipped = batch.skipped,
			"Poll cycle completed."
		);

		CycleReport {
			search: self.fetcher.search().clone(),
			page,
			next_page,
			total: Some(raw.total),
			total_pages: Some(raw.total_pages),
			listings: batch.listings,
			skipped: batch.skipped,
			failure: None,
		}
	}

	fn set_stage(&self, stage: CycleStage) {
		*self.stage.lock() = stage;
	}
}
impl<C> Debug for PollLoop<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PollLoop")
			.field("fetcher", &self.fetcher)
			.field("normalizer", &self.normalizer)
			.field("stage", &self.stage())
			.field("failure_backoff", &self.failure_backoff)
			.finish()
	}
}
