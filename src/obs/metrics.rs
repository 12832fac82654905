// self
use crate::{auth::SearchId, obs::CycleOutcome};

/// Records a cycle outcome via the global metrics recorder (when enabled).
pub fn record_cycle_outcome(search: &SearchId, outcome: CycleOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"listing_poller_cycle_total",
			"search" => search.to_string(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (search, outcome);
	}
}

/// Records one dispatched search request; `status` is `None` when no response arrived.
pub fn record_request(search: &SearchId, status: Option<u16>) {
	#[cfg(feature = "metrics")]
	{
		let status = status.map_or_else(|| "none".to_owned(), |code| code.to_string());

		metrics::counter!(
			"listing_poller_request_total",
			"search" => search.to_string(),
			"status" => status
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (search, status);
	}
}
