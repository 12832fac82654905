//! Optional observability helpers for poll cycles.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `listing_poller.cycle` with the `search` and
//!   `stage` fields, plus the crate's log events.
//! - Enable `metrics` to increment `listing_poller_cycle_total` (labeled by `search` + `outcome`)
//!   and `listing_poller_request_total` (labeled by `search` + `status`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Emits a `tracing` event when the `tracing` feature is enabled and compiles away otherwise.
macro_rules! trace_event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		::tracing::$level!($($arg)+);
	};
}
pub(crate) use trace_event;

/// Stages of the poll-cycle state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CycleStage {
	/// Between cycles.
	#[default]
	Idle,
	/// Suspended until the request budget permits the next call.
	WaitForBudget,
	/// Obtaining a cached or fresh bearer token.
	EnsureToken,
	/// Search request in flight.
	Fetch,
	/// Forced token re-exchange after the search endpoint rejected the bearer.
	RefreshToken,
	/// Mapping raw items into listings.
	Normalize,
	/// Moving the pagination cursor.
	AdvanceCursor,
}
impl CycleStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CycleStage::Idle => "idle",
			CycleStage::WaitForBudget => "wait_for_budget",
			CycleStage::EnsureToken => "ensure_token",
			CycleStage::Fetch => "fetch",
			CycleStage::RefreshToken => "refresh_token",
			CycleStage::Normalize => "normalize",
			CycleStage::AdvanceCursor => "advance_cursor",
		}
	}
}
impl Display for CycleStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleOutcome {
	/// Cycle started.
	Attempt,
	/// Cycle fetched and normalized a page.
	Success,
	/// Cycle ended with an auth or fetch failure.
	Failure,
	/// Cycle was interrupted by shutdown.
	Cancelled,
}
impl CycleOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CycleOutcome::Attempt => "attempt",
			CycleOutcome::Success => "success",
			CycleOutcome::Failure => "failure",
			CycleOutcome::Cancelled => "cancelled",
		}
	}
}
impl Display for CycleOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
