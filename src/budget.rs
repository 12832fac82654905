//! Request budget: at most `max_requests_per_window` search calls per window, evenly spaced.
//!
//! The budget counts calls *attempted*, not calls that succeeded, so a failing upstream never
//! earns an early retry slot. The first request after construction is permitted immediately;
//! every later request waits at least `window / max_requests_per_window` after the previous
//! recorded request.

// std
use std::num::NonZeroU32;
// crates.io
use tokio::time::Instant;
// self
use crate::{_prelude::*, error::ConfigError, obs::trace_event};

/// Pacing parameters for one search.
///
/// Deserialization runs the same checks as [`BudgetPolicy::new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyFields", into = "PolicyFields")]
pub struct BudgetPolicy {
	max_requests_per_window: NonZeroU32,
	window: StdDuration,
}
impl BudgetPolicy {
	/// Longest accepted window.
	pub const MAX_WINDOW: StdDuration = StdDuration::from_secs(366 * 24 * 60 * 60);

	/// Creates a policy, rejecting zero requests and windows that are empty or longer than
	/// [`Self::MAX_WINDOW`].
	pub fn new(max_requests_per_window: u32, window: StdDuration) -> Result<Self, ConfigError> {
		let max_requests_per_window = NonZeroU32::new(max_requests_per_window)
			.ok_or(ConfigError::InvalidBudget { reason: "max requests per window must be positive" })?;

		if window.is_zero() {
			return Err(ConfigError::InvalidBudget { reason: "window must be longer than zero" });
		}
		if window > Self::MAX_WINDOW {
			return Err(ConfigError::InvalidBudget { reason: "window must not exceed 366 days" });
		}

		Ok(Self { max_requests_per_window, window })
	}

	/// Maximum requests dispatched inside one window.
	pub fn max_requests_per_window(&self) -> u32 {
		self.max_requests_per_window.get()
	}

	/// Window length.
	pub fn window(&self) -> StdDuration {
		self.window
	}

	/// Fixed spacing between permitted requests.
	pub fn interval(&self) -> StdDuration {
		self.window / self.max_requests_per_window.get()
	}
}
impl Default for BudgetPolicy {
	fn default() -> Self {
		Self {
			max_requests_per_window: NonZeroU32::MIN.saturating_add(2),
			window: StdDuration::from_secs(24 * 60 * 60),
		}
	}
}
impl TryFrom<PolicyFields> for BudgetPolicy {
	type Error = ConfigError;

	fn try_from(fields: PolicyFields) -> Result<Self, Self::Error> {
		Self::new(fields.max_requests_per_window, fields.window)
	}
}

#[derive(Serialize, Deserialize)]
struct PolicyFields {
	max_requests_per_window: u32,
	window: StdDuration,
}
impl From<BudgetPolicy> for PolicyFields {
	fn from(policy: BudgetPolicy) -> Self {
		Self { max_requests_per_window: policy.max_requests_per_window(), window: policy.window }
	}
}

/// Result of evaluating the budget at an instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BudgetDecision {
	/// The request may proceed immediately.
	Allow,
	/// The request must wait.
	Delay(RetryDirective),
}

/// Advises callers when the next request becomes permitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when the next request is permitted.
	pub earliest_retry_at: Instant,
	/// Remaining wait measured from the evaluation instant.
	pub recommended_backoff: StdDuration,
	/// Which limit produced the delay.
	pub reason: &'static str,
}

/// Point-in-time request statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetSnapshot {
	/// Requests recorded since construction.
	pub total_requests: u64,
	/// Requests recorded in the current window.
	pub window_requests: u32,
	/// Start of the current window, if any request was recorded.
	pub window_started_at: Option<Instant>,
	/// Most recent recorded request.
	pub last_request_at: Option<Instant>,
	/// Earliest instant the next request is permitted; `None` means immediately.
	pub next_permitted_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct BudgetState {
	total_requests: u64,
	window_requests: u32,
	window_started_at: Option<Instant>,
	last_request_at: Option<Instant>,
}

/// Budget owned by one search; never shared across searches.
#[derive(Debug)]
pub struct RequestBudget {
	policy: BudgetPolicy,
	state: Mutex<BudgetState>,
}
impl RequestBudget {
	/// Creates an idle budget.
	pub fn new(policy: BudgetPolicy) -> Self {
		Self { policy, state: Mutex::new(BudgetState::default()) }
	}

	/// Policy this budget enforces.
	pub fn policy(&self) -> &BudgetPolicy {
		&self.policy
	}

	/// Evaluates the budget now.
	pub fn evaluate(&self) -> BudgetDecision {
		self.evaluate_at(Instant::now())
	}

	/// Evaluates the budget at `now`.
	pub fn evaluate_at(&self, now: Instant) -> BudgetDecision {
		let state = self.state.lock();
		let Some((earliest, reason)) = self.next_permitted(&state) else {
			return BudgetDecision::Allow;
		};

		if now >= earliest {
			return BudgetDecision::Allow;
		}

		BudgetDecision::Delay(RetryDirective {
			earliest_retry_at: earliest,
			recommended_backoff: earliest - now,
			reason,
		})
	}

	/// Suspends until the next request is permitted or `cancel` fires.
	pub async fn wait_until_permitted(&self, cancel: &CancellationToken) -> Result<()> {
		loop {
			if cancel.is_cancelled() {
				return Err(Error::Cancelled);
			}

			let directive = match self.evaluate() {
				BudgetDecision::Allow => return Ok(()),
				BudgetDecision::Delay(directive) => directive,
			};

			trace_event!(
				info,
				reason = directive.reason,
				backoff_secs = directive.recommended_backoff.as_secs(),
				wake_at = %(OffsetDateTime::now_utc() + directive.recommended_backoff),
				"Request budget exhausted; sleeping until the next slot."
			);

			tokio::select! {
				biased;
				_ = cancel.cancelled() => return Err(Error::Cancelled),
				_ = tokio::time::sleep_until(directive.earliest_retry_at) => {},
			}
		}
	}

	/// Records one attempted request now.
	pub fn record_request(&self) {
		self.record_request_at(Instant::now());
	}

	/// Records one attempted request at `now`.
	pub fn record_request_at(&self, now: Instant) {
		let mut state = self.state.lock();
		let window_expired = state
			.window_started_at
			.is_none_or(|started| now.saturating_duration_since(started) >= self.policy.window);

		if window_expired {
			state.window_started_at = Some(now);
			state.window_requests = 0;
		}

		state.window_requests = state.window_requests.saturating_add(1);
		state.total_requests = state.total_requests.saturating_add(1);
		state.last_request_at = Some(now);

		trace_event!(
			debug,
			total = state.total_requests,
			in_window = state.window_requests,
			max = self.policy.max_requests_per_window(),
			"Search request recorded against the budget."
		);
	}

	/// Returns current request statistics.
	pub fn snapshot(&self) -> BudgetSnapshot {
		let state = self.state.lock();

		BudgetSnapshot {
			total_requests: state.total_requests,
			window_requests: state.window_requests,
			window_started_at: state.window_started_at,
			last_request_at: state.last_request_at,
			next_permitted_at: self.next_permitted(&state).map(|(at, _)| at),
		}
	}

	fn next_permitted(&self, state: &BudgetState) -> Option<(Instant, &'static str)> {
		let last = state.last_request_at?;
		let mut earliest = (last + self.policy.interval(), "interval");

		// Integer division can shorten the interval by a few nanoseconds; the window cap still holds.
		let window_full = state.window_requests >= self.policy.max_requests_per_window();

		if let Some(started) = state.window_started_at.filter(|_| window_full) {
			let window_end = started + self.policy.window;

			if window_end > earliest.0 {
				earliest = (window_end, "window");
			}
		}

		Some(earliest)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const HOUR: StdDuration = StdDuration::from_secs(60 * 60);

	#[test]
	fn policy_validation_and_defaults() {
		let policy = BudgetPolicy::default();

		assert_eq!(policy.max_requests_per_window(), 3);
		assert_eq!(policy.interval(), 8 * HOUR);
		assert!(BudgetPolicy::new(0, HOUR).is_err());
		assert!(BudgetPolicy::new(3, StdDuration::ZERO).is_err());
		assert_eq!(
			BudgetPolicy::new(4, HOUR).expect("Valid policy should build.").interval(),
			StdDuration::from_secs(15 * 60)
		);
	}

	#[test]
	fn deserialization_applies_the_same_checks() {
		let policy: BudgetPolicy =
			serde_json::from_str(r#"{"max_requests_per_window":4,"window":{"secs":3600,"nanos":0}}"#)
				.expect("Valid policy should deserialize.");

		assert_eq!(policy.interval(), StdDuration::from_secs(15 * 60));
		assert!(
			serde_json::from_str::<BudgetPolicy>(
				r#"{"max_requests_per_window":3,"window":{"secs":0,"nanos":0}}"#
			)
			.is_err()
		);
		assert!(
			serde_json::from_str::<BudgetPolicy>(
				r#"{"max_requests_per_window":0,"window":{"secs":60,"nanos":0}}"#
			)
			.is_err()
		);

		let json = serde_json::to_string(&policy).expect("Policy should serialize.");

		assert_eq!(json, r#"{"max_requests_per_window":4,"window":{"secs":3600,"nanos":0}}"#);
	}

	#[tokio::test(start_paused = true)]
	async fn oversized_windows_are_rejected_and_the_cap_is_usable() {
		assert!(BudgetPolicy::new(1, StdDuration::MAX).is_err());
		assert!(BudgetPolicy::new(1, BudgetPolicy::MAX_WINDOW + StdDuration::from_secs(1)).is_err());

		let budget = RequestBudget::new(
			BudgetPolicy::new(1, BudgetPolicy::MAX_WINDOW).expect("Window at the cap should pass."),
		);
		let now = Instant::now();

		budget.record_request_at(now);

		match budget.evaluate_at(now) {
			BudgetDecision::Delay(directive) =>
				assert_eq!(directive.recommended_backoff, BudgetPolicy::MAX_WINDOW),
			BudgetDecision::Allow => panic!("A spent single-request window should delay."),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn first_request_is_free() {
		let budget = RequestBudget::new(BudgetPolicy::default());
		let started = Instant::now();

		budget
			.wait_until_permitted(&CancellationToken::new())
			.await
			.expect("First request should be permitted.");

		assert_eq!(Instant::now(), started);
		assert_eq!(budget.evaluate(), BudgetDecision::Allow);
	}

	#[tokio::test(start_paused = true)]
	async fn nth_request_waits_for_n_minus_one_intervals() {
		let budget = RequestBudget::new(BudgetPolicy::default());
		let cancel = CancellationToken::new();
		let started = Instant::now();

		for n in 1..=5_u32 {
			budget.wait_until_permitted(&cancel).await.expect("Wait should not be cancelled.");

			assert!(Instant::now() - started >= budget.policy().interval() * (n - 1));

			budget.record_request();
		}

		assert_eq!(budget.snapshot().total_requests, 5);
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_interrupts_a_long_wait() {
		let budget = RequestBudget::new(BudgetPolicy::default());
		let cancel = CancellationToken::new();
		let started = Instant::now();

		budget.record_request();

		let canceller = cancel.clone();

		tokio::spawn(async move {
			tokio::time::sleep(StdDuration::from_secs(5)).await;
			canceller.cancel();
		});

		let err = budget
			.wait_until_permitted(&cancel)
			.await
			.expect_err("Cancellation should interrupt the wait.");

		assert!(err.is_cancelled());
		assert!(Instant::now() - started < HOUR);
	}

	#[tokio::test(start_paused = true)]
	async fn evaluation_reports_the_remaining_backoff() {
		let budget = RequestBudget::new(BudgetPolicy::default());
		let now = Instant::now();

		budget.record_request_at(now);

		match budget.evaluate_at(now + HOUR) {
			BudgetDecision::Delay(directive) => {
				assert_eq!(directive.earliest_retry_at, now + 8 * HOUR);
				assert_eq!(directive.recommended_backoff, 7 * HOUR);
				assert_eq!(directive.reason, "interval");
			},
			BudgetDecision::Allow => panic!("Request inside the interval should be delayed."),
		}

		assert_eq!(budget.evaluate_at(now + 8 * HOUR), BudgetDecision::Allow);
	}

	#[tokio::test(start_paused = true)]
	async fn window_cap_holds_when_the_interval_rounds_down() {
		let policy = BudgetPolicy::new(3, StdDuration::from_nanos(10))
			.expect("Tiny window should still be valid.");
		let budget = RequestBudget::new(policy);
		let now = Instant::now();

		for step in 0..3 {
			budget.record_request_at(now + policy.interval() * step);
		}

		let snapshot = budget.snapshot();

		assert_eq!(snapshot.window_requests, 3);
		assert_eq!(snapshot.window_started_at, Some(now));
		assert_eq!(snapshot.next_permitted_at, Some(now + StdDuration::from_nanos(10)));
		assert!(matches!(
			budget.evaluate_at(now + StdDuration::from_nanos(9)),
			BudgetDecision::Delay(RetryDirective { reason: "window", .. })
		));
	}
}
