//! Outbound contract for cycle reports.

// self
use crate::{_prelude::*, normalize::Listing, poll::CycleReport};

/// Boxed future returned by [`ListingSink::deliver`].
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + 'a + Send>>;

/// Consumer of cycle reports (deduplication, notification, persistence, ...).
pub trait ListingSink
where
	Self: Send + Sync,
{
	/// Takes ownership of one cycle's report.
	fn deliver(&self, report: CycleReport) -> SinkFuture<'_>;
}

/// Error type produced by [`ListingSink`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SinkError {
	/// The sink refused or failed to accept the report.
	#[error("Sink rejected the report: {message}.")]
	Rejected {
		/// Human-readable error payload.
		message: String,
	},
}

/// Thread-safe sink that keeps reports in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemorySink(Arc<Mutex<Vec<CycleReport>>>);
impl MemorySink {
	/// Removes and returns every collected report.
	pub fn take(&self) -> Vec<CycleReport> {
		std::mem::take(&mut *self.0.lock())
	}

	/// Number of collected reports.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` if no report was collected.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}

	/// Clones every listing collected so far, in delivery order.
	pub fn listings(&self) -> Vec<Listing> {
		self.0.lock().iter().flat_map(|report| report.listings.iter().cloned()).collect()
	}
}
impl ListingSink for MemorySink {
	fn deliver(&self, report: CycleReport) -> SinkFuture<'_> {
		let reports = self.0.clone();

		Box::pin(async move {
			reports.lock().push(report);

			Ok(())
		})
	}
}
