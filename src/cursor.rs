//! Pagination cursor that walks a result set and wraps back to page 1.

// self
use crate::_prelude::*;

/// Cursor position and the last page count reported by the upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
	/// Page requested by the next fetch; always at least 1.
	pub current_page: u32,
	/// Page count from the most recent successful response; `None` before the first one.
	pub total_pages: Option<u32>,
}
impl Default for PaginationState {
	fn default() -> Self {
		Self { current_page: 1, total_pages: None }
	}
}

/// Per-search pagination cursor.
///
/// Only successful fetches advance it. After the last page the cursor resets to 1, and an empty
/// result set (`total_pages == 0`) counts as one virtual page so the cursor never gets stuck.
#[derive(Debug, Default)]
pub struct PaginationCursor {
	state: Mutex<PaginationState>,
}
impl PaginationCursor {
	/// Creates a cursor at page 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a cursor at `page`, clamped to at least 1.
	pub fn starting_at(page: u32) -> Self {
		Self { state: Mutex::new(PaginationState { current_page: page.max(1), total_pages: None }) }
	}

	/// Page the next fetch requests.
	pub fn current_page(&self) -> u32 {
		self.state.lock().current_page
	}

	/// Last page count reported by the upstream.
	pub fn total_pages(&self) -> Option<u32> {
		self.state.lock().total_pages
	}

	/// Copy of the full cursor state.
	pub fn state(&self) -> PaginationState {
		*self.state.lock()
	}

	/// Learns the authoritative page count from a successful response and moves to the next page.
	///
	/// Returns the page the next fetch will request.
	pub fn advance(&self, total_pages: u32) -> u32 {
		let mut state = self.state.lock();

		state.total_pages = Some(total_pages);
		state.current_page = if total_pages == 0 || state.current_page >= total_pages {
			1
		} else {
			state.current_page + 1
		};

		state.current_page
	}
}
