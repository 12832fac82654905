// self
use crate::_prelude::*;

/// Upstream-specific quirks that influence how search responses are classified.
///
/// `success_statuses` is an explicit allow-list. The Idealista search endpoint is observed to
/// return complete page payloads with HTTP 405 under some conditions, so the default list is
/// `[200, 405]`; other upstreams should narrow it to `[200]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiQuirks {
	/// Statuses whose body is decoded as a search page.
	pub success_statuses: Vec<u16>,
	/// Maximum characters of a response body kept in error excerpts.
	pub excerpt_limit: usize,
}
impl Default for ApiQuirks {
	fn default() -> Self {
		Self { success_statuses: vec![200, 405], excerpt_limit: 256 }
	}
}
