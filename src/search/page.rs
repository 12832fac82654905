//! Raw search page as returned by the upstream.

// self
use crate::_prelude::*;

/// One page of search results; `element_list` items stay untyped until normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
	/// Raw result items.
	pub element_list: Vec<serde_json::Value>,
	/// Total results across all pages.
	pub total: u64,
	/// Page count for the current query.
	pub total_pages: u32,
	/// Page the upstream says it served.
	#[serde(default)]
	pub actual_page: Option<u32>,
	/// Page size the upstream applied.
	#[serde(default)]
	pub items_per_page: Option<u32>,
}
impl RawPage {
	/// Decodes a page, reporting the JSON path of the first mismatch.
	pub fn from_slice(body: &[u8]) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let mut deserializer = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut deserializer)
	}
}
