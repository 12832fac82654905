//! Flat listing schema shared by every upstream.

// self
use crate::_prelude::*;

/// Canonical listing record handed to sinks.
///
/// Every field is a string so numeric values keep one representation across sources. Optional
/// attributes hold [`UNKNOWN`](crate::normalize::UNKNOWN) instead of being omitted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
	/// Upstream identifier.
	pub id: String,
	/// Public listing URL.
	pub url: String,
	/// Full description text, never truncated.
	pub title: String,
	/// Price.
	pub price: String,
	/// Size in square metres.
	pub size: String,
	/// Room count.
	pub rooms: String,
	/// Street address.
	pub address: String,
	/// Thumbnail URL.
	pub image_url: String,
	/// Name of the crawler that produced the listing.
	pub crawler_name: String,
	/// Whether the building has a lift.
	pub lift: String,
	/// Price per square metre.
	pub price_per_area: String,
	/// Neighborhood.
	pub neighborhood: String,
	/// District; usually absent for sale searches.
	pub district: String,
	/// Bathroom count.
	pub bathrooms: String,
	/// Property condition.
	pub status: String,
	/// Latitude.
	pub latitude: String,
	/// Longitude.
	pub longitude: String,
	/// Agency reference.
	pub external_reference: String,
}
