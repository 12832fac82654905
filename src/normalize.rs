//! Tolerant mapping from raw search items to the canonical [`Listing`] schema.
//!
//! Raw items are decoded into a key/value view first ([`RawItem`]); required fields are then
//! pulled strictly and optional fields fall back to [`UNKNOWN`]. A malformed item is skipped and
//! counted without affecting the rest of its batch.

pub mod listing;
pub mod raw;

pub use listing::*;
pub use raw::*;

// self
use crate::{_prelude::*, error::MalformedItemError, obs::trace_event};

/// Listings produced from one page plus the number of items that had to be skipped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedBatch {
	/// Successfully normalized listings, in upstream order.
	pub listings: Vec<Listing>,
	/// Items dropped because a required field was unusable.
	pub skipped: usize,
}

/// Stateless normalizer stamping every listing with the crawler name.
#[derive(Clone, Debug)]
pub struct Normalizer {
	crawler_name: String,
}
impl Normalizer {
	/// Creates a normalizer for listings produced by `crawler_name`.
	pub fn new(crawler_name: impl Into<String>) -> Self {
		Self { crawler_name: crawler_name.into() }
	}

	/// Name stamped on every listing.
	pub fn crawler_name(&self) -> &str {
		&self.crawler_name
	}

	/// Normalizes one raw item.
	pub fn normalize(&self, item: &serde_json::Value) -> Result<Listing, MalformedItemError> {
		let raw = RawItem::new(item)?;
		let title = raw
			.present("description")
			.or_else(|| raw.present_nested(&["suggestedTexts", "title"]))
			.unwrap_or_else(|| UNKNOWN.to_owned());

		Ok(Listing {
			id: raw.required("propertyCode")?,
			url: raw.required("url")?,
			title,
			price: raw.required("price")?,
			size: raw.required("size")?,
			rooms: raw.required("rooms")?,
			address: raw.required("address")?,
			image_url: raw.optional("thumbnail"),
			crawler_name: self.crawler_name.clone(),
			lift: raw.optional("hasLift"),
			price_per_area: raw.optional("priceByArea"),
			neighborhood: raw.optional("neighborhood"),
			district: raw.optional("district"),
			bathrooms: raw.optional("bathrooms"),
			status: raw.optional("status"),
			latitude: raw.optional("latitude"),
			longitude: raw.optional("longitude"),
			external_reference: raw.optional("externalReference"),
		})
	}

	/// Normalizes every item, skipping and counting malformed ones.
	pub fn normalize_batch<'a, I>(&self, items: I) -> NormalizedBatch
	where
		I: IntoIterator<Item = &'a serde_json::Value>,
	{
		let mut batch = NormalizedBatch::default();

		for item in items {
			match self.normalize(item) {
				Ok(listing) => batch.listings.push(listing),
				#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
				Err(err) => {
					trace_event!(
						debug,
						field = err.field,
						reason = err.reason.as_str(),
						item_id = err.item_id.as_deref(),
						"Skipping malformed item."
					);

					batch.skipped += 1;
				},
			}
		}

		batch
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::{Value, json};
	// self
	use super::*;
	use crate::error::MalformedReason;

	fn item(code: u64) -> Value {
		json!({
			"propertyCode": code.to_string(),
			"url": format!("https://www.idealista.com/inmueble/{code}/"),
			"price": 1250.0,
			"size": 80,
			"rooms": 3,
			"address": "Carrer de Mallorca",
			"thumbnail": "https://img.idealista.com/thumb.jpg",
			"description": "Bright flat with balcony. ".repeat(40),
			"hasLift": false,
			"priceByArea": 15.6,
			"latitude": 41.39,
			"longitude": 2.16,
			"status": "good"
		})
	}

	#[test]
	fn end_to_end_item_normalizes_with_unknown_optionals() {
		let normalizer = Normalizer::new("idealista");
		let listing = normalizer
			.normalize(&json!({
				"propertyCode": 42,
				"url": "https://x/42",
				"price": 1000,
				"size": 80,
				"rooms": 3,
				"address": "Main St",
				"hasLift": true
			}))
			.expect("Complete item should normalize.");

		assert_eq!(listing.id, "42");
		assert_eq!(listing.lift, "true");
		assert_eq!(listing.price, "1000");
		assert_eq!(listing.crawler_name, "idealista");
		assert_eq!(listing.title, UNKNOWN);
		assert_eq!(listing.district, UNKNOWN);
		assert_eq!(listing.image_url, UNKNOWN);
	}

	#[test]
	fn normalization_is_idempotent() {
		let normalizer = Normalizer::new("idealista");
		let raw = item(7);
		let first = serde_json::to_vec(&normalizer.normalize(&raw).expect("Item should normalize."))
			.expect("Listing should serialize.");
		let second =
			serde_json::to_vec(&normalizer.normalize(&raw).expect("Item should normalize."))
				.expect("Listing should serialize.");

		assert_eq!(first, second);
	}

	#[test]
	fn descriptions_are_not_truncated() {
		let listing =
			Normalizer::new("idealista").normalize(&item(1)).expect("Item should normalize.");

		assert_eq!(listing.title.chars().count(), "Bright flat with balcony. ".len() * 40);
		assert_eq!(listing.price, "1250.0");
		assert_eq!(listing.lift, "false");
	}

	#[test]
	fn title_falls_back_to_suggested_texts() {
		let mut raw = item(3);

		raw.as_object_mut().expect("Fixture is an object.").remove("description");
		raw["suggestedTexts"] = json!({ "title": "Flat in Eixample" });

		let listing = Normalizer::new("idealista").normalize(&raw).expect("Item should normalize.");

		assert_eq!(listing.title, "Flat in Eixample");
	}

	#[test]
	fn batch_skips_malformed_items() {
		let mut items = (1..=5).map(item).collect::<Vec<_>>();

		items[2].as_object_mut().expect("Fixture is an object.").remove("price");

		let batch = Normalizer::new("idealista").normalize_batch(&items);

		assert_eq!(batch.listings.len(), 4);
		assert_eq!(batch.skipped, 1);
		assert_eq!(
			batch.listings.iter().map(|listing| listing.id.as_str()).collect::<Vec<_>>(),
			["1", "2", "4", "5"]
		);
	}

	#[test]
	fn malformed_items_report_field_and_id() {
		let normalizer = Normalizer::new("idealista");
		let mut raw = item(9);

		raw["rooms"] = Value::Null;

		let err = normalizer.normalize(&raw).expect_err("Null rooms should be rejected.");

		assert_eq!(err.field, "rooms");
		assert_eq!(err.reason, MalformedReason::Null);
		assert_eq!(err.item_id.as_deref(), Some("9"));

		let err = normalizer.normalize(&json!([1, 2])).expect_err("Arrays are not items.");

		assert_eq!(err.reason, MalformedReason::NotAnObject);
	}
}
