//! Immutable search filter and its form encoding.

// crates.io
use url::form_urlencoded;
// self
use crate::_prelude::*;

/// Geographic center of a radius search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	/// Latitude in decimal degrees.
	pub latitude: f64,
	/// Longitude in decimal degrees.
	pub longitude: f64,
}
impl GeoPoint {
	/// Creates a point from decimal degrees.
	pub fn new(latitude: f64, longitude: f64) -> Self {
		Self { latitude, longitude }
	}
}
impl Display for GeoPoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{},{}", self.latitude, self.longitude)
	}
}

/// Listing operation searched for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
	/// Rentals.
	Rent,
	/// Sales.
	Sale,
}
impl OperationKind {
	/// Returns the form value.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Rent => "rent",
			OperationKind::Sale => "sale",
		}
	}
}

/// Property category searched for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
	/// Homes and flats.
	#[default]
	Homes,
	/// Offices.
	Offices,
	/// Commercial premises.
	Premises,
	/// Garages and parking spaces.
	Garages,
	/// Rooms in shared flats.
	Bedrooms,
}
impl PropertyType {
	/// Returns the form value.
	pub const fn as_str(self) -> &'static str {
		match self {
			PropertyType::Homes => "homes",
			PropertyType::Offices => "offices",
			PropertyType::Premises => "premises",
			PropertyType::Garages => "garages",
			PropertyType::Bedrooms => "bedrooms",
		}
	}
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	/// Ascending.
	Asc,
	/// Descending.
	#[default]
	Desc,
}
impl SortDirection {
	/// Returns the form value.
	pub const fn as_str(self) -> &'static str {
		match self {
			SortDirection::Asc => "asc",
			SortDirection::Desc => "desc",
		}
	}
}

/// Result ordering; defaults to newest publications first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
	/// Upstream field to order by.
	pub field: String,
	/// Direction.
	#[serde(default)]
	pub direction: SortDirection,
}
impl Default for SortOrder {
	fn default() -> Self {
		Self { field: "publicationDate".into(), direction: SortDirection::Desc }
	}
}

/// Furnishing requirement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Furnishing {
	/// Fully furnished.
	Furnished,
	/// Only the kitchen is furnished.
	FurnishedKitchen,
}
impl Furnishing {
	/// Returns the form value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Furnishing::Furnished => "furnished",
			Furnishing::FurnishedKitchen => "furnishedKitchen",
		}
	}
}

/// Search parameters for one configured search; immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
	/// Search center.
	pub center: GeoPoint,
	/// Radius around the center, in metres.
	pub radius: u32,
	/// Operation searched for.
	pub operation: OperationKind,
	/// Property category.
	#[serde(default)]
	pub property_type: PropertyType,
	/// Minimum size in square metres.
	#[serde(default)]
	pub min_size: Option<u32>,
	/// Maximum price.
	#[serde(default)]
	pub max_price: Option<u32>,
	/// Result ordering.
	#[serde(default)]
	pub sort: SortOrder,
	/// Response language.
	#[serde(default = "default_locale")]
	pub locale: String,
	/// Items per page.
	#[serde(default = "default_max_items")]
	pub max_items: u32,
	/// Furnishing requirement.
	#[serde(default)]
	pub furnished: Option<Furnishing>,
	/// Require an elevator.
	#[serde(default)]
	pub elevator: Option<bool>,
	/// Restrict to flats.
	#[serde(default)]
	pub flat: Option<bool>,
}
impl SearchFilter {
	/// Creates a filter with default ordering, locale `en`, and 50 items per page.
	pub fn new(center: GeoPoint, radius: u32, operation: OperationKind) -> Self {
		Self {
			center,
			radius,
			operation,
			property_type: PropertyType::default(),
			min_size: None,
			max_price: None,
			sort: SortOrder::default(),
			locale: default_locale(),
			max_items: default_max_items(),
			furnished: None,
			elevator: None,
			flat: None,
		}
	}

	/// Sets the property category.
	pub fn with_property_type(mut self, property_type: PropertyType) -> Self {
		self.property_type = property_type;

		self
	}

	/// Sets the minimum size in square metres.
	pub fn with_min_size(mut self, min_size: u32) -> Self {
		self.min_size = Some(min_size);

		self
	}

	/// Sets the maximum price.
	pub fn with_max_price(mut self, max_price: u32) -> Self {
		self.max_price = Some(max_price);

		self
	}

	/// Sets the result ordering.
	pub fn with_sort(mut self, sort: SortOrder) -> Self {
		self.sort = sort;

		self
	}

	/// Sets the response language.
	pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
		self.locale = locale.into();

		self
	}

	/// Sets the number of items per page.
	pub fn with_max_items(mut self, max_items: u32) -> Self {
		self.max_items = max_items;

		self
	}

	/// Sets the furnishing requirement.
	pub fn with_furnished(mut self, furnished: Furnishing) -> Self {
		self.furnished = Some(furnished);

		self
	}

	/// Sets the elevator requirement.
	pub fn with_elevator(mut self, elevator: bool) -> Self {
		self.elevator = Some(elevator);

		self
	}

	/// Restricts results to flats.
	pub fn with_flat(mut self, flat: bool) -> Self {
		self.flat = Some(flat);

		self
	}

	/// Form fields for the request for `page`, in a stable order.
	pub fn form_fields(&self, page: u32) -> Vec<(&'static str, String)> {
		let mut fields = vec![
			("center", self.center.to_string()),
			("distance", self.radius.to_string()),
			("propertyType", self.property_type.as_str().to_owned()),
			("operation", self.operation.as_str().to_owned()),
			("locale", self.locale.clone()),
			("maxItems", self.max_items.to_string()),
		];

		if let Some(min_size) = self.min_size {
			fields.push(("minSize", min_size.to_string()));
		}
		if let Some(max_price) = self.max_price {
			fields.push(("maxPrice", max_price.to_string()));
		}

		fields.push(("order", self.sort.field.clone()));
		fields.push(("sort", self.sort.direction.as_str().to_owned()));

		if let Some(furnished) = self.furnished {
			fields.push(("furnished", furnished.as_str().to_owned()));
		}
		if let Some(elevator) = self.elevator {
			fields.push(("elevator", elevator.to_string()));
		}
		if let Some(flat) = self.flat {
			fields.push(("flat", flat.to_string()));
		}

		fields.push(("numPage", page.to_string()));

		fields
	}

	/// URL-encoded form body for the request for `page`.
	pub fn encode_form(&self, page: u32) -> Vec<u8> {
		let mut serializer = form_urlencoded::Serializer::new(String::new());

		for (key, value) in self.form_fields(page) {
			serializer.append_pair(key, &value);
		}

		serializer.finish().into_bytes()
	}
}

fn default_locale() -> String {
	"en".into()
}

fn default_max_items() -> u32 {
	50
}
