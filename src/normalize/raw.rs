//! Key/value view over one raw search item.

// crates.io
use serde_json::{Map, Value};
// self
use crate::error::{MalformedItemError, MalformedReason};

/// Marker substituted for absent optional fields so listings keep a stable shape.
pub const UNKNOWN: &str = "unknown";

const ID_KEY: &str = "propertyCode";

/// Borrowed view over a raw item's fields.
#[derive(Clone, Copy, Debug)]
pub struct RawItem<'a> {
	fields: &'a Map<String, Value>,
}
impl<'a> RawItem<'a> {
	/// Wraps a raw item; anything but a JSON object is malformed.
	pub fn new(value: &'a Value) -> Result<Self, MalformedItemError> {
		match value {
			Value::Object(fields) => Ok(Self { fields }),
			_ => Err(MalformedItemError {
				field: "item",
				reason: MalformedReason::NotAnObject,
				item_id: None,
			}),
		}
	}

	/// Reads a required scalar in canonical string form.
	pub fn required(&self, key: &'static str) -> Result<String, MalformedItemError> {
		let malformed = |reason| MalformedItemError { field: key, reason, item_id: self.id_hint() };

		match self.fields.get(key) {
			None => Err(malformed(MalformedReason::Missing)),
			Some(Value::Null) => Err(malformed(MalformedReason::Null)),
			Some(value) => scalar(value).ok_or_else(|| malformed(MalformedReason::NotScalar)),
		}
	}

	/// Reads an optional field, substituting [`UNKNOWN`] when absent or `null`.
	pub fn optional(&self, key: &str) -> String {
		self.present(key).unwrap_or_else(|| UNKNOWN.to_owned())
	}

	/// Reads a field when present and non-null; compound values are kept as compact JSON.
	pub fn present(&self, key: &str) -> Option<String> {
		self.fields.get(key).and_then(canonical)
	}

	/// Follows nested objects along `path` and reads the final field when present.
	pub fn present_nested(&self, path: &[&str]) -> Option<String> {
		let (first, rest) = path.split_first()?;
		let mut value = self.fields.get(*first)?;

		for key in rest {
			value = value.get(*key)?;
		}

		canonical(value)
	}

	/// Upstream identifier, when it is a readable scalar.
	pub fn id_hint(&self) -> Option<String> {
		self.fields.get(ID_KEY).and_then(scalar)
	}
}

fn canonical(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::Array(_) | Value::Object(_) => Some(value.to_string()),
		_ => scalar(value),
	}
}

fn scalar(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		Value::Null | Value::Array(_) | Value::Object(_) => None,
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn scalars_have_one_canonical_form() {
		let value = json!({ "int": 3, "float": 80.5, "flag": true, "text": "3", "list": [1] });
		let raw = RawItem::new(&value).expect("Object should wrap.");

		assert_eq!(raw.required("int").as_deref(), Ok("3"));
		assert_eq!(raw.required("text").as_deref(), Ok("3"));
		assert_eq!(raw.required("float").as_deref(), Ok("80.5"));
		assert_eq!(raw.required("flag").as_deref(), Ok("true"));
		assert_eq!(
			raw.required("list").map_err(|err| err.reason),
			Err(MalformedReason::NotScalar)
		);
		assert_eq!(raw.optional("list"), "[1]");
		assert_eq!(raw.optional("absent"), UNKNOWN);
	}

	#[test]
	fn nested_lookup_stops_at_missing_keys() {
		let value = json!({ "suggestedTexts": { "title": "Loft", "subtitle": null } });
		let raw = RawItem::new(&value).expect("Object should wrap.");

		assert_eq!(raw.present_nested(&["suggestedTexts", "title"]).as_deref(), Some("Loft"));
		assert_eq!(raw.present_nested(&["suggestedTexts", "subtitle"]), None);
		assert_eq!(raw.present_nested(&["missing", "title"]), None);
		assert_eq!(raw.present_nested(&[]), None);
		assert_eq!(raw.id_hint(), None);
	}
}
