//! Opaque holder for the API secret and issued bearer values.

// self
use crate::_prelude::*;

/// Placeholder printed wherever a [`Secret`] would otherwise appear.
pub const REDACTED: &str = "<redacted>";

/// Credential material that only leaves the process through an HTTP header or form body.
///
/// Formatting never prints the value. Deserializing reads a bare string so config files can
/// carry the API secret directly.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(Box<str>);
impl Secret {
	/// Takes ownership of the raw value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into().into_boxed_str())
	}

	/// Raw value for building the `Authorization` header or the token request.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` if the upstream or the caller supplied an empty value.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Secret({REDACTED})")
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(REDACTED)
	}
}
