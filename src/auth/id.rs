//! Slug identifiers naming configured searches and upstream APIs.
//!
//! Both kinds end up as log fields and metric labels, so they are restricted to lowercase ASCII
//! letters, digits, `-`, `_`, and `.`.

// std
use std::borrow::Borrow;
// self
use crate::_prelude::*;

const SLUG_MAX_LEN: usize = 64;

macro_rules! slug {
	($(#[$meta:meta])* $name:ident => $kind:literal) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates `value` as a slug.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				check_slug($kind, &value)?;

				Ok(Self(value))
			}

			/// Slug text.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl From<$name> for String {
			fn from(id: $name) -> Self {
				id.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				self.as_str()
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				self.as_str()
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(self.as_str())
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", $kind, self.0)
			}
		}
	};
}

slug! {
	/// Name of one configured search; labels its logs, metrics, and reports.
	SearchId => "Search"
}
slug! {
	/// Name of an upstream search API descriptor.
	ApiId => "Api"
}

/// Reasons a slug is refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Nothing was provided.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// `Search` or `Api`.
		kind: &'static str,
	},
	/// A character outside `[a-z0-9._-]` was found.
	#[error("{kind} identifier contains {character:?}; only lowercase ASCII letters, digits, `-`, `_`, and `.` are allowed.")]
	InvalidCharacter {
		/// `Search` or `Api`.
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The slug is longer than the label limit.
	#[error("{kind} identifier is longer than {max} bytes.")]
	TooLong {
		/// `Search` or `Api`.
		kind: &'static str,
		/// Upper bound in bytes.
		max: usize,
	},
}

fn check_slug(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if value.len() > SLUG_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: SLUG_MAX_LEN });
	}

	match value.chars().find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '-' | '_' | '.')) {
		Some(character) => Err(IdentifierError::InvalidCharacter { kind, character }),
		None => Ok(()),
	}
}
