//! API key/secret pair and the lookup store that owns it.

// self
use crate::{_prelude::*, auth::Secret};

/// API key and secret issued by the upstream account; immutable once supplied.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// Public API key, sent as the client identifier.
	pub key: String,
	/// API secret; never logged.
	pub secret: Secret,
}
impl Credentials {
	/// Creates a credential pair.
	pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
		Self { key: key.into(), secret: Secret::new(secret) }
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("key", &self.key)
			.field("secret", &self.secret)
			.finish()
	}
}

/// Cheaply cloneable holder for the credentials of one upstream account.
///
/// Searches that target the same account share a store (and therefore a token session);
/// the store itself has no behavior beyond lookup.
#[derive(Clone, Debug)]
pub struct CredentialStore(Arc<Credentials>);
impl CredentialStore {
	/// Wraps the provided credentials.
	pub fn new(credentials: Credentials) -> Self {
		Self(Arc::new(credentials))
	}

	/// Returns the stored credentials.
	pub fn lookup(&self) -> &Credentials {
		&self.0
	}
}
impl From<Credentials> for CredentialStore {
	fn from(credentials: Credentials) -> Self {
		Self::new(credentials)
	}
}
