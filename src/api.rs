//! Upstream API descriptors (endpoints, timeouts, and status quirks).
//!
//! An [`ApiDescriptor`] is validated data describing one credential-gated search API: where the
//! client-credentials token endpoint and the paginated search endpoint live, which scope the
//! token request asks for, and which HTTP statuses the search endpoint uses for usable pages.

/// Builder API for assembling API descriptors.
pub mod builder;
/// Upstream-specific status and diagnostics toggles.
pub mod quirks;

pub use builder::*;
pub use quirks::*;

// self
use crate::{_prelude::*, auth::ApiId, error::ConfigError};

const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Endpoint set declared by an API descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoints {
	/// OAuth token endpoint used for the client-credentials exchange.
	pub token: Url,
	/// Paginated search endpoint.
	pub search: Url,
}

/// Immutable API descriptor consumed by the token session and the fetcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
	/// Descriptor identifier.
	pub id: ApiId,
	/// Endpoint definitions exposed by the API.
	pub endpoints: ApiEndpoints,
	/// Scope requested during the client-credentials exchange.
	#[serde(default)]
	pub token_scope: Option<String>,
	/// Upper bound for a single HTTP round trip.
	#[serde(default = "default_request_timeout")]
	pub request_timeout: StdDuration,
	/// Upstream-specific quirks.
	#[serde(default)]
	pub quirks: ApiQuirks,
}
impl ApiDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ApiId) -> ApiDescriptorBuilder {
		ApiDescriptorBuilder::new(id)
	}

	/// Descriptor for the Idealista v3.5 search API in the given country (`es`, `it`, `pt`).
	pub fn idealista(country: &str) -> Result<Self, ConfigError> {
		let token = Url::parse("https://api.idealista.com/oauth/token")
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let search = Url::parse(&format!("https://api.idealista.com/3.5/{country}/search"))
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let descriptor = Self::builder(ApiId::new(format!("idealista-{country}"))?)
			.token_endpoint(token)
			.search_endpoint(search)
			.token_scope("read")
			.build()?;

		Ok(descriptor)
	}

	/// Returns `true` if the search endpoint's status carries a usable page.
	pub fn is_success_status(&self, status: u16) -> bool {
		self.quirks.success_statuses.contains(&status)
	}

	/// Returns `true` if the status means the bearer token was rejected.
	pub fn is_auth_rejection(&self, status: u16) -> bool {
		matches!(status, 401 | 403)
	}
}

fn default_request_timeout() -> StdDuration {
	DEFAULT_REQUEST_TIMEOUT
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn idealista_preset_points_at_the_country_search() {
		let descriptor =
			ApiDescriptor::idealista("es").expect("Idealista preset should build successfully.");

		assert_eq!(descriptor.id.as_ref(), "idealista-es");
		assert_eq!(descriptor.endpoints.token.as_str(), "https://api.idealista.com/oauth/token");
		assert_eq!(
			descriptor.endpoints.search.as_str(),
			"https://api.idealista.com/3.5/es/search"
		);
		assert_eq!(descriptor.token_scope.as_deref(), Some("read"));
		assert_eq!(descriptor.request_timeout, StdDuration::from_secs(30));
	}

	#[test]
	fn status_helpers_follow_quirks() {
		let descriptor =
			ApiDescriptor::idealista("it").expect("Idealista preset should build successfully.");

		assert!(descriptor.is_success_status(200));
		assert!(descriptor.is_success_status(405));
		assert!(!descriptor.is_success_status(500));
		assert!(descriptor.is_auth_rejection(401));
		assert!(descriptor.is_auth_rejection(403));
		assert!(!descriptor.is_auth_rejection(405));
	}

	#[test]
	fn descriptor_deserializes_with_defaults() {
		let descriptor: ApiDescriptor = serde_json::from_str(
			r#"{
				"id": "custom-api",
				"endpoints": {
					"token": "https://auth.example.com/oauth/token",
					"search": "https://api.example.com/search"
				}
			}"#,
		)
		.expect("Descriptor should deserialize from JSON.");

		assert_eq!(descriptor.token_scope, None);
		assert_eq!(descriptor.request_timeout, StdDuration::from_secs(30));
		assert_eq!(descriptor.quirks, ApiQuirks::default());
		assert!(descriptor.validate().is_ok());
	}
}
