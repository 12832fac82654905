// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	api::{ApiDescriptor, ApiEndpoints, ApiQuirks, DEFAULT_REQUEST_TIMEOUT},
	auth::ApiId,
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ApiDescriptorError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Search endpoint is mandatory.
	#[error("Missing search endpoint.")]
	MissingSearchEndpoint,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// At least one success status is required.
	#[error("Descriptor must accept at least one success status.")]
	NoSuccessStatuses,
	/// Token rejections can never be treated as usable pages.
	#[error("HTTP {status} signals a rejected token and cannot be a success status.")]
	AuthStatusAsSuccess {
		/// Offending status code.
		status: u16,
	},
	/// A zero timeout would fail every request.
	#[error("Request timeout must be greater than zero.")]
	ZeroRequestTimeout,
}

/// Builder for [`ApiDescriptor`] values.
#[derive(Debug)]
pub struct ApiDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: ApiId,
	/// Token endpoint used for the client-credentials exchange.
	pub token_endpoint: Option<Url>,
	/// Search endpoint receiving one POST per fetch.
	pub search_endpoint: Option<Url>,
	/// Scope requested during the exchange.
	pub token_scope: Option<String>,
	/// Upper bound for a single HTTP round trip.
	pub request_timeout: StdDuration,
	/// Upstream-specific quirks.
	pub quirks: ApiQuirks,
}
impl ApiDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: ApiId) -> Self {
		Self {
			id,
			token_endpoint: None,
			search_endpoint: None,
			token_scope: None,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			quirks: ApiQuirks::default(),
		}
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the search endpoint.
	pub fn search_endpoint(mut self, url: Url) -> Self {
		self.search_endpoint = Some(url);

		self
	}

	/// Sets the scope requested from the token endpoint.
	pub fn token_scope(mut self, scope: impl Into<String>) -> Self {
		self.token_scope = Some(scope.into());

		self
	}

	/// Overrides the per-request timeout (defaults to 30 seconds).
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the upstream quirks.
	pub fn quirks(mut self, quirks: ApiQuirks) -> Self {
		self.quirks = quirks;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ApiDescriptor, ApiDescriptorError> {
		let token = self.token_endpoint.ok_or(ApiDescriptorError::MissingTokenEndpoint)?;
		let search = self.search_endpoint.ok_or(ApiDescriptorError::MissingSearchEndpoint)?;
		let descriptor = ApiDescriptor {
			id: self.id,
			endpoints: ApiEndpoints { token, search },
			token_scope: self.token_scope,
			request_timeout: self.request_timeout,
			quirks: self.quirks,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ApiDescriptor {
	/// Validates invariants for the descriptor.
	///
	/// Builders call this automatically; descriptors loaded through `serde` should be validated
	/// before use.
	pub fn validate(&self) -> Result<(), ApiDescriptorError> {
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("search", &self.endpoints.search)?;

		if self.quirks.success_statuses.is_empty() {
			return Err(ApiDescriptorError::NoSuccessStatuses);
		}
		if let Some(status) =
			self.quirks.success_statuses.iter().copied().find(|status| self.is_auth_rejection(*status))
		{
			return Err(ApiDescriptorError::AuthStatusAsSuccess { status });
		}
		if self.request_timeout.is_zero() {
			return Err(ApiDescriptorError::ZeroRequestTimeout);
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ApiDescriptorError> {
	if url.scheme() == "https" || is_loopback(url) {
		Ok(())
	} else {
		Err(ApiDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => ip.is_loopback(),
		Some(Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse descriptor test URL.")
	}

	fn builder() -> ApiDescriptorBuilder {
		ApiDescriptor::builder(ApiId::new("builder-test").expect("API identifier should be valid."))
	}

	#[test]
	fn builder_requires_both_endpoints() {
		let err = builder()
			.search_endpoint(url("https://api.example.com/search"))
			.build()
			.expect_err("Builder should reject a missing token endpoint.");

		assert_eq!(err, ApiDescriptorError::MissingTokenEndpoint);

		let err = builder()
			.token_endpoint(url("https://api.example.com/oauth/token"))
			.build()
			.expect_err("Builder should reject a missing search endpoint.");

		assert_eq!(err, ApiDescriptorError::MissingSearchEndpoint);
	}

	#[test]
	fn builder_rejects_plain_http_except_loopback() {
		let err = builder()
			.token_endpoint(url("http://api.example.com/oauth/token"))
			.search_endpoint(url("https://api.example.com/search"))
			.build()
			.expect_err("Builder should reject insecure remote endpoints.");

		assert!(matches!(err, ApiDescriptorError::InsecureEndpoint { endpoint: "token", .. }));

		builder()
			.token_endpoint(url("http://127.0.0.1:8080/oauth/token"))
			.search_endpoint(url("http://localhost:8080/search"))
			.build()
			.expect("Loopback endpoints should be accepted for local testing.");
	}

	#[test]
	fn builder_validates_success_statuses_and_timeout() {
		let base = || {
			builder()
				.token_endpoint(url("https://api.example.com/oauth/token"))
				.search_endpoint(url("https://api.example.com/search"))
		};
		let err = base()
			.quirks(ApiQuirks { success_statuses: Vec::new(), ..ApiQuirks::default() })
			.build()
			.expect_err("An empty allow-list should be rejected.");

		assert_eq!(err, ApiDescriptorError::NoSuccessStatuses);

		let err = base()
			.quirks(ApiQuirks { success_statuses: vec![200, 401], ..ApiQuirks::default() })
			.build()
			.expect_err("Auth statuses should never count as success.");

		assert_eq!(err, ApiDescriptorError::AuthStatusAsSuccess { status: 401 });

		let err = base()
			.request_timeout(StdDuration::ZERO)
			.build()
			.expect_err("A zero timeout should be rejected.");

		assert_eq!(err, ApiDescriptorError::ZeroRequestTimeout);
	}
}
