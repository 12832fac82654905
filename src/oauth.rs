//! Client-credentials exchange built on the `oauth2` crate.

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	api::ApiDescriptor,
	auth::{Credentials, Token},
	error::{self, AuthError, ConfigError},
	http::{self, HttpTransport, Interrupted, ResponseMetadata, ResponseMetadataSlot},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Exchanges `credentials` for a bearer token at the descriptor's token endpoint.
///
/// Key and secret travel as HTTP Basic authentication with `grant_type=client_credentials`
/// and the descriptor's scope in the form body.
pub(crate) async fn exchange_client_credentials<C>(
	descriptor: &ApiDescriptor,
	credentials: &Credentials,
	http_client: &C,
	cancel: &CancellationToken,
) -> Result<Token>
where
	C: ?Sized + HttpTransport,
{
	let oauth_client = configure_client(descriptor, credentials)?;
	let meta = ResponseMetadataSlot::default();
	let instrumented = http_client.with_metadata(meta.clone());
	let mut request = oauth_client.exchange_client_credentials();

	if let Some(scope) = &descriptor.token_scope {
		request = request.add_scope(Scope::new(scope.to_owned()));
	}

	let response =
		match http::bounded(request.request_async(&instrumented), descriptor.request_timeout, cancel)
			.await
		{
			Ok(response) => response,
			Err(Interrupted::Cancelled) => return Err(Error::Cancelled),
			Err(Interrupted::TimedOut) =>
				return Err(AuthError::Timeout { timeout: descriptor.request_timeout }.into()),
		};
	let response = response.map_err(|err| {
		map_request_error(meta.take(), err, descriptor.quirks.excerpt_limit)
	})?;

	map_token_response(response).map_err(Error::from)
}

fn configure_client(
	descriptor: &ApiDescriptor,
	credentials: &Credentials,
) -> Result<ConfiguredBasicClient, ConfigError> {
	let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
		.map_err(|source| ConfigError::InvalidEndpoint { source })?;

	Ok(BasicClient::new(ClientId::new(credentials.key.clone()))
		.set_client_secret(ClientSecret::new(credentials.secret.expose().to_owned()))
		.set_auth_type(AuthType::BasicAuth)
		.set_token_uri(token_url))
}

fn map_token_response(response: BasicTokenResponse) -> Result<Token, AuthError> {
	let acquired_at = OffsetDateTime::now_utc();
	let token = Token::new(response.access_token().secret().to_owned(), acquired_at);
	let Some(expires_in) = response.expires_in() else {
		return Ok(token);
	};
	let expires_in = i64::try_from(expires_in.as_secs()).map_err(|_| AuthError::Unexpected {
		message: "expires_in is out of range".into(),
		status: None,
	})?;

	if expires_in <= 0 {
		return Err(AuthError::Unexpected {
			message: "expires_in must be positive".into(),
			status: None,
		});
	}

	Ok(token.expiring_in(Duration::seconds(expires_in)))
}

fn map_request_error<E>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	excerpt_limit: usize,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response(response, status).into(),
		RequestTokenError::Request(err) => map_transport_error(err),
		RequestTokenError::Parse(source, body) => match status {
			Some(status) if status != 200 =>
				AuthError::TokenEndpoint { status, excerpt: error::excerpt(&body, excerpt_limit) }
					.into(),
			_ => AuthError::TokenResponseParse { source, status }.into(),
		},
		RequestTokenError::Other(message) => AuthError::Unexpected { message, status }.into(),
	}
}

fn map_server_response(response: BasicErrorResponse, status: Option<u16>) -> AuthError {
	let reason = response
		.error_description()
		.cloned()
		.unwrap_or_else(|| response.error().as_ref().to_owned());

	AuthError::Rejected { reason, status }
}

fn map_transport_error<E>(err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => AuthError::Transport { source: inner }.into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => AuthError::transport(inner).into(),
		HttpClientError::Other(message) =>
			AuthError::Unexpected { message, status: None }.into(),
		_ => AuthError::Unexpected { message: "unknown HTTP client error".into(), status: None }
			.into(),
	}
}
