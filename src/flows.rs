//! The authentication handshake: begin → provider redirect → callback → profile resolution.
//!
//! An [`Authenticator`] binds one registered provider to the transient state manager and the
//! transport. `begin` stashes signed CSRF state and points the user agent at the provider;
//! `finish` validates the returning callback, performs the code-for-token exchange, resolves
//! the canonical profile, and hands back an [`AuthResult`] for the session controller to
//! persist. Any validation failure during `finish` leaves the browser anonymous—no session
//! comes into existence until the caller persists the result.

// crates.io
use oauth2::{AuthorizationCode, TokenResponse};
use tracing::warn;
// self
use crate::{
	_prelude::*,
	auth::{AuthConfig, Profile, ProfileDocument, StateSession},
	error::ConfigError,
	http::HandshakeHttpClient,
	provider::Provider,
};

/// Opaque OAuth token material obtained from the exchange, stored verbatim; this crate never
/// introspects or refreshes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenMaterial {
	/// Bearer access token.
	pub access_token: String,
	/// Refresh token, when the provider issued one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	/// Access token expiry, when the provider disclosed one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<OffsetDateTime>,
}

/// Outcome of one successful handshake, produced once per `finish` and persisted verbatim by
/// the session controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthResult {
	/// Name of the provider that authenticated the user.
	pub provider: String,
	/// Canonical profile resolved through the provider's mapper.
	pub profile: Profile,
	/// Opaque token material from the exchange.
	pub token: TokenMaterial,
	/// Post-login redirect target recovered from the transient state.
	pub redirect_url: String,
}

/// Query parameters delivered to the callback endpoint by the provider redirect.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackQuery {
	/// CSRF state echoed back by the provider.
	pub state: Option<String>,
	/// Authorization code to exchange.
	pub code: Option<String>,
}
impl CallbackQuery {
	/// Builds a query from explicit values.
	pub fn new(state: Option<String>, code: Option<String>) -> Self {
		Self { state, code }
	}

	/// Extracts the `state` and `code` parameters from a callback URL.
	pub fn from_url(url: &Url) -> Self {
		let mut query = Self::default();

		for (key, value) in url.query_pairs() {
			match key.as_ref() {
				"state" => query.state = Some(value.into_owned()),
				"code" => query.code = Some(value.into_owned()),
				_ => {},
			}
		}

		query
	}
}

/// Drives the handshake for one registered provider.
pub struct Authenticator<'a, C>
where
	C: ?Sized + HandshakeHttpClient,
{
	provider: &'a Provider,
	state: &'a StateSession,
	http_client: &'a C,
}
impl<'a, C> Authenticator<'a, C>
where
	C: ?Sized + HandshakeHttpClient,
{
	pub(crate) fn new(provider: &'a Provider, state: &'a StateSession, http_client: &'a C) -> Self {
		Self { provider, state, http_client }
	}

	/// Starts the handshake: stashes signed transient state and writes the provider's authorize
	/// URL into the `Location` header.
	///
	/// The returned URL equals the header value; the HTTP layer owns the 302 status line.
	pub fn begin(&self, response: &mut HeaderMap, config: &AuthConfig) -> Result<Url> {
		let auth = self.state.set(response, config)?;
		let url = self.provider.authorize_url(&auth.state);
		let location = HeaderValue::from_str(url.as_str())
			.map_err(|source| ConfigError::InvalidHeaderValue { source })?;

		response.insert(LOCATION, location);

		Ok(url)
	}

	/// Completes the handshake from the provider's callback.
	///
	/// Validates the echoed `state` against the stored transient state before anything else; a
	/// mismatch is a CSRF signal and aborts the attempt. The matched state is deleted
	/// immediately so it cannot be replayed, then the authorization code is exchanged and the
	/// profile resolved.
	pub async fn finish(
		&self,
		response: &mut HeaderMap,
		request: &HeaderMap,
		query: &CallbackQuery,
	) -> Result<AuthResult> {
		let received_state =
			query.state.as_deref().filter(|s| !s.is_empty()).ok_or(Error::StateMissing)?;
		let auth = self.state.get(request)?;

		if auth.state != received_state {
			return Err(Error::UnexpectedState);
		}
		// The state is spent from here on; failing to clear its cookie only delays expiry.
		if let Err(e) = self.state.del(response) {
			warn!(provider = self.provider.name(), error = %e, "failed to delete the spent transient auth state");
		}

		let code = query
			.code
			.as_deref()
			.filter(|s| !s.is_empty())
			.ok_or(Error::BadRequest { reason: "the `code` query parameter is missing" })?;
		let exchange = self.provider.exchange_client()?;
		let handle = self.http_client.token_handle();
		let token_response = exchange
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.request_async(&handle)
			.await
			.map_err(|source| Error::ExchangeFailed { source: Box::new(source) })?;
		let issued_at = OffsetDateTime::now_utc();
		let token = TokenMaterial {
			access_token: token_response.access_token().secret().clone(),
			refresh_token: token_response.refresh_token().map(|secret| secret.secret().clone()),
			expires_at: token_response
				.expires_in()
				.and_then(|d| i64::try_from(d.as_secs()).ok())
				.map(|secs| issued_at + Duration::seconds(secs)),
		};
		let raw = self
			.http_client
			.fetch_profile(&self.provider.endpoints().profile, &token.access_token)
			.await
			.map_err(|source| Error::ProfileFetchFailed { source })?;
		let document = ProfileDocument::parse(&raw)
			.map_err(|source| Error::ProfileMapFailed { source: Box::new(source) })?;
		let profile = (self.provider.map_profile())(&document, &raw)
			.map_err(|source| Error::ProfileMapFailed { source })?;

		Ok(AuthResult {
			provider: self.provider.name().to_owned(),
			profile,
			token,
			redirect_url: auth.redirect_url,
		})
	}
}
impl<C> Debug for Authenticator<'_, C>
where
	C: ?Sized + HandshakeHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authenticator").field("provider", &self.provider.name()).finish()
	}
}
