//! Transient auth state: the short-lived signed token that carries CSRF state and the post-login
//! redirect target across the handshake.
//!
//! The state is an HS256-signed JWT stored through a [`BrowserStore`] binding under a fixed key.
//! Verification is restricted to an explicit allow-list of exactly one algorithm family so a
//! crafted header can never downgrade or substitute the signature scheme. A per-token nonce is
//! recorded as the `jti` claim; replay is prevented by deleting the state on first successful
//! completion plus the short expiry window, not by nonce tracking.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
// self
use crate::{
	_prelude::*,
	auth::token::random_token,
	store::BrowserStore,
};

const RANDOM_TOKEN_LEN: usize = 32;
const DEFAULT_ISSUER: &str = "gatehouse";
const DEFAULT_STATE_KEY: &str = "auth_token";
const DEFAULT_TTL: Duration = Duration::minutes(15);

/// Per-request configuration for starting a handshake. Created fresh for every begin call.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
	/// Optional audience embedded in the signed state; falls back to the session-wide audience.
	pub audience: Option<String>,
	/// Where to send the user after the handshake completes.
	pub redirect_url: String,
}
impl AuthConfig {
	/// Creates a configuration carrying only a post-login redirect target.
	pub fn redirect_to(redirect_url: impl Into<String>) -> Self {
		Self { audience: None, redirect_url: redirect_url.into() }
	}

	/// Sets the audience for this handshake.
	pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}
}

/// Plaintext view of the transient auth state, returned by [`StateSession::set`] for immediate
/// use and recovered by [`StateSession::get`] during the callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
	/// Opaque CSRF state that must round-trip through the provider redirect.
	pub state: String,
	/// Unique token identifier recorded as the `jti` claim.
	pub nonce: String,
	/// Audience the state was issued for, when configured.
	pub audience: Option<String>,
	/// Post-login redirect target carried across the handshake.
	pub redirect_url: String,
}

#[derive(Serialize, Deserialize)]
struct Claims {
	iss: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	aud: Option<String>,
	exp: i64,
	nbf: i64,
	iat: i64,
	jti: String,
	ctx: StateContext,
}

#[derive(Serialize, Deserialize)]
struct StateContext {
	#[serde(rename = "ste")]
	state: String,
	#[serde(rename = "url")]
	redirect_url: String,
}

/// Error raised while constructing a [`StateSession`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StateSessionError {
	/// The signing secret must not be empty.
	#[error("The signing secret cannot be empty.")]
	EmptySecret,
}

/// Issues and validates the signed, short-lived transient auth state.
///
/// The manager owns a [`BrowserStore`] binding, the signing secret, and the issuer/audience/key
/// configuration. It exists only to bridge the gap between begin and finish; durable sessions
/// are the session controller's concern.
pub struct StateSession {
	browser: Arc<dyn BrowserStore>,
	secret: String,
	issuer: String,
	audience: Option<String>,
	state_key: String,
	cookie_ttl: Duration,
	token_ttl: Duration,
}
impl StateSession {
	/// Creates a manager with the default issuer, state key, and a 15 minute time-to-live for
	/// both the signed token and its browser-storage entry.
	pub fn new(
		browser: Arc<dyn BrowserStore>,
		secret: impl Into<String>,
	) -> Result<Self, StateSessionError> {
		let secret = secret.into();

		if secret.is_empty() {
			return Err(StateSessionError::EmptySecret);
		}

		Ok(Self {
			browser,
			secret,
			issuer: DEFAULT_ISSUER.into(),
			audience: None,
			state_key: DEFAULT_STATE_KEY.into(),
			cookie_ttl: DEFAULT_TTL,
			token_ttl: DEFAULT_TTL,
		})
	}

	/// Overrides the `iss` claim written into signed states.
	pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = issuer.into();

		self
	}

	/// Sets the session-wide audience; [`get`](Self::get) then requires audience equality.
	pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}

	/// Overrides the browser-storage key the state is stored under.
	pub fn with_state_key(mut self, state_key: impl Into<String>) -> Self {
		self.state_key = state_key.into();

		self
	}

	/// Overrides the browser-storage time-to-live.
	pub fn with_cookie_ttl(mut self, ttl: Duration) -> Self {
		self.cookie_ttl = ttl;

		self
	}

	/// Overrides the signed token's time-to-live.
	pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
		self.token_ttl = ttl;

		self
	}

	/// Generates fresh state and nonce values, signs them together with the redirect target,
	/// and stores the signed token through the browser-storage binding.
	///
	/// Returns the plaintext state for immediate use, typically appended to the provider's
	/// authorize URL.
	pub fn set(&self, response: &mut HeaderMap, config: &AuthConfig) -> Result<AuthState> {
		let state = random_token(RANDOM_TOKEN_LEN);
		let nonce = random_token(RANDOM_TOKEN_LEN);
		let audience = config.audience.clone().or_else(|| self.audience.clone());
		let now = OffsetDateTime::now_utc();
		let claims = Claims {
			iss: self.issuer.clone(),
			aud: audience.clone(),
			exp: (now + self.token_ttl).unix_timestamp(),
			nbf: now.unix_timestamp(),
			iat: now.unix_timestamp(),
			jti: nonce.clone(),
			ctx: StateContext {
				state: state.clone(),
				redirect_url: config.redirect_url.clone(),
			},
		};
		let token = jsonwebtoken::encode(
			&Header::new(Algorithm::HS256),
			&claims,
			&EncodingKey::from_secret(self.secret.as_bytes()),
		)
		.map_err(|source| Error::StateSigningFailed { source: Box::new(source) })?;

		self.browser.set(response, &self.state_key, &token, self.cookie_ttl)?;

		Ok(AuthState { state, nonce, audience, redirect_url: config.redirect_url.clone() })
	}

	/// Reads back and verifies the stored state.
	///
	/// Fails with [`Error::Unauthenticated`] when no state is stored,
	/// [`Error::SignatureInvalid`] when the token is malformed or its signature does not verify
	/// under the HS256 allow-list, [`Error::TokenExpired`] past the expiry claim, and
	/// [`Error::AudienceMismatch`] when a configured audience is not matched exactly.
	pub fn get(&self, request: &HeaderMap) -> Result<AuthState> {
		let token =
			self.browser.get(request, &self.state_key)?.ok_or(Error::Unauthenticated)?;
		let mut validation = Validation::new(Algorithm::HS256);

		// The audience is compared manually below so a missing claim and a mismatched claim
		// classify the same way.
		validation.validate_aud = false;
		validation.validate_nbf = true;
		validation.leeway = 0;

		let data = jsonwebtoken::decode::<Claims>(
			&token,
			&DecodingKey::from_secret(self.secret.as_bytes()),
			&validation,
		)
		.map_err(classify_token_error)?;
		let claims = data.claims;

		if let Some(expected) = self.audience.as_deref()
			&& claims.aud.as_deref() != Some(expected)
		{
			return Err(Error::AudienceMismatch { audience: claims.aud.unwrap_or_default() });
		}

		Ok(AuthState {
			state: claims.ctx.state,
			nonce: claims.jti,
			audience: claims.aud,
			redirect_url: claims.ctx.redirect_url,
		})
	}

	/// Deletes the stored state.
	///
	/// Callers treat a failure here as non-fatal cleanup; the token still dies with its expiry.
	pub fn del(&self, response: &mut HeaderMap) -> Result<()> {
		Ok(self.browser.del(response, &self.state_key)?)
	}
}
impl Debug for StateSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StateSession")
			.field("issuer", &self.issuer)
			.field("audience", &self.audience)
			.field("state_key", &self.state_key)
			.field("cookie_ttl", &self.cookie_ttl)
			.field("token_ttl", &self.token_ttl)
			.finish()
	}
}

fn classify_token_error(err: jsonwebtoken::errors::Error) -> Error {
	if matches!(err.kind(), ErrorKind::ExpiredSignature) {
		return Error::TokenExpired;
	}

	Error::SignatureInvalid { source: Box::new(err) }
}
