//! Durable sessions: the opaque identifier handed to the browser and the server-side record it
//! resolves to.
//!
//! Creation is an explicit two-phase write—browser storage first, then session storage—with a
//! compensating delete of the first phase when the second fails, so a cookie can never point at
//! a session that does not exist. Deletion runs the phases in the opposite order for the same
//! reason: the record goes first, and only then the cookie.

// crates.io
use tracing::warn;
// self
use crate::{
	_prelude::*,
	auth::token::random_token,
	flows::AuthResult,
	store::{BrowserStore, SessionStore, StoreError},
};

/// Browser-storage key the session identifier is stored under by default.
pub const DEFAULT_SESSION_KEY: &str = "sid";

const DEFAULT_SESSION_ID_LEN: usize = 32;
const DEFAULT_SESSION_TTL: Duration = Duration::hours(24);

/// Creates, reads, and deletes durable sessions, coordinating browser storage and session
/// storage.
pub struct SessionControl {
	browser: Arc<dyn BrowserStore>,
	sessions: Arc<dyn SessionStore>,
	session_key: String,
	session_id_len: usize,
	session_ttl: Duration,
}
impl SessionControl {
	/// Creates a controller with the default key (`sid`), identifier length (32 random bytes),
	/// and time-to-live (24 hours).
	pub fn new(browser: Arc<dyn BrowserStore>, sessions: Arc<dyn SessionStore>) -> Self {
		Self {
			browser,
			sessions,
			session_key: DEFAULT_SESSION_KEY.into(),
			session_id_len: DEFAULT_SESSION_ID_LEN,
			session_ttl: DEFAULT_SESSION_TTL,
		}
	}

	/// Overrides the browser-storage key.
	pub fn with_session_key(mut self, session_key: impl Into<String>) -> Self {
		self.session_key = session_key.into();

		self
	}

	/// Overrides the identifier length in random bytes (the stored identifier is twice as many
	/// hex characters).
	pub fn with_session_id_len(mut self, len: usize) -> Self {
		self.session_id_len = len;

		self
	}

	/// Overrides the session time-to-live, mirrored in both stores.
	pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
		self.session_ttl = ttl;

		self
	}

	/// Begins a durable session for an authenticated identity and returns its identifier.
	///
	/// When the session-storage write fails after the cookie was already written, the cookie is
	/// deleted again before the error is returned, so no orphaned cookie survives the failure.
	pub async fn set(&self, response: &mut HeaderMap, result: &AuthResult) -> Result<String> {
		let sid = random_token(self.session_id_len);
		let payload = serde_json::to_string(result).map_err(|e| {
			Error::SessionCreateFailed {
				source: Box::new(StoreError::Serialization { message: e.to_string() }),
			}
		})?;

		self.browser
			.set(response, &self.session_key, &sid, self.session_ttl)
			.map_err(|source| Error::SessionCreateFailed { source: Box::new(source) })?;

		match self.sessions.set(&sid, payload, self.session_ttl).await {
			Ok(()) => Ok(sid),
			Err(source) => {
				// Roll back the first phase; both Set-Cookie headers are still in flight, and
				// the delete wins because it is processed last.
				if let Err(cleanup) = self.browser.del(response, &self.session_key) {
					warn!(error = %cleanup, "failed to roll back the session cookie after a store failure");
				}

				Err(Error::SessionCreateFailed { source: Box::new(source) })
			},
		}
	}

	/// Loads the authenticated identity for the request's session.
	pub async fn get(&self, request: &HeaderMap) -> Result<AuthResult> {
		let sid = self.session_id(request)?.ok_or(Error::Unauthenticated)?;
		let payload = self.sessions.get(&sid).await?.ok_or(Error::SessionNotFound)?;

		serde_json::from_str(&payload).map_err(|e| {
			Error::Storage(StoreError::Serialization { message: e.to_string() })
		})
	}

	/// Probes whether the request carries a live session, without deserializing its payload.
	pub async fn exists(&self, request: &HeaderMap) -> Result<bool> {
		let Some(sid) = self.session_id(request)? else {
			return Ok(false);
		};

		Ok(self.sessions.exists(&sid).await?)
	}

	/// Ends the request's session.
	///
	/// The durable record is deleted first; a failure there keeps the cookie intact so the
	/// error stays visible and retryable. A failure deleting the cookie afterwards is reported
	/// distinctly, since the durable session is already gone.
	pub async fn del(&self, response: &mut HeaderMap, request: &HeaderMap) -> Result<()> {
		let sid = self.session_id(request)?.ok_or(Error::Unauthenticated)?;

		self.sessions
			.del(&sid)
			.await
			.map_err(|source| Error::SessionDeleteFailed { source: Box::new(source) })?;
		self.browser
			.del(response, &self.session_key)
			.map_err(|source| Error::CookieDeleteFailed { source: Box::new(source) })?;

		Ok(())
	}

	/// Resolves the raw session identifier from browser storage; empty identifiers read as
	/// absent.
	pub fn session_id(&self, request: &HeaderMap) -> Result<Option<String>> {
		Ok(self.browser.get(request, &self.session_key)?.filter(|sid| !sid.is_empty()))
	}
}
impl Debug for SessionControl {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionControl")
			.field("session_key", &self.session_key)
			.field("session_id_len", &self.session_id_len)
			.field("session_ttl", &self.session_ttl)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::Profile,
		flows::TokenMaterial,
		store::{CookieStore, StoreFuture},
	};

	fn auth_result() -> AuthResult {
		AuthResult {
			provider: "acme".into(),
			profile: Profile { id: "internal".into(), subject: "123".into(), ..Default::default() },
			token: TokenMaterial {
				access_token: "access".into(),
				refresh_token: None,
				expires_at: None,
			},
			redirect_url: "/dashboard".into(),
		}
	}

	#[tokio::test]
	async fn set_then_get_round_trips_the_auth_result() {
		let (control, _) = test_session_control();
		let mut response = HeaderMap::new();
		let sid = control
			.set(&mut response, &auth_result())
			.await
			.expect("Creating a session should succeed.");

		assert_eq!(sid.len(), 64);

		let request = echo_cookies(&response);
		let loaded = control.get(&request).await.expect("Loading the session should succeed.");

		assert_eq!(loaded, auth_result());
		assert!(control.exists(&request).await.expect("Probing the session should succeed."));
	}

	#[tokio::test]
	async fn del_removes_both_halves() {
		let (control, backend) = test_session_control();
		let mut response = HeaderMap::new();
		let sid = control
			.set(&mut response, &auth_result())
			.await
			.expect("Creating a session should succeed.");
		let request = echo_cookies(&response);
		let mut logout_response = HeaderMap::new();

		control
			.del(&mut logout_response, &request)
			.await
			.expect("Deleting the session should succeed.");

		assert!(!backend.exists(&sid).await.expect("Probing the backend should succeed."));

		// The browser drops the cookie, so the follow-up request carries none.
		let request = echo_cookies(&logout_response);

		assert!(matches!(control.get(&request).await, Err(Error::Unauthenticated)));
		assert!(!control.exists(&request).await.expect("Probing should succeed."));
	}

	#[tokio::test]
	async fn requests_without_a_cookie_are_unauthenticated() {
		let (control, _) = test_session_control();
		let request = HeaderMap::new();

		assert!(matches!(control.get(&request).await, Err(Error::Unauthenticated)));
		assert!(!control.exists(&request).await.expect("Probing should succeed."));

		let mut response = HeaderMap::new();

		assert!(matches!(control.del(&mut response, &request).await, Err(Error::Unauthenticated)));
	}

	#[tokio::test]
	async fn stale_cookies_resolve_to_session_not_found() {
		let (control, _) = test_session_control();
		let mut request = HeaderMap::new();

		request.insert(
			COOKIE,
			HeaderValue::from_static("sid=deadbeefdeadbeefdeadbeefdeadbeef"),
		);

		assert!(matches!(control.get(&request).await, Err(Error::SessionNotFound)));
	}

	struct FailingSessionStore;
	impl crate::store::SessionStore for FailingSessionStore {
		fn set<'a>(&'a self, _: &'a str, _: String, _: Duration) -> StoreFuture<'a, ()> {
			Box::pin(async {
				Err(crate::store::StoreError::Backend { message: "write refused".into() })
			})
		}

		fn get<'a>(&'a self, _: &'a str) -> StoreFuture<'a, Option<String>> {
			Box::pin(async { Ok(None) })
		}

		fn exists<'a>(&'a self, _: &'a str) -> StoreFuture<'a, bool> {
			Box::pin(async { Ok(false) })
		}

		fn del<'a>(&'a self, _: &'a str) -> StoreFuture<'a, ()> {
			Box::pin(async { Ok(()) })
		}
	}

	#[tokio::test]
	async fn failed_store_write_rolls_back_the_cookie() {
		let browser: Arc<dyn BrowserStore> = test_cookie_store();
		let control = SessionControl::new(browser, Arc::new(FailingSessionStore));
		let mut response = HeaderMap::new();
		let err = control
			.set(&mut response, &auth_result())
			.await
			.expect_err("A failing session store should fail the whole set.");

		assert!(matches!(err, Error::SessionCreateFailed { .. }));

		// The compensating delete means the browser ends up with no session cookie at all.
		let request = echo_cookies(&response);
		let cookie_store = CookieStore::default();

		assert_eq!(
			cookie_store
				.get(&request, DEFAULT_SESSION_KEY)
				.expect("Reading the echoed cookies should succeed."),
			None,
		);
	}
}
