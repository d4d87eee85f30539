//! Delegated OAuth 2.0 login for Rust services—sign the handshake against CSRF, resolve provider
//! profiles into canonical identities, and keep durable browser sessions in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod flows;
pub mod http;
pub mod provider;
pub mod service;
pub mod session;
pub mod store;
pub mod _preludet {
	//! Convenience re-exports and helpers shared by the crate's unit and integration tests.
	//! Not part of the stable API surface.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::StateSession,
		session::SessionControl,
		store::{BrowserStore, CookieStore, MemoryStore, SessionStore},
	};

	/// Signing secret shared by state-session fixtures.
	pub const TEST_SECRET: &str = "gatehouse-test-signing-secret";

	/// Builds a cookie store suitable for header-level tests.
	pub fn test_cookie_store() -> Arc<CookieStore> {
		Arc::new(CookieStore::default())
	}

	/// Builds a state session bound to the provided browser store.
	pub fn test_state_session(browser: Arc<dyn BrowserStore>) -> StateSession {
		StateSession::new(browser, TEST_SECRET)
			.expect("State session fixture should accept a non-empty secret.")
	}

	/// Builds a session controller backed by cookie browser storage and in-memory session
	/// storage, returning the memory backend for direct inspection.
	pub fn test_session_control() -> (SessionControl, Arc<MemoryStore>) {
		let browser: Arc<dyn BrowserStore> = test_cookie_store();
		let backend = Arc::new(MemoryStore::default());
		let sessions: Arc<dyn SessionStore> = backend.clone();

		(SessionControl::new(browser, sessions), backend)
	}

	/// Converts the `Set-Cookie` headers of a response into the `Cookie` header a browser would
	/// send on its next request, honoring deletions along the way.
	pub fn echo_cookies(response: &HeaderMap) -> HeaderMap {
		let mut jar = Vec::<(String, String)>::new();

		for header in response.get_all(SET_COOKIE) {
			let Some(pair) = header.to_str().ok().and_then(|raw| raw.split(';').next()) else {
				continue;
			};
			let Some((name, value)) = pair.split_once('=') else {
				continue;
			};

			jar.retain(|(existing, _)| existing != name);

			if !value.is_empty() {
				jar.push((name.to_owned(), value.to_owned()));
			}
		}

		let mut request = HeaderMap::new();

		if jar.is_empty() {
			return request;
		}

		let cookie =
			jar.iter().map(|(name, value)| format!("{name}={value}")).collect::<Vec<_>>().join("; ");

		if let Ok(value) = HeaderValue::from_str(&cookie) {
			request.insert(COOKIE, value);
		}

		request
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use oauth2::http::{
		HeaderMap, HeaderValue,
		header::{COOKIE, LOCATION, SET_COOKIE},
	};
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tokio as _};
