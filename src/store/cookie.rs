//! Reference [`BrowserStore`] binding over HTTP cookie headers.

// self
use crate::{
	_prelude::*,
	store::{BrowserStore, StoreError},
};

const DEFAULT_PATH: &str = "/";

/// `SameSite` attribute values recognized by the cookie binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
	/// Cookies are only sent in a first-party context.
	Strict,
	/// Cookies are withheld on cross-site subrequests but sent on top-level navigation.
	Lax,
	/// Cookies are sent in all contexts (requires `Secure`).
	None,
}
impl SameSite {
	/// Returns the attribute value as it appears on the wire.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Strict => "Strict",
			Self::Lax => "Lax",
			Self::None => "None",
		}
	}
}

/// [`BrowserStore`] implementation that reads the `Cookie` request header and appends
/// `Set-Cookie` response headers.
///
/// Deletion follows the conventional expiry dance: an empty value with `Max-Age=0` and an epoch
/// `Expires` attribute instructs the browser to drop the cookie immediately.
#[derive(Clone, Debug)]
pub struct CookieStore {
	path: String,
	domain: Option<String>,
	http_only: bool,
	secure: bool,
	same_site: Option<SameSite>,
}
impl CookieStore {
	/// Overrides the cookie path (defaults to `/`).
	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();

		self
	}

	/// Sets the cookie domain (unset by default).
	pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
		self.domain = Some(domain.into());

		self
	}

	/// Overrides the `HttpOnly` flag (defaults to `true`).
	pub fn with_http_only(mut self, http_only: bool) -> Self {
		self.http_only = http_only;

		self
	}

	/// Overrides the `Secure` flag (defaults to `true`).
	pub fn with_secure(mut self, secure: bool) -> Self {
		self.secure = secure;

		self
	}

	/// Sets the `SameSite` attribute (unset by default).
	pub fn with_same_site(mut self, same_site: SameSite) -> Self {
		self.same_site = Some(same_site);

		self
	}

	fn append_cookie(
		&self,
		response: &mut HeaderMap,
		name: &str,
		value: &str,
		tail: &str,
	) -> Result<(), StoreError> {
		validate_token("cookie name", name)?;
		validate_token("cookie value", value)?;

		let mut cookie = format!("{name}={value}; Path={}", self.path);

		if let Some(domain) = self.domain.as_deref() {
			cookie.push_str("; Domain=");
			cookie.push_str(domain);
		}

		cookie.push_str(tail);

		if self.http_only {
			cookie.push_str("; HttpOnly");
		}
		if self.secure {
			cookie.push_str("; Secure");
		}
		if let Some(same_site) = self.same_site {
			cookie.push_str("; SameSite=");
			cookie.push_str(same_site.as_str());
		}

		let header = HeaderValue::from_str(&cookie).map_err(|e| StoreError::Backend {
			message: format!("cookie is not a valid header value: {e}"),
		})?;

		response.append(SET_COOKIE, header);

		Ok(())
	}
}
impl Default for CookieStore {
	fn default() -> Self {
		Self {
			path: DEFAULT_PATH.into(),
			domain: None,
			http_only: true,
			secure: true,
			same_site: None,
		}
	}
}
impl BrowserStore for CookieStore {
	fn set(
		&self,
		response: &mut HeaderMap,
		name: &str,
		value: &str,
		ttl: Duration,
	) -> Result<(), StoreError> {
		let max_age = ttl.whole_seconds().max(0);

		self.append_cookie(response, name, value, &format!("; Max-Age={max_age}"))
	}

	fn get(&self, request: &HeaderMap, name: &str) -> Result<Option<String>, StoreError> {
		for header in request.get_all(COOKIE) {
			let Ok(raw) = header.to_str() else {
				continue;
			};

			for pair in raw.split(';') {
				if let Some((cookie_name, value)) = pair.trim().split_once('=')
					&& cookie_name == name
				{
					return Ok(Some(value.to_owned()));
				}
			}
		}

		Ok(None)
	}

	fn del(&self, response: &mut HeaderMap, name: &str) -> Result<(), StoreError> {
		self.append_cookie(
			response,
			name,
			"",
			"; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
		)
	}
}

fn validate_token(kind: &'static str, value: &str) -> Result<(), StoreError> {
	if value.chars().any(|c| c.is_control() || matches!(c, ';' | ',' | ' ')) {
		return Err(StoreError::Backend { message: format!("{kind} contains forbidden characters") });
	}

	Ok(())
}
