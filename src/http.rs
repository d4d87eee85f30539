//! Transport primitives for the handshake's two outbound calls: the code-for-token exchange and
//! the profile fetch.
//!
//! [`HandshakeHttpClient`] is the crate's only dependency on an HTTP stack. Callers provide an
//! implementation (typically behind `Arc<T>`); the handshake requests short-lived
//! [`AsyncHttpClient`] handles for token exchanges and delegates profile fetches to the same
//! implementation. Timeouts, proxies, and retry policy belong to the supplied client—the
//! handshake itself never retries.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError};
#[cfg(feature = "reqwest")] use oauth2::{HttpRequest, HttpResponse};
// self
use crate::_prelude::*;

/// Boxed transport error surfaced by profile fetches.
pub type BoxedTransportError = Box<dyn StdError + Send + Sync>;

/// Boxed future returned by [`HandshakeHttpClient::fetch_profile`].
pub type ProfileFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Vec<u8>, BoxedTransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing the handshake's network calls.
///
/// Implementations must be `Send + Sync + 'static` so one client can serve every provider
/// registered with a service, and the handles they return must own whatever state their request
/// futures need so those futures remain `Send` while in flight.
pub trait HandshakeHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for one token exchange.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle for a token exchange.
	fn token_handle(&self) -> Self::Handle;

	/// Fetches the raw profile document from `url`, authenticating with the bearer
	/// `access_token`. Non-success statuses must surface as errors.
	fn fetch_profile<'a>(&'a self, url: &'a Url, access_token: &'a str) -> ProfileFuture<'a>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token requests should not follow redirects, matching OAuth 2.0 guidance that token endpoints
/// return results directly instead of delegating to another URI; configure any custom
/// [`ReqwestClient`] accordingly.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}

/// Exchange handle returned by [`ReqwestHttpClient`] that satisfies [`HandshakeHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHandle(ReqwestClient);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
#[cfg(feature = "reqwest")]
impl HandshakeHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn token_handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}

	fn fetch_profile<'a>(&'a self, url: &'a Url, access_token: &'a str) -> ProfileFuture<'a> {
		Box::pin(async move {
			let response = self
				.0
				.get(url.clone())
				.bearer_auth(access_token)
				.send()
				.await
				.map_err(|e| Box::new(e) as BoxedTransportError)?
				.error_for_status()
				.map_err(|e| Box::new(e) as BoxedTransportError)?;

			Ok(response.bytes().await.map_err(|e| Box::new(e) as BoxedTransportError)?.to_vec())
		})
	}
}
