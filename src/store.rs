//! Storage contracts for the two persistence collaborators: browser storage (one named opaque
//! value on the client, cookie-shaped) and session storage (opaque payloads keyed by session
//! identifier on the server).

pub mod cookie;
pub mod memory;

pub use cookie::{CookieStore, SameSite};
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Client-side storage contract: a single named opaque string with a time-to-live.
///
/// The reference binding writes HTTP cookies via the response/request header maps; callers on a
/// different edge (custom framing, tests) may substitute any implementation. Operations are
/// synchronous because they only manipulate in-flight headers.
pub trait BrowserStore
where
	Self: Send + Sync,
{
	/// Stores `value` under `name` with the provided time-to-live.
	fn set(
		&self,
		response: &mut HeaderMap,
		name: &str,
		value: &str,
		ttl: Duration,
	) -> Result<(), StoreError>;

	/// Retrieves the value stored under `name`, or `None` when absent.
	fn get(&self, request: &HeaderMap, name: &str) -> Result<Option<String>, StoreError>;

	/// Deletes the value stored under `name`.
	fn del(&self, response: &mut HeaderMap, name: &str) -> Result<(), StoreError>;
}

/// Server-side storage contract: opaque payloads keyed by session identifier.
///
/// Implementations must tolerate concurrent access from unrelated requests and are responsible
/// for enforcing the time-to-live; this crate performs no background eviction.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the payload stored under `sid`.
	fn set<'a>(&'a self, sid: &'a str, payload: String, ttl: Duration) -> StoreFuture<'a, ()>;

	/// Fetches the payload stored under `sid`, or `None` when absent or expired.
	fn get<'a>(&'a self, sid: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Probes for a live payload under `sid` without returning it.
	fn exists<'a>(&'a self, sid: &'a str) -> StoreFuture<'a, bool>;

	/// Deletes the payload stored under `sid`.
	fn del<'a>(&'a self, sid: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`BrowserStore`] and [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
