//! Thread-safe in-memory [`SessionStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{SessionStore, StoreFuture},
};

type SessionMap = Arc<RwLock<HashMap<String, StoredSession>>>;

#[derive(Clone, Debug)]
struct StoredSession {
	payload: String,
	expires_at: OffsetDateTime,
}
impl StoredSession {
	fn is_live(&self, now: OffsetDateTime) -> bool {
		self.expires_at > now
	}
}

/// Thread-safe storage backend that keeps session payloads in-process.
///
/// Entries past their deadline are reported as absent; they are only reclaimed when deleted or
/// overwritten, matching the contract that expiry is the backend's concern and requires no
/// background sweeper.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SessionMap);
impl MemoryStore {
	fn set_now(map: SessionMap, sid: String, payload: String, ttl: Duration) {
		let expires_at = OffsetDateTime::now_utc() + ttl;

		map.write().insert(sid, StoredSession { payload, expires_at });
	}

	fn get_now(map: SessionMap, sid: String) -> Option<String> {
		let now = OffsetDateTime::now_utc();

		map.read().get(&sid).filter(|session| session.is_live(now)).map(|s| s.payload.clone())
	}

	fn exists_now(map: SessionMap, sid: String) -> bool {
		let now = OffsetDateTime::now_utc();

		map.read().get(&sid).is_some_and(|session| session.is_live(now))
	}

	fn del_now(map: SessionMap, sid: String) {
		map.write().remove(&sid);
	}
}
impl SessionStore for MemoryStore {
	fn set<'a>(&'a self, sid: &'a str, payload: String, ttl: Duration) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let sid = sid.to_owned();

		Box::pin(async move {
			Self::set_now(map, sid, payload, ttl);

			Ok(())
		})
	}

	fn get<'a>(&'a self, sid: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();
		let sid = sid.to_owned();

		Box::pin(async move { Ok(Self::get_now(map, sid)) })
	}

	fn exists<'a>(&'a self, sid: &'a str) -> StoreFuture<'a, bool> {
		let map = self.0.clone();
		let sid = sid.to_owned();

		Box::pin(async move { Ok(Self::exists_now(map, sid)) })
	}

	fn del<'a>(&'a self, sid: &'a str) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let sid = sid.to_owned();

		Box::pin(async move {
			Self::del_now(map, sid);

			Ok(())
		})
	}
}
