//! Cryptographically secure token generation and one-way identity hashing.

// crates.io
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generates `len` bytes from the thread-local CSPRNG and returns them hex-encoded.
///
/// The output is `2 * len` characters long; session identifiers use 32 bytes, which keeps the
/// collision probability negligible at any realistic session volume.
pub fn random_token(len: usize) -> String {
	let mut bytes = vec![0_u8; len];

	rand::rng().fill_bytes(&mut bytes);

	hex::encode(bytes)
}

/// Computes the SHA-256 digest of `value` and returns it hex-encoded.
///
/// The digest is deterministic and one-way: the same input always yields the same output, and
/// the input cannot be recovered from it. Canonical internal identities are derived by hashing
/// `"{provider}_{native_id}"`.
pub fn hash_id(value: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(value.as_bytes());

	hex::encode(hasher.finalize())
}
