//! Crate-level error taxonomy shared across the handshake, registry, and session layers.
//!
//! Every variant carries a classified, client-safe message; the underlying cause—when one
//! exists—is attached as a `source` for logging and must never be rendered to the client.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// No provider name was supplied.
	#[error("No provider given.")]
	NoProvider,
	/// The named provider is not registered.
	#[error("Unknown provider: {name}.")]
	ProviderNotFound {
		/// Provider name that failed to resolve.
		name: String,
	},
	/// The callback request is missing its `state` query parameter.
	#[error("The `state` query parameter is missing.")]
	StateMissing,
	/// The callback `state` does not match the stored transient state (CSRF signal).
	#[error("The returned state does not match the stored authentication state.")]
	UnexpectedState,
	/// The callback request is malformed.
	#[error("Bad request: {reason}.")]
	BadRequest {
		/// Classified reason rendered to the client.
		reason: &'static str,
	},

	/// The transient auth token failed signature or structural validation.
	#[error("The transient auth token is invalid.")]
	SignatureInvalid {
		/// Underlying parser or verifier failure.
		#[source]
		source: BoxError,
	},
	/// The transient auth token has passed its expiry.
	#[error("The transient auth token has expired.")]
	TokenExpired,
	/// The transient auth token was issued for a different audience.
	#[error("The transient auth token audience is not allowed.")]
	AudienceMismatch {
		/// Audience carried by the rejected token.
		audience: String,
	},
	/// No credential was presented for an operation that requires one.
	#[error("Not authenticated.")]
	Unauthenticated,

	/// Signing the transient auth state failed.
	#[error("Failed to sign the transient auth state.")]
	StateSigningFailed {
		/// Underlying signer failure.
		#[source]
		source: BoxError,
	},
	/// The code-for-token exchange with the provider failed.
	#[error("The authorization code exchange failed.")]
	ExchangeFailed {
		/// Underlying exchange failure.
		#[source]
		source: BoxError,
	},
	/// The profile document could not be fetched from the provider.
	#[error("Failed to fetch the profile document.")]
	ProfileFetchFailed {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// The profile document could not be parsed or mapped into a canonical profile.
	#[error("Failed to map the provider profile.")]
	ProfileMapFailed {
		/// Underlying parse or mapper failure.
		#[source]
		source: BoxError,
	},

	/// Creating the durable session failed; any partial write has been rolled back.
	#[error("Failed to create the session.")]
	SessionCreateFailed {
		/// Underlying storage failure.
		#[source]
		source: BoxError,
	},
	/// The session cookie resolved to no stored session.
	#[error("Session not found.")]
	SessionNotFound,
	/// Deleting the durable session record failed; the cookie is left intact for retry.
	#[error("Failed to delete the session.")]
	SessionDeleteFailed {
		/// Underlying storage failure.
		#[source]
		source: BoxError,
	},
	/// The session record is gone but the cookie could not be cleared.
	#[error("Failed to delete the session cookie.")]
	CookieDeleteFailed {
		/// Underlying storage failure.
		#[source]
		source: BoxError,
	},
}
impl Error {
	/// Classifies the error into a response-status family.
	pub fn severity(&self) -> Severity {
		match self {
			Self::NoProvider
			| Self::ProviderNotFound { .. }
			| Self::StateMissing
			| Self::UnexpectedState
			| Self::BadRequest { .. } => Severity::BadRequest,
			Self::SignatureInvalid { .. }
			| Self::TokenExpired
			| Self::AudienceMismatch { .. }
			| Self::SessionNotFound
			| Self::Unauthenticated => Severity::Unauthorized,
			Self::Storage(_)
			| Self::Config(_)
			| Self::StateSigningFailed { .. }
			| Self::ExchangeFailed { .. }
			| Self::ProfileFetchFailed { .. }
			| Self::ProfileMapFailed { .. }
			| Self::SessionCreateFailed { .. }
			| Self::SessionDeleteFailed { .. }
			| Self::CookieDeleteFailed { .. } => Severity::Internal,
		}
	}
}

/// Response-status family an [`Error`] maps to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	/// The request itself was malformed or referenced an unknown provider.
	BadRequest,
	/// The caller presented no credential, or an invalid or expired one.
	Unauthorized,
	/// A dependency or the crate itself failed.
	Internal,
}
impl Severity {
	/// Suggested HTTP status code for the family.
	pub fn status_hint(self) -> u16 {
		match self {
			Self::BadRequest => 400,
			Self::Unauthorized => 401,
			Self::Internal => 500,
		}
	}
}
impl Display for Severity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let label = match self {
			Self::BadRequest => "bad_request",
			Self::Unauthorized => "unauthorized",
			Self::Internal => "internal",
		};

		f.write_str(label)
	}
}

/// Configuration and validation failures raised while binding providers.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Provider endpoint configuration contains an invalid URL.
	#[error("Provider endpoint configuration contains an invalid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// The derived callback URL cannot be parsed.
	#[error("The derived callback URL is invalid.")]
	InvalidCallback {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// A computed header value contains characters not permitted in HTTP headers.
	#[error("A computed header value is not a valid HTTP header.")]
	InvalidHeaderValue {
		/// Underlying header validation failure.
		#[source]
		source: oauth2::http::header::InvalidHeaderValue,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn severity_classifies_the_full_taxonomy() {
		assert_eq!(Error::NoProvider.severity(), Severity::BadRequest);
		assert_eq!(Error::ProviderNotFound { name: "x".into() }.severity(), Severity::BadRequest);
		assert_eq!(Error::StateMissing.severity(), Severity::BadRequest);
		assert_eq!(Error::UnexpectedState.severity(), Severity::BadRequest);
		assert_eq!(Error::TokenExpired.severity(), Severity::Unauthorized);
		assert_eq!(Error::Unauthenticated.severity(), Severity::Unauthorized);
		assert_eq!(Error::SessionNotFound.severity(), Severity::Unauthorized);
		assert_eq!(
			Error::Storage(StoreError::Backend { message: "down".into() }).severity(),
			Severity::Internal,
		);
		assert_eq!(Severity::BadRequest.status_hint(), 400);
		assert_eq!(Severity::Unauthorized.status_hint(), 401);
		assert_eq!(Severity::Internal.status_hint(), 500);
	}

	#[test]
	fn classified_message_hides_the_internal_cause() {
		let source: Box<dyn StdError + Send + Sync> =
			"connection to session backend refused".into();
		let error = Error::SessionCreateFailed { source };

		assert_eq!(error.to_string(), "Failed to create the session.");

		let source = StdError::source(&error)
			.expect("Session creation failures should expose their cause as a source.");

		assert!(source.to_string().contains("refused"));
	}
}
