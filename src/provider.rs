//! Provider-facing data model: endpoint configuration, client credentials, profile mappers, and
//! the registered provider that binds them all to the handshake protocol.

pub mod catalog;

pub use catalog::*;

// crates.io
use oauth2::{
	ClientId, ClientSecret, EndpointNotSet, EndpointSet, RedirectUrl, TokenUrl, basic::BasicClient,
};
// self
use crate::{
	_prelude::*,
	auth::{Profile, ProfileDocument},
	error::ConfigError,
	service::ServiceConfig,
};

/// Exchange-ready `oauth2` client with only the token endpoint bound; the authorize URL is
/// assembled by hand so the transient state controls the `state` parameter directly.
pub(crate) type ExchangeClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Per-provider pure function turning a raw profile document (and its raw bytes, for mappers
/// that need to re-read vendor-specific structure) into a canonical [`Profile`].
pub type MapProfileFn =
	Arc<dyn Fn(&ProfileDocument, &[u8]) -> Result<Profile, BoxError> + Send + Sync>;

/// Endpoint configuration declared by a provider blueprint.
#[derive(Clone, Debug)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the user agent is redirected to.
	pub authorize: Url,
	/// Token endpoint used for the code-for-token exchange.
	pub token: Url,
	/// Profile endpoint queried with the obtained access token.
	pub profile: Url,
	/// Scopes requested during authorization.
	pub scopes: Vec<String>,
}

/// Immutable description of one identity provider: its name, endpoints, and profile mapper.
///
/// Blueprints carry no deployment-specific data; client credentials and the callback URL are
/// bound at registration time.
#[derive(Clone)]
pub struct ProviderBlueprint {
	name: String,
	endpoints: ProviderEndpoints,
	map_profile: MapProfileFn,
}
impl ProviderBlueprint {
	/// Creates a blueprint from its three parts.
	pub fn new(
		name: impl Into<String>,
		endpoints: ProviderEndpoints,
		map_profile: MapProfileFn,
	) -> Self {
		Self { name: name.into(), endpoints, map_profile }
	}

	/// Unique provider name used as the registry key.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Endpoint configuration.
	pub fn endpoints(&self) -> &ProviderEndpoints {
		&self.endpoints
	}
}
impl Debug for ProviderBlueprint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderBlueprint")
			.field("name", &self.name)
			.field("endpoints", &self.endpoints)
			.finish()
	}
}

/// OAuth client credentials issued by the provider for this deployment.
#[derive(Clone)]
pub struct ProviderCredentials {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: String,
}
impl ProviderCredentials {
	/// Creates a credential pair.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: client_secret.into() }
	}
}
impl Debug for ProviderCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret_set", &!self.client_secret.is_empty())
			.finish()
	}
}

/// A blueprint bound to service-level configuration: credentials plus the callback URL derived
/// from the service base URL and callback path template. Immutable after registration.
#[derive(Clone, Debug)]
pub struct Provider {
	blueprint: ProviderBlueprint,
	credentials: ProviderCredentials,
	callback_url: String,
}
impl Provider {
	pub(crate) fn bind(
		blueprint: ProviderBlueprint,
		credentials: ProviderCredentials,
		config: &ServiceConfig,
	) -> Self {
		let callback_url = config.callback_url(blueprint.name());

		Self { blueprint, credentials, callback_url }
	}

	/// Unique provider name.
	pub fn name(&self) -> &str {
		self.blueprint.name()
	}

	/// Endpoint configuration.
	pub fn endpoints(&self) -> &ProviderEndpoints {
		self.blueprint.endpoints()
	}

	/// Callback URL the provider redirects back to after authorization.
	pub fn callback_url(&self) -> &str {
		&self.callback_url
	}

	pub(crate) fn map_profile(&self) -> &MapProfileFn {
		&self.blueprint.map_profile
	}

	/// Builds the provider's authorize URL carrying the handshake `state`.
	pub(crate) fn authorize_url(&self, state: &str) -> Url {
		let mut url = self.blueprint.endpoints.authorize.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", &self.credentials.client_id);
		pairs.append_pair("redirect_uri", &self.callback_url);

		if !self.blueprint.endpoints.scopes.is_empty() {
			pairs.append_pair("scope", &self.blueprint.endpoints.scopes.join(" "));
		}

		pairs.append_pair("state", state);

		drop(pairs);

		url
	}

	/// Builds the `oauth2` client used for the code-for-token exchange.
	pub(crate) fn exchange_client(&self) -> Result<ExchangeClient> {
		let token_url = TokenUrl::new(self.blueprint.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let redirect_url = RedirectUrl::new(self.callback_url.clone())
			.map_err(|source| ConfigError::InvalidCallback { source })?;
		let client = BasicClient::new(ClientId::new(self.credentials.client_id.clone()))
			.set_client_secret(ClientSecret::new(self.credentials.client_secret.clone()))
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url);

		Ok(client)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;
	use crate::auth::hash_id;

	fn blueprint() -> ProviderBlueprint {
		let endpoints = ProviderEndpoints {
			authorize: Url::parse("https://idp.example.com/authorize")
				.expect("Authorize endpoint fixture should parse."),
			token: Url::parse("https://idp.example.com/token")
				.expect("Token endpoint fixture should parse."),
			profile: Url::parse("https://idp.example.com/userinfo")
				.expect("Profile endpoint fixture should parse."),
			scopes: vec!["email".into(), "profile".into()],
		};

		ProviderBlueprint::new(
			"acme",
			endpoints,
			Arc::new(|document, _| {
				let subject = document.require("sub")?;

				Ok(Profile {
					id: hash_id(&format!("acme_{subject}")),
					subject,
					..Default::default()
				})
			}),
		)
	}

	fn bound_provider() -> Provider {
		Provider::bind(
			blueprint(),
			ProviderCredentials::new("client-id", "client-secret"),
			&ServiceConfig::new("https://app.example.com/"),
		)
	}

	#[test]
	fn binding_derives_the_callback_url() {
		let provider = bound_provider();

		assert_eq!(provider.callback_url(), "https://app.example.com/u/auth/acme/callback");
	}

	#[test]
	fn authorize_url_carries_the_handshake_parameters() {
		let provider = bound_provider();
		let url = provider.authorize_url("state-123");
		let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();

		assert!(url.as_str().starts_with("https://idp.example.com/authorize?"));
		assert_eq!(pairs.get("response_type"), Some(&"code".into()));
		assert_eq!(pairs.get("client_id"), Some(&"client-id".into()));
		assert_eq!(
			pairs.get("redirect_uri"),
			Some(&"https://app.example.com/u/auth/acme/callback".into()),
		);
		assert_eq!(pairs.get("scope"), Some(&"email profile".into()));
		assert_eq!(pairs.get("state"), Some(&"state-123".into()));
	}

	#[test]
	fn exchange_client_builds_for_well_formed_endpoints() {
		assert!(bound_provider().exchange_client().is_ok());
	}
}
