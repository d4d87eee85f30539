//! Service-level configuration and the provider registry.
//!
//! The registry is assembled once at startup and read-only afterwards, so resolving a provider
//! for an inbound request needs no locking.

// self
use crate::{
	_prelude::*,
	auth::StateSession,
	flows::Authenticator,
	http::HandshakeHttpClient,
	provider::{Provider, ProviderBlueprint, ProviderCredentials},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Placeholder substituted with the provider name in callback path templates.
pub const PROVIDER_PLACEHOLDER: &str = "{provider}";
/// Callback path template used when none is configured.
pub const DEFAULT_CALLBACK_PATH_TEMPLATE: &str = "/u/auth/{provider}/callback";

/// Deployment-wide configuration bound into every registered provider.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
	/// Public base URL of the service, e.g. `https://app.example.com`.
	pub base_url: String,
	/// Callback path template containing the [`PROVIDER_PLACEHOLDER`].
	pub callback_path_template: String,
}
impl ServiceConfig {
	/// Creates a configuration with the default callback path template.
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			callback_path_template: DEFAULT_CALLBACK_PATH_TEMPLATE.into(),
		}
	}

	/// Overrides the callback path template.
	pub fn with_callback_path_template(mut self, template: impl Into<String>) -> Self {
		self.callback_path_template = template.into();

		self
	}

	pub(crate) fn callback_url(&self, provider: &str) -> String {
		let path = self.callback_path_template.replace(PROVIDER_PLACEHOLDER, provider);

		format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_matches('/'))
	}
}

/// Holds the configured providers and resolves one per incoming request.
pub struct AuthService<C>
where
	C: ?Sized + HandshakeHttpClient,
{
	config: ServiceConfig,
	state: StateSession,
	http_client: Arc<C>,
	providers: HashMap<String, Provider>,
}
impl<C> AuthService<C>
where
	C: ?Sized + HandshakeHttpClient,
{
	/// Creates a service around a transient state manager and a transport shared by every
	/// provider.
	pub fn new(config: ServiceConfig, state: StateSession, http_client: impl Into<Arc<C>>) -> Self {
		Self { config, state, http_client: http_client.into(), providers: HashMap::new() }
	}

	/// Registers a provider, binding the service configuration into it. The last registration
	/// for a given name wins.
	pub fn register(&mut self, blueprint: ProviderBlueprint, credentials: ProviderCredentials) {
		let provider = Provider::bind(blueprint, credentials, &self.config);

		self.providers.insert(provider.name().to_owned(), provider);
	}

	/// Resolves a registered provider by name.
	pub fn lookup(&self, name: &str) -> Result<&Provider> {
		if name.is_empty() {
			return Err(Error::NoProvider);
		}

		self.providers.get(name).ok_or_else(|| Error::ProviderNotFound { name: name.to_owned() })
	}

	/// Resolves a provider and binds it to the handshake machinery.
	pub fn authenticator(&self, name: &str) -> Result<Authenticator<'_, C>> {
		Ok(Authenticator::new(self.lookup(name)?, &self.state, self.http_client.as_ref()))
	}

	/// Service configuration the registry was built with.
	pub fn config(&self) -> &ServiceConfig {
		&self.config
	}
}
#[cfg(feature = "reqwest")]
impl AuthService<ReqwestHttpClient> {
	/// Creates a service with the crate's default reqwest transport.
	pub fn with_default_transport(config: ServiceConfig, state: StateSession) -> Self {
		Self::new(config, state, ReqwestHttpClient::default())
	}
}
impl<C> Debug for AuthService<C>
where
	C: ?Sized + HandshakeHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthService")
			.field("config", &self.config)
			.field("providers", &self.providers.keys().collect::<Vec<_>>())
			.finish()
	}
}
