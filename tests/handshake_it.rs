#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use oauth2_gatehouse::{
	_preludet::*,
	auth::{AuthConfig, Profile, hash_id},
	flows::{AuthResult, CallbackQuery},
	http::ReqwestHttpClient,
	provider::{ProviderBlueprint, ProviderCredentials, ProviderEndpoints},
	service::{AuthService, ServiceConfig},
	store::BrowserStore,
};

const CLIENT_ID: &str = "client-it";
const CLIENT_SECRET: &str = "secret-it";
const PROVIDER: &str = "mock-idp";

fn build_blueprint(server: &MockServer) -> ProviderBlueprint {
	let endpoints = ProviderEndpoints {
		authorize: Url::parse(&server.url("/authorize"))
			.expect("Mock authorization endpoint should parse successfully."),
		token: Url::parse(&server.url("/token"))
			.expect("Mock token endpoint should parse successfully."),
		profile: Url::parse(&server.url("/userinfo"))
			.expect("Mock profile endpoint should parse successfully."),
		scopes: vec!["email".into(), "profile".into()],
	};

	ProviderBlueprint::new(
		PROVIDER,
		endpoints,
		Arc::new(|document, _| {
			let subject = document.require("sub")?;

			Ok(Profile {
				id: hash_id(&format!("{PROVIDER}_{subject}")),
				subject,
				name: document.string("name"),
				email: document.string("email"),
				..Default::default()
			})
		}),
	)
}

fn build_service(server: &MockServer) -> AuthService<ReqwestHttpClient> {
	let state = test_state_session(test_cookie_store());
	let mut service =
		AuthService::with_default_transport(ServiceConfig::new("https://app.example.com"), state);

	service.register(build_blueprint(server), ProviderCredentials::new(CLIENT_ID, CLIENT_SECRET));

	service
}

fn state_from_authorize_url(url: &Url) -> String {
	url.query_pairs()
		.find(|(key, _)| key == "state")
		.map(|(_, value)| value.into_owned())
		.expect("The authorize URL should carry a state parameter.")
}

#[tokio::test]
async fn begin_redirects_and_finish_resolves_the_auth_result() {
	let server = MockServer::start_async().await;
	let service = build_service(&server);
	let authenticator =
		service.authenticator(PROVIDER).expect("The registered provider should resolve.");
	let mut begin_response = HeaderMap::new();
	let authorize_url = authenticator
		.begin(&mut begin_response, &AuthConfig::redirect_to("/dashboard"))
		.expect("Beginning the handshake should succeed.");

	let location = begin_response
		.get(LOCATION)
		.expect("A Location header should be present.")
		.to_str()
		.expect("The Location header should be ASCII.");

	assert_eq!(location, authorize_url.as_str());

	let pairs: HashMap<_, _> = authorize_url.query_pairs().into_owned().collect();

	assert_eq!(pairs.get("response_type"), Some(&"code".into()));
	assert_eq!(pairs.get("client_id"), Some(&CLIENT_ID.into()));
	assert_eq!(
		pairs.get("redirect_uri"),
		Some(&format!("https://app.example.com/u/auth/{PROVIDER}/callback")),
	);
	assert_eq!(pairs.get("scope"), Some(&"email profile".into()));

	let state = state_from_authorize_url(&authorize_url);

	assert_eq!(state.len(), 64);

	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"access-success\",\"refresh_token\":\"refresh-success\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo").header("authorization", "Bearer access-success");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":\"123\",\"name\":\"Ada Lovelace\",\"email\":\"ada@example.com\"}");
		})
		.await;
	let request = echo_cookies(&begin_response);
	let mut finish_response = HeaderMap::new();
	let result = authenticator
		.finish(
			&mut finish_response,
			&request,
			&CallbackQuery::new(Some(state), Some("valid-code".into())),
		)
		.await
		.expect("Finishing the handshake should succeed.");

	token_mock.assert_async().await;
	profile_mock.assert_async().await;

	assert_eq!(result.provider, PROVIDER);
	assert_eq!(result.redirect_url, "/dashboard");
	assert_eq!(result.profile.id, hash_id(&format!("{PROVIDER}_123")));
	assert_eq!(result.profile.subject, "123");
	assert_eq!(result.profile.name, "Ada Lovelace");
	assert_eq!(result.profile.email, "ada@example.com");
	assert_eq!(result.token.access_token, "access-success");
	assert_eq!(result.token.refresh_token.as_deref(), Some("refresh-success"));
	assert!(result.token.expires_at.is_some());

	// The spent transient state is cleared alongside the success.
	let follow_up = echo_cookies(&finish_response);
	let cookie_store = test_cookie_store();

	assert_eq!(
		cookie_store.get(&follow_up, "auth_token").expect("Reading cookies should succeed."),
		None,
	);
}

#[tokio::test]
async fn full_login_lifecycle_persists_and_ends_a_session() {
	let server = MockServer::start_async().await;
	let service = build_service(&server);
	let authenticator =
		service.authenticator(PROVIDER).expect("The registered provider should resolve.");
	let mut begin_response = HeaderMap::new();
	let authorize_url = authenticator
		.begin(&mut begin_response, &AuthConfig::redirect_to("/home"))
		.expect("Beginning the handshake should succeed.");
	let state = state_from_authorize_url(&authorize_url);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"access-1\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"sub\":\"123\"}");
		})
		.await;

	let callback_request = echo_cookies(&begin_response);
	let mut callback_response = HeaderMap::new();
	let result = authenticator
		.finish(
			&mut callback_response,
			&callback_request,
			&CallbackQuery::new(Some(state), Some("valid-code".into())),
		)
		.await
		.expect("Finishing the handshake should succeed.");
	let (control, _) = test_session_control();
	let sid = control
		.set(&mut callback_response, &result)
		.await
		.expect("Persisting the session should succeed.");

	assert_eq!(sid.len(), 64);

	let request = echo_cookies(&callback_response);
	let loaded: AuthResult =
		control.get(&request).await.expect("Loading the session should succeed.");

	assert_eq!(loaded, result);
	assert!(control.exists(&request).await.expect("Probing the session should succeed."));

	let mut logout_response = HeaderMap::new();

	control
		.del(&mut logout_response, &request)
		.await
		.expect("Ending the session should succeed.");

	let request = echo_cookies(&logout_response);

	assert!(matches!(control.get(&request).await, Err(Error::Unauthenticated)));
}

#[tokio::test]
async fn finish_without_state_is_rejected() {
	let server = MockServer::start_async().await;
	let service = build_service(&server);
	let authenticator =
		service.authenticator(PROVIDER).expect("The registered provider should resolve.");
	let mut response = HeaderMap::new();
	let err = authenticator
		.finish(&mut response, &HeaderMap::new(), &CallbackQuery::new(None, Some("code".into())))
		.await
		.expect_err("A callback without state should be rejected.");

	assert!(matches!(err, Error::StateMissing));
}

#[tokio::test]
async fn finish_with_mismatched_state_is_a_csrf_signal() {
	let server = MockServer::start_async().await;
	let service = build_service(&server);
	let authenticator =
		service.authenticator(PROVIDER).expect("The registered provider should resolve.");
	let mut begin_response = HeaderMap::new();

	authenticator
		.begin(&mut begin_response, &AuthConfig::redirect_to("/"))
		.expect("Beginning the handshake should succeed.");

	let request = echo_cookies(&begin_response);
	let mut finish_response = HeaderMap::new();
	let err = authenticator
		.finish(
			&mut finish_response,
			&request,
			&CallbackQuery::new(Some("attacker-state".into()), Some("code".into())),
		)
		.await
		.expect_err("A mismatched state should be rejected.");

	assert!(matches!(err, Error::UnexpectedState));
	// The transient state survives a rejected callback; only a matched one spends it.
	assert_eq!(finish_response.get(SET_COOKIE), None);
}

#[tokio::test]
async fn finish_without_code_is_a_bad_request() {
	let server = MockServer::start_async().await;
	let service = build_service(&server);
	let authenticator =
		service.authenticator(PROVIDER).expect("The registered provider should resolve.");
	let mut begin_response = HeaderMap::new();
	let authorize_url = authenticator
		.begin(&mut begin_response, &AuthConfig::redirect_to("/"))
		.expect("Beginning the handshake should succeed.");
	let state = state_from_authorize_url(&authorize_url);
	let request = echo_cookies(&begin_response);
	let mut finish_response = HeaderMap::new();
	let err = authenticator
		.finish(&mut finish_response, &request, &CallbackQuery::new(Some(state), None))
		.await
		.expect_err("A callback without a code should be rejected.");

	assert!(matches!(err, Error::BadRequest { .. }));
	assert_eq!(err.severity(), oauth2_gatehouse::error::Severity::BadRequest);
}

#[tokio::test]
async fn failed_exchanges_are_classified() {
	let server = MockServer::start_async().await;
	let service = build_service(&server);
	let authenticator =
		service.authenticator(PROVIDER).expect("The registered provider should resolve.");
	let mut begin_response = HeaderMap::new();
	let authorize_url = authenticator
		.begin(&mut begin_response, &AuthConfig::redirect_to("/"))
		.expect("Beginning the handshake should succeed.");
	let state = state_from_authorize_url(&authorize_url);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"code already used\"}");
		})
		.await;
	let request = echo_cookies(&begin_response);
	let mut finish_response = HeaderMap::new();
	let err = authenticator
		.finish(
			&mut finish_response,
			&request,
			&CallbackQuery::new(Some(state), Some("stale-code".into())),
		)
		.await
		.expect_err("A rejected exchange should fail the handshake.");

	mock.assert_async().await;

	assert!(matches!(err, Error::ExchangeFailed { .. }));
}

#[tokio::test]
async fn failed_profile_fetches_are_classified() {
	let server = MockServer::start_async().await;
	let service = build_service(&server);
	let authenticator =
		service.authenticator(PROVIDER).expect("The registered provider should resolve.");
	let mut begin_response = HeaderMap::new();
	let authorize_url = authenticator
		.begin(&mut begin_response, &AuthConfig::redirect_to("/"))
		.expect("Beginning the handshake should succeed.");
	let state = state_from_authorize_url(&authorize_url);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"access-1\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo");
			then.status(500).body("upstream exploded");
		})
		.await;

	let request = echo_cookies(&begin_response);
	let mut finish_response = HeaderMap::new();
	let err = authenticator
		.finish(
			&mut finish_response,
			&request,
			&CallbackQuery::new(Some(state), Some("valid-code".into())),
		)
		.await
		.expect_err("A failing profile endpoint should fail the handshake.");

	assert!(matches!(err, Error::ProfileFetchFailed { .. }));
}

#[tokio::test]
async fn unmappable_profiles_are_classified() {
	let server = MockServer::start_async().await;
	let service = build_service(&server);
	let authenticator =
		service.authenticator(PROVIDER).expect("The registered provider should resolve.");
	let mut begin_response = HeaderMap::new();
	let authorize_url = authenticator
		.begin(&mut begin_response, &AuthConfig::redirect_to("/"))
		.expect("Beginning the handshake should succeed.");
	let state = state_from_authorize_url(&authorize_url);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"access-1\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	// The document parses but lacks the subject the mapper requires.
	server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"name\":\"No Subject\"}");
		})
		.await;

	let request = echo_cookies(&begin_response);
	let mut finish_response = HeaderMap::new();
	let err = authenticator
		.finish(
			&mut finish_response,
			&request,
			&CallbackQuery::new(Some(state), Some("valid-code".into())),
		)
		.await
		.expect_err("An unmappable profile should fail the handshake.");

	assert!(matches!(err, Error::ProfileMapFailed { .. }));
}
