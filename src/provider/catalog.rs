//! Built-in vendor adapters. Each function yields a [`ProviderBlueprint`] binding the vendor's
//! endpoint catalog to a profile mapper for that vendor's document shape.

// self
use crate::{
	_prelude::*,
	auth::{Profile, hash_id},
	provider::{ProviderBlueprint, ProviderEndpoints},
};

/// Google OAuth 2.0 blueprint against the OpenID Connect userinfo endpoint.
pub fn google() -> Result<ProviderBlueprint, url::ParseError> {
	const NAME: &str = "google";

	let endpoints = ProviderEndpoints {
		authorize: Url::parse("https://accounts.google.com/o/oauth2/v2/auth")?,
		token: Url::parse("https://oauth2.googleapis.com/token")?,
		profile: Url::parse("https://www.googleapis.com/oauth2/v3/userinfo")?,
		scopes: vec!["email".into(), "https://www.googleapis.com/auth/userinfo.profile".into()],
	};

	Ok(ProviderBlueprint::new(
		NAME,
		endpoints,
		Arc::new(|document, _| {
			let subject = document.require("sub")?;

			Ok(Profile {
				id: hash_id(&format!("{NAME}_{subject}")),
				subject,
				name: document.string("name"),
				first_name: document.string("given_name"),
				last_name: document.string("family_name"),
				email: document.string("email"),
				picture_url: document.string("picture"),
				..Default::default()
			})
		}),
	))
}

/// Microsoft identity platform (v2.0) blueprint against the Graph `me` endpoint.
pub fn microsoft() -> Result<ProviderBlueprint, url::ParseError> {
	const NAME: &str = "microsoft";

	let endpoints = ProviderEndpoints {
		authorize: Url::parse(
			"https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
		)?,
		token: Url::parse("https://login.microsoftonline.com/common/oauth2/v2.0/token")?,
		profile: Url::parse("https://graph.microsoft.com/v1.0/me")?,
		scopes: vec!["User.Read".into()],
	};

	Ok(ProviderBlueprint::new(
		NAME,
		endpoints,
		Arc::new(|document, _| {
			let subject = document.require("id")?;
			// Graph only fills `mail` for mailbox-backed accounts; the UPN is the usual
			// fallback address.
			let email = match document.string("mail") {
				value if value.is_empty() => document.string("userPrincipalName"),
				value => value,
			};

			Ok(Profile {
				id: hash_id(&format!("{NAME}_{subject}")),
				subject,
				name: document.string("displayName"),
				first_name: document.string("givenName"),
				last_name: document.string("surname"),
				email,
				..Default::default()
			})
		}),
	))
}
