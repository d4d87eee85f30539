//! Canonical profiles and the raw provider document they are mapped from.

// crates.io
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Raw profile document returned by a provider's profile endpoint.
///
/// Providers disagree wildly about field names and types, so the document exposes
/// null-tolerant, coercing accessors for mappers to pick through instead of a typed schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument(Map<String, Value>);
impl ProfileDocument {
	/// Parses a raw JSON body into a document, reporting the path of the offending value on
	/// malformed input.
	pub fn parse(raw: &[u8]) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let mut deserializer = serde_json::Deserializer::from_slice(raw);

		serde_path_to_error::deserialize(&mut deserializer).map(Self)
	}

	/// Returns the raw value stored under `key`, if any.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	/// Returns the value under `key` coerced to a string, or an empty string when the key is
	/// absent, `null`, or holds a nested structure. JSON `null` values are treated as missing.
	pub fn string(&self, key: &str) -> String {
		match self.0.get(key) {
			Some(Value::String(value)) => value.clone(),
			Some(Value::Number(value)) => value.to_string(),
			Some(Value::Bool(value)) => value.to_string(),
			_ => String::new(),
		}
	}

	/// Returns the value under `key` as a boolean. Works with values stored as booleans or as
	/// strings that parse to booleans; anything else reads as `false`.
	pub fn bool(&self, key: &str) -> bool {
		match self.0.get(key) {
			Some(Value::Bool(value)) => *value,
			Some(Value::String(value)) => value.parse().unwrap_or(false),
			_ => false,
		}
	}

	/// Returns the value under `key` as a non-empty string or fails naming the missing field.
	pub fn require(&self, key: &'static str) -> Result<String, MissingProfileField> {
		let value = self.string(key);

		if value.is_empty() {
			return Err(MissingProfileField { field: key });
		}

		Ok(value)
	}
}
impl From<Map<String, Value>> for ProfileDocument {
	fn from(map: Map<String, Value>) -> Self {
		Self(map)
	}
}

/// Error raised by profile mappers when a required document field is absent or empty.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("The profile document is missing the `{field}` field.")]
pub struct MissingProfileField {
	/// Name of the absent field.
	pub field: &'static str,
}

/// Canonical identity produced by a provider's profile mapper.
///
/// `id` is the stable internal key: a one-way hash of the provider name and the
/// provider-native subject, so the same external identity always resolves to the same internal
/// identity while the native subject stays underivable from it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
	/// Deterministic one-way internal identifier.
	pub id: String,
	/// Provider-native subject identifier.
	pub subject: String,
	/// Display name.
	pub name: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Email address, when the provider discloses one.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub email: String,
	/// Avatar URL, when the provider discloses one.
	pub picture_url: String,
	/// Free-form attributes attached by mappers or application code.
	#[serde(default, skip_serializing_if = "Map::is_empty")]
	pub attributes: Map<String, Value>,
}
impl Profile {
	/// Attaches a string attribute.
	pub fn set_string_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.attributes.insert(key.into(), Value::String(value.into()));
	}

	/// Attaches a boolean attribute.
	pub fn set_bool_attr(&mut self, key: impl Into<String>, value: bool) {
		self.attributes.insert(key.into(), Value::Bool(value));
	}

	/// Reads a string attribute, or an empty string when absent or differently typed.
	pub fn string_attr(&self, key: &str) -> String {
		match self.attributes.get(key) {
			Some(Value::String(value)) => value.clone(),
			_ => String::new(),
		}
	}

	/// Reads a boolean attribute, or `false` when absent or differently typed.
	pub fn bool_attr(&self, key: &str) -> bool {
		matches!(self.attributes.get(key), Some(Value::Bool(true)))
	}
}
