use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::NO_CONFIGURATION_MESSAGE;

/// A result field that distinguishes "not known yet" from "known to be absent".
///
/// Serialized, `Unpopulated` is omitted and `Absent` is `null`.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot<T> {
    /// Nothing has populated this value yet.
    Unpopulated,
    /// The value is explicitly absent.
    Absent,
    Present(T),
}

impl<T> Slot<T> {
    pub fn is_unpopulated(&self) -> bool {
        matches!(self, Slot::Unpopulated)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Slot::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Slot::Present(v) => Some(v),
            _ => None,
        }
    }

    /// `Some` becomes `Present`, `None` stays `Unpopulated`.
    pub fn from_store(value: Option<T>) -> Self {
        value.map_or(Slot::Unpopulated, Slot::Present)
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Unpopulated
    }
}

impl<T: Serialize> Serialize for Slot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Slot::Present(v) => v.serialize(serializer),
            Slot::Unpopulated | Slot::Absent => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Slot<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A missing field never reaches this point: `#[serde(default)]` on the
        // field yields `Unpopulated`.
        Ok(Option::<T>::deserialize(deserializer)?.map_or(Slot::Absent, Slot::Present))
    }
}

/// Outcome of an authentication check for one configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub config_id: Option<String>,
    #[serde(default, skip_serializing_if = "Slot::is_unpopulated")]
    pub id_token: Slot<String>,
    #[serde(default, skip_serializing_if = "Slot::is_unpopulated")]
    pub access_token: Slot<String>,
    #[serde(default, skip_serializing_if = "Slot::is_unpopulated")]
    pub user_data: Slot<Value>,
}

impl LoginResponse {
    /// Negative result for an empty configuration set.
    pub fn no_configuration() -> Self {
        Self {
            is_authenticated: false,
            error_message: Some(NO_CONFIGURATION_MESSAGE.to_string()),
            config_id: None,
            id_token: Slot::Absent,
            access_token: Slot::Absent,
            user_data: Slot::Absent,
        }
    }

    /// Negative result carrying a failure message for `config_id`.
    pub fn failed(config_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            is_authenticated: false,
            error_message: Some(message.into()),
            config_id: Some(config_id.into()),
            id_token: Slot::Absent,
            access_token: Slot::Absent,
            user_data: Slot::Absent,
        }
    }
}

/// Authentication flag of one configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigAuthenticatedResult {
    pub config_id: String,
    pub is_authenticated: bool,
}

/// Aggregated authentication state over a configuration set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedResult {
    pub is_authenticated: bool,
    pub all_configs_authenticated: Vec<ConfigAuthenticatedResult>,
}

/// Why the auth state changed, published with `NewAuthenticationResult`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStateResult {
    pub is_authenticated: bool,
    pub validation_result: String,
    pub is_renew_process: bool,
}
