use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Datasource record as returned by the storage backend.
///
/// Only `id` and `uid` carry meaning inside this workspace (they key the
/// lookup cache); every other field is passed through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Datasource {
    /// Numeric identifier, unique within the backend.
    pub id: i64,
    /// Opaque unique identifier. May be empty for legacy records.
    pub uid: String,
    pub org_id: i64,
    pub version: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub access: String,
    pub url: String,
    pub user: String,
    pub database: String,
    pub basic_auth: bool,
    pub basic_auth_user: String,
    pub with_credentials: bool,
    pub is_default: bool,
    /// Free-form plugin settings.
    pub json_data: Option<serde_json::Value>,
    /// Secret settings, decrypted by the backend. `null` reads as empty.
    #[serde(deserialize_with = "null_as_default")]
    pub secure_json_data: BTreeMap<String, String>,
    pub read_only: bool,
    /// RFC 3339 timestamp, kept opaque.
    pub created: String,
    /// RFC 3339 timestamp, kept opaque.
    pub updated: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
