use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::default_true;

/// A tenant: one customer site and its global configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub subdomain: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub global_styles: Map<String, Value>,
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<Value>,
}

/// Generates a fresh application API key (`ak_` + 64 hex chars)
pub fn generate_api_key() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    format!("ak_{:x}", hasher.finalize())
}
