use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A write credential; only the sha256 of the secret is stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    pub name: String,
    pub access_key: String,
    #[serde(default)]
    pub description: String,
}

impl ApiToken {
    /// Builds a token record and returns it with the one-time secret
    pub fn issue(name: &str, description: &str) -> (Self, String) {
        let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let token = Self {
            name: name.to_string(),
            access_key: hash_secret(&secret),
            description: description.to_string(),
        };
        (token, secret)
    }
}

pub fn hash_secret(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}
