use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::default_true;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default)]
    pub meta_title: String,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub meta_keywords: String,
    /// Shown in site navigation
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub navigation_order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,
    pub application: i64,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_template() -> String {
    "default".to_string()
}

/// Normalizes a request path: empty becomes `/`, a leading slash is added
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
