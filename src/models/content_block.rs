use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::default_true;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    pub block_type: String,
    #[serde(default)]
    pub content: Map<String, Value>,
    #[serde(default)]
    pub styling: Map<String, Value>,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_true")]
    pub visible: bool,
    pub page: i64,
}
