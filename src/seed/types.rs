use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::ParseWarning;

/// Lower-cased `key: value` pairs from a metadata block
pub type Metadata = BTreeMap<String, String>;

/// A parsed seed file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedDocument {
    pub metadata: Metadata,
    pub global_styles: Map<String, Value>,
    pub settings: Map<String, Value>,
    pub pages: Vec<SeedPage>,
    /// Recoverable problems met while parsing
    #[serde(skip)]
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedPage {
    /// Name from the `### PAGE:` heading
    pub name: String,
    pub metadata: Metadata,
    pub blocks: Vec<SeedBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedBlock {
    /// `N` from the `**BLOCK N: name**` heading
    pub number: u32,
    pub name: String,
    pub metadata: Metadata,
    pub content: Map<String, Value>,
    pub styling: Map<String, Value>,
}

impl SeedDocument {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

impl SeedPage {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

impl SeedBlock {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}
