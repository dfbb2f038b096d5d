//! Typed shapes for the known block types.
//!
//! Every shape keeps a flattened `extra` map so fields added by newer
//! front-ends pass through untouched; unknown block types fall back to
//! [`BlockPayload::Other`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("'{block_type}' content has the wrong shape: {source}")]
pub struct PayloadError {
    pub block_type: String,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichTextContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub items: Vec<FeatureItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToActionContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_link: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default)]
    pub links: Vec<LinkItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockPayload {
    Hero(HeroContent),
    RichText(RichTextContent),
    Features(FeaturesContent),
    CallToAction(CallToActionContent),
    Footer(FooterContent),
    Other { block_type: String, fields: Map<String, Value> },
}

impl BlockPayload {
    /// Interprets a block's content according to its type tag
    pub fn from_parts(block_type: &str, content: &Map<String, Value>) -> Result<Self, PayloadError> {
        let value = Value::Object(content.clone());
        let wrap = |source| PayloadError {
            block_type: block_type.to_string(),
            source,
        };

        let normalized = block_type.trim().to_ascii_lowercase().replace('_', "-");
        Ok(match normalized.as_str() {
            "hero" => BlockPayload::Hero(serde_json::from_value(value).map_err(wrap)?),
            "text" | "rich-text" | "richtext" => {
                BlockPayload::RichText(serde_json::from_value(value).map_err(wrap)?)
            }
            "features" => BlockPayload::Features(serde_json::from_value(value).map_err(wrap)?),
            "cta" | "call-to-action" => {
                BlockPayload::CallToAction(serde_json::from_value(value).map_err(wrap)?)
            }
            "footer" => BlockPayload::Footer(serde_json::from_value(value).map_err(wrap)?),
            _ => BlockPayload::Other {
                block_type: block_type.to_string(),
                fields: content.clone(),
            },
        })
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, BlockPayload::Other { .. })
    }

    /// Serializes back into the free-form content object
    pub fn to_content(&self) -> Map<String, Value> {
        let value = match self {
            BlockPayload::Hero(c) => serde_json::to_value(c),
            BlockPayload::RichText(c) => serde_json::to_value(c),
            BlockPayload::Features(c) => serde_json::to_value(c),
            BlockPayload::CallToAction(c) => serde_json::to_value(c),
            BlockPayload::Footer(c) => serde_json::to_value(c),
            BlockPayload::Other { fields, .. } => return fields.clone(),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn hero_keeps_unknown_fields() {
        let content = obj(json!({ "title": "Welcome", "ctaText": "Go", "badge": "new" }));
        let payload = BlockPayload::from_parts("hero", &content).unwrap();
        match &payload {
            BlockPayload::Hero(hero) => {
                assert_eq!(hero.title.as_deref(), Some("Welcome"));
                assert_eq!(hero.extra.get("badge"), Some(&json!("new")));
            }
            other => panic!("expected hero, got {:?}", other),
        }
        assert_eq!(payload.to_content(), content);
    }

    #[test]
    fn wrong_shape_is_reported() {
        let content = obj(json!({ "links": "not-a-list" }));
        let err = BlockPayload::from_parts("footer", &content).unwrap_err();
        assert_eq!(err.block_type, "footer");
    }

    #[test]
    fn unknown_type_falls_back_to_bag() {
        let content = obj(json!({ "anything": [1, 2] }));
        let payload = BlockPayload::from_parts("testimonial_carousel", &content).unwrap();
        assert!(!payload.is_known());
        assert_eq!(payload.to_content(), content);
    }
}
