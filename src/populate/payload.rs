//! Seed metadata to REST payload mapping.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::models::BlockPayload;
use crate::seed::{SeedBlock, SeedDocument, SeedPage};

/// `true` iff the text equals "true" ignoring case; absent means `default`
pub fn parse_flag(value: Option<&str>, default: bool) -> bool {
    value.map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(default)
}

fn text(value: Option<&str>, default: &str) -> Value {
    Value::String(value.unwrap_or(default).to_string())
}

pub fn application_payload(doc: &SeedDocument) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("name".into(), text(doc.meta("client_name"), "Unnamed Client"));
    data.insert("domain".into(), text(doc.meta("domain"), ""));
    data.insert("subdomain".into(), text(doc.meta("subdomain"), ""));
    data.insert("description".into(), text(doc.meta("description"), ""));
    data.insert("contactEmail".into(), text(doc.meta("contact_email"), ""));
    data.insert("active".into(), Value::Bool(parse_flag(doc.meta("active"), true)));
    data.insert("globalStyles".into(), Value::Object(doc.global_styles.clone()));
    data.insert("settings".into(), Value::Object(doc.settings.clone()));
    data
}

pub fn page_payload(page: &SeedPage, application_id: i64) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("title".into(), text(page.meta("title"), "Untitled Page"));
    data.insert("slug".into(), text(page.meta("slug"), ""));
    data.insert("path".into(), text(page.meta("path"), "/"));
    data.insert("template".into(), text(page.meta("template"), "default"));
    data.insert("metaTitle".into(), text(page.meta("meta_title"), ""));
    data.insert("metaDescription".into(), text(page.meta("meta_description"), ""));
    data.insert("metaKeywords".into(), text(page.meta("meta_keywords"), ""));
    data.insert("visible".into(), Value::Bool(parse_flag(page.meta("visible"), true)));
    if let Some(order) = page.meta("navigation_order") {
        data.insert("navigationOrder".into(), json!(order.parse::<i64>().unwrap_or(0)));
    }
    data.insert("application".into(), json!(application_id));
    data
}

pub fn block_payload(block: &SeedBlock, page_id: i64) -> Map<String, Value> {
    let block_type = block.meta("block_type").unwrap_or("unknown");
    check_shape(block_type, block);

    let mut data = Map::new();
    data.insert("blockType".into(), json!(block_type));
    data.insert(
        "order".into(),
        json!(block.meta("order").and_then(|o| o.parse::<i64>().ok()).unwrap_or(0)),
    );
    data.insert("visible".into(), Value::Bool(parse_flag(block.meta("visible"), true)));
    data.insert("content".into(), Value::Object(block.content.clone()));
    data.insert("styling".into(), Value::Object(block.styling.clone()));
    data.insert("page".into(), json!(page_id));
    data
}

/// Warn-only: the raw content is sent either way
fn check_shape(block_type: &str, block: &SeedBlock) {
    match BlockPayload::from_parts(block_type, &block.content) {
        Ok(payload) if !payload.is_known() => {
            debug!("Block {} '{}' has untyped block type '{}'", block.number, block.name, block_type)
        }
        Ok(_) => {}
        Err(e) => warn!("Block {} '{}': {}", block.number, block.name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::Metadata;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn application_defaults() {
        let data = application_payload(&SeedDocument::default());
        assert_eq!(data["name"], json!("Unnamed Client"));
        assert_eq!(data["active"], json!(true));
        assert_eq!(data["globalStyles"], json!({}));
    }

    #[test]
    fn application_maps_renamed_fields() {
        let doc = SeedDocument {
            metadata: meta(&[
                ("client_name", "Acme"),
                ("contact_email", "hi@acme.test"),
                ("active", "FALSE"),
            ]),
            ..Default::default()
        };
        let data = application_payload(&doc);
        assert_eq!(data["name"], json!("Acme"));
        assert_eq!(data["contactEmail"], json!("hi@acme.test"));
        assert_eq!(data["active"], json!(false));
    }

    #[test]
    fn page_defaults_and_relation() {
        let page = SeedPage {
            name: "Home".into(),
            metadata: meta(&[("slug", "home"), ("visible", "yes")]),
            blocks: vec![],
        };
        let data = page_payload(&page, 7);
        assert_eq!(data["title"], json!("Untitled Page"));
        assert_eq!(data["path"], json!("/"));
        assert_eq!(data["template"], json!("default"));
        assert_eq!(data["visible"], json!(false));
        assert_eq!(data["application"], json!(7));
        assert!(!data.contains_key("navigationOrder"));
    }

    #[test]
    fn block_order_falls_back_to_zero() {
        let block = SeedBlock {
            number: 1,
            name: "Hero".into(),
            metadata: meta(&[("block_type", "hero"), ("order", "first")]),
            ..Default::default()
        };
        let data = block_payload(&block, 3);
        assert_eq!(data["blockType"], json!("hero"));
        assert_eq!(data["order"], json!(0));
        assert_eq!(data["visible"], json!(true));
        assert_eq!(data["page"], json!(3));
    }

    #[test]
    fn block_type_defaults_to_unknown() {
        let data = block_payload(&SeedBlock::default(), 1);
        assert_eq!(data["blockType"], json!("unknown"));
        assert_eq!(data["content"], json!({}));
    }
}
