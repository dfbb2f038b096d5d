use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::{StoreError, StoreResult};
use crate::filter::Status;
use crate::models::{Collection, Record};

/// Fields owned by the store; never accepted from callers
const SYSTEM_FIELDS: [&str; 5] = ["id", "documentId", "createdAt", "updatedAt", "publishedAt"];

/// Lifecycle of a document.
///
/// A document starts as `Draft`. Only [`Document::publish`] moves it to
/// `Published`, freezing a snapshot of the draft; later updates change the
/// draft alone until the next publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Draft,
    Published,
}

/// A stored record with its mutable draft and optional published snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: i64,
    pub document_id: Uuid,
    pub collection: Collection,
    pub draft: Map<String, Value>,
    pub published: Option<Map<String, Value>>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Collections without draft/publish are live from creation
    pub fn new(id: i64, collection: Collection, data: Map<String, Value>, now: DateTime<Utc>) -> Self {
        let (published, published_at) = if collection.has_draft_and_publish() {
            (None, None)
        } else {
            (Some(data.clone()), Some(now))
        };
        Self {
            id,
            document_id: Uuid::new_v4(),
            collection,
            draft: data,
            published,
            published_at,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> DocumentState {
        match self.published {
            Some(_) => DocumentState::Published,
            None => DocumentState::Draft,
        }
    }

    pub fn has_unpublished_changes(&self) -> bool {
        self.published.as_ref() != Some(&self.draft)
    }

    pub fn variant(&self, status: Status) -> Option<&Map<String, Value>> {
        match status {
            Status::Draft => Some(&self.draft),
            Status::Published => self.published.as_ref(),
        }
    }

    /// Merges `patch` into the draft
    pub fn apply_update(&mut self, patch: Map<String, Value>, now: DateTime<Utc>) -> StoreResult<()> {
        for field in self.collection.immutable_fields() {
            if let Some(new_value) = patch.get(*field) {
                if self.draft.get(*field) != Some(new_value) {
                    return Err(StoreError::InvalidDocument(format!(
                        "'{}' cannot be changed after creation",
                        field
                    )));
                }
            }
        }

        for (key, value) in patch {
            self.draft.insert(key, value);
        }
        check_required(self.collection, &self.draft)?;

        if !self.collection.has_draft_and_publish() {
            self.published = Some(self.draft.clone());
        }
        self.updated_at = now;
        Ok(())
    }

    /// Draft -> Published: snapshot the draft as the externally visible variant
    pub fn publish(&mut self, now: DateTime<Utc>) -> StoreResult<()> {
        if !self.collection.has_draft_and_publish() {
            return Err(StoreError::InvalidTransition(format!(
                "{} has no draft/publish lifecycle",
                self.collection
            )));
        }
        self.published = Some(self.draft.clone());
        self.published_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// The flattened API form of one variant: `{ id, documentId, ...fields, createdAt, updatedAt, publishedAt }`
    pub fn to_json(&self, status: Status) -> Option<Map<String, Value>> {
        let data = self.variant(status)?;
        let mut out = Map::new();
        out.insert("id".into(), Value::from(self.id));
        out.insert("documentId".into(), Value::String(self.document_id.to_string()));
        for (k, v) in data {
            out.insert(k.clone(), v.clone());
        }
        out.insert("createdAt".into(), Value::String(self.created_at.to_rfc3339()));
        out.insert("updatedAt".into(), Value::String(self.updated_at.to_rfc3339()));
        let published_at = match (status, self.published_at) {
            (Status::Published, Some(at)) => Value::String(at.to_rfc3339()),
            _ => Value::Null,
        };
        out.insert("publishedAt".into(), published_at);
        Some(out)
    }

    pub fn decode<T: DeserializeOwned>(&self, status: Status) -> StoreResult<Option<Record<T>>> {
        match self.to_json(status) {
            Some(map) => Ok(Some(serde_json::from_value(Value::Object(map))?)),
            None => Ok(None),
        }
    }

    /// Textual unique key of the draft, or `None` when any part is absent
    pub fn unique_key(&self) -> Option<Vec<String>> {
        unique_key(self.collection, &self.draft)
    }
}

pub fn unique_key(collection: Collection, data: &Map<String, Value>) -> Option<Vec<String>> {
    let fields = collection.unique_fields();
    if fields.is_empty() {
        return None;
    }
    fields
        .iter()
        .map(|f| crate::filter::matcher::scalar_text(data.get(*f)?))
        .collect()
}

/// Cleans caller-supplied data: drops system fields and normalizes relation
/// references (`5`, `"5"` or `{ "id": 5 }`) to numeric ids.
pub fn prepare_data(collection: Collection, mut data: Map<String, Value>) -> StoreResult<Map<String, Value>> {
    for field in SYSTEM_FIELDS {
        data.remove(field);
    }

    for field in collection.relation_fields() {
        let Some(raw) = data.get(*field) else { continue };
        let id = match raw {
            Value::Null => continue,
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Object(obj) => obj.get("id").and_then(|v| match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            }),
            _ => None,
        }
        .ok_or_else(|| StoreError::InvalidDocument(format!("'{}' must reference an id", field)))?;
        data.insert(field.to_string(), Value::from(id));
    }

    Ok(data)
}

pub fn check_required(collection: Collection, data: &Map<String, Value>) -> StoreResult<()> {
    for field in collection.required_fields() {
        let present = match data.get(*field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(StoreError::InvalidDocument(format!("'{}' is required", field)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn page(now: DateTime<Utc>) -> Document {
        Document::new(
            1,
            Collection::Pages,
            obj(json!({ "title": "Home", "slug": "home", "application": 3 })),
            now,
        )
    }

    #[test]
    fn new_page_is_draft_until_published() {
        let now = Utc::now();
        let mut doc = page(now);
        assert_eq!(doc.state(), DocumentState::Draft);
        assert!(doc.to_json(Status::Published).is_none());

        doc.publish(now).unwrap();
        assert_eq!(doc.state(), DocumentState::Published);
        assert!(!doc.has_unpublished_changes());
        assert_eq!(doc.to_json(Status::Published).unwrap()["slug"], json!("home"));
    }

    #[test]
    fn updates_touch_only_the_draft() {
        let now = Utc::now();
        let mut doc = page(now);
        doc.publish(now).unwrap();
        doc.apply_update(obj(json!({ "title": "Start" })), now).unwrap();

        assert!(doc.has_unpublished_changes());
        assert_eq!(doc.variant(Status::Published).unwrap()["title"], json!("Home"));
        assert_eq!(doc.variant(Status::Draft).unwrap()["title"], json!("Start"));
    }

    #[test]
    fn application_reference_is_immutable() {
        let now = Utc::now();
        let mut doc = page(now);
        assert!(doc.apply_update(obj(json!({ "application": 3 })), now).is_ok());
        assert!(matches!(
            doc.apply_update(obj(json!({ "application": 4 })), now),
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn blocks_are_live_and_cannot_be_published() {
        let now = Utc::now();
        let mut block = Document::new(
            2,
            Collection::ContentBlocks,
            obj(json!({ "blockType": "hero", "page": 1 })),
            now,
        );
        assert!(block.to_json(Status::Published).is_some());
        assert!(matches!(block.publish(now), Err(StoreError::InvalidTransition(_))));
    }

    #[test]
    fn prepare_data_strips_system_fields_and_normalizes_relations() {
        let data = prepare_data(
            Collection::Pages,
            obj(json!({ "id": 9, "publishedAt": "x", "title": "A", "application": { "id": "12" } })),
        )
        .unwrap();
        assert!(!data.contains_key("id"));
        assert!(!data.contains_key("publishedAt"));
        assert_eq!(data["application"], json!(12));

        assert!(prepare_data(Collection::Pages, obj(json!({ "application": "abc" }))).is_err());
    }

    #[test]
    fn unique_key_requires_every_part() {
        let data = obj(json!({ "slug": "home" }));
        assert_eq!(unique_key(Collection::Pages, &data), None);
        let data = obj(json!({ "slug": "home", "application": 3 }));
        assert_eq!(unique_key(Collection::Pages, &data), Some(vec!["3".into(), "home".into()]));
    }
}
