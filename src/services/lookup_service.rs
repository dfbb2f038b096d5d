use serde_json::{Map, Value};

use crate::database::{ContentStore, StoreError};
use crate::filter::{FilterCondition, FilterExpr, FilterOp, FilterOrderInfo, FindQuery, Status};
use crate::models::page::normalize_path;
use crate::models::Collection;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Domain is required")]
    MissingDomain,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Application is inactive")]
    Inactive,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read-only resolution of sites by domain and pages by path
pub struct LookupService<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> LookupService<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// The active application for `domain` with its published pages and
    /// their visible blocks.
    pub async fn find_by_domain(&self, domain: &str) -> Result<Map<String, Value>, LookupError> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(LookupError::MissingDomain);
        }

        let mut application = self
            .application_by_domain(domain)
            .await?
            .ok_or(LookupError::NotFound("Application"))?;
        if !is_active(&application) {
            return Err(LookupError::Inactive);
        }

        let app_id = record_id(&application)?;
        let query = FindQuery::new(Status::Published)
            .where_eq(&["application", "id"], app_id)
            .sort_by(FilterOrderInfo::asc("navigationOrder"));
        let mut pages = self.store.find(Collection::Pages, &query).await?;
        for page in pages.iter_mut() {
            self.attach_blocks(page).await?;
        }

        application.remove("apiKey");
        application.insert(
            "pages".into(),
            Value::Array(pages.into_iter().map(Value::Object).collect()),
        );
        Ok(application)
    }

    /// The published page at `path` on the active application for `domain`
    pub async fn find_page_by_path(&self, domain: &str, path: &str) -> Result<Map<String, Value>, LookupError> {
        let application = self
            .application_by_domain(domain.trim())
            .await?
            .filter(is_active)
            .ok_or(LookupError::NotFound("Application"))?;
        let app_id = record_id(&application)?;

        let query = FindQuery::new(Status::Published)
            .where_eq(&["application", "id"], app_id)
            .where_eq(&["path"], normalize_path(path))
            .limit(1);
        let mut page = self
            .store
            .find(Collection::Pages, &query)
            .await?
            .into_iter()
            .next()
            .ok_or(LookupError::NotFound("Page"))?;
        self.attach_blocks(&mut page).await?;

        let mut projection = Map::new();
        for key in ["id", "name", "globalStyles", "settings"] {
            projection.insert(key.into(), application.get(key).cloned().unwrap_or(Value::Null));
        }

        let mut out = Map::new();
        out.insert("application".into(), Value::Object(projection));
        out.insert("page".into(), Value::Object(page));
        Ok(out)
    }

    async fn application_by_domain(&self, domain: &str) -> Result<Option<Map<String, Value>>, LookupError> {
        if domain.is_empty() {
            return Ok(None);
        }
        let query = FindQuery::new(Status::Draft).where_eq(&["domain"], domain).limit(1);
        Ok(self.store.find(Collection::Applications, &query).await?.into_iter().next())
    }

    async fn attach_blocks(&self, page: &mut Map<String, Value>) -> Result<(), LookupError> {
        let page_id = record_id(page)?;
        let hidden = FilterExpr::Condition(FilterCondition {
            path: vec!["visible".into()],
            operator: FilterOp::Ne,
            data: Value::Bool(false),
        });
        let query = FindQuery::new(Status::Published)
            .where_eq(&["page", "id"], page_id)
            .filter(hidden)
            .sort_by(FilterOrderInfo::asc("order"));
        let blocks = self.store.find(Collection::ContentBlocks, &query).await?;
        page.insert(
            "contentBlocks".into(),
            Value::Array(blocks.into_iter().map(Value::Object).collect()),
        );
        Ok(())
    }
}

fn is_active(application: &Map<String, Value>) -> bool {
    application.get("active").and_then(Value::as_bool).unwrap_or(true)
}

fn record_id(record: &Map<String, Value>) -> Result<i64, LookupError> {
    record
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| LookupError::Store(StoreError::InvalidDocument("record without id".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    async fn site(store: &MemoryStore, active: bool) -> i64 {
        let app = store
            .create(
                Collection::Applications,
                obj(json!({ "name": "Example", "domain": "example.com", "active": active, "apiKey": "ak_x" })),
            )
            .await
            .unwrap();
        let page = store
            .create(
                Collection::Pages,
                obj(json!({ "title": "Home", "slug": "home", "path": "/", "application": app.id })),
            )
            .await
            .unwrap();
        for (order, kind, visible) in [(2, "footer", true), (1, "hero", true), (3, "banner", false)] {
            store
                .create(
                    Collection::ContentBlocks,
                    obj(json!({ "blockType": kind, "order": order, "visible": visible, "page": page.id })),
                )
                .await
                .unwrap();
        }
        page.id
    }

    #[tokio::test]
    async fn unpublished_pages_are_not_listed() {
        let store = MemoryStore::new();
        site(&store, true).await;
        let app = LookupService::new(&store).find_by_domain("example.com").await.unwrap();

        assert_eq!(app["name"], json!("Example"));
        assert_eq!(app["pages"], json!([]));
        assert!(!app.contains_key("apiKey"));
    }

    #[tokio::test]
    async fn published_page_carries_visible_blocks_in_order() {
        let store = MemoryStore::new();
        let page_id = site(&store, true).await;
        store.publish(Collection::Pages, page_id).await.unwrap();

        let app = LookupService::new(&store).find_by_domain("example.com").await.unwrap();
        let blocks = app["pages"][0]["contentBlocks"].as_array().unwrap();
        let kinds: Vec<_> = blocks.iter().map(|b| b["blockType"].clone()).collect();
        assert_eq!(kinds, vec![json!("hero"), json!("footer")]);
    }

    #[tokio::test]
    async fn inactive_application_is_forbidden() {
        let store = MemoryStore::new();
        site(&store, false).await;
        let service = LookupService::new(&store);
        assert!(matches!(service.find_by_domain("example.com").await, Err(LookupError::Inactive)));
        assert!(matches!(
            service.find_page_by_path("example.com", "/").await,
            Err(LookupError::NotFound("Application"))
        ));
    }

    #[tokio::test]
    async fn blank_domain_is_rejected_and_unknown_is_not_found() {
        let store = MemoryStore::new();
        let service = LookupService::new(&store);
        assert!(matches!(service.find_by_domain("  ").await, Err(LookupError::MissingDomain)));
        assert!(matches!(service.find_by_domain("nope.test").await, Err(LookupError::NotFound(_))));
    }

    #[tokio::test]
    async fn empty_path_resolves_like_root() {
        let store = MemoryStore::new();
        let page_id = site(&store, true).await;
        store.publish(Collection::Pages, page_id).await.unwrap();
        let service = LookupService::new(&store);

        let empty = service.find_page_by_path("example.com", "").await.unwrap();
        let root = service.find_page_by_path("example.com", "/").await.unwrap();
        assert_eq!(empty, root);
        assert_eq!(empty["page"]["id"], json!(page_id));
        assert_eq!(
            empty["application"].as_object().unwrap().keys().collect::<Vec<_>>(),
            vec!["globalStyles", "id", "name", "settings"]
        );
    }

    #[tokio::test]
    async fn page_lookup_sees_published_snapshot_only() {
        let store = MemoryStore::new();
        let page_id = site(&store, true).await;
        let service = LookupService::new(&store);
        assert!(matches!(
            service.find_page_by_path("example.com", "/").await,
            Err(LookupError::NotFound("Page"))
        ));

        store.publish(Collection::Pages, page_id).await.unwrap();
        store
            .update(Collection::Pages, page_id, obj(json!({ "path": "/moved" })))
            .await
            .unwrap();
        assert!(service.find_page_by_path("example.com", "/").await.is_ok());
        assert!(service.find_page_by_path("example.com", "moved").await.is_err());
    }
}
