//! Read-only reports over the store.

use serde::Serialize;
use serde_json::Value;

use super::error::{MaintenanceError, MaintenanceResult};
use crate::database::{count_all, find_records, ContentStore, DocumentState};
use crate::filter::{FilterOrderInfo, FindQuery, Status};
use crate::models::{Application, Collection, Page};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionCount {
    pub collection: String,
    pub drafts: u64,
    pub published: u64,
}

/// Drafts and published snapshots per collection
pub async fn count_documents(store: &dyn ContentStore) -> MaintenanceResult<Vec<CollectionCount>> {
    let mut counts = Vec::new();
    for collection in Collection::ALL {
        counts.push(CollectionCount {
            collection: collection.name().to_string(),
            drafts: count_all(store, collection).await?,
            published: store.count(collection, &FindQuery::new(Status::Published)).await?,
        });
    }
    Ok(counts)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub path: String,
    pub application: i64,
    /// `draft`, `published` or `modified` (published with newer draft edits)
    pub state: &'static str,
    pub block_count: u64,
}

/// Pages in id order, optionally restricted to one application's domain
pub async fn list_pages(store: &dyn ContentStore, domain: Option<&str>) -> MaintenanceResult<Vec<PageSummary>> {
    let mut query = FindQuery::new(Status::Draft).sort_by(FilterOrderInfo::asc("id"));
    if let Some(domain) = domain {
        let application_id = application_id_for(store, domain).await?;
        query = query.where_eq(&["application", "id"], application_id);
    }

    let pages = find_records::<Page>(store, Collection::Pages, &query).await?;
    let mut summaries = Vec::with_capacity(pages.len());
    for page in pages {
        let state = match store.find_by_id(Collection::Pages, page.id).await? {
            Some(doc) => match doc.state() {
                DocumentState::Draft => "draft",
                DocumentState::Published if doc.has_unpublished_changes() => "modified",
                DocumentState::Published => "published",
            },
            None => continue,
        };
        let blocks = FindQuery::new(Status::Draft).where_eq(&["page", "id"], page.id);
        summaries.push(PageSummary {
            id: page.id,
            block_count: store.count(Collection::ContentBlocks, &blocks).await?,
            title: page.attributes.title,
            slug: page.attributes.slug,
            path: page.attributes.path,
            application: page.attributes.application,
            state,
        });
    }
    Ok(summaries)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationSummary {
    pub id: i64,
    pub name: String,
    pub domain: String,
    pub active: bool,
    pub has_api_key: bool,
}

pub async fn list_applications(store: &dyn ContentStore) -> MaintenanceResult<Vec<ApplicationSummary>> {
    let query = FindQuery::new(Status::Draft).sort_by(FilterOrderInfo::asc("id"));
    let applications = find_records::<Application>(store, Collection::Applications, &query).await?;
    Ok(applications
        .into_iter()
        .map(|app| ApplicationSummary {
            id: app.id,
            has_api_key: app.attributes.api_key.as_deref().map(|k| !k.is_empty()).unwrap_or(false),
            name: app.attributes.name,
            domain: app.attributes.domain,
            active: app.attributes.active,
        })
        .collect())
}

async fn application_id_for(store: &dyn ContentStore, domain: &str) -> MaintenanceResult<i64> {
    let query = FindQuery::new(Status::Draft).where_eq(&["domain"], domain).limit(1);
    store
        .find(Collection::Applications, &query)
        .await?
        .first()
        .and_then(|app| app.get("id"))
        .and_then(Value::as_i64)
        .ok_or_else(|| MaintenanceError::UnknownDomain(domain.to_string()))
}
