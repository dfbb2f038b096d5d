use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres};
use tracing::{debug, info};
use uuid::Uuid;

use super::document::{check_required, prepare_data, Document};
use super::error::{StoreError, StoreResult};
use super::store::{check_relations, ContentStore};
use crate::filter::sql::{FilterSql, SqlParam};
use crate::filter::{FindQuery, Status};
use crate::models::Collection;

const CREATE_DOCUMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id BIGSERIAL PRIMARY KEY,
    document_id UUID NOT NULL UNIQUE,
    collection TEXT NOT NULL,
    draft JSONB NOT NULL,
    published JSONB,
    published_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)"#;

const CREATE_COLLECTION_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents (collection)";

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: i64,
    document_id: Uuid,
    collection: String,
    draft: Json<Map<String, Value>>,
    published: Option<Json<Map<String, Value>>>,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let collection = Collection::from_name(&row.collection)
            .ok_or_else(|| StoreError::InvalidDocument(format!("unknown collection '{}'", row.collection)))?;
        Ok(Document {
            id: row.id,
            document_id: row.document_id,
            collection,
            draft: row.draft.0,
            published: row.published.map(|p| p.0),
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

type BoundQuery<'q, O> = sqlx::query::QueryAs<'q, Postgres, O, PgArguments>;

fn bind_params<'q, O>(mut q: BoundQuery<'q, O>, params: Vec<SqlParam>) -> BoundQuery<'q, O> {
    for param in params {
        q = match param {
            SqlParam::Text(s) => q.bind(s),
            SqlParam::TextArray(values) => q.bind(values),
        };
    }
    q
}

/// Unique violations surface as conflicts; everything else passes through
fn map_write_error(collection: Collection, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            return StoreError::conflict(collection);
        }
    }
    StoreError::Sqlx(err)
}

fn variant_column(status: Status) -> &'static str {
    match status {
        Status::Draft => "draft",
        Status::Published => "published",
    }
}

/// Postgres-backed store keeping every collection in one `documents` table
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32, timeout_secs: u64) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(timeout_secs))
            .connect(url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the documents table and one partial unique index per collection
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(CREATE_DOCUMENTS).execute(&self.pool).await?;
        sqlx::query(CREATE_COLLECTION_INDEX).execute(&self.pool).await?;

        for collection in Collection::ALL {
            let fields = collection.unique_fields();
            if fields.is_empty() {
                continue;
            }
            let columns: Vec<String> = fields.iter().map(|f| format!("(draft ->> '{}')", f)).collect();
            let sql = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS documents_{}_unique ON documents ({}) WHERE collection = '{}'",
                collection.name().replace('-', "_"),
                columns.join(", "),
                collection.name(),
            );
            sqlx::query(&sql).execute(&self.pool).await?;
        }

        info!("Document schema ready");
        Ok(())
    }

    fn select_sql(&self, collection: Collection, query: &FindQuery, counting: bool) -> StoreResult<(String, Vec<SqlParam>)> {
        let column = variant_column(query.status);
        let mut builder = FilterSql::new(1);
        let predicate = builder.where_clause(&query.filters, collection, "d", column)?;

        let projection = if counting { "COUNT(*)" } else { "d.*" };
        let mut sql = format!(
            "SELECT {} FROM documents d WHERE d.collection = $1 AND d.{} IS NOT NULL AND ({})",
            projection, column, predicate
        );
        if !counting {
            sql.push(' ');
            sql.push_str(&builder.order_clause(&query.sort, "d", column));
            if let Some(limit) = query.limit {
                sql.push_str(&format!(" LIMIT {}", limit));
            }
            if query.offset > 0 {
                sql.push_str(&format!(" OFFSET {}", query.offset));
            }
        }

        debug!("Generated SQL: {}", sql);
        Ok((sql, builder.into_params()))
    }

    async fn fetch_for_update(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        collection: Collection,
        id: i64,
    ) -> StoreResult<Document> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT * FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection.name())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::not_found(collection, id))?;
        Document::try_from(row)
    }

    async fn write_back(tx: &mut sqlx::Transaction<'_, Postgres>, document: &Document) -> StoreResult<()> {
        sqlx::query(
            "UPDATE documents SET draft = $1, published = $2, published_at = $3, updated_at = $4 WHERE id = $5",
        )
        .bind(Json(&document.draft))
        .bind(document.published.as_ref().map(Json))
        .bind(document.published_at)
        .bind(document.updated_at)
        .bind(document.id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_write_error(document.collection, e))?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> StoreResult<Vec<Map<String, Value>>> {
        let (sql, params) = self.select_sql(collection, query, false)?;
        let q = sqlx::query_as::<_, DocumentRow>(&sql).bind(collection.name());
        let rows = bind_params(q, params).fetch_all(&self.pool).await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let document = Document::try_from(row)?;
            if let Some(record) = document.to_json(query.status) {
                results.push(record);
            }
        }
        Ok(results)
    }

    async fn count(&self, collection: Collection, query: &FindQuery) -> StoreResult<u64> {
        let (sql, params) = self.select_sql(collection, query, true)?;
        let q = sqlx::query_as::<_, (i64,)>(&sql).bind(collection.name());
        let (count,) = bind_params(q, params).fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: i64) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Document::try_from).transpose()
    }

    async fn create(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<Document> {
        let data = prepare_data(collection, data)?;
        check_required(collection, &data)?;
        check_relations(self, collection, &data).await?;

        let document = Document::new(0, collection, data, Utc::now());
        let row = sqlx::query_as::<_, DocumentRow>(
            "INSERT INTO documents (document_id, collection, draft, published, published_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(document.document_id)
        .bind(collection.name())
        .bind(Json(&document.draft))
        .bind(document.published.as_ref().map(Json))
        .bind(document.published_at)
        .bind(document.created_at)
        .bind(document.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(collection, e))?;

        Document::try_from(row)
    }

    async fn update(&self, collection: Collection, id: i64, patch: Map<String, Value>) -> StoreResult<Document> {
        let patch = prepare_data(collection, patch)?;
        check_relations(self, collection, &patch).await?;

        let mut tx = self.pool.begin().await?;
        let mut document = Self::fetch_for_update(&mut tx, collection, id).await?;
        document.apply_update(patch, Utc::now())?;
        Self::write_back(&mut tx, &document).await?;
        tx.commit().await?;
        Ok(document)
    }

    async fn publish(&self, collection: Collection, id: i64) -> StoreResult<Document> {
        let mut tx = self.pool.begin().await?;
        let mut document = Self::fetch_for_update(&mut tx, collection, id).await?;
        document.publish(Utc::now())?;
        Self::write_back(&mut tx, &document).await?;
        tx.commit().await?;
        Ok(document)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}
