use tracing::{error, info};

use super::api::{ContentApi, CreateOutcome};
use super::error::PopulateError;
use super::payload::{application_payload, block_payload, page_payload};
use crate::filter::matcher::scalar_text;
use crate::models::Collection;
use crate::seed::{SeedDocument, SeedPage};

/// Outcome of one populate run
#[derive(Debug, Default)]
pub struct PopulateReport {
    pub application_id: i64,
    pub application_reused: bool,
    /// Page title to id, in creation order
    pub pages: Vec<(String, i64)>,
    pub pages_reused: usize,
    pub blocks_created: usize,
    pub blocks_reused: usize,
    /// Pages that failed, with the error that stopped them
    pub failures: Vec<(String, PopulateError)>,
    pub dry_run: bool,
}

impl PopulateReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Materialises a seed document through a [`ContentApi`]:
/// application, then each page followed by its blocks.
pub struct Populator<'a> {
    api: &'a dyn ContentApi,
    publish: bool,
}

impl<'a> Populator<'a> {
    pub fn new(api: &'a dyn ContentApi) -> Self {
        Self { api, publish: false }
    }

    pub fn with_publish(mut self, publish: bool) -> Self {
        self.publish = publish;
        self
    }

    /// A failed application aborts the run; a failed page skips its
    /// remaining blocks and is recorded in the report.
    pub async fn run(&self, doc: &SeedDocument) -> Result<PopulateReport, PopulateError> {
        let mut report = PopulateReport {
            dry_run: self.api.is_dry_run(),
            ..Default::default()
        };

        let (application_id, reused) = self.ensure_application(doc).await?;
        report.application_id = application_id;
        report.application_reused = reused;

        for page in &doc.pages {
            let title = page.meta("title").unwrap_or("Untitled Page").to_string();
            match self.populate_page(page, application_id, &mut report).await {
                Ok(page_id) => report.pages.push((title, page_id)),
                Err(e) => {
                    error!("Page '{}' failed: {}", title, e);
                    report.failures.push((title, e));
                }
            }
        }

        if self.publish {
            self.api.publish(Collection::Applications, application_id).await?;
        }

        info!(
            "Populated application {} with {} pages and {} blocks",
            application_id,
            report.pages.len(),
            report.blocks_created
        );
        Ok(report)
    }

    async fn ensure_application(&self, doc: &SeedDocument) -> Result<(i64, bool), PopulateError> {
        let data = application_payload(doc);
        let domain = doc.meta("domain").unwrap_or("").to_string();

        match self.api.create(Collection::Applications, &data).await? {
            CreateOutcome::Created(id) => {
                info!("Created application {} ({})", id, domain);
                Ok((id, false))
            }
            CreateOutcome::Conflict => {
                let id = self
                    .api
                    .find_id(Collection::Applications, &[("domain", domain.clone())])
                    .await?
                    .ok_or_else(|| PopulateError::NotFoundAfterConflict {
                        collection: Collection::Applications,
                        key: format!("domain={}", domain),
                    })?;
                info!("Application for {} already exists, reusing {}", domain, id);
                Ok((id, true))
            }
        }
    }

    async fn populate_page(
        &self,
        page: &SeedPage,
        application_id: i64,
        report: &mut PopulateReport,
    ) -> Result<i64, PopulateError> {
        let data = page_payload(page, application_id);
        let slug = page.meta("slug").unwrap_or("").to_string();

        let (page_id, reused) = match self.api.create(Collection::Pages, &data).await? {
            CreateOutcome::Created(id) => (id, false),
            CreateOutcome::Conflict => {
                let filters = [("slug", slug.clone()), ("application", application_id.to_string())];
                let id = self
                    .api
                    .find_id(Collection::Pages, &filters)
                    .await?
                    .ok_or_else(|| PopulateError::NotFoundAfterConflict {
                        collection: Collection::Pages,
                        key: format!("slug={}", slug),
                    })?;
                report.pages_reused += 1;
                (id, true)
            }
        };
        info!("Page '{}' -> {}{}", page.name, page_id, if reused { " (existing)" } else { "" });

        for block in &page.blocks {
            let data = block_payload(block, page_id);
            if reused && self.existing_block(page_id, &data).await?.is_some() {
                report.blocks_reused += 1;
                continue;
            }
            match self.api.create(Collection::ContentBlocks, &data).await? {
                CreateOutcome::Created(_) => report.blocks_created += 1,
                // Blocks carry no unique key
                CreateOutcome::Conflict => report.blocks_reused += 1,
            }
        }

        if self.publish {
            self.api.publish(Collection::Pages, page_id).await?;
        }
        Ok(page_id)
    }

    /// A block on an existing page with the same order and type
    async fn existing_block(
        &self,
        page_id: i64,
        data: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Option<i64>, PopulateError> {
        let field = |name: &str| data.get(name).and_then(scalar_text).unwrap_or_default();
        let filters = [
            ("page", page_id.to_string()),
            ("order", field("order")),
            ("blockType", field("blockType")),
        ];
        self.api.find_id(Collection::ContentBlocks, &filters).await
    }
}
