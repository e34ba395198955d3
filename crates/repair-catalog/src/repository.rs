use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use repair_common::cms::{CmsClient, ListQuery, ListResponse, MAX_LIST_LIMIT};

use crate::cache::CaseCache;
use crate::error::AppError;
use crate::model::{Category, RepairCase, Symptom};

const CASES_ENDPOINT: &str = "repair";
const CATEGORIES_ENDPOINT: &str = "categories";
const SYMPTOMS_ENDPOINT: &str = "symptoms";

/// Source of repair cases and facet vocabularies.
pub trait CaseRepository: Send + Sync + 'static {
    fn list_cases(&self) -> impl Future<Output = Result<Vec<RepairCase>, AppError>> + Send;

    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>, AppError>> + Send;

    fn list_symptoms(&self) -> impl Future<Output = Result<Vec<Symptom>, AppError>> + Send;

    /// `Ok(None)` when no case has this slug.
    fn get_case_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<RepairCase>, AppError>> + Send;

    /// Forgets anything cached so the next calls see fresh content.
    fn invalidate(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Repository backed by the microCMS content API, with an optional Redis page cache.
pub struct CmsRepository {
    client: CmsClient,
    cache: Arc<CaseCache>,
}

impl CmsRepository {
    pub fn new(client: CmsClient, cache: Arc<CaseCache>) -> Self {
        Self { client, cache }
    }

    async fn fetch_page<T>(&self, endpoint: &str, query: &ListQuery) -> Result<ListResponse<T>, AppError>
    where
        T: DeserializeOwned + Serialize,
    {
        if let Some(cached) = self.cache.get_page(endpoint, query).await {
            debug!(endpoint, offset = query.offset, "cms page cache hit");
            return Ok(cached);
        }
        let page = self.client.list(endpoint, query).await?;
        self.cache.set_page(endpoint, query, &page).await;
        Ok(page)
    }

    /// Pages through `endpoint` until `totalCount` entries have been read.
    async fn fetch_all<T>(&self, endpoint: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Serialize,
    {
        let mut items: Vec<T> = Vec::new();
        loop {
            let offset = items.len() as u32;
            let page = self
                .fetch_page::<T>(endpoint, &ListQuery::page(MAX_LIST_LIMIT, offset))
                .await?;
            let total = page.total_count as usize;
            if page.contents.is_empty() {
                if items.len() < total {
                    return Err(AppError::Fetch(format!(
                        "{endpoint}: empty page at offset {offset} before totalCount {total}"
                    )));
                }
                break;
            }
            items.extend(page.contents);
            if items.len() >= total {
                break;
            }
        }
        info!(endpoint, count = items.len(), "fetched cms collection");
        Ok(items)
    }
}

impl CaseRepository for CmsRepository {
    async fn list_cases(&self) -> Result<Vec<RepairCase>, AppError> {
        self.fetch_all(CASES_ENDPOINT).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.fetch_all(CATEGORIES_ENDPOINT).await
    }

    async fn list_symptoms(&self) -> Result<Vec<Symptom>, AppError> {
        self.fetch_all(SYMPTOMS_ENDPOINT).await
    }

    async fn get_case_by_slug(&self, slug: &str) -> Result<Option<RepairCase>, AppError> {
        if slug.trim().is_empty() {
            return Ok(None);
        }
        let page = self
            .fetch_page::<RepairCase>(CASES_ENDPOINT, &ListQuery::equals("slug", slug))
            .await?;
        Ok(page.contents.into_iter().find(|case| case.slug == slug))
    }

    async fn invalidate(&self) {
        self.cache.invalidate_all().await;
    }
}
