//! Operations shared by the MCP tools and the HTTP routes.
use std::sync::Arc;

use tracing::info;

use repair_common::api::{
    CaseDetailResponse, CaseListingResponse, CaseSummary, FilterCasesParams,
    ReloadCatalogResponse, StaticPathsResponse, VocabulariesResponse, VocabularyEntry,
};

use crate::address_bar::{AddressBar, MemoryAddressBar};
use crate::catalog::{Catalog, CatalogStore, LoadState};
use crate::error::AppError;
use crate::filter::CatalogFilter;
use crate::metadata::{case_summary, page_metadata, static_slugs};
use crate::model::{Category, RepairCase, Symptom};
use crate::query;
use crate::repository::CaseRepository;

pub struct CatalogService<R> {
    store: CatalogStore,
    repository: Arc<R>,
}

impl<R: CaseRepository> CatalogService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            store: CatalogStore::new(),
            repository,
        }
    }

    /// Drops cached CMS pages and fetches the whole catalog again.
    pub async fn reload(&self) -> Result<ReloadCatalogResponse, AppError> {
        self.repository.invalidate().await;
        self.load().await
    }

    pub async fn load(&self) -> Result<ReloadCatalogResponse, AppError> {
        let catalog = self.store.load(self.repository.as_ref()).await?;
        Ok(ReloadCatalogResponse {
            case_count: catalog.cases.len(),
            category_count: catalog.vocabularies.categories.len(),
            symptom_count: catalog.vocabularies.symptoms.len(),
        })
    }

    pub async fn listing(&self, params: &FilterCasesParams) -> Result<CaseListingResponse, AppError> {
        let catalog = self.store.snapshot().await.loaded()?;
        Ok(build_listing(&catalog, params))
    }

    /// Looks in the loaded snapshot first, then asks the repository, so a case published
    /// after the last load (or while loading) still resolves.
    pub async fn case_detail(&self, slug: &str) -> Result<CaseDetailResponse, AppError> {
        let slug = slug.trim();
        if let LoadState::Loaded(catalog) = self.store.snapshot().await {
            if let Some(case) = catalog.case_by_slug(slug) {
                return Ok(to_detail(case));
            }
        }
        let case = self
            .repository
            .get_case_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(slug.to_string()))?;
        info!(slug, "repair case resolved outside the loaded snapshot");
        Ok(to_detail(&case))
    }

    pub async fn vocabularies(&self) -> Result<VocabulariesResponse, AppError> {
        let catalog = self.store.snapshot().await.loaded()?;
        Ok(VocabulariesResponse {
            categories: catalog.vocabularies.categories.iter().map(category_entry).collect(),
            symptoms: catalog.vocabularies.symptoms.iter().map(symptom_entry).collect(),
        })
    }

    pub async fn static_paths(&self) -> Result<StaticPathsResponse, AppError> {
        let catalog = self.store.snapshot().await.loaded()?;
        Ok(StaticPathsResponse {
            slugs: static_slugs(&catalog.cases),
        })
    }
}

/// Mounts a filter on `params.query`, applies the requested change (category before
/// symptom) and reports the resulting page.
pub fn build_listing(catalog: &Catalog, params: &FilterCasesParams) -> CaseListingResponse {
    let address_bar = MemoryAddressBar::new(params.query.as_deref().unwrap_or_default());
    let mut engine = CatalogFilter::from_address_bar(&catalog.cases, address_bar);
    if let Some(category) = params.select_category.as_deref() {
        engine.select_category(category.trim());
    }
    if let Some(symptom) = params.toggle_symptom.as_deref() {
        engine.toggle_symptom(symptom.trim());
    }

    let cases: Vec<CaseSummary> = engine.filtered_cases().into_iter().map(to_summary).collect();
    CaseListingResponse {
        query: query::merge_query(&engine.address_bar().read(), engine.state()),
        selected_category: engine.selected_category().as_str().to_string(),
        selected_symptoms: engine.selected_symptoms().iter().cloned().collect(),
        filtered_count: engine.filtered_count(),
        total_count: engine.total_count(),
        cases,
    }
}

fn to_summary(case: &RepairCase) -> CaseSummary {
    CaseSummary {
        id: case.id.clone(),
        slug: case.slug.clone(),
        title: case.title.clone(),
        summary: case_summary(case),
        image_url: case.image.as_ref().map(|i| i.url.clone()),
        badge: case.categories.first().map(|c| c.name.clone()),
        symptoms: case.symptoms.iter().map(|s| s.name.clone()).collect(),
    }
}

fn to_detail(case: &RepairCase) -> CaseDetailResponse {
    CaseDetailResponse {
        id: case.id.clone(),
        slug: case.slug.clone(),
        title: case.title.clone(),
        body: case.body.clone(),
        excerpt: case.excerpt.clone(),
        image_url: case.image.as_ref().map(|i| i.url.clone()),
        published_at: case.published_at.clone(),
        categories: case.categories.iter().map(category_entry).collect(),
        symptoms: case.symptoms.iter().map(symptom_entry).collect(),
        metadata: page_metadata(Some(case)),
    }
}

fn category_entry(category: &Category) -> VocabularyEntry {
    VocabularyEntry {
        id: category.id.clone(),
        name: category.name.clone(),
        key: category.slug.clone(),
    }
}

fn symptom_entry(symptom: &Symptom) -> VocabularyEntry {
    VocabularyEntry {
        id: symptom.id.clone(),
        name: symptom.name.clone(),
        key: symptom.id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{case, scenario};
    use crate::repository::memory::MemoryRepository;

    fn params(query: &str, category: Option<&str>, symptom: Option<&str>) -> FilterCasesParams {
        FilterCasesParams {
            query: Some(query.to_string()),
            select_category: category.map(str::to_string),
            toggle_symptom: symptom.map(str::to_string),
        }
    }

    fn slugs(listing: &CaseListingResponse) -> Vec<&str> {
        listing.cases.iter().map(|c| c.slug.as_str()).collect()
    }

    #[test]
    fn listing_walks_the_scenario_through_the_query() {
        let catalog = Catalog::new(scenario(), Default::default());

        let listing = build_listing(&catalog, &params("", Some("iphone"), None));
        assert_eq!(slugs(&listing), ["a", "c"]);
        assert_eq!(listing.query, "category=iphone");

        let listing = build_listing(&catalog, &params(&listing.query, None, Some("water")));
        assert_eq!(slugs(&listing), ["c"]);
        assert_eq!(listing.query, "category=iphone&symptoms=water");
        assert_eq!(listing.selected_symptoms, ["water"]);

        let listing = build_listing(&catalog, &params(&listing.query, None, Some("water")));
        assert_eq!(slugs(&listing), ["a", "c"]);
        assert_eq!(listing.filtered_count, 2);
        assert_eq!(listing.total_count, 3);
    }

    #[test]
    fn listing_canonicalizes_incoming_query() {
        let catalog = Catalog::new(scenario(), Default::default());
        let listing = build_listing(
            &catalog,
            &params("?symptoms=water,no-power&category=all", None, None),
        );
        assert_eq!(listing.query, "symptoms=no-power,water");
        assert_eq!(listing.selected_category, "all");
        assert_eq!(slugs(&listing), ["c"]);
    }

    #[test]
    fn category_switch_in_listing_clears_symptoms() {
        let catalog = Catalog::new(scenario(), Default::default());
        let listing = build_listing(
            &catalog,
            &params("category=iphone&symptoms=water", Some("android"), None),
        );
        assert!(listing.selected_symptoms.is_empty());
        assert_eq!(listing.query, "category=android");
        assert_eq!(slugs(&listing), ["b"]);
    }

    #[tokio::test]
    async fn listing_requires_a_loaded_catalog() {
        let service = CatalogService::new(Arc::new(MemoryRepository::with_cases(scenario())));
        let err = service.listing(&FilterCasesParams::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Loading));

        let reloaded = service.reload().await.unwrap();
        assert_eq!(reloaded.case_count, 3);
        let listing = service.listing(&FilterCasesParams::default()).await.unwrap();
        assert_eq!(listing.filtered_count, 3);
        assert_eq!(listing.query, "");
    }

    #[tokio::test]
    async fn detail_falls_back_to_repository_and_reports_not_found() {
        let repo = Arc::new(MemoryRepository::with_cases(scenario()));
        let service = CatalogService::new(Arc::clone(&repo));
        service.reload().await.unwrap();

        let detail = service.case_detail(" a ").await.unwrap();
        assert_eq!(detail.metadata.title, "Case a | Repair Cases");
        assert_eq!(detail.categories[0].key, "iphone");

        repo.cases.lock().unwrap().push(case("late", &["android"], &["water"]));
        let detail = service.case_detail("late").await.unwrap();
        assert_eq!(detail.symptoms[0].key, "water");

        let err = service.case_detail("nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(slug) if slug == "nope"));
    }

    #[tokio::test]
    async fn vocabularies_and_static_paths() {
        let service = CatalogService::new(Arc::new(MemoryRepository::with_cases(scenario())));
        service.reload().await.unwrap();
        let vocab = service.vocabularies().await.unwrap();
        let keys: Vec<_> = vocab.symptoms.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["no-power", "water"]);
        assert_eq!(service.static_paths().await.unwrap().slugs, ["a", "b", "c"]);
    }
}
