use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::filter::Vocabularies;
use crate::model::RepairCase;
use crate::repository::CaseRepository;

/// Progress of the asynchronous catalog fetch, as shown to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn loaded(self) -> Result<T, AppError> {
        match self {
            Self::Loaded(value) => Ok(value),
            Self::Loading => Err(AppError::Loading),
            Self::Failed(message) => Err(AppError::Unavailable(message)),
        }
    }
}

/// Immutable snapshot of everything the filter surfaces need.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub cases: Vec<RepairCase>,
    pub vocabularies: Vocabularies,
}

impl Catalog {
    /// Builds a snapshot. Cases repeating an earlier `id` or `slug` are dropped.
    pub fn new(cases: Vec<RepairCase>, authoritative: Vocabularies) -> Self {
        let mut ids = HashSet::new();
        let mut slugs = HashSet::new();
        let mut unique = Vec::with_capacity(cases.len());
        for case in cases {
            if ids.contains(&case.id) || slugs.contains(&case.slug) {
                warn!(id = %case.id, slug = %case.slug, "dropping duplicate repair case");
                continue;
            }
            ids.insert(case.id.clone());
            slugs.insert(case.slug.clone());
            unique.push(case);
        }
        let vocabularies = Vocabularies::resolve(authoritative, &unique);
        Self {
            cases: unique,
            vocabularies,
        }
    }

    /// Fetches cases and both vocabularies concurrently.
    pub async fn fetch<R: CaseRepository>(repo: &R) -> Result<Self, AppError> {
        let (cases, categories, symptoms) = futures::try_join!(
            repo.list_cases(),
            repo.list_categories(),
            repo.list_symptoms(),
        )?;
        Ok(Self::new(cases, Vocabularies { categories, symptoms }))
    }

    pub fn case_by_slug(&self, slug: &str) -> Option<&RepairCase> {
        self.cases.iter().find(|case| case.slug == slug)
    }
}

/// Shared holder of the current catalog snapshot.
pub struct CatalogStore {
    state: RwLock<LoadState<Arc<Catalog>>>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LoadState::Loading),
        }
    }

    pub async fn snapshot(&self) -> LoadState<Arc<Catalog>> {
        self.state.read().await.clone()
    }

    /// Fetches a fresh catalog and swaps it in.
    ///
    /// On failure a previously loaded catalog stays in place; with nothing loaded yet the
    /// store moves to `Failed`.
    pub async fn load<R: CaseRepository>(&self, repo: &R) -> Result<Arc<Catalog>, AppError> {
        match Catalog::fetch(repo).await {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                info!(
                    cases = catalog.cases.len(),
                    categories = catalog.vocabularies.categories.len(),
                    symptoms = catalog.vocabularies.symptoms.len(),
                    "catalog loaded"
                );
                *self.state.write().await = LoadState::Loaded(Arc::clone(&catalog));
                Ok(catalog)
            }
            Err(e) => {
                let mut state = self.state.write().await;
                if matches!(*state, LoadState::Loaded(_)) {
                    warn!(error = %e, "catalog reload failed, keeping previous snapshot");
                } else {
                    error!(error = %e, "catalog load failed");
                    *state = LoadState::Failed(e.to_string());
                }
                Err(e)
            }
        }
    }
}
