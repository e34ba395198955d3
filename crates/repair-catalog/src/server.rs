/// MCP server for the repair case catalog.
///
/// Exposes five tools:
/// - `filter_repair_cases`: Apply a category/symptom filter carried in a query string
/// - `get_repair_case`: Look up one case by slug, with page metadata
/// - `list_vocabularies`: Category and symptom filter options
/// - `list_static_paths`: Slugs of every case detail page
/// - `reload_catalog`: Re-fetch the catalog from the CMS
use std::sync::Arc;

use rmcp::{
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router, Json, ServerHandler,
};
use tracing::info;

use repair_common::api::{
    CaseDetailResponse, CaseListingResponse, FilterCasesParams, GetCaseParams,
    ReloadCatalogResponse, StaticPathsResponse, VocabulariesResponse,
};

use crate::error::AppError;
use crate::metadata::page_metadata;
use crate::repository::CmsRepository;
use crate::service::CatalogService;

#[derive(Clone)]
pub struct RepairCatalogServer {
    service: Arc<CatalogService<CmsRepository>>,
    tool_router: ToolRouter<RepairCatalogServer>,
}

impl RepairCatalogServer {
    pub fn new(service: Arc<CatalogService<CmsRepository>>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl RepairCatalogServer {
    #[tool(description = "Filter repair cases by category and symptoms. Pass the current filter query string (e.g. 'category=iphone&symptoms=no-power,water') and optionally one change: select_category (clears symptoms; 'all' removes the category filter) or toggle_symptom (symptom id). Returns matching cases and the query string to use next.")]
    async fn filter_repair_cases(
        &self,
        Parameters(params): Parameters<FilterCasesParams>,
    ) -> Result<Json<CaseListingResponse>, String> {
        let listing = self
            .service
            .listing(&params)
            .await
            .map_err(|e| format!("filter failed: {e}"))?;
        Ok(Json(listing))
    }

    #[tool(description = "Get a repair case by its URL slug, including body HTML and page title/description.")]
    async fn get_repair_case(
        &self,
        Parameters(params): Parameters<GetCaseParams>,
    ) -> Result<Json<CaseDetailResponse>, String> {
        let slug = params.slug.trim().to_string();
        if slug.is_empty() {
            return Err("slug must not be empty".to_string());
        }
        let detail = self
            .service
            .case_detail(&slug)
            .await
            .map_err(case_lookup_error)?;
        Ok(Json(detail))
    }

    #[tool(description = "List the category and symptom filter options. Use each entry's key in the filter query.")]
    async fn list_vocabularies(&self) -> Result<Json<VocabulariesResponse>, String> {
        let vocab = self.service.vocabularies().await.map_err(|e| e.to_string())?;
        Ok(Json(vocab))
    }

    #[tool(description = "List the slugs of every repair case detail page, in catalog order.")]
    async fn list_static_paths(&self) -> Result<Json<StaticPathsResponse>, String> {
        let paths = self.service.static_paths().await.map_err(|e| e.to_string())?;
        Ok(Json(paths))
    }

    #[tool(description = "Re-fetch repair cases, categories and symptoms from the CMS, bypassing the cache.")]
    async fn reload_catalog(&self) -> Result<Json<ReloadCatalogResponse>, String> {
        info!("reload_catalog tool invoked");
        let counts = self
            .service
            .reload()
            .await
            .map_err(|e| format!("reload failed: {e}"))?;
        Ok(Json(counts))
    }
}

#[tool_handler]
impl ServerHandler for RepairCatalogServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "repair-catalog".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Device repair case catalog. Call list_vocabularies for filter options, then \
                 filter_repair_cases with the query string returned by the previous call plus \
                 one select_category or toggle_symptom change. Selected symptoms must all \
                 match. get_repair_case returns a single case by slug."
                    .to_string(),
            ),
        }
    }
}

/// Error text for `get_repair_case`. A miss carries the not-found page title and description.
fn case_lookup_error(err: AppError) -> String {
    match err {
        AppError::NotFound(_) => {
            let metadata = page_metadata(None);
            format!("{err} [{}: {}]", metadata.title, metadata.description)
        }
        other => other.to_string(),
    }
}
