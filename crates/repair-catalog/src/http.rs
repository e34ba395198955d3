//! JSON routes for the catalog page. The request query string stands in for the browser
//! address bar: listings read it, and every response carries the query to replace it with.
use std::sync::Arc;

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::warn;

use repair_common::api::{
    CaseDetailResponse, CaseListingResponse, FilterCasesParams, PageMetadata,
    StaticPathsResponse, VocabulariesResponse,
};

use crate::error::AppError;
use crate::metadata::page_metadata;
use crate::repository::CaseRepository;
use crate::service::CatalogService;

pub fn router<R: CaseRepository>(service: Arc<CatalogService<R>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/repairs", get(list_cases::<R>).post(filter_cases::<R>))
        .route("/api/repairs/{slug}", get(get_case::<R>))
        .route("/api/vocabularies", get(vocabularies::<R>))
        .route("/api/static-paths", get(static_paths::<R>))
        .with_state(service)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    error: String,
    /// Page title and description for the not-found page.
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<PageMetadata>,
}

pub struct HttpError(AppError);

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (code, status) = match &self.0 {
            AppError::Loading => (StatusCode::SERVICE_UNAVAILABLE, "loading"),
            AppError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "failed"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Fetch(_) | AppError::Common(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "error"),
        };
        if code.is_server_error() && code != StatusCode::SERVICE_UNAVAILABLE {
            warn!(error = %self.0, "request failed");
        }
        let metadata = matches!(self.0, AppError::NotFound(_)).then(|| page_metadata(None));
        let body = ErrorBody {
            status,
            error: self.0.to_string(),
            metadata,
        };
        (code, Json(body)).into_response()
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_cases<R: CaseRepository>(
    State(service): State<Arc<CatalogService<R>>>,
    RawQuery(query): RawQuery,
) -> Result<Json<CaseListingResponse>, HttpError> {
    let params = FilterCasesParams {
        query,
        ..FilterCasesParams::default()
    };
    Ok(Json(service.listing(&params).await?))
}

async fn filter_cases<R: CaseRepository>(
    State(service): State<Arc<CatalogService<R>>>,
    Json(params): Json<FilterCasesParams>,
) -> Result<Json<CaseListingResponse>, HttpError> {
    Ok(Json(service.listing(&params).await?))
}

async fn get_case<R: CaseRepository>(
    State(service): State<Arc<CatalogService<R>>>,
    Path(slug): Path<String>,
) -> Result<Json<CaseDetailResponse>, HttpError> {
    Ok(Json(service.case_detail(&slug).await?))
}

async fn vocabularies<R: CaseRepository>(
    State(service): State<Arc<CatalogService<R>>>,
) -> Result<Json<VocabulariesResponse>, HttpError> {
    Ok(Json(service.vocabularies().await?))
}

async fn static_paths<R: CaseRepository>(
    State(service): State<Arc<CatalogService<R>>>,
) -> Result<Json<StaticPathsResponse>, HttpError> {
    Ok(Json(service.static_paths().await?))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde::de::DeserializeOwned;
    use tower::ServiceExt;

    use super::*;
    use crate::model::fixtures::scenario;
    use crate::repository::memory::MemoryRepository;

    async fn loaded_router() -> Router {
        let service = Arc::new(CatalogService::new(Arc::new(MemoryRepository::with_cases(
            scenario(),
        ))));
        service.reload().await.unwrap();
        router(service)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json<T: DeserializeOwned>(app: &Router, uri: &str) -> (StatusCode, T) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, value) = send(app, request).await;
        (status, serde_json::from_value(value).unwrap())
    }

    #[tokio::test]
    async fn listing_reads_filter_from_query_string() {
        let app = loaded_router().await;
        let (status, listing): (_, CaseListingResponse) =
            get_json(&app, "/api/repairs?symptoms=water&category=iphone").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing.filtered_count, 1);
        assert_eq!(listing.cases[0].slug, "c");
        assert_eq!(listing.query, "category=iphone&symptoms=water");
    }

    #[tokio::test]
    async fn post_applies_mutation_and_returns_replacement_query() {
        let app = loaded_router().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/repairs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"query":"category=iphone&symptoms=water","select_category":"all"}"#,
            ))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "");
        assert_eq!(body["filtered_count"], 3);
    }

    #[tokio::test]
    async fn detail_and_not_found() {
        let app = loaded_router().await;
        let (status, detail): (_, CaseDetailResponse) = get_json(&app, "/api/repairs/b").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail.categories[0].key, "android");

        let (status, body): (_, serde_json::Value) = get_json(&app, "/api/repairs/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "not_found");
        assert_eq!(body["metadata"]["title"], "Repair Cases | Not Found");
    }

    #[tokio::test]
    async fn unloaded_catalog_answers_service_unavailable() {
        let service = Arc::new(CatalogService::new(Arc::new(MemoryRepository::default())));
        let app = router(service);
        let (status, body): (_, serde_json::Value) = get_json(&app, "/api/repairs").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "loading");

        let (status, _): (_, serde_json::Value) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn failed_load_answers_service_unavailable_with_message() {
        let repo = MemoryRepository::with_cases(scenario());
        *repo.fail_with.lock().unwrap() = Some("cms unreachable".into());
        let service = Arc::new(CatalogService::new(Arc::new(repo)));
        assert!(service.load().await.is_err());
        let app = router(service);

        for uri in ["/api/repairs", "/api/vocabularies", "/api/static-paths"] {
            let (status, body): (_, serde_json::Value) = get_json(&app, uri).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
            assert_eq!(body["status"], "failed");
            assert!(body["error"].as_str().unwrap().contains("cms unreachable"));
            assert!(body.get("metadata").is_none());
        }
    }

    #[tokio::test]
    async fn vocabularies_and_static_paths_routes() {
        let app = loaded_router().await;
        let (_, vocab): (_, VocabulariesResponse) = get_json(&app, "/api/vocabularies").await;
        assert_eq!(vocab.categories.len(), 2);
        let (_, paths): (_, StaticPathsResponse) = get_json(&app, "/api/static-paths").await;
        assert_eq!(paths.slugs, ["a", "b", "c"]);
    }
}
