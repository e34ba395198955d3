//! Request and response shapes shared by the MCP tools and the HTTP routes.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FilterCasesParams {
    /// Current filter query string, e.g. "category=iphone&symptoms=no-power,water".
    /// Missing or empty means no filter.
    pub query: Option<String>,
    /// Category slug (or "all") to switch to. Clears the symptom selection.
    pub select_category: Option<String>,
    /// Symptom id to add to or remove from the selection.
    pub toggle_symptom: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetCaseParams {
    /// URL slug of the repair case.
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaseSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub image_url: Option<String>,
    /// Display name of the first category, used as the card badge.
    pub badge: Option<String>,
    pub symptoms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaseListingResponse {
    /// Canonical query string for the resulting filter state. Empty when unfiltered.
    pub query: String,
    pub selected_category: String,
    pub selected_symptoms: Vec<String>,
    pub filtered_count: usize,
    pub total_count: usize,
    pub cases: Vec<CaseSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VocabularyEntry {
    pub id: String,
    pub name: String,
    /// Filter key sent in the query string: the slug for categories, the id for symptoms.
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaseDetailResponse {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<String>,
    pub categories: Vec<VocabularyEntry>,
    pub symptoms: Vec<VocabularyEntry>,
    pub metadata: PageMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VocabulariesResponse {
    pub categories: Vec<VocabularyEntry>,
    pub symptoms: Vec<VocabularyEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StaticPathsResponse {
    pub slugs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReloadCatalogResponse {
    pub case_count: usize,
    pub category_count: usize,
    pub symptom_count: usize,
}
