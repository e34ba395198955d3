//! Faceted filtering over the repair case list.
//!
//! Two facets: one active category (or the `all` wildcard) and a set of symptoms. A case is
//! shown when it carries the selected category and *every* selected symptom. The state
//! lives in the address bar; [`CatalogFilter`] reads it at mount and writes it back after
//! each change with replace semantics.
use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::address_bar::AddressBar;
use crate::model::{Category, RepairCase, Symptom};
use crate::query;

/// Wildcard category value, also accepted from the query string.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Slug(String),
}

impl CategoryFilter {
    /// `"all"` and the empty string both mean no category filter. Unknown slugs are kept.
    pub fn parse(value: &str) -> Self {
        if value.is_empty() || value == ALL_CATEGORIES {
            Self::All
        } else {
            Self::Slug(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_CATEGORIES,
            Self::Slug(slug) => slug,
        }
    }

    pub fn matches(&self, case: &RepairCase) -> bool {
        match self {
            Self::All => true,
            Self::Slug(slug) => case.has_category(slug),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub category: CategoryFilter,
    pub symptoms: BTreeSet<String>,
}

impl FilterState {
    /// Switches category and drops the symptom selection, which was made for the old one.
    pub fn select_category(&mut self, category_slug: &str) {
        self.category = CategoryFilter::parse(category_slug);
        self.symptoms.clear();
    }

    /// Adds `key` if absent, removes it if present.
    ///
    /// Empty keys and keys containing the list separator cannot be carried by the query
    /// string and are ignored.
    pub fn toggle_symptom(&mut self, key: &str) {
        if !query::is_valid_symptom_key(key) {
            debug!(key, "ignoring symptom key that cannot be encoded");
            return;
        }
        if !self.symptoms.remove(key) {
            self.symptoms.insert(key.to_string());
        }
    }

    pub fn matches(&self, case: &RepairCase) -> bool {
        self.category.matches(case) && self.symptoms.iter().all(|key| case.has_symptom(key))
    }
}

/// Cases matching `state`, in their original order.
pub fn filter_cases<'a>(cases: &'a [RepairCase], state: &FilterState) -> Vec<&'a RepairCase> {
    cases.iter().filter(|case| state.matches(case)).collect()
}

/// Filter engine bound to one page view: the full case list, the current state and the
/// address bar the state is mirrored into.
pub struct CatalogFilter<'a, B: AddressBar> {
    cases: &'a [RepairCase],
    state: FilterState,
    address_bar: B,
}

impl<'a, B: AddressBar> CatalogFilter<'a, B> {
    /// Mounts the engine, restoring whatever state the address bar currently holds.
    pub fn from_address_bar(cases: &'a [RepairCase], address_bar: B) -> Self {
        let state = query::parse_query(&address_bar.read());
        Self {
            cases,
            state,
            address_bar,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn selected_category(&self) -> &CategoryFilter {
        &self.state.category
    }

    pub fn selected_symptoms(&self) -> &BTreeSet<String> {
        &self.state.symptoms
    }

    pub fn address_bar(&self) -> &B {
        &self.address_bar
    }

    pub fn select_category(&mut self, category_slug: &str) {
        self.state.select_category(category_slug);
        self.sync_address_bar();
    }

    pub fn toggle_symptom(&mut self, key: &str) {
        self.state.toggle_symptom(key);
        self.sync_address_bar();
    }

    pub fn filtered_cases(&self) -> Vec<&'a RepairCase> {
        filter_cases(self.cases, &self.state)
    }

    pub fn filtered_count(&self) -> usize {
        self.cases.iter().filter(|case| self.state.matches(case)).count()
    }

    pub fn total_count(&self) -> usize {
        self.cases.len()
    }

    fn sync_address_bar(&mut self) {
        let next = query::merge_query(&self.address_bar.read(), &self.state);
        debug!(query = %next, "replacing filter query");
        self.address_bar.replace(&next);
    }
}

/// Filter options for the two facets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabularies {
    pub categories: Vec<Category>,
    pub symptoms: Vec<Symptom>,
}

impl Vocabularies {
    /// Prefers the repository's own lists; a facet the repository left empty falls back to
    /// what the cases reference.
    pub fn resolve(authoritative: Vocabularies, cases: &[RepairCase]) -> Self {
        if !authoritative.categories.is_empty() && !authoritative.symptoms.is_empty() {
            return authoritative;
        }
        let derived = derive_vocabularies(cases);
        Self {
            categories: if authoritative.categories.is_empty() {
                derived.categories
            } else {
                authoritative.categories
            },
            symptoms: if authoritative.symptoms.is_empty() {
                derived.symptoms
            } else {
                authoritative.symptoms
            },
        }
    }
}

/// Distinct categories and symptoms referenced by `cases`, by id, in first-seen order.
pub fn derive_vocabularies(cases: &[RepairCase]) -> Vocabularies {
    let mut seen_categories = HashSet::new();
    let mut seen_symptoms = HashSet::new();
    let mut vocab = Vocabularies::default();

    for case in cases {
        for category in &case.categories {
            if seen_categories.insert(category.id.as_str()) {
                vocab.categories.push(category.clone());
            }
        }
        for symptom in &case.symptoms {
            if seen_symptoms.insert(symptom.id.as_str()) {
                vocab.symptoms.push(symptom.clone());
            }
        }
    }
    vocab
}
