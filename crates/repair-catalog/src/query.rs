//! Query-string encoding of [`FilterState`].
//!
//! - `category=<slug>`, absent when no category is selected
//! - `symptoms=<id>,<id>`, absent when the selection is empty; ids are written sorted
//!
//! Parsing never fails. Missing parameters mean "no filter", unknown values are kept and
//! simply match nothing.
use url::form_urlencoded;

use crate::filter::{CategoryFilter, FilterState};

pub const CATEGORY_PARAM: &str = "category";
pub const SYMPTOMS_PARAM: &str = "symptoms";
const SYMPTOM_SEPARATOR: char = ',';

pub fn is_valid_symptom_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(SYMPTOM_SEPARATOR)
}

pub fn parse_query(query: &str) -> FilterState {
    let mut state = FilterState::default();
    let mut category_seen = false;

    for (name, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        match name.as_ref() {
            CATEGORY_PARAM if !category_seen => {
                category_seen = true;
                state.category = CategoryFilter::parse(&value);
            }
            SYMPTOMS_PARAM => {
                state.symptoms.extend(
                    value
                        .split(SYMPTOM_SEPARATOR)
                        .filter(|key| !key.is_empty())
                        .map(str::to_string),
                );
            }
            _ => {}
        }
    }
    state
}

/// Canonical query for `state`. Empty for the unfiltered state.
pub fn to_query(state: &FilterState) -> String {
    filter_params(state).join("&")
}

/// Rewrites the filter parameters of `current`, keeping every other parameter in place.
pub fn merge_query(current: &str, state: &FilterState) -> String {
    let retained: Vec<(String, String)> =
        form_urlencoded::parse(current.trim_start_matches('?').as_bytes())
            .filter(|(name, _)| name != CATEGORY_PARAM && name != SYMPTOMS_PARAM)
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

    let mut parts = Vec::new();
    if !retained.is_empty() {
        parts.push(
            form_urlencoded::Serializer::new(String::new())
                .extend_pairs(retained)
                .finish(),
        );
    }
    let filter = to_query(state);
    if !filter.is_empty() {
        parts.push(filter);
    }
    parts.join("&")
}

fn filter_params(state: &FilterState) -> Vec<String> {
    let mut params = Vec::with_capacity(2);
    if let CategoryFilter::Slug(slug) = &state.category {
        params.push(format!("{CATEGORY_PARAM}={}", encode(slug)));
    }
    if !state.symptoms.is_empty() {
        let joined = state
            .symptoms
            .iter()
            .map(|key| encode(key))
            .collect::<Vec<_>>()
            .join(",");
        params.push(format!("{SYMPTOMS_PARAM}={joined}"));
    }
    params
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn state(category: &str, symptoms: &[&str]) -> FilterState {
        FilterState {
            category: CategoryFilter::parse(category),
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn defaults_are_omitted() {
        assert_eq!(to_query(&FilterState::default()), "");
        assert_eq!(to_query(&state("all", &["water"])), "symptoms=water");
        assert_eq!(to_query(&state("iphone", &[])), "category=iphone");
    }

    #[test]
    fn symptoms_are_comma_joined_in_sorted_order() {
        let query = to_query(&state("android", &["water", "no-power"]));
        assert_eq!(query, "category=android&symptoms=no-power,water");
    }

    #[test]
    fn missing_and_empty_parameters_parse_to_unfiltered() {
        assert_eq!(parse_query(""), FilterState::default());
        assert_eq!(parse_query("?"), FilterState::default());
        assert_eq!(parse_query("category=&symptoms="), FilterState::default());
        assert_eq!(parse_query("category=all"), FilterState::default());
        assert_eq!(parse_query("utm_source=flyer"), FilterState::default());
    }

    #[test]
    fn parsing_is_tolerant() {
        let parsed = parse_query("?symptoms=water,,no-power&category=unknown-device&symptoms=water");
        assert_eq!(parsed.category, CategoryFilter::Slug("unknown-device".into()));
        let expected: BTreeSet<String> = ["no-power", "water"].iter().map(|s| s.to_string()).collect();
        assert_eq!(parsed.symptoms, expected);
    }

    #[test]
    fn percent_encoded_values_are_decoded() {
        let parsed = parse_query("category=pc%2Fother&symptoms=%E6%B0%B4%E6%B2%A1,no+power");
        assert_eq!(parsed.category, CategoryFilter::Slug("pc/other".into()));
        assert!(parsed.symptoms.contains("水没"));
        assert!(parsed.symptoms.contains("no power"));
    }

    #[test]
    fn round_trips_reachable_states() {
        let states = [
            FilterState::default(),
            state("iphone", &[]),
            state("all", &["no-power"]),
            state("pc_other", &["water", "no-power", "水没"]),
            state("pc/other tablets", &["screen flicker", "a&b=c"]),
        ];
        for original in states {
            let query = to_query(&original);
            assert_eq!(parse_query(&query), original, "query {query:?}");
        }
    }

    #[test]
    fn merge_keeps_unrelated_parameters() {
        let merged = merge_query("page=2&category=android&symptoms=water", &state("iphone", &[]));
        assert_eq!(merged, "page=2&category=iphone");
        assert_eq!(merge_query("category=iphone", &FilterState::default()), "");
    }
}
