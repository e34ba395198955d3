use std::sync::OnceLock;

use regex::Regex;

use repair_common::api::PageMetadata;

use crate::model::RepairCase;

const TITLE_SUFFIX: &str = "Repair Cases";
const DESCRIPTION_LEN: usize = 120;
const MAX_SUMMARY_LEN: usize = 300;

fn block_break_re() -> &'static Regex {
    static BLOCK_BREAK_RE: OnceLock<Regex> = OnceLock::new();
    BLOCK_BREAK_RE.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(?:p|div|h[1-6]|li|ul|ol|blockquote|tr|td|th|figure|table)\s*>")
            .expect("valid regex")
    })
}

fn tag_re() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"))
}

/// Plain text of a rich-text body.
///
/// Inline tags vanish without a trace (`i<b>Phone</b>` reads `iPhone`); line breaks and the
/// end of a block become a space. Whitespace runs are collapsed.
pub fn strip_html(html: &str) -> String {
    let spaced = block_break_re().replace_all(html, " ");
    let text = tag_re().replace_all(&spaced, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn page_metadata(case: Option<&RepairCase>) -> PageMetadata {
    match case {
        Some(case) => PageMetadata {
            title: format!("{} | {TITLE_SUFFIX}", case.title),
            description: strip_html(&case.body).chars().take(DESCRIPTION_LEN).collect(),
        },
        None => PageMetadata {
            title: format!("{TITLE_SUFFIX} | Not Found"),
            description: "The requested repair case could not be found.".to_string(),
        },
    }
}

/// Slugs to pre-render detail pages for, in catalog order.
pub fn static_slugs(cases: &[RepairCase]) -> Vec<String> {
    cases.iter().map(|case| case.slug.clone()).collect()
}

/// Card text: the excerpt when the editor wrote one, otherwise the body as plain text.
pub fn case_summary(case: &RepairCase) -> String {
    let text = case
        .excerpt
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| strip_html(&case.body));
    if text.chars().count() > MAX_SUMMARY_LEN {
        format!("{}...", text.chars().take(MAX_SUMMARY_LEN).collect::<String>())
    } else {
        text
    }
}
