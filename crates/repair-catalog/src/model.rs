use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
}

/// Symptoms are matched by `id`; `name` is only for display and may change between edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptom {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeCatch {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// A repair case as returned by the CMS `repair` endpoint.
///
/// Relation fields are loose in the CMS: they can be missing, `null`, a single object or a
/// list. All of these normalize to a (possibly empty) `Vec`. The older schema named them
/// `category` and `tags`; both names are still accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairCase {
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub image: Option<EyeCatch>,
    #[serde(default, alias = "category", deserialize_with = "one_or_many")]
    pub categories: Vec<Category>,
    #[serde(default, alias = "tags", deserialize_with = "one_or_many")]
    pub symptoms: Vec<Symptom>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl RepairCase {
    pub fn has_category(&self, slug: &str) -> bool {
        self.categories.iter().any(|c| c.slug == slug)
    }

    pub fn has_symptom(&self, key: &str) -> bool {
        self.symptoms.iter().any(|s| s.id == key)
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<Option<T>>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(item)) => vec![item],
        // The CMS leaves `null` holes behind when a referenced entry is deleted.
        Some(OneOrMany::Many(items)) => items.into_iter().flatten().collect(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_cms_record() {
        let json = r#"{
            "id": "x1",
            "createdAt": "2024-05-01T00:00:00.000Z",
            "updatedAt": "2024-05-02T00:00:00.000Z",
            "publishedAt": "2024-05-01T00:00:00.000Z",
            "revisedAt": "2024-05-02T00:00:00.000Z",
            "title": "iPhone 11 Pro Max NAND reball",
            "slug": "iphone-11promax-nand-reball",
            "body": "<p>body</p>",
            "image": {"url": "https://images.example/a.png", "width": 800, "height": 450},
            "categories": [{"id": "c1", "name": "iPhone", "slug": "iphone"}],
            "symptoms": [{"id": "s1", "name": "No power"}, null]
        }"#;
        let case: RepairCase = serde_json::from_str(json).unwrap();
        assert_eq!(case.slug, "iphone-11promax-nand-reball");
        assert_eq!(case.image.as_ref().map(|i| i.width), Some(Some(800)));
        assert!(case.has_category("iphone"));
        assert_eq!(case.symptoms.len(), 1);
        assert!(case.has_symptom("s1"));
        assert!(!case.has_symptom("No power"));
        assert_eq!(case.updated_at.as_deref(), Some("2024-05-02T00:00:00.000Z"));
    }

    #[test]
    fn tolerates_missing_and_legacy_relation_fields() {
        let json = r#"{
            "id": "x2",
            "title": "AQUOS sense5G boot failure",
            "slug": "aquos-sense5g-pmic-repair",
            "category": {"id": "c2", "name": "Android", "slug": "android"},
            "tags": null
        }"#;
        let case: RepairCase = serde_json::from_str(json).unwrap();
        assert_eq!(case.categories.len(), 1);
        assert!(case.has_category("android"));
        assert!(case.symptoms.is_empty());
        assert!(case.image.is_none());
        assert!(case.body.is_empty());
    }
}
