//! Book records returned by the catalog.

use serde::{Deserialize, Serialize};

/// Prefix of work keys as the catalog returns them.
const WORK_KEY_PREFIX: &str = "/works/";

/// Prefix of author keys as the catalog returns them.
const AUTHOR_KEY_PREFIX: &str = "/authors/";

/// A search-result record.
///
/// `key` is the stable catalog identifier (`/works/OL45804W`) and is the
/// uniqueness key for favorites and cache entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Book {
    pub key: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_publish_year: Option<i32>,

    /// Cover image id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_i: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_pages_median: Option<u32>,
}

impl Book {
    /// Create a book with only the required fields set.
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            author_name: None,
            first_publish_year: None,
            cover_i: None,
            isbn: None,
            subject: None,
            publisher: None,
            language: None,
            number_of_pages_median: None,
        }
    }

    /// Work id without the `/works/` prefix, as used by the details endpoint.
    pub fn work_id(&self) -> &str {
        work_id_from_key(&self.key)
    }

    /// Author names joined for display.
    pub fn authors_display(&self) -> String {
        match &self.author_name {
            Some(names) if !names.is_empty() => names.join(", "),
            _ => "Unknown author".to_string(),
        }
    }

    /// Format book for display using a template.
    ///
    /// Supported placeholders: `{key}`, `{title}`, `{authors}`, `{year}`
    pub fn format(&self, template: &str) -> String {
        let year = self
            .first_publish_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "n.d.".to_string());
        template
            .replace("{key}", &self.key)
            .replace("{title}", &self.title)
            .replace("{authors}", &self.authors_display())
            .replace("{year}", &year)
    }
}

/// Text that the catalog returns either as a bare string or as
/// `{ "type": "/type/text", "value": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CatalogText {
    Plain(String),
    Typed { value: String },
}

impl CatalogText {
    pub fn as_str(&self) -> &str {
        match self {
            CatalogText::Plain(s) => s,
            CatalogText::Typed { value } => value,
        }
    }
}

/// External link attached to a work or author.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyRef {
    #[serde(default)]
    pub key: Option<String>,
}

/// Author reference embedded in a work record.
///
/// Both halves are optional so a malformed entry is skipped instead of failing
/// the whole work.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorRef {
    #[serde(default)]
    pub author: Option<KeyRef>,
    #[serde(default, rename = "type")]
    pub kind: Option<KeyRef>,
}

impl AuthorRef {
    /// Bare author id (`OL23919A`), if the reference carries a usable key.
    pub fn author_id(&self) -> Option<&str> {
        let key = self.author.as_ref()?.key.as_deref()?;
        let id = key.strip_prefix(AUTHOR_KEY_PREFIX).unwrap_or(key);
        (!id.is_empty()).then_some(id)
    }
}

/// Full work record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<CatalogText>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_places: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covers: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<CatalogLink>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<AuthorRef>,
}

impl BookDetails {
    /// Distinct author ids referenced by this work, in reference order.
    pub fn author_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.authors.iter().filter_map(AuthorRef::author_id) {
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_ref().map(CatalogText::as_str)
    }
}

/// Response body of the search endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub docs: Vec<Book>,
    #[serde(default)]
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_found_exact: Option<bool>,
}

/// Strip the `/works/` prefix from a catalog key.
pub fn work_id_from_key(key: &str) -> &str {
    key.strip_prefix(WORK_KEY_PREFIX).unwrap_or(key)
}
