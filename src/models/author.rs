//! Author records.

use serde::{Deserialize, Serialize};

use super::book::{Book, CatalogLink, CatalogText, KeyRef};

/// Author record fetched from the authors endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorDetails {
    pub key: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<CatalogText>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<CatalogLink>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_names: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikipedia: Option<String>,
}

impl AuthorDetails {
    pub fn bio_text(&self) -> Option<&str> {
        self.bio.as_ref().map(CatalogText::as_str)
    }
}

/// One entry of the author works listing.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorWorkEntry {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub kind: Option<KeyRef>,
    #[serde(default)]
    pub first_publish_year: Option<i32>,
    #[serde(default)]
    pub covers: Option<Vec<i64>>,
    #[serde(default)]
    pub isbn: Option<Vec<String>>,
    #[serde(default)]
    pub subjects: Option<Vec<String>>,
    #[serde(default)]
    pub publishers: Option<Vec<String>>,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    pub number_of_pages_median: Option<u32>,
}

/// Response body of the author works endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorWorksResponse {
    #[serde(default)]
    pub entries: Vec<AuthorWorkEntry>,
}

impl AuthorWorksResponse {
    /// Build an author's bibliography.
    ///
    /// Keeps real works that carry a cover, attributes them to `author_name`,
    /// and orders them oldest first (unknown years first).
    pub fn into_books(self, author_name: &str) -> Vec<Book> {
        let mut books: Vec<Book> = self
            .entries
            .into_iter()
            .filter(|entry| {
                entry
                    .kind
                    .as_ref()
                    .and_then(|k| k.key.as_deref())
                    .is_some_and(|k| k == "/type/work")
            })
            .filter_map(|entry| {
                let cover = entry.covers.as_ref().and_then(|c| c.first().copied())?;
                Some(Book {
                    key: entry.key,
                    title: entry.title,
                    author_name: Some(vec![author_name.to_string()]),
                    first_publish_year: entry.first_publish_year,
                    cover_i: Some(cover),
                    isbn: entry.isbn,
                    subject: entry.subjects,
                    publisher: entry.publishers,
                    language: entry.languages,
                    number_of_pages_median: entry.number_of_pages_median,
                })
            })
            .collect();
        books.sort_by_key(|b| b.first_publish_year.unwrap_or(0));
        books
    }
}
