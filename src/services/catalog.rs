//! Open Library catalog client.
//!
//! Endpoints:
//! - `GET /search.json?q=&limit=` (search, trending, classics, subject)
//! - `GET /works/{id}.json`
//! - `GET /authors/{id}.json`
//! - `GET /authors/{id}/works.json?limit=&sort=trending`
//!
//! Every request races the caller's cancellation token; a cancelled request
//! is dropped and reported as [`CatalogError::Cancelled`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{CatalogError, Endpoint, Result};
use crate::models::{
    AuthorDetails, AuthorWorksResponse, Book, BookDetails, CatalogConfig, SearchResponse,
    work_id_from_key,
};
use crate::utils::http::create_async_client;

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

const TRENDING_QUERY: &str = "trending_score_hourly_sum:[1 TO *] language:eng";
const CLASSICS_QUERY: &str = "ddc:8* first_publish_year:[* TO 1950] publish_year:[2000 TO *] NOT public_scan_b:false language:eng";
const TRENDING_SORT: &str = "trending";
const AUTHOR_KEY_PREFIX: &str = "/authors/";

/// Read access to the remote book catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn search(
        &self,
        query: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> CatalogResult<SearchResponse>;

    async fn trending(&self, cancel: &CancellationToken) -> CatalogResult<SearchResponse>;

    async fn classics(&self, cancel: &CancellationToken) -> CatalogResult<SearchResponse>;

    async fn by_subject(
        &self,
        subject: &str,
        cancel: &CancellationToken,
    ) -> CatalogResult<SearchResponse>;

    /// Full work record; accepts `OL45804W` or `/works/OL45804W`.
    async fn work(&self, work_id: &str, cancel: &CancellationToken) -> CatalogResult<BookDetails>;

    /// Author record; accepts `OL23919A` or `/authors/OL23919A`.
    async fn author(
        &self,
        author_id: &str,
        cancel: &CancellationToken,
    ) -> CatalogResult<AuthorDetails>;

    /// An author's works with covers, oldest first.
    async fn author_books(
        &self,
        author_id: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> CatalogResult<Vec<Book>>;
}

/// HTTP implementation of [`Catalog`].
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: Url,
    search_limit: u32,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = create_async_client(config)?;
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self {
            client,
            base_url,
            search_limit: config.search_limit,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL below the base URL.
    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> CatalogResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                CatalogError::InvalidRequest(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn search_url(&self, query: &str, sort: Option<&str>, limit: u32) -> CatalogResult<Url> {
        let mut params = vec![("q", query.to_string())];
        if let Some(sort) = sort {
            params.push(("sort", sort.to_string()));
        }
        params.push(("limit", limit.to_string()));
        self.url(&["search.json"], &params)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        url: Url,
        cancel: &CancellationToken,
    ) -> CatalogResult<T> {
        log::debug!("GET {}", url);
        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| CatalogError::transport(endpoint, &e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(CatalogError::Status {
                    endpoint,
                    status: status.as_u16(),
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| CatalogError::transport(endpoint, &e))?;
            serde_json::from_slice(&body).map_err(|e| CatalogError::Decode {
                endpoint,
                message: e.to_string(),
            })
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CatalogError::Cancelled),
            result = request => result,
        }
    }

    async fn author_works(
        &self,
        author_id: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> CatalogResult<AuthorWorksResponse> {
        let url = self.url(
            &["authors", author_id, "works.json"],
            &[
                ("limit", limit.to_string()),
                ("sort", TRENDING_SORT.to_string()),
            ],
        )?;
        self.get_json(Endpoint::AuthorWorks, url, cancel).await
    }
}

/// Reject blank identifiers before they reach the network.
fn require_id<'a>(id: &'a str, what: &str) -> CatalogResult<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CatalogError::InvalidRequest(format!("{what} id is required")));
    }
    Ok(id)
}

fn author_id(id: &str) -> CatalogResult<&str> {
    let id = require_id(id, "author")?;
    require_id(id.strip_prefix(AUTHOR_KEY_PREFIX).unwrap_or(id), "author")
}

fn work_id(id: &str) -> CatalogResult<&str> {
    let id = require_id(id, "work")?;
    require_id(work_id_from_key(id), "work")
}

#[async_trait]
impl Catalog for CatalogClient {
    async fn search(
        &self,
        query: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> CatalogResult<SearchResponse> {
        let url = self.search_url(query, None, limit)?;
        self.get_json(Endpoint::Search, url, cancel).await
    }

    async fn trending(&self, cancel: &CancellationToken) -> CatalogResult<SearchResponse> {
        let url = self.search_url(TRENDING_QUERY, Some(TRENDING_SORT), self.search_limit)?;
        self.get_json(Endpoint::Trending, url, cancel).await
    }

    async fn classics(&self, cancel: &CancellationToken) -> CatalogResult<SearchResponse> {
        let url = self.search_url(CLASSICS_QUERY, Some(TRENDING_SORT), self.search_limit)?;
        self.get_json(Endpoint::Classics, url, cancel).await
    }

    async fn by_subject(
        &self,
        subject: &str,
        cancel: &CancellationToken,
    ) -> CatalogResult<SearchResponse> {
        let subject = require_id(subject, "subject")?.to_lowercase();
        let query = format!("subject:{subject} language:eng");
        let url = self.search_url(&query, Some(TRENDING_SORT), self.search_limit)?;
        self.get_json(Endpoint::Subject, url, cancel).await
    }

    async fn work(&self, work_id: &str, cancel: &CancellationToken) -> CatalogResult<BookDetails> {
        let id = self::work_id(work_id)?;
        let url = self.url(&["works", &format!("{id}.json")], &[])?;
        self.get_json(Endpoint::Work, url, cancel).await
    }

    async fn author(
        &self,
        author_id: &str,
        cancel: &CancellationToken,
    ) -> CatalogResult<AuthorDetails> {
        let id = self::author_id(author_id)?;
        let url = self.url(&["authors", &format!("{id}.json")], &[])?;
        self.get_json(Endpoint::Author, url, cancel).await
    }

    async fn author_books(
        &self,
        author_id: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> CatalogResult<Vec<Book>> {
        let id = self::author_id(author_id)?;
        let (author, works) = futures::try_join!(
            self.author(id, cancel),
            self.author_works(id, limit, cancel)
        )?;
        Ok(works.into_books(&author.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client(base_url: &str) -> CatalogClient {
        CatalogClient::new(&CatalogConfig {
            base_url: base_url.to_string(),
            ..CatalogConfig::default()
        })
        .unwrap()
    }

    /// Serve one canned HTTP response on a local port and return its base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_search_url_encodes_query() {
        let catalog = client("https://openlibrary.org");
        let url = catalog.search_url("the hobbit", None, 20).unwrap();
        assert_eq!(
            url.as_str(),
            "https://openlibrary.org/search.json?q=the+hobbit&limit=20"
        );
    }

    #[test]
    fn test_url_keeps_base_path() {
        let catalog = client("http://localhost:8080/mirror/");
        let url = catalog.url(&["works", "OL1W.json"], &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/mirror/works/OL1W.json");
    }

    #[test]
    fn test_trending_url() {
        let catalog = client("https://openlibrary.org");
        let url = catalog
            .search_url(TRENDING_QUERY, Some(TRENDING_SORT), 20)
            .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0].1, TRENDING_QUERY);
        assert_eq!(pairs[1], ("sort".to_string(), "trending".to_string()));
    }

    #[test]
    fn test_ids_accept_catalog_keys() {
        assert_eq!(work_id("/works/OL45804W").unwrap(), "OL45804W");
        assert_eq!(author_id("/authors/OL23919A").unwrap(), "OL23919A");
        assert!(matches!(
            author_id("/authors/"),
            Err(CatalogError::InvalidRequest(_))
        ));
        assert!(matches!(work_id("  "), Err(CatalogError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let catalog = client("http://127.0.0.1:9");
        let token = CancellationToken::new();
        token.cancel();
        let result = catalog.search("dune", 20, &token).await;
        assert_eq!(result.unwrap_err(), CatalogError::Cancelled);
    }

    #[tokio::test]
    async fn test_status_names_endpoint() {
        let base = serve_once("404 Not Found", "{}").await;
        let result = client(&base).work("OL1W", &CancellationToken::new()).await;
        assert_eq!(
            result.unwrap_err(),
            CatalogError::Status {
                endpoint: Endpoint::Work,
                status: 404
            }
        );
    }

    #[tokio::test]
    async fn test_decodes_search_response() {
        let base = serve_once(
            "200 OK",
            r#"{"numFound":1,"start":0,"docs":[{"key":"/works/OL1W","title":"Dune"}]}"#,
        )
        .await;
        let response = client(&base)
            .search("dune", 20, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.docs[0].title, "Dune");
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let base = serve_once("200 OK", "not json").await;
        let result = client(&base).author("OL1A", &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(CatalogError::Decode {
                endpoint: Endpoint::Author,
                ..
            })
        ));
    }
}
