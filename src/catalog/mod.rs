//! Client for the upstream course catalog API.

pub mod filter;
pub mod types;

pub use filter::ListingFilter;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use types::{ClassIdentity, ClassListing, Enrichment};

pub const DEFAULT_BASE_URL: &str =
    "https://eadvs-cscc-catalog-api.apps.asu.edu/catalog-microservices/api/v1";

const LISTING_PATH: &str = "/search/classes";
const ENRICHMENT_PATH: &str = "/search/courses";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog listing unavailable for [{filter}] (HTTP {status}): {message}")]
    SourceUnavailable {
        status: u16,
        filter: String,
        message: String,
    },

    #[error("invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected catalog payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of raw class records and their course metadata.
/// Implemented by `CatalogClient` for production; fakes are used in importer tests.
pub trait CatalogSource {
    /// One page of class listings for `filter`, one undecoded entry per class.
    /// Pagination is not followed.
    async fn fetch_listing(&self, filter: &ListingFilter) -> Result<Vec<Value>, CatalogError>;

    /// Course metadata for one class, or `None` when the catalog has none.
    async fn fetch_enrichment(
        &self,
        identity: &ClassIdentity,
    ) -> Result<Option<Enrichment>, CatalogError>;
}

#[derive(Clone)]
struct Token(String);

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Clone, Debug)]
pub struct CatalogClient {
    http: Client,
    token: Token,
    base_url: String,
}

impl CatalogClient {
    /// The catalog accepts the literal token `null` for public reads.
    pub fn new(http: Client, base_url: &str, token: &str) -> Self {
        Self {
            http,
            token: Token(token.trim().to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str, pairs: &[(&str, String)]) -> Result<Url, CatalogError> {
        let mut url = Url::parse(&format!("{}{path}", self.base_url))?;
        url.query_pairs_mut()
            .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }

    fn request(&self, url: Url) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("Accept", "application/json")
            .header("User-Agent", crate::USER_AGENT)
            .bearer_auth(&self.token.0)
    }
}

impl CatalogSource for CatalogClient {
    async fn fetch_listing(&self, filter: &ListingFilter) -> Result<Vec<Value>, CatalogError> {
        let url = self.url(LISTING_PATH, &filter.query_pairs())?;
        let response = self.request(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = extract_error_message(&response.text().await.unwrap_or_default());
            return Err(CatalogError::SourceUnavailable {
                status: status.as_u16(),
                filter: filter.to_string(),
                message,
            });
        }

        let listing: ClassListing = response.json().await?;
        debug!(
            classes = listing.classes.len(),
            %filter,
            "listing fetched (first page only)"
        );
        Ok(listing.classes)
    }

    async fn fetch_enrichment(
        &self,
        identity: &ClassIdentity,
    ) -> Result<Option<Enrichment>, CatalogError> {
        let pairs = [
            ("refine", "Y".to_string()),
            ("catalogNbr", identity.catalog_number.clone()),
            ("course_id", identity.course_id.clone()),
            ("subject", identity.subject.clone()),
            ("term", identity.term.clone()),
        ];
        let url = self.url(ENRICHMENT_PATH, &pairs)?;
        let response = self.request(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                catalog_number = %identity.catalog_number,
                term = %identity.term,
                status = status.as_u16(),
                "enrichment lookup failed, treating as missing"
            );
            return Ok(None);
        }

        let body: Option<Vec<Value>> = response.json().await?;
        first_enrichment(body)
    }
}

/// The lookup returns a list; only its first element counts. A null or
/// empty first element means no metadata.
fn first_enrichment(body: Option<Vec<Value>>) -> Result<Option<Enrichment>, CatalogError> {
    match body.and_then(|list| list.into_iter().next()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_enrichment_empty_list_is_none() {
        assert!(first_enrichment(Some(vec![])).unwrap().is_none());
        assert!(first_enrichment(None).unwrap().is_none());
    }

    #[test]
    fn first_enrichment_null_or_empty_first_element_is_none() {
        assert!(first_enrichment(Some(vec![Value::Null])).unwrap().is_none());
        assert!(first_enrichment(Some(vec![json!({})])).unwrap().is_none());
    }

    #[test]
    fn first_enrichment_ignores_later_elements() {
        let enrichment = first_enrichment(Some(vec![
            json!({"COURSETITLELONG": "First"}),
            json!({"COURSETITLELONG": "Second"}),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(enrichment.title.as_deref(), Some("First"));
    }

    #[test]
    fn extract_error_message_prefers_json_message() {
        assert_eq!(extract_error_message(r#"{"message":"down"}"#), "down");
        assert_eq!(extract_error_message("plain"), "plain");
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let client = CatalogClient::new(Client::new(), DEFAULT_BASE_URL, "secret");
        assert!(!format!("{client:?}").contains("secret"));
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity() -> ClassIdentity {
        ClassIdentity {
            catalog_number: "507".into(),
            course_id: "104532".into(),
            subject: "CSE".into(),
            term: "2247".into(),
        }
    }

    #[tokio::test]
    async fn fetch_listing_sends_filter_and_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/classes"))
            .and(query_param("campus", "TEMPE"))
            .and(query_param("term", "2247"))
            .and(query_param("level", "grad"))
            .and(header("Authorization", "Bearer null"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "classes": [
                    { "CLAS": { "CATALOGNBR": "507", "STRM": "2247" }, "seatInfo": {} },
                    { "CLAS": { "CATALOGNBR": "310", "STRM": "2247" }, "seatInfo": {} }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CatalogClient::new(Client::new(), &server.uri(), "null");
        let classes = client
            .fetch_listing(&ListingFilter::default())
            .await
            .unwrap();
        assert_eq!(classes.len(), 2);
    }

    #[tokio::test]
    async fn fetch_listing_keeps_page_with_malformed_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/classes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "classes": [
                    { "CLAS": { "CATALOGNBR": "507", "STRM": "2247" }, "seatInfo": { "ENRL_TOT": 1 } },
                    { "CLAS": { "CATALOGNBR": "510", "INSTRUCTORSLIST": [null] }, "seatInfo": null },
                    { "CLAS": "garbage" }
                ]
            })))
            .mount(&server)
            .await;

        let client = CatalogClient::new(Client::new(), &server.uri(), "null");
        let classes = client
            .fetch_listing(&ListingFilter::default())
            .await
            .unwrap();
        assert_eq!(classes.len(), 3);
        assert!(types::RawClass::from_entry(&classes[1]).is_ok());
        assert!(types::RawClass::from_entry(&classes[2]).is_err());
    }

    #[tokio::test]
    async fn fetch_listing_non_success_is_source_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/classes"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = CatalogClient::new(Client::new(), &server.uri(), "null");
        let err = client
            .fetch_listing(&ListingFilter::default())
            .await
            .unwrap_err();
        match &err {
            CatalogError::SourceUnavailable { status, filter, message } => {
                assert_eq!(*status, 503);
                assert!(filter.contains("term=2247"), "got: {filter}");
                assert_eq!(message, "maintenance");
            }
            other => panic!("expected SourceUnavailable, got: {other:?}"),
        }
        assert!(err.to_string().contains("campus=TEMPE"));
    }

    #[tokio::test]
    async fn fetch_enrichment_returns_first_element() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/courses"))
            .and(query_param("catalogNbr", "507"))
            .and(query_param("course_id", "104532"))
            .and(query_param("subject", "CSE"))
            .and(query_param("term", "2247"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "COURSETITLELONG": "Image Processing and Analysis" }
            ])))
            .mount(&server)
            .await;

        let client = CatalogClient::new(Client::new(), &server.uri(), "null");
        let enrichment = client.fetch_enrichment(&identity()).await.unwrap().unwrap();
        assert_eq!(
            enrichment.title.as_deref(),
            Some("Image Processing and Analysis")
        );
    }

    #[tokio::test]
    async fn fetch_enrichment_empty_list_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/courses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = CatalogClient::new(Client::new(), &server.uri(), "null");
        assert!(client.fetch_enrichment(&identity()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fetch_enrichment_error_status_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/courses"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = CatalogClient::new(Client::new(), &server.uri(), "null");
        assert!(client.fetch_enrichment(&identity()).await.unwrap().is_none());
    }
}
