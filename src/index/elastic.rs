use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{EnsureOutcome, IndexError, SearchIndex};
use crate::course::{CourseDocument, schema};

pub const DEFAULT_URL: &str = "https://localhost:9200";

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// Characters to percent-encode in a single URL path segment. Unlike a path,
/// `/` must be encoded so a document id never spans segments.
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b'?')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'@')
    .add(b'[')
    .add(b']')
    .add(b';')
    .add(b'=')
    .add(b'"')
    .add(b'<')
    .add(b'>');

fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, SEGMENT_ENCODE_SET).to_string()
}

#[derive(Clone)]
pub struct BasicAuth {
    user: String,
    password: String,
}

impl BasicAuth {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Elasticsearch REST client bound to one index.
#[derive(Clone, Debug)]
pub struct ElasticIndex {
    http: Client,
    base_url: String,
    index: String,
    auth: Option<BasicAuth>,
}

impl ElasticIndex {
    pub fn new(http: Client, base_url: &str, index: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            auth: None,
        }
    }

    pub fn with_auth(mut self, auth: Option<BasicAuth>) -> Self {
        self.auth = auth;
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    fn request(&self, method: Method, suffix: &str) -> Result<reqwest::RequestBuilder, IndexError> {
        let url = Url::parse(&format!(
            "{}/{}{suffix}",
            self.base_url,
            encode_segment(&self.index)
        ))?;
        let mut req = self
            .http
            .request(method, url)
            .header("User-Agent", crate::USER_AGENT);
        if let Some(auth) = &self.auth {
            req = req.basic_auth(&auth.user, Some(&auth.password));
        }
        Ok(req)
    }
}

impl SearchIndex for ElasticIndex {
    async fn ensure_index(&self) -> Result<EnsureOutcome, IndexError> {
        let response = self
            .request(Method::PUT, "")?
            .json(&schema::index_mapping())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(index = %self.index, "index created");
            return Ok(EnsureOutcome::Created);
        }

        let text = response.text().await.unwrap_or_default();
        let (kind, message) = parse_error(&text);
        if status == reqwest::StatusCode::BAD_REQUEST && kind.as_deref() == Some(ALREADY_EXISTS) {
            debug!(index = %self.index, "index already exists");
            return Ok(EnsureOutcome::AlreadyExists);
        }
        Err(IndexError::Api {
            code: status.as_u16(),
            message,
        })
    }

    async fn put_document(&self, id: &str, doc: &CourseDocument) -> Result<(), IndexError> {
        let response = self
            .request(Method::PUT, &format!("/_doc/{}", encode_segment(id)))?
            .json(doc)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let (_, message) = parse_error(&response.text().await.unwrap_or_default());
            return Err(IndexError::Api {
                code: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    async fn search(&self, body: &Value) -> Result<Vec<Value>, IndexError> {
        let response = self
            .request(Method::POST, "/_search")?
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let (_, message) = parse_error(&response.text().await.unwrap_or_default());
            return Err(IndexError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&text)?;
        debug!(hits = parsed.hits.hits.len(), "search complete");
        Ok(parsed.hits.hits.into_iter().map(|h| h.source).collect())
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Value,
}

/// Split an Elasticsearch error body into its `error.type` and a readable message.
fn parse_error(body: &str) -> (Option<String>, String) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, body.chars().take(200).collect());
    };
    let error = &value["error"];
    if let Some(text) = error.as_str() {
        return (None, text.to_string());
    }
    let kind = error["type"].as_str().map(String::from);
    let message = match (kind.as_deref(), error["reason"].as_str()) {
        (Some(kind), Some(reason)) => format!("{kind}: {reason}"),
        (None, Some(reason)) => reason.to_string(),
        (Some(kind), None) => kind.to_string(),
        (None, None) => body.chars().take(200).collect(),
    };
    (kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_segment_escapes_slash_and_space() {
        assert_eq!(encode_segment("CSE507_2247"), "CSE507_2247");
        assert_eq!(encode_segment("A/B 1"), "A%2FB%201");
    }

    #[test]
    fn parse_error_reads_type_and_reason() {
        let (kind, message) = parse_error(
            r#"{"error":{"type":"parsing_exception","reason":"unknown query [foo]"},"status":400}"#,
        );
        assert_eq!(kind.as_deref(), Some("parsing_exception"));
        assert_eq!(message, "parsing_exception: unknown query [foo]");
    }

    #[test]
    fn parse_error_falls_back_to_body_snippet() {
        let (kind, message) = parse_error("gateway timeout");
        assert!(kind.is_none());
        assert_eq!(message, "gateway timeout");
    }

    #[test]
    fn basic_auth_debug_hides_password() {
        let auth = BasicAuth::new("elastic", "hunter2");
        let debug = format!("{auth:?}");
        assert!(debug.contains("elastic"));
        assert!(!debug.contains("hunter2"));
    }
}
