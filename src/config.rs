//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reqwest::Client;
use url::Url;

use crate::catalog::{self, CatalogClient, ListingFilter};
use crate::index::{self, BasicAuth, ElasticIndex};
use crate::llm::{self, GeminiClient, LlmBackend, LlmError, OpenAiClient};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name} URL \"{value}\": {source}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        source: url::ParseError,
    },

    #[error("--es-user and --es-password must be given together")]
    PartialCredentials,

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Import a course catalog into Elasticsearch and answer natural-language
/// course questions against it.
#[derive(Debug, Parser)]
#[command(name = "course-search", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub es: EsArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one catalog listing, enrich each class, and index it.
    Import(ImportArgs),
    /// Serve POST /nlp-query.
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct EsArgs {
    /// Elasticsearch base URL.
    #[arg(long, env = "ES_URL", default_value = index::elastic::DEFAULT_URL, global = true)]
    pub es_url: String,

    #[arg(long, env = "ES_INDEX", default_value = index::DEFAULT_INDEX, global = true)]
    pub es_index: String,

    #[arg(long, env = "ES_USER", global = true)]
    pub es_user: Option<String>,

    #[arg(long, env = "ES_PASSWORD", hide_env_values = true, global = true)]
    pub es_password: Option<String>,

    /// Accept self-signed certificates from Elasticsearch.
    #[arg(long, env = "ES_INSECURE", global = true)]
    pub es_insecure: bool,

    /// Total timeout for one Elasticsearch request, in seconds.
    #[arg(long, default_value_t = 30, global = true)]
    pub es_timeout: u64,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[arg(long, env = "CATALOG_URL", default_value = catalog::DEFAULT_BASE_URL)]
    pub catalog_url: String,

    /// Bearer token for the catalog API.
    #[arg(long, env = "CATALOG_TOKEN", default_value = "null", hide_env_values = true)]
    pub catalog_token: String,

    #[arg(long, default_value = "TEMPE")]
    pub campus: String,

    /// Term code, e.g. 2247 for Fall 2024.
    #[arg(long, default_value = "2247")]
    pub term: String,

    #[arg(long, default_value = "grad")]
    pub level: String,

    /// Campus/online selection: A (all), C (campus), O (online).
    #[arg(long, default_value = "A")]
    pub online: String,

    #[arg(long)]
    pub subject: Option<String>,

    /// Records processed concurrently.
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Total timeout for one catalog request, in seconds.
    #[arg(long, default_value_t = 30)]
    pub catalog_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmProvider {
    Openai,
    Gemini,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "BIND", default_value = "127.0.0.1:5001")]
    pub bind: SocketAddr,

    #[arg(long, value_enum, default_value_t = LlmProvider::Openai)]
    pub llm_provider: LlmProvider,

    /// Model name; defaults depend on the provider.
    #[arg(long)]
    pub llm_model: Option<String>,

    /// Override the provider's API base URL.
    #[arg(long)]
    pub llm_base_url: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    pub openai_api_key: String,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, default_value = "")]
    pub gemini_api_key: String,

    /// Total timeout for one completion request, in seconds.
    #[arg(long, default_value_t = 60)]
    pub llm_timeout: u64,

    /// Per-request timeout for the HTTP server, in seconds.
    #[arg(long, default_value_t = 90)]
    pub request_timeout: u64,
}

fn http_client(timeout_secs: u64, accept_invalid_certs: bool) -> Result<Client, ConfigError> {
    Ok(Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()?)
}

fn validate_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(drop)
        .map_err(|source| ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
            source,
        })
}

impl EsArgs {
    pub fn index(&self) -> Result<ElasticIndex, ConfigError> {
        validate_url("Elasticsearch", &self.es_url)?;
        let auth = match (&self.es_user, &self.es_password) {
            (Some(user), Some(password)) => Some(BasicAuth::new(user, password)),
            (None, None) => None,
            _ => return Err(ConfigError::PartialCredentials),
        };
        let http = http_client(self.es_timeout, self.es_insecure)?;
        Ok(ElasticIndex::new(http, &self.es_url, &self.es_index).with_auth(auth))
    }
}

impl ImportArgs {
    pub fn catalog(&self) -> Result<CatalogClient, ConfigError> {
        validate_url("catalog", &self.catalog_url)?;
        let http = http_client(self.catalog_timeout, false)?;
        Ok(CatalogClient::new(http, &self.catalog_url, &self.catalog_token))
    }

    pub fn filter(&self) -> ListingFilter {
        ListingFilter {
            campus: self.campus.clone(),
            term: self.term.clone(),
            level: self.level.clone(),
            campus_or_online: self.online.clone(),
            subject: self
                .subject
                .clone()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

impl ServeArgs {
    pub fn llm(&self) -> Result<LlmBackend, ConfigError> {
        if let Some(base) = &self.llm_base_url {
            validate_url("LLM", base)?;
        }
        let http = http_client(self.llm_timeout, false)?;
        let model = self.llm_model.as_deref();
        let base = self.llm_base_url.as_deref();
        Ok(match self.llm_provider {
            LlmProvider::Openai => {
                LlmBackend::OpenAi(OpenAiClient::new(http, &self.openai_api_key, model, base)?)
            }
            LlmProvider::Gemini => {
                LlmBackend::Gemini(GeminiClient::new(http, &self.gemini_api_key, model, base)?)
            }
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }

    pub fn model_name(&self) -> &str {
        match (self.llm_model.as_deref(), self.llm_provider) {
            (Some(model), _) => model,
            (None, LlmProvider::Openai) => llm::openai::DEFAULT_MODEL,
            (None, LlmProvider::Gemini) => llm::gemini::DEFAULT_MODEL,
        }
    }
}
