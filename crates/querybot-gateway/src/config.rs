//! Gateway configuration
//!
//! Built from CLI arguments (see `main.rs`) or programmatically in tests.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote query endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Endpoint URL, possibly with an embedded credential parameter
    pub url: String,

    /// Separately configured credential (header or query parameter candidate)
    #[serde(default)]
    pub credential: Option<String>,

    /// Header used by the header-credential candidate
    #[serde(default = "default_header_name")]
    pub header_name: String,

    /// Query parameter holding the credential (detection and query-param candidate)
    #[serde(default = "default_credential_param")]
    pub credential_param: String,

    /// Timeout for metadata requests and negotiation probes
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,

    /// Timeout for statement execution
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,

    /// TCP connect timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7071/api/QuerySQL".to_string(),
            credential: None,
            header_name: default_header_name(),
            credential_param: default_credential_param(),
            metadata_timeout_secs: default_metadata_timeout(),
            statement_timeout_secs: default_statement_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl EndpointConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub endpoint: EndpointConfig,

    /// Database a new session starts on
    #[serde(default = "default_database")]
    pub default_database: String,

    /// Maximum dialogue turns kept per session
    #[serde(default = "default_context_cap")]
    pub context_cap: usize,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            default_database: default_database(),
            context_cap: default_context_cap(),
            http_port: default_http_port(),
        }
    }
}

/// Translator (chat-completions) settings, read from `TRANSLATOR__*`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Full chat-completions URL; translator disabled when absent
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Header carrying the API key
    #[serde(default = "default_translator_key_header")]
    pub key_header: String,

    #[serde(default = "default_max_daily_tokens")]
    pub max_daily_tokens: u64,

    #[serde(default = "default_translator_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            key_header: default_translator_key_header(),
            max_daily_tokens: default_max_daily_tokens(),
            request_timeout_secs: default_translator_timeout(),
        }
    }
}

impl TranslatorConfig {
    /// Load from `TRANSLATOR__URL`, `TRANSLATOR__API_KEY`, ...
    pub fn from_env() -> querybot_common::Result<Self> {
        Ok(querybot_common::config::load_from_env("TRANSLATOR")?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// Default value helpers
fn default_header_name() -> String { "x-functions-key".to_string() }
fn default_credential_param() -> String { "code".to_string() }
fn default_metadata_timeout() -> u64 { 15 }
fn default_statement_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 5 }
fn default_database() -> String { "master".to_string() }
fn default_context_cap() -> usize { 20 }
fn default_http_port() -> u16 { 8000 }
fn default_translator_key_header() -> String { "api-key".to_string() }
fn default_max_daily_tokens() -> u64 { 500_000 }
fn default_translator_timeout() -> u64 { 30 }
