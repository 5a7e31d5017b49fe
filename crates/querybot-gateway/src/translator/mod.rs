//! Natural-language to SQL translation
//!
//! The gateway treats the translator as a black box behind the `Translator`
//! trait. `OpenAiTranslator` talks to a chat-completions deployment;
//! `UnavailableTranslator` stands in when none is configured.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::session::DialogueTurn;
use querybot_common::{QueryBotError, Result};

pub use openai::OpenAiTranslator;

/// Translator output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// SQL text; empty means the utterance had no SQL intent
    #[serde(default, alias = "query")]
    pub statement: String,
    /// Target database, if the translator picked one
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub confidence: f64,
}

impl Translation {
    /// Trimmed statement, or None when there is nothing to run
    pub fn executable_statement(&self) -> Option<&str> {
        let statement = self.statement.trim();
        (!statement.is_empty()).then_some(statement)
    }

    /// Database to run against, falling back to `current`
    pub fn target_database<'a>(&'a self, current: &'a str) -> &'a str {
        self.database
            .as_deref()
            .map(str::trim)
            .filter(|db| !db.is_empty())
            .unwrap_or(current)
    }
}

/// Daily token usage, as reported by `/usage`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub used: u64,
    pub limit: u64,
    pub requests: u64,
}

impl UsageSummary {
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    pub fn percentage(&self) -> f64 {
        if self.limit == 0 {
            100.0
        } else {
            self.used as f64 / self.limit as f64 * 100.0
        }
    }
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        utterance: &str,
        context: &[DialogueTurn],
        current_database: &str,
    ) -> Result<Translation>;

    fn usage(&self) -> Option<UsageSummary> {
        None
    }

    fn name(&self) -> &'static str;
}

/// Placeholder used when no translator endpoint is configured
#[derive(Debug, Default)]
pub struct UnavailableTranslator;

#[async_trait]
impl Translator for UnavailableTranslator {
    async fn translate(
        &self,
        _utterance: &str,
        _context: &[DialogueTurn],
        _current_database: &str,
    ) -> Result<Translation> {
        Err(QueryBotError::ServiceUnavailable(
            "SQL translator not available".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_accepts_query_alias() {
        let t: Translation = serde_json::from_str(
            r#"{"query":"SELECT 1","database":"sales","explanation":"one","confidence":0.9}"#,
        )
        .unwrap();
        assert_eq!(t.executable_statement(), Some("SELECT 1"));
        assert_eq!(t.target_database("master"), "sales");
    }

    #[test]
    fn test_empty_statement_not_executable() {
        let t = Translation {
            statement: "   ".into(),
            explanation: "ambiguous question".into(),
            ..Default::default()
        };
        assert_eq!(t.executable_statement(), None);
        assert_eq!(t.target_database("master"), "master");
    }

    #[test]
    fn test_usage_summary_math() {
        let usage = UsageSummary {
            used: 125_000,
            limit: 500_000,
            requests: 10,
        };
        assert_eq!(usage.remaining(), 375_000);
        assert!((usage.percentage() - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_unavailable_translator() {
        let err = UnavailableTranslator
            .translate("anything", &[], "master")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAVAILABLE");
    }
}
