//! Chat-completions translator (Azure OpenAI style deployment URL + `api-key`)

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Translation, Translator, UsageSummary};
use crate::config::TranslatorConfig;
use crate::session::DialogueTurn;
use querybot_common::{QueryBotError, Result};

const SYSTEM_PROMPT: &str = "You translate questions about SQL Server databases into T-SQL. \
Reply with a single JSON object: {\"query\": string, \"database\": string or null, \
\"explanation\": string, \"confidence\": number between 0 and 1}. \
Use an empty query when the question cannot be answered with SQL, and say why in the explanation. \
Only produce read-only SELECT statements.";

/// Daily token budget, reset at UTC midnight
#[derive(Debug)]
struct TokenBudget {
    limit: u64,
    state: Mutex<BudgetState>,
}

#[derive(Debug)]
struct BudgetState {
    day: NaiveDate,
    used: u64,
    requests: u64,
}

impl TokenBudget {
    fn new(limit: u64) -> Self {
        Self {
            limit,
            state: Mutex::new(BudgetState {
                day: Utc::now().date_naive(),
                used: 0,
                requests: 0,
            }),
        }
    }

    fn roll_over(state: &mut BudgetState) {
        let today = Utc::now().date_naive();
        if state.day != today {
            state.day = today;
            state.used = 0;
            state.requests = 0;
        }
    }

    fn check(&self) -> Result<()> {
        let mut state = self.state.lock();
        Self::roll_over(&mut state);
        if state.used >= self.limit {
            return Err(QueryBotError::RateLimited(format!(
                "daily token budget of {} exhausted",
                self.limit
            )));
        }
        Ok(())
    }

    fn record(&self, tokens: u64) {
        let mut state = self.state.lock();
        Self::roll_over(&mut state);
        state.used = state.used.saturating_add(tokens);
        state.requests += 1;
    }

    fn summary(&self) -> UsageSummary {
        let mut state = self.state.lock();
        Self::roll_over(&mut state);
        UsageSummary {
            used: state.used,
            limit: self.limit,
            requests: state.requests,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

pub struct OpenAiTranslator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    key_header: String,
    budget: TokenBudget,
}

impl OpenAiTranslator {
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| QueryBotError::ConfigError("translator URL not set".into()))?;
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| QueryBotError::ConfigError("translator API key not set".into()))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| QueryBotError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            api_key,
            key_header: config.key_header.clone(),
            budget: TokenBudget::new(config.max_daily_tokens),
        })
    }

    fn build_messages(
        utterance: &str,
        context: &[DialogueTurn],
        current_database: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(context.len() * 2 + 2);
        messages.push(ChatMessage {
            role: "system".into(),
            content: format!("{}\nCurrent database: {}", SYSTEM_PROMPT, current_database),
        });
        for turn in context {
            messages.push(ChatMessage {
                role: "user".into(),
                content: turn.utterance.clone(),
            });
            messages.push(ChatMessage {
                role: "assistant".into(),
                content: turn.statement.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".into(),
            content: utterance.to_string(),
        });
        messages
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(
        &self,
        utterance: &str,
        context: &[DialogueTurn],
        current_database: &str,
    ) -> Result<Translation> {
        self.budget.check()?;

        let request = ChatRequest {
            messages: Self::build_messages(utterance, context, current_database),
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(turns = context.len(), current_database, "Calling translator");

        let response = self
            .client
            .post(&self.url)
            .header(self.key_header.as_str(), self.api_key.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QueryBotError::TranslationFailed("translator timed out".into())
                } else {
                    QueryBotError::ServiceUnavailable(format!(
                        "translator unreachable: {}",
                        e.without_url()
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Translator returned an error");
            return Err(match status.as_u16() {
                429 => QueryBotError::RateLimited("translator rate limit reached".into()),
                401 | 403 => {
                    QueryBotError::AuthenticationFailed("translator rejected the API key".into())
                }
                _ => QueryBotError::TranslationFailed(format!(
                    "translator returned HTTP {}: {}",
                    status.as_u16(),
                    body.chars().take(200).collect::<String>()
                )),
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| QueryBotError::TranslationFailed(format!("bad translator reply: {}", e)))?;

        let tokens = chat.usage.map(|u| u.total_tokens).unwrap_or(0);
        self.budget.record(tokens);

        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| QueryBotError::TranslationFailed("translator returned no choices".into()))?;

        serde_json::from_str::<Translation>(&content).map_err(|e| {
            QueryBotError::TranslationFailed(format!("translator reply is not a translation: {}", e))
        })
    }

    fn usage(&self) -> Option<UsageSummary> {
        Some(self.budget.summary())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: String, max_daily_tokens: u64) -> TranslatorConfig {
        TranslatorConfig {
            url: Some(url),
            api_key: Some("translator-key".into()),
            max_daily_tokens,
            ..Default::default()
        }
    }

    fn completion(content: serde_json::Value, tokens: u64) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content.to_string()}}],
            "usage": {"total_tokens": tokens}
        })
    }

    #[test]
    fn test_context_replayed_in_order() {
        let context = vec![DialogueTurn {
            utterance: "count orders".into(),
            statement: "SELECT COUNT(*) FROM Orders".into(),
        }];
        let messages = OpenAiTranslator::build_messages("and customers?", &context, "sales");
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert!(messages[0].content.contains("Current database: sales"));
    }

    #[tokio::test]
    async fn test_translate_parses_reply_and_tracks_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("api-key", "translator-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                json!({"query": "SELECT 1", "database": null, "explanation": "one", "confidence": 0.8}),
                120,
            )))
            .mount(&server)
            .await;

        let translator = OpenAiTranslator::new(&config(server.uri(), 1000)).unwrap();
        let t = translator.translate("one please", &[], "master").await.unwrap();
        assert_eq!(t.statement, "SELECT 1");
        assert_eq!(t.database, None);

        let usage = translator.usage().unwrap();
        assert_eq!(usage.used, 120);
        assert_eq!(usage.requests, 1);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_skips_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                json!({"query": "SELECT 1", "explanation": "", "confidence": 1.0}),
                500,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let translator = OpenAiTranslator::new(&config(server.uri(), 500)).unwrap();
        translator.translate("first", &[], "master").await.unwrap();
        let err = translator.translate("second", &[], "master").await.unwrap_err();
        assert_eq!(err.code(), "RESOURCE_EXHAUSTED");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let translator = OpenAiTranslator::new(&config(server.uri(), 1000)).unwrap();
        let err = translator.translate("q", &[], "master").await.unwrap_err();
        assert!(matches!(err, QueryBotError::RateLimited(_)));
    }

    #[test]
    fn test_missing_settings_rejected() {
        assert!(OpenAiTranslator::new(&TranslatorConfig::default()).is_err());
    }
}
