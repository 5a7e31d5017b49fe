#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use querybot_common::{QueryBotError, Result};
use querybot_gateway::session::DialogueTurn;
use querybot_gateway::translator::{Translation, Translator, UsageSummary};
use querybot_gateway::{EndpointConfig, GatewayConfig, QueryGateway};
use serde_json::Value;
use wiremock::{MockServer, Request};

pub const KEY: &str = "functions-key-0123456789abcdef";

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Endpoint config pointing at `server`, with short timeouts
pub fn endpoint_config(server: &MockServer, query: &str, key: Option<&str>) -> EndpointConfig {
    EndpointConfig {
        url: format!("{}/api/QuerySQL{}", server.uri(), query),
        credential: key.map(String::from),
        metadata_timeout_secs: 1,
        statement_timeout_secs: 1,
        connect_timeout_secs: 1,
        ..Default::default()
    }
}

pub fn gateway(endpoint: EndpointConfig, translator: Arc<dyn Translator>) -> QueryGateway {
    let config = GatewayConfig {
        endpoint,
        ..Default::default()
    };
    QueryGateway::new(&config, translator).unwrap()
}

/// Bodies of every request the mock server saw
pub async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request: &Request| request.body_json::<Value>().unwrap_or(Value::Null))
        .collect()
}

pub async fn metadata_request_count(server: &MockServer) -> usize {
    request_bodies(server)
        .await
        .iter()
        .filter(|body| body["query_type"] == "metadata")
        .count()
}

/// What the gateway passed to the translator
#[derive(Debug, Clone)]
pub struct TranslateCall {
    pub utterance: String,
    pub context: Vec<DialogueTurn>,
    pub current_database: String,
}

pub enum Scripted {
    Reply(Translation),
    Fail(QueryBotError),
    Panic,
}

/// Translator returning queued replies in order
#[derive(Default)]
pub struct ScriptedTranslator {
    replies: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<TranslateCall>>,
    usage: Option<UsageSummary>,
}

impl ScriptedTranslator {
    pub fn new(replies: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    pub fn with_usage(replies: Vec<Scripted>, usage: UsageSummary) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            usage: Some(usage),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<TranslateCall> {
        self.calls.lock().clone()
    }
}

pub fn statement(sql: &str, database: Option<&str>) -> Scripted {
    Scripted::Reply(Translation {
        statement: sql.to_string(),
        database: database.map(String::from),
        explanation: "generated".to_string(),
        confidence: 0.9,
    })
}

pub fn no_sql(explanation: &str) -> Scripted {
    Scripted::Reply(Translation {
        statement: String::new(),
        database: None,
        explanation: explanation.to_string(),
        confidence: 0.1,
    })
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(
        &self,
        utterance: &str,
        context: &[DialogueTurn],
        current_database: &str,
    ) -> Result<Translation> {
        self.calls.lock().push(TranslateCall {
            utterance: utterance.to_string(),
            context: context.to_vec(),
            current_database: current_database.to_string(),
        });
        let next = self.replies.lock().pop_front();
        match next {
            Some(Scripted::Reply(translation)) => Ok(translation),
            Some(Scripted::Fail(err)) => Err(err),
            Some(Scripted::Panic) => panic!("translator blew up"),
            None => Err(QueryBotError::TranslationFailed("script exhausted".into())),
        }
    }

    fn usage(&self) -> Option<UsageSummary> {
        self.usage.clone()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
