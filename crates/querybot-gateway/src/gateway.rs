//! Gateway facade
//!
//! Single entry point for every surface (HTTP API, tests): takes a session id
//! and a raw message and always returns a `GatewayResponse`.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info};

use crate::auth::{AuthKind, AuthNegotiator};
use crate::config::GatewayConfig;
use crate::metrics;
use crate::remote::{
    FailureKind, RemoteClient, RemoteExecutor, RemoteFailure, RemoteQueryRequest,
    RemoteQueryResult,
};
use crate::response::GatewayResponse;
use crate::router::{self, Command, Route};
use crate::session::{DialogueTurn, Session, SessionStore};
use crate::translator::Translator;

const NO_SQL_FALLBACK: &str =
    "I couldn't turn that into a SQL query. Try rephrasing, or type /help for commands.";

/// Counters shown by `/usage`
#[derive(Debug, Default)]
pub struct GatewayStats {
    pub messages: AtomicU64,
    pub translations: AtomicU64,
    pub remote_calls: AtomicU64,
    pub remote_failures: AtomicU64,
}

pub struct QueryGateway {
    executor: Arc<RemoteExecutor>,
    sessions: SessionStore,
    translator: Arc<dyn Translator>,
    stats: GatewayStats,
}

impl QueryGateway {
    pub fn new(
        config: &GatewayConfig,
        translator: Arc<dyn Translator>,
    ) -> querybot_common::Result<Self> {
        let client = RemoteClient::new(&config.endpoint)?;
        let negotiator = Arc::new(AuthNegotiator::new(client, &config.endpoint));
        let executor = Arc::new(RemoteExecutor::new(negotiator, &config.endpoint));
        let sessions = SessionStore::new(config.default_database.clone(), config.context_cap);
        Ok(Self::from_parts(executor, sessions, translator))
    }

    pub fn from_parts(
        executor: Arc<RemoteExecutor>,
        sessions: SessionStore,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            executor,
            sessions,
            translator,
            stats: GatewayStats::default(),
        }
    }

    pub fn negotiator(&self) -> &Arc<AuthNegotiator> {
        self.executor.negotiator()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    /// Kind of the cached auth method, if negotiation has succeeded
    pub fn auth_kind(&self) -> Option<AuthKind> {
        self.negotiator().current().map(|method| method.kind())
    }

    pub async fn handle(&self, session_id: &str, message: &str) -> GatewayResponse {
        self.handle_with_database(session_id, message, None).await
    }

    /// Like `handle`, selecting `database` for the session first
    pub async fn handle_with_database(
        &self,
        session_id: &str,
        message: &str,
        database: Option<&str>,
    ) -> GatewayResponse {
        let handle = self.sessions.handle(session_id);
        let mut session = handle.lock().await;

        if let Some(database) = database.map(str::trim).filter(|db| !db.is_empty()) {
            session.set_database(database);
        }

        let route = router::classify(message);
        self.stats.messages.fetch_add(1, Ordering::Relaxed);
        metrics::record_message(route.name());
        info!(session_id, route = route.name(), database = %session.current_database, "Routing message");

        let dispatched = AssertUnwindSafe(self.dispatch(&mut session, route, message))
            .catch_unwind()
            .await;

        match dispatched {
            Ok(response) => response,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(session_id, "Panic while handling message: {}", detail);
                GatewayResponse::error(
                    FailureKind::ServerError,
                    "internal error while handling the message",
                )
            }
        }
    }

    async fn dispatch(&self, session: &mut Session, route: Route, raw: &str) -> GatewayResponse {
        match route {
            Route::Command(command) => self.run_command(session, command).await,
            Route::NaturalLanguage(text) => self.natural_language(session, raw, &text).await,
        }
    }

    async fn run_command(&self, session: &mut Session, command: Command) -> GatewayResponse {
        match command {
            Command::Help => GatewayResponse::text(router::help_text()),
            Command::DatabaseList => match self.list_databases().await {
                Ok(names) => GatewayResponse::text(render_database_list(&names)),
                Err(failure) => failure.into(),
            },
            Command::DatabaseSet(name) => {
                session.set_database(name.as_str());
                GatewayResponse::text(format!("Database set to: {}", name))
            }
            Command::Tables => {
                let database = session.current_database.clone();
                let request = RemoteQueryRequest::statement(router::TABLES_QUERY, &database);
                let result = self.execute(&request).await;
                table_response(result, database, router::TABLES_QUERY.to_string())
            }
            Command::Usage => GatewayResponse::text(self.usage_text()),
            Command::Clear => {
                session.clear();
                GatewayResponse::text("Conversation history cleared.")
            }
            Command::Unknown(raw) => GatewayResponse::text(format!(
                "Unknown command: {}. Type /help for available commands.",
                raw
            )),
        }
    }

    async fn natural_language(
        &self,
        session: &mut Session,
        raw: &str,
        text: &str,
    ) -> GatewayResponse {
        self.stats.translations.fetch_add(1, Ordering::Relaxed);
        let context = session.context();

        let translation = match self
            .translator
            .translate(text, &context, &session.current_database)
            .await
        {
            Ok(translation) => translation,
            Err(err) => {
                info!(
                    translator = self.translator.name(),
                    code = err.code(),
                    "Translation failed: {}",
                    err
                );
                return GatewayResponse::error(FailureKind::ServerError, err.to_string());
            }
        };

        let Some(statement) = translation.executable_statement() else {
            let explanation = translation.explanation.trim();
            return GatewayResponse::text(if explanation.is_empty() {
                NO_SQL_FALLBACK
            } else {
                explanation
            });
        };

        let database = translation
            .target_database(&session.current_database)
            .to_string();
        let request = RemoteQueryRequest::statement(statement, &database);
        let result = self.execute(&request).await;

        if result.is_success() {
            session.append_context(DialogueTurn {
                utterance: raw.to_string(),
                statement: statement.to_string(),
            });
        }
        table_response(result, database, statement.to_string())
    }

    async fn execute(&self, request: &RemoteQueryRequest) -> RemoteQueryResult {
        self.stats.remote_calls.fetch_add(1, Ordering::Relaxed);
        let result = self.executor.execute(request).await;
        if !result.is_success() {
            self.stats.remote_failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Database names from a metadata request
    pub async fn list_databases(&self) -> Result<Vec<String>, RemoteFailure> {
        names_from(self.execute(&RemoteQueryRequest::metadata()).await)
    }

    /// Base table names in `database`
    pub async fn list_tables(&self, database: &str) -> Result<Vec<String>, RemoteFailure> {
        let request = RemoteQueryRequest::statement(router::TABLES_QUERY, database);
        names_from(self.execute(&request).await)
    }

    fn usage_text(&self) -> String {
        let Some(usage) = self.translator.usage() else {
            return "Usage tracking not available".to_string();
        };
        format!(
            "Token Usage:\nDaily: {} / {} ({:.1}%)\nRemaining: {} tokens\nTranslations today: {}\n\n\
             Gateway:\nMessages: {}\nRemote calls: {} ({} failed)",
            group_thousands(usage.used),
            group_thousands(usage.limit),
            usage.percentage(),
            group_thousands(usage.remaining()),
            usage.requests,
            self.stats.messages.load(Ordering::Relaxed),
            self.stats.remote_calls.load(Ordering::Relaxed),
            self.stats.remote_failures.load(Ordering::Relaxed),
        )
    }
}

fn names_from(result: RemoteQueryResult) -> Result<Vec<String>, RemoteFailure> {
    match result {
        RemoteQueryResult::Failure(failure) => Err(failure),
        success => Ok(success.first_column().unwrap_or_default()),
    }
}

fn table_response(result: RemoteQueryResult, database: String, statement: String) -> GatewayResponse {
    match result {
        RemoteQueryResult::Success {
            columns,
            rows,
            row_count,
            elapsed_ms,
        } => GatewayResponse::Table {
            columns,
            rows,
            row_count,
            elapsed_ms,
            database,
            statement,
        },
        RemoteQueryResult::Failure(failure) => failure.into(),
    }
}

fn render_database_list(names: &[String]) -> String {
    let mut out = format!("Available databases ({}):", names.len());
    for name in names {
        out.push_str("\n• ");
        out.push_str(name);
    }
    out
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_database_list() {
        let names = vec!["master".to_string(), "sales".to_string()];
        assert_eq!(
            render_database_list(&names),
            "Available databases (2):\n• master\n• sales"
        );
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(500_000), "500,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
