//! Normalized results from the remote query endpoint

use std::fmt;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

/// Non-200 bodies are quoted back at most this many characters
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Failure taxonomy surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AuthFailed,
    NotFound,
    Forbidden,
    Malformed,
    Timeout,
    Unreachable,
    ServerError,
    NegotiationFailed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::AuthFailed => "auth_failed",
            FailureKind::NotFound => "not_found",
            FailureKind::Forbidden => "forbidden",
            FailureKind::Malformed => "malformed",
            FailureKind::Timeout => "timeout",
            FailureKind::Unreachable => "unreachable",
            FailureKind::ServerError => "server_error",
            FailureKind::NegotiationFailed => "negotiation_failed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed remote call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl RemoteFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.http_status = Some(status.as_u16());
        self
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of one remote call
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteQueryResult {
    Success {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
        row_count: usize,
        elapsed_ms: u64,
    },
    Failure(RemoteFailure),
}

impl RemoteQueryResult {
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        RemoteQueryResult::Failure(RemoteFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RemoteQueryResult::Success { .. })
    }

    /// Outcome label for metrics
    pub fn outcome(&self) -> &'static str {
        match self {
            RemoteQueryResult::Success { .. } => "success",
            RemoteQueryResult::Failure(f) => f.kind.as_str(),
        }
    }

    /// First column of every row, as strings
    pub fn first_column(&self) -> Option<Vec<String>> {
        match self {
            RemoteQueryResult::Success { rows, .. } => Some(
                rows.iter()
                    .filter_map(|row| row.first())
                    .map(value_to_text)
                    .collect(),
            ),
            RemoteQueryResult::Failure(_) => None,
        }
    }
}

/// Map a non-200 status to a failure kind
pub fn classify_status(status: StatusCode) -> FailureKind {
    match status.as_u16() {
        401 => FailureKind::AuthFailed,
        403 => FailureKind::Forbidden,
        404 => FailureKind::NotFound,
        400 => FailureKind::Malformed,
        _ => FailureKind::ServerError,
    }
}

/// Parsed tabular payload of a 200 response
#[derive(Debug, Clone, PartialEq)]
pub struct Tabular {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Parse a 200 body into rows, or describe why it is malformed
pub fn parse_success_body(body: &str) -> Result<Tabular, String> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| format!("response is not valid JSON: {}", e))?;

    let object = match value {
        Value::Object(map) => map,
        _ => return Err("response is not a JSON object".to_string()),
    };

    if let Some(rows) = object.get("rows") {
        let rows = rows
            .as_array()
            .ok_or_else(|| "'rows' is not an array".to_string())?;
        return tabulate_rows(rows);
    }

    if let Some(databases) = object.get("databases") {
        let databases = databases
            .as_array()
            .ok_or_else(|| "'databases' is not an array".to_string())?;
        return Ok(Tabular {
            columns: vec!["name".to_string()],
            rows: databases.iter().map(|db| vec![db.clone()]).collect(),
        });
    }

    match object.get("error").and_then(Value::as_str) {
        Some(error) => Err(error.to_string()),
        None => Err("response has neither 'rows' nor 'databases'".to_string()),
    }
}

fn tabulate_rows(rows: &[Value]) -> Result<Tabular, String> {
    let objects: Vec<&Map<String, Value>> = rows
        .iter()
        .map(|row| {
            row.as_object()
                .ok_or_else(|| "row is not a JSON object".to_string())
        })
        .collect::<Result<_, _>>()?;

    let columns: Vec<String> = objects
        .first()
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default();

    let rows = objects
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| row.get(column).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(Tabular { columns, rows })
}

/// Message for a non-200 response
pub fn error_message_from_body(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in ["error", "message"] {
            if let Some(text) = map.get(field).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}

/// Render a JSON cell for text output
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
