//! Normalized gateway output

use serde::Serialize;
use serde_json::Value;

use crate::remote::result::value_to_text;
use crate::remote::{FailureKind, RemoteFailure};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayResponse {
    Text {
        content: String,
    },
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
        row_count: usize,
        elapsed_ms: u64,
        database: String,
        statement: String,
    },
    Error {
        kind: FailureKind,
        message: String,
    },
}

impl GatewayResponse {
    pub fn text(content: impl Into<String>) -> Self {
        GatewayResponse::Text {
            content: content.into(),
        }
    }

    pub fn error(kind: FailureKind, message: impl Into<String>) -> Self {
        GatewayResponse::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, GatewayResponse::Error { .. })
    }

    /// Plain-text rendering shared by every surface
    pub fn render(&self) -> String {
        match self {
            GatewayResponse::Text { content } => content.clone(),
            GatewayResponse::Error { kind, message } => format!("{}: {}", kind, message),
            GatewayResponse::Table {
                columns,
                rows,
                row_count,
                elapsed_ms,
                database,
                ..
            } => {
                let mut out = String::new();
                if !columns.is_empty() {
                    out.push_str(&columns.join(" | "));
                    out.push('\n');
                }
                for row in rows {
                    let cells: Vec<String> = row.iter().map(value_to_text).collect();
                    out.push_str(&cells.join(" | "));
                    out.push('\n');
                }
                out.push_str(&format!(
                    "({} row{} from {} in {} ms)",
                    row_count,
                    if *row_count == 1 { "" } else { "s" },
                    database,
                    elapsed_ms
                ));
                out
            }
        }
    }
}

impl From<RemoteFailure> for GatewayResponse {
    fn from(failure: RemoteFailure) -> Self {
        GatewayResponse::Error {
            kind: failure.kind,
            message: failure.message,
        }
    }
}
