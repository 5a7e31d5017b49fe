//! Requests sent to the remote query endpoint

use serde::Serialize;

/// A remote query; statement-bearing variants carry their statement inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteQueryRequest {
    /// List databases visible to the endpoint
    Metadata,
    /// Run one SQL statement against `database`
    Statement { statement: String, database: String },
}

impl RemoteQueryRequest {
    pub fn metadata() -> Self {
        RemoteQueryRequest::Metadata
    }

    pub fn statement(statement: impl Into<String>, database: impl Into<String>) -> Self {
        RemoteQueryRequest::Statement {
            statement: statement.into(),
            database: database.into(),
        }
    }

    /// Label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteQueryRequest::Metadata => "metadata",
            RemoteQueryRequest::Statement { .. } => "single",
        }
    }

    pub fn database(&self) -> Option<&str> {
        match self {
            RemoteQueryRequest::Metadata => None,
            RemoteQueryRequest::Statement { database, .. } => Some(database),
        }
    }

    pub fn payload(&self) -> WirePayload<'_> {
        match self {
            RemoteQueryRequest::Metadata => WirePayload {
                query_type: "metadata",
                query: None,
                database: None,
            },
            RemoteQueryRequest::Statement {
                statement,
                database,
            } => WirePayload {
                query_type: "single",
                query: Some(statement),
                database: Some(database),
            },
        }
    }
}

/// JSON body understood by the endpoint
#[derive(Debug, Serialize)]
pub struct WirePayload<'a> {
    pub query_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_payload_has_no_statement() {
        let body = serde_json::to_value(RemoteQueryRequest::metadata().payload()).unwrap();
        assert_eq!(body, json!({"query_type": "metadata"}));
    }

    #[test]
    fn test_statement_payload() {
        let request = RemoteQueryRequest::statement("SELECT 1", "sales");
        let body = serde_json::to_value(request.payload()).unwrap();
        assert_eq!(
            body,
            json!({"query_type": "single", "query": "SELECT 1", "database": "sales"})
        );
        assert_eq!(request.kind(), "single");
        assert_eq!(request.database(), Some("sales"));
    }
}
