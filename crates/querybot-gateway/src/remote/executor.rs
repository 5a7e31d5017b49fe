//! Remote executor
//!
//! Sends one request with the negotiated auth method and normalizes whatever
//! comes back into a `RemoteQueryResult`. The only retry is a single
//! re-negotiation after the cached method is rejected.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::{info, warn};

use super::client::{RawResponse, TransportError};
use super::request::RemoteQueryRequest;
use super::result::{
    classify_status, error_message_from_body, parse_success_body, FailureKind, RemoteFailure,
    RemoteQueryResult, Tabular,
};
use crate::auth::AuthNegotiator;
use crate::config::EndpointConfig;
use crate::metrics;

pub struct RemoteExecutor {
    negotiator: Arc<AuthNegotiator>,
    metadata_timeout: Duration,
    statement_timeout: Duration,
}

impl RemoteExecutor {
    pub fn new(negotiator: Arc<AuthNegotiator>, config: &EndpointConfig) -> Self {
        Self {
            negotiator,
            metadata_timeout: config.metadata_timeout(),
            statement_timeout: config.statement_timeout(),
        }
    }

    pub fn negotiator(&self) -> &Arc<AuthNegotiator> {
        &self.negotiator
    }

    fn timeout_for(&self, request: &RemoteQueryRequest) -> Duration {
        match request {
            RemoteQueryRequest::Metadata => self.metadata_timeout,
            RemoteQueryRequest::Statement { .. } => self.statement_timeout,
        }
    }

    /// Execute `request`; never fails, failures are part of the result
    pub async fn execute(&self, request: &RemoteQueryRequest) -> RemoteQueryResult {
        let started = Instant::now();
        let result = self.run(request, started).await;
        let elapsed = started.elapsed();

        metrics::record_remote_call(request.kind(), result.outcome(), elapsed.as_secs_f64());
        match &result {
            RemoteQueryResult::Success { row_count, .. } => info!(
                kind = request.kind(),
                database = request.database().unwrap_or("-"),
                rows = row_count,
                elapsed_ms = elapsed.as_millis() as u64,
                "Remote query succeeded"
            ),
            RemoteQueryResult::Failure(failure) => warn!(
                kind = request.kind(),
                database = request.database().unwrap_or("-"),
                failure = %failure.kind,
                status = ?failure.http_status,
                elapsed_ms = elapsed.as_millis() as u64,
                "Remote query failed: {}",
                failure.message
            ),
        }

        result
    }

    async fn run(&self, request: &RemoteQueryRequest, started: Instant) -> RemoteQueryResult {
        let lease = match self.negotiator.acquire().await {
            Ok(lease) => lease,
            Err(failure) => {
                return RemoteQueryResult::failure(FailureKind::NegotiationFailed, failure.report())
            }
        };

        let client = self.negotiator.client();
        let timeout = self.timeout_for(request);

        let response = match client.send(&lease.method, request, timeout).await {
            Ok(response) => response,
            Err(err) => return transport_failure(err),
        };

        if !is_auth_rejection(response.status) {
            return interpret(response, started);
        }

        warn!(
            status = response.status.as_u16(),
            auth = %lease.method.kind(),
            "Cached auth method rejected, re-negotiating"
        );

        let lease = match self.negotiator.refresh(lease.generation).await {
            Ok(lease) => lease,
            Err(failure) => {
                return RemoteQueryResult::Failure(
                    RemoteFailure::new(
                        FailureKind::AuthFailed,
                        format!("credential rejected; re-negotiation failed: {}", failure),
                    )
                    .with_status(response.status),
                )
            }
        };

        match client.send(&lease.method, request, timeout).await {
            Ok(response) => interpret(response, started),
            Err(err) => transport_failure(err),
        }
    }
}

fn is_auth_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

fn transport_failure(err: TransportError) -> RemoteQueryResult {
    match err {
        TransportError::Timeout(after) => RemoteQueryResult::failure(
            FailureKind::Timeout,
            format!("remote endpoint did not answer within {}s", after.as_secs()),
        ),
        TransportError::Unreachable(msg) => {
            RemoteQueryResult::failure(FailureKind::Unreachable, msg)
        }
    }
}

fn interpret(response: RawResponse, started: Instant) -> RemoteQueryResult {
    let status = response.status;

    if status == StatusCode::OK {
        return match parse_success_body(&response.body) {
            Ok(Tabular { columns, rows }) => RemoteQueryResult::Success {
                row_count: rows.len(),
                columns,
                rows,
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
            Err(msg) => RemoteQueryResult::Failure(
                RemoteFailure::new(FailureKind::Malformed, msg).with_status(status),
            ),
        };
    }

    // Still rejected after a fresh negotiation
    let kind = if is_auth_rejection(status) {
        FailureKind::AuthFailed
    } else {
        classify_status(status)
    };

    RemoteQueryResult::Failure(
        RemoteFailure::new(kind, error_message_from_body(status, &response.body))
            .with_status(status),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_interpret_statuses() {
        let started = Instant::now();
        let cases = [
            (404, FailureKind::NotFound),
            (400, FailureKind::Malformed),
            (500, FailureKind::ServerError),
            (503, FailureKind::ServerError),
            (302, FailureKind::ServerError),
            (403, FailureKind::AuthFailed),
        ];
        for (status, expected) in cases {
            match interpret(raw(status, r#"{"error":"nope"}"#), started) {
                RemoteQueryResult::Failure(f) => {
                    assert_eq!(f.kind, expected, "status {}", status);
                    assert_eq!(f.http_status, Some(status));
                    assert_eq!(f.message, "nope");
                }
                other => panic!("expected failure, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_interpret_unparseable_success() {
        match interpret(raw(200, "<html>oops</html>"), Instant::now()) {
            RemoteQueryResult::Failure(f) => assert_eq!(f.kind, FailureKind::Malformed),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_interpret_rows() {
        match interpret(raw(200, r#"{"rows":[{"id":1},{"id":2}]}"#), Instant::now()) {
            RemoteQueryResult::Success {
                columns, row_count, ..
            } => {
                assert_eq!(columns, vec!["id"]);
                assert_eq!(row_count, 2);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_transport_failures() {
        let timeout = transport_failure(TransportError::Timeout(Duration::from_secs(30)));
        assert_eq!(timeout.outcome(), "timeout");
        let unreachable = transport_failure(TransportError::Unreachable("refused".into()));
        assert_eq!(unreachable.outcome(), "unreachable");
    }
}
