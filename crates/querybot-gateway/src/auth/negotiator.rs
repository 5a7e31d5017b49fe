//! Auth method negotiation and caching
//!
//! Candidates are probed in order with a metadata request. The first one the
//! endpoint accepts is cached for the whole process. Callers that hit a
//! 401/403 with the cached method ask for a refresh; refreshes are
//! single-flight and keyed by generation so a burst of failures re-probes the
//! candidate list once.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::method::{AuthKind, AuthMethod};
use crate::config::EndpointConfig;
use crate::metrics;
use crate::remote::client::{RemoteClient, TransportError};
use crate::remote::request::RemoteQueryRequest;
use crate::remote::result::{classify_status, error_message_from_body};

/// How a single probe ended
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// 200 with a JSON body
    Accepted,
    /// 401/403, next candidate is tried
    Rejected(StatusCode),
    /// Any other status; negotiation stops
    Aborted { status: StatusCode, message: String },
    /// 200 whose body is not JSON; negotiation stops
    InvalidBody(String),
    /// No HTTP status received; next candidate is tried
    Transport(TransportError),
}

impl ProbeOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Accepted => "accepted",
            ProbeOutcome::Rejected(_) => "rejected",
            ProbeOutcome::Aborted { .. } => "aborted",
            ProbeOutcome::InvalidBody(_) => "invalid_body",
            ProbeOutcome::Transport(TransportError::Timeout(_)) => "timeout",
            ProbeOutcome::Transport(TransportError::Unreachable(_)) => "unreachable",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Accepted => write!(f, "accepted"),
            ProbeOutcome::Rejected(status) => write!(
                f,
                "rejected (HTTP {}, {})",
                status.as_u16(),
                classify_status(*status)
            ),
            ProbeOutcome::Aborted { status, message } => {
                write!(f, "HTTP {}: {}", status.as_u16(), message)
            }
            ProbeOutcome::InvalidBody(msg) => write!(f, "unparseable 200 body: {}", msg),
            ProbeOutcome::Transport(err) => write!(f, "{}", err),
        }
    }
}

/// One candidate tried during negotiation
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeAttempt {
    pub candidate: AuthKind,
    pub outcome: ProbeOutcome,
    pub elapsed_ms: u64,
}

impl fmt::Display for ProbeAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({} ms)", self.candidate, self.outcome, self.elapsed_ms)
    }
}

/// Successful negotiation
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub method: AuthMethod,
    pub attempts: Vec<ProbeAttempt>,
}

/// No candidate was accepted
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{reason}")]
pub struct NegotiationFailed {
    pub reason: String,
    pub attempts: Vec<ProbeAttempt>,
}

impl NegotiationFailed {
    /// Reason followed by each attempt on its own line
    pub fn report(&self) -> String {
        let mut out = self.reason.clone();
        for attempt in &self.attempts {
            out.push_str("\n  - ");
            out.push_str(&attempt.to_string());
        }
        out
    }
}

/// A cached method together with the generation it was negotiated in
#[derive(Debug, Clone)]
pub struct Lease {
    pub generation: u64,
    pub method: AuthMethod,
}

#[derive(Debug)]
struct Snapshot {
    generation: u64,
    /// None until the first negotiation completes, or while a refresh runs
    outcome: Option<Result<AuthMethod, NegotiationFailed>>,
}

/// Process-wide auth state for one endpoint
pub struct AuthNegotiator {
    client: RemoteClient,
    candidates: Vec<AuthMethod>,
    probe_timeout: Duration,
    /// Swapped whole on publish; readers take a short-held read lock, never across an await
    state: RwLock<Arc<Snapshot>>,
    refresh_lock: Mutex<()>,
    probes: AtomicU64,
}

impl AuthNegotiator {
    pub fn new(client: RemoteClient, config: &EndpointConfig) -> Self {
        let candidates = client.endpoint().candidates(config);
        Self {
            client,
            candidates,
            probe_timeout: config.metadata_timeout(),
            state: RwLock::new(Arc::new(Snapshot {
                generation: 0,
                outcome: None,
            })),
            refresh_lock: Mutex::new(()),
            probes: AtomicU64::new(0),
        }
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    pub fn candidates(&self) -> &[AuthMethod] {
        &self.candidates
    }

    /// Total probes sent since startup
    pub fn probe_count(&self) -> u64 {
        self.probes.load(Ordering::Relaxed)
    }

    /// Currently cached method, if negotiation has succeeded
    pub fn current(&self) -> Option<AuthMethod> {
        match &self.snapshot().outcome {
            Some(Ok(method)) => Some(method.clone()),
            _ => None,
        }
    }

    /// Cached method, negotiating first if there is none
    pub async fn acquire(&self) -> Result<Lease, NegotiationFailed> {
        let snapshot = self.snapshot();
        if let Some(Ok(method)) = &snapshot.outcome {
            return Ok(Lease {
                generation: snapshot.generation,
                method: method.clone(),
            });
        }
        self.refresh(snapshot.generation).await
    }

    /// Re-negotiate unless a negotiation newer than `seen_generation` exists
    pub async fn refresh(&self, seen_generation: u64) -> Result<Lease, NegotiationFailed> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.snapshot();
        if current.generation > seen_generation {
            if let Some(outcome) = &current.outcome {
                return outcome.clone().map(|method| Lease {
                    generation: current.generation,
                    method,
                });
            }
        }

        self.publish(Snapshot {
            generation: current.generation,
            outcome: None,
        });

        let outcome = self.negotiate().await.map(|negotiated| negotiated.method);
        let generation = current.generation + 1;
        metrics::record_negotiation(outcome.is_ok());
        match &outcome {
            Ok(method) => info!(generation, auth = %method.kind(), "Auth method negotiated"),
            Err(failure) => warn!(generation, "Auth negotiation failed: {}", failure.report()),
        }

        self.publish(Snapshot {
            generation,
            outcome: Some(outcome.clone()),
        });

        outcome.map(|method| Lease { generation, method })
    }

    /// Probe every candidate in order without touching the cache
    pub async fn negotiate(&self) -> Result<Negotiated, NegotiationFailed> {
        let request = RemoteQueryRequest::metadata();
        let mut attempts = Vec::with_capacity(self.candidates.len());

        for candidate in &self.candidates {
            let started = Instant::now();
            self.probes.fetch_add(1, Ordering::Relaxed);

            let outcome = match self
                .client
                .send(candidate, &request, self.probe_timeout)
                .await
            {
                Ok(response) if response.status == StatusCode::OK => {
                    match serde_json::from_str::<serde_json::Value>(&response.body) {
                        Ok(_) => ProbeOutcome::Accepted,
                        Err(e) => ProbeOutcome::InvalidBody(e.to_string()),
                    }
                }
                Ok(response)
                    if response.status == StatusCode::UNAUTHORIZED
                        || response.status == StatusCode::FORBIDDEN =>
                {
                    ProbeOutcome::Rejected(response.status)
                }
                Ok(response) => ProbeOutcome::Aborted {
                    status: response.status,
                    message: error_message_from_body(response.status, &response.body),
                },
                Err(err) => ProbeOutcome::Transport(err),
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            metrics::record_auth_probe(candidate.kind().as_str(), outcome.label());
            info!(
                candidate = %candidate.kind(),
                outcome = outcome.label(),
                elapsed_ms,
                "Auth probe finished"
            );

            attempts.push(ProbeAttempt {
                candidate: candidate.kind(),
                outcome: outcome.clone(),
                elapsed_ms,
            });

            match outcome {
                ProbeOutcome::Accepted => {
                    return Ok(Negotiated {
                        method: candidate.clone(),
                        attempts,
                    })
                }
                ProbeOutcome::Rejected(_) | ProbeOutcome::Transport(_) => continue,
                ProbeOutcome::Aborted { .. } | ProbeOutcome::InvalidBody(_) => {
                    return Err(NegotiationFailed {
                        reason: format!(
                            "endpoint answered the {} probe with an unexpected response",
                            candidate.kind()
                        ),
                        attempts,
                    })
                }
            }
        }

        Err(NegotiationFailed {
            reason: format!(
                "none of {} authentication methods was accepted",
                self.candidates.len()
            ),
            attempts,
        })
    }

    /// Clone of the current snapshot; the read lock is released on return
    fn snapshot(&self) -> Arc<Snapshot> {
        self.state.read().clone()
    }

    fn publish(&self, snapshot: Snapshot) {
        *self.state.write() = Arc::new(snapshot);
    }
}
