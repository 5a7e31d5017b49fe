//! Authentication against the remote query endpoint
//!
//! - `endpoint`: URL parsing, embedded-credential detection, candidate order
//! - `method`: the concrete auth methods
//! - `negotiator`: probing and process-wide caching
//!
//! # Usage
//!
//! ```ignore
//! let client = RemoteClient::new(&config)?;
//! let negotiator = AuthNegotiator::new(client, &config);
//!
//! // Cached after the first success
//! let lease = negotiator.acquire().await?;
//!
//! // After a 401/403 with that method
//! let lease = negotiator.refresh(lease.generation).await?;
//! ```

pub mod endpoint;
pub mod method;
pub mod negotiator;

pub use endpoint::Endpoint;
pub use method::{AuthKind, AuthMethod};
pub use negotiator::{
    AuthNegotiator, Lease, Negotiated, NegotiationFailed, ProbeAttempt, ProbeOutcome,
};
