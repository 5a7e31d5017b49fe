//! Remote query endpoint: wire requests, HTTP transport, result normalization

pub mod client;
pub mod executor;
pub mod request;
pub mod result;

pub use client::{RawResponse, RemoteClient, TransportError};
pub use executor::RemoteExecutor;
pub use request::RemoteQueryRequest;
pub use result::{FailureKind, RemoteFailure, RemoteQueryResult};
