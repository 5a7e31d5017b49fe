//! querybot gateway library
//!
//! Turns chat messages into remote SQL calls:
//! - `auth`: negotiates and caches how to authenticate to the remote endpoint
//! - `remote`: sends requests and normalizes the replies
//! - `session` / `router`: per-conversation state and message classification
//! - `gateway`: the facade every surface calls
//! - `http_api`: axum routes over the facade

pub mod auth;
pub mod config;
pub mod gateway;
pub mod http_api;
pub mod metrics;
pub mod remote;
pub mod response;
pub mod router;
pub mod session;
pub mod telemetry;
pub mod translator;

pub use config::{EndpointConfig, GatewayConfig, TranslatorConfig};
pub use gateway::QueryGateway;
pub use response::GatewayResponse;
