//! querybot Common Library
//!
//! Shared error, configuration and credential-handling types for querybot services.

pub mod config;
pub mod error;
pub mod secret;

// Re-export commonly used types
pub use error::{QueryBotError, Result};
pub use secret::{credential_issues, mask_secret, CredentialIssue};
