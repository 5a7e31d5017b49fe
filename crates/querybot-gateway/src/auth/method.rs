//! Authentication methods for the remote query endpoint
//!
//! An `AuthMethod` is one concrete way of attaching (or not attaching) a
//! credential to a request. The negotiator evaluates them in order; the
//! executor replays whichever one won.

use std::fmt;

use querybot_common::mask_secret;
use reqwest::Url;
use serde::Serialize;

use super::endpoint::Endpoint;

/// Kind of authentication, without credential material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthKind {
    /// Credential already embedded in the configured URL's query string
    UrlEmbedded,
    /// No credential (anonymous or platform managed identity)
    Anonymous,
    /// Separate credential sent as a request header
    Header,
    /// Separate credential appended as a query parameter
    QueryParam,
}

impl AuthKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthKind::UrlEmbedded => "url-embedded",
            AuthKind::Anonymous => "anonymous",
            AuthKind::Header => "header",
            AuthKind::QueryParam => "query-param",
        }
    }
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete authentication method
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    UrlEmbedded,
    Anonymous,
    Header { name: String, credential: String },
    QueryParam { name: String, credential: String },
}

impl AuthMethod {
    pub fn kind(&self) -> AuthKind {
        match self {
            AuthMethod::UrlEmbedded => AuthKind::UrlEmbedded,
            AuthMethod::Anonymous => AuthKind::Anonymous,
            AuthMethod::Header { .. } => AuthKind::Header,
            AuthMethod::QueryParam { .. } => AuthKind::QueryParam,
        }
    }

    /// Separately configured credential carried by this method, if any
    pub fn credential(&self) -> Option<&str> {
        match self {
            AuthMethod::Header { credential, .. } | AuthMethod::QueryParam { credential, .. } => {
                Some(credential)
            }
            AuthMethod::UrlEmbedded | AuthMethod::Anonymous => None,
        }
    }

    /// URL to call when using this method
    pub fn target_url(&self, endpoint: &Endpoint) -> Url {
        match self {
            AuthMethod::UrlEmbedded => endpoint.url().clone(),
            AuthMethod::Anonymous | AuthMethod::Header { .. } => endpoint.bare_url().clone(),
            AuthMethod::QueryParam { name, credential } => {
                let mut url = endpoint.bare_url().clone();
                url.query_pairs_mut().append_pair(name, credential);
                url
            }
        }
    }

    /// Extra header to send when using this method
    pub fn header(&self) -> Option<(&str, &str)> {
        match self {
            AuthMethod::Header { name, credential } => Some((name.as_str(), credential.as_str())),
            _ => None,
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::UrlEmbedded => write!(f, "UrlEmbedded"),
            AuthMethod::Anonymous => write!(f, "Anonymous"),
            AuthMethod::Header { name, credential } => f
                .debug_struct("Header")
                .field("name", name)
                .field("credential", &mask_secret(credential))
                .finish(),
            AuthMethod::QueryParam { name, credential } => f
                .debug_struct("QueryParam")
                .field("name", name)
                .field("credential", &mask_secret(credential))
                .finish(),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::UrlEmbedded => write!(f, "credential embedded in URL"),
            AuthMethod::Anonymous => write!(f, "no credential (anonymous/managed identity)"),
            AuthMethod::Header { name, .. } => write!(f, "credential in header '{}'", name),
            AuthMethod::QueryParam { name, .. } => {
                write!(f, "credential in query parameter '{}'", name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;

    fn endpoint(url: &str) -> Endpoint {
        Endpoint::from_config(&EndpointConfig {
            url: url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_query_param_target_strips_embedded_code() {
        let endpoint = endpoint("https://fn.example.net/api/QuerySQL?code=old&region=eu");
        let method = AuthMethod::QueryParam {
            name: "code".into(),
            credential: "new-key".into(),
        };
        let url = method.target_url(&endpoint);
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("region".to_string(), "eu".to_string()),
                ("code".to_string(), "new-key".to_string())
            ]
        );
    }

    #[test]
    fn test_debug_masks_credential() {
        let method = AuthMethod::Header {
            name: "x-functions-key".into(),
            credential: "supersecretfunctionkey".into(),
        };
        let rendered = format!("{:?}", method);
        assert!(!rendered.contains("supersecretfunctionkey"));
        assert!(rendered.contains("supe***nkey"));
    }

    #[test]
    fn test_header_only_for_header_method() {
        assert!(AuthMethod::Anonymous.header().is_none());
        let method = AuthMethod::Header {
            name: "x-functions-key".into(),
            credential: "k".into(),
        };
        assert_eq!(method.header(), Some(("x-functions-key", "k")));
        assert_eq!(method.kind(), AuthKind::Header);
    }
}
