//! Endpoint URL handling and candidate ordering

use querybot_common::{QueryBotError, Result};
use reqwest::Url;

use super::method::AuthMethod;
use crate::config::EndpointConfig;

/// Parsed remote endpoint
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// URL exactly as configured
    url: Url,
    /// URL with any embedded credential parameter removed
    bare_url: Url,
    credential_param: String,
    has_embedded_credential: bool,
}

impl Endpoint {
    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        Self::parse(&config.url, &config.credential_param)
    }

    /// Parse `raw`, detecting `credential_param` in its query string
    pub fn parse(raw: &str, credential_param: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| QueryBotError::ConfigError(format!("invalid endpoint URL: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(QueryBotError::ConfigError(format!(
                "unsupported endpoint scheme '{}'",
                url.scheme()
            )));
        }

        let is_credential = |key: &str| key.eq_ignore_ascii_case(credential_param);

        let has_embedded_credential = url
            .query_pairs()
            .any(|(k, v)| is_credential(&k) && !v.is_empty());

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !is_credential(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut bare_url = url.clone();
        if kept.is_empty() {
            bare_url.set_query(None);
        } else {
            bare_url.query_pairs_mut().clear().extend_pairs(kept);
        }

        Ok(Self {
            url,
            bare_url,
            credential_param: credential_param.to_string(),
            has_embedded_credential,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn bare_url(&self) -> &Url {
        &self.bare_url
    }

    pub fn has_embedded_credential(&self) -> bool {
        self.has_embedded_credential
    }

    /// Authentication candidates, most preferred first
    pub fn candidates(&self, config: &EndpointConfig) -> Vec<AuthMethod> {
        let mut candidates = Vec::with_capacity(3);

        if self.has_embedded_credential {
            candidates.push(AuthMethod::UrlEmbedded);
        } else {
            candidates.push(AuthMethod::Anonymous);
        }

        if let Some(credential) = config.credential.as_deref().filter(|c| !c.is_empty()) {
            candidates.push(AuthMethod::Header {
                name: config.header_name.clone(),
                credential: credential.to_string(),
            });
            candidates.push(AuthMethod::QueryParam {
                name: config.credential_param.clone(),
                credential: credential.to_string(),
            });
        }

        candidates
    }

    /// Endpoint URL safe for logs
    pub fn display_url(&self) -> String {
        let mut shown = self.bare_url.clone();
        if self.has_embedded_credential {
            shown
                .query_pairs_mut()
                .append_pair(&self.credential_param, "***");
        }
        shown.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthKind;

    fn config(url: &str, credential: Option<&str>) -> EndpointConfig {
        EndpointConfig {
            url: url.to_string(),
            credential: credential.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_detects_embedded_credential() {
        let endpoint = Endpoint::parse("https://fn.example.net/api/q?code=abc", "code").unwrap();
        assert!(endpoint.has_embedded_credential());
        assert_eq!(endpoint.bare_url().as_str(), "https://fn.example.net/api/q");

        let endpoint = Endpoint::parse("https://fn.example.net/api/q?Code=abc", "code").unwrap();
        assert!(endpoint.has_embedded_credential());

        // A parameter merely containing "code" is not the credential
        let endpoint = Endpoint::parse("https://fn.example.net/api/q?zipcode=1", "code").unwrap();
        assert!(!endpoint.has_embedded_credential());
        assert_eq!(endpoint.bare_url().query(), Some("zipcode=1"));
    }

    #[test]
    fn test_empty_embedded_credential_ignored() {
        let endpoint = Endpoint::parse("https://fn.example.net/api/q?code=", "code").unwrap();
        assert!(!endpoint.has_embedded_credential());
        assert_eq!(endpoint.bare_url().query(), None);
    }

    #[test]
    fn test_candidate_order_without_embedded() {
        let cfg = config("https://fn.example.net/api/q", Some("key-123"));
        let endpoint = Endpoint::from_config(&cfg).unwrap();
        let kinds: Vec<AuthKind> = endpoint.candidates(&cfg).iter().map(|m| m.kind()).collect();
        assert_eq!(
            kinds,
            vec![AuthKind::Anonymous, AuthKind::Header, AuthKind::QueryParam]
        );
    }

    #[test]
    fn test_candidate_order_with_embedded() {
        let cfg = config("https://fn.example.net/api/q?code=abc", Some("key-123"));
        let endpoint = Endpoint::from_config(&cfg).unwrap();
        let kinds: Vec<AuthKind> = endpoint.candidates(&cfg).iter().map(|m| m.kind()).collect();
        assert_eq!(
            kinds,
            vec![AuthKind::UrlEmbedded, AuthKind::Header, AuthKind::QueryParam]
        );
    }

    #[test]
    fn test_no_credential_single_candidate() {
        let cfg = config("https://fn.example.net/api/q", None);
        let endpoint = Endpoint::from_config(&cfg).unwrap();
        assert_eq!(endpoint.candidates(&cfg), vec![AuthMethod::Anonymous]);
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(Endpoint::parse("not a url", "code").is_err());
        assert!(Endpoint::parse("ftp://fn.example.net/api/q", "code").is_err());
    }

    #[test]
    fn test_display_url_hides_code() {
        let endpoint = Endpoint::parse("https://fn.example.net/api/q?code=secret", "code").unwrap();
        assert!(!endpoint.display_url().contains("secret"));
    }
}
