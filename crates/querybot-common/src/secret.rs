//! Credential masking and paste-mistake detection.
//!
//! Keys for the remote endpoint are copied by hand out of a portal, so the
//! usual failures are stray quotes, trailing newlines and truncated values.

use std::fmt;

/// Render a secret for logs: first/last four characters only.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}

/// A likely problem with a configured credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialIssue {
    TooShort,
    TooLong,
    Quoted,
    ContainsWhitespace,
    ContainsNewline,
}

impl fmt::Display for CredentialIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialIssue::TooShort => write!(f, "key seems too short"),
            CredentialIssue::TooLong => write!(f, "key seems too long"),
            CredentialIssue::Quoted => write!(f, "key is wrapped in quotes"),
            CredentialIssue::ContainsWhitespace => write!(f, "key contains spaces"),
            CredentialIssue::ContainsNewline => write!(f, "key contains newlines"),
        }
    }
}

/// Inspect a credential for common copy/paste mistakes.
pub fn credential_issues(secret: &str) -> Vec<CredentialIssue> {
    let mut issues = Vec::new();
    let len = secret.chars().count();
    if len < 20 {
        issues.push(CredentialIssue::TooShort);
    }
    if len > 200 {
        issues.push(CredentialIssue::TooLong);
    }
    let quoted = |c: char| secret.starts_with(c) || secret.ends_with(c);
    if quoted('"') || quoted('\'') {
        issues.push(CredentialIssue::Quoted);
    }
    if secret.contains(' ') {
        issues.push(CredentialIssue::ContainsWhitespace);
    }
    if secret.contains('\n') || secret.contains('\r') {
        issues.push(CredentialIssue::ContainsNewline);
    }
    issues
}
