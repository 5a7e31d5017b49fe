//! Message classification
//!
//! Decides, without looking at session state, whether a message is a slash
//! command, a catalog meta-phrase, or free text for the translator.

use crate::remote::RemoteQueryRequest;

/// Statement used for `/tables`
pub const TABLES_QUERY: &str =
    "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME";

/// Phrases treated as `/database list`
const DATABASE_LIST_PHRASES: &[&str] = &["show databases", "databases", "list databases"];

/// Phrases treated as `/tables`
const TABLES_PHRASES: &[&str] = &["show tables", "list tables"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    DatabaseList,
    DatabaseSet(String),
    Tables,
    Usage,
    Clear,
    /// Unrecognized slash command, kept verbatim for the reply
    Unknown(String),
}

impl Command {
    /// Label used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::DatabaseList => "database_list",
            Command::DatabaseSet(_) => "database_set",
            Command::Tables => "tables",
            Command::Usage => "usage",
            Command::Clear => "clear",
            Command::Unknown(_) => "unknown",
        }
    }

    /// Remote request backing this command, if it needs one
    pub fn remote_request(&self, current_database: &str) -> Option<RemoteQueryRequest> {
        match self {
            Command::DatabaseList => Some(RemoteQueryRequest::metadata()),
            Command::Tables => Some(RemoteQueryRequest::statement(TABLES_QUERY, current_database)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Command(Command),
    NaturalLanguage(String),
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::Command(command) => command.name(),
            Route::NaturalLanguage(_) => "natural_language",
        }
    }
}

/// Classify an inbound message
pub fn classify(message: &str) -> Route {
    let trimmed = message.trim();

    if let Some(body) = trimmed.strip_prefix('/') {
        return Route::Command(parse_command(trimmed, body));
    }

    let lowered = trimmed.to_lowercase();
    if DATABASE_LIST_PHRASES.contains(&lowered.as_str()) {
        return Route::Command(Command::DatabaseList);
    }
    if TABLES_PHRASES.contains(&lowered.as_str()) {
        return Route::Command(Command::Tables);
    }

    Route::NaturalLanguage(trimmed.to_string())
}

fn parse_command(raw: &str, body: &str) -> Command {
    let parts: Vec<&str> = body.split_whitespace().collect();
    let Some(word) = parts.first() else {
        return Command::Unknown(raw.to_string());
    };

    match word.to_lowercase().as_str() {
        "help" => Command::Help,
        "tables" => Command::Tables,
        "usage" => Command::Usage,
        "clear" => Command::Clear,
        "database" => {
            let sub = parts.get(1).map(|s| s.to_lowercase());
            match sub.as_deref() {
                Some("list") => Command::DatabaseList,
                // Names may contain spaces; case is preserved
                Some("set") if parts.len() > 2 => Command::DatabaseSet(parts[2..].join(" ")),
                _ => Command::Unknown(raw.to_string()),
            }
        }
        _ => Command::Unknown(raw.to_string()),
    }
}

/// Text for `/help`
pub fn help_text() -> String {
    [
        "Available commands:",
        "/help - show this message",
        "/database list - list available databases",
        "/database set <name> - switch the current database",
        "/tables - list tables in the current database",
        "/usage - show usage statistics",
        "/clear - clear conversation history",
        "",
        "Anything else is treated as a question and translated to SQL.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_commands() {
        assert_eq!(classify("/help"), Route::Command(Command::Help));
        assert_eq!(classify("  /HELP  "), Route::Command(Command::Help));
        assert_eq!(classify("/tables"), Route::Command(Command::Tables));
        assert_eq!(classify("/usage"), Route::Command(Command::Usage));
        assert_eq!(classify("/clear"), Route::Command(Command::Clear));
        assert_eq!(classify("/Database LIST"), Route::Command(Command::DatabaseList));
    }

    #[test]
    fn test_database_set_keeps_spaces_and_case() {
        assert_eq!(
            classify("/database set Sales Archive"),
            Route::Command(Command::DatabaseSet("Sales Archive".into()))
        );
    }

    #[test]
    fn test_incomplete_database_command_is_unknown() {
        assert_eq!(
            classify("/database set"),
            Route::Command(Command::Unknown("/database set".into()))
        );
        assert_eq!(
            classify("/database"),
            Route::Command(Command::Unknown("/database".into()))
        );
        assert_eq!(classify("/"), Route::Command(Command::Unknown("/".into())));
        assert_eq!(
            classify("/frobnicate now"),
            Route::Command(Command::Unknown("/frobnicate now".into()))
        );
    }

    #[test]
    fn test_meta_phrases() {
        for phrase in ["show databases", "  Databases ", "LIST DATABASES"] {
            assert_eq!(classify(phrase), Route::Command(Command::DatabaseList));
        }
        for phrase in ["show tables", "List Tables"] {
            assert_eq!(classify(phrase), Route::Command(Command::Tables));
        }
        // Only exact phrases count
        assert!(matches!(
            classify("show databases please"),
            Route::NaturalLanguage(_)
        ));
    }

    #[test]
    fn test_database_list_forms_share_request() {
        let a = match classify("/database list") {
            Route::Command(c) => c.remote_request("master"),
            _ => None,
        };
        let b = match classify("show databases") {
            Route::Command(c) => c.remote_request("sales"),
            _ => None,
        };
        assert_eq!(a, Some(RemoteQueryRequest::Metadata));
        assert_eq!(a, b);
    }

    #[test]
    fn test_tables_request_targets_current_database() {
        assert_eq!(
            Command::Tables.remote_request("sales"),
            Some(RemoteQueryRequest::statement(TABLES_QUERY, "sales"))
        );
        assert_eq!(Command::Help.remote_request("sales"), None);
    }

    #[test]
    fn test_free_text() {
        assert_eq!(
            classify("how many orders last week?"),
            Route::NaturalLanguage("how many orders last week?".into())
        );
    }
}
