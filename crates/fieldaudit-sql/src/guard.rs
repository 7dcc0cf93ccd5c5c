//! Keyword guard for read-only statements.
//!
//! A lexical check, applied before a statement reaches the database. The
//! executor additionally runs every statement inside a read-only
//! transaction, so the guard is a fast rejection path rather than the only
//! barrier.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::QueryError;

const MUTATING_KEYWORDS: &str =
    r"(?i)\b(INSERT|UPDATE|DELETE|DROP|ALTER|CREATE|TRUNCATE|GRANT|REVOKE|EXEC|EXECUTE)\b";

// Commands that would end the read-only transaction or change its settings.
// Matched only where a statement starts, since `END` also closes `CASE`.
const SESSION_COMMANDS: &str = r"(?is)(?:^|;)(?:\s|--[^\n]*(?:\n|$)|/\*.*?\*/)*(BEGIN|START|COMMIT|END|ROLLBACK|ABORT|SAVEPOINT|RELEASE|PREPARE|SET|RESET|DO|CALL)\b";

/// Rejects statements containing state-modifying keywords or transaction
/// control.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyGuard;

impl ReadOnlyGuard {
    /// `Ok` when no mutating keyword appears as a whole word and no statement
    /// starts with a transaction or session command.
    pub fn check(statement: &str) -> Result<(), QueryError> {
        static KEYWORDS: OnceLock<Option<Regex>> = OnceLock::new();
        static SESSION: OnceLock<Option<Regex>> = OnceLock::new();
        let keywords = KEYWORDS.get_or_init(|| Regex::new(MUTATING_KEYWORDS).ok());
        let session = SESSION.get_or_init(|| Regex::new(SESSION_COMMANDS).ok());
        let (Some(keywords), Some(session)) = (keywords, session) else {
            // The patterns are constants; refuse everything if one ever fails.
            return Err(QueryError::NotReadOnly {
                keyword: "<guard unavailable>".into(),
            });
        };

        let found = keywords
            .find(statement)
            .map(|m| m.as_str())
            .or_else(|| session.captures(statement).and_then(|c| c.get(1)).map(|m| m.as_str()));
        match found {
            Some(keyword) => Err(QueryError::NotReadOnly {
                keyword: keyword.to_ascii_uppercase(),
            }),
            None => Ok(()),
        }
    }
}
