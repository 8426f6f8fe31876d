//! Identifiers for pipeline runs and stages

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

/// Maximum accepted identifier length
pub const MAX_IDENTIFIER_LEN: usize = 128;

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Generate a new run or stage identifier
///
/// Identifiers are random (v4) UUIDs in canonical hyphenated form.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Use the supplied identifier or generate a fresh one
pub fn resolve_id(id: Option<&str>) -> String {
    id.map(str::to_string).unwrap_or_else(new_id)
}

/// Check that an identifier is safe to embed in a file name
///
/// Only ASCII alphanumerics, `-` and `_` are accepted.
pub fn validate_identifier(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("identifier is empty".to_string());
    }
    if id.len() > MAX_IDENTIFIER_LEN {
        return Err(format!(
            "identifier is {} characters long (max {})",
            id.len(),
            MAX_IDENTIFIER_LEN
        ));
    }
    if !IDENTIFIER_RE.is_match(id) {
        return Err(format!(
            "identifier '{id}' may only contain letters, digits, '-' and '_'"
        ));
    }
    Ok(())
}
