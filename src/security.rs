//! SQL hardening utilities.
//!
//! Step evaluators build SQL text from user-supplied column names, table
//! names, and literal values. Everything that ends up in a query goes through
//! this module first: identifiers are validated against a strict pattern and
//! double-quoted, string literals have embedded quotes doubled.

use crate::error::{GuardError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Maximum accepted identifier length.
const MAX_IDENTIFIER_LENGTH: usize = 255;

/// SQL identifier validation and escaping.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates a table or column identifier and returns it double-quoted,
    /// ready for interpolation into SQL text.
    ///
    /// Identifiers must start with a letter or underscore, contain only
    /// alphanumerics and underscores, and be at most 255 bytes long.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use frame_guard::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::quote_identifier("order_id").unwrap(), "\"order_id\"");
    /// assert!(SqlSecurity::quote_identifier("id; DROP TABLE users").is_err());
    /// ```
    pub fn quote_identifier(identifier: &str) -> Result<String> {
        if identifier.is_empty() {
            return Err(GuardError::Configuration(
                "identifier must not be empty".to_string(),
            ));
        }
        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(GuardError::Configuration(format!(
                "identifier exceeds {MAX_IDENTIFIER_LENGTH} bytes: {}...",
                &identifier[..32]
            )));
        }
        if !IDENTIFIER_PATTERN.is_match(identifier) {
            return Err(GuardError::Configuration(format!(
                "invalid identifier: {identifier:?}"
            )));
        }
        Ok(format!("\"{identifier}\""))
    }

    /// Escapes a string value for use as a single-quoted SQL literal.
    pub fn escape_literal(value: &str) -> String {
        let escaped = value.replace('\'', "''");
        format!("'{escaped}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_accepts_plain_names() {
        assert_eq!(SqlSecurity::quote_identifier("d").unwrap(), "\"d\"");
        assert_eq!(
            SqlSecurity::quote_identifier("_private_col").unwrap(),
            "\"_private_col\""
        );
    }

    #[test]
    fn test_quote_identifier_rejects_injection() {
        for bad in [
            "",
            "1col",
            "col name",
            "col\"name",
            "col'; DROP TABLE data; --",
            "col-name",
        ] {
            assert!(
                SqlSecurity::quote_identifier(bad).is_err(),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_quote_identifier_rejects_oversized() {
        let long = "a".repeat(256);
        assert!(SqlSecurity::quote_identifier(&long).is_err());
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(SqlSecurity::escape_literal("active"), "'active'");
        assert_eq!(SqlSecurity::escape_literal("o'brien"), "'o''brien'");
    }
}
