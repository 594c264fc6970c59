//! Test utilities for SQL emission validation.
//!
//! Generated fragments are embedded in a select over the analytics alias
//! and parsed with sqlparser-rs to check they are well-formed PostgreSQL.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Validates that a generated fragment parses inside a select list.
///
/// # Example
///
/// ```ignore
/// use crate::sql::test_utils::validate_fragment;
///
/// validate_fragment("coalesce(\"DataElmentA\"::numeric,0) + 1").unwrap();
/// ```
pub fn validate_fragment(fragment: &str) -> Result<(), String> {
    let sql = format!("select {} from analytics_enrollment_Program000A as ax", fragment);
    Parser::parse_sql(&PostgreSqlDialect {}, &sql)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL fragment: {}\nSQL: {}", e, sql))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_fragment() {
        validate_fragment("coalesce(\"DataElmentA\"::numeric,0) * 2").unwrap();
        validate_fragment("case when (\"a\" > 1) then 1 else 0 end").unwrap();
    }

    #[test]
    fn test_validate_invalid_fragment() {
        assert!(validate_fragment("case when then").is_err());
    }
}
