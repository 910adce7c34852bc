//! Shared utility helpers.

/// Wrap an identifier in brackets, escaping any closing bracket it contains.
pub fn quote_ident(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

/// Escape a value for use inside a single-quoted string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
