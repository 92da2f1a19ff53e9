//! SQL identifier quoting.
//!
//! Table and column names reach the generated SQL from resource
//! configuration, never from the submitted form, but they are still quoted
//! everywhere they are interpolated.

/// Quote a SQL identifier using ANSI double-quoting.
///
/// Embedded double-quotes are escaped by doubling them.
///
/// ```
/// use runway_core::quote_ident;
///
/// assert_eq!(quote_ident("posts"), "\"posts\"");
/// assert_eq!(quote_ident("post\"author"), "\"post\"\"author\"");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL identifier using MySQL backtick quoting.
///
/// ```
/// use runway_core::quote_ident_mysql;
///
/// assert_eq!(quote_ident_mysql("post_author"), "`post_author`");
/// assert_eq!(quote_ident_mysql("a`b"), "`a``b`");
/// ```
#[inline]
pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("a\"b\"c"), "\"a\"\"b\"\"c\"");
        assert_eq!(quote_ident(""), "\"\"");
    }

    #[test]
    fn test_quote_ident_keyword_and_injection() {
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(
            quote_ident("posts\"; DROP TABLE authors; --"),
            "\"posts\"\"; DROP TABLE authors; --\""
        );
    }

    #[test]
    fn test_quote_ident_mysql_escapes_backticks() {
        assert_eq!(quote_ident_mysql("sort`order"), "`sort``order`");
    }
}
