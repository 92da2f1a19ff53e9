//! Database introspection.
//!
//! Lists a table's columns for SQLite, PostgreSQL and MySQL. Relationship
//! synchronization only consumes column nullability, but the full column
//! description is kept so callers can log or validate against it.

use runway_core::{Connection, Error, Row, Value, quote_ident, quote_ident_mysql};

/// Supported database dialects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// SQLite
    #[default]
    Sqlite,
    /// PostgreSQL
    Postgres,
    /// MySQL/MariaDB
    Mysql,
}

impl Dialect {
    /// Quote an identifier the way this dialect expects.
    pub fn quote_ident(self, name: &str) -> String {
        match self {
            Dialect::Mysql => quote_ident_mysql(name),
            Dialect::Sqlite | Dialect::Postgres => quote_ident(name),
        }
    }

    /// Marker for the `n`th bind parameter, counting from 1.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${n}"),
            Dialect::Sqlite | Dialect::Mysql => "?".to_string(),
        }
    }
}

/// Information about a table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// SQL type as reported by the catalog
    pub sql_type: String,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Default value expression
    pub default: Option<String>,
    /// Whether this is part of the primary key
    pub primary_key: bool,
}

/// Database introspector.
#[derive(Debug, Clone, Copy, Default)]
pub struct Introspector {
    dialect: Dialect,
}

impl Introspector {
    /// Create a new introspector for the given dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Get column information for a table.
    ///
    /// A table that does not exist has no columns; that is not an error.
    pub fn columns<C: Connection>(&self, conn: &C, table_name: &str) -> Result<Vec<ColumnInfo>, Error> {
        let columns = match self.dialect {
            Dialect::Sqlite => Self::sqlite_columns(conn, table_name)?,
            Dialect::Postgres => Self::postgres_columns(conn, table_name)?,
            Dialect::Mysql => Self::mysql_columns(conn, table_name)?,
        };
        tracing::trace!(
            table = table_name,
            dialect = ?self.dialect,
            columns = columns.len(),
            "introspected columns"
        );
        Ok(columns)
    }

    fn sqlite_columns<C: Connection>(conn: &C, table_name: &str) -> Result<Vec<ColumnInfo>, Error> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table_name));
        let rows = conn.query(&sql, &[])?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = row.get_named::<String>("name").ok()?;
                let sql_type = row.get_named::<String>("type").unwrap_or_default();
                let notnull = row.get_named::<i64>("notnull").unwrap_or(0);
                let pk = row.get_named::<i64>("pk").unwrap_or(0);

                Some(ColumnInfo {
                    name,
                    sql_type,
                    nullable: notnull == 0,
                    default: optional_text(row, "dflt_value"),
                    primary_key: pk > 0,
                })
            })
            .collect())
    }

    fn postgres_columns<C: Connection>(conn: &C, table_name: &str) -> Result<Vec<ColumnInfo>, Error> {
        let sql = "SELECT
                       c.column_name,
                       c.data_type,
                       c.is_nullable,
                       c.column_default,
                       EXISTS (
                           SELECT 1
                           FROM information_schema.table_constraints tc
                           JOIN information_schema.key_column_usage kcu
                               ON tc.constraint_name = kcu.constraint_name
                               AND tc.table_schema = kcu.table_schema
                           WHERE tc.constraint_type = 'PRIMARY KEY'
                               AND tc.table_name = c.table_name
                               AND kcu.column_name = c.column_name
                       ) AS is_primary
                   FROM information_schema.columns c
                   WHERE c.table_name = $1 AND c.table_schema = 'public'
                   ORDER BY c.ordinal_position";

        let rows = conn.query(sql, &[Value::Text(table_name.to_string())])?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = row.get_named::<String>("column_name").ok()?;
                let sql_type = row.get_named::<String>("data_type").ok()?;
                let nullable = row.get_named::<String>("is_nullable").ok()?;
                let primary_key = row.get_named::<bool>("is_primary").unwrap_or(false);

                Some(ColumnInfo {
                    name,
                    sql_type,
                    nullable: nullable == "YES",
                    default: optional_text(row, "column_default"),
                    primary_key,
                })
            })
            .collect())
    }

    fn mysql_columns<C: Connection>(conn: &C, table_name: &str) -> Result<Vec<ColumnInfo>, Error> {
        let sql = format!("SHOW FULL COLUMNS FROM {}", quote_ident_mysql(table_name));
        let rows = match conn.query(&sql, &[]) {
            Ok(rows) => rows,
            // MySQL reports a missing table as an error rather than an empty result
            Err(Error::Query(q)) if q.kind == runway_core::QueryErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = row.get_named::<String>("Field").ok()?;
                let sql_type = row.get_named::<String>("Type").ok()?;
                let null = row.get_named::<String>("Null").ok()?;
                let key = row.get_named::<String>("Key").unwrap_or_default();

                Some(ColumnInfo {
                    name,
                    sql_type,
                    nullable: null == "YES",
                    default: optional_text(row, "Default"),
                    primary_key: key == "PRI",
                })
            })
            .collect())
    }
}

fn optional_text(row: &Row, column: &str) -> Option<String> {
    row.get_named::<Option<String>>(column).ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dialect_is_sqlite() {
        assert_eq!(Introspector::default().dialect(), Dialect::Sqlite);
        assert_eq!(Introspector::new(Dialect::Mysql).dialect(), Dialect::Mysql);
    }

    #[test]
    fn test_dialect_rendering() {
        assert_eq!(Dialect::Sqlite.quote_ident("posts"), "\"posts\"");
        assert_eq!(Dialect::Postgres.quote_ident("posts"), "\"posts\"");
        assert_eq!(Dialect::Mysql.quote_ident("posts"), "`posts`");
        assert_eq!(Dialect::Sqlite.placeholder(3), "?");
        assert_eq!(Dialect::Mysql.placeholder(3), "?");
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
    }

    #[test]
    fn test_optional_text_handles_null_and_missing() {
        let row = Row::new(
            vec!["dflt_value".into()],
            vec![Value::Null],
        );
        assert_eq!(optional_text(&row, "dflt_value"), None);
        assert_eq!(optional_text(&row, "missing"), None);

        let row = Row::new(vec!["dflt_value".into()], vec![Value::Text("0".into())]);
        assert_eq!(optional_text(&row, "dflt_value").as_deref(), Some("0"));
    }
}
