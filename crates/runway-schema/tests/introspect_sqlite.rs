//! Introspection and nullability against a real SQLite database.

use runway_schema::{
    ConnectionCatalog, Dialect, Introspector, Nullability, NullabilityCache, SchemaCatalog,
    SchemaInspector,
};
use runway_sqlite::SqliteConnection;
use std::sync::Arc;

fn blog_db() -> SqliteConnection {
    let conn = SqliteConnection::open_memory().unwrap();
    conn.execute_raw(
        "CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE posts (
             id INTEGER PRIMARY KEY,
             title TEXT NOT NULL,
             author_id INTEGER NOT NULL REFERENCES authors(id),
             editor_id INTEGER,
             sort_order INTEGER DEFAULT 0
         );
         CREATE TABLE post_author (
             post_id INTEGER NOT NULL,
             author_id INTEGER NOT NULL,
             pivot_sort_order INTEGER
         );",
    )
    .unwrap();
    conn
}

#[test]
fn lists_columns_with_nullability() {
    let conn = blog_db();
    let columns = Introspector::new(Dialect::Sqlite)
        .columns(&conn, "posts")
        .unwrap();

    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["id", "title", "author_id", "editor_id", "sort_order"]
    );

    let id = &columns[0];
    assert!(id.primary_key);
    assert_eq!(id.sql_type, "INTEGER");

    let author_id = &columns[2];
    assert!(!author_id.nullable);
    let editor_id = &columns[3];
    assert!(editor_id.nullable);

    let sort_order = &columns[4];
    assert_eq!(sort_order.default.as_deref(), Some("0"));
}

#[test]
fn missing_table_has_no_columns() {
    let conn = blog_db();
    let catalog = ConnectionCatalog::new(&conn, Introspector::new(Dialect::Sqlite));
    assert!(catalog.list_columns("comments").unwrap().is_empty());
}

#[test]
fn inspector_over_live_catalog() {
    let conn = blog_db();
    let cache = Arc::new(NullabilityCache::new());
    let inspector = SchemaInspector::with_cache(
        ConnectionCatalog::new(&conn, Introspector::default()),
        Arc::clone(&cache),
    );

    assert_eq!(
        inspector.nullability("posts", "author_id").unwrap(),
        Nullability::NotNull
    );
    assert_eq!(
        inspector.nullability("posts", "editor_id").unwrap(),
        Nullability::Nullable
    );
    assert_eq!(
        inspector.nullability("posts", "writer_id").unwrap(),
        Nullability::Unknown
    );
    assert_eq!(
        inspector.nullability("post_author", "pivot_sort_order").unwrap(),
        Nullability::Nullable
    );

    // Later schema changes are not observed within the process
    conn.execute_raw("ALTER TABLE posts ADD COLUMN writer_id INTEGER")
        .unwrap();
    assert_eq!(
        inspector.nullability("posts", "writer_id").unwrap(),
        Nullability::Unknown
    );
    cache.clear();
    assert_eq!(
        inspector.nullability("posts", "writer_id").unwrap(),
        Nullability::Nullable
    );
}
