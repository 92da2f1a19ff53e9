//! SQLite driver for Runway.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! Implements the synchronous `Connection` trait from runway-core over
//! `libsqlite3-sys`. SQLite is bundled, so nothing depends on the host's
//! libsqlite3.
//!
//! # Example
//!
//! ```rust,ignore
//! use runway_core::{Connection, Value};
//! use runway_sqlite::{SqliteConfig, SqliteConnection};
//!
//! let conn = SqliteConnection::open(&SqliteConfig::memory().foreign_keys(true))?;
//! conn.execute_raw("CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT)")?;
//! let id = conn.insert("INSERT INTO authors (name) VALUES (?)", &[Value::from("Ada")])?;
//! ```
//!
//! # Type Mapping
//!
//! | Value | SQLite storage class |
//! |-------|----------------------|
//! | `Bool` | INTEGER (0/1) |
//! | `Int`, `BigInt` | INTEGER |
//! | `Double` | REAL |
//! | `Text` | TEXT |
//! | `Bytes` | BLOB |
//! | `Null` | NULL |
//!
//! Integers read back as `Int` when they fit in 32 bits and `BigInt`
//! otherwise.

pub mod connection;
pub mod types;

pub use connection::{OpenFlags, SqliteConfig, SqliteConnection, SqliteTransaction};
