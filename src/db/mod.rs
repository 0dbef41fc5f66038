//! Database layer
//!
//! Supports SQLite (default, single-binary deployment) and MySQL. The
//! driver is selected from configuration and hidden behind [`DatabasePool`].

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
