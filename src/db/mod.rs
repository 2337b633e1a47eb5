//! Database layer
//!
//! SQLite is the default backend; MySQL is selected through
//! `database.driver`. Repositories depend on `DynDatabasePool` and dispatch
//! on `DatabasePool::driver()` to the matching sqlx pool.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, Database, DatabasePool, DynDatabasePool};
