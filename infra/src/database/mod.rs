//! Database connection management and MySQL repository implementations

pub mod connection;
pub mod mysql;

pub use connection::DatabasePool;
pub use mysql::{MySqlIdentityRepository, MySqlSecurityRepository};
