pub mod connection;
pub mod store;

pub use connection::{create_pool, get_connection, DbConn, DbPool};
pub use store::SqliteStore;
