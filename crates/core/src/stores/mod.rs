pub mod sqlite;

pub use sqlite::SqliteSessionStore;
