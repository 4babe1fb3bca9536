pub mod database;
pub mod schema;
pub mod store;

pub use database::Database;
pub use store::{NameTaken, SqliteToolStore, ToolStore};
