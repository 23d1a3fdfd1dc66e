pub mod schema;
pub mod sqlite_writer;

pub use sqlite_writer::{LoadStage, LoadSummary, SqliteWriter};
