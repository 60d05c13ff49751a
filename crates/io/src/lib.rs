// Storage, mapping and report adapters for the sweep engine

pub mod mapping_files;
pub mod report;
pub mod sqlite;

pub use mapping_files::SessionDirMapping;
pub use sqlite::SqliteContactStore;
pub use report::{write_json, ExportError, JsonSink};
