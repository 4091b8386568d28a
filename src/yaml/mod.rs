pub mod parser;
pub mod schema;

pub use parser::{parse_entries, parse_entries_file};
pub use schema::{YamlEntries, YamlEntry};
