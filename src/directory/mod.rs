pub mod dn;
pub mod entry;

pub use dn::{decompose, escape_value, unescape_value, DnComponent, DnOccurrences};
pub use entry::{AttributeValue, DirectoryAttribute, DirectoryEntry};
