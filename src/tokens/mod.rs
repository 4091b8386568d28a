pub mod conversion;
pub mod key;
pub mod template;
pub mod tokenizer;

pub use conversion::{convert, Conversion};
pub use key::{find_tokens, referenced_attributes, Ordinal, TokenKey};
pub use template::{expand, Expansion};
pub use tokenizer::{TokenMap, Tokenizer};
