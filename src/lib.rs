pub mod config;
pub mod detail_log;
pub mod directory;
pub mod identity;
pub mod sync;
pub mod tokens;
pub mod yaml;

pub use config::{Config, ServerConfig, SyncConfig};
pub use detail_log::DetailLog;
pub use directory::{AttributeValue, DirectoryEntry, DnComponent};
pub use sync::{
    AttributeMapping, MappingProvider, ProvisioningContext, ProvisioningEvent, SyncDirection,
    SyncMappingResolver,
};
pub use tokens::{expand, Expansion, TokenMap, Tokenizer};

#[derive(thiserror::Error, Debug)]
pub enum LdapSyncError {
    #[error("Malformed DN: {0}")]
    MalformedDn(String),

    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LdapSyncError>;
