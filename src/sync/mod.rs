pub mod cache;
pub mod provider;
pub mod resolver;
pub mod types;

pub use cache::{CacheStore, MemoryCacheStore};
pub use provider::{
    ConfiguredMappingProvider, MappingProvider, ProviderContext, ServerDefaultsProvider,
};
pub use resolver::{SyncMappingResolver, MAPPING_CACHE_KEY};
pub use types::{
    AttributeMapping, DirectionMappings, ProvisioningContext, ProvisioningEvent, SyncDirection,
    SyncMappingTable,
};
