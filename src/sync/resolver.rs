use super::cache::CacheStore;
use super::provider::{ConfiguredMappingProvider, MappingProvider, ProviderContext, ServerDefaultsProvider};
use super::types::{
    DirectionMappings, ProvisioningContext, ProvisioningEvent, SyncDirection, SyncMappingTable,
};
use crate::config::Config;
use crate::detail_log::DetailLog;
use crate::tokens::referenced_attributes;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Cache key the mapping table is stored under.
pub const MAPPING_CACHE_KEY: &str = "ldapsync.sync_mappings";

const LOG_CHANNEL: &str = "ldap_sync_mappings";

/// Answers which attribute mappings are active for a direction and a set of
/// provisioning events.
///
/// The mapping table is built lazily from the registered providers and kept
/// in the injected cache store until [`SyncMappingResolver::invalidate`] is
/// called.
#[derive(Debug)]
pub struct SyncMappingResolver {
    config: Arc<Config>,
    providers: Vec<Box<dyn MappingProvider>>,
    cache: Arc<dyn CacheStore>,
    detail_log: DetailLog,
}

impl SyncMappingResolver {
    /// Resolver with the built-in providers: server defaults first, then the
    /// configured mappings.
    pub fn new(config: Arc<Config>, cache: Arc<dyn CacheStore>) -> Self {
        Self::without_providers(config, cache)
            .with_provider(ServerDefaultsProvider)
            .with_provider(ConfiguredMappingProvider)
    }

    pub fn without_providers(config: Arc<Config>, cache: Arc<dyn CacheStore>) -> Self {
        let detail_log = DetailLog::new(config.sync.detail_log);
        Self {
            config,
            providers: Vec::new(),
            cache,
            detail_log,
        }
    }

    /// Registers a provider after all existing ones.
    pub fn with_provider(mut self, provider: impl MappingProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The current table, building and caching it when absent.
    pub fn table(&self) -> Arc<SyncMappingTable> {
        if let Some(table) = self.cache.get(MAPPING_CACHE_KEY) {
            return table;
        }

        let table = Arc::new(self.build());
        self.cache.set(MAPPING_CACHE_KEY, Arc::clone(&table));
        table
    }

    /// Drops the cached table; the next query rebuilds it from the providers.
    pub fn invalidate(&self) {
        debug!("Invalidating cached sync mapping table");
        self.cache.delete(MAPPING_CACHE_KEY);
    }

    /// Whether `token` is mapped in `direction` for at least one of `events`.
    /// `All` checks both concrete directions.
    pub fn is_synced(
        &self,
        token: &str,
        events: &BTreeSet<ProvisioningEvent>,
        direction: SyncDirection,
    ) -> bool {
        let table = self.table();
        let synced = direction.concrete().iter().any(|&concrete| {
            table
                .get(concrete, token)
                .is_some_and(|mapping| mapping.is_triggered_by(events))
        });

        if !synced && direction.concrete().iter().any(|&d| table.get(d, token).is_some()) {
            self.detail_log.log(
                &format!("{} is mapped for {} but not for the requested events", token, direction),
                LOG_CHANNEL,
            );
        }

        synced
    }

    /// Active mappings for `direction`, keyed by target key.
    ///
    /// An empty `events` set matches nothing unless `default_to_all_events`
    /// is set, in which case every event is assumed. For `All` the
    /// local-identity mappings come first and a directory mapping never
    /// replaces one with the same key.
    pub fn get_mappings(
        &self,
        direction: SyncDirection,
        events: &BTreeSet<ProvisioningEvent>,
        default_to_all_events: bool,
    ) -> DirectionMappings {
        let all_events;
        let events = if events.is_empty() && default_to_all_events {
            all_events = ProvisioningEvent::all();
            &all_events
        } else {
            events
        };

        let table = self.table();
        let mut active = DirectionMappings::new();

        for &concrete in direction.concrete() {
            let Some(mappings) = table.direction(concrete) else {
                continue;
            };
            for (key, mapping) in mappings {
                if mapping.is_triggered_by(events) {
                    active
                        .entry(key.clone())
                        .or_insert_with(|| mapping.clone());
                }
            }
        }

        active
    }

    /// Active mapping keys for `direction`, sorted.
    pub fn synced_keys(
        &self,
        direction: SyncDirection,
        events: &BTreeSet<ProvisioningEvent>,
    ) -> Vec<String> {
        let mut keys: Vec<String> = self
            .get_mappings(direction, events, true)
            .into_keys()
            .collect();
        keys.sort();
        keys
    }

    /// Bare directory attribute names the mappings active in `context` touch,
    /// for building a minimal search request.
    ///
    /// Directory attributes sit on the source side of local identity mappings
    /// and on the key side of directory mappings.
    pub fn required_source_attributes(
        &self,
        direction: SyncDirection,
        context: ProvisioningContext,
    ) -> BTreeSet<String> {
        self.get_mappings(direction, &context.events(), false)
            .values()
            .flat_map(|mapping| match mapping.direction {
                SyncDirection::ToDirectory => referenced_attributes(&mapping.key),
                _ => referenced_attributes(&mapping.source_token),
            })
            .collect()
    }

    fn build(&self) -> SyncMappingTable {
        let mut table = SyncMappingTable::new();

        for &direction in SyncDirection::All.concrete() {
            let Some((server_id, server)) = self.config.server_for(direction) else {
                self.detail_log.log(
                    &format!("No server configured for {}; no mappings", direction),
                    LOG_CHANNEL,
                );
                continue;
            };

            let context = ProviderContext {
                direction,
                server_id,
                server,
                config: &self.config,
            };

            let mut mappings = DirectionMappings::new();
            for provider in &self.providers {
                provider.contribute(&mut mappings, &context);
                self.detail_log.log(
                    &format!(
                        "Provider {} contributed; {} mappings for {}",
                        provider.name(),
                        mappings.len(),
                        direction
                    ),
                    LOG_CHANNEL,
                );
            }
            table.set_direction(direction, mappings);
        }

        debug!("Built sync mapping table with {} mappings", table.len());
        table
    }
}
