use super::types::{AttributeMapping, DirectionMappings, ProvisioningEvent, SyncDirection};
use crate::config::{Config, ServerConfig};
use crate::tokens::key::{bracketed, DN_TOKEN_NAME};
use std::fmt;

/// What a provider gets to see while the mapping table is being built.
#[derive(Debug, Clone, Copy)]
pub struct ProviderContext<'a> {
    pub direction: SyncDirection,
    pub server_id: &'a str,
    pub server: &'a ServerConfig,
    pub config: &'a Config,
}

/// A contributor of attribute mappings.
///
/// Providers run in registration order for each concrete direction that has
/// a server configured. Each may add, replace or remove entries in the
/// partial table; a later provider overwrites an earlier one's key.
pub trait MappingProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn contribute(&self, mappings: &mut DirectionMappings, context: &ProviderContext<'_>);
}

/// Canonical identity mappings derived from the server's attribute settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerDefaultsProvider;

impl ServerDefaultsProvider {
    pub const MODULE: &'static str = "server_defaults";

    pub const USERNAME_KEY: &'static str = "[property.name]";
    pub const MAIL_KEY: &'static str = "[property.mail]";
    pub const PERSISTENT_ID_KEY: &'static str = "[field.persistent_id]";
    pub const CURRENT_DN_KEY: &'static str = "[field.current_dn]";
}

impl MappingProvider for ServerDefaultsProvider {
    fn name(&self) -> &str {
        Self::MODULE
    }

    fn contribute(&self, mappings: &mut DirectionMappings, context: &ProviderContext<'_>) {
        if context.direction != SyncDirection::ToLocalIdentity {
            return;
        }

        let server = context.server;
        let direction = context.direction;
        let on_create_and_sync = [
            ProvisioningEvent::IdentityCreated,
            ProvisioningEvent::IdentitySynced,
        ];
        let mut add = |mapping: AttributeMapping| {
            mappings.insert(mapping.key.clone(), mapping);
        };

        if let Some(attribute) = server.username_attribute() {
            add(AttributeMapping::new(
                Self::USERNAME_KEY,
                bracketed(attribute),
                direction,
                on_create_and_sync,
                Self::MODULE,
            ));
        }

        let mail_source = server
            .mail_attribute()
            .map(bracketed)
            .or_else(|| server.mail_template().map(str::to_string));
        if let Some(source) = mail_source {
            add(AttributeMapping::new(
                Self::MAIL_KEY,
                source,
                direction,
                on_create_and_sync,
                Self::MODULE,
            ));
        }

        if let Some(attribute) = server.persistent_id_attribute() {
            add(AttributeMapping::new(
                Self::PERSISTENT_ID_KEY,
                bracketed(attribute),
                direction,
                [
                    ProvisioningEvent::IdentityCreated,
                    ProvisioningEvent::IdentityManuallyCreated,
                ],
                Self::MODULE,
            )
            .with_conversion(server.persistent_id_is_binary));
        }

        add(AttributeMapping::new(
            Self::CURRENT_DN_KEY,
            bracketed(DN_TOKEN_NAME),
            direction,
            on_create_and_sync,
            Self::MODULE,
        ));
    }
}

/// Administrator-configured mappings from [`crate::SyncConfig::mappings`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredMappingProvider;

impl ConfiguredMappingProvider {
    pub const MODULE: &'static str = "configuration";
}

impl MappingProvider for ConfiguredMappingProvider {
    fn name(&self) -> &str {
        Self::MODULE
    }

    fn contribute(&self, mappings: &mut DirectionMappings, context: &ProviderContext<'_>) {
        let configured = context
            .config
            .sync
            .mappings
            .iter()
            .filter(|m| m.enabled && m.direction.concrete().contains(&context.direction));

        for mapping in configured {
            let attribute_mapping = AttributeMapping::new(
                mapping.key.clone(),
                mapping.source.clone(),
                context.direction,
                mapping.events.iter().copied(),
                Self::MODULE,
            )
            .with_conversion(mapping.convert);
            mappings.insert(mapping.key.clone(), attribute_mapping);
        }
    }
}
