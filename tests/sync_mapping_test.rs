use ldapsync::sync::{
    CacheStore, DirectionMappings, MemoryCacheStore, ProviderContext, ServerDefaultsProvider,
    MAPPING_CACHE_KEY,
};
use ldapsync::{
    AttributeMapping, Config, MappingProvider, ProvisioningContext, ProvisioningEvent,
    SyncDirection, SyncMappingResolver,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

const CONFIG: &str = r#"
servers:
  hogwarts:
    user_attribute: sAMAccountName
    mail_attribute: mail
    persistent_id_attribute: guid
    persistent_id_is_binary: true

sync:
  to_local_identity_server: hogwarts
  to_directory_server: hogwarts
  mappings:
    - direction: to-directory
      key: "[telephoneNumber]"
      source: "[field.phone]"
      events: [directory-entry-synced]
    - direction: all
      key: "[field.house]"
      source: "[house:last]"
      events: [identity-synced, directory-entry-created]
"#;

fn events(list: &[ProvisioningEvent]) -> BTreeSet<ProvisioningEvent> {
    list.iter().copied().collect()
}

fn resolver() -> SyncMappingResolver {
    let config = Config::from_yaml_str(CONFIG).unwrap();
    SyncMappingResolver::new(Arc::new(config), Arc::new(MemoryCacheStore::new()))
}

#[derive(Debug)]
struct GuidProvider;

impl MappingProvider for GuidProvider {
    fn name(&self) -> &str {
        "guid"
    }

    fn contribute(&self, mappings: &mut DirectionMappings, context: &ProviderContext<'_>) {
        mappings.clear();
        mappings.insert(
            "[field.guid]".to_string(),
            AttributeMapping::new(
                "[field.guid]",
                "[guid:0;base64]",
                context.direction,
                [ProvisioningEvent::IdentityCreated],
                self.name(),
            ),
        );
    }
}

#[derive(Debug)]
struct MailOverrideProvider;

impl MappingProvider for MailOverrideProvider {
    fn name(&self) -> &str {
        "mail_override"
    }

    fn contribute(&self, mappings: &mut DirectionMappings, context: &ProviderContext<'_>) {
        if context.direction == SyncDirection::ToLocalIdentity {
            mappings.insert(
                ServerDefaultsProvider::MAIL_KEY.to_string(),
                AttributeMapping::new(
                    ServerDefaultsProvider::MAIL_KEY,
                    "[userPrincipalName]",
                    context.direction,
                    [ProvisioningEvent::IdentitySynced],
                    self.name(),
                ),
            );
        }
    }
}

#[test]
fn test_is_synced_requires_event_overlap() {
    let resolver = resolver();

    assert!(resolver.is_synced(
        "[property.mail]",
        &events(&[ProvisioningEvent::IdentitySynced]),
        SyncDirection::ToLocalIdentity,
    ));
    assert!(!resolver.is_synced(
        "[field.persistent_id]",
        &events(&[ProvisioningEvent::IdentitySynced]),
        SyncDirection::ToLocalIdentity,
    ));
    assert!(!resolver.is_synced(
        "[telephoneNumber]",
        &events(&[ProvisioningEvent::DirectoryEntrySynced]),
        SyncDirection::ToLocalIdentity,
    ));
    assert!(resolver.is_synced(
        "[telephoneNumber]",
        &events(&[ProvisioningEvent::DirectoryEntrySynced]),
        SyncDirection::ToDirectory,
    ));
    assert!(!resolver.is_synced("[property.mail]", &BTreeSet::new(), SyncDirection::ToLocalIdentity));
}

#[test]
fn test_get_mappings_all_directions() {
    let resolver = resolver();

    let mappings = resolver.get_mappings(SyncDirection::All, &BTreeSet::new(), true);
    assert!(mappings.contains_key("[property.name]"));
    assert!(mappings.contains_key("[telephoneNumber]"));
    // Present in both directions; the local identity one is kept
    assert_eq!(
        mappings["[field.house]"].direction,
        SyncDirection::ToLocalIdentity
    );

    let to_directory = resolver.get_mappings(
        SyncDirection::ToDirectory,
        &events(&[ProvisioningEvent::DirectoryEntryCreated]),
        false,
    );
    let keys: Vec<&str> = to_directory.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["[field.house]"]);
}

#[test]
fn test_synced_keys_are_sorted() {
    let keys = resolver().synced_keys(
        SyncDirection::ToLocalIdentity,
        &events(&[ProvisioningEvent::IdentitySynced]),
    );
    assert_eq!(
        keys,
        vec![
            "[field.current_dn]",
            "[field.house]",
            "[property.mail]",
            "[property.name]",
        ]
    );
}

#[test]
fn test_required_source_attributes_use_bare_names() {
    let config = Config::from_yaml_str(CONFIG).unwrap();
    let resolver =
        SyncMappingResolver::new(Arc::new(config), Arc::new(MemoryCacheStore::new()))
            .with_provider(GuidProvider);

    let required = resolver
        .required_source_attributes(SyncDirection::ToLocalIdentity, ProvisioningContext::Any);
    assert_eq!(required, BTreeSet::from(["guid".to_string()]));
}

#[test]
fn test_required_source_attributes_for_local_identity() {
    let required = resolver().required_source_attributes(
        SyncDirection::ToLocalIdentity,
        ProvisioningContext::ToLocalIdentity,
    );
    let required: Vec<&str> = required.iter().map(String::as_str).collect();
    assert_eq!(required, vec!["guid", "house", "mail", "samaccountname"]);
}

#[test]
fn test_required_source_attributes_for_directory() {
    let required = resolver().required_source_attributes(
        SyncDirection::ToDirectory,
        ProvisioningContext::ToDirectory,
    );
    let required: Vec<&str> = required.iter().map(String::as_str).collect();
    assert_eq!(required, vec!["field.house", "telephonenumber"]);
    assert!(!required.contains(&"field.phone"));
}

#[test]
fn test_later_provider_overwrites_key() {
    let config = Config::from_yaml_str(CONFIG).unwrap();
    let resolver =
        SyncMappingResolver::new(Arc::new(config), Arc::new(MemoryCacheStore::new()))
            .with_provider(MailOverrideProvider);

    let mappings = resolver.get_mappings(SyncDirection::ToLocalIdentity, &BTreeSet::new(), true);
    let mail = &mappings[ServerDefaultsProvider::MAIL_KEY];
    assert_eq!(mail.source_token, "[userPrincipalName]");
    assert_eq!(mail.owning_module, "mail_override");
}

#[test]
fn test_missing_server_means_no_mappings() {
    let resolver = SyncMappingResolver::new(
        Arc::new(Config::default()),
        Arc::new(MemoryCacheStore::new()),
    );

    assert!(resolver.table().is_empty());
    assert!(resolver
        .get_mappings(SyncDirection::All, &BTreeSet::new(), true)
        .is_empty());
}

#[test]
fn test_invalidate_picks_up_new_configuration() {
    let cache = Arc::new(MemoryCacheStore::new());
    let before = SyncMappingResolver::new(
        Arc::new(Config::from_yaml_str(CONFIG).unwrap()),
        cache.clone(),
    );
    assert!(before.table().get(SyncDirection::ToDirectory, "[telephoneNumber]").is_some());
    assert!(cache.get(MAPPING_CACHE_KEY).is_some());

    let mut changed = Config::from_yaml_str(CONFIG).unwrap();
    changed.sync.mappings.clear();
    let after = SyncMappingResolver::new(Arc::new(changed), cache.clone());

    // Still the cached table until someone flushes it
    assert!(after.table().get(SyncDirection::ToDirectory, "[telephoneNumber]").is_some());

    after.invalidate();
    assert!(after.table().get(SyncDirection::ToDirectory, "[telephoneNumber]").is_none());
}

#[test]
fn test_concurrent_queries_share_one_table() {
    let resolver = Arc::new(resolver());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || {
                if i % 4 == 0 {
                    resolver.invalidate();
                }
                resolver.synced_keys(SyncDirection::All, &BTreeSet::new())
            })
        })
        .collect();

    let expected = resolver.synced_keys(SyncDirection::All, &BTreeSet::new());
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
