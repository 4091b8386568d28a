use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Which way attribute data flows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    /// Directory entry -> local identity.
    ToLocalIdentity,
    /// Local identity -> directory entry.
    ToDirectory,
    /// Both concrete directions. Expanded at resolution time, never stored.
    All,
}

impl SyncDirection {
    /// The concrete directions this value stands for.
    pub fn concrete(self) -> &'static [SyncDirection] {
        match self {
            SyncDirection::ToLocalIdentity => &[SyncDirection::ToLocalIdentity],
            SyncDirection::ToDirectory => &[SyncDirection::ToDirectory],
            SyncDirection::All => &[SyncDirection::ToLocalIdentity, SyncDirection::ToDirectory],
        }
    }

    pub fn is_concrete(self) -> bool {
        self != SyncDirection::All
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncDirection::ToLocalIdentity => "to-local-identity",
            SyncDirection::ToDirectory => "to-directory",
            SyncDirection::All => "all",
        };
        f.write_str(name)
    }
}

/// Named triggers that gate whether a mapping is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisioningEvent {
    IdentityCreated,
    IdentitySynced,
    IdentityManuallyCreated,
    DirectoryEntryCreated,
    DirectoryEntrySynced,
    DirectoryEntryDeleted,
}

impl ProvisioningEvent {
    pub const ALL: [ProvisioningEvent; 6] = [
        ProvisioningEvent::IdentityCreated,
        ProvisioningEvent::IdentitySynced,
        ProvisioningEvent::IdentityManuallyCreated,
        ProvisioningEvent::DirectoryEntryCreated,
        ProvisioningEvent::DirectoryEntrySynced,
        ProvisioningEvent::DirectoryEntryDeleted,
    ];

    pub fn all() -> BTreeSet<ProvisioningEvent> {
        Self::ALL.into_iter().collect()
    }
}

/// The kind of provisioning run asking for source attributes; selects the
/// events whose mappings are considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ProvisioningContext {
    ToLocalIdentity,
    ToDirectory,
    #[default]
    Any,
}

impl ProvisioningContext {
    pub fn events(self) -> BTreeSet<ProvisioningEvent> {
        match self {
            ProvisioningContext::ToLocalIdentity => [
                ProvisioningEvent::IdentitySynced,
                ProvisioningEvent::IdentityCreated,
                ProvisioningEvent::IdentityManuallyCreated,
            ]
            .into_iter()
            .collect(),
            ProvisioningContext::ToDirectory => [
                ProvisioningEvent::DirectoryEntrySynced,
                ProvisioningEvent::DirectoryEntryCreated,
            ]
            .into_iter()
            .collect(),
            ProvisioningContext::Any => ProvisioningEvent::all(),
        }
    }
}

/// One attribute flow: `source_token` (a token template) fills `key` in the
/// given concrete direction whenever one of `triggering_events` fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMapping {
    pub key: String,
    pub source_token: String,
    pub direction: SyncDirection,
    pub triggering_events: BTreeSet<ProvisioningEvent>,
    #[serde(default)]
    pub conversion_required: bool,
    pub owning_module: String,
}

impl AttributeMapping {
    pub fn new(
        key: impl Into<String>,
        source_token: impl Into<String>,
        direction: SyncDirection,
        triggering_events: impl IntoIterator<Item = ProvisioningEvent>,
        owning_module: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            source_token: source_token.into(),
            direction,
            triggering_events: triggering_events.into_iter().collect(),
            conversion_required: false,
            owning_module: owning_module.into(),
        }
    }

    pub fn with_conversion(mut self, conversion_required: bool) -> Self {
        self.conversion_required = conversion_required;
        self
    }

    pub fn is_triggered_by(&self, events: &BTreeSet<ProvisioningEvent>) -> bool {
        !self.triggering_events.is_disjoint(events)
    }
}

/// Mappings of a single concrete direction, keyed by target key.
pub type DirectionMappings = HashMap<String, AttributeMapping>;

/// All mappings, per concrete direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncMappingTable {
    directions: HashMap<SyncDirection, DirectionMappings>,
}

impl SyncMappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(&self, direction: SyncDirection) -> Option<&DirectionMappings> {
        self.directions.get(&direction)
    }

    pub fn set_direction(&mut self, direction: SyncDirection, mappings: DirectionMappings) {
        if direction.is_concrete() {
            self.directions.insert(direction, mappings);
        }
    }

    pub fn get(&self, direction: SyncDirection, key: &str) -> Option<&AttributeMapping> {
        self.directions.get(&direction)?.get(key)
    }

    pub fn len(&self) -> usize {
        self.directions.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
