use crate::sync::{ProvisioningContext, ProvisioningEvent, SyncDirection};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "ldapsync")]
#[command(about = "Inspect LDAP attribute tokens, templates and synchronization mappings")]
#[command(version)]
pub struct CliArgs {
    /// Path to the YAML sync configuration
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (includes the detail log)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Set log level: debug, info, warn, error
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print every token available for the entries in a YAML file
    Tokens {
        #[arg(short, long, value_name = "FILE")]
        entries: PathBuf,
    },
    /// Expand a template against each entry
    Expand {
        #[arg(short, long, value_name = "FILE")]
        entries: PathBuf,

        #[arg(short, long)]
        template: String,
    },
    /// Derive username, email and persistent id for each entry
    Derive {
        #[arg(short, long, value_name = "FILE")]
        entries: PathBuf,

        /// Server id; defaults to the server provisioning local identities
        #[arg(long)]
        server: Option<String>,
    },
    /// List the directory attributes needed by the active mappings
    RequiredAttributes {
        #[arg(long, value_enum, default_value = "to-local-identity")]
        direction: SyncDirection,

        #[arg(long, value_enum, default_value = "any")]
        context: ProvisioningContext,
    },
}

pub fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

/// Attribute settings of one directory server.
///
/// Every attribute name is optional; an empty string counts as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub account_name_attribute: Option<String>,
    pub user_attribute: Option<String>,
    pub mail_attribute: Option<String>,
    pub mail_template: Option<String>,
    pub persistent_id_attribute: Option<String>,
    pub persistent_id_is_binary: bool,
    pub picture_attribute: Option<String>,
}

fn configured(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn account_name_attribute(&self) -> Option<&str> {
        configured(&self.account_name_attribute)
    }

    pub fn user_attribute(&self) -> Option<&str> {
        configured(&self.user_attribute)
    }

    /// The attribute usernames come from: the account name attribute when
    /// set, the user attribute otherwise.
    pub fn username_attribute(&self) -> Option<&str> {
        self.account_name_attribute().or_else(|| self.user_attribute())
    }

    pub fn mail_attribute(&self) -> Option<&str> {
        configured(&self.mail_attribute)
    }

    pub fn mail_template(&self) -> Option<&str> {
        configured(&self.mail_template)
    }

    pub fn persistent_id_attribute(&self) -> Option<&str> {
        configured(&self.persistent_id_attribute)
    }

    pub fn picture_attribute(&self) -> Option<&str> {
        configured(&self.picture_attribute)
    }
}

/// A mapping entered by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredMapping {
    /// `all` registers the mapping for both directions.
    pub direction: SyncDirection,
    pub key: String,
    pub source: String,
    pub events: BTreeSet<ProvisioningEvent>,
    #[serde(default)]
    pub convert: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Server id used when provisioning local identities from the directory.
    pub to_local_identity_server: Option<String>,
    /// Server id used when provisioning directory entries.
    pub to_directory_server: Option<String>,
    pub mappings: Vec<ConfiguredMapping>,
    pub detail_log: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub servers: BTreeMap<String, ServerConfig>,
    pub sync: SyncConfig,
}

impl Config {
    pub async fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Err(crate::LdapSyncError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> crate::Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        let referenced = [
            ("to_local_identity_server", &self.sync.to_local_identity_server),
            ("to_directory_server", &self.sync.to_directory_server),
        ];
        for (setting, server_id) in referenced {
            if let Some(id) = configured(server_id) {
                if !self.servers.contains_key(id) {
                    return Err(crate::LdapSyncError::Config(format!(
                        "{} refers to unknown server '{}'",
                        setting, id
                    )));
                }
            }
        }

        for mapping in &self.sync.mappings {
            if mapping.key.trim().is_empty() {
                return Err(crate::LdapSyncError::Config(
                    "Mapping key cannot be empty".to_string(),
                ));
            }
            if mapping.events.is_empty() {
                return Err(crate::LdapSyncError::Config(format!(
                    "Mapping {} must have at least one event",
                    mapping.key
                )));
            }
        }

        Ok(())
    }

    pub fn server(&self, id: &str) -> Option<&ServerConfig> {
        self.servers.get(id)
    }

    /// The server configured for a concrete direction, with its id.
    pub fn server_for(&self, direction: SyncDirection) -> Option<(&str, &ServerConfig)> {
        let id = match direction {
            SyncDirection::ToLocalIdentity => configured(&self.sync.to_local_identity_server),
            SyncDirection::ToDirectory => configured(&self.sync.to_directory_server),
            SyncDirection::All => None,
        }?;
        self.servers
            .get_key_value(id)
            .map(|(id, server)| (id.as_str(), server))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
servers:
  hogwarts:
    user_attribute: sAMAccountName
    mail_template: "[sAMAccountName]@hogwarts.edu"
    persistent_id_attribute: guid
    persistent_id_is_binary: true

sync:
  to_local_identity_server: hogwarts
  detail_log: true
  mappings:
    - direction: to-local-identity
      key: "[field.house]"
      source: "[house:0]"
      events: [identity-created, identity-synced]
    - direction: to-directory
      key: "[telephoneNumber]"
      source: "[field.phone]"
      events: [directory-entry-synced]
      enabled: false
"#;

    #[test]
    fn test_cli_args_tokens_command() {
        let args = CliArgs::parse_from(["ldapsync", "tokens", "-e", "entries.yaml"]);
        assert_eq!(args.config, None);
        assert!(!args.verbose);
        assert_eq!(args.log_level, "info");
        assert_eq!(
            args.command,
            Command::Tokens {
                entries: PathBuf::from("entries.yaml")
            }
        );
    }

    #[test]
    fn test_cli_args_required_attributes_defaults() {
        let args = CliArgs::parse_from(["ldapsync", "-c", "sync.yaml", "required-attributes"]);
        assert_eq!(args.config, Some(PathBuf::from("sync.yaml")));
        assert_eq!(
            args.command,
            Command::RequiredAttributes {
                direction: SyncDirection::ToLocalIdentity,
                context: ProvisioningContext::Any,
            }
        );
    }

    #[test]
    fn test_cli_args_custom_values() {
        let args = CliArgs::parse_from([
            "ldapsync",
            "expand",
            "--entries",
            "entries.yaml",
            "--template",
            "[cn]@example.com",
            "--config",
            "sync.yaml",
            "-v",
            "--log-level",
            "debug",
        ]);
        assert!(args.verbose);
        assert_eq!(args.log_level, "debug");
        assert_eq!(args.config, Some(PathBuf::from("sync.yaml")));
        assert!(matches!(args.command, Command::Expand { ref template, .. } if template == "[cn]@example.com"));
    }

    #[test]
    fn test_log_level_parsing() {
        let test_cases = vec![
            ("debug", tracing::Level::DEBUG),
            ("info", tracing::Level::INFO),
            ("warn", tracing::Level::WARN),
            ("error", tracing::Level::ERROR),
            ("DEBUG", tracing::Level::DEBUG),
            ("invalid", tracing::Level::INFO), // default
            ("", tracing::Level::INFO),        // default
        ];

        for (input, expected) in test_cases {
            assert_eq!(parse_log_level(input), expected);
        }
    }

    #[test]
    fn test_config_from_yaml() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();

        let server = config.server("hogwarts").unwrap();
        assert_eq!(server.user_attribute(), Some("sAMAccountName"));
        assert_eq!(server.username_attribute(), Some("sAMAccountName"));
        assert!(server.persistent_id_is_binary);
        assert_eq!(server.mail_attribute(), None);

        assert!(config.sync.detail_log);
        assert_eq!(config.sync.mappings.len(), 2);
        assert!(config.sync.mappings[0].enabled);
        assert!(!config.sync.mappings[1].enabled);
        assert!(config.sync.mappings[0]
            .events
            .contains(&ProvisioningEvent::IdentitySynced));
    }

    #[test]
    fn test_server_for_direction() {
        let config = Config::from_yaml_str(SAMPLE).unwrap();

        let (id, _) = config.server_for(SyncDirection::ToLocalIdentity).unwrap();
        assert_eq!(id, "hogwarts");
        assert!(config.server_for(SyncDirection::ToDirectory).is_none());
        assert!(config.server_for(SyncDirection::All).is_none());
    }

    #[test]
    fn test_unknown_server_reference_rejected() {
        let yaml = r#"
sync:
  to_directory_server: nowhere
"#;
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, crate::LdapSyncError::Config(_)));
    }

    #[test]
    fn test_mapping_without_events_rejected() {
        let yaml = r#"
sync:
  mappings:
    - direction: to-directory
      key: "[mail]"
      source: "[property.mail]"
      events: []
"#;
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, crate::LdapSyncError::Config(_)));
    }

    #[test]
    fn test_empty_strings_count_as_unset() {
        let server = ServerConfig {
            account_name_attribute: Some("  ".to_string()),
            user_attribute: Some("uid".to_string()),
            ..Default::default()
        };
        assert_eq!(server.account_name_attribute(), None);
        assert_eq!(server.username_attribute(), Some("uid"));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Config::from_yaml_str("servers: [unclosed").unwrap_err();
        assert!(matches!(err, crate::LdapSyncError::YamlParse(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).await.unwrap();
        assert!(config.servers.contains_key("hogwarts"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/sync.yaml")).await.unwrap_err();
        assert!(matches!(err, crate::LdapSyncError::Config(_)));
    }
}
