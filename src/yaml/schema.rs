use crate::directory::{AttributeValue, DirectoryEntry};
use crate::LdapSyncError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// A file of pre-fetched directory entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YamlEntries {
    pub entries: Vec<YamlEntry>,
}

/// One entry: `dn` plus any number of attributes.
///
/// Scalars become single text values and sequences become multi-valued
/// attributes. Binary values are written as `{ base64: "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YamlEntry {
    pub dn: String,
    #[serde(flatten)]
    pub attributes: Mapping,
}

impl YamlEntry {
    pub fn into_entry(self) -> crate::Result<DirectoryEntry> {
        let mut entry = DirectoryEntry::new(self.dn);

        for (name, value) in self.attributes {
            let Some(name) = name.as_str() else {
                return Err(LdapSyncError::Config(format!(
                    "Entry {} has a non-string attribute name",
                    entry.dn
                )));
            };

            let values: Vec<AttributeValue> = match value {
                Value::Sequence(seq) => seq
                    .into_iter()
                    .map(|v| convert_value(&entry.dn, name, v))
                    .collect::<crate::Result<Vec<_>>>()?
                    .into_iter()
                    .flatten()
                    .collect(),
                other => convert_value(&entry.dn, name, other)?.into_iter().collect(),
            };

            if !values.is_empty() {
                entry.add_attribute(name, values);
            }
        }

        Ok(entry)
    }
}

fn convert_value(dn: &str, name: &str, value: Value) -> crate::Result<Option<AttributeValue>> {
    let converted = match value {
        Value::String(s) => Some(AttributeValue::Text(s)),
        Value::Number(n) => Some(AttributeValue::Text(n.to_string())),
        Value::Bool(b) => Some(AttributeValue::Text(b.to_string())),
        Value::Mapping(map) => {
            let encoded = map.get("base64").and_then(Value::as_str).ok_or_else(|| {
                LdapSyncError::Config(format!(
                    "Attribute {} of {} must be a scalar, a list or {{ base64: ... }}",
                    name, dn
                ))
            })?;
            let bytes = BASE64.decode(encoded.trim()).map_err(|e| {
                LdapSyncError::Config(format!("Invalid base64 in {} of {}: {}", name, dn, e))
            })?;
            Some(AttributeValue::Binary(bytes))
        }
        _ => None,
    };
    Ok(converted)
}
