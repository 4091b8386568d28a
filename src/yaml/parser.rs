use super::schema::YamlEntries;
use crate::directory::DirectoryEntry;
use crate::LdapSyncError;
use std::path::Path;

pub async fn parse_entries_file(path: &Path) -> crate::Result<Vec<DirectoryEntry>> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_entries(&content)
}

pub fn parse_entries(content: &str) -> crate::Result<Vec<DirectoryEntry>> {
    let yaml: YamlEntries = serde_yaml::from_str(content)?;

    yaml.entries
        .into_iter()
        .map(|entry| {
            if entry.dn.trim().is_empty() {
                return Err(LdapSyncError::Config("Entry DN cannot be empty".to_string()));
            }
            entry.into_entry()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENTRIES: &str = r#"
entries:
  - dn: "cn=hpotter,ou=people,dc=hogwarts,dc=edu"
    cn: hpotter
    mail: hpotter@hogwarts.edu
    uidNumber: 1001
    memberOf:
      - "cn=gryffindor,ou=groups,dc=hogwarts,dc=edu"
      - "cn=quidditch,ou=groups,dc=hogwarts,dc=edu"
    objectGUID: { base64: "AQIDBA==" }
"#;

    #[tokio::test]
    async fn test_parse_entries_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(ENTRIES.as_bytes()).unwrap();

        let entries = parse_entries_file(temp_file.path()).await.unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.dn, "cn=hpotter,ou=people,dc=hogwarts,dc=edu");
        assert_eq!(entry.first_value("CN").and_then(AttributeValue::as_str), Some("hpotter"));
        assert_eq!(entry.first_value("uidnumber").and_then(AttributeValue::as_str), Some("1001"));
        assert_eq!(entry.get_attribute("memberOf").unwrap().values.len(), 2);
        assert_eq!(
            entry.first_value("objectGUID"),
            Some(&AttributeValue::Binary(vec![1, 2, 3, 4]))
        );
    }

    #[test]
    fn test_attribute_order_is_preserved() {
        let entries = parse_entries(ENTRIES).unwrap();
        let names: Vec<&str> = entries[0].attributes().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["cn", "mail", "uidNumber", "memberOf", "objectGUID"]);
    }

    #[test]
    fn test_empty_dn_rejected() {
        let yaml = r#"
entries:
  - dn: ""
    cn: nobody
"#;
        assert!(matches!(parse_entries(yaml), Err(LdapSyncError::Config(_))));
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let yaml = r#"
entries:
  - dn: "cn=x,dc=hogwarts,dc=edu"
    objectGUID: { base64: "***" }
"#;
        assert!(matches!(parse_entries(yaml), Err(LdapSyncError::Config(_))));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = parse_entries_file(Path::new("/nonexistent/entries.yaml")).await;
        assert!(matches!(result, Err(LdapSyncError::Io(_))));
    }
}
