use std::borrow::Cow;
use std::collections::HashMap;

/// A single attribute value as returned by the directory.
///
/// Most attributes are text, but some (`objectGUID`, `jpegPhoto`, ...) carry raw
/// bytes that only become usable after a conversion function is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Binary(Vec<u8>),
}

impl AttributeValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeValue::Text(s) => s.as_bytes(),
            AttributeValue::Binary(b) => b,
        }
    }

    /// Returns the value as text, or `None` when binary data is not valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::Binary(b) => std::str::from_utf8(b).ok(),
        }
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Binary(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryAttribute {
    pub name: String,
    pub values: Vec<AttributeValue>,
}

impl DirectoryAttribute {
    pub fn first(&self) -> Option<&AttributeValue> {
        self.values.first()
    }

    pub fn last(&self) -> Option<&AttributeValue> {
        self.values.last()
    }
}

/// A directory entry as fetched from the server: its DN plus multi-valued
/// attributes in the order the server returned them.
///
/// Attribute names keep their original case but are looked up
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    attributes: Vec<DirectoryAttribute>,
    // Lowercased attribute name -> position in `attributes`
    index: HashMap<String, usize>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Builder form of [`DirectoryEntry::add_attribute`].
    pub fn with_attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        self.add_attribute(name, values.into_iter().map(Into::into).collect());
        self
    }

    /// Adds an attribute, replacing any attribute with the same
    /// (case-insensitive) name while keeping its original position.
    pub fn add_attribute(&mut self, name: impl Into<String>, values: Vec<AttributeValue>) {
        let name = name.into();
        let key = name.to_lowercase();
        let attribute = DirectoryAttribute { name, values };

        match self.index.get(&key) {
            Some(&position) => self.attributes[position] = attribute,
            None => {
                self.index.insert(key, self.attributes.len());
                self.attributes.push(attribute);
            }
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&DirectoryAttribute> {
        self.index
            .get(&name.to_lowercase())
            .map(|&position| &self.attributes[position])
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    /// First value of an attribute, if the attribute exists and is non-empty.
    pub fn first_value(&self, name: &str) -> Option<&AttributeValue> {
        self.get_attribute(name).and_then(DirectoryAttribute::first)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &DirectoryAttribute> {
        self.attributes.iter()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn matches_dn(&self, dn: &str) -> bool {
        self.dn.eq_ignore_ascii_case(dn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_value_as_str() {
        assert_eq!(AttributeValue::from("test").as_str(), Some("test"));
        assert_eq!(
            AttributeValue::Binary(b"plain ascii".to_vec()).as_str(),
            Some("plain ascii")
        );
        assert_eq!(AttributeValue::Binary(vec![0xff, 0xfe, 0x00]).as_str(), None);
    }

    #[test]
    fn test_attribute_value_as_bytes() {
        assert_eq!(AttributeValue::from("test").as_bytes(), b"test");
        let binary_data = vec![1, 2, 3, 4];
        assert_eq!(
            AttributeValue::Binary(binary_data.clone()).as_bytes(),
            binary_data.as_slice()
        );
    }

    #[test]
    fn test_directory_entry_new() {
        let entry = DirectoryEntry::new("cn=test,dc=example,dc=com");
        assert_eq!(entry.dn, "cn=test,dc=example,dc=com");
        assert_eq!(entry.attribute_count(), 0);
    }

    #[test]
    fn test_get_attribute_case_insensitive() {
        let entry = DirectoryEntry::new("cn=test,dc=example,dc=com")
            .with_attribute("sAMAccountName", ["hpotter"]);

        assert!(entry.get_attribute("samaccountname").is_some());
        assert!(entry.get_attribute("SAMACCOUNTNAME").is_some());
        assert!(entry.has_attribute("SamAccountName"));

        let attr = entry.get_attribute("samaccountname").unwrap();
        assert_eq!(attr.name, "sAMAccountName");
    }

    #[test]
    fn test_attribute_order_is_preserved() {
        let entry = DirectoryEntry::new("cn=test")
            .with_attribute("mail", ["a@example.com"])
            .with_attribute("cn", ["test"])
            .with_attribute("house", ["Gryffindor", "Privet Drive"]);

        let names: Vec<&str> = entry.attributes().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["mail", "cn", "house"]);

        let house = entry.get_attribute("house").unwrap();
        assert_eq!(house.first().and_then(AttributeValue::as_str), Some("Gryffindor"));
        assert_eq!(house.last().and_then(AttributeValue::as_str), Some("Privet Drive"));
    }

    #[test]
    fn test_add_attribute_replaces_in_place() {
        let mut entry = DirectoryEntry::new("cn=test")
            .with_attribute("cn", ["old"])
            .with_attribute("sn", ["Doe"]);
        entry.add_attribute("CN", vec!["new".into()]);

        assert_eq!(entry.attribute_count(), 2);
        assert_eq!(entry.first_value("cn").and_then(AttributeValue::as_str), Some("new"));
        assert_eq!(entry.attributes().next().unwrap().name, "CN");
    }

    #[test]
    fn test_first_value_of_empty_attribute() {
        let mut entry = DirectoryEntry::new("cn=test");
        entry.add_attribute("description", Vec::new());
        assert!(entry.has_attribute("description"));
        assert!(entry.first_value("description").is_none());
    }

    #[test]
    fn test_matches_dn() {
        let entry = DirectoryEntry::new("cn=Test User,dc=Example,dc=Com");
        assert!(entry.matches_dn("cn=test user,dc=example,dc=com"));
        assert!(!entry.matches_dn("cn=Other User,dc=Example,dc=Com"));
    }
}
