//! Distinguished name decomposition.
//!
//! A DN such as `cn=hpotter,ou=people,dc=hogwarts,dc=edu` is split into its
//! ordered `name=value` components. Separators escaped with a backslash (or
//! written as a `\2C` style hex pair) belong to the value; values are unescaped
//! only after splitting.

use super::entry::AttributeValue;
use crate::LdapSyncError;

/// One `name=value` component of a DN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnComponent {
    pub name: String,
    /// Unescaped value. Hex escapes may produce bytes that are not UTF-8, in
    /// which case the value is kept as [`AttributeValue::Binary`].
    pub value: AttributeValue,
}

impl DnComponent {
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn value_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// Splits a DN into its components in encounter order.
///
/// Empty segments are ignored and an empty DN yields no components. A
/// non-empty segment without an unescaped `=` (or with an empty attribute
/// name) is a [`LdapSyncError::MalformedDn`].
pub fn decompose(dn: &str) -> crate::Result<Vec<DnComponent>> {
    let mut components = Vec::new();

    for segment in split_unescaped(dn, ',') {
        let segment = segment.trim_start();
        if segment.is_empty() {
            continue;
        }

        let (name, raw_value) = split_once_unescaped(segment, '=').ok_or_else(|| {
            LdapSyncError::MalformedDn(format!("component '{}' of '{}' has no '='", segment, dn))
        })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(LdapSyncError::MalformedDn(format!(
                "component '{}' of '{}' has no attribute name",
                segment, dn
            )));
        }

        let bytes = unescape_value(trim_value(raw_value));
        let value = match String::from_utf8(bytes) {
            Ok(text) => AttributeValue::Text(text),
            Err(e) => AttributeValue::Binary(e.into_bytes()),
        };

        components.push(DnComponent {
            name: name.to_string(),
            value,
        });
    }

    Ok(components)
}

/// Reverses DN value escaping: `\,` style single character escapes and
/// `\2C` style hex pairs. A dangling backslash is kept literally.
pub fn unescape_value(raw: &str) -> Vec<u8> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let hex_pair = bytes
            .get(i + 1..i + 3)
            .filter(|pair| pair.iter().all(u8::is_ascii_hexdigit))
            .and_then(|pair| std::str::from_utf8(pair).ok())
            .and_then(|pair| u8::from_str_radix(pair, 16).ok());

        match hex_pair {
            Some(byte) => {
                out.push(byte);
                i += 3;
            }
            None => {
                out.push(bytes[i + 1]);
                i += 2;
            }
        }
    }

    out
}

/// Escapes a value for use inside a DN component.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (i, ch) in value.chars().enumerate() {
        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '#' if i == 0 => escaped.push_str("\\#"),
            ' ' if i == 0 || i == last => escaped.push_str("\\ "),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }

    escaped
}

/// Occurrences of each DN attribute name, grouped case-insensitively and kept
/// in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnOccurrences {
    groups: Vec<(String, Vec<String>)>,
}

impl DnOccurrences {
    /// Groups textual component values by lowercased attribute name.
    /// Components whose value is not valid UTF-8 are left out.
    pub fn from_components(components: &[DnComponent]) -> Self {
        let mut occurrences = Self::default();
        for component in components {
            if let Some(value) = component.value_str() {
                occurrences.push(&component.name, value);
            }
        }
        occurrences
    }

    fn push(&mut self, name: &str, value: &str) {
        let key = name.to_lowercase();
        match self.groups.iter_mut().find(|(group, _)| *group == key) {
            Some((_, values)) => values.push(value.to_string()),
            None => self.groups.push((key, vec![value.to_string()])),
        }
    }

    /// `(lowercased name, values)` pairs in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn values(&self, name: &str) -> Option<&[String]> {
        let key = name.to_lowercase();
        self.groups
            .iter()
            .find(|(group, _)| *group == key)
            .map(|(_, values)| values.as_slice())
    }

    pub fn nth(&self, name: &str, n: usize) -> Option<&str> {
        self.values(name)?.get(n).map(String::as_str)
    }

    pub fn last(&self, name: &str) -> Option<&str> {
        self.values(name)?.last().map(String::as_str)
    }

    /// Counted from the end: `reverse(name, 0)` is the last occurrence.
    pub fn reverse(&self, name: &str, n: usize) -> Option<&str> {
        let values = self.values(name)?;
        let index = values.len().checked_sub(n)?.checked_sub(1)?;
        values.get(index).map(String::as_str)
    }
}

/// Splits on `separator` unless it is escaped, i.e. preceded by an odd
/// number of consecutive backslashes.
pub(crate) fn split_unescaped(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, ch) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == separator {
            parts.push(&input[start..i]);
            start = i + ch.len_utf8();
        }
    }
    parts.push(&input[start..]);

    parts
}

fn split_once_unescaped(input: &str, separator: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, ch) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == separator {
            return Some((&input[..i], &input[i + ch.len_utf8()..]));
        }
    }
    None
}

// Leading spaces and unescaped trailing spaces are insignificant.
fn trim_value(raw: &str) -> &str {
    let mut value = raw.trim_start();
    while value.ends_with(' ') {
        let without = &value[..value.len() - 1];
        let backslashes = without.chars().rev().take_while(|c| *c == '\\').count();
        if backslashes % 2 == 1 {
            break;
        }
        value = without;
    }
    value
}
