use super::conversion::convert;
use super::key::{bracketed, TokenKey, DN_TOKEN_NAME, TOKEN_PREFIX, TOKEN_SUFFIX};
use crate::detail_log::DetailLog;
use crate::directory::{decompose, AttributeValue, DirectoryEntry, DnOccurrences};
use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};

const LOG_CHANNEL: &str = "ldap_tokens";

/// Bracketed token (`[cn:0]`) to resolved value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMap {
    tokens: BTreeMap<String, String>,
}

impl TokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.tokens.insert(token.into(), value.into());
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }

    pub fn contains_key(&self, token: &str) -> bool {
        self.tokens.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy keyed by lowercased token; where two tokens fold to the same
    /// key the one already lowercase wins.
    pub fn lowercased(&self) -> HashMap<String, &str> {
        let mut folded = HashMap::with_capacity(self.tokens.len());
        for (token, value) in &self.tokens {
            let lower = token.to_lowercase();
            if lower == *token {
                folded.insert(lower, value.as_str());
            } else {
                folded.entry(lower).or_insert(value.as_str());
            }
        }
        folded
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TokenMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            tokens: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for TokenMap {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}

/// Turns directory entries into token maps for template substitution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer {
    detail_log: DetailLog,
}

impl Tokenizer {
    pub fn new(detail_log: DetailLog) -> Self {
        Self { detail_log }
    }

    /// Tokenizes every attribute on the entry.
    pub fn tokenize_all(&self, entry: &DirectoryEntry) -> crate::Result<TokenMap> {
        self.tokenize::<&str>(entry, &[])
    }

    /// Tokenizes the entry's DN plus either the requested keys or, when
    /// `requested` is empty, every attribute.
    ///
    /// Requested keys look like `mail`, `mail:last` or `objectGUID:0;msguid`,
    /// with or without brackets. Keys that cannot be resolved produce no
    /// token. Fails only when the DN itself is malformed.
    pub fn tokenize<S: AsRef<str>>(
        &self,
        entry: &DirectoryEntry,
        requested: &[S],
    ) -> crate::Result<TokenMap> {
        let mut tokens = TokenMap::new();
        let full = requested.is_empty();

        self.add_dn_tokens(&mut tokens, entry, full)?;

        if full {
            for attribute in entry.attributes() {
                self.add_attribute_tokens(&mut tokens, &attribute.name, &attribute.values);
            }
        } else {
            for key in requested {
                self.add_requested_token(&mut tokens, entry, key.as_ref());
            }
        }

        // Added last so an attribute literally called "dn" cannot shadow it
        tokens.insert(bracketed(DN_TOKEN_NAME), entry.dn.clone());

        Ok(tokens)
    }

    /// With `shadow_by_attributes`, DN names that also exist as attributes
    /// with values are left to the attribute tokens so that every `[name:*]`
    /// form comes from a single source.
    fn add_dn_tokens(
        &self,
        tokens: &mut TokenMap,
        entry: &DirectoryEntry,
        shadow_by_attributes: bool,
    ) -> crate::Result<()> {
        let components = decompose(&entry.dn)?;

        for component in components.iter().filter(|c| c.value_str().is_none()) {
            self.detail_log.log(
                &format!(
                    "Skipped tokenization of DN component {} because the value is not valid UTF-8",
                    component.name
                ),
                LOG_CHANNEL,
            );
        }

        for (name, values) in DnOccurrences::from_components(&components).iter() {
            if shadow_by_attributes
                && entry
                    .get_attribute(name)
                    .is_some_and(|attribute| !attribute.values.is_empty())
            {
                continue;
            }

            let count = values.len();
            if let Some(first) = values.first() {
                tokens.insert(bracketed(name), first.as_str());
            }
            for (i, value) in values.iter().enumerate() {
                tokens.insert(bracketed(&format!("{}:{}", name, i)), value.as_str());
                tokens.insert(
                    bracketed(&format!("{}:reverse:{}", name, count - i - 1)),
                    value.as_str(),
                );
            }
            if let Some(last) = values.last() {
                tokens.insert(bracketed(&format!("{}:last", name)), last.as_str());
            }
        }

        Ok(())
    }

    fn add_attribute_tokens(&self, tokens: &mut TokenMap, name: &str, values: &[AttributeValue]) {
        let name = name.to_lowercase();

        match values {
            [] => {}
            [single] => {
                if let Some(value) = self.text_value(&name, single) {
                    tokens.insert(bracketed(&name), value);
                    tokens.insert(bracketed(&format!("{}:0", name)), value);
                    tokens.insert(bracketed(&format!("{}:last", name)), value);
                    tokens.insert(bracketed(&format!("{}:reverse:0", name)), value);
                }
            }
            // No bare [name] token: it would be ambiguous across several values
            _ => {
                let count = values.len();
                for (i, value) in values.iter().enumerate() {
                    if let Some(value) = self.text_value(&name, value) {
                        tokens.insert(bracketed(&format!("{}:{}", name, i)), value);
                        tokens.insert(
                            bracketed(&format!("{}:reverse:{}", name, count - i - 1)),
                            value,
                        );
                    }
                }
                if let Some(value) = values.last().and_then(|v| self.text_value(&name, v)) {
                    tokens.insert(bracketed(&format!("{}:last", name)), value);
                }
            }
        }
    }

    fn text_value<'a>(&self, name: &str, value: &'a AttributeValue) -> Option<&'a str> {
        let text = value.as_str();
        if text.is_none() {
            self.detail_log.log(
                &format!(
                    "Skipped tokenization of attribute {} because the value is not valid UTF-8",
                    name
                ),
                LOG_CHANNEL,
            );
        }
        text
    }

    fn add_requested_token(&self, tokens: &mut TokenMap, entry: &DirectoryEntry, requested: &str) {
        let full_key = requested
            .trim()
            .trim_start_matches(TOKEN_PREFIX)
            .trim_end_matches(TOKEN_SUFFIX);

        let Some(key) = TokenKey::parse(full_key) else {
            self.detail_log
                .log(&format!("Skipped unparseable token key {}", full_key), LOG_CHANNEL);
            return;
        };

        if key.is_dn() {
            return;
        }

        let Some(value) = entry
            .get_attribute(&key.name)
            .and_then(|attribute| key.ordinal.select(&attribute.values))
        else {
            return;
        };

        let resolved = match &key.conversion {
            Some(function) => convert(value.as_bytes(), function),
            None => match self.text_value(&key.name, value) {
                Some(text) => text.to_string(),
                None => return,
            },
        };

        let lower = full_key.to_lowercase();
        if lower != full_key {
            tokens.insert(bracketed(&lower), resolved.clone());
        }
        tokens.insert(bracketed(full_key), resolved);
    }
}
