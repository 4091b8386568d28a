use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

pub const TOKEN_PREFIX: char = '[';
pub const TOKEN_SUFFIX: char = ']';
pub const ORDINAL_DELIMITER: char = ':';
pub const CONVERSION_DELIMITER: char = ';';

/// Pseudo-attribute resolving to the entry's full DN.
pub const DN_TOKEN_NAME: &str = "dn";

fn token_regex() -> &'static Regex {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    TOKEN_REGEX.get_or_init(|| Regex::new(r"\[([^\[\]]*)\]").expect("Invalid regex"))
}

/// Wraps a token key in brackets: `cn:0` -> `[cn:0]`.
pub fn bracketed(key: &str) -> String {
    format!("{}{}{}", TOKEN_PREFIX, key, TOKEN_SUFFIX)
}

/// Inner keys of every `[...]` run in `template`, in order of appearance,
/// whether or not they resolve to anything.
pub fn find_tokens(template: &str) -> Vec<&str> {
    token_regex()
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Distinct directory attributes a template refers to, lowercased, using the
/// same key rules as the tokenizer: keys that would never resolve are left
/// out. The `dn` pseudo-attribute is always returned by the directory and is
/// left out too.
pub fn referenced_attributes(template: &str) -> BTreeSet<String> {
    find_tokens(template)
        .into_iter()
        .filter_map(TokenKey::parse)
        .filter(|key| !key.is_dn())
        .map(|key| key.name)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordinal {
    Index(usize),
    Last,
    /// Counted from the end; `Reverse(0)` is the last value.
    Reverse(usize),
}

impl Ordinal {
    /// Picks the addressed element of `values`, if it exists.
    pub fn select<'a, T>(&self, values: &'a [T]) -> Option<&'a T> {
        match *self {
            Ordinal::Index(i) => values.get(i),
            Ordinal::Last => values.last(),
            Ordinal::Reverse(n) => values
                .len()
                .checked_sub(n)
                .and_then(|remaining| remaining.checked_sub(1))
                .and_then(|i| values.get(i)),
        }
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ordinal::Index(i) => write!(f, "{}", i),
            Ordinal::Last => write!(f, "last"),
            Ordinal::Reverse(n) => write!(f, "reverse:{}", n),
        }
    }
}

/// A parsed token key of the form `name[:ordinal][;conversion]`, e.g.
/// `mail`, `mail:last`, `objectGUID:0;msguid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenKey {
    /// Lowercased attribute name.
    pub name: String,
    pub ordinal: Ordinal,
    pub conversion: Option<String>,
}

impl TokenKey {
    /// Parses a key without its surrounding brackets. Returns `None` when the
    /// name is empty or the ordinal is not `last`, `reverse:N` or a
    /// non-negative integer. A missing ordinal means the first value.
    pub fn parse(key: &str) -> Option<Self> {
        let (addressed, conversion) = match key.split_once(CONVERSION_DELIMITER) {
            Some((addressed, conversion)) => (addressed, Some(conversion.trim().to_string())),
            None => (key, None),
        };

        let mut parts = addressed.split(ORDINAL_DELIMITER);
        let name = parts.next().unwrap_or_default().trim().to_lowercase();
        if name.is_empty() {
            return None;
        }

        let ordinal = match (parts.next(), parts.next(), parts.next()) {
            (None, _, _) => Ordinal::Index(0),
            (Some(o), None, _) if o.trim().eq_ignore_ascii_case("last") => Ordinal::Last,
            (Some(o), None, _) => Ordinal::Index(o.trim().parse().ok()?),
            (Some(r), Some(n), None) if r.trim().eq_ignore_ascii_case("reverse") => {
                Ordinal::Reverse(n.trim().parse().ok()?)
            }
            _ => return None,
        };

        Some(Self {
            name,
            ordinal,
            conversion: conversion.filter(|c| !c.is_empty()),
        })
    }

    pub fn is_dn(&self) -> bool {
        self.name == DN_TOKEN_NAME
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, ORDINAL_DELIMITER, self.ordinal)?;
        if let Some(conversion) = &self.conversion {
            write!(f, "{}{}", CONVERSION_DELIMITER, conversion)?;
        }
        Ok(())
    }
}
