use super::key::{find_tokens, TOKEN_PREFIX, TOKEN_SUFFIX};
use super::tokenizer::TokenMap;
use regex::Regex;
use std::sync::OnceLock;

fn unresolved_regex() -> &'static Regex {
    static UNRESOLVED_REGEX: OnceLock<Regex> = OnceLock::new();
    UNRESOLVED_REGEX.get_or_init(|| Regex::new(r"^\[.*\]$").expect("Invalid regex"))
}

/// Outcome of expanding a template.
///
/// `NoValue` means nothing could be derived and is distinct from a value that
/// happens to be blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    Value(String),
    NoValue,
}

impl Expansion {
    pub fn into_option(self) -> Option<String> {
        match self {
            Expansion::Value(value) => Some(value),
            Expansion::NoValue => None,
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Expansion::Value(value) => Some(value),
            Expansion::NoValue => None,
        }
    }

    pub fn is_no_value(&self) -> bool {
        matches!(self, Expansion::NoValue)
    }
}

/// Substitutes every `[token]` in `template` from `tokens`.
///
/// Token names match case-insensitively; values keep their case. A template
/// without any bracketed run is returned verbatim. If the whole result is
/// still a single bracketed run, or ends up empty, the expansion is
/// [`Expansion::NoValue`]. Unresolved tokens surrounded by literal text are
/// left in place.
pub fn expand(tokens: &TokenMap, template: &str) -> Expansion {
    if find_tokens(template).is_empty() {
        return Expansion::Value(template.to_string());
    }

    let folded = tokens.lowercased();
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(TOKEN_PREFIX) {
        result.push_str(&rest[..start]);
        let candidate = &rest[start..];

        // Tokens never contain brackets, so the only key that can match here
        // is the run up to the next closing bracket.
        let end = candidate[1..]
            .find(&[TOKEN_PREFIX, TOKEN_SUFFIX][..])
            .map(|i| i + 1)
            .filter(|&i| candidate[i..].starts_with(TOKEN_SUFFIX));

        match end.and_then(|i| {
            let token = &candidate[..=i];
            folded.get(&token.to_lowercase()).map(|value| (i, *value))
        }) {
            Some((i, value)) => {
                result.push_str(value);
                rest = &candidate[i + 1..];
            }
            None => {
                result.push(TOKEN_PREFIX);
                rest = &candidate[1..];
            }
        }
    }
    result.push_str(rest);

    if result.is_empty() || unresolved_regex().is_match(&result) {
        Expansion::NoValue
    } else {
        Expansion::Value(result)
    }
}
