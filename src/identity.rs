//! Canonical identity attributes derived from a directory entry and the
//! attribute settings of the server it came from.
//!
//! An entry without attributes has no derivable identity; every derivation
//! returns `None` for it.

use crate::config::ServerConfig;
use crate::directory::{AttributeValue, DirectoryEntry};
use crate::tokens::{expand, find_tokens, Conversion, Tokenizer};

fn present_first<'a>(entry: &'a DirectoryEntry, attribute: Option<&str>) -> Option<&'a AttributeValue> {
    entry.first_value(attribute?)
}

/// Username from the account name attribute, falling back to the user
/// attribute. There is no template fallback.
pub fn derive_username(entry: &DirectoryEntry, server: &ServerConfig) -> Option<String> {
    if entry.attribute_count() == 0 {
        return None;
    }

    present_first(entry, server.account_name_attribute())
        .or_else(|| present_first(entry, server.user_attribute()))
        .map(|value| value.to_string_lossy().into_owned())
}

/// Email from the mail attribute, or else the mail template expanded against
/// the tokens it references.
pub fn derive_email(
    entry: &DirectoryEntry,
    server: &ServerConfig,
    tokenizer: &Tokenizer,
) -> crate::Result<Option<String>> {
    if entry.attribute_count() == 0 {
        return Ok(None);
    }

    if let Some(value) = present_first(entry, server.mail_attribute()) {
        return Ok(Some(value.to_string_lossy().into_owned()));
    }

    let Some(template) = server.mail_template() else {
        return Ok(None);
    };

    let tokens = tokenizer.tokenize(entry, &find_tokens(template))?;
    Ok(expand(&tokens, template).into_option())
}

/// Persistent id from the configured attribute. Binary ids are hex-encoded
/// byte for byte, whatever textual encoding the stored value already has.
pub fn derive_persistent_id(entry: &DirectoryEntry, server: &ServerConfig) -> Option<String> {
    if entry.attribute_count() == 0 {
        return None;
    }

    let value = present_first(entry, server.persistent_id_attribute())?;
    if server.persistent_id_is_binary {
        Some(Conversion::Binary.apply(value.as_bytes()))
    } else {
        Some(value.to_string_lossy().into_owned())
    }
}

/// Raw bytes of the picture attribute.
pub fn derive_picture(entry: &DirectoryEntry, server: &ServerConfig) -> Option<Vec<u8>> {
    if entry.attribute_count() == 0 {
        return None;
    }

    present_first(entry, server.picture_attribute()).map(|value| value.as_bytes().to_vec())
}
