use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use uuid::Uuid;

/// Conversion functions that can be appended to a token with `;`, as in
/// `[objectGUID:0;msguid]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Base64,
    Hex,
    /// Active Directory `objectGUID` rendered as a mixed-endian GUID string.
    MsGuid,
    /// Legacy persistent-id encoding: lowercase hex of the raw bytes.
    Binary,
}

impl Conversion {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "base64" | "base64_encode" => Some(Conversion::Base64),
            "hex" | "bin2hex" => Some(Conversion::Hex),
            "msguid" => Some(Conversion::MsGuid),
            "binary" => Some(Conversion::Binary),
            _ => None,
        }
    }

    pub fn apply(&self, value: &[u8]) -> String {
        match self {
            Conversion::Base64 => BASE64.encode(value),
            Conversion::Hex | Conversion::Binary => hex::encode(value),
            Conversion::MsGuid => match <[u8; 16]>::try_from(value) {
                Ok(bytes) => Uuid::from_bytes_le(bytes).hyphenated().to_string(),
                Err(_) => hex::encode(value),
            },
        }
    }
}

/// Applies the named conversion. Unknown names return the input unchanged.
pub fn convert(value: &[u8], function: &str) -> String {
    match Conversion::from_name(function) {
        Some(conversion) => conversion.apply(value),
        None => String::from_utf8_lossy(value).into_owned(),
    }
}
