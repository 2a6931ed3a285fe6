//! Serialization utilities for persisted request data
//!
//! Reusable serde helpers for fields that have no natural JSON form: raw
//! bytes inside multipart parts and optional caller-supplied timeouts.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize `Vec<u8>` as a standard base64 string.
///
/// # Usage
/// ```rust
/// use agrilink_domain::utils::serde::base64_bytes;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Upload {
///     #[serde(with = "base64_bytes")]
///     bytes: Vec<u8>,
/// }
/// ```
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    use super::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Serialize `Option<Duration>` as optional milliseconds.
pub mod optional_duration_millis {
    use super::{Deserialize, Deserializer, Duration, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => {
                serializer.serialize_some(&u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
