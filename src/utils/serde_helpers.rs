// Serde helper modules for custom serialization/deserialization
//
// This module provides shared serialization utilities used across the crate.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Module for serializing a Duration as whole milliseconds
/// Use with #[serde(with = "crate::utils::serde_helpers::millis_serde")]
pub mod millis_serde {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        Ok(Duration::milliseconds(millis))
    }
}

/// Module for serializing an optional Duration as whole milliseconds
/// Use with #[serde(with = "crate::utils::serde_helpers::optional_millis_serde")]
pub mod optional_millis_serde {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.num_milliseconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_opt = Option::<i64>::deserialize(deserializer)?;
        Ok(millis_opt.map(Duration::milliseconds))
    }
}

/// A key as it arrives on the wire: operators send both `123` and `"123"`
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

impl NumberOrString {
    fn into_i64(self) -> Result<i64, String> {
        match self {
            NumberOrString::Number(n) => n
                .as_i64()
                .ok_or_else(|| format!("{} is not a 64-bit integer", n)),
            NumberOrString::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("'{}' is not a 64-bit integer", s)),
        }
    }
}

/// Parse a single number or numeric string into an i64
pub fn parse_i64(value: &serde_json::Value) -> Result<i64, String> {
    NumberOrString::deserialize(value)
        .map_err(|_| format!("{} is not a number or numeric string", value))?
        .into_i64()
}

/// Deserialize an i64 given as a number or a numeric string
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrString::deserialize(deserializer)?
        .into_i64()
        .map_err(D::Error::custom)
}
