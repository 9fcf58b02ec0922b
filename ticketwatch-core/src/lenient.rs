//! Deserialization helpers for loosely typed upstream JSON.
//!
//! Use together with `#[serde(default)]` so absent fields fall back the same way `null` does.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accept a string, number, boolean, or `null` and render it as a string.
///
/// `null` becomes the empty string.
///
/// # Errors
///
/// Fails only when the input is not valid JSON for the surrounding format.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => text,
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    })
}

/// Treat `null` like an absent field and use the type's default.
///
/// # Errors
///
/// Fails when a present, non-null value does not match `T`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Listing {
        #[serde(default, deserialize_with = "string_or_number")]
        coach_no: String,
        #[serde(default, deserialize_with = "null_as_default")]
        stops: Vec<String>,
    }

    fn parse(raw: &str) -> Listing {
        serde_json::from_str(raw).expect("valid listing json")
    }

    #[test]
    fn test_string_passes_through() {
        assert_eq!(parse(r#"{"coach_no": "DR-101"}"#).coach_no, "DR-101");
    }

    #[test]
    fn test_number_is_rendered() {
        assert_eq!(parse(r#"{"coach_no": 4021}"#).coach_no, "4021");
    }

    #[test]
    fn test_null_and_missing_become_empty() {
        assert_eq!(parse(r#"{"coach_no": null}"#).coach_no, "");
        assert_eq!(parse("{}").coach_no, "");
    }

    #[test]
    fn test_null_list_becomes_empty() {
        assert!(parse(r#"{"stops": null}"#).stops.is_empty());
        assert_eq!(parse(r#"{"stops": ["Gabtoli"]}"#).stops, vec!["Gabtoli"]);
    }
}
