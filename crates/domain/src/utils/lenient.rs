//! Lenient numeric deserializers
//!
//! The server encodes most numeric columns as JSON strings (`"Id": "42"`)
//! but some builds emit real numbers. These helpers accept both, and treat
//! `null` or an empty string as absent.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    Text(String),
}

fn parse_text<T: std::str::FromStr, E: serde::de::Error>(text: &str) -> Result<Option<T>, E> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| E::custom(format!("invalid numeric string: {trimmed:?}")))
}

/// Deserialize an optional unsigned integer.
pub fn opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected unsigned integer, got {n}"))),
        Some(NumberOrString::Text(s)) => parse_text(&s),
    }
}

/// Deserialize a required unsigned integer.
pub fn u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    opt_u64(deserializer)?.ok_or_else(|| D::Error::custom("missing numeric value"))
}

/// Deserialize an optional signed integer.
pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected integer, got {n}"))),
        Some(NumberOrString::Text(s)) => parse_text(&s),
    }
}

/// Deserialize an optional float.
pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(n.as_f64()),
        Some(NumberOrString::Text(s)) => parse_text(&s),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(deserialize_with = "super::u64")]
        id: u64,
        #[serde(default, deserialize_with = "super::opt_i64")]
        expires: Option<i64>,
        #[serde(default, deserialize_with = "super::opt_f64")]
        delta: Option<f64>,
    }

    #[test]
    fn accepts_strings_and_numbers() {
        let row: Row =
            serde_json::from_str(r#"{"id": "42", "expires": 3600, "delta": "1.25"}"#).unwrap();
        assert_eq!(row.id, 42);
        assert_eq!(row.expires, Some(3600));
        assert_eq!(row.delta, Some(1.25));
    }

    #[test]
    fn empty_and_missing_values_are_none() {
        let row: Row = serde_json::from_str(r#"{"id": 7, "expires": "", "delta": null}"#).unwrap();
        assert_eq!(row.id, 7);
        assert_eq!(row.expires, None);
        assert_eq!(row.delta, None);

        let row: Row = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(row.expires, None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Row>(r#"{"id": "abc"}"#).is_err());
        assert!(serde_json::from_str::<Row>(r#"{"id": ""}"#).is_err());
    }
}
