//! Encoding of structured property values into stored documents.
//!
//! Decoding an encoded value yields a value deep-equal to the original: keys
//! absent before encoding are absent after decoding, never `null`.

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DocumentFormat is the byte format of a stored document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Json => f.write_str("json"),
            DocumentFormat::Yaml => f.write_str("yaml"),
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            other => Err(format!("unknown document format: {}", other)),
        }
    }
}

/// Encodes `value`. Map keys come out sorted, so equal values encode to
/// identical bytes.
///
/// Non-finite floats are rejected since neither format can carry them back.
pub fn encode(value: &Value, format: DocumentFormat) -> Result<Vec<u8>> {
    if value.has_non_finite() {
        return Err(Error::Encode("non-finite float".to_string()));
    }
    let bytes = match format {
        DocumentFormat::Json => serde_json::to_vec(value)?,
        DocumentFormat::Yaml => serde_yaml::to_string(value)?.into_bytes(),
    };
    tracing::trace!(%format, bytes = bytes.len(), "Encoded document");
    Ok(bytes)
}

pub fn decode(bytes: &[u8], format: DocumentFormat) -> Result<Value> {
    let value = match format {
        DocumentFormat::Json => serde_json::from_slice(bytes)?,
        DocumentFormat::Yaml => serde_yaml::from_slice(bytes)?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_yaml;
    use pretty_assertions::assert_eq;

    const DOCUMENTS: &[&str] = &[
        "{}",
        "{Oven: {degrees: 200, time: 12}}",
        "{Oven: {degrees: 200, time: 12}, Microwave: {degrees: 180, time: 15}}",
        "{ingredients: [{name: Cheese, quantity: {units: 100, uom: gram}}, {name: Sugar, quantity: {units: 1.5, uom: cup}}]}",
        "{notes: 'yes', empty: [], nested: {deeper: {flag: false, none: ~}}}",
    ];

    #[test]
    fn test_roundtrip_is_deep_equal() {
        for format in [DocumentFormat::Json, DocumentFormat::Yaml] {
            for doc in DOCUMENTS {
                let value = from_yaml(doc).unwrap();
                let bytes = encode(&value, format).unwrap();
                let back = decode(&bytes, format).unwrap();
                assert_eq!(back, value, "{} roundtrip of {}", format, doc);
            }
        }
    }

    #[test]
    fn test_absent_keys_stay_absent() {
        let value = from_yaml("{Oven: {degrees: 200, time: 12}}").unwrap();
        let bytes = encode(&value, DocumentFormat::Json).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"Oven":{"degrees":200,"time":12}}"#);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = from_yaml("{b: 1, a: 2}").unwrap();
        let b = from_yaml("{a: 2, b: 1}").unwrap();
        assert_eq!(
            encode(&a, DocumentFormat::Json).unwrap(),
            encode(&b, DocumentFormat::Json).unwrap()
        );
    }

    #[test]
    fn test_rejects_non_finite() {
        let value = Value::List(vec![Value::Float(f64::NAN)]);
        assert!(matches!(encode(&value, DocumentFormat::Json), Err(Error::Encode(_))));
    }

    #[test]
    fn test_format_names() {
        assert_eq!("YAML".parse::<DocumentFormat>().unwrap(), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::default().to_string(), "json");
        assert!("toml".parse::<DocumentFormat>().is_err());
    }
}
