//! Premise metadata, the structured form of the premise artifact.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FolioError, Result};
use crate::llm::parse_json_response;

/// Contents of `premise_metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PremiseMetadata {
    /// The premise itself, a paragraph or two
    pub premise: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protagonist: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antagonist: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stakes: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub themes: Vec<String>,

    /// Any further fields the generator chose to include
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PremiseMetadata {
    /// Parse generated premise text (JSON, possibly fenced).
    pub fn from_generated(text: &str) -> Result<Self> {
        let value = parse_json_response(text).map_err(|e| FolioError::ResponseParse {
            what: "premise".to_string(),
            reason: e.to_string(),
            raw: text.to_string(),
        })?;

        if !value.get("premise").is_some_and(Value::is_string) {
            return Err(FolioError::ResponseParse {
                what: "premise".to_string(),
                reason: "expected an object with a string 'premise' field".to_string(),
                raw: text.to_string(),
            });
        }

        serde_json::from_value(value).map_err(|e| FolioError::ResponseParse {
            what: "premise".to_string(),
            reason: e.to_string(),
            raw: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_generated_minimal() {
        let meta = PremiseMetadata::from_generated(r#"{"premise": "A lighthouse keeper finds a map."}"#).unwrap();
        assert_eq!(meta.premise, "A lighthouse keeper finds a map.");
        assert!(meta.themes.is_empty());
        assert!(meta.extra.is_empty());
    }

    #[test]
    fn test_from_generated_full_and_fenced() {
        let text = "```json\n{\"premise\": \"p\", \"protagonist\": \"Ada\", \"themes\": [\"grief\"], \"genre\": \"gothic\"}\n```";
        let meta = PremiseMetadata::from_generated(text).unwrap();
        assert_eq!(meta.protagonist.as_deref(), Some("Ada"));
        assert_eq!(meta.themes, vec!["grief".to_string()]);
        assert_eq!(meta.extra.get("genre"), Some(&Value::String("gothic".to_string())));
    }

    #[test]
    fn test_from_generated_requires_premise() {
        let err = PremiseMetadata::from_generated(r#"{"protagonist": "Ada"}"#).unwrap_err();
        assert!(matches!(err, FolioError::ResponseParse { .. }));
    }

    #[test]
    fn test_from_generated_plain_text_fails_with_raw() {
        let err = PremiseMetadata::from_generated("A story about a lighthouse").unwrap_err();
        assert!(err.to_string().contains("A story about a lighthouse"));
    }

    #[test]
    fn test_serialization_keeps_extras() {
        let meta = PremiseMetadata::from_generated(r#"{"premise": "p", "tone": "wry"}"#).unwrap();
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["tone"], "wry");
        assert!(json.get("protagonist").is_none());
    }
}
