//! Maps the payloads returned by the cloud OCR service onto one record.
//!
//! The service answers in several layouts depending on the model that
//! processed the file. Each known layout is one entry in an ordered
//! shape table; the first entry that recognises the payload wins and
//! nothing is merged across entries.

mod shapes;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use shapes::{Confidence, SHAPES};

/// Placeholder confidences used when the payload carries no score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceDefaults {
    /// Raw page text and word lists.
    pub raw_text: f64,
    /// Plain strings, markdown and other generic extraction fields.
    pub generic: f64,
}

impl Default for ConfidenceDefaults {
    fn default() -> Self {
        Self {
            raw_text: 85.0,
            generic: 90.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    PlainString,
    ResultArray,
    PageData,
    Prediction,
    Words,
    TopLevelField,
    Opaque,
}

impl std::fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResponseShape::PlainString => "plain string",
            ResponseShape::ResultArray => "result[]",
            ResponseShape::PageData => "page_data.raw_text",
            ResponseShape::Prediction => "prediction[]",
            ResponseShape::Words => "words[]",
            ResponseShape::TopLevelField => "top-level field",
            ResponseShape::Opaque => "opaque",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Normalized {
    pub text: String,
    pub confidence: f64,
    pub shape: ResponseShape,
    /// False when `confidence` is a placeholder default.
    pub measured: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ResponseNormalizer {
    defaults: ConfidenceDefaults,
}

impl ResponseNormalizer {
    pub fn new(defaults: ConfidenceDefaults) -> Self {
        Self { defaults }
    }

    /// Never fails: an unknown layout degrades to the stringified payload.
    pub fn normalize(&self, payload: &Value) -> Normalized {
        for (shape, matcher) in SHAPES {
            if let Some(extracted) = matcher(payload, &self.defaults) {
                log::debug!("Response matched shape {}", shape);
                let measured = matches!(extracted.confidence, Confidence::Measured(_));
                return Normalized {
                    text: extracted.text.trim().to_string(),
                    confidence: extracted.confidence.value().clamp(0.0, 100.0),
                    shape: *shape,
                    measured,
                };
            }
        }

        let text = payload.to_string();
        log::warn!(
            "OCR response did not match any known shape, using raw payload ({} chars)",
            text.len()
        );
        log::debug!("Unmatched OCR response: {}", text);

        Normalized {
            text: text.trim().to_string(),
            confidence: self.defaults.generic,
            shape: ResponseShape::Opaque,
            measured: false,
        }
    }
}
