use serde_json::Value;

use super::{ConfidenceDefaults, ResponseShape};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) enum Confidence {
    Measured(f64),
    Default(f64),
}

impl Confidence {
    pub(super) fn value(&self) -> f64 {
        match self {
            Confidence::Measured(value) | Confidence::Default(value) => *value,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct Extracted {
    pub text: String,
    pub confidence: Confidence,
}

type Matcher = fn(&Value, &ConfidenceDefaults) -> Option<Extracted>;

/// Known payload layouts in priority order. First match wins.
pub(super) const SHAPES: &[(ResponseShape, Matcher)] = &[
    (ResponseShape::PlainString, plain_string),
    (ResponseShape::ResultArray, result_array),
    (ResponseShape::PageData, page_data),
    (ResponseShape::Prediction, prediction),
    (ResponseShape::Words, words),
    (ResponseShape::TopLevelField, top_level_field),
];

// Probed on each element of `result[]`
const ITEM_MATCHERS: &[Matcher] = &[page_data, item_raw_text, prediction, words, item_generic_text];

fn plain_string(payload: &Value, defaults: &ConfidenceDefaults) -> Option<Extracted> {
    let text = payload.as_str()?;
    Some(Extracted {
        text: text.to_string(),
        confidence: Confidence::Default(defaults.generic),
    })
}

fn result_array(payload: &Value, defaults: &ConfidenceDefaults) -> Option<Extracted> {
    let items = payload.get("result")?.as_array()?;

    let extracted: Vec<Extracted> = items
        .iter()
        .filter_map(|item| ITEM_MATCHERS.iter().find_map(|matcher| matcher(item, defaults)))
        .collect();

    if extracted.is_empty() {
        return None;
    }

    let text = extracted
        .iter()
        .map(|e| e.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<&str>>()
        .join("\n");

    let measured: Vec<f64> = extracted
        .iter()
        .filter_map(|e| match e.confidence {
            Confidence::Measured(value) => Some(value),
            Confidence::Default(_) => None,
        })
        .collect();

    let confidence = match mean(&measured) {
        Some(value) => Confidence::Measured(value),
        None => Confidence::Default(defaults.raw_text),
    };

    Some(Extracted { text, confidence })
}

fn page_data(payload: &Value, defaults: &ConfidenceDefaults) -> Option<Extracted> {
    let text = payload.get("page_data")?.get("raw_text")?.as_str()?;
    Some(Extracted {
        text: text.to_string(),
        confidence: Confidence::Default(defaults.raw_text),
    })
}

fn prediction(payload: &Value, defaults: &ConfidenceDefaults) -> Option<Extracted> {
    let predictions = payload.get("prediction")?.as_array()?;
    if predictions.is_empty() {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    let mut scores: Vec<f64> = Vec::new();

    for pred in predictions {
        if let Some(text) = non_empty_str(pred, "ocr_text") {
            parts.push(text);
            if let Some(score) = positive_f64(pred, "score") {
                scores.push(scale_unit_score(score));
            }
        } else if let Some(text) = non_empty_str(pred, "text") {
            parts.push(text);
            if let Some(score) = positive_f64(pred, "confidence") {
                scores.push(scale_unit_score(score));
            }
        }
    }

    let confidence = match mean(&scores) {
        Some(value) => Confidence::Measured(value),
        None => Confidence::Default(defaults.raw_text),
    };

    Some(Extracted {
        text: parts.join("\n"),
        confidence,
    })
}

fn words(payload: &Value, defaults: &ConfidenceDefaults) -> Option<Extracted> {
    let words = payload.get("words")?.as_array()?;
    if words.is_empty() {
        return None;
    }

    let text = words
        .iter()
        .filter_map(|word| word.as_str().or_else(|| non_empty_str(word, "text")))
        .collect::<Vec<&str>>()
        .join(" ");

    Some(Extracted {
        text,
        confidence: Confidence::Default(defaults.raw_text),
    })
}

fn top_level_field(payload: &Value, defaults: &ConfidenceDefaults) -> Option<Extracted> {
    const FIELDS: [&str; 4] = ["markdown", "raw_text", "text", "data"];

    FIELDS.iter().find_map(|field| {
        let text = payload.get(*field)?.as_str()?;
        let confidence = if *field == "raw_text" {
            defaults.raw_text
        } else {
            defaults.generic
        };
        Some(Extracted {
            text: text.to_string(),
            confidence: Confidence::Default(confidence),
        })
    })
}

fn item_raw_text(item: &Value, defaults: &ConfidenceDefaults) -> Option<Extracted> {
    let text = item.get("raw_text")?.as_str()?;
    Some(Extracted {
        text: text.to_string(),
        confidence: Confidence::Default(defaults.raw_text),
    })
}

fn item_generic_text(item: &Value, defaults: &ConfidenceDefaults) -> Option<Extracted> {
    let text = non_empty_str(item, "text").or_else(|| non_empty_str(item, "ocr_text"))?;
    Some(Extracted {
        text: text.to_string(),
        confidence: Confidence::Default(defaults.generic),
    })
}

fn non_empty_str<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

// A score of 0 means the service gave no signal, same as a missing one.
fn positive_f64(value: &Value, field: &str) -> Option<f64> {
    value
        .get(field)
        .and_then(Value::as_f64)
        .filter(|score| *score > 0.0)
}

/// Scores reported as 0..1 are moved onto the 0..100 scale.
fn scale_unit_score(score: f64) -> f64 {
    if score <= 1.0 {
        score * 100.0
    } else {
        score
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
