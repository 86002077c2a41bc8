use serde::{Deserialize, Serialize};

use crate::image2text::{
    ConfidenceDefaults, OcrConfig, RecognitionPhase, RecognitionProgress, RecognitionResult, RemoteConfig,
    DEFAULT_LANGUAGE,
};

/// Exactly one per recognition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecognitionOutcome {
    Success(RecognitionResult),
    Failure { message: String },
}

impl RecognitionOutcome {
    pub fn result(&self) -> Option<&RecognitionResult> {
        match self {
            RecognitionOutcome::Success(result) => Some(result),
            RecognitionOutcome::Failure { .. } => None,
        }
    }
}

/// What the UI layer observes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorState {
    pub is_running: bool,
    pub progress: RecognitionProgress,
    pub outcome: Option<RecognitionOutcome>,
}

impl OrchestratorState {
    pub fn idle() -> Self {
        Self {
            is_running: false,
            progress: RecognitionProgress::idle(),
            outcome: None,
        }
    }

    pub(crate) fn starting() -> Self {
        Self {
            is_running: true,
            progress: RecognitionProgress::new(0, RecognitionPhase::Idle, "Initializing..."),
            outcome: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.is_running && self.outcome.is_none()
    }
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self::idle()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub remote: RemoteConfig,
    pub ocr: OcrConfig,
    pub default_language: String,
    pub confidence_defaults: ConfidenceDefaults,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            ocr: OcrConfig::default(),
            default_language: DEFAULT_LANGUAGE.to_string(),
            confidence_defaults: ConfidenceDefaults::default(),
        }
    }
}

impl ProcessorConfig {
    pub fn new(
        remote: RemoteConfig,
        ocr: OcrConfig,
        default_language: String,
        confidence_defaults: ConfidenceDefaults,
    ) -> Self {
        Self {
            remote,
            ocr,
            default_language,
            confidence_defaults,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ConfidenceDefaults::default();
        let confidence = |key: &str, fallback: f64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| (0.0..=100.0).contains(v))
                .unwrap_or(fallback)
        };

        Self {
            remote: RemoteConfig::from_lookup(&lookup),
            ocr: OcrConfig::from_lookup(&lookup),
            default_language: lookup("SCRIBESCAN_LANGUAGE")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            confidence_defaults: ConfidenceDefaults {
                raw_text: confidence("SCRIBESCAN_CONFIDENCE_RAW_TEXT", defaults.raw_text),
                generic: confidence("SCRIBESCAN_CONFIDENCE_GENERIC", defaults.generic),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image2text::EngineKind;

    #[test]
    fn test_outcome_serialization() {
        let success = RecognitionOutcome::Success(RecognitionResult::new("hi", 85.0, EngineKind::Primary));
        let json = serde_json::to_value(&success).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["text"], "hi");
        assert_eq!(json["engine"], "Primary");

        let failure = RecognitionOutcome::Failure {
            message: "Unsupported image".to_string(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["message"], "Unsupported image");
        assert!(failure.result().is_none());
    }

    #[test]
    fn test_processor_config_from_lookup() {
        let config = ProcessorConfig::from_lookup(|key: &str| match key {
            "SCRIBESCAN_LANGUAGE" => Some("deu".to_string()),
            "SCRIBESCAN_CONFIDENCE_RAW_TEXT" => Some("70".to_string()),
            "SCRIBESCAN_CONFIDENCE_GENERIC" => Some("180".to_string()),
            "SCRIBESCAN_OCR_URL" => Some("http://ocr.local".to_string()),
            _ => None,
        });
        assert_eq!(config.default_language, "deu");
        assert_eq!(config.confidence_defaults.raw_text, 70.0);
        assert_eq!(config.confidence_defaults.generic, 90.0);
        assert!(config.remote.is_configured());
    }

    #[test]
    fn test_processor_config_defaults() {
        let config = ProcessorConfig::from_lookup(|_: &str| None);
        assert_eq!(config.default_language, "eng");
        assert!(!config.remote.is_configured());
        assert!(OrchestratorState::default().is_idle());
    }
}
