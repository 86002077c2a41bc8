use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::OcrError;
use crate::common::ImageInput;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineKind {
    Primary,
    Secondary,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Primary => write!(f, "Primary"),
            EngineKind::Secondary => write!(f, "Secondary"),
        }
    }
}

impl From<&str> for EngineKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "primary" | "remote" => EngineKind::Primary,
            _ => EngineKind::Secondary,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionPhase {
    Idle,
    Uploading,
    RemoteProcessing,
    LocalInitializing,
    LocalLoadingModel,
    LocalRecognizing,
    Finalizing,
    Done,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecognitionProgress {
    pub percent: u8,
    pub phase: RecognitionPhase,
    pub message: String,
}

impl RecognitionProgress {
    pub fn new(percent: u8, phase: RecognitionPhase, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            phase,
            message: message.into(),
        }
    }

    pub fn idle() -> Self {
        Self::new(0, RecognitionPhase::Idle, "")
    }
}

/// Normalized output of either engine.
///
/// A confidence of 0 means the engine gave no signal, not zero confidence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub text: String,
    pub confidence: f64,
    pub engine: EngineKind,
}

impl RecognitionResult {
    pub fn new(text: &str, confidence: f64, engine: EngineKind) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            text: text.trim().to_string(),
            confidence,
            engine,
        }
    }
}

pub type ProgressFn<'a> = dyn Fn(RecognitionProgress) + Send + Sync + 'a;

/// Common interface of the remote and local recognition engines.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Whether this engine can take the input at all. Declining is not a failure.
    fn accepts(&self, image: &ImageInput) -> bool;

    async fn recognize(
        &self,
        image: &ImageInput,
        language: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<RecognitionResult, OcrError>;
}
