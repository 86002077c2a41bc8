use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::image2text::OcrError;

pub const DEFAULT_LANGUAGE: &str = "eng";

/// Lifecycle events emitted by a local engine while it works.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    LoadingCore,
    LoadingLanguage { language: String },
    Initializing,
    InitializingApi,
    /// `progress` is the engine's own 0..1 fraction.
    Recognizing { progress: f32 },
    Done,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineOutput {
    pub text: String,
    /// 0..100, 0 when the engine reported nothing.
    pub confidence: f64,
}

pub type EventFn<'a> = dyn Fn(EngineEvent) + Send + Sync + 'a;

/// An in-process recognition engine.
#[async_trait]
pub trait LocalEngine: Send + Sync {
    async fn recognize(&self, image: Vec<u8>, language: &str, events: &EventFn<'_>) -> Result<EngineOutput, OcrError>;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OcrConfig {
    pub dpi: Option<u32>, // dots per inch
    pub psm: Option<u32>, // Page segmentation mode
    pub oem: Option<u32>, // OCR Engine Mode
}

impl OcrConfig {
    pub fn new(dpi: Option<u32>, psm: Option<u32>, oem: Option<u32>) -> Self {
        Self { dpi, psm, oem }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u32>().ok());
        Self {
            dpi: get("TESSERACT_DPI"),
            psm: get("TESSERACT_PSM"),
            oem: get("TESSERACT_OEM"),
        }
    }

    pub fn get_default_dpi() -> u32 {
        300
    }

    // 3 = fully automatic, no orientation detection
    pub fn get_default_psm() -> u32 {
        3
    }

    pub fn get_default_oem() -> u32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocr_config_from_lookup() {
        let config = OcrConfig::from_lookup(|key: &str| match key {
            "TESSERACT_DPI" => Some("200".to_string()),
            "TESSERACT_PSM" => Some(" 6 ".to_string()),
            "TESSERACT_OEM" => Some("lstm".to_string()),
            _ => None,
        });
        assert_eq!(config.dpi, Some(200));
        assert_eq!(config.psm, Some(6));
        assert_eq!(config.oem, None);
    }
}
