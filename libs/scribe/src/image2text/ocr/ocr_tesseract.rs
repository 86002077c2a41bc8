use async_trait::async_trait;
use rusty_tesseract::{Args, DataOutput, Image};
use std::collections::HashMap;

use super::types::{EngineEvent, EngineOutput, EventFn, LocalEngine, OcrConfig};
use crate::image2text::OcrError;

/// Tesseract through the `tesseract` binary.
///
/// The binary does not stream progress, so the lifecycle events are
/// emitted around each blocking step.
pub struct TesseractEngine {
    config: OcrConfig,
}

impl TesseractEngine {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    fn build_args(&self, language: &str) -> Args {
        Args {
            lang: language.to_string(),
            config_variables: HashMap::from([("tessedit_create_tsv".into(), "1".into())]),
            dpi: Some(self.config.dpi.unwrap_or(OcrConfig::get_default_dpi()) as i32),
            psm: Some(self.config.psm.unwrap_or(OcrConfig::get_default_psm()) as i32),
            oem: Some(self.config.oem.unwrap_or(OcrConfig::get_default_oem()) as i32),
        }
    }
}

#[async_trait]
impl LocalEngine for TesseractEngine {
    async fn recognize(&self, image: Vec<u8>, language: &str, events: &EventFn<'_>) -> Result<EngineOutput, OcrError> {
        events(EngineEvent::LoadingCore);
        let version = run_blocking(|| {
            rusty_tesseract::get_tesseract_version()
                .map_err(|e| OcrError::EngineFatal(format!("Tesseract is not available: {}", e)))
        })
        .await?;
        log::debug!("Using tesseract {}", version.trim());

        events(EngineEvent::Initializing);
        let decoded = run_blocking(move || {
            image::load_from_memory(&image)
                .map_err(|e| OcrError::EngineFatal(format!("Unsupported image: {}", e)))
        })
        .await?;

        events(EngineEvent::LoadingLanguage {
            language: language.to_string(),
        });
        let installed = run_blocking(|| {
            rusty_tesseract::get_tesseract_langs()
                .map_err(|e| OcrError::EngineFatal(format!("Failed to list OCR languages: {}", e)))
        })
        .await?;
        let missing = missing_languages(language, &installed);
        if !missing.is_empty() {
            return Err(OcrError::EngineFatal(format!(
                "Language data not installed: {}",
                missing.join(", ")
            )));
        }

        events(EngineEvent::InitializingApi);
        let args = self.build_args(language);

        events(EngineEvent::Recognizing { progress: 0.0 });
        let start = std::time::Instant::now();
        let words = run_blocking(move || {
            let ocr_image = Image::from_dynamic_image(&decoded)
                .map_err(|e| OcrError::EngineFatal(format!("Failed to prepare image for OCR: {}", e)))?;
            let data_output = rusty_tesseract::image_to_data(&ocr_image, &args)
                .map_err(|e| OcrError::EngineFatal(format!("Text recognition failed: {}", e)))?;
            Ok(data_output_to_words(&data_output))
        })
        .await?;
        events(EngineEvent::Recognizing { progress: 1.0 });
        log::info!("Tesseract took {:?}, {} words", start.elapsed(), words.len());

        let output = EngineOutput {
            text: words_to_text(&words),
            confidence: mean_confidence(&words),
        };
        events(EngineEvent::Done);
        Ok(output)
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T, OcrError>
where
    F: FnOnce() -> Result<T, OcrError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| OcrError::EngineFatal(format!("OCR worker stopped unexpectedly: {}", e)))?
}

#[derive(Clone, Debug, PartialEq)]
struct WordBox {
    block: i32,
    paragraph: i32,
    line: i32,
    conf: f32,
    text: String,
}

fn data_output_to_words(data_output: &DataOutput) -> Vec<WordBox> {
    data_output
        .data
        .iter()
        .filter(|row| !row.text.trim().is_empty())
        .map(|row| WordBox {
            block: row.block_num,
            paragraph: row.par_num,
            line: row.line_num,
            conf: row.conf,
            text: row.text.trim().to_string(),
        })
        .collect()
}

/// Words on the same block/paragraph/line are joined with spaces, lines with newlines.
fn words_to_text(words: &[WordBox]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current_key: Option<(i32, i32, i32)> = None;

    for word in words {
        let key = (word.block, word.paragraph, word.line);
        match lines.last_mut() {
            Some(line) if current_key == Some(key) => {
                line.push(' ');
                line.push_str(&word.text);
            }
            _ => lines.push(word.text.clone()),
        }
        current_key = Some(key);
    }

    lines.join("\n")
}

// tesseract reports -1 for rows that are not words
fn mean_confidence(words: &[WordBox]) -> f64 {
    let scores: Vec<f64> = words
        .iter()
        .filter(|w| w.conf >= 0.0)
        .map(|w| w.conf as f64)
        .collect();

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn missing_languages(requested: &str, installed: &[String]) -> Vec<String> {
    requested
        .split('+')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .filter(|lang| !installed.iter().any(|i| i.trim() == *lang))
        .map(str::to_string)
        .collect()
}
