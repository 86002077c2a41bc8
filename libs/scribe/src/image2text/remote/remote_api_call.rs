use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use super::RemoteConfig;
use crate::common::ImageInput;
use crate::image2text::{
    EngineKind, OcrEngine, OcrError, ProgressFn, RecognitionPhase, RecognitionProgress, RecognitionResult,
    ResponseNormalizer,
};

const MAX_LOGGED_BODY: usize = 300;

/// Cloud OCR engine. Posts the image as multipart form data and
/// normalizes whatever layout comes back.
///
/// The endpoint does not stream progress, so three coarse milestones are
/// reported instead.
pub struct RemoteOcrEngine {
    config: RemoteConfig,
    client: reqwest::Client,
    normalizer: ResponseNormalizer,
}

impl RemoteOcrEngine {
    pub fn new(config: RemoteConfig, normalizer: ResponseNormalizer) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build OCR HTTP client with timeout, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self {
            config,
            client,
            normalizer,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn call_remote_ocr(
        &self,
        url: &str,
        api_key: Option<&str>,
        bytes: &[u8],
        file_name: &str,
        mime_type: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<Value, OcrError> {
        let part = Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| OcrError::Transport(format!("invalid MIME type {}: {}", mime_type, e)))?;
        let form = Form::new().part("file", part);

        let mut request = self.client.post(url).multipart(form);
        if let Some(api_key) = api_key {
            request = request.basic_auth(api_key, None::<&str>);
        }

        progress(RecognitionProgress::new(
            20,
            RecognitionPhase::RemoteProcessing,
            "Processing with cloud OCR...",
        ));

        let response = request.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);

        let body = response.text().await?;

        if !status.is_success() {
            log::error!("OCR service returned {}: {}", status, truncate(&body));
            return Err(OcrError::Transport(format!("OCR service returned {}", status)));
        }

        if body.trim().is_empty() {
            return Err(OcrError::Transport("OCR service returned an empty body".to_string()));
        }

        let payload = match serde_json::from_str::<Value>(&body) {
            Ok(payload) => payload,
            Err(e) if is_json => {
                return Err(OcrError::Transport(format!("malformed JSON response: {}", e)));
            }
            Err(_) => {
                log::warn!("OCR service answered with non-JSON body, treating it as text");
                Value::String(body)
            }
        };

        if let Some(error) = payload.get("error").filter(|e| !e.is_null()) {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(OcrError::Upstream(message));
        }

        Ok(payload)
    }
}

#[async_trait]
impl OcrEngine for RemoteOcrEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Primary
    }

    fn accepts(&self, image: &ImageInput) -> bool {
        image.is_binary()
    }

    async fn recognize(
        &self,
        image: &ImageInput,
        _language: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<RecognitionResult, OcrError> {
        let (bytes, file_name, mime_type) = match image {
            ImageInput::Binary {
                bytes,
                file_name,
                mime_type,
            } => (bytes, file_name, mime_type),
            ImageInput::Reference(_) => {
                return Err(OcrError::Configuration(
                    "cloud OCR needs the raw image content".to_string(),
                ));
            }
        };

        let (url, api_key) = self.config.unpack()?;

        progress(RecognitionProgress::new(10, RecognitionPhase::Uploading, "Uploading image..."));
        log::info!("Calling cloud OCR for {} ({} bytes)", file_name, bytes.len());

        let start = std::time::Instant::now();
        let payload = self
            .call_remote_ocr(url, api_key, bytes, file_name, mime_type, progress)
            .await?;

        progress(RecognitionProgress::new(90, RecognitionPhase::Finalizing, "Reading results..."));

        let normalized = self.normalizer.normalize(&payload);
        log::info!(
            "Cloud OCR took {:?}: {} chars, shape {}, confidence {:.1}{}",
            start.elapsed(),
            normalized.text.len(),
            normalized.shape,
            normalized.confidence,
            if normalized.measured { "" } else { " (default)" }
        );

        Ok(RecognitionResult::new(
            &normalized.text,
            normalized.confidence,
            EngineKind::Primary,
        ))
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_LOGGED_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
