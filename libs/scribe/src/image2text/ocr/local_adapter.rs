use async_trait::async_trait;

use super::types::{EngineEvent, LocalEngine, DEFAULT_LANGUAGE};
use crate::common::{load_reference, ImageInput};
use crate::image2text::{
    EngineKind, OcrEngine, OcrError, ProgressFn, RecognitionPhase, RecognitionProgress, RecognitionResult,
};

// Share of the overall scale reserved for the engine's own recognition progress.
const RECOGNIZE_START: f32 = 30.0;
const RECOGNIZE_SPAN: f32 = 60.0;

/// Adapts a [`LocalEngine`] to the common [`OcrEngine`] interface.
///
/// Accepts both binary and reference inputs. Nothing comes after this
/// engine, so every failure is reported as `EngineFatal`.
pub struct LocalOcrAdapter<E: LocalEngine> {
    engine: E,
    default_language: String,
}

impl<E: LocalEngine> LocalOcrAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.trim().is_empty() {
            self.default_language = language.trim().to_string();
        }
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    async fn resolve(&self, image: &ImageInput) -> Result<Vec<u8>, OcrError> {
        let bytes = match image {
            ImageInput::Binary { bytes, .. } => bytes.clone(),
            ImageInput::Reference(reference) => load_reference(reference)
                .await
                .map_err(|e| OcrError::EngineFatal(e.to_string()))?,
        };

        if bytes.is_empty() {
            return Err(OcrError::EngineFatal("Image is empty".to_string()));
        }
        Ok(bytes)
    }
}

pub fn map_engine_event(event: &EngineEvent) -> RecognitionProgress {
    match event {
        EngineEvent::LoadingCore => {
            RecognitionProgress::new(5, RecognitionPhase::LocalInitializing, "Loading OCR engine...")
        }
        EngineEvent::Initializing => {
            RecognitionProgress::new(10, RecognitionPhase::LocalInitializing, "Initializing...")
        }
        EngineEvent::LoadingLanguage { .. } => {
            RecognitionProgress::new(20, RecognitionPhase::LocalLoadingModel, "Loading language data...")
        }
        EngineEvent::InitializingApi => {
            RecognitionProgress::new(25, RecognitionPhase::LocalInitializing, "Preparing analysis...")
        }
        EngineEvent::Recognizing { progress } => {
            let fraction = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
            let percent = (RECOGNIZE_START + fraction * RECOGNIZE_SPAN).round() as u8;
            RecognitionProgress::new(percent, RecognitionPhase::LocalRecognizing, "Recognizing text...")
        }
        EngineEvent::Done => RecognitionProgress::new(95, RecognitionPhase::Finalizing, "Finalizing..."),
    }
}

#[async_trait]
impl<E: LocalEngine> OcrEngine for LocalOcrAdapter<E> {
    fn kind(&self) -> EngineKind {
        EngineKind::Secondary
    }

    fn accepts(&self, _image: &ImageInput) -> bool {
        true
    }

    async fn recognize(
        &self,
        image: &ImageInput,
        language: &str,
        progress: &ProgressFn<'_>,
    ) -> Result<RecognitionResult, OcrError> {
        let language = match language.trim() {
            "" => self.default_language.as_str(),
            lang => lang,
        };

        let bytes = self.resolve(image).await?;
        log::info!("Running local OCR on {} with language {}", image.describe(), language);

        let forward = |event: EngineEvent| progress(map_engine_event(&event));
        let output = self
            .engine
            .recognize(bytes, language, &forward)
            .await
            .map_err(|e| OcrError::EngineFatal(e.user_message()))?;

        Ok(RecognitionResult::new(
            &output.text,
            output.confidence,
            EngineKind::Secondary,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image2text::ocr::{EngineOutput, EventFn};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeEngine {
        seen: Mutex<Vec<(Vec<u8>, String)>>,
        fail_with: Option<OcrError>,
    }

    #[async_trait]
    impl LocalEngine for FakeEngine {
        async fn recognize(&self, image: Vec<u8>, language: &str, events: &EventFn<'_>) -> Result<EngineOutput, OcrError> {
            self.seen.lock().unwrap().push((image, language.to_string()));
            events(EngineEvent::LoadingCore);
            events(EngineEvent::Initializing);
            events(EngineEvent::LoadingLanguage {
                language: language.to_string(),
            });
            events(EngineEvent::InitializingApi);
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            for progress in [0.0, 0.5, 1.0] {
                events(EngineEvent::Recognizing { progress });
            }
            events(EngineEvent::Done);
            Ok(EngineOutput {
                text: "\n  grocery list\nmilk  \n".to_string(),
                confidence: 77.5,
            })
        }
    }

    async fn run(
        adapter: &LocalOcrAdapter<FakeEngine>,
        image: &ImageInput,
        language: &str,
    ) -> (Result<RecognitionResult, OcrError>, Vec<RecognitionProgress>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let progress = move |p: RecognitionProgress| sink.lock().unwrap().push(p);
        let result = adapter.recognize(image, language, &progress).await;
        let events = events.lock().unwrap().clone();
        (result, events)
    }

    #[tokio::test]
    async fn test_events_are_mapped_monotonically() {
        let adapter = LocalOcrAdapter::new(FakeEngine::default());
        let image = ImageInput::from_bytes(vec![1, 2, 3], "a.png", "image/png");

        let (result, events) = run(&adapter, &image, "eng").await;
        let result = result.unwrap();

        assert_eq!(result.text, "grocery list\nmilk");
        assert_eq!(result.confidence, 77.5);
        assert_eq!(result.engine, EngineKind::Secondary);

        let percents: Vec<u8> = events.iter().map(|p| p.percent).collect();
        assert_eq!(percents, vec![5, 10, 20, 25, 30, 60, 90, 95]);
        assert_eq!(events[2].phase, RecognitionPhase::LocalLoadingModel);
        assert_eq!(events[5].message, "Recognizing text...");
    }

    #[tokio::test]
    async fn test_default_language_when_unspecified() {
        let adapter = LocalOcrAdapter::new(FakeEngine::default());
        let image = ImageInput::from_bytes(vec![9], "a.png", "image/png");
        run(&adapter, &image, "  ").await.0.unwrap();

        let adapter_fra = LocalOcrAdapter::new(FakeEngine::default()).with_default_language("fra");
        run(&adapter_fra, &image, "").await.0.unwrap();

        assert_eq!(adapter.engine().seen.lock().unwrap()[0].1, "eng");
        assert_eq!(adapter_fra.engine().seen.lock().unwrap()[0].1, "fra");
    }

    #[tokio::test]
    async fn test_data_uri_reference_is_decoded() {
        let adapter = LocalOcrAdapter::new(FakeEngine::default());
        let image = ImageInput::from_reference(format!("data:image/png;base64,{}", STANDARD.encode(b"pixels")));

        run(&adapter, &image, "deu").await.0.unwrap();
        let seen = adapter.engine().seen.lock().unwrap();
        assert_eq!(seen[0], (b"pixels".to_vec(), "deu".to_string()));
    }

    #[tokio::test]
    async fn test_unresolvable_reference_is_fatal() {
        let adapter = LocalOcrAdapter::new(FakeEngine::default());
        let image = ImageInput::from_reference("/no/such/scan.png");

        let err = run(&adapter, &image, "eng").await.0.unwrap_err();
        assert!(matches!(err, OcrError::EngineFatal(_)));
        assert!(adapter.engine().seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_image_is_fatal() {
        let adapter = LocalOcrAdapter::new(FakeEngine::default());
        let image = ImageInput::from_bytes(Vec::new(), "a.png", "image/png");

        let err = run(&adapter, &image, "eng").await.0.unwrap_err();
        assert_eq!(err, OcrError::EngineFatal("Image is empty".to_string()));
    }

    #[tokio::test]
    async fn test_engine_errors_become_fatal() {
        let adapter = LocalOcrAdapter::new(FakeEngine {
            fail_with: Some(OcrError::Transport("socket closed".to_string())),
            ..Default::default()
        });
        let image = ImageInput::from_bytes(vec![1], "a.png", "image/png");

        let err = run(&adapter, &image, "eng").await.0.unwrap_err();
        assert!(!err.is_fallback_eligible());
        assert_eq!(err.user_message(), "OCR transport error: socket closed");
    }

    #[test]
    fn test_recognizing_progress_is_clamped() {
        assert_eq!(map_engine_event(&EngineEvent::Recognizing { progress: -2.0 }).percent, 30);
        assert_eq!(map_engine_event(&EngineEvent::Recognizing { progress: 7.0 }).percent, 90);
        assert_eq!(map_engine_event(&EngineEvent::Recognizing { progress: f32::NAN }).percent, 30);
    }
}
