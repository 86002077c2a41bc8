use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use super::types::{OrchestratorState, ProcessorConfig, RecognitionOutcome};
use crate::common::ImageInput;
use crate::image2text::{
    LocalOcrAdapter, OcrEngine, OcrError, ProgressFn, RecognitionPhase, RecognitionProgress, RecognitionResult,
    RemoteOcrEngine, ResponseNormalizer, TesseractEngine, DEFAULT_LANGUAGE,
};

/// Runs one recognition at a time against the cloud engine, falling back
/// to the local engine, and publishes progress and the outcome.
///
/// Every operation is tagged with a generation number. `reset` and a new
/// `process_image` both advance the generation, after which progress and
/// results from the older operation no longer touch the published state.
pub struct OcrOrchestrator {
    primary: Arc<dyn OcrEngine>,
    secondary: Arc<dyn OcrEngine>,
    default_language: String,
    state: watch::Sender<OrchestratorState>,
    generation: AtomicU64,
}

impl OcrOrchestrator {
    pub fn new(primary: Arc<dyn OcrEngine>, secondary: Arc<dyn OcrEngine>) -> Self {
        let (state, _) = watch::channel(OrchestratorState::idle());
        Self {
            primary,
            secondary,
            default_language: DEFAULT_LANGUAGE.to_string(),
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.trim().is_empty() {
            self.default_language = language.trim().to_string();
        }
        self
    }

    /// Cloud engine from `config.remote`, tesseract as the fallback.
    pub fn from_config(config: &ProcessorConfig) -> Self {
        let normalizer = ResponseNormalizer::new(config.confidence_defaults);
        let primary = RemoteOcrEngine::new(config.remote.clone(), normalizer);
        if !primary.is_configured() {
            log::warn!("Cloud OCR is not configured, every image will be processed locally");
        }
        let secondary = LocalOcrAdapter::new(TesseractEngine::new(config.ocr.clone()))
            .with_default_language(config.default_language.clone());

        Self::new(Arc::new(primary), Arc::new(secondary)).with_default_language(config.default_language.clone())
    }

    pub fn state(&self) -> OrchestratorState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.state.subscribe()
    }

    /// Back to idle. Anything still in flight becomes inert.
    pub fn reset(&self) {
        self.state.send_modify(|state| {
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            log::debug!("Reset, now at generation {}", generation);
            *state = OrchestratorState::idle();
        });
    }

    /// Recognizes text in `image`. Never returns an error: engine failures
    /// end up in [`RecognitionOutcome::Failure`].
    ///
    /// The outcome is always returned to the caller, but only published
    /// when no `reset` or newer operation happened in the meantime.
    pub async fn process_image(&self, image: &ImageInput, language: Option<&str>) -> RecognitionOutcome {
        let generation = self.begin();
        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.default_language)
            .to_string();
        log::info!(
            "Starting recognition {} of {} ({})",
            generation,
            image.describe(),
            language
        );

        let report = |progress: RecognitionProgress| self.publish_progress(generation, progress);
        let outcome = match self.run(image, &language, &report).await {
            Ok(result) => {
                log::info!(
                    "Recognition {} done by {} engine, {} chars, confidence {:.1}",
                    generation,
                    result.engine,
                    result.text.len(),
                    result.confidence
                );
                RecognitionOutcome::Success(result)
            }
            Err(err) => {
                log::error!("Recognition {} failed: {}", generation, err);
                RecognitionOutcome::Failure {
                    message: err.user_message(),
                }
            }
        };

        self.finish(generation, &outcome);
        outcome
    }

    async fn run(
        &self,
        image: &ImageInput,
        language: &str,
        report: &ProgressFn<'_>,
    ) -> Result<RecognitionResult, OcrError> {
        if self.primary.accepts(image) {
            match self.primary.recognize(image, language, report).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if !err.is_fallback_eligible() {
                        log::warn!("{} engine reported a non-retryable error", self.primary.kind());
                    }
                    log::warn!("Cloud OCR failed, falling back to local OCR: {}", err);
                }
            }
        } else {
            log::info!("{} is not eligible for cloud OCR, using local OCR", image.describe());
        }

        self.secondary.recognize(image, language, report).await
    }

    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = OrchestratorState::starting();
        });
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn publish_progress(&self, generation: u64, progress: RecognitionProgress) {
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) || !state.is_running {
                return false;
            }
            // percent never goes backwards within one operation
            let percent = progress.percent.max(state.progress.percent);
            let next = RecognitionProgress { percent, ..progress };
            if state.progress == next {
                return false;
            }
            state.progress = next;
            true
        });
    }

    fn finish(&self, generation: u64, outcome: &RecognitionOutcome) {
        let published = self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            state.is_running = false;
            state.progress = match outcome {
                RecognitionOutcome::Success(_) => RecognitionProgress::new(100, RecognitionPhase::Done, "Complete!"),
                RecognitionOutcome::Failure { .. } => {
                    RecognitionProgress::new(state.progress.percent, RecognitionPhase::Done, "Failed")
                }
            };
            state.outcome = Some(outcome.clone());
            true
        });

        if !published {
            log::debug!("Discarding outcome of superseded recognition {}", generation);
        }
    }
}
