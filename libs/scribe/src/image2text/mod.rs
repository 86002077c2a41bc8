mod error;
pub use error::OcrError;

mod types;
pub use types::{EngineKind, OcrEngine, ProgressFn, RecognitionPhase, RecognitionProgress, RecognitionResult};

pub mod normalize;
pub use normalize::{ConfidenceDefaults, Normalized, ResponseNormalizer, ResponseShape};

pub mod ocr;
pub use ocr::{EngineEvent, EngineOutput, LocalEngine, LocalOcrAdapter, OcrConfig, TesseractEngine, DEFAULT_LANGUAGE};

pub mod remote;
pub use remote::{RemoteConfig, RemoteOcrEngine};
