mod types;
pub use types::{OrchestratorState, ProcessorConfig, RecognitionOutcome};

mod orchestrator;
pub use orchestrator::OcrOrchestrator;
