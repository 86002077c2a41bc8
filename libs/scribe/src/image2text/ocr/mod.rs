// Local OCR engine and its adapter
mod types;
pub use types::{EngineEvent, EngineOutput, EventFn, LocalEngine, OcrConfig, DEFAULT_LANGUAGE};

mod ocr_tesseract;
pub use ocr_tesseract::TesseractEngine;

mod local_adapter;
pub use local_adapter::{map_engine_event, LocalOcrAdapter};
