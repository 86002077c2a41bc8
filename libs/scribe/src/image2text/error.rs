use thiserror::Error;

/// Failures an OCR engine can report.
///
/// Every remote-side variant is fallback-eligible; only `EngineFatal`
/// ends an operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OcrError {
    #[error("OCR service not configured: {0}")]
    Configuration(String),

    #[error("OCR transport error: {0}")]
    Transport(String),

    #[error("OCR service error: {0}")]
    Upstream(String),

    #[error("{0}")]
    EngineFatal(String),
}

impl OcrError {
    pub fn is_fallback_eligible(&self) -> bool {
        !matches!(self, OcrError::EngineFatal(_))
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            OcrError::EngineFatal(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for OcrError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OcrError::Transport(format!("request timed out: {}", err))
        } else {
            OcrError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_eligibility() {
        assert!(OcrError::Configuration("missing url".into()).is_fallback_eligible());
        assert!(OcrError::Transport("connection refused".into()).is_fallback_eligible());
        assert!(OcrError::Upstream("quota".into()).is_fallback_eligible());
        assert!(!OcrError::EngineFatal("engine crashed".into()).is_fallback_eligible());
    }

    #[test]
    fn test_engine_fatal_message_is_verbatim() {
        let err = OcrError::EngineFatal("Unsupported image format".into());
        assert_eq!(err.user_message(), "Unsupported image format");
        assert_eq!(err.to_string(), "Unsupported image format");
    }
}
