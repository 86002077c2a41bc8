use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use scribe::common::{mime_type_from_path, ImageInput, DEFAULT_FILE_NAME};
use scribe::history::{HistoryItem, HistoryStore};
use scribe::image2text::RecognitionResult;
use scribe::process::{OrchestratorState, RecognitionOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiResponse, AppState};

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(data: T) -> Reply<T> {
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

fn error<T>(status: StatusCode, message: impl Into<String>) -> Reply<T> {
    (status, Json(ApiResponse::error(message)))
}

fn default_save() -> bool {
    true
}

/// Either `image` (base64, optionally as a data URI) or `reference`.
#[derive(Deserialize)]
pub struct ProcessImageRequest {
    image: Option<String>,
    file_name: Option<String>,
    mime_type: Option<String>,
    reference: Option<String>,
    language: Option<String>,
    #[serde(default = "default_save")]
    save: bool,
}

#[derive(Serialize)]
pub struct ProcessImageData {
    result: RecognitionResult,
    history_id: Option<String>,
}

pub async fn process_image(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProcessImageRequest>,
) -> Reply<ProcessImageData> {
    let (image, original) = match (payload.image, payload.reference) {
        (Some(data), None) => match decode_upload(&data, payload.file_name, payload.mime_type) {
            Ok(decoded) => decoded,
            Err(message) => {
                log::error!("Rejected upload: {}", message);
                return error(StatusCode::BAD_REQUEST, message);
            }
        },
        (None, Some(reference)) if !reference.trim().is_empty() => {
            let reference = reference.trim().to_string();
            (ImageInput::from_reference(reference.clone()), reference)
        }
        _ => {
            return error(
                StatusCode::BAD_REQUEST,
                "Provide exactly one of `image` or `reference`",
            )
        }
    };

    log::info!("Processing {}", image.describe());
    let outcome = state
        .orchestrator
        .process_image(&image, payload.language.as_deref())
        .await;

    match outcome {
        RecognitionOutcome::Success(result) => {
            let history_id = if payload.save {
                record_history(&state, &original, &result)
            } else {
                None
            };
            ok(ProcessImageData { result, history_id })
        }
        RecognitionOutcome::Failure { message } => error(StatusCode::UNPROCESSABLE_ENTITY, message),
    }
}

/// Returns the decoded input and a data URI to keep in history.
fn decode_upload(
    data: &str,
    file_name: Option<String>,
    mime_type: Option<String>,
) -> Result<(ImageInput, String), String> {
    let data = data.trim();
    let (header_mime, encoded) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| "Invalid data URI: missing data part".to_string())?;
            let mime = header
                .split(';')
                .next()
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            (mime, payload.trim())
        }
        None => (None, data),
    };

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| format!("Failed to decode base64 data: {}", e))?;
    if bytes.is_empty() {
        return Err("Image is empty".to_string());
    }

    let file_name = file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
    let mime_type = mime_type
        .filter(|mime| !mime.trim().is_empty())
        .or(header_mime)
        .unwrap_or_else(|| mime_type_from_path(std::path::Path::new(&file_name)).to_string());

    let original = format!("data:{};base64,{}", mime_type, encoded);
    log::debug!("Decoded {} bytes of {} data", bytes.len(), mime_type);
    Ok((ImageInput::from_bytes(bytes, file_name, mime_type), original))
}

fn record_history(state: &AppState, original: &str, result: &RecognitionResult) -> Option<String> {
    match with_history(state, |history| history.add(original, result)) {
        Ok(item) => Some(item.id),
        Err(message) => {
            log::error!("Failed to record history: {}", message);
            None
        }
    }
}

fn with_history<T>(state: &AppState, f: impl FnOnce(&HistoryStore) -> anyhow::Result<T>) -> Result<T, String> {
    let history = state
        .history
        .lock()
        .map_err(|_| "History store is unavailable".to_string())?;
    f(&history).map_err(|e| e.to_string())
}

pub async fn get_state(State(state): State<Arc<AppState>>) -> Reply<OrchestratorState> {
    ok(state.orchestrator.state())
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Reply<OrchestratorState> {
    log::info!("Resetting recognition state");
    state.orchestrator.reset();
    ok(state.orchestrator.state())
}

pub async fn list_history(State(state): State<Arc<AppState>>) -> Reply<Vec<HistoryItem>> {
    match with_history(&state, |history| history.list()) {
        Ok(items) => ok(items),
        Err(message) => error(StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

pub async fn clear_history(State(state): State<Arc<AppState>>) -> Reply<usize> {
    match with_history(&state, |history| history.clear()) {
        Ok(removed) => {
            log::info!("Cleared {} history entries", removed);
            ok(removed)
        }
        Err(message) => error(StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

pub async fn get_history_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Reply<HistoryItem> {
    match with_history(&state, |history| history.get(&id)) {
        Ok(Some(item)) => ok(item),
        Ok(None) => error(StatusCode::NOT_FOUND, format!("No history entry {}", id)),
        Err(message) => error(StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

pub async fn remove_history_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Reply<String> {
    match with_history(&state, |history| history.remove(&id)) {
        Ok(true) => ok(id),
        Ok(false) => error(StatusCode::NOT_FOUND, format!("No history entry {}", id)),
        Err(message) => error(StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_uri_upload() {
        let data = format!("data:image/png;base64,{}", STANDARD.encode(b"png bytes"));
        let (image, original) = decode_upload(&data, None, None).unwrap();

        assert_eq!(
            image,
            ImageInput::from_bytes(b"png bytes".to_vec(), DEFAULT_FILE_NAME, "image/png")
        );
        assert_eq!(original, data);
    }

    #[test]
    fn test_decode_plain_base64_uses_file_name_for_mime() {
        let data = STANDARD.encode(b"jpeg bytes");
        let (image, original) = decode_upload(&data, Some("receipt.webp".to_string()), None).unwrap();

        assert_eq!(
            image,
            ImageInput::from_bytes(b"jpeg bytes".to_vec(), "receipt.webp", "image/webp")
        );
        assert!(original.starts_with("data:image/webp;base64,"));
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(decode_upload("data:image/png;base64", None, None).is_err());
        assert!(decode_upload("not base64!!", None, None).is_err());
        assert_eq!(decode_upload("", None, None).unwrap_err(), "Image is empty");
    }
}
