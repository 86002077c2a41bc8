use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};

pub fn get_current_timestamp_str() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Resolve an image reference into raw bytes.
///
/// Accepts `data:` URIs, `http(s)://` URLs and local file paths.
pub async fn load_reference(reference: &str) -> Result<Vec<u8>> {
    let reference = reference.trim();
    if reference.is_empty() {
        anyhow::bail!("Empty image reference");
    }

    if let Some(data_uri) = reference.strip_prefix("data:") {
        return decode_data_uri(data_uri);
    }

    if reference.starts_with("http://") || reference.starts_with("https://") {
        let response = reqwest::get(reference)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to download image {}: {}", reference, e))?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to download image {}: HTTP {}", reference, response.status());
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read image bytes from {}: {}", reference, e))?;
        return Ok(bytes.to_vec());
    }

    tokio::fs::read(reference)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read image file {}: {}", reference, e))
}

// `data:` prefix already stripped
fn decode_data_uri(data_uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = data_uri
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("Invalid data URI: missing data part"))?;

    if !header.ends_with(";base64") {
        anyhow::bail!("Unsupported data URI encoding, expected base64");
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| anyhow::anyhow!("Failed to decode base64 data: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_reference_data_uri() {
        let encoded = STANDARD.encode(b"fake-png");
        let bytes = load_reference(&format!("data:image/png;base64,{}", encoded))
            .await
            .unwrap();
        assert_eq!(bytes, b"fake-png");
    }

    #[tokio::test]
    async fn test_load_reference_rejects_plain_data_uri() {
        let result = load_reference("data:text/plain,hello").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_reference_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.png");
        std::fs::write(&path, b"bytes on disk").unwrap();

        let bytes = load_reference(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"bytes on disk");
    }

    #[tokio::test]
    async fn test_load_reference_missing_file() {
        let result = load_reference("/definitely/not/here.png").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_reference_empty() {
        assert!(load_reference("   ").await.is_err());
    }
}
