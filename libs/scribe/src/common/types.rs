use anyhow::Result;
use std::path::Path;

pub const DEFAULT_FILE_NAME: &str = "image.jpg";
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Image handed to the orchestrator for one recognition.
///
/// Only `Binary` is eligible for the remote engine; a `Reference`
/// (URL, data URI or local path) goes straight to the local engine.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageInput {
    Binary {
        bytes: Vec<u8>,
        file_name: String,
        mime_type: String,
    },
    Reference(String),
}

impl ImageInput {
    pub fn from_bytes(bytes: Vec<u8>, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Binary {
            bytes,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn from_reference(reference: impl Into<String>) -> Self {
        Self::Reference(reference.into())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read image from {}: {}", path.display(), e))?;
        let file_name = path
            .file_name()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();

        Ok(Self::Binary {
            bytes,
            file_name,
            mime_type: mime_type_from_path(path).to_string(),
        })
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary { .. })
    }

    /// Short label for logs and history entries.
    pub fn describe(&self) -> String {
        match self {
            Self::Binary { file_name, bytes, .. } => format!("{} ({} bytes)", file_name, bytes.len()),
            Self::Reference(reference) if reference.starts_with("data:") => "inline data URI".to_string(),
            Self::Reference(reference) => reference.clone(),
        }
    }
}

pub fn mime_type_from_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => DEFAULT_MIME_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_from_path() {
        assert_eq!(mime_type_from_path(Path::new("scan.PNG")), "image/png");
        assert_eq!(mime_type_from_path(Path::new("a/b/note.jpeg")), "image/jpeg");
        assert_eq!(mime_type_from_path(Path::new("page.tif")), "image/tiff");
        assert_eq!(mime_type_from_path(Path::new("notes")), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_from_path_reads_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letter.webp");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let input = ImageInput::from_path(&path).unwrap();
        assert!(input.is_binary());
        assert_eq!(
            input,
            ImageInput::from_bytes(vec![1, 2, 3], "letter.webp", "image/webp")
        );
    }

    #[test]
    fn test_reference_is_not_binary() {
        let input = ImageInput::from_reference("https://example.com/note.png");
        assert!(!input.is_binary());
        assert_eq!(input.describe(), "https://example.com/note.png");
        assert_eq!(
            ImageInput::from_reference("data:image/png;base64,AAAA").describe(),
            "inline data URI"
        );
    }
}
