use anyhow::{Context, Result};
use std::path::Path;

use crate::common::get_current_timestamp_str;
use crate::image2text::RecognitionResult;

pub const EXPORT_TITLE: &str = "ScribeScan - Recognized Document";

/// Plain-text rendering of a recognition: a header block followed by the text.
pub fn export_text(result: &RecognitionResult, source: &str) -> String {
    let rule = "=".repeat(EXPORT_TITLE.len());
    let mut out = String::new();

    out.push_str(EXPORT_TITLE);
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("Generated: {}\n", get_current_timestamp_str()));
    if !source.trim().is_empty() {
        out.push_str(&format!("Source: {}\n", source.trim()));
    }
    out.push_str(&format!("Engine: {}\n", result.engine));
    out.push_str(&format!("Confidence: {:.0}%\n", result.confidence));
    out.push('\n');
    out.push_str(&result.text);
    out.push('\n');
    out
}

pub fn write_text_export(path: impl AsRef<Path>, result: &RecognitionResult, source: &str) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, export_text(result, source))
        .with_context(|| format!("Failed to write export to {}", path.display()))?;
    log::info!("Exported recognized text to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image2text::EngineKind;

    #[test]
    fn test_export_layout() {
        let result = RecognitionResult::new("Buy milk\nCall Alex", 91.6, EngineKind::Secondary);
        let doc = export_text(&result, "notes/fridge.jpg");
        let lines: Vec<&str> = doc.lines().collect();

        assert_eq!(lines[0], EXPORT_TITLE);
        assert!(lines[2].starts_with("Generated: "));
        assert_eq!(lines[3], "Source: notes/fridge.jpg");
        assert_eq!(lines[4], "Engine: Secondary");
        assert_eq!(lines[5], "Confidence: 92%");
        assert_eq!(lines[6], "");
        assert_eq!(&lines[7..], ["Buy milk", "Call Alex"]);
    }

    #[test]
    fn test_export_without_source() {
        let result = RecognitionResult::new("x", 85.0, EngineKind::Primary);
        assert!(!export_text(&result, "  ").contains("Source:"));
    }

    #[test]
    fn test_write_text_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let result = RecognitionResult::new("hello", 85.0, EngineKind::Primary);

        write_text_export(&path, &result, "a.png").unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with("hello\n"));

        let missing_dir = dir.path().join("nope").join("out.txt");
        assert!(write_text_export(&missing_dir, &result, "a.png").is_err());
    }
}
