//! Reading result dumps, block lists and keyword lists from disk

use crate::error::ProbeError;
use serde_json::Value;
use std::path::Path;

fn read_text(path: &Path) -> Result<String, ProbeError> {
    std::fs::read_to_string(path).map_err(|e| ProbeError::io(path, e))
}

/// Load a JSON dump of a detection result
pub fn read_json(path: &Path) -> Result<Value, ProbeError> {
    let contents = read_text(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        ProbeError::InvalidInput(format!("{} is not valid JSON: {}", path.display(), e))
    })
}

/// Load text blocks: a JSON array of strings, or one block per line
pub fn read_blocks(path: &Path) -> Result<Vec<String>, ProbeError> {
    let contents = read_text(path)?;
    parse_blocks(&contents)
        .map_err(|reason| ProbeError::InvalidInput(format!("{}: {}", path.display(), reason)))
}

fn parse_blocks(contents: &str) -> Result<Vec<String>, String> {
    if contents.trim_start().starts_with('[') {
        return serde_json::from_str::<Vec<String>>(contents)
            .map_err(|e| format!("expected a JSON array of strings: {}", e));
    }

    Ok(contents
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect())
}

/// Load keywords, one per line; blank lines are ignored
pub fn read_keywords(path: &Path) -> Result<Vec<String>, ProbeError> {
    let contents = read_text(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_blocks_json_array() {
        let blocks = parse_blocks(r#"["Educational objective:", "References"]"#).unwrap();
        assert_eq!(blocks, vec!["Educational objective:", "References"]);
    }

    #[test]
    fn test_parse_blocks_rejects_mixed_array() {
        assert!(parse_blocks(r#"["a", 1]"#).is_err());
    }

    #[test]
    fn test_parse_blocks_plain_lines_keep_blank_lines() {
        let blocks = parse_blocks("Ulna\r\n\nRadius\n").unwrap();
        assert_eq!(blocks, vec!["Ulna", "", "Radius"]);
    }

    #[test]
    fn test_read_keywords_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "thenar atrophy\n\n  positive Tinel sign  ").unwrap();

        let keywords = read_keywords(file.path()).unwrap();

        assert_eq!(keywords, vec!["thenar atrophy", "positive Tinel sign"]);
    }

    #[test]
    fn test_read_json_reports_invalid_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = read_json(file.path()).unwrap_err();

        assert!(matches!(err, ProbeError::InvalidInput(_)));
    }
}
