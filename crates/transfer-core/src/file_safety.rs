//! Path safety for the pending-upload store.
//!
//! Client-supplied filenames and upload tokens both become path segments
//! under the upload root, so neither may name a parent directory.

use crate::error::{Error, Result};

const MAX_FILENAME_BYTES: usize = 255;

/// Reduce a client filename to a safe base name.
///
/// Path components are dropped, reserved characters are replaced with `_`,
/// and names that end up empty or dot-only become `unnamed_file`.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        return "unnamed_file".to_string();
    }

    if sanitized.len() > MAX_FILENAME_BYTES {
        let ext = sanitized
            .rfind('.')
            .map(|pos| &sanitized[pos..])
            .filter(|ext| ext.len() < 16)
            .unwrap_or("");
        let stem = truncate_on_char_boundary(sanitized, MAX_FILENAME_BYTES - ext.len());
        let stem = stem.strip_suffix(ext).unwrap_or(stem);
        return format!("{}{}", stem, ext);
    }

    sanitized.to_string()
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Check that an upload token is a single safe path segment.
///
/// Tokens are issued as UUID simple strings, but older clients may send any
/// identifier made of ASCII alphanumerics, `-` and `_`.
pub fn validate_upload_token(token: &str) -> Result<&str> {
    if token.is_empty() {
        return Err(Error::Validation("upload identifier is required".to_string()));
    }
    if token.len() > 128 {
        return Err(Error::Validation("upload identifier is too long".to_string()));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Validation(format!(
            "invalid upload identifier '{}'",
            token
        )));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_removes_path() {
        assert_eq!(sanitize_filename("/etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\minutes.docx"), "minutes.docx");
        assert_eq!(sanitize_filename("../../report.pdf"), "report.pdf");
    }

    #[test]
    fn test_sanitize_removes_dangerous_chars() {
        assert_eq!(sanitize_filename("file<>:test.txt"), "file___test.txt");
        assert_eq!(sanitize_filename("file|name?.txt"), "file_name_.txt");
    }

    #[test]
    fn test_sanitize_rejects_dot_names() {
        assert_eq!(sanitize_filename(".."), "unnamed_file");
        assert_eq!(sanitize_filename("a/.."), "unnamed_file");
        assert_eq!(sanitize_filename(""), "unnamed_file");
        assert_eq!(sanitize_filename("   "), "unnamed_file");
    }

    #[test]
    fn test_sanitize_truncates_long_names() {
        let long_name = format!("{}.tiff", "a".repeat(300));
        let sanitized = sanitize_filename(&long_name);
        assert!(sanitized.len() <= 255);
        assert!(sanitized.ends_with(".tiff"));
    }

    #[test]
    fn test_sanitize_truncates_multibyte_names() {
        let long_name = format!("{}.pdf", "é".repeat(200));
        let sanitized = sanitize_filename(&long_name);
        assert!(sanitized.len() <= 255);
        assert!(sanitized.ends_with(".pdf"));
    }

    #[test]
    fn test_sanitize_keeps_ordinary_names() {
        assert_eq!(sanitize_filename("Board Minutes 1987.pdf"), "Board Minutes 1987.pdf");
    }

    #[test]
    fn test_token_accepts_uuid_simple() {
        let token = "0192b7c4a1f07c3e9d5b2a1f0e9d8c7b";
        assert_eq!(validate_upload_token(token).unwrap(), token);
        assert!(validate_upload_token("legacy-token_01").is_ok());
    }

    #[test]
    fn test_token_rejects_traversal() {
        assert!(matches!(validate_upload_token(".."), Err(Error::Validation(_))));
        assert!(matches!(validate_upload_token("a/b"), Err(Error::Validation(_))));
        assert!(matches!(validate_upload_token(""), Err(Error::Validation(_))));
        assert!(matches!(
            validate_upload_token(&"x".repeat(129)),
            Err(Error::Validation(_))
        ));
    }
}
