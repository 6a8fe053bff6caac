//! Opaque result identifiers.
//!
//! A result id names exactly one stored PDF: the `"{openid}/{filename}"`
//! pair, UTF-8 encoded, base64url with padding stripped. Both directions
//! validate strictly so a decoded id can be joined onto the store root
//! without further checks on its shape.

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::errors::AppError;

/// Trims and validates an owner id: non-empty, no path separators.
pub(crate) fn sanitize_openid(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("openid must not be empty".to_string()));
    }
    if trimmed.contains(['/', '\\']) {
        return Err(AppError::Validation(
            "openid must not contain path separators".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Encodes an `(openid, filename)` pair into an opaque, URL-safe id.
/// Only the final path segment of `filename` is used.
pub fn encode_result_id(openid: &str, filename: &str) -> Result<String, AppError> {
    let safe_openid = sanitize_openid(openid)?;
    let safe_filename = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| AppError::Validation("filename has no usable final segment".to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(format!("{safe_openid}/{safe_filename}")))
}

/// Decodes a result id back into its `(openid, filename)` pair.
///
/// Every malformation maps to `InvalidIdentifier`: bad base64, non-UTF-8
/// payload, missing separator, empty or separator-bearing openid,
/// multi-segment or dot-only filename, non-`.pdf` extension.
pub fn decode_result_id(result_id: &str) -> Result<(String, String), AppError> {
    let raw = URL_SAFE_NO_PAD
        .decode(result_id)
        .map_err(|_| AppError::InvalidIdentifier("not URL-safe base64".to_string()))?;
    let decoded = String::from_utf8(raw)
        .map_err(|_| AppError::InvalidIdentifier("payload is not UTF-8".to_string()))?;

    let Some((openid, filename)) = decoded.split_once('/') else {
        return Err(AppError::InvalidIdentifier(
            "missing owner/filename separator".to_string(),
        ));
    };

    let openid = sanitize_openid(openid)
        .map_err(|_| AppError::InvalidIdentifier("invalid owner segment".to_string()))?;

    if filename.is_empty() || filename == "." || filename == ".." || filename.contains(['/', '\\'])
    {
        return Err(AppError::InvalidIdentifier(
            "invalid filename segment".to_string(),
        ));
    }
    if !filename.to_ascii_lowercase().ends_with(".pdf") {
        return Err(AppError::InvalidIdentifier(
            "only PDF results are addressable".to_string(),
        ));
    }

    Ok((openid, filename.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let id = encode_result_id("u123", "1700000100.pdf").unwrap();
        assert_eq!(
            decode_result_id(&id).unwrap(),
            ("u123".to_string(), "1700000100.pdf".to_string())
        );
    }

    #[test]
    fn test_round_trip_unicode_openid() {
        let id = encode_result_id("用户-42", "resume.PDF").unwrap();
        assert_eq!(
            decode_result_id(&id).unwrap(),
            ("用户-42".to_string(), "resume.PDF".to_string())
        );
    }

    #[test]
    fn test_encode_strips_directory_components() {
        let a = encode_result_id("u123", "/tmp/evil/1700000100.pdf").unwrap();
        let b = encode_result_id("u123", "1700000100.pdf").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_rejects_empty_openid() {
        assert!(matches!(
            encode_result_id("   ", "a.pdf"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_encode_rejects_openid_with_separator() {
        assert!(matches!(
            encode_result_id("a/b", "a.pdf"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            encode_result_id("a\\b", "a.pdf"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage_base64() {
        assert!(matches!(
            decode_result_id("%%%not-base64%%%"),
            Err(AppError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_decode_rejects_missing_separator() {
        let id = URL_SAFE_NO_PAD.encode("no-separator-here.pdf");
        assert!(matches!(
            decode_result_id(&id),
            Err(AppError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_decode_rejects_empty_openid() {
        let id = URL_SAFE_NO_PAD.encode("/a.pdf");
        assert!(matches!(
            decode_result_id(&id),
            Err(AppError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_decode_rejects_traversal_filename() {
        let id = URL_SAFE_NO_PAD.encode("u123/../../etc/passwd");
        assert!(matches!(
            decode_result_id(&id),
            Err(AppError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_decode_rejects_dot_filenames() {
        for payload in ["u123/.", "u123/..", "u123/"] {
            let id = URL_SAFE_NO_PAD.encode(payload);
            assert!(
                matches!(decode_result_id(&id), Err(AppError::InvalidIdentifier(_))),
                "accepted {payload:?}"
            );
        }
    }

    #[test]
    fn test_decode_rejects_non_pdf_extension() {
        let id = URL_SAFE_NO_PAD.encode("u123/notes.txt");
        assert!(matches!(
            decode_result_id(&id),
            Err(AppError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_utf8_payload() {
        let id = URL_SAFE_NO_PAD.encode([0xffu8, 0xfe, 0x2f, 0x61]);
        assert!(matches!(
            decode_result_id(&id),
            Err(AppError::InvalidIdentifier(_))
        ));
    }
}
