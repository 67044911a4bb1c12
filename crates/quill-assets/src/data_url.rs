//! Base64 data URL encoding and decoding.
//!
//! Data URLs are the interchange format for contexts that can only hold
//! text (JSON exports, clipboard payloads). Round-tripping preserves byte
//! length and MIME type exactly.

use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;

use crate::AssetError;

/// Regex to match `data:<mime>;base64,<payload>`.
static DATA_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:([^;,]+);base64,(.*)$").unwrap());

/// Encode bytes as a base64 data URL with the given MIME type.
#[must_use]
pub fn encode_data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(data))
}

/// Decode a base64 data URL into its MIME type and bytes.
///
/// # Errors
///
/// Returns [`AssetError::InvalidDataUrl`] when the input does not match the
/// `data:<mime>;base64,<payload>` shape, or [`AssetError::Base64`] when the
/// payload is not valid base64.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), AssetError> {
    let caps = DATA_URL_RE
        .captures(url)
        .ok_or(AssetError::InvalidDataUrl)?;
    let mime_type = caps[1].to_owned();
    let data = STANDARD.decode(&caps[2])?;
    Ok((mime_type, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_known_value() {
        let url = encode_data_url("text/plain", b"hello");

        assert_eq!(url, "data:text/plain;base64,aGVsbG8=");
    }

    #[test]
    fn test_round_trip_preserves_size_and_mime() {
        let data: Vec<u8> = (0..=255).collect();

        let url = encode_data_url("image/png", &data);
        let (mime_type, decoded) = decode_data_url(&url).unwrap();

        assert_eq!(mime_type, "image/png");
        assert_eq!(decoded.len(), data.len());
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_round_trip_empty_payload() {
        let url = encode_data_url("application/octet-stream", b"");
        let (mime_type, decoded) = decode_data_url(&url).unwrap();

        assert_eq!(mime_type, "application/octet-stream");
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_decode_rejects_non_data_url() {
        assert!(matches!(
            decode_data_url("https://example.com/image.png"),
            Err(AssetError::InvalidDataUrl)
        ));
    }

    #[test]
    fn test_decode_rejects_missing_base64_marker() {
        assert!(matches!(
            decode_data_url("data:text/plain,hello"),
            Err(AssetError::InvalidDataUrl)
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_base64_payload() {
        assert!(matches!(
            decode_data_url("data:text/plain;base64,!!!not-base64!!!"),
            Err(AssetError::Base64(_))
        ));
    }

    #[test]
    fn test_decode_extracts_mime_with_suffix() {
        let (mime_type, data) = decode_data_url("data:image/svg+xml;base64,PHN2Zz4=").unwrap();

        assert_eq!(mime_type, "image/svg+xml");
        assert_eq!(data, b"<svg>");
    }
}
