//! Downloaded subtitle payloads and their decode pipeline.
//!
//! The service carries subtitle files as base64-encoded gzip streams. A
//! [`SubtitleFile`] arrives encoded and decodes at most once, on first
//! read; the decoded bytes are kept so repeated reads never redo the
//! decompression.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use encoding_rs::Encoding;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

/// Errors from the payload codec.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Malformed transport encoding or corrupt compressed stream.
    #[error("failed to decode subtitle payload: {0}")]
    Decode(String),

    /// The search record named a character encoding nobody recognizes.
    /// Distinct from [`PayloadError::Decode`]: the bytes would
    /// decompress, but transcoding them is impossible.
    #[error("unknown character encoding {0:?}")]
    UnknownEncoding(String),
}

/// Explicit two-state payload: transport text until first read, decoded
/// bytes after. The transition happens at most once.
#[derive(Debug, Clone)]
enum PayloadState {
    Encoded(String),
    Decoded(Vec<u8>),
}

/// A subtitle file as returned by the download call.
#[derive(Debug, Clone)]
pub struct SubtitleFile {
    /// The service's file identifier.
    pub id: String,
    encoding: Option<&'static Encoding>,
    state: PayloadState,
}

impl SubtitleFile {
    /// Wrap a transport-encoded payload.
    pub fn new(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            encoding: None,
            state: PayloadState::Encoded(data.into()),
        }
    }

    /// Attach the character encoding the payload should be transcoded
    /// from. Without one, decoded bytes pass through unchanged.
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Attach the character encoding after construction.
    pub fn set_encoding(&mut self, encoding: &'static Encoding) {
        self.encoding = Some(encoding);
    }

    pub fn encoding(&self) -> Option<&'static Encoding> {
        self.encoding
    }

    /// The decoded subtitle text.
    ///
    /// Decodes on first call and caches; later calls reuse the decoded
    /// bytes. With an attached encoding the text is transcoded to UTF-8,
    /// otherwise the decompressed bytes are returned as-is.
    pub fn contents(&mut self) -> Result<&[u8], PayloadError> {
        if let PayloadState::Encoded(data) = &self.state {
            let decoded = decode_payload(data, self.encoding)?;
            self.state = PayloadState::Decoded(decoded);
        }
        match &self.state {
            PayloadState::Decoded(bytes) => Ok(bytes),
            PayloadState::Encoded(_) => unreachable!("payload decoded above"),
        }
    }
}

/// Resolve a service-reported encoding name to an encoding.
///
/// The service reports WHATWG-style labels ("CP1251", "UTF-8", ...).
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, PayloadError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| PayloadError::UnknownEncoding(label.to_string()))
}

/// Run the full decode pipeline: base64, then gzip, then optional
/// transcoding to UTF-8.
fn decode_payload(
    data: &str,
    encoding: Option<&'static Encoding>,
) -> Result<Vec<u8>, PayloadError> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    let compressed = BASE64
        .decode(compact)
        .map_err(|e| PayloadError::Decode(format!("invalid base64: {e}")))?;

    let mut raw = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut raw)
        .map_err(|e| PayloadError::Decode(format!("corrupt gzip stream: {e}")))?;

    match encoding {
        None => Ok(raw),
        Some(encoding) => {
            let (text, _, _) = encoding.decode(&raw);
            Ok(text.into_owned().into_bytes())
        }
    }
}

/// Encode bytes the way the service expects file content on upload:
/// gzip, then base64.
pub fn encode_payload(bytes: &[u8]) -> Result<String, std::io::Error> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    let compressed = encoder.finish()?;
    Ok(BASE64.encode(compressed))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"1\n00:00:01,000 --> 00:00:02,000\nHello.\n";

    #[test]
    fn test_round_trip_without_encoding() {
        let encoded = encode_payload(SAMPLE).unwrap();
        let mut file = SubtitleFile::new("42", encoded);
        assert_eq!(file.contents().unwrap(), SAMPLE);
    }

    #[test]
    fn test_contents_is_idempotent() {
        let encoded = encode_payload(SAMPLE).unwrap();
        let mut file = SubtitleFile::new("42", encoded);
        let first = file.contents().unwrap().to_vec();
        let second = file.contents().unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_with_whitespace_in_base64() {
        let mut encoded = encode_payload(SAMPLE).unwrap();
        encoded.insert(8, '\n');
        let mut file = SubtitleFile::new("42", encoded);
        assert_eq!(file.contents().unwrap(), SAMPLE);
    }

    #[test]
    fn test_transcodes_hinted_encoding() {
        // "Да" in windows-1251.
        let cyrillic = [0xc4u8, 0xe0];
        let encoded = encode_payload(&cyrillic).unwrap();
        let mut file =
            SubtitleFile::new("42", encoded).with_encoding(resolve_encoding("CP1251").unwrap());
        assert_eq!(file.contents().unwrap(), "Да".as_bytes());
    }

    #[test]
    fn test_malformed_base64_is_decode_error() {
        let mut file = SubtitleFile::new("42", "!!! not base64 !!!");
        assert!(matches!(file.contents(), Err(PayloadError::Decode(_))));
    }

    #[test]
    fn test_corrupt_gzip_is_decode_error() {
        let mut file = SubtitleFile::new("42", BASE64.encode(b"not gzip at all"));
        assert!(matches!(file.contents(), Err(PayloadError::Decode(_))));
    }

    #[test]
    fn test_unknown_encoding_name() {
        let result = resolve_encoding("klingon-8");
        assert!(matches!(result, Err(PayloadError::UnknownEncoding(_))));
    }

    #[test]
    fn test_resolve_common_service_labels() {
        assert!(resolve_encoding("UTF-8").is_ok());
        assert!(resolve_encoding("CP1251").is_ok());
        assert!(resolve_encoding("ISO-8859-1").is_ok());
    }
}
