//! Message framing.
//!
//! One frame carries one message: the UTF-8 bytes of the text, base64
//! encoded (standard alphabet, padded). There is no length prefix and no
//! fragmentation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{Error, Result};

/// Encode a text message into a transport frame.
///
/// # Example
///
/// ```
/// use proximity_link_ble::protocol::encode_frame;
///
/// assert_eq!(encode_frame("hi"), b"aGk=".to_vec());
/// ```
pub fn encode_frame(text: &str) -> Vec<u8> {
    STANDARD.encode(text.as_bytes()).into_bytes()
}

/// Decode a transport frame back into text.
///
/// Surrounding ASCII whitespace is ignored.
///
/// # Errors
///
/// Returns [`Error::NotificationDecode`] when the frame is not valid base64
/// or the payload is not valid UTF-8.
pub fn decode_frame(frame: &[u8]) -> Result<String> {
    let trimmed = trim_ascii_whitespace(frame);

    let payload = STANDARD
        .decode(trimmed)
        .map_err(|e| Error::NotificationDecode {
            context: format!("invalid base64 ({} bytes): {}", frame.len(), e),
        })?;

    String::from_utf8(payload).map_err(|e| Error::NotificationDecode {
        context: format!("payload is not UTF-8: {}", e),
    })
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}
