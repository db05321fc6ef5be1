//! Command and response values with their frame encoding.
//!
//! Uses `bytes::Bytes` so payloads and messages can be shared without
//! copying.
//!
//! # Example
//!
//! ```
//! use verifier_client::protocol::{Command, Opcode};
//!
//! let command = Command::text("( foo )\r\n");
//! assert_eq!(command.opcode, Opcode::Text);
//! assert_eq!(command.payload(), b"( foo )");
//!
//! let frame = command.encode().unwrap();
//! assert_eq!(&frame[..3], &[0, 0, 8]);
//! ```

use std::borrow::Cow;

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{
    codes, decode_ancillary, encode_ancillary, encode_length, Opcode, ANCILLARY_SIZE,
    LATEST_REVISION, LENGTH_PREFIX_SIZE,
};
use crate::error::{Result, VerifierError};

/// A request to the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command opcode.
    pub opcode: Opcode,
    /// Ancillary byte string (may be empty).
    pub payload: Bytes,
    /// Ancillary integer. `None` is distinct from `Some(-1)`.
    pub integer: Option<i64>,
}

impl Command {
    /// Create a command from its parts.
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>, integer: Option<i64>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
            integer,
        }
    }

    /// QUIT: end the session.
    pub fn quit() -> Self {
        Self::new(Opcode::Quit, Bytes::new(), None)
    }

    /// MOD: start streaming a proof module.
    pub fn module() -> Self {
        Self::new(Opcode::Mod, Bytes::new(), None)
    }

    /// IFACE: start streaming the interface module stored under `locator`.
    ///
    /// Pass [`LATEST_REVISION`] to let the verifier resolve the revision.
    pub fn interface(locator: &str, revision: i64) -> Self {
        Self::new(
            Opcode::Iface,
            Bytes::copy_from_slice(locator.as_bytes()),
            Some(revision),
        )
    }

    /// IFACE for the latest revision of `locator`.
    pub fn interface_latest(locator: &str) -> Self {
        Self::interface(locator, LATEST_REVISION)
    }

    /// TEXT: submit a chunk of proof text, trailing CR/LF stripped.
    pub fn text(chunk: &str) -> Self {
        let trimmed = chunk.trim_end_matches(['\r', '\n']);
        Self::new(
            Opcode::Text,
            Bytes::copy_from_slice(trimmed.as_bytes()),
            None,
        )
    }

    /// FINISH: end text streaming.
    pub fn finish() -> Self {
        Self::new(Opcode::Finish, Bytes::new(), None)
    }

    /// DEL: delete one stored revision of `locator`.
    pub fn delete(locator: &str, revision: i64) -> Self {
        Self::new(
            Opcode::Del,
            Bytes::copy_from_slice(locator.as_bytes()),
            Some(revision),
        )
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Length of the body: opcode, payload and optional integer.
    #[inline]
    pub fn body_len(&self) -> usize {
        1 + self.payload.len() + self.integer.map_or(0, |_| ANCILLARY_SIZE)
    }

    /// Encode to a complete frame, length prefix included.
    pub fn encode(&self) -> Result<Bytes> {
        encode_command(self.opcode, &self.payload, self.integer)
    }

    /// Decode a command from a frame body (length prefix already removed).
    ///
    /// Whether the body ends with an ancillary integer is determined by the
    /// opcode, see [`Opcode::carries_integer`].
    pub fn decode_body(body: &[u8]) -> Result<Self> {
        let (&op, rest) = body.split_first().ok_or(VerifierError::ZeroSizeMessage)?;
        let opcode = Opcode::from_u8(op)
            .ok_or_else(|| VerifierError::InvalidCommand(format!("unknown opcode {op:#04x}")))?;

        if !opcode.carries_integer() {
            return Ok(Self::new(opcode, Bytes::copy_from_slice(rest), None));
        }

        let integer = decode_ancillary(rest).ok_or_else(|| {
            VerifierError::InvalidCommand(format!(
                "{} body of {} bytes has no ancillary integer",
                opcode.name(),
                body.len()
            ))
        })?;
        let payload = &rest[..rest.len() - ANCILLARY_SIZE];
        Ok(Self::new(opcode, Bytes::copy_from_slice(payload), Some(integer)))
    }
}

/// Encode a command into a frame.
///
/// Concatenates opcode, payload and the optional integer, then prefixes the
/// Big Endian length of that body. Fails with
/// [`VerifierError::InvalidCommand`] if the integer does not match the
/// opcode (IFACE and DEL carry one, the others never do), and with
/// [`VerifierError::MessageTooLong`] before allocating if the body would
/// not fit in 3 bytes. Any frame this returns decodes back to the same
/// command.
///
/// # Example
///
/// ```
/// use verifier_client::protocol::{encode_command, Opcode};
///
/// let frame = encode_command(Opcode::Del, b"Interface:Logic", Some(256)).unwrap();
/// assert_eq!(frame.len(), 3 + 1 + 15 + 8);
/// assert_eq!(&frame[frame.len() - 8..], &[0, 0, 0, 0, 0, 0, 1, 0]);
/// ```
pub fn encode_command(opcode: Opcode, payload: &[u8], integer: Option<i64>) -> Result<Bytes> {
    if opcode.carries_integer() != integer.is_some() {
        return Err(VerifierError::InvalidCommand(match integer {
            Some(_) => format!("{} takes no ancillary integer", opcode.name()),
            None => format!("{} requires an ancillary integer", opcode.name()),
        }));
    }

    let body_len = 1 + payload.len() + integer.map_or(0, |_| ANCILLARY_SIZE);
    let prefix = encode_length(body_len)?;

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body_len);
    buf.put_slice(&prefix);
    buf.put_u8(opcode.as_u8());
    buf.put_slice(payload);
    if let Some(value) = integer {
        buf.put_slice(&encode_ancillary(value));
    }
    Ok(buf.freeze())
}

/// A reply from the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response code (see [`codes`]).
    pub code: u8,
    /// Message bytes, already sanitised by the verifier.
    pub message: Bytes,
}

impl Response {
    /// Create a response from its parts.
    pub fn new(code: u8, message: impl Into<Bytes>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Split a frame body into response code and message.
    pub fn from_body(body: Bytes) -> Result<Self> {
        let code = *body.first().ok_or(VerifierError::ZeroSizeMessage)?;
        Ok(Self {
            code,
            message: body.slice(1..),
        })
    }

    /// Encode to a complete frame, length prefix included.
    pub fn encode(&self) -> Result<Bytes> {
        let body_len = 1 + self.message.len();
        let prefix = encode_length(body_len)?;
        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body_len);
        buf.put_slice(&prefix);
        buf.put_u8(self.code);
        buf.put_slice(&self.message);
        Ok(buf.freeze())
    }

    /// Message as text; invalid UTF-8 is replaced.
    pub fn message_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }

    /// Owned copy of the message text.
    pub fn message_string(&self) -> String {
        self.message_str().into_owned()
    }

    /// Check if this is OK.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.code == codes::OK
    }

    /// Check if this is MORE.
    #[inline]
    pub fn is_more(&self) -> bool {
        self.code == codes::MORE
    }

    /// Check if this is GOODBYE.
    #[inline]
    pub fn is_goodbye(&self) -> bool {
        self.code == codes::GOODBYE
    }

    /// Check if the code is in a failure class.
    #[inline]
    pub fn is_failure(&self) -> bool {
        codes::is_failure(self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MAX_BODY_SIZE;

    #[test]
    fn test_encode_module_command() {
        let frame = Command::module().encode().unwrap();
        assert_eq!(&frame[..], &[0x00, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn test_encode_interface_latest() {
        let frame = Command::interface_latest("Interface:Logic").encode().unwrap();

        assert_eq!(frame.len(), LENGTH_PREFIX_SIZE + 1 + 15 + 8);
        assert_eq!(&frame[..3], &[0x00, 0x00, 24]);
        assert_eq!(frame[3], 0x02);
        assert_eq!(&frame[4..19], b"Interface:Logic");
        assert_eq!(&frame[19..], &[0xFF; 8]);
    }

    #[test]
    fn test_length_prefix_counts_body() {
        let frame = encode_command(Opcode::Text, b"abc", None).unwrap();
        let declared = u32::from_be_bytes([0, frame[0], frame[1], frame[2]]) as usize;
        assert_eq!(declared, frame.len() - LENGTH_PREFIX_SIZE);
    }

    #[test]
    fn test_encode_too_long_payload() {
        let payload = vec![b'x'; MAX_BODY_SIZE];
        let err = encode_command(Opcode::Text, &payload, None).unwrap_err();
        assert!(matches!(
            err,
            VerifierError::MessageTooLong { length } if length == MAX_BODY_SIZE + 1
        ));
    }

    #[test]
    fn test_max_payload_fits() {
        let payload = vec![b'x'; MAX_BODY_SIZE - 1];
        let frame = encode_command(Opcode::Text, &payload, None).unwrap();
        assert_eq!(&frame[..3], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_text_strips_trailing_line_breaks() {
        assert_eq!(Command::text("( foo )\r\n\n").payload(), b"( foo )");
        assert_eq!(Command::text("( foo )").payload(), b"( foo )");
        // Leading line breaks are part of the chunk.
        assert_eq!(Command::text("\n( foo )\n").payload(), b"\n( foo )");
        assert_eq!(Command::text("\r\n").payload(), b"");
    }

    #[test]
    fn test_body_len() {
        assert_eq!(Command::quit().body_len(), 1);
        assert_eq!(Command::delete("abc", 1).body_len(), 1 + 3 + 8);
    }

    #[test]
    fn test_decode_body_with_integer() {
        let command = Command::delete("Interface:Logic", 12);
        let frame = command.encode().unwrap();
        let decoded = Command::decode_body(&frame[LENGTH_PREFIX_SIZE..]).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn test_decode_body_without_integer() {
        let command = Command::text("thm (foo () () x)");
        let frame = command.encode().unwrap();
        let decoded = Command::decode_body(&frame[LENGTH_PREFIX_SIZE..]).unwrap();
        assert_eq!(decoded, command);
        assert_eq!(decoded.integer, None);
    }

    #[test]
    fn test_encode_rejects_missing_integer() {
        let err = Command::new(Opcode::Del, &b"Interface:Logic"[..], None)
            .encode()
            .unwrap_err();
        assert!(matches!(err, VerifierError::InvalidCommand(_)));

        let err = encode_command(Opcode::Iface, b"Interface:Logic", None).unwrap_err();
        assert!(matches!(err, VerifierError::InvalidCommand(_)));
    }

    #[test]
    fn test_encode_rejects_unexpected_integer() {
        let err = Command::new(Opcode::Text, &b"abc"[..], Some(5))
            .encode()
            .unwrap_err();
        assert!(matches!(err, VerifierError::InvalidCommand(_)));

        for opcode in [Opcode::Quit, Opcode::Mod, Opcode::Finish] {
            assert!(encode_command(opcode, b"", Some(-1)).is_err());
        }
    }

    #[test]
    fn test_decode_body_rejects_unknown_opcode() {
        let err = Command::decode_body(&[0x7F, b'x']).unwrap_err();
        assert!(matches!(err, VerifierError::InvalidCommand(_)));
    }

    #[test]
    fn test_decode_body_rejects_missing_integer() {
        let err = Command::decode_body(&[0x20, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, VerifierError::InvalidCommand(_)));
    }

    #[test]
    fn test_decode_empty_body() {
        assert!(matches!(
            Command::decode_body(&[]),
            Err(VerifierError::ZeroSizeMessage)
        ));
        assert!(matches!(
            Response::from_body(Bytes::new()),
            Err(VerifierError::ZeroSizeMessage)
        ));
    }

    #[test]
    fn test_response_from_body() {
        let response = Response::from_body(Bytes::from_static(b"\x20ok")).unwrap();
        assert!(response.is_ok());
        assert_eq!(response.message_str(), "ok");

        let empty = Response::from_body(Bytes::from_static(b"\x30")).unwrap();
        assert!(empty.is_more());
        assert!(empty.message.is_empty());
    }

    #[test]
    fn test_response_encode() {
        let frame = Response::new(codes::OK, "ok").encode().unwrap();
        assert_eq!(&frame[..], &[0x00, 0x00, 0x03, 0x20, b'o', b'k']);
    }

    #[test]
    fn test_response_classification() {
        assert!(Response::new(codes::GOODBYE, "").is_goodbye());
        assert!(Response::new(codes::CLIENT_ERR, "bad").is_failure());
        assert!(!Response::new(codes::MORE, "").is_failure());
    }

    #[test]
    fn test_message_lossy_utf8() {
        let response = Response::new(codes::OK, Bytes::from_static(b"ok \xFF"));
        assert_eq!(response.message_string(), "ok \u{FFFD}");
    }
}
