//! Wire format encoding and decoding.
//!
//! Every frame, in either direction, is a 3-byte length prefix followed by
//! a body of exactly that many bytes:
//! ```text
//! request:  ┌──────────┬────────┬─────────────┬──────────────────┐
//!           │ Length   │ Opcode │ Payload     │ Ancillary int    │
//!           │ 3 bytes  │ 1 byte │ 0..n bytes  │ 8 bytes, optional│
//!           │ uint24 BE│        │             │ int64 BE         │
//!           └──────────┴────────┴─────────────┴──────────────────┘
//! response: ┌──────────┬────────┬─────────────┐
//!           │ Length   │ Code   │ Message     │
//!           │ 3 bytes  │ 1 byte │ 0..n bytes  │
//!           └──────────┴────────┴─────────────┘
//! ```
//!
//! The length counts every byte after the prefix and is never zero.

use crate::error::{Result, VerifierError};

/// Length prefix size in bytes (fixed, exactly 3).
pub const LENGTH_PREFIX_SIZE: usize = 3;

/// Largest body a frame can carry (2^24 - 1).
pub const MAX_BODY_SIZE: usize = (1 << 24) - 1;

/// Size of the ancillary integer in bytes.
pub const ANCILLARY_SIZE: usize = 8;

/// Ancillary integer meaning "unspecified", i.e. let the verifier pick the
/// latest revision.
pub const LATEST_REVISION: i64 = -1;

/// Default verifier port.
pub const DEFAULT_PORT: u16 = 3141;

/// Command opcodes understood by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// End the session, expect GOODBYE.
    Quit = 0x00,
    /// Begin proof module text mode, expect MORE.
    Mod = 0x01,
    /// Begin interface module text mode, expect MORE.
    Iface = 0x02,
    /// Submit a chunk of proof text.
    Text = 0x03,
    /// End text streaming, expect OK on success.
    Finish = 0x10,
    /// Delete one stored revision, expect OK.
    Del = 0x20,
}

impl Opcode {
    /// Wire value of this opcode.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse an opcode byte.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Quit),
            0x01 => Some(Self::Mod),
            0x02 => Some(Self::Iface),
            0x03 => Some(Self::Text),
            0x10 => Some(Self::Finish),
            0x20 => Some(Self::Del),
            _ => None,
        }
    }

    /// Check if commands with this opcode carry the ancillary integer.
    #[inline]
    pub fn carries_integer(self) -> bool {
        matches!(self, Self::Iface | Self::Del)
    }

    /// Upper-case protocol name, for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Quit => "QUIT",
            Self::Mod => "MOD",
            Self::Iface => "IFACE",
            Self::Text => "TEXT",
            Self::Finish => "FINISH",
            Self::Del => "DEL",
        }
    }
}

/// Response code constants.
pub mod codes {
    /// Session ended.
    pub const GOODBYE: u8 = 0x00;
    /// Request succeeded.
    pub const OK: u8 = 0x20;
    /// Request accepted, more input expected.
    pub const MORE: u8 = 0x30;
    /// The client sent something the verifier rejects.
    pub const CLIENT_ERR: u8 = 0x40;
    /// The verifier failed internally.
    pub const SERVER_ERR: u8 = 0x50;

    /// Check if a code falls in one of the failure classes.
    #[inline]
    pub fn is_failure(code: u8) -> bool {
        code >= CLIENT_ERR
    }

    /// Upper-case protocol name, for logs.
    pub fn name(code: u8) -> &'static str {
        match code {
            GOODBYE => "GOODBYE",
            OK => "OK",
            MORE => "MORE",
            CLIENT_ERR => "CLIENT_ERR",
            SERVER_ERR => "SERVER_ERR",
            _ => "UNKNOWN",
        }
    }
}

/// Encode a body length into the 3-byte prefix (Big Endian).
///
/// # Example
///
/// ```
/// use verifier_client::protocol::encode_length;
///
/// assert_eq!(encode_length(0x010203).unwrap(), [0x01, 0x02, 0x03]);
/// assert!(encode_length(1 << 24).is_err());
/// ```
pub fn encode_length(length: usize) -> Result<[u8; LENGTH_PREFIX_SIZE]> {
    if length > MAX_BODY_SIZE {
        return Err(VerifierError::MessageTooLong { length });
    }
    let bytes = (length as u32).to_be_bytes();
    Ok([bytes[1], bytes[2], bytes[3]])
}

/// Decode the 3-byte prefix of a frame.
///
/// Fails with [`VerifierError::ZeroSizeMessage`] for a zero length, since
/// every body holds at least its opcode or response code.
pub fn decode_length(prefix: [u8; LENGTH_PREFIX_SIZE]) -> Result<usize> {
    let size = u32::from_be_bytes([0, prefix[0], prefix[1], prefix[2]]) as usize;
    if size == 0 {
        return Err(VerifierError::ZeroSizeMessage);
    }
    Ok(size)
}

/// Encode the ancillary integer as 8 bytes of Big Endian two's complement.
#[inline]
pub fn encode_ancillary(value: i64) -> [u8; ANCILLARY_SIZE] {
    value.to_be_bytes()
}

/// Decode an ancillary integer from the last 8 bytes of a body.
///
/// Returns `None` if fewer than 8 bytes are given.
pub fn decode_ancillary(bytes: &[u8]) -> Option<i64> {
    let tail = bytes.len().checked_sub(ANCILLARY_SIZE)?;
    let mut buf = [0u8; ANCILLARY_SIZE];
    buf.copy_from_slice(&bytes[tail..]);
    Some(i64::from_be_bytes(buf))
}
