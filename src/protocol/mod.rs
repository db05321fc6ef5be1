//! Protocol module - wire format, framing, and command/response values.
//!
//! This module implements the binary protocol spoken with the verifier:
//! - 3-byte length prefix encoding/decoding
//! - Command and response bodies, ancillary integer encoding
//! - Frame buffer for splitting a byte stream into frames

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{encode_command, Command, Response};
pub use frame_buffer::{decode_responses, FrameBuffer};
pub use wire_format::{
    codes, decode_ancillary, decode_length, encode_ancillary, encode_length, Opcode,
    ANCILLARY_SIZE, DEFAULT_PORT, LATEST_REVISION, LENGTH_PREFIX_SIZE, MAX_BODY_SIZE,
};
