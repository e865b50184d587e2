//! miIO frame structure and encoding/decoding

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, trace};

use crate::{
    checksum::{self, CHECKSUM_OFFSET, CHECKSUM_SIZE},
    constants::{HANDSHAKE_FILL, MAGIC},
    crypto,
    error::{Error, Result},
    message::Response,
    token::Token,
    MAX_FRAME_SIZE,
};

/// Frame header
///
/// # Header Structure
///
/// ```text
/// ┌─────────┬─────────┬─────────┬───────────┬───────────┬────────────┐
/// │  Magic  │ Length  │ Unknown │ Device ID │ Timestamp │  Checksum  │
/// │ 2 bytes │ 2 bytes │ 4 bytes │  4 bytes  │  4 bytes  │  16 bytes  │
/// │ 0x2131  │ (BE)    │ (BE)    │   (BE)    │   (BE)    │   (MD5)    │
/// └─────────┴─────────┴─────────┴───────────┴───────────┴────────────┘
/// ```
///
/// All multi-byte values are big-endian. The encrypted body follows the
/// header; handshake frames have no body.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total frame length including the header
    pub length: u16,

    /// Reserved, zero on send
    pub unknown: u32,

    /// Device identifier
    pub device_id: u32,

    /// Device clock in seconds
    pub timestamp: u32,

    /// Checksum, or the token fingerprint in handshake replies
    pub checksum: [u8; CHECKSUM_SIZE],
}

impl Header {
    /// Header size in bytes
    pub const SIZE: usize = 32;

    /// Parse and validate a header without a token
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than 32 bytes
    /// - Magic is not `0x2131`
    /// - Length field disagrees with the buffer size
    pub fn parse(mut buf: &[u8]) -> Result<Self> {
        let actual = buf.len();
        if actual < Self::SIZE {
            return Err(Error::FrameTooShort {
                expected: Self::SIZE,
                actual,
            });
        }

        let magic = buf.get_u16();
        if magic != MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let length = buf.get_u16();
        if length as usize != actual {
            return Err(Error::LengthMismatch {
                declared: length as usize,
                actual,
            });
        }

        let unknown = buf.get_u32();
        let device_id = buf.get_u32();
        let timestamp = buf.get_u32();

        let mut checksum = [0u8; CHECKSUM_SIZE];
        buf.copy_to_slice(&mut checksum);

        Ok(Self {
            length,
            unknown,
            device_id,
            timestamp,
            checksum,
        })
    }

    /// Check if this header belongs to a handshake frame (no body)
    pub fn is_handshake(&self) -> bool {
        self.length as usize == Self::SIZE
    }

    /// Size of the body following the header
    pub fn body_len(&self) -> usize {
        (self.length as usize).saturating_sub(Self::SIZE)
    }

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u16(MAGIC);
        buf.put_u16(self.length);
        buf.put_u32(self.unknown);
        buf.put_u32(self.device_id);
        buf.put_u32(self.timestamp);
        buf.put_slice(&self.checksum);
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("length", &self.length)
            .field("unknown", &self.unknown)
            .field("device_id", &format!("0x{:08X}", self.device_id))
            .field("timestamp", &self.timestamp)
            .field("checksum", &hex::encode(self.checksum))
            .finish()
    }
}

/// Decoded frame
///
/// # Examples
///
/// ```
/// use miio_core::{Frame, Request, Token};
/// use serde_json::json;
///
/// let token = Token::zero();
/// let request = Request::new(1, "get_prop", json!(["power"]));
///
/// let encoded = Frame::encode(&request, 0x0123_4567, 100, &token).unwrap();
/// let decoded = Frame::decode(&encoded, &token).unwrap();
///
/// assert_eq!(decoded.header.device_id, 0x0123_4567);
/// assert_eq!(decoded.body.unwrap()["method"], "get_prop");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: Header,

    /// Decrypted body, `None` for handshake frames
    pub body: Option<Value>,
}

impl Frame {
    /// Build the handshake frame
    ///
    /// ```
    /// use miio_core::Frame;
    ///
    /// let hello = Frame::handshake();
    /// assert_eq!(&hello[..4], &[0x21, 0x31, 0x00, 0x20]);
    /// assert!(hello[4..].iter().all(|b| *b == 0xFF));
    /// ```
    pub fn handshake() -> BytesMut {
        let mut buf = BytesMut::with_capacity(Header::SIZE);
        buf.put_u16(MAGIC);
        buf.put_u16(Header::SIZE as u16);
        buf.put_bytes(HANDSHAKE_FILL, Header::SIZE - 4);
        buf
    }

    /// Encode and encrypt a payload into a complete frame
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized or the frame
    /// would exceed the 16-bit length field.
    pub fn encode<T: Serialize>(
        payload: &T,
        device_id: u32,
        timestamp: u32,
        token: &Token,
    ) -> Result<BytesMut> {
        let plaintext = serde_json::to_vec(payload)?;
        let ciphertext = crypto::encrypt(token, &plaintext);

        let total_size = Header::SIZE + ciphertext.len();
        if total_size > MAX_FRAME_SIZE {
            return Err(Error::PayloadTooLarge {
                size: total_size,
                max: MAX_FRAME_SIZE,
            });
        }

        let header = Header {
            length: total_size as u16,
            unknown: 0,
            device_id,
            timestamp,
            checksum: [0; CHECKSUM_SIZE],
        };

        let mut buf = BytesMut::with_capacity(total_size);
        header.put(&mut buf);
        buf.put_slice(&ciphertext);

        let sum = checksum::calculate(&buf[..CHECKSUM_OFFSET], token, &ciphertext);
        buf[CHECKSUM_OFFSET..Header::SIZE].copy_from_slice(&sum);

        trace!(
            device_id = device_id,
            timestamp = timestamp,
            len = total_size,
            "Encoded frame"
        );

        Ok(buf)
    }

    /// Decode a frame
    ///
    /// Handshake replies skip checksum verification and decryption; their
    /// checksum field is the device's token fingerprint.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The header is malformed (see [`Header::parse`])
    /// - Checksum verification fails (wrong token)
    /// - The body cannot be decrypted or is not JSON
    pub fn decode(buf: &[u8], token: &Token) -> Result<Self> {
        let header = Header::parse(buf)?;

        if header.is_handshake() {
            return Ok(Self { header, body: None });
        }

        let ciphertext = &buf[Header::SIZE..];
        if !checksum::verify(buf, token, ciphertext, &header.checksum) {
            return Err(Error::ChecksumMismatch {
                expected: hex::encode(checksum::calculate(buf, token, ciphertext)),
                received: hex::encode(header.checksum),
            });
        }

        let plaintext = crypto::decrypt(token, ciphertext)?;
        let body = parse_body(plaintext)?;

        Ok(Self {
            header,
            body: Some(body),
        })
    }

    /// Check if this is a handshake frame
    pub fn is_handshake(&self) -> bool {
        self.header.is_handshake()
    }

    /// Interpret the body as a response envelope
    pub fn response(&self) -> Option<Result<Response>> {
        self.body.clone().map(Response::from_value)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame(device_id=0x{:08X}, ts={}, len={})",
            self.header.device_id, self.header.timestamp, self.header.length
        )
    }
}

/// Parse a decrypted body, retrying with known firmware quirks fixed
fn parse_body(plaintext: Vec<u8>) -> Result<Value> {
    let error = match serde_json::from_slice(&plaintext) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let fixed = fix_quirks(plaintext);
    match serde_json::from_slice(&fixed) {
        Ok(value) => {
            debug!("Parsed body after applying firmware quirk fixes");
            Ok(value)
        }
        Err(_) => Err(Error::Payload(error)),
    }
}

fn fix_quirks(mut plaintext: Vec<u8>) -> Vec<u8> {
    // Some firmwares NUL-terminate (or NUL-pad) the JSON
    if let Some(end) = plaintext.iter().position(|b| *b == 0) {
        plaintext.truncate(end);
    }

    // Doubled comma emitted by some vacuum firmwares
    const BROKEN: &[u8] = b",,\"otu_stat\"";
    if let Some(pos) = plaintext
        .windows(BROKEN.len())
        .position(|window| window == BROKEN)
    {
        plaintext.remove(pos);
    }

    plaintext
}
