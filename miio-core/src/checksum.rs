//! miIO frame checksum
//!
//! The checksum is an MD5 digest over the frame with the token standing in
//! for the checksum field:
//! 1. First 16 header bytes (magic, length, unknown, device id, timestamp)
//! 2. The 16-byte token
//! 3. The encrypted body

use tracing::trace;

use crate::token::{md5_of, Token};

/// Checksum size in bytes
pub const CHECKSUM_SIZE: usize = 16;

/// Offset of the checksum field in the header
pub const CHECKSUM_OFFSET: usize = 16;

/// Calculate a frame checksum
///
/// `header` must hold at least the first 16 header bytes; anything past
/// that is ignored.
///
/// # Examples
///
/// ```
/// use miio_core::{checksum, Token};
///
/// let header = [0u8; 16];
/// let sum = checksum::calculate(&header, &Token::zero(), &[]);
/// assert_eq!(sum.len(), 16);
/// ```
pub fn calculate(header: &[u8], token: &Token, body: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let checksum = md5_of(&[&header[..CHECKSUM_OFFSET], token.as_bytes(), body]);

    trace!(
        body_len = body.len(),
        checksum = %hex::encode(checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify checksum
pub fn verify(header: &[u8], token: &Token, body: &[u8], expected: &[u8]) -> bool {
    calculate(header, token, body).as_slice() == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> [u8; 32] {
        let mut h = [0u8; 32];
        h[0] = 0x21;
        h[1] = 0x31;
        h[3] = 0x40;
        h
    }

    #[test]
    fn test_checksum_consistent() {
        let token = Token::new([9; 16]);
        assert_eq!(
            calculate(&header(), &token, &[1, 2, 3]),
            calculate(&header(), &token, &[1, 2, 3])
        );
    }

    #[test]
    fn test_checksum_ignores_checksum_slot() {
        let token = Token::new([9; 16]);
        let mut h = header();
        let before = calculate(&h, &token, &[]);

        h[20] = 0xEE;
        assert_eq!(before, calculate(&h, &token, &[]));
    }

    #[test]
    fn test_checksum_verify() {
        let token = Token::new([3; 16]);
        let body = vec![0xAB; 32];
        let sum = calculate(&header(), &token, &body);

        assert!(verify(&header(), &token, &body, &sum));

        let mut wrong = sum;
        wrong[0] ^= 1;
        assert!(!verify(&header(), &token, &body, &wrong));
    }

    #[test]
    fn test_checksum_depends_on_token() {
        let a = calculate(&header(), &Token::new([1; 16]), &[]);
        let b = calculate(&header(), &Token::new([2; 16]), &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_checksum_depends_on_header() {
        let token = Token::zero();
        let mut h = header();
        let a = calculate(&h, &token, &[]);
        h[11] = 1; // device id
        assert_ne!(a, calculate(&h, &token, &[]));
    }
}
