//! Device token and key derivation
//!
//! Every device carries a 16-byte secret. The body cipher key and IV are
//! derived from it with MD5:
//!
//! ```text
//! key = MD5(token)
//! iv  = MD5(key ++ token)
//! ```

use std::fmt;
use std::str::FromStr;

use md5::{Digest, Md5};

use crate::error::{Error, Result};

/// Token length in bytes
pub const TOKEN_SIZE: usize = 16;

/// 16-byte shared secret
///
/// # Examples
///
/// ```
/// use miio_core::Token;
///
/// let token: Token = "00000000000000000000000000000000".parse().unwrap();
/// assert_eq!(token, Token::zero());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token([u8; TOKEN_SIZE]);

impl Token {
    /// Create a token from raw bytes
    pub const fn new(bytes: [u8; TOKEN_SIZE]) -> Self {
        Self(bytes)
    }

    /// All-zero token, used to read handshake replies
    pub const fn zero() -> Self {
        Self([0; TOKEN_SIZE])
    }

    /// Parse a token from 32 hexadecimal characters
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != TOKEN_SIZE * 2 {
            return Err(Error::InvalidToken(format!(
                "expected {} hex characters, got {}",
                TOKEN_SIZE * 2,
                s.len()
            )));
        }

        let mut bytes = [0u8; TOKEN_SIZE];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| Error::InvalidToken(e.to_string()))?;

        Ok(Self(bytes))
    }

    /// Hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; TOKEN_SIZE] {
        &self.0
    }

    /// Cipher key: `MD5(token)`
    pub fn key(&self) -> [u8; 16] {
        md5_of(&[&self.0])
    }

    /// Cipher IV: `MD5(key ++ token)`
    pub fn iv(&self) -> [u8; 16] {
        md5_of(&[&self.key(), &self.0])
    }
}

pub(crate) fn md5_of(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }

    let mut out = [0u8; 16];
    out.copy_from_slice(&hasher.finalize());
    out
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<[u8; TOKEN_SIZE]> for Token {
    fn from(bytes: [u8; TOKEN_SIZE]) -> Self {
        Self(bytes)
    }
}

// Keep the secret out of logs
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_token_from_hex() {
        let token = Token::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        assert_eq!(token.as_bytes()[0], 0x00);
        assert_eq!(token.as_bytes()[15], 0x0F);
        assert_eq!(token.to_hex(), "000102030405060708090a0b0c0d0e0f");
    }

    #[test]
    fn test_token_invalid_length() {
        let result = Token::from_hex("abcd");
        assert!(matches!(result, Err(Error::InvalidToken(_))));
    }

    #[test]
    fn test_token_invalid_chars() {
        let result = Token::from_hex("zz0102030405060708090a0b0c0d0e0f");
        assert!(matches!(result, Err(Error::InvalidToken(_))));
    }

    #[test]
    fn test_zero_token_key_derivation() {
        // MD5 of sixteen zero bytes
        assert_eq!(
            hex::encode(Token::zero().key()),
            "4ae71336e44bf9bf79d2752e234818a5"
        );
    }

    #[test]
    fn test_iv_depends_on_key_and_token() {
        let token = Token::new([0x11; 16]);
        assert_ne!(token.key(), token.iv());
        assert_eq!(token.iv(), md5_of(&[&token.key(), token.as_bytes()]));
    }

    #[test]
    fn test_debug_hides_secret() {
        let token = Token::new([0xAB; 16]);
        assert!(!format!("{:?}", token).contains("ab"));
    }
}
