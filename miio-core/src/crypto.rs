//! Frame body encryption
//!
//! Bodies are AES-128-CBC with PKCS#7 padding, keyed from the device token
//! (see [`Token::key`] and [`Token::iv`]).

use aes::Aes128;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use tracing::trace;

use crate::error::{Error, Result};
use crate::token::Token;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// AES block size
pub const BLOCK_SIZE: usize = 16;

/// Encrypt a plaintext body
///
/// # Examples
///
/// ```
/// use miio_core::{crypto, Token};
///
/// let token = Token::zero();
/// let ciphertext = crypto::encrypt(&token, b"{}");
/// assert_eq!(ciphertext.len(), 16);
/// assert_eq!(crypto::decrypt(&token, &ciphertext).unwrap(), b"{}");
/// ```
pub fn encrypt(token: &Token, plaintext: &[u8]) -> Vec<u8> {
    let ciphertext = Aes128CbcEnc::new(&token.key().into(), &token.iv().into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    trace!(
        plaintext_len = plaintext.len(),
        ciphertext_len = ciphertext.len(),
        "Encrypted body"
    );

    ciphertext
}

/// Decrypt a ciphertext body
///
/// # Errors
///
/// Returns [`Error::Decrypt`] when the input is not a whole number of blocks
/// or the padding is invalid.
pub fn decrypt(token: &Token, ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(Error::Decrypt);
    }

    Aes128CbcDec::new(&token.key().into(), &token.iv().into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::Decrypt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encrypt_pads_to_block() {
        let token = Token::new([7; 16]);

        assert_eq!(encrypt(&token, b"").len(), 16);
        assert_eq!(encrypt(&token, &[0u8; 15]).len(), 16);
        assert_eq!(encrypt(&token, &[0u8; 16]).len(), 32);
    }

    #[test]
    fn test_encrypt_decrypt() {
        let token = Token::new([0x42; 16]);
        let body = br#"{"id":1,"method":"get_prop","params":["power"]}"#;

        let ciphertext = encrypt(&token, body);
        assert_ne!(&ciphertext[..body.len().min(16)], &body[..16]);
        assert_eq!(decrypt(&token, &ciphertext).unwrap(), body.to_vec());
    }

    #[test]
    fn test_decrypt_wrong_length() {
        let token = Token::zero();
        assert!(matches!(decrypt(&token, &[1, 2, 3]), Err(Error::Decrypt)));
        assert!(matches!(decrypt(&token, &[]), Err(Error::Decrypt)));
    }

    #[test]
    fn test_decrypt_wrong_token_is_not_original() {
        let body = br#"{"id":1,"method":"miIO.info","params":[]}"#;
        let ciphertext = encrypt(&Token::new([1; 16]), body);

        // Wrong key either fails padding or yields garbage
        match decrypt(&Token::new([2; 16]), &ciphertext) {
            Ok(plain) => assert_ne!(plain, body.to_vec()),
            Err(e) => assert!(matches!(e, Error::Decrypt)),
        }
    }
}
