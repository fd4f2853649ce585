//! Optional at-rest encryption for values written to the offset store. Offsets
//! themselves are just numbers or opaque cursor strings and are never encrypted; this
//! exists for the `get_value`/`set_value` key space, which can carry sensitive
//! management-plane-derived state.
//!
//! AES-GCM with a random 96-bit nonce per call; the wire format is
//! `base64(nonce || ciphertext || tag)`, matching what `aes-gcm` hands back from
//! `encrypt`.

use aes_gcm::aead::{consts::U12, Aead, KeyInit, Nonce, OsRng};
use aes_gcm::{aes::Aes192, AeadCore, AesGcm, Aes128Gcm, Aes256Gcm, Key};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use federator_common::FederatorError;

const NONCE_LEN: usize = 12;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// An AES-GCM cipher over a 128-, 192-, or 256-bit key, chosen by the length of the key
/// material handed to [`Cipher::new`].
pub enum Cipher {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

impl Cipher {
    /// `key` must be 16 bytes (AES-128), 24 bytes (AES-192), or 32 bytes (AES-256). Any
    /// other length is a configuration error, not something to fall back from.
    pub fn new(key: &[u8]) -> Result<Self, FederatorError> {
        match key.len() {
            16 => Ok(Cipher::Aes128(Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(key)))),
            24 => Ok(Cipher::Aes192(Aes192Gcm::new(Key::<Aes192Gcm>::from_slice(key)))),
            32 => Ok(Cipher::Aes256(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)))),
            other => Err(FederatorError::Configuration(format!(
                "offset store encryption key must be 16, 24, or 32 bytes, got {other}"
            ))),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, FederatorError> {
        let (nonce, ciphertext) = match self {
            Cipher::Aes128(cipher) => {
                let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
                let ciphertext = cipher
                    .encrypt(&nonce, plaintext.as_bytes())
                    .map_err(|e| FederatorError::Configuration(format!("encryption failed: {e}")))?;
                (nonce.to_vec(), ciphertext)
            }
            Cipher::Aes192(cipher) => {
                let nonce = Aes192Gcm::generate_nonce(&mut OsRng);
                let ciphertext = cipher
                    .encrypt(&nonce, plaintext.as_bytes())
                    .map_err(|e| FederatorError::Configuration(format!("encryption failed: {e}")))?;
                (nonce.to_vec(), ciphertext)
            }
            Cipher::Aes256(cipher) => {
                let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
                let ciphertext = cipher
                    .encrypt(&nonce, plaintext.as_bytes())
                    .map_err(|e| FederatorError::Configuration(format!("encryption failed: {e}")))?;
                (nonce.to_vec(), ciphertext)
            }
        };

        let mut buf = Vec::with_capacity(nonce.len() + ciphertext.len());
        buf.extend_from_slice(&nonce);
        buf.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(buf))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, FederatorError> {
        let raw = BASE64
            .decode(encoded)
            .map_err(|e| FederatorError::Configuration(format!("malformed ciphertext: {e}")))?;
        if raw.len() < NONCE_LEN {
            return Err(FederatorError::Configuration(
                "ciphertext shorter than nonce".to_string(),
            ));
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = match self {
            Cipher::Aes128(cipher) => cipher
                .decrypt(Nonce::<Aes128Gcm>::from_slice(nonce_bytes), ciphertext)
                .map_err(|e| FederatorError::Configuration(format!("decryption failed: {e}")))?,
            Cipher::Aes192(cipher) => cipher
                .decrypt(Nonce::<Aes192Gcm>::from_slice(nonce_bytes), ciphertext)
                .map_err(|e| FederatorError::Configuration(format!("decryption failed: {e}")))?,
            Cipher::Aes256(cipher) => cipher
                .decrypt(Nonce::<Aes256Gcm>::from_slice(nonce_bytes), ciphertext)
                .map_err(|e| FederatorError::Configuration(format!("decryption failed: {e}")))?,
        };
        String::from_utf8(plaintext)
            .map_err(|e| FederatorError::Configuration(format!("decrypted value is not utf-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_aes_256() {
        let cipher = Cipher::new(&[7u8; 32]).unwrap();
        let encoded = cipher.encrypt("management-node-etag-123").unwrap();
        assert_eq!(cipher.decrypt(&encoded).unwrap(), "management-node-etag-123");
    }

    #[test]
    fn round_trips_aes_128() {
        let cipher = Cipher::new(&[3u8; 16]).unwrap();
        let encoded = cipher.encrypt("a small secret").unwrap();
        assert_eq!(cipher.decrypt(&encoded).unwrap(), "a small secret");
    }

    #[test]
    fn round_trips_aes_192() {
        let cipher = Cipher::new(&[5u8; 24]).unwrap();
        let encoded = cipher.encrypt("a medium secret").unwrap();
        assert_eq!(cipher.decrypt(&encoded).unwrap(), "a medium secret");
    }

    #[test]
    fn rejects_bad_key_length() {
        assert!(Cipher::new(&[0u8; 20]).is_err());
    }

    #[test]
    fn distinct_ciphertexts_for_same_plaintext() {
        let cipher = Cipher::new(&[1u8; 32]).unwrap();
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b, "nonce must be randomised per call");
    }
}
