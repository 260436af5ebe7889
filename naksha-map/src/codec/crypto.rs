//! AES-256-CBC frame encryption.
//!
//! The AES key is derived from the vendor key string: the first 32 hex
//! characters of its SHA-256 digest, used as raw ASCII bytes.

use crate::error::DecodeError;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use sha2::{Digest, Sha256};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

/// AES block and IV length
pub const IV_LEN: usize = 16;

/// Derive the 32-byte AES key from a vendor key string
pub fn derive_key(key: &str) -> [u8; 32] {
    let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest.as_bytes()[..32]);
    out
}

fn iv_bytes(iv: Option<&str>) -> Result<[u8; IV_LEN], DecodeError> {
    let mut out = [0u8; IV_LEN];
    match iv {
        None | Some("") => Ok(out),
        Some(iv) if iv.len() == IV_LEN => {
            out.copy_from_slice(iv.as_bytes());
            Ok(out)
        }
        Some(iv) => Err(DecodeError::DecryptionFailed(format!(
            "IV must be {} bytes, got {}",
            IV_LEN,
            iv.len()
        ))),
    }
}

/// Decrypt a PKCS#7 padded ciphertext
pub fn decrypt(data: &[u8], key: &str, iv: Option<&str>) -> Result<Vec<u8>, DecodeError> {
    if data.is_empty() || data.len() % IV_LEN != 0 {
        return Err(DecodeError::DecryptionFailed(format!(
            "ciphertext length {} is not a multiple of the block size",
            data.len()
        )));
    }
    let iv = iv_bytes(iv)?;
    let aes_key = derive_key(key);
    Aes256CbcDec::new_from_slices(&aes_key, &iv)
        .map_err(|e| DecodeError::DecryptionFailed(e.to_string()))?
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| DecodeError::DecryptionFailed("bad padding (wrong key?)".to_string()))
}

/// Encrypt with PKCS#7 padding
pub fn encrypt(data: &[u8], key: &str, iv: Option<&str>) -> Result<Vec<u8>, DecodeError> {
    let iv = iv_bytes(iv)?;
    let aes_key = derive_key(key);
    let cipher = Aes256CbcEnc::new_from_slices(&aes_key, &iv)
        .map_err(|e| DecodeError::DecryptionFailed(e.to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(data))
}
