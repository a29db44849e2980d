//! Primitives adapter: a 192-bit hash and a 128-bit block cipher run in CBC
//! mode without padding.
//!
//! The algorithm identities are fixed at build time and stamped (lower-cased)
//! into the superblock TLV by [`crate::superblock`]. Swapping either
//! primitive for an equivalent is possible but MUST NOT change those stored
//! identifiers without breaking on-disk compatibility with existing volumes.

use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use digest::Digest;
use thiserror::Error;

/// Tiger-192 digest length in bytes.
pub const HASH_LEN: usize = 24;
/// Serpent-192 key length in bytes — the full Tiger digest used directly as
/// key material.
pub const KEY_LEN: usize = 24;
/// Serpent block size, and so the IV length for CBC.
pub const IV_LEN: usize = 16;

pub const HASH_NAME: &str = "tiger";
pub const CIPHER_NAME: &str = "serpent";
pub const MODE_NAME: &str = "cbc";

type Encryptor = cbc::Encryptor<serpent::Serpent192>;
type Decryptor = cbc::Decryptor<serpent::Serpent192>;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("buffer length {0} is not a multiple of the cipher block size (16)")]
    Unaligned(usize),
}

/// 192-bit Tiger digest of `data`.
pub fn hash(data: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = tiger::Tiger::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&digest);
    out
}

/// A Serpent-CBC context bound to one key/IV pair for the lifetime of a
/// single block or header operation. Dropped at the end of its scope — the
/// idiomatic stand-in for an explicit teardown call.
pub struct CipherContext {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl CipherContext {
    pub fn new(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Self {
        Self { key: *key, iv: *iv }
    }

    /// Encrypt `buf` in place, block by block, chaining as CBC. `buf.len()`
    /// must be a multiple of 16 bytes; callers never need padding because
    /// every ciphered region in this format is itself block-size aligned.
    pub fn encrypt_in_place(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
        if buf.len() % IV_LEN != 0 {
            return Err(CryptoError::Unaligned(buf.len()));
        }
        let mut enc = Encryptor::new(
            GenericArray::from_slice(&self.key),
            GenericArray::from_slice(&self.iv),
        );
        for block in buf.chunks_mut(IV_LEN) {
            enc.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }

    /// Inverse of [`Self::encrypt_in_place`].
    pub fn decrypt_in_place(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
        if buf.len() % IV_LEN != 0 {
            return Err(CryptoError::Unaligned(buf.len()));
        }
        let mut dec = Decryptor::new(
            GenericArray::from_slice(&self.key),
            GenericArray::from_slice(&self.iv),
        );
        for block in buf.chunks_mut(IV_LEN) {
            dec.decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }
}

/// A long-running CBC keystream that, unlike [`CipherContext`], keeps its
/// chaining state across calls. Used only to noise-fill a container as one
/// continuous ciphertext stream during format.
pub struct NoiseStream(Encryptor);

impl NoiseStream {
    pub fn new(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Self {
        Self(Encryptor::new(
            GenericArray::from_slice(key),
            GenericArray::from_slice(iv),
        ))
    }

    pub fn apply(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        if buf.len() % IV_LEN != 0 {
            return Err(CryptoError::Unaligned(buf.len()));
        }
        for block in buf.chunks_mut(IV_LEN) {
            self.0.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash(b"stegfs"), hash(b"stegfs"));
        assert_ne!(hash(b"stegfs"), hash(b"stegf5"));
    }

    #[test]
    fn round_trips_through_cbc() {
        let key = [7u8; KEY_LEN];
        let iv = [9u8; IV_LEN];
        let ctx = CipherContext::new(&key, &iv);

        let mut buf = *b"0123456789abcdef0123456789abcdef";
        let plain = buf;
        ctx.encrypt_in_place(&mut buf).unwrap();
        assert_ne!(buf, plain);
        ctx.decrypt_in_place(&mut buf).unwrap();
        assert_eq!(buf, plain);
    }

    #[test]
    fn rejects_unaligned_buffers() {
        let ctx = CipherContext::new(&[0u8; KEY_LEN], &[0u8; IV_LEN]);
        let mut buf = [0u8; 17];
        assert!(ctx.encrypt_in_place(&mut buf).is_err());
    }
}
