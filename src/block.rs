//! The 896-byte on-disk block: the only unit of I/O this crate ever performs.
//!
//! ```text
//! Offset  Size  Field       Encryption
//!      0    16  path_tag    plaintext
//!     16   824  data        ciphertext
//!    840    32  hash        ciphertext
//!    872    24  next        ciphertext, first 8 bytes double as file size
//! ```
//!
//! `path_tag` is the only plaintext byte range in a non-superblock block. It
//! is a keyed probe, not an index: matching it tells a requester "this block
//! is plausibly mine", never "this block holds file X".

use std::io;

use byteorder::{BigEndian, ByteOrder};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::crypto::{self, CipherContext, CryptoError, HASH_LEN};

pub const BLOCK_SIZE: usize = 896;
pub const PATH_SIZE: usize = 16;
pub const DATA_SIZE: usize = 824;
pub const HASH_SIZE: usize = 32;
pub const NEXT_SIZE: usize = 24;

/// Redundant copies written per file.
pub const MAX_COPIES: usize = 8;
/// Rejection-sampling attempts before placement gives up.
pub const MAX_BLOCK_LOOKUP: usize = 1024;

const CIPHERED_SIZE: usize = DATA_SIZE + HASH_SIZE + NEXT_SIZE;

const _: () = assert!(PATH_SIZE + DATA_SIZE + HASH_SIZE + NEXT_SIZE == BLOCK_SIZE);
const _: () = assert!(CIPHERED_SIZE % 16 == 0);

#[derive(Error, Debug)]
pub enum BlockError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("block is not ours, or is corrupt")]
    NotOurs,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// A single decoded block. `path_tag` is cleartext the moment it's read;
/// `data`/`hash`/`next` only exist in the clear once [`Block::decode`] has
/// verified the hash.
#[derive(Clone)]
pub struct Block {
    pub path_tag: [u8; PATH_SIZE],
    pub data: [u8; DATA_SIZE],
    pub hash: [u8; HASH_SIZE],
    pub next: [u8; NEXT_SIZE],
}

impl Block {
    pub fn zeroed() -> Self {
        Self {
            path_tag: [0; PATH_SIZE],
            data: [0; DATA_SIZE],
            hash: [0; HASH_SIZE],
            next: [0; NEXT_SIZE],
        }
    }

    pub fn next_index(&self) -> u64 {
        BigEndian::read_u64(&self.next[0..8])
    }

    pub fn set_next_index(&mut self, index: u64) {
        BigEndian::write_u64(&mut self.next[0..8], index);
    }

    /// A header block repurposes `next`'s leading 8 bytes as the file size.
    pub fn file_size(&self) -> u64 {
        self.next_index()
    }

    pub fn set_file_size(&mut self, size: u64) {
        self.set_next_index(size);
    }

    fn compute_hash(&self) -> [u8; HASH_SIZE] {
        let digest = crypto::hash(&self.data);
        let mut out = [0u8; HASH_SIZE];
        out[..HASH_LEN].copy_from_slice(&digest);
        out
    }

    /// Serialize to exactly [`BLOCK_SIZE`] bytes, stamping `hash` from the
    /// current `data` and then enciphering everything past `path_tag` as one
    /// CBC stream under `ctx`.
    pub fn encode(&mut self, ctx: &CipherContext) -> Result<[u8; BLOCK_SIZE], BlockError> {
        self.hash = self.compute_hash();

        let mut out = [0u8; BLOCK_SIZE];
        let mut off = 0;
        out[off..off + PATH_SIZE].copy_from_slice(&self.path_tag);
        off += PATH_SIZE;
        out[off..off + DATA_SIZE].copy_from_slice(&self.data);
        off += DATA_SIZE;
        out[off..off + HASH_SIZE].copy_from_slice(&self.hash);
        off += HASH_SIZE;
        out[off..off + NEXT_SIZE].copy_from_slice(&self.next);

        ctx.encrypt_in_place(&mut out[PATH_SIZE..])?;
        Ok(out)
    }

    /// Decipher and verify `raw`. A hash mismatch and outright corruption
    /// both surface as [`BlockError::NotOurs`] — by design, a requester
    /// cannot distinguish "not mine" from "damaged".
    pub fn decode(raw: &[u8; BLOCK_SIZE], ctx: &CipherContext) -> Result<Self, BlockError> {
        let mut ciphered = [0u8; CIPHERED_SIZE];
        ciphered.copy_from_slice(&raw[PATH_SIZE..]);
        ctx.decrypt_in_place(&mut ciphered)?;

        let mut block = Block::zeroed();
        block.path_tag.copy_from_slice(&raw[..PATH_SIZE]);

        let mut off = 0;
        block.data.copy_from_slice(&ciphered[off..off + DATA_SIZE]);
        off += DATA_SIZE;
        block.hash.copy_from_slice(&ciphered[off..off + HASH_SIZE]);
        off += HASH_SIZE;
        block.next.copy_from_slice(&ciphered[off..off + NEXT_SIZE]);

        let expected = block.compute_hash();
        if block.hash[..].ct_eq(&expected[..]).unwrap_u8() != 1 {
            return Err(BlockError::NotOurs);
        }
        Ok(block)
    }
}
