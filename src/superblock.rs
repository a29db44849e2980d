//! Superblock — block 0, the one block in a stegfs container that is never
//! enciphered and never chosen by the placement engine.
//!
//! ```text
//! Offset  Size  Field
//!      0    16  path_tag   = 0xFF repeated, a value no real path_tag uses
//!     16   824  data       TLV metadata (cipher/hash/mode identities, version)
//!    840    24  magic      three fixed 64-bit constants, big-endian
//!    864     8  block_count
//! ```
//!
//! Everything here is plaintext. A reader only needs to know the three
//! magic constants to validate a container; no key material is involved.

use std::io;

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use crate::block::{BLOCK_SIZE, DATA_SIZE, HASH_SIZE, PATH_SIZE};
use crate::crypto::{CIPHER_NAME, HASH_NAME, MODE_NAME};

/// Identifies this format version; bumped on any incompatible TLV or layout
/// change.
const FORMAT_VERSION: &str = "1";

const MAGIC_0: u64 = 0x5374_6567_6673_3031; // "Stegfs01"
const MAGIC_1: u64 = 0x616c_6269_6e6f_6c6f; // "albinolo"
const MAGIC_2: u64 = 0x7665_7261_7473_2121; // "verats!!"

#[derive(Error, Debug)]
pub enum SuperblockError {
    #[error("superblock magic mismatch — not a stegfs volume")]
    BadMagic,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
enum Tag {
    Stegfs = 1,
    Version = 2,
    Cipher = 3,
    Mode = 4,
    Hash = 5,
}

fn tlv_append(buf: &mut Vec<u8>, tag: Tag, value: &[u8]) {
    buf.push(tag as u8);
    let mut len = [0u8; 2];
    BigEndian::write_u16(&mut len, value.len() as u16);
    buf.extend_from_slice(&len);
    buf.extend_from_slice(value);
}

fn build_tlv() -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    tlv_append(&mut buf, Tag::Stegfs, b"stegfs");
    tlv_append(&mut buf, Tag::Version, FORMAT_VERSION.as_bytes());
    tlv_append(&mut buf, Tag::Cipher, CIPHER_NAME.as_bytes());
    tlv_append(&mut buf, Tag::Mode, MODE_NAME.as_bytes());
    tlv_append(&mut buf, Tag::Hash, HASH_NAME.as_bytes());
    buf
}

/// Build block 0's raw bytes for a volume of `block_count` blocks.
pub fn build(block_count: u64) -> [u8; BLOCK_SIZE] {
    let mut raw = [0u8; BLOCK_SIZE];
    raw[..PATH_SIZE].fill(0xFF);

    let tlv = build_tlv();
    raw[PATH_SIZE..PATH_SIZE + tlv.len()].copy_from_slice(&tlv);

    let magic_off = PATH_SIZE + DATA_SIZE;
    BigEndian::write_u64(&mut raw[magic_off..magic_off + 8], MAGIC_0);
    BigEndian::write_u64(&mut raw[magic_off + 8..magic_off + 16], MAGIC_1);
    BigEndian::write_u64(&mut raw[magic_off + 16..magic_off + 24], MAGIC_2);

    let count_off = magic_off + HASH_SIZE;
    BigEndian::write_u64(&mut raw[count_off..count_off + 8], block_count);

    raw
}

/// Validate `raw` as a stegfs superblock and return the recorded block
/// count.
pub fn validate(raw: &[u8; BLOCK_SIZE]) -> Result<u64, SuperblockError> {
    let magic_off = PATH_SIZE + DATA_SIZE;
    let m0 = BigEndian::read_u64(&raw[magic_off..magic_off + 8]);
    let m1 = BigEndian::read_u64(&raw[magic_off + 8..magic_off + 16]);
    let m2 = BigEndian::read_u64(&raw[magic_off + 16..magic_off + 24]);
    if (m0, m1, m2) != (MAGIC_0, MAGIC_1, MAGIC_2) {
        return Err(SuperblockError::BadMagic);
    }

    let count_off = magic_off + HASH_SIZE;
    Ok(BigEndian::read_u64(&raw[count_off..count_off + 8]))
}

/// Hex fingerprint of the three magic constants, for printing in CLI
/// confirmation output — never anything derived from a key or a path.
pub fn magic_fingerprint() -> String {
    let mut bytes = [0u8; 24];
    BigEndian::write_u64(&mut bytes[0..8], MAGIC_0);
    BigEndian::write_u64(&mut bytes[8..16], MAGIC_1);
    BigEndian::write_u64(&mut bytes[16..24], MAGIC_2);
    hex::encode(bytes)
}
