//! # stegfs — block-storage core and formatter for a steganographic file system
//!
//! Format guarantees:
//! - Every block on disk is exactly [`block::BLOCK_SIZE`] bytes; a container
//!   is always an exact multiple of that size.
//! - Block 0 is the superblock and is never chosen by the placement engine.
//! - Only `[PATH_SIZE..BLOCK_SIZE)` of a non-superblock block is ever
//!   enciphered; `path_tag` stays in the clear as the sole plaintext probe
//!   of ownership.
//! - A block's `hash` binds it to its deciphered `data`: corruption and
//!   "not addressed to this requester" are the same error by design
//!   ([`block::BlockError::NotOurs`]).
//! - Nothing about a file — its existence, size, or contents — is
//!   recoverable without the exact `(path, name, passphrase)` triple that
//!   produced its keys.
//! - There is no allocation table, no inode list, no free list. A free
//!   block and an occupied one differ only to someone holding the right
//!   keys.

pub mod block;
pub mod cache;
pub mod crypto;
pub mod error;
pub mod file;
pub mod keys;
pub mod placement;
pub mod superblock;
pub mod volume;

pub use block::{Block, BlockError, BLOCK_SIZE, MAX_BLOCK_LOOKUP, MAX_COPIES};
pub use error::StegfsError;
pub use file::{File, FileError};
pub use volume::{Volume, VolumeError};
