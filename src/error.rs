//! Core-level umbrella error.
//!
//! Every lower layer (crypto, block codec, placement, file engine, volume
//! lifecycle) keeps its own scoped `thiserror` enum — that's what lets each
//! module report precisely what went wrong internally. `StegfsError` is the
//! one type meant to cross the boundary into an external adapter (the
//! out-of-scope VFS/FUSE layer): it collapses every lower error into the
//! handful of outcomes such a caller actually needs to branch on.

use std::io;

use thiserror::Error;

use crate::block::BlockError;
use crate::crypto::CryptoError;
use crate::file::FileError;
use crate::volume::VolumeError;

#[derive(Error, Debug)]
pub enum StegfsError {
    #[error("superblock magic mismatch — not a stegfs volume")]
    BadMagic,
    #[error("no recoverable header was found")]
    NoData,
    #[error("only {recovered} bytes could be recovered")]
    PartialData { recovered: u64 },
    #[error("no free block could be found")]
    NoSpace,
    #[error("file is too large for this volume")]
    TooBig,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<BlockError> for StegfsError {
    fn from(e: BlockError) -> Self {
        match e {
            BlockError::Io(e) => StegfsError::Io(e),
            BlockError::Crypto(e) => StegfsError::Crypto(e),
            // Corruption and "not addressed to this requester" are the same
            // outcome by design (see `BlockError::NotOurs`); at this level
            // that's indistinguishable from "nothing recoverable".
            BlockError::NotOurs => StegfsError::NoData,
        }
    }
}

impl From<FileError> for StegfsError {
    fn from(e: FileError) -> Self {
        match e {
            FileError::NoData => StegfsError::NoData,
            FileError::PartialData { recovered, .. } => StegfsError::PartialData { recovered },
            FileError::NoSpace => StegfsError::NoSpace,
            FileError::TooBig { .. } => StegfsError::TooBig,
            FileError::Io(e) => StegfsError::Io(e),
            FileError::Block(e) => e.into(),
        }
    }
}

impl From<VolumeError> for StegfsError {
    fn from(e: VolumeError) -> Self {
        match e {
            VolumeError::BadMagic => StegfsError::BadMagic,
            VolumeError::Io(e) => StegfsError::Io(e),
            VolumeError::Crypto(e) => StegfsError::Crypto(e),
            // These have no dedicated StegfsError variant — they're fatal
            // `mkfs`-time conditions, not file-operation outcomes — so they
            // fold into `Io` with their message preserved.
            VolumeError::UnsupportedTarget(msg)
            | VolumeError::MissingSize(msg)
            | VolumeError::AlreadyExists(msg) => {
                StegfsError::Io(io::Error::new(io::ErrorKind::InvalidInput, msg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_maps_through() {
        let e: StegfsError = FileError::NoData.into();
        assert!(matches!(e, StegfsError::NoData));
    }

    #[test]
    fn partial_data_drops_the_expected_field() {
        let e: StegfsError = FileError::PartialData { recovered: 12, expected: 100 }.into();
        assert!(matches!(e, StegfsError::PartialData { recovered: 12 }));
    }

    #[test]
    fn bad_magic_maps_through() {
        let e: StegfsError = VolumeError::BadMagic.into();
        assert!(matches!(e, StegfsError::BadMagic));
    }

    #[test]
    fn not_ours_degrades_to_no_data() {
        let e: StegfsError = BlockError::NotOurs.into();
        assert!(matches!(e, StegfsError::NoData));
    }
}
