//! File engine: `stat`/`load`/`save`/`kill` over `MAX_COPIES` redundant
//! block chains, addressed purely by `(path, name, passphrase)`.

use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{BigEndian, ByteOrder};
use rand::Rng;
use thiserror::Error;

use crate::block::{Block, BlockError, BLOCK_SIZE, DATA_SIZE, MAX_COPIES};
use crate::crypto::CipherContext;
use crate::keys;
use crate::placement::{self, PlacementError};
use crate::volume::Volume;

const MTIME_OFFSET: usize = MAX_COPIES * 8;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("no recoverable header was found")]
    NoData,
    #[error("only {recovered} of {expected} bytes could be recovered")]
    PartialData { recovered: u64, expected: u64 },
    #[error("no free block could be found")]
    NoSpace,
    #[error("file is too large for this volume ({size} bytes requested)")]
    TooBig { size: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Block(#[from] BlockError),
}

impl From<PlacementError> for FileError {
    fn from(_: PlacementError) -> Self {
        FileError::NoSpace
    }
}

/// A file handle keyed by `(path, name, passphrase)`. Cheap to construct;
/// carries the payload only once [`File::load`] or a caller-set `data` has
/// populated it.
#[derive(Clone, Default)]
pub struct File {
    pub path: String,
    pub name: String,
    pub passphrase: String,
    pub size: u64,
    pub mtime: u64,
    pub data: Vec<u8>,
}

impl File {
    pub fn new(path: impl Into<String>, name: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            passphrase: passphrase.into(),
            ..Default::default()
        }
    }

    fn path_tag(&self) -> [u8; 16] {
        keys::path_tag(&self.path)
    }

    fn header_index(&self, volume: &Volume, copy: usize) -> u64 {
        keys::header_index(&self.path, &self.name, &self.passphrase, copy, volume.block_count)
    }

    fn cipher(&self, copy: usize) -> CipherContext {
        let key = keys::copy_key(&self.name, &self.passphrase);
        let iv = keys::copy_iv(&self.name, copy);
        CipherContext::new(&key, &iv)
    }

    /// Try each of the `MAX_COPIES` header positions in turn, returning the
    /// first one that decodes and claims a non-zero file size.
    fn locate_header(&self, volume: &Volume) -> Option<(u64, Block)> {
        let tag = self.path_tag();
        for copy in 0..MAX_COPIES {
            let index = self.header_index(volume, copy);
            if !placement::is_ours(volume, index, &tag) {
                continue;
            }
            let ctx = self.cipher(copy);
            if let Ok(raw) = volume.read_raw_block(index) {
                if let Ok(block) = Block::decode(&raw, &ctx) {
                    if block.file_size() > 0 {
                        return Some((index, block));
                    }
                }
            }
        }
        None
    }

    /// Probe for a surviving header and recover `size`/`mtime` into `self`.
    /// Returns the header's block index, or 0 if nothing was recoverable.
    pub fn stat(&mut self, volume: &Volume) -> u64 {
        match self.locate_header(volume) {
            Some((index, block)) => {
                self.size = block.file_size();
                self.mtime = read_mtime(&block);
                index
            }
            None => 0,
        }
    }

    /// Recover the best available copy of the file's contents.
    ///
    /// Walks every copy's block chain independently and keeps whichever one
    /// completes; if none completes, returns the longest partial recovery
    /// alongside how much of the expected size it reached.
    pub fn load(&mut self, volume: &mut Volume) -> Result<(), FileError> {
        let (_, head_block) = self.locate_header(volume).ok_or(FileError::NoData)?;
        self.size = head_block.file_size();
        self.mtime = read_mtime(&head_block);
        if self.size == 0 {
            return Err(FileError::NoData);
        }

        let expected = self.size;
        let tag = self.path_tag();

        let mut starts = [0u64; MAX_COPIES];
        for (i, chunk) in head_block.data.chunks(8).take(MAX_COPIES).enumerate() {
            starts[i] = BigEndian::read_u64(chunk);
        }

        let mut out = vec![0u8; expected as usize];
        let mut longest = 0u64;

        for copy in 0..MAX_COPIES {
            let ctx = self.cipher(copy);
            let mut next = starts[copy];
            let mut bytes = 0u64;

            while placement::is_ours(volume, next, &tag) {
                let raw = match volume.read_raw_block(next) {
                    Ok(r) => r,
                    Err(_) => break,
                };
                let block = match Block::decode(&raw, &ctx) {
                    Ok(b) => b,
                    Err(_) => break,
                };

                let remaining = expected - bytes;
                let take = (DATA_SIZE as u64).min(remaining) as usize;
                let offset = bytes as usize;
                out[offset..offset + take].copy_from_slice(&block.data[..take]);
                bytes += take as u64;

                if let Some(bitmap) = volume.used_bitmap.as_mut() {
                    bitmap.set(next);
                }

                if bytes >= expected {
                    self.data = out;
                    if let Some(kf) = volume.known_files.as_mut() {
                        kf.insert(&self.path, &self.name);
                    }
                    log::debug!(
                        "load: recovered {} bytes for '{}' on copy {copy}",
                        self.data.len(),
                        self.name
                    );
                    return Ok(());
                }
                next = block.next_index();
            }
            longest = longest.max(bytes);
        }

        log::warn!("load: no copy fully recovered '{}' ({longest}/{expected} bytes)", self.name);
        Err(FileError::PartialData { recovered: longest, expected })
    }

    /// Write every copy's block chain and header.
    ///
    /// The payload is `self.data`; `self.size` is overwritten with its
    /// length before anything is written.
    pub fn save(&mut self, volume: &mut Volume) -> Result<(), FileError> {
        let size = self.data.len() as u64;
        if MAX_COPIES as u64 * size > volume.size * 5 / 8 {
            return Err(FileError::TooBig { size });
        }

        let tag = self.path_tag();
        let mut starts = [0u64; MAX_COPIES];

        for copy in 0..MAX_COPIES {
            let ctx = self.cipher(copy);
            let start = placement::find_free_block(volume, &self.path)?;
            starts[copy] = start;

            let mut current = start;
            let mut written = 0u64;
            loop {
                let take = (DATA_SIZE as u64).min(size - written) as usize;
                let mut data = [0u8; DATA_SIZE];
                data[..take].copy_from_slice(&self.data[written as usize..written as usize + take]);
                written += take as u64;

                // A `next` index is allocated for every block, including the
                // last one in the chain — its value is written but never
                // followed, matching the placement friction the 5/8
                // capacity budget accounts for.
                let next = placement::find_free_block(volume, &self.path)?;

                let mut block = Block::zeroed();
                block.path_tag = tag;
                block.data = data;
                block.set_next_index(next);
                let raw = block.encode(&ctx)?;
                volume.write_raw_block(current, &raw)?;

                if written >= size {
                    break;
                }
                current = next;
            }
        }

        let mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        for copy in 0..MAX_COPIES {
            let ctx = self.cipher(copy);
            let index = self.header_index(volume, copy);

            let mut block = Block::zeroed();
            block.path_tag = tag;
            for (i, start) in starts.iter().enumerate() {
                BigEndian::write_u64(&mut block.data[i * 8..i * 8 + 8], *start);
            }
            write_mtime(&mut block, mtime);
            block.set_file_size(size);

            let raw = block.encode(&ctx)?;
            volume.write_raw_block(index, &raw)?;
        }

        self.size = size;
        self.mtime = mtime;
        if let Some(kf) = volume.known_files.as_mut() {
            kf.insert(&self.path, &self.name);
        }
        log::debug!("save: wrote {size} bytes for '{}' across {MAX_COPIES} copies", self.name);
        Ok(())
    }

    /// Sever every header this requester can locate, overwriting it with
    /// fresh random bytes. Data blocks are left untouched — recovering them
    /// without a header is already infeasible, so scrubbing them buys
    /// nothing and would cost an extra `MAX_COPIES`-long chain walk.
    pub fn kill(&self, volume: &mut Volume) {
        if let Some(kf) = volume.known_files.as_mut() {
            kf.remove(&self.path, &self.name);
        }

        let tag = self.path_tag();
        let mut rng = rand::thread_rng();
        for copy in 0..MAX_COPIES {
            let index = self.header_index(volume, copy);
            if !placement::is_ours(volume, index, &tag) {
                continue;
            }
            let mut garbage = [0u8; BLOCK_SIZE];
            rng.fill(&mut garbage[..]);
            let _ = volume.write_raw_block(index, &garbage);
        }
    }
}

fn read_mtime(block: &Block) -> u64 {
    BigEndian::read_u64(&block.data[MTIME_OFFSET..MTIME_OFFSET + 8])
}

fn write_mtime(block: &mut Block, mtime: u64) {
    BigEndian::write_u64(&mut block.data[MTIME_OFFSET..MTIME_OFFSET + 8], mtime);
}
