//! Placement: the rejection-sampling search for a free block, and the
//! cheap plaintext probe that "free" is checked against.

use rand::Rng;
use thiserror::Error;

use crate::block::{PATH_SIZE, MAX_BLOCK_LOOKUP};
use crate::keys;
use crate::volume::Volume;

#[derive(Error, Debug)]
pub enum PlacementError {
    #[error("no free block found after {0} attempts")]
    NoSpace(usize),
}

/// Does the block at `index` carry `expected_path_tag`?
///
/// An unreadable block (I/O error, or index out of range) is treated as
/// "ours" — conservatively avoided rather than risked, matching
/// [`crate::cache::UsedBitmap`]'s over-approximation discipline.
pub fn is_ours(volume: &Volume, index: u64, expected_path_tag: &[u8; PATH_SIZE]) -> bool {
    match volume.read_path_tag(index) {
        Ok(tag) => &tag == expected_path_tag,
        Err(_) => true,
    }
}

/// Directory-prefix path tags for `path`: one per ancestor directory,
/// deepest (the full path itself) last, each hashed with exactly the same
/// [`keys::path_tag`] function a real file at that directory uses. Rebuilt
/// by re-joining with `/` rather than concatenating raw components, so
/// `/a/b` and `/ab` reconstruct to different strings and never share a tag
/// — the two-part path can only ever rebuild to `/a/b`, never `/ab`.
fn directory_prefix_tags(path: &str) -> Vec<[u8; PATH_SIZE]> {
    let mut prefixes = Vec::new();
    let mut cur = String::new();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        cur.push('/');
        cur.push_str(part);
        prefixes.push(keys::path_tag(&cur));
    }
    if prefixes.is_empty() {
        prefixes.push(keys::path_tag("/"));
    }
    prefixes
}

/// Find a block that is neither already claimed by this session's
/// [`crate::cache::UsedBitmap`] nor plausibly owned by any ancestor
/// directory of `path`. Block 0 (the superblock) is never a candidate.
pub fn find_free_block(volume: &mut Volume, path: &str) -> Result<u64, PlacementError> {
    let prefix_tags = directory_prefix_tags(path);
    let mut rng = rand::thread_rng();

    for _ in 0..MAX_BLOCK_LOOKUP {
        let index = rng.gen_range(1..volume.block_count);

        if let Some(bitmap) = volume.used_bitmap.as_ref() {
            if bitmap.is_set(index) {
                continue;
            }
        }
        if let Some(bitmap) = volume.used_bitmap.as_mut() {
            bitmap.set(index);
        }

        let claimed = prefix_tags.iter().any(|tag| is_ours(volume, index, tag));
        if !claimed {
            return Ok(index);
        }
    }
    log::warn!("find_free_block: exhausted {MAX_BLOCK_LOOKUP} placement attempts");
    Err(PlacementError::NoSpace(MAX_BLOCK_LOOKUP))
}

#[cfg(test)]
mod tests {
    use super::directory_prefix_tags;

    #[test]
    fn distinct_paths_never_share_a_full_tag_set() {
        let a = directory_prefix_tags("/a/b");
        let b = directory_prefix_tags("/ab");
        assert_ne!(a, b);
    }

    #[test]
    fn root_path_still_yields_a_tag() {
        assert_eq!(directory_prefix_tags("/").len(), 1);
        assert_eq!(directory_prefix_tags("").len(), 1);
    }
}
