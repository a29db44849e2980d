//! End-to-end scenarios against real `tempfile`-backed containers — the
//! seeds from the design's "testable properties" section, run as black-box
//! operations through [`stegfs::Volume`] and [`stegfs::File`].

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};

use stegfs::{keys, File, FileError, Volume, BLOCK_SIZE, MAX_COPIES};
use tempfile::NamedTempFile;

fn format_container(size: u64) -> std::path::PathBuf {
    let tmp = NamedTempFile::new().unwrap();
    let path = tmp.path().to_path_buf();
    // The temp file already exists, so creation needs `force`.
    Volume::format(&path, size, true, false).unwrap();
    std::mem::forget(tmp);
    path
}

/// Overwrite block `index` in the container at `path` with zero bytes,
/// simulating external corruption of that one block.
fn zero_block(path: &std::path::Path, index: u64) {
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(index * BLOCK_SIZE as u64)).unwrap();
    file.write_all(&[0u8; BLOCK_SIZE]).unwrap();
}

#[test]
fn scenario_hello_world_round_trips() {
    let path = format_container(2 * 1024 * 1024);
    let mut volume = Volume::open(&path, true).unwrap();

    let mut f = File::new("/", "hello", "");
    f.data = b"Hello, steg!\n".to_vec();
    f.save(&mut volume).unwrap();

    let mut readback = File::new("/", "hello", "");
    readback.load(&mut volume).unwrap();
    assert_eq!(readback.data, b"Hello, steg!\n");

    let known = volume.known_files.unwrap();
    assert!(known.contains("", ""));
    assert!(known.contains("/", "hello"));

    std::fs::remove_file(&path).ok();
}

#[test]
fn scenario_passphrases_partition_files_in_same_directory() {
    let path = format_container(4 * 1024 * 1024);
    let mut volume = Volume::open(&path, true).unwrap();

    let mut a = File::new("/docs", "a.txt", "p1");
    a.data = vec![0xAA; 1024];
    a.save(&mut volume).unwrap();

    let mut b = File::new("/docs", "b.txt", "p2");
    b.data = vec![0xBB; 1024];
    b.save(&mut volume).unwrap();

    let mut load_a = File::new("/docs", "a.txt", "p1");
    load_a.load(&mut volume).unwrap();
    assert_eq!(load_a.data, vec![0xAA; 1024]);

    let mut load_b = File::new("/docs", "b.txt", "p2");
    load_b.load(&mut volume).unwrap();
    assert_eq!(load_b.data, vec![0xBB; 1024]);

    // Swapped passphrases recover nothing.
    let mut swapped_a = File::new("/docs", "a.txt", "p2");
    assert!(matches!(swapped_a.load(&mut volume), Err(FileError::NoData)));

    let mut swapped_b = File::new("/docs", "b.txt", "p1");
    assert!(matches!(swapped_b.load(&mut volume), Err(FileError::NoData)));

    std::fs::remove_file(&path).ok();
}

#[test]
fn scenario_survives_losing_all_but_one_header_copy() {
    let path = format_container(4 * 1024 * 1024);
    let mut volume = Volume::open(&path, true).unwrap();

    let mut f = File::new("/", "big", "secret");
    f.data = vec![0x42; 100 * 1024];
    f.save(&mut volume).unwrap();

    let indices: Vec<u64> = (0..MAX_COPIES)
        .map(|copy| keys::header_index(&f.path, &f.name, &f.passphrase, copy, volume.block_count))
        .collect();

    // Zero out every header copy but the first.
    for &index in &indices[1..] {
        zero_block(&path, index);
    }
    drop(volume);

    let mut volume = Volume::open(&path, true).unwrap();
    let mut readback = File::new("/", "big", "secret");
    readback.load(&mut volume).unwrap();
    assert_eq!(readback.data, vec![0x42; 100 * 1024]);

    std::fs::remove_file(&path).ok();
}

#[test]
fn scenario_oversized_file_is_rejected() {
    let path = format_container(1024 * 1024);
    let mut volume = Volume::open(&path, true).unwrap();

    let mut f = File::new("/", "huge", "");
    f.data = vec![0u8; 200 * 1024];
    assert!(matches!(f.save(&mut volume), Err(FileError::TooBig { .. })));

    std::fs::remove_file(&path).ok();
}

#[test]
fn scenario_filling_the_volume_does_not_corrupt_earlier_files() {
    // Small enough that a handful of tiny fillers exhausts every block.
    let path = format_container(64 * 1024);
    let mut volume = Volume::open(&path, true).unwrap();

    let mut first = File::new("/", "first", "");
    first.data = b"the first file written".to_vec();
    first.save(&mut volume).unwrap();

    let mut exhausted = false;
    for i in 0..500 {
        let mut filler = File::new("/", format!("filler-{i}"), "");
        filler.data = vec![i as u8; 8];
        if matches!(filler.save(&mut volume), Err(FileError::NoSpace)) {
            exhausted = true;
            break;
        }
    }
    assert!(exhausted, "expected the volume to eventually exhaust placement attempts");

    let mut readback = File::new("/", "first", "");
    readback.load(&mut volume).unwrap();
    assert_eq!(readback.data, b"the first file written");

    std::fs::remove_file(&path).ok();
}

#[test]
fn scenario_recreate_rewrites_only_the_superblock() {
    let path = format_container(2 * 1024 * 1024);
    let mut volume = Volume::open(&path, true).unwrap();

    let mut f = File::new("/", "keepme", "");
    f.data = b"still here after -r".to_vec();
    f.save(&mut volume).unwrap();
    drop(volume);

    Volume::format(&path, 0, false, true).unwrap();

    let mut volume = Volume::open(&path, true).unwrap();
    let mut readback = File::new("/", "keepme", "");
    readback.load(&mut volume).unwrap();
    assert_eq!(readback.data, b"still here after -r");

    std::fs::remove_file(&path).ok();
}
