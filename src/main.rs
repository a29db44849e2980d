//! `mkfs.stegfs` — format a container as a stegfs volume.
//!
//! Fills the container with ciphertext noise (unless `-r`), then writes the
//! superblock. Everything else — saving, loading, listing files — goes
//! through the `stegfs` library directly; this binary's only job is
//! bringing a volume into existence.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use stegfs::volume::{Volume, VolumeError};

#[derive(Parser)]
#[command(name = "mkfs.stegfs", version, about = "Format a container as a stegfs volume")]
struct Cli {
    /// Container path: a regular file or a block device
    path: PathBuf,

    /// Size, with an optional M/G/T/P/E suffix (1024-radix). A bare number
    /// is megabytes. Required when creating a new regular file.
    #[arg(short = 's', long = "size")]
    size: Option<String>,

    /// Overwrite an existing regular file
    #[arg(short = 'f', long = "force")]
    force: bool,

    /// Rewrite the superblock on an existing container without re-noising it
    #[arg(short = 'r', long = "recreate")]
    recreate: bool,

    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level)).init();

    let size = match cli.size.as_deref().map(parse_size).transpose() {
        Ok(size) => size.unwrap_or(0),
        Err(e) => {
            eprintln!("mkfs.stegfs: {e}");
            return ExitCode::FAILURE;
        }
    };

    match Volume::format(&cli.path, size, cli.force, cli.recreate) {
        Ok(block_count) => {
            println!(
                "mkfs.stegfs: formatted {} ({block_count} blocks of {} bytes, magic {})",
                cli.path.display(),
                stegfs::BLOCK_SIZE,
                stegfs::superblock::magic_fingerprint(),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("mkfs.stegfs: {}: {e}", cli.path.display());
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(e: &VolumeError) -> ExitCode {
    match e {
        VolumeError::UnsupportedTarget(_) => ExitCode::from(2),
        VolumeError::MissingSize(_) => ExitCode::from(3),
        VolumeError::AlreadyExists(_) => ExitCode::from(4),
        VolumeError::BadMagic => ExitCode::from(5),
        VolumeError::Io(_) | VolumeError::Crypto(_) => ExitCode::from(1),
    }
}

/// Parse a size string with an optional `M/G/T/P/E` suffix on a 1024 radix.
/// A bare number (no suffix) is interpreted as megabytes.
fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, multiplier) = match s.chars().last() {
        Some(c @ ('M' | 'm')) => (&s[..s.len() - c.len_utf8()], 1024u64.pow(2)),
        Some(c @ ('G' | 'g')) => (&s[..s.len() - c.len_utf8()], 1024u64.pow(3)),
        Some(c @ ('T' | 't')) => (&s[..s.len() - c.len_utf8()], 1024u64.pow(4)),
        Some(c @ ('P' | 'p')) => (&s[..s.len() - c.len_utf8()], 1024u64.pow(5)),
        Some(c @ ('E' | 'e')) => (&s[..s.len() - c.len_utf8()], 1024u64.pow(6)),
        _ => (s, 1024u64.pow(2)),
    };
    let count: u64 = digits.parse().map_err(|_| format!("'{s}' is not a valid size"))?;
    count.checked_mul(multiplier).ok_or_else(|| format!("'{s}' overflows a 64-bit size"))
}

#[cfg(test)]
mod tests {
    use super::parse_size;

    #[test]
    fn bare_number_is_megabytes() {
        assert_eq!(parse_size("4").unwrap(), 4 * 1024 * 1024);
    }

    #[test]
    fn suffixes_use_1024_radix() {
        assert_eq!(parse_size("2M").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("1G").unwrap(), 1024 * 1024 * 1024);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_size("banana").is_err());
    }
}
