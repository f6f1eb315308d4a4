use std::io;
use std::path::Path;

use md5::Context;
use tokio::io::AsyncReadExt;

const HASH_BLOCK_SIZE: usize = 8 * 1024;

/// State of a local file compared against its remote descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCheck {
    Satisfied,
    Missing,
    SizeMismatch { actual: u64 },
    ChecksumMismatch { actual: String },
}

/// Compares the file at `path` with the expected size and, when
/// `verify_checksums` is set, the expected MD5 digest.
///
/// File contents are only read when the size already matches and checksum
/// verification is enabled.
pub async fn check_local_file(
    path: &Path,
    expected_size: u64,
    expected_md5: &str,
    verify_checksums: bool,
) -> io::Result<FileCheck> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(FileCheck::Missing),
        Err(err) => return Err(err),
    };
    if !metadata.is_file() {
        return Ok(FileCheck::Missing);
    }
    if metadata.len() != expected_size {
        return Ok(FileCheck::SizeMismatch {
            actual: metadata.len(),
        });
    }
    if !verify_checksums {
        return Ok(FileCheck::Satisfied);
    }

    let actual = md5_file(path).await?;
    if actual.eq_ignore_ascii_case(expected_md5) {
        Ok(FileCheck::Satisfied)
    } else {
        Ok(FileCheck::ChecksumMismatch { actual })
    }
}

/// Lowercase hex MD5 of the file, streamed in fixed-size blocks.
pub async fn md5_file(path: &Path) -> io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut ctx = Context::new();
    let mut buf = vec![0u8; HASH_BLOCK_SIZE];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        ctx.consume(&buf[..read]);
    }
    Ok(format!("{:x}", ctx.compute()))
}
