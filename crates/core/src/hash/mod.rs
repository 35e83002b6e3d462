//! OSDb movie fingerprinting.
//!
//! The fingerprint identifies a video file to the subtitle service without
//! uploading its contents: a 64-bit hash over the first and last 64 KiB of
//! the file plus the total byte size. The algorithm is a public
//! interoperability contract shared by every OSDb client, so it is
//! reproduced bit-for-bit: little-endian word order, wrapping addition,
//! and overlapping head/tail chunks for files close to the minimum size.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;

/// Size of the head and tail chunks hashed from each file.
pub const CHUNK_SIZE: u64 = 64 * 1024;

/// A content-derived identity for a local video file.
///
/// Recomputed on every search; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFingerprint {
    /// 64-bit OSDb hash (wrapping sum of LE words plus file size).
    pub hash: u64,
    /// Total file size in bytes.
    pub size: u64,
}

impl FileFingerprint {
    /// The fixed 16-character lowercase hex rendering used on the wire.
    pub fn hex(&self) -> String {
        format!("{:016x}", self.hash)
    }
}

/// Errors from fingerprint computation.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("file is too small to fingerprint ({size} bytes, minimum {CHUNK_SIZE})")]
    TooSmall { size: u64 },

    #[error("short read at offset {offset}")]
    ShortRead { offset: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compute the OSDb fingerprint of the file at `path`.
///
/// Files smaller than one chunk (64 KiB) cannot be fingerprinted and fail
/// with [`HashError::TooSmall`]. For files between one and two chunks the
/// head and tail chunks overlap; that overlap is part of the algorithm.
pub fn fingerprint_file(path: &Path) -> Result<FileFingerprint, HashError> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    if size < CHUNK_SIZE {
        return Err(HashError::TooSmall { size });
    }

    let mut buf = vec![0u8; (CHUNK_SIZE * 2) as usize];
    read_chunk(&mut file, 0, &mut buf[..CHUNK_SIZE as usize])?;
    read_chunk(&mut file, size - CHUNK_SIZE, &mut buf[CHUNK_SIZE as usize..])?;

    let mut hash: u64 = 0;
    let mut word = [0u8; 8];
    for chunk in buf.chunks_exact(8) {
        word.copy_from_slice(chunk);
        hash = hash.wrapping_add(u64::from_le_bytes(word));
    }
    hash = hash.wrapping_add(size);

    Ok(FileFingerprint { hash, size })
}

/// Fill `buf` from `file` starting at `offset`.
fn read_chunk(file: &mut File, offset: u64, buf: &mut [u8]) -> Result<(), HashError> {
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            HashError::ShortRead { offset }
        } else {
            HashError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_fingerprint_nonexistent_file() {
        let result = fingerprint_file(Path::new("/nonexistent/video.avi"));
        assert!(matches!(result, Err(HashError::Io(_))));
    }

    #[test]
    fn test_fingerprint_too_small_file() {
        let file = write_temp(b"too small");
        let result = fingerprint_file(file.path());
        assert!(matches!(result, Err(HashError::TooSmall { size: 9 })));
    }

    #[test]
    fn test_fingerprint_known_vector() {
        // Regression vector shared with other OSDb clients: 128 KiB of
        // zeros with "blablabla" at offset 0.
        let mut data = vec![0u8; (CHUNK_SIZE * 2) as usize];
        data[..9].copy_from_slice(b"blablabla");
        let file = write_temp(&data);

        let fp = fingerprint_file(file.path()).unwrap();
        assert_eq!(fp.hash, 0x6c62616c62636cc3);
        assert_eq!(fp.size, CHUNK_SIZE * 2);
        assert_eq!(fp.hex(), "6c62616c62636cc3");
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let data = vec![0xabu8; (CHUNK_SIZE + 100) as usize];
        let file = write_temp(&data);

        let first = fingerprint_file(file.path()).unwrap();
        let second = fingerprint_file(file.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fingerprint_minimum_size_overlapping_chunks() {
        // Exactly one chunk: head and tail fully overlap.
        let data = vec![1u8; CHUNK_SIZE as usize];
        let file = write_temp(&data);

        let fp = fingerprint_file(file.path()).unwrap();
        assert_eq!(fp.size, CHUNK_SIZE);

        // Each LE word of 0x0101.. repeated is 0x0101010101010101; the
        // buffer holds 16384 of them (head chunk counted twice).
        let word = u64::from_le_bytes([1; 8]);
        let expected = word
            .wrapping_mul(16384)
            .wrapping_add(CHUNK_SIZE);
        assert_eq!(fp.hash, expected);
    }

    #[test]
    fn test_hex_is_zero_padded() {
        let fp = FileFingerprint { hash: 0x2c, size: 70000 };
        assert_eq!(fp.hex(), "000000000000002c");
    }
}
