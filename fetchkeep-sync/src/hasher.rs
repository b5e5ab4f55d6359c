//! Streaming file hashing.
//!
//! Files are read in fixed 1 MiB chunks so peak memory does not depend on
//! file size.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Sha224, Sha256, Sha384, Sha512, Sha512_256};

use fetchkeep_core::{Digest, HashAlgorithm};

use crate::error::{io_err, SyncError};

/// Read size used while hashing.
pub const CHUNK_SIZE: usize = 1 << 20;

/// Hash the full contents of `path` with `algorithm`.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<Digest, SyncError> {
    hash_path(path, algorithm).map_err(|e| io_err(path, e))
}

/// Like [`hash_file`] but keeps the raw `io::Error`, so callers can tell a
/// missing file apart from other failures.
pub(crate) fn hash_path(path: &Path, algorithm: HashAlgorithm) -> io::Result<Digest> {
    let mut file = File::open(path)?;
    hash_reader(&mut file, algorithm)
}

/// Hash everything readable from `reader`.
pub fn hash_reader<R: Read>(reader: &mut R, algorithm: HashAlgorithm) -> io::Result<Digest> {
    let hex = match algorithm {
        HashAlgorithm::Sha224 => stream_sha2::<Sha224, _>(reader)?,
        HashAlgorithm::Sha256 => stream_sha2::<Sha256, _>(reader)?,
        HashAlgorithm::Sha384 => stream_sha2::<Sha384, _>(reader)?,
        HashAlgorithm::Sha512 => stream_sha2::<Sha512, _>(reader)?,
        HashAlgorithm::Sha512_256 => stream_sha2::<Sha512_256, _>(reader)?,
        HashAlgorithm::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            for_each_chunk(reader, |chunk| {
                hasher.update(chunk);
            })?;
            hasher.finalize().to_hex().to_string()
        }
    };
    Ok(Digest::from_hex(hex))
}

fn stream_sha2<D: sha2::Digest, R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = D::new();
    for_each_chunk(reader, |chunk| hasher.update(chunk))?;
    Ok(hex::encode(hasher.finalize()))
}

fn for_each_chunk<R: Read>(reader: &mut R, mut f: impl FnMut(&[u8])) -> io::Result<()> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        f(&buffer[..n]);
    }
}
