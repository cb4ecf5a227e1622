use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};

use crate::TransferError;

/// Computes MD5 of `data` and returns the lowercase hex digest.
///
/// This is the format S3 reports as the ETag of objects uploaded in a
/// single PUT.
pub fn checksum_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Computes MD5 of an entire file and returns the lowercase hex digest.
pub fn calculate_file_checksum(path: &Path) -> Result<String, TransferError> {
    let read_err = |source| TransferError::ReadFile {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(read_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
