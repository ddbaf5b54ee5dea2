//! Content comparison
//!
//! Decides whether two files hold identical bytes: size check first,
//! then a whole-file streaming SHA-256 digest.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Hash a file with SHA-256, reading it in chunks.
pub async fn hash_file(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut buf)
            .await
            .with_context(|| format!("Failed to read file for hashing: {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    let digest = hasher.finalize();
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// Compare two files by size, then by digest.
///
/// Any stat or read failure (missing file, permission error) means "not
/// equal"; this function never errors. Modification times are not
/// consulted: clock skew and mtime-preserving copies make them an
/// unsafe proxy, and the byte-identity check is also what stops
/// save-triggered sync loops.
pub async fn files_equal(a: &Path, b: &Path) -> bool {
    // Size first for a quick inequality check
    let (meta_a, meta_b) = match (tokio::fs::metadata(a).await, tokio::fs::metadata(b).await) {
        (Ok(ma), Ok(mb)) => (ma, mb),
        _ => return false,
    };
    if meta_a.len() != meta_b.len() {
        return false;
    }

    match (hash_file(a).await, hash_file(b).await) {
        (Ok(ha), Ok(hb)) => ha == hb,
        _ => false,
    }
}
