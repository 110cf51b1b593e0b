//! Atomic file output: write into a temp file next to the target, then rename.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write `bytes` to `dir/file_name` so the target either holds the full
/// contents or does not exist. The temp file is removed on any failure.
pub fn write_atomic(dir: &Path, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    let target = dir.join(file_name);
    let mut tmp = tempfile::Builder::new()
        .prefix(".garmin-dl-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}

/// [`write_atomic`] on the blocking pool.
pub async fn write_atomic_async(
    dir: PathBuf,
    file_name: String,
    bytes: Vec<u8>,
) -> io::Result<PathBuf> {
    tokio::task::spawn_blocking(move || write_atomic(&dir, &file_name, &bytes))
        .await
        .map_err(io::Error::other)?
}
