//! File moves and atomic writes shared by the trash, the recovery file
//! and the workbook writer.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `bytes` to `path` so that readers see either the old or the new
/// complete contents, never a partial file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    stage_file(path, bytes)?
        .persist(path)
        .map_err(|e| e.error)?;
    Ok(())
}

/// Write `bytes` to a temp file in the same directory as `path`, flushed to
/// disk but not yet renamed into place.
///
/// Dropping the returned file deletes it; `persist(path)` publishes it.
pub fn stage_file(path: &Path, bytes: &[u8]) -> io::Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    Ok(temp)
}

/// Move a file, falling back to copy + delete when rename fails
/// (e.g. across filesystems).
///
/// The source is only removed after the copy's size matches.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::rename(from, to).or_else(|rename_err| {
        tracing::debug!(
            from = %from.display(),
            to = %to.display(),
            error = %rename_err,
            "rename failed, copying instead"
        );
        let source_size = fs::metadata(from)?.len();
        fs::copy(from, to)?;

        let dest_size = fs::metadata(to)?.len();
        if dest_size != source_size {
            let _ = fs::remove_file(to);
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "Copy verification failed: source {} bytes, dest {} bytes",
                    source_size, dest_size
                ),
            ));
        }

        fs::remove_file(from)
    })
}
