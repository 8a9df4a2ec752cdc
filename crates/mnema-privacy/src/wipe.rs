//! Best-effort secure file deletion.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use rand::RngCore;
use tracing::debug;

/// Overwrite a file with random bytes, flush, then unlink it.
///
/// Returns `Ok(false)` when the file is already gone (deletion is
/// idempotent). The overwrite is best effort against journaling and
/// copy-on-write filesystems, but it keeps the common case honest.
pub fn secure_wipe(path: &Path) -> std::io::Result<bool> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let len = metadata.len() as usize;
    if len > 0 {
        let mut noise = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut noise);

        let mut file = OpenOptions::new().write(true).open(path)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&noise)?;
        file.sync_all()?;
    }

    std::fs::remove_file(path)?;
    debug!(path = %path.display(), bytes = len, "securely wiped file");
    Ok(true)
}
