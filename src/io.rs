use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Write `bytes` to `path` so that readers see either the old file or the
/// complete new one.
///
/// Data goes to a temporary file in the destination directory, which is
/// then renamed over `path`.
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut bufout = BufWriter::new(tmp.as_file());
        bufout.write_all(bytes)?;
        bufout.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
