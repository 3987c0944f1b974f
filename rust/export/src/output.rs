// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Atomic file output

use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

/// Write a file atomically.
///
/// Content goes to a temporary file in the target directory which is renamed
/// over `path` once `write` succeeds. On any failure the previous file at
/// `path` is left untouched and the temporary file is removed.
pub fn write_atomic<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(temp.as_file());
        write(&mut out)?;
        out.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    debug!(path = %path.display(), "Wrote file atomically");
    Ok(())
}

/// Write a string atomically
pub fn write_string_atomic(path: &Path, content: &str) -> io::Result<()> {
    write_atomic(path, |out| out.write_all(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ifc");
        std::fs::write(&path, "old").unwrap();
        write_string_atomic(&path, "new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ifc");
        std::fs::write(&path, "old").unwrap();
        let result = write_atomic(&path, |out| {
            out.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "boom"))
        });
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.ifc");
        assert!(write_string_atomic(&path, "x").is_err());
        assert!(!path.exists());
    }
}
