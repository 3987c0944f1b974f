// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image folder scanning

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};

/// Image files under `folder` with a configured extension, sorted by path.
///
/// Only the top level is read unless `config.recursive` is set. Unreadable
/// entries below the root are logged and skipped.
pub fn scan_images(folder: &Path, config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(ProcessingError::NotADirectory(folder.to_path_buf()));
    }

    let max_depth = if config.recursive { usize::MAX } else { 1 };
    let mut images = Vec::new();

    for entry in WalkDir::new(folder).max_depth(max_depth).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
                return Err(ProcessingError::io(folder, source));
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let accepted = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| config.accepts_extension(e));
        if accepted {
            images.push(entry.into_path());
        }
    }

    images.sort();
    debug!(folder = %folder.display(), count = images.len(), "Scanned image folder");
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.JPG", "a.jpeg", "notes.txt", "c.tif", "d.gif"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("e.png"), b"x").unwrap();

        let config = PipelineConfig::default();
        let names: Vec<_> = scan_images(dir.path(), &config)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpeg", "b.JPG", "c.tif"]);

        let recursive = PipelineConfig {
            recursive: true,
            ..PipelineConfig::default()
        };
        let found = scan_images(dir.path(), &recursive).unwrap();
        assert_eq!(found.len(), 4);
        assert!(found.iter().any(|p| p.ends_with("nested/e.png")));
    }

    #[test]
    fn test_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            scan_images(&file, &PipelineConfig::default()),
            Err(ProcessingError::NotADirectory(_))
        ));
    }
}
