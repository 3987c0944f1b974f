// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image URL remapping
//!
//! Replaces `image_url` values after images were uploaded somewhere else.
//! The mapping file is JSON, either an object `{"IMG_0001.jpg": "https://..."}`
//! or an array of `{"filename": ..., "image_url": ...}` rows (`"File name"`
//! and `"ImageURL"` are accepted as column names). Filenames are matched by
//! base name.

use std::path::Path;

use geomark_export::ImageRecord;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};

/// Filename to URL
pub type UrlMapping = FxHashMap<String, String>;

#[derive(Deserialize)]
struct MappingRow {
    #[serde(alias = "File name", alias = "file_name")]
    filename: String,
    #[serde(alias = "ImageURL", alias = "url")]
    image_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MappingFile {
    Object(FxHashMap<String, String>),
    Rows(Vec<MappingRow>),
}

fn base_name(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name).trim()
}

/// Parse a mapping document
pub fn parse_url_map(text: &str) -> std::result::Result<UrlMapping, serde_json::Error> {
    let pairs: Vec<(String, String)> = match serde_json::from_str::<MappingFile>(text)? {
        MappingFile::Object(map) => map.into_iter().collect(),
        MappingFile::Rows(rows) => rows.into_iter().map(|r| (r.filename, r.image_url)).collect(),
    };
    Ok(pairs
        .into_iter()
        .filter(|(name, url)| !name.trim().is_empty() && !url.trim().is_empty())
        .map(|(name, url)| (base_name(&name).to_string(), url.trim().to_string()))
        .collect())
}

pub fn load_url_map(path: &Path) -> Result<UrlMapping> {
    let text = std::fs::read_to_string(path).map_err(|e| ProcessingError::UrlMap {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mapping = parse_url_map(&text).map_err(|e| ProcessingError::UrlMap {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), entries = mapping.len(), "Loaded URL mapping");
    Ok(mapping)
}

/// Replace `image_url` of every record with a mapping entry; returns the number updated
pub fn remap_urls(records: &mut [ImageRecord], mapping: &UrlMapping) -> usize {
    let mut updated = 0;
    for record in records.iter_mut() {
        if let Some(url) = mapping.get(base_name(&record.filename)) {
            if record.image_url.as_deref() != Some(url.as_str()) {
                record.image_url = Some(url.clone());
                updated += 1;
            }
        }
    }
    info!(updated, total = records.len(), "Remapped image URLs");
    updated
}
