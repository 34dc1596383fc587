// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! LDraw parts library index
//!
//! The library is scanned once per run. Every part file in the category
//! directories is indexed by its bare file name; files in the special
//! sub-directories (sub-parts, low and high resolution primitives) are indexed
//! under their prefixed reference name instead, e.g. `s\4744s01.dat`.

use crate::error::{ConvertError, Result};
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Category directories scanned for bare part names, in scan order
const CATEGORIES: [&str; 3] = ["models", "parts", "p"];

/// Special sub-directories and the reference prefix their parts are known by
const SPECIAL_SUBS: [(&str, &str); 3] = [("s", "parts/s"), ("48", "p/48"), ("8", "p/8")];

/// Separator between a special prefix and the file name in LDraw references
pub const PREFIX_SEPARATOR: char = '\\';

/// Part file suffix
pub const PART_SUFFIX: &str = "dat";

/// Where a part lives in the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartLocation {
    /// Category directory relative to the library root, `/`-separated
    pub category: String,
    /// File name without its suffix
    pub base: String,
    /// Full path of the part file
    pub path: PathBuf,
}

impl PartLocation {
    /// Category and base joined, `/`-separated and suffix-free
    pub fn stem_path(&self) -> String {
        format!("{}/{}", self.category, self.base)
    }
}

/// Read-only mapping from part reference names to library locations
#[derive(Debug, Clone, Default)]
pub struct LibraryIndex {
    root: PathBuf,
    entries: BTreeMap<String, PartLocation>,
    folded: AHashMap<String, String>,
}

impl LibraryIndex {
    /// Create an empty index for the given library root
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Scan the library below `root`
    pub fn build(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ConvertError::LibraryNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut index = Self::empty(root);
        for category in CATEGORIES {
            for (name, base, path) in scan_dir(root, category) {
                index.insert(name, PartLocation { category: category.to_string(), base, path });
            }
        }
        for (prefix, sub_path) in SPECIAL_SUBS {
            for (name, base, path) in scan_dir(root, sub_path) {
                index.insert(
                    format!("{prefix}{PREFIX_SEPARATOR}{name}"),
                    PartLocation { category: sub_path.to_string(), base, path },
                );
            }
        }

        tracing::debug!(root = %root.display(), parts = index.len(), "Indexed LDraw library");
        Ok(index)
    }

    /// Record a part under `name`; a later insert for the same name wins
    pub fn insert(&mut self, name: impl Into<String>, location: PartLocation) {
        let name = name.into();
        let lower = name.to_lowercase();
        if lower != name {
            self.folded.insert(lower, name.clone());
        }
        self.entries.insert(name, location);
    }

    /// Look a part up by name, retrying case-folded on a miss
    pub fn find(&self, name: &str) -> Result<&PartLocation> {
        if let Some(location) = self.entries.get(name) {
            return Ok(location);
        }
        let lower = name.to_lowercase();
        self.entries
            .get(&lower)
            .or_else(|| self.folded.get(&lower).and_then(|key| self.entries.get(key)))
            .ok_or_else(|| ConvertError::PartNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_ok()
    }

    /// Indexed names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// List part files directly inside `root/sub_path` as (file name, base, path)
fn scan_dir(root: &Path, sub_path: &str) -> Vec<(String, String, PathBuf)> {
    let dir = sub_path.split('/').fold(root.to_path_buf(), |dir, part| dir.join(part));
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "Library directory missing, skipping");
        return Vec::new();
    }

    let models = sub_path == "models";
    WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.path().to_path_buf();
            let name = entry.file_name().to_str()?.to_string();
            let (base, ext) = name.rsplit_once('.')?;
            let indexed = ext == PART_SUFFIX || (models && (ext == "ldr" || ext == "mpd"));
            indexed.then(|| (name.clone(), base.to_string(), path))
        })
        .collect()
}
