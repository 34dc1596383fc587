// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for library indexing and translation

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a translation run
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A referenced part is neither embedded in the source nor in the library index
    #[error("part not found in library: {name}")]
    PartNotFound { name: String },

    /// A record line carries fewer fields than its command code requires
    #[error("{unit}:{line_no}: expected {expected} fields, found {found}: {line}")]
    ArgumentCount {
        unit: String,
        line_no: usize,
        line: String,
        expected: usize,
        found: usize,
    },

    /// Two or more units depend on each other
    #[error("circular part reference: {}", path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    /// An embedded sub-document reuses the name of a unit already known to the run
    #[error("embedded sub-document {name} is already defined")]
    DuplicateUnit { name: String },

    #[error("LDraw library not found at {}", path.display())]
    LibraryNotFound { path: PathBuf },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
