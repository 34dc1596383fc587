// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Converter settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the settings file looked up in the working directory
pub const SETTINGS_FILE: &str = "ldraw-scad.toml";

/// Converter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the LDraw parts library
    pub library_root: PathBuf,
    /// Directory receiving the translated OpenSCAD library
    pub scad_libs: PathBuf,
    /// Name of the translated library (directory or combined file stem)
    pub lib_name: String,
    /// Edge line width handed to `makepoly`, 0 for no lines
    pub line: f64,
    /// Echo every source line as a comment
    pub commented: bool,
    /// Write one combined output instead of one output per part
    pub self_contained: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            library_root: PathBuf::from("lib").join("ldraw"),
            scad_libs: PathBuf::from("."),
            lib_name: "LDraw".to_string(),
            line: 0.2,
            commented: true,
            self_contained: false,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read settings file: {:?}", path.as_ref()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", path.as_ref()))?;
        Ok(settings)
    }

    /// Load settings with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut settings = if PathBuf::from(SETTINGS_FILE).exists() {
            Self::from_file(SETTINGS_FILE)?
        } else {
            Self::default()
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(root) = var("LDRAW_LIBRARY") {
            self.library_root = PathBuf::from(root);
        }
        if let Some(libs) = var("LDRAW_SCAD_LIBS") {
            self.scad_libs = PathBuf::from(libs);
        }
        if let Some(name) = var("LDRAW_SCAD_LIBNAME") {
            self.lib_name = name;
        }
    }

    /// Directory holding the per-part outputs of the translated library
    pub fn scad_lib_dir(&self) -> PathBuf {
        self.scad_libs.join(&self.lib_name)
    }

    /// Save settings to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write settings file: {:?}", path.as_ref()))?;
        Ok(())
    }
}
