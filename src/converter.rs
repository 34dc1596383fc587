// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Conversion driver for single files, model directories and whole libraries

use crate::config::Settings;
use crate::emit::{EmitOptions, ScadEmitter, LIB_STEM, RUNTIME};
use crate::library::{color_declarations, LibraryIndex};
use crate::translate::LineTranslator;
use crate::units::{
    Scheduler, SourceReader, UnitId, UnitKind, UnitProcessor, UnitRegistry, UnitState, MAIN_UNIT,
};
use ahash::AHashMap;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix of generated files
pub const SCAD_SUFFIX: &str = "scad";

/// Name of the colour declarations file of a linked library
pub const COLORS_FILE: &str = "colors.scad";

/// Model file suffixes picked up by directory conversion
const MODEL_SUFFIXES: [&str; 3] = ["mpd", "ldr", "dat"];

/// Translates LDraw input against one indexed library
pub struct Converter {
    settings: Settings,
    index: LibraryIndex,
    progress: bool,
}

impl Converter {
    /// Index the library named by `settings`
    pub fn new(settings: Settings) -> Result<Self> {
        let index = LibraryIndex::build(&settings.library_root)
            .with_context(|| format!("Failed to index LDraw library: {:?}", settings.library_root))?;
        tracing::info!(
            root = %settings.library_root.display(),
            parts = index.len(),
            "Indexed LDraw library"
        );
        Ok(Self::with_index(settings, index))
    }

    pub fn with_index(settings: Settings, index: LibraryIndex) -> Self {
        Self {
            settings,
            index,
            progress: false,
        }
    }

    /// Show a progress bar while library outputs are written
    pub fn show_progress(mut self, show: bool) -> Self {
        self.progress = show;
        self
    }

    fn scheduler(&self, follow_parts: bool) -> Scheduler<'_> {
        let processor = UnitProcessor::new(LineTranslator::new(self.settings.commented));
        Scheduler::new(&self.index, processor).follow_parts(follow_parts)
    }

    fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            lib_name: self.settings.lib_name.clone(),
            line: self.settings.line,
        }
    }

    /// Colour lookup functions for the library's colour tables
    pub fn color_declarations(&self) -> Result<String> {
        color_declarations(self.index.root()).context("Failed to translate colour tables")
    }

    /// Colour declarations followed by the runtime
    pub fn prelude(&self) -> Result<String> {
        Ok(self.color_declarations()? + RUNTIME)
    }

    /// Translate a top-level document held in memory
    pub fn translate_str(&self, source: &str) -> Result<String> {
        let mut scheduler = self.scheduler(self.settings.self_contained);
        let root = scheduler.seed_lines(MAIN_UNIT, source.lines())?;
        scheduler.run()?;
        self.render_file(scheduler, root)
    }

    /// Translate one model file.
    ///
    /// Linked output only translates the file itself and imports library
    /// parts from the translated library; self-contained output carries
    /// every part it needs.
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<()> {
        let mut scheduler = self.scheduler(self.settings.self_contained);
        let root = scheduler.seed_file(input)?;
        scheduler
            .run()
            .with_context(|| format!("Failed to translate {:?}", input))?;
        let text = self.render_file(scheduler, root)?;
        write_output(output, &text)?;
        tracing::info!(input = %input.display(), output = %output.display(), "Wrote translation");
        Ok(())
    }

    fn render_file<R: SourceReader>(&self, scheduler: Scheduler<'_, R>, root: UnitId) -> Result<String> {
        let (registry, emitted) = scheduler.into_parts();
        let emitter = ScadEmitter::new(&registry, self.emit_options());
        if self.settings.self_contained {
            return Ok(emitter.combined(&emitted, &self.prelude()?, Some(root)));
        }
        let source = registry.unit(root).source();
        emitter
            .linked_documents(&emitted)
            .into_iter()
            .find(|doc| doc.source == source)
            .map(|doc| doc.text)
            .context("Top-level document produced no output")
    }

    /// Translate every part of the library into `scad_libs`.
    /// Returns the number of documents written.
    pub fn convert_lib(&self) -> Result<usize> {
        let mut scheduler = self.scheduler(true);
        for name in self.index.names() {
            scheduler.seed_part(name)?;
        }
        scheduler.run().context("Failed to translate library")?;
        let (registry, emitted) = scheduler.into_parts();
        let emitter = ScadEmitter::new(&registry, self.emit_options());

        if self.settings.self_contained {
            let output = self
                .settings
                .scad_libs
                .join(format!("{}.{SCAD_SUFFIX}", self.settings.lib_name));
            write_output(&output, &emitter.combined(&emitted, &self.prelude()?, None))?;
            tracing::info!(output = %output.display(), units = emitted.len(), "Wrote combined library");
            return Ok(1);
        }

        let lib_dir = self.settings.scad_lib_dir();
        write_output(
            &lib_dir.join(format!("{LIB_STEM}.{SCAD_SUFFIX}")),
            &format!("use <{COLORS_FILE}>\n{RUNTIME}"),
        )?;
        write_output(&lib_dir.join(COLORS_FILE), &self.color_declarations()?)?;

        let documents = emitter.linked_documents(&emitted);
        let bar = self.progress_bar(documents.len())?;
        let mut written = 0;
        for doc in &documents {
            let Some(location) = doc.location.as_ref() else {
                continue;
            };
            bar.set_message(location.base.clone());
            let output = lib_dir.join(format!("{}.{SCAD_SUFFIX}", location.stem_path()));
            write_output(&output, &doc.text)?;
            written += 1;
            bar.inc(1);
        }
        bar.finish_and_clear();
        tracing::info!(dir = %lib_dir.display(), parts = written, "Wrote linked library");
        Ok(written)
    }

    fn progress_bar(&self, len: usize) -> Result<ProgressBar> {
        if !self.progress {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("#>-"),
        );
        Ok(bar)
    }

    /// Translate every model file below `src` into the same layout below
    /// `dest`, calling `on_job` before each file is translated
    pub fn convert_dir<F>(&self, src: &Path, dest: &Path, mut on_job: F) -> Result<DirPlan>
    where
        F: FnMut(&DirJob),
    {
        let plan = plan_dir(src, dest)?;
        for skipped in &plan.skipped {
            tracing::warn!(path = %skipped.display(), "Skipping model shadowed by another suffix");
        }
        for job in &plan.jobs {
            on_job(job);
            self.convert_file(&job.input, &job.output)?;
        }
        Ok(plan)
    }

    /// Unit graph of a model file as it would be translated
    pub fn dependency_report(&self, input: &Path) -> Result<DependencyReport> {
        let mut scheduler = self.scheduler(self.settings.self_contained);
        scheduler.seed_file(input)?;
        scheduler
            .run()
            .with_context(|| format!("Failed to resolve dependencies of {:?}", input))?;
        Ok(DependencyReport::new(input, scheduler.registry(), scheduler.emitted()))
    }
}

/// One file conversion of a directory run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Files selected below a model directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirPlan {
    pub jobs: Vec<DirJob>,
    /// Inputs hidden by a file of the same stem with a later suffix
    pub skipped: Vec<PathBuf>,
}

/// Select the model files below `src` and their outputs below `dest`.
///
/// Files are keyed by their path relative to `src` without suffix; when
/// several suffixes share a key the later one in sorted order is kept.
pub fn plan_dir(src: &Path, dest: &Path) -> Result<DirPlan> {
    let mut sources: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    let mut skipped = Vec::new();

    for entry in WalkDir::new(src).follow_links(true).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk model directory: {:?}", src))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(suffix) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        if !MODEL_SUFFIXES.contains(&suffix) {
            continue;
        }
        let key = path
            .strip_prefix(src)
            .with_context(|| format!("{:?} is outside {:?}", path, src))?
            .with_extension("");
        if let Some(previous) = sources.insert(key, path.to_path_buf()) {
            skipped.push(previous);
        }
    }

    let jobs = sources
        .into_iter()
        .map(|(key, input)| {
            let mut output = OsString::from(dest.join(key));
            output.push(".");
            output.push(SCAD_SUFFIX);
            DirJob {
                input,
                output: PathBuf::from(output),
            }
        })
        .collect();
    Ok(DirPlan { jobs, skipped })
}

/// Output path used when none is given: the input with its suffix replaced
pub fn default_output(input: &Path) -> PathBuf {
    input.with_extension(SCAD_SUFFIX)
}

fn write_output(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    std::fs::write(path, text).with_context(|| format!("Failed to write output file: {:?}", path))
}

/// One unit of a dependency report
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub identifier: String,
    pub kind: UnitKind,
    pub state: UnitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub source: PathBuf,
    pub dependencies: Vec<String>,
    /// Place in the output order, `None` for linked parts
    pub position: Option<usize>,
}

/// Unit graph of one conversion run
#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub file: PathBuf,
    pub units: Vec<UnitReport>,
}

impl DependencyReport {
    pub fn new(file: &Path, registry: &UnitRegistry, emitted: &[UnitId]) -> Self {
        let positions: AHashMap<UnitId, usize> =
            emitted.iter().enumerate().map(|(pos, &id)| (id, pos)).collect();
        let units = registry
            .ids()
            .map(|id| {
                let unit = registry.unit(id);
                UnitReport {
                    name: unit.name().to_string(),
                    identifier: unit.identifier().to_string(),
                    kind: unit.kind(),
                    state: unit.state(),
                    alias: unit.alias().map(str::to_string),
                    source: registry.path_of(id).to_path_buf(),
                    dependencies: unit.deps().all().cloned().collect(),
                    position: positions.get(&id).copied(),
                }
            })
            .collect();
        Self {
            file: file.to_path_buf(),
            units,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize dependency report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "0 empty\n").unwrap();
    }

    #[test]
    fn test_default_output() {
        assert_eq!(default_output(Path::new("models/car.ldr")), PathBuf::from("models/car.scad"));
        assert_eq!(default_output(Path::new("3001.dat")), PathBuf::from("3001.scad"));
    }

    #[test]
    fn test_plan_dir_prefers_later_suffix() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("models");
        touch(&src, "car.dat");
        touch(&src, "car.mpd");
        touch(&src, "sub/wheel.ldr");
        touch(&src, "notes.txt");

        let plan = plan_dir(&src, Path::new("out")).unwrap();
        assert_eq!(
            plan.jobs,
            vec![
                DirJob {
                    input: src.join("car.mpd"),
                    output: PathBuf::from("out/car.scad"),
                },
                DirJob {
                    input: src.join("sub").join("wheel.ldr"),
                    output: PathBuf::from("out/sub/wheel.scad"),
                },
            ]
        );
        assert_eq!(plan.skipped, vec![src.join("car.dat")]);
    }

    #[test]
    fn test_plan_dir_keeps_dotted_stems() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "set.v2.ldr");
        let plan = plan_dir(dir.path(), Path::new("out")).unwrap();
        assert_eq!(plan.jobs[0].output, PathBuf::from("out/set.v2.scad"));
    }
}
