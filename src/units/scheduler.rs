// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scheduler - loads referenced units once and retires them in dependency order
//!
//! Units are pulled from a FIFO queue. A unit whose dependencies are not all
//! retired is put back behind them; a unit whose dependencies are retired is
//! retired itself, which fixes its place in the output. Library parts may be
//! linked instead of translated, in which case they retire on resolution
//! without producing output.

use super::processor::UnitProcessor;
use super::registry::{SourceId, UnitId, UnitKind, UnitRegistry, MAIN_UNIT};
use crate::error::{ConvertError, Result};
use crate::library::LibraryIndex;
use crate::translate::reference_key;
use ahash::AHashSet;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Reads the lines of a source file
pub trait SourceReader {
    fn read_lines(&self, path: &Path) -> Result<Vec<String>>;
}

/// Reads from the filesystem, substituting undecodable bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl SourceReader for FsReader {
    fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = std::fs::read(path).map_err(|e| ConvertError::io(path, e))?;
        Ok(String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect())
    }
}

impl<F> SourceReader for F
where
    F: Fn(&Path) -> Result<Vec<String>>,
{
    fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        self(path)
    }
}

/// Dependency-ordered translation of a set of root units
pub struct Scheduler<'a, R = FsReader> {
    index: &'a LibraryIndex,
    processor: UnitProcessor,
    reader: R,
    registry: UnitRegistry,
    queue: VecDeque<UnitId>,
    waiting: AHashSet<UnitId>,
    retired: AHashSet<UnitId>,
    emitted: Vec<UnitId>,
    follow_parts: bool,
}

impl<'a> Scheduler<'a, FsReader> {
    pub fn new(index: &'a LibraryIndex, processor: UnitProcessor) -> Self {
        Self::with_reader(index, processor, FsReader)
    }
}

impl<'a, R: SourceReader> Scheduler<'a, R> {
    pub fn with_reader(index: &'a LibraryIndex, processor: UnitProcessor, reader: R) -> Self {
        Self {
            index,
            processor,
            reader,
            registry: UnitRegistry::new(),
            queue: VecDeque::new(),
            waiting: AHashSet::new(),
            retired: AHashSet::new(),
            emitted: Vec::new(),
            follow_parts: true,
        }
    }

    /// Translate referenced library parts (default) or only link them
    pub fn follow_parts(mut self, follow: bool) -> Self {
        self.follow_parts = follow;
        self
    }

    /// Seed the top-level document stored at `path`
    pub fn seed_file(&mut self, path: impl Into<PathBuf>) -> Result<UnitId> {
        let id = self.registry.add_file(MAIN_UNIT, UnitKind::Root, path, None)?;
        self.enqueue(id);
        Ok(id)
    }

    /// Seed a top-level document whose content is already at hand
    pub fn seed_lines<'l, I>(&mut self, name: &str, lines: I) -> Result<UnitId>
    where
        I: IntoIterator<Item = &'l str>,
    {
        let id = self.registry.add_file(name, UnitKind::Root, name, None)?;
        for unit in self.processor.process(&mut self.registry, id, lines)? {
            self.enqueue(unit);
        }
        Ok(id)
    }

    /// Seed a library part by reference name
    pub fn seed_part(&mut self, name: &str) -> Result<UnitId> {
        let key = reference_key(name);
        if let Some(id) = self.registry.lookup(&key) {
            return Ok(id);
        }
        let location = self.index.find(name)?.clone();
        let path = location.path.clone();
        let id = self.registry.add_file(&key, UnitKind::Part, path, Some(location))?;
        self.enqueue(id);
        Ok(id)
    }

    /// Process the queue until every reachable unit is retired
    pub fn run(&mut self) -> Result<&[UnitId]> {
        while let Some(id) = self.queue.pop_front() {
            self.waiting.remove(&id);
            if self.retired.contains(&id) {
                continue;
            }
            if !self.registry.unit(id).is_loaded() {
                self.load(id)?;
            }

            let source = self.registry.unit(id).source();
            let pending: Vec<String> = self.registry.unit(id).deps().pending().iter().cloned().collect();
            let mut unresolved = Vec::new();
            for key in pending {
                let dep = self.resolve(source, &key)?;
                if self.retired.contains(&dep) {
                    self.registry.unit_mut(id).deps_mut().resolve(&key);
                } else {
                    unresolved.push(dep);
                }
            }

            if unresolved.is_empty() {
                self.retire(id);
                continue;
            }
            if let Some(path) = self.find_cycle(id) {
                return Err(ConvertError::CycleDetected { path });
            }
            tracing::debug!(
                unit = %self.registry.unit(id).name(),
                unresolved = unresolved.len(),
                "Deferring unit"
            );
            for dep in unresolved {
                self.enqueue(dep);
            }
            self.enqueue(id);
        }
        Ok(&self.emitted)
    }

    fn load(&mut self, id: UnitId) -> Result<()> {
        let path = self.registry.path_of(id).to_path_buf();
        let lines = self.reader.read_lines(&path)?;
        let units = self
            .processor
            .process(&mut self.registry, id, lines.iter().map(String::as_str))?;
        for unit in units.into_iter().filter(|&unit| unit != id) {
            self.enqueue(unit);
        }
        Ok(())
    }

    /// Registry unit for a reference key made from `source`, registering
    /// library parts on first use
    fn resolve(&mut self, source: SourceId, key: &str) -> Result<UnitId> {
        if let Some(id) = self.registry.lookup_from(source, key) {
            return Ok(id);
        }
        let location = self.index.find(key)?.clone();
        if self.follow_parts {
            let path = location.path.clone();
            self.registry.add_file(key, UnitKind::Part, path, Some(location))
        } else {
            let id = self.registry.add_linked(key, location)?;
            self.retired.insert(id);
            Ok(id)
        }
    }

    fn retire(&mut self, id: UnitId) {
        tracing::debug!(unit = %self.registry.unit(id).name(), position = self.emitted.len(), "Retired unit");
        self.retired.insert(id);
        self.emitted.push(id);
    }

    fn enqueue(&mut self, id: UnitId) {
        if !self.retired.contains(&id) && self.waiting.insert(id) {
            self.queue.push_back(id);
        }
    }

    /// Unit names along a dependency cycle through `start`, if one exists
    /// among loaded units
    fn find_cycle(&self, start: UnitId) -> Option<Vec<String>> {
        let mut path = vec![start];
        let mut visited = AHashSet::new();
        visited.insert(start);
        if !self.cycle_walk(start, start, &mut path, &mut visited) {
            return None;
        }
        Some(path.iter().map(|&id| self.registry.unit(id).name().to_string()).collect())
    }

    fn cycle_walk(
        &self,
        start: UnitId,
        node: UnitId,
        path: &mut Vec<UnitId>,
        visited: &mut AHashSet<UnitId>,
    ) -> bool {
        let source = self.registry.unit(node).source();
        for key in self.registry.unit(node).deps().pending() {
            let Some(dep) = self.registry.lookup_from(source, key) else {
                continue;
            };
            if self.retired.contains(&dep) {
                continue;
            }
            if dep == start {
                path.push(dep);
                return true;
            }
            if !self.registry.unit(dep).is_loaded() || !visited.insert(dep) {
                continue;
            }
            path.push(dep);
            if self.cycle_walk(start, dep, path, visited) {
                return true;
            }
            path.pop();
        }
        false
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Retired units in emission order
    pub fn emitted(&self) -> &[UnitId] {
        &self.emitted
    }

    pub fn into_parts(self) -> (UnitRegistry, Vec<UnitId>) {
        (self.registry, self.emitted)
    }
}
