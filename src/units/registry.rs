// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Unit registry - the single owned table of every unit known to a run
//!
//! Units live in an arena and are addressed by [`UnitId`]. Names are the
//! normalized reference keys used by sub-file records, so a reference can be
//! resolved against the registry before the library index is consulted.
//! File roots are unique across the run; embedded sub-documents, placeholders
//! and aliases are only visible from the source that defines them.

use crate::error::{ConvertError, Result};
use crate::library::PartLocation;
use crate::translate::{function_name, reference_key, Dependencies, Record};
use ahash::AHashMap;
use serde::Serialize;
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

/// Name of the top-level document of a single-file conversion
pub const MAIN_UNIT: &str = "__main__";

/// Handle of a unit in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(usize);

/// Handle of a physical source file in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Top-level document of a file conversion
    Root,
    /// Library part
    Part,
    /// Sub-document embedded in a multi-document source
    Embedded,
    /// Synthesized after `NOFILE`
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    /// Known by name only
    Referenced,
    /// Content translated
    Loaded,
    /// Translated elsewhere, only referenced through `use`
    Linked,
}

/// A physical file and the units it defines
#[derive(Debug, Clone)]
pub struct Source {
    pub path: PathBuf,
    /// Library location, `None` for a top-level file
    pub location: Option<PartLocation>,
    pub root: UnitId,
    /// Units defined by this file in source order, root first
    pub units: Vec<UnitId>,
    /// Embedded, placeholder and alias names local to this file
    names: AHashMap<String, UnitId>,
}

impl Source {
    fn local(&self, key: &str) -> Option<UnitId> {
        self.names.get(key).copied()
    }
}

/// A named translatable subdivision of input
#[derive(Debug, Clone)]
pub struct Unit {
    name: String,
    kind: UnitKind,
    state: UnitState,
    source: SourceId,
    body: Vec<Record>,
    deps: Dependencies,
    alias: Option<String>,
    identifier: OnceCell<String>,
}

impl Unit {
    fn new(name: String, kind: UnitKind, state: UnitState, source: SourceId) -> Self {
        Self {
            name,
            kind,
            state,
            source,
            body: Vec::new(),
            deps: Dependencies::default(),
            alias: None,
            identifier: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == UnitState::Loaded
    }

    pub fn is_linked(&self) -> bool {
        self.state == UnitState::Linked
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn body(&self) -> &[Record] {
        &self.body
    }

    pub fn deps(&self) -> &Dependencies {
        &self.deps
    }

    pub fn deps_mut(&mut self) -> &mut Dependencies {
        &mut self.deps
    }

    /// Alternate name given by a leading `FILE` marker
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Canonical OpenSCAD identifier, computed on first use
    pub fn identifier(&self) -> &str {
        self.identifier.get_or_init(|| function_name(&self.name))
    }

    pub(crate) fn push(&mut self, record: Record) {
        self.body.push(record);
    }

    pub(crate) fn set_loaded(&mut self) {
        self.state = UnitState::Loaded;
    }
}

/// Arena of units and their sources for one conversion run
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    sources: Vec<Source>,
    by_name: AHashMap<String, UnitId>,
    placeholders: usize,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the root unit of a physical file
    pub fn add_file(
        &mut self,
        name: &str,
        kind: UnitKind,
        path: impl Into<PathBuf>,
        location: Option<PartLocation>,
    ) -> Result<UnitId> {
        self.add_source_unit(name, kind, UnitState::Referenced, path.into(), location)
    }

    /// Register a library part that is translated elsewhere
    pub fn add_linked(&mut self, name: &str, location: PartLocation) -> Result<UnitId> {
        let path = location.path.clone();
        self.add_source_unit(name, UnitKind::Part, UnitState::Linked, path, Some(location))
    }

    fn add_source_unit(
        &mut self,
        name: &str,
        kind: UnitKind,
        state: UnitState,
        path: PathBuf,
        location: Option<PartLocation>,
    ) -> Result<UnitId> {
        let key = reference_key(name);
        self.ensure_free(&key)?;
        let source = SourceId(self.sources.len());
        let id = self.push_unit(Unit::new(key, kind, state, source));
        self.sources.push(Source {
            path,
            location,
            root: id,
            units: vec![id],
            names: AHashMap::new(),
        });
        Ok(id)
    }

    /// Open a sub-document embedded in `source`
    pub fn open_embedded(&mut self, name: &str, source: SourceId) -> Result<UnitId> {
        let key = reference_key(name);
        if self.is_taken_in(source, &key) {
            return Err(ConvertError::DuplicateUnit { name: key });
        }
        Ok(self.push_local(Unit::new(key, UnitKind::Embedded, UnitState::Loaded, source)))
    }

    /// Open a uniquely named placeholder in `source`
    pub fn open_placeholder(&mut self, source: SourceId) -> UnitId {
        let key = loop {
            self.placeholders += 1;
            let key = format!("dummy_{}", self.placeholders);
            if !self.is_taken_in(source, &key) && !self.by_name.contains_key(&key) {
                break key;
            }
        };
        self.push_local(Unit::new(key, UnitKind::Placeholder, UnitState::Loaded, source))
    }

    /// Give `unit` an alternate name that also resolves to it from its source
    pub fn set_alias(&mut self, unit: UnitId, alias: &str) -> Result<()> {
        let key = reference_key(alias);
        let source = self.units[unit.0].source;
        if key != self.units[unit.0].name {
            match self.sources[source.0].local(&key) {
                Some(existing) if existing != unit => {
                    return Err(ConvertError::DuplicateUnit { name: alias.to_string() })
                }
                Some(_) => {}
                None => {
                    self.sources[source.0].names.insert(key, unit);
                }
            }
        }
        self.units[unit.0].alias = Some(alias.to_string());
        Ok(())
    }

    /// Whether `key` already names a unit defined by `source`
    fn is_taken_in(&self, source: SourceId, key: &str) -> bool {
        let source = &self.sources[source.0];
        source.names.contains_key(key) || self.units[source.root.0].name == key
    }

    fn ensure_free(&self, key: &str) -> Result<()> {
        if self.by_name.contains_key(key) {
            return Err(ConvertError::DuplicateUnit { name: key.to_string() });
        }
        Ok(())
    }

    fn push_unit(&mut self, unit: Unit) -> UnitId {
        let id = UnitId(self.units.len());
        self.by_name.insert(unit.name.clone(), id);
        self.units.push(unit);
        id
    }

    fn push_local(&mut self, unit: Unit) -> UnitId {
        let id = UnitId(self.units.len());
        let source = &mut self.sources[unit.source.0];
        source.names.insert(unit.name.clone(), id);
        source.units.push(id);
        self.units.push(unit);
        id
    }

    /// Resolve a reference key to a registered file root
    pub fn lookup(&self, name: &str) -> Option<UnitId> {
        self.by_name
            .get(name)
            .or_else(|| self.by_name.get(&reference_key(name)))
            .copied()
    }

    /// Resolve a reference made from within `source`: names local to the
    /// source shadow file roots
    pub fn lookup_from(&self, source: SourceId, name: &str) -> Option<UnitId> {
        let local = &self.sources[source.0];
        local
            .local(name)
            .or_else(|| local.local(&reference_key(name)))
            .or_else(|| self.lookup(name))
    }

    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id.0]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut Unit {
        &mut self.units[id.0]
    }

    pub fn source(&self, id: SourceId) -> &Source {
        &self.sources[id.0]
    }

    /// Source of a unit
    pub fn source_of(&self, id: UnitId) -> &Source {
        self.source(self.units[id.0].source)
    }

    /// Path the unit's content is read from
    pub fn path_of(&self, id: UnitId) -> &Path {
        &self.source_of(id).path
    }

    pub fn ids(&self) -> impl Iterator<Item = UnitId> {
        (0..self.units.len()).map(UnitId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_reference_keys() {
        let mut registry = UnitRegistry::new();
        let id = registry.add_file("Sub/Part.DAT", UnitKind::Part, "p.dat", None).unwrap();
        assert_eq!(registry.unit(id).name(), "sub\\part.dat");
        assert_eq!(registry.lookup("Sub/Part.DAT"), Some(id));
        assert_eq!(registry.unit(id).identifier(), "ldraw_lib__sub__part");
    }

    #[test]
    fn test_embedded_units_share_source() {
        let mut registry = UnitRegistry::new();
        let root = registry.add_file(MAIN_UNIT, UnitKind::Root, "model.mpd", None).unwrap();
        let source = registry.unit(root).source();
        let inner = registry.open_embedded("inner.ldr", source).unwrap();
        let dummy = registry.open_placeholder(source);

        assert_eq!(registry.source(source).units, vec![root, inner, dummy]);
        assert!(registry.unit(inner).is_loaded());
        assert!(!registry.unit(root).is_loaded());
        assert_eq!(registry.path_of(inner), Path::new("model.mpd"));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut registry = UnitRegistry::new();
        let root = registry.add_file(MAIN_UNIT, UnitKind::Root, "a.ldr", None).unwrap();
        let source = registry.unit(root).source();
        registry.open_embedded("inner.ldr", source).unwrap();
        assert!(matches!(
            registry.open_embedded("INNER.ldr", source),
            Err(ConvertError::DuplicateUnit { .. })
        ));
    }

    #[test]
    fn test_placeholders_skip_taken_names() {
        let mut registry = UnitRegistry::new();
        let root = registry.add_file(MAIN_UNIT, UnitKind::Root, "a.ldr", None).unwrap();
        let source = registry.unit(root).source();
        registry.open_embedded("dummy_1", source).unwrap();

        let first = registry.open_placeholder(source);
        let second = registry.open_placeholder(source);
        assert_eq!(registry.unit(first).name(), "dummy_2");
        assert_eq!(registry.unit(second).name(), "dummy_3");
        assert_eq!(registry.unit(first).kind(), UnitKind::Placeholder);
    }

    #[test]
    fn test_alias_resolves_to_unit() {
        let mut registry = UnitRegistry::new();
        let root = registry.add_file(MAIN_UNIT, UnitKind::Root, "a.mpd", None).unwrap();
        registry.set_alias(root, "mdp_test.dat").unwrap();
        let source = registry.unit(root).source();
        assert_eq!(registry.lookup_from(source, "MDP_TEST.DAT"), Some(root));
        assert_eq!(registry.lookup("mdp_test.dat"), None);
        assert_eq!(registry.unit(root).alias(), Some("mdp_test.dat"));

        let other = registry.open_embedded("other.ldr", source).unwrap();
        assert!(registry.set_alias(other, "mdp_test.dat").is_err());
    }

    #[test]
    fn test_embedded_names_are_local_to_their_source() {
        let mut registry = UnitRegistry::new();
        let a = registry.add_file("a.mpd", UnitKind::Part, "a.mpd", None).unwrap();
        let b = registry.add_file("b.mpd", UnitKind::Part, "b.mpd", None).unwrap();
        let (source_a, source_b) = (registry.unit(a).source(), registry.unit(b).source());

        let wheel_a = registry.open_embedded("wheel.ldr", source_a).unwrap();
        let wheel_b = registry.open_embedded("Wheel.ldr", source_b).unwrap();
        assert_ne!(wheel_a, wheel_b);
        assert_eq!(registry.lookup_from(source_a, "wheel.ldr"), Some(wheel_a));
        assert_eq!(registry.lookup_from(source_b, "wheel.ldr"), Some(wheel_b));
        assert_eq!(registry.lookup("wheel.ldr"), None);

        // File roots stay visible from every source.
        assert_eq!(registry.lookup_from(source_a, "b.mpd"), Some(b));
    }

    #[test]
    fn test_local_name_shadows_file_root() {
        let mut registry = UnitRegistry::new();
        let part = registry.add_file("3001.dat", UnitKind::Part, "3001.dat", None).unwrap();
        let root = registry.add_file(MAIN_UNIT, UnitKind::Root, "model.mpd", None).unwrap();
        let source = registry.unit(root).source();
        let local = registry.open_embedded("3001.dat", source).unwrap();

        assert_eq!(registry.lookup_from(source, "3001.dat"), Some(local));
        assert_eq!(registry.lookup("3001.dat"), Some(part));
    }
}
