// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! OpenSCAD output - renders retired units as documents
//!
//! Two shapes are produced from the same emission order:
//! - linked: one document per source file, importing the runtime library and
//!   every external dependency through `use`, with a module wrapper around
//!   the source's root unit
//! - combined: one document with the colour table, the runtime and every
//!   unit definition

use crate::library::PartLocation;
use crate::translate::function_name;
use crate::units::{SourceId, UnitId, UnitRegistry};
use ahash::AHashSet;
use std::collections::BTreeMap;

/// Geometry interpretation runtime (`makepoly` and helpers)
pub const RUNTIME: &str = include_str!("runtime.scad");

/// Stem of the runtime library inside the translated library directory
pub const LIB_STEM: &str = "lib";

/// Parameters of the module wrapper around a root unit
const MODULE_PARAMS: &str = "step=0, col=false, unit=2/5, alt=false, line=0.2, solid=!$preview";
const MODULE_ARGS: &str = "step=step, col=col, unit=unit, alt=alt, line=line, solid=solid";

#[derive(Debug, Clone, PartialEq)]
pub struct EmitOptions {
    /// Name of the translated library directory
    pub lib_name: String,
    /// Edge line width used by invocations
    pub line: f64,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            lib_name: "LDraw".to_string(),
            line: 0.2,
        }
    }
}

/// One output document of a linked run
#[derive(Debug, Clone)]
pub struct LinkedDocument {
    pub source: SourceId,
    /// Library location of the source, `None` for the top-level file
    pub location: Option<PartLocation>,
    pub text: String,
}

/// Renders units of a finished run
pub struct ScadEmitter<'r> {
    registry: &'r UnitRegistry,
    options: EmitOptions,
}

impl<'r> ScadEmitter<'r> {
    pub fn new(registry: &'r UnitRegistry, options: EmitOptions) -> Self {
        Self { registry, options }
    }

    /// `function <ident>() = [` followed by the unit's records and `];`
    pub fn unit_definition(&self, id: UnitId) -> Vec<String> {
        let unit = self.registry.unit(id);
        let mut lines = Vec::with_capacity(unit.body().len() + 2);
        lines.push(format!("function {}() = [", unit.identifier()));
        lines.extend(unit.body().iter().map(|record| record.to_string()));
        lines.push("];".to_string());
        lines
    }

    /// Alias function (and module when `with_module`) binding a unit's
    /// alternate name to its definition
    fn alias_lines(&self, id: UnitId, with_module: bool) -> Vec<String> {
        let unit = self.registry.unit(id);
        let Some(alias) = unit.alias() else {
            return Vec::new();
        };
        let alias_ident = function_name(alias);
        if alias_ident == unit.identifier() {
            return Vec::new();
        }

        let mut lines = vec![format!("function {alias_ident}() = {}();", unit.identifier())];
        if with_module {
            lines.push(format!("module {alias_ident}({MODULE_PARAMS})"));
            lines.push(format!("    {}({MODULE_ARGS});", unit.identifier()));
        }
        lines
    }

    /// One document per translated source, in order of first emission
    pub fn linked_documents(&self, emitted: &[UnitId]) -> Vec<LinkedDocument> {
        let mut order: Vec<SourceId> = Vec::new();
        let mut grouped: BTreeMap<SourceId, Vec<UnitId>> = BTreeMap::new();
        for &id in emitted {
            let source = self.registry.unit(id).source();
            let units = grouped.entry(source).or_default();
            if units.is_empty() {
                order.push(source);
            }
            units.push(id);
        }

        order
            .into_iter()
            .map(|source| LinkedDocument {
                source,
                location: self.registry.source(source).location.clone(),
                text: self.linked_document(source, &grouped[&source]),
            })
            .collect()
    }

    fn linked_document(&self, source: SourceId, units: &[UnitId]) -> String {
        let from = self.registry.source(source).location.as_ref();
        let mut lines = vec![format!("use <{}>", self.use_path(LIB_STEM, from))];
        lines.extend(self.external_uses(source, units, from));

        for &id in units {
            lines.extend(self.unit_definition(id));
        }

        let root = self.registry.source(source).root;
        if units.contains(&root) {
            let ident = self.registry.unit(root).identifier();
            lines.push(format!("module {ident}({MODULE_PARAMS})"));
            lines.push(format!("    makepoly({ident}(), {MODULE_ARGS});"));
            lines.push(format!("{ident}(line={});", self.options.line));
        }
        for &id in units {
            lines.extend(self.alias_lines(id, true));
        }
        lines.join("\n") + "\n"
    }

    /// `use` lines for dependencies defined in other sources, by reference key
    fn external_uses(&self, source: SourceId, units: &[UnitId], from: Option<&PartLocation>) -> Vec<String> {
        let mut targets: BTreeMap<&str, &PartLocation> = BTreeMap::new();
        for &id in units {
            for key in self.registry.unit(id).deps().all() {
                let Some(dep) = self.registry.lookup_from(source, key) else {
                    tracing::warn!(unit = %self.registry.unit(id).name(), dep = %key, "Unresolved dependency left out of use list");
                    continue;
                };
                let dep_source = self.registry.source_of(dep);
                if self.registry.unit(dep).source() == source {
                    continue;
                }
                if let Some(location) = dep_source.location.as_ref() {
                    targets.insert(key.as_str(), location);
                }
            }
        }

        let mut seen = AHashSet::new();
        targets
            .values()
            .map(|location| self.use_path(&location.stem_path(), from))
            .filter(|path| seen.insert(path.clone()))
            .map(|path| format!("use <{path}>"))
            .collect()
    }

    /// Path of a library stem as seen from a document at `from`
    pub fn use_path(&self, stem: &str, from: Option<&PartLocation>) -> String {
        match from {
            None => format!("{}/{stem}.scad", self.options.lib_name),
            Some(location) => format!("{}.scad", relative_path(stem, &location.category)),
        }
    }

    /// Colour declarations and runtime in `prelude`, then every emitted unit.
    /// `invoke` names a unit drawn by the document itself.
    pub fn combined(&self, emitted: &[UnitId], prelude: &str, invoke: Option<UnitId>) -> String {
        let mut text = prelude.to_string();
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        if let Some(id) = invoke {
            text.push_str(&format!(
                "makepoly({}(), line={});\n",
                self.registry.unit(id).identifier(),
                self.options.line
            ));
        }

        let mut lines = Vec::new();
        for &id in emitted {
            lines.extend(self.unit_definition(id));
            lines.extend(self.alias_lines(id, false));
        }
        text.push_str(&lines.join("\n"));
        text.push('\n');
        text
    }
}

/// `/`-separated `target` relative to the directory `from_dir`
pub fn relative_path(target: &str, from_dir: &str) -> String {
    let target: Vec<&str> = target.split('/').filter(|c| !c.is_empty()).collect();
    let from: Vec<&str> = from_dir.split('/').filter(|c| !c.is_empty()).collect();
    let common = target.iter().zip(&from).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&target[common..]);
    parts.join("/")
}
