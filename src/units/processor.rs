// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Unit processor - runs the line translator over one physical file

use super::registry::{UnitId, UnitRegistry};
use crate::error::Result;
use crate::translate::{Boundary, LineTranslator, TranslationContext};

/// Translates the content of a unit's source into the registry
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitProcessor {
    translator: LineTranslator,
}

impl UnitProcessor {
    pub fn new(translator: LineTranslator) -> Self {
        Self { translator }
    }

    /// Translate `lines` as the content of `unit`.
    ///
    /// `FILE` markers open embedded units and `NOFILE` markers open
    /// placeholders in the same source; the first `FILE` marker of a source
    /// only names the unit being processed. Returns every unit the source
    /// defines, `unit` first.
    pub fn process<'a, I>(&self, registry: &mut UnitRegistry, unit: UnitId, lines: I) -> Result<Vec<UnitId>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let source = registry.unit(unit).source();
        let mut ctx = TranslationContext::new(registry.unit(unit).name());
        let mut current = unit;
        let mut implemented = false;

        for line in lines {
            let translated = {
                let target = registry.unit_mut(current);
                let translated = self.translator.translate(&mut ctx, line, target.deps_mut())?;
                for record in translated.records {
                    target.push(record);
                }
                translated.boundary
            };

            match translated {
                None => {}
                Some(Boundary::File(name)) if !implemented => {
                    registry.set_alias(current, &name)?;
                    implemented = true;
                }
                Some(Boundary::File(name)) => {
                    current = registry.open_embedded(&name, source)?;
                    ctx.enter_unit(registry.unit(current).name());
                }
                Some(Boundary::NoFile) => {
                    current = registry.open_placeholder(source);
                    implemented = true;
                    ctx.enter_unit(registry.unit(current).name());
                }
            }
        }

        registry.unit_mut(unit).set_loaded();
        let units = registry.source(source).units.clone();
        tracing::debug!(
            unit = %registry.unit(unit).name(),
            units = units.len(),
            lines = ctx.line_no,
            "Processed unit"
        );
        Ok(units)
    }
}
