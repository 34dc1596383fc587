// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Line translator - one LDraw line to zero or more records

use super::naming::{reference_key, split_fields};
use super::record::{PrimitiveKind, Record, SUBFILE_FIELDS};
use crate::error::{ConvertError, Result};
use std::collections::BTreeSet;

/// Face winding declared by `BFC` directives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Winding {
    #[default]
    Ccw,
    Cw,
}

/// Per-unit state that evolves while lines are translated in order
#[derive(Debug, Clone, Default)]
pub struct TranslationContext {
    /// Unit being translated, for diagnostics
    pub unit: String,
    pub winding: Winding,
    /// Set by `BFC INVERTNEXT`, cleared by the next sub-file reference
    pub invert_next: bool,
    /// Number of `STEP` markers seen
    pub step: usize,
    /// 1-based number of the line being translated
    pub line_no: usize,
}

impl TranslationContext {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            ..Self::default()
        }
    }

    pub fn reset(&mut self, unit: impl Into<String>) {
        *self = Self::new(unit);
    }

    /// Start a new unit within the same physical file; line numbering continues
    pub fn enter_unit(&mut self, unit: impl Into<String>) {
        let line_no = self.line_no;
        self.reset(unit);
        self.line_no = line_no;
    }
}

/// Dependency bookkeeping of one unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    pending: BTreeSet<String>,
    known: BTreeSet<String>,
}

impl Dependencies {
    /// Register a referenced unit key unless it is already known
    pub fn add(&mut self, key: &str) -> bool {
        if self.known.contains(key) {
            return false;
        }
        self.pending.insert(key.to_string())
    }

    /// Mark a pending key as resolved
    pub fn resolve(&mut self, key: &str) {
        self.pending.remove(key);
        self.known.insert(key.to_string());
    }

    pub fn pending(&self) -> &BTreeSet<String> {
        &self.pending
    }

    /// Every referenced key, pending or resolved
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.pending.iter().chain(self.known.iter())
    }

    pub fn is_resolved(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Structural marker closing the current unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    /// `0 FILE <name>`: an embedded sub-document starts
    File(String),
    /// `0 NOFILE`: the current sub-document ends
    NoFile,
}

/// Output of translating one line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translated {
    pub records: Vec<Record>,
    pub boundary: Option<Boundary>,
}

/// Translates LDraw lines into records
#[derive(Debug, Clone, Copy)]
pub struct LineTranslator {
    commented: bool,
}

impl LineTranslator {
    pub fn new(commented: bool) -> Self {
        Self { commented }
    }

    /// Translate one line, registering referenced parts in `deps`
    pub fn translate(
        &self,
        ctx: &mut TranslationContext,
        line: &str,
        deps: &mut Dependencies,
    ) -> Result<Translated> {
        ctx.line_no += 1;
        let stripped = line.trim_end();
        let mut out = Translated::default();
        if self.commented {
            out.records.push(Record::Comment(stripped.to_string()));
        }

        let params = split_fields(stripped, SUBFILE_FIELDS - 1);
        let Some(&code) = params.first() else {
            if !self.commented {
                out.records.push(Record::Blank);
            }
            return Ok(out);
        };

        match code {
            "0" => self.translate_meta(ctx, stripped, &params, &mut out)?,
            "1" => {
                check_fields(ctx, stripped, params.len(), SUBFILE_FIELDS)?;
                let reference = reference_key(params[SUBFILE_FIELDS - 1]);
                deps.add(&reference);
                ctx.invert_next = false;
                out.records.push(Record::SubFile {
                    fields: record_fields(&params[..SUBFILE_FIELDS - 1]),
                    reference,
                });
            }
            _ => match PrimitiveKind::from_code(code) {
                Some(kind) => {
                    check_fields(ctx, stripped, params.len(), kind.field_count())?;
                    out.records.push(Record::Primitive {
                        kind,
                        fields: record_fields(&params[..kind.field_count()]),
                    });
                }
                None => {
                    tracing::debug!(unit = %ctx.unit, line_no = ctx.line_no, code, "Ignoring unknown line type");
                }
            },
        }
        Ok(out)
    }

    fn translate_meta(
        &self,
        ctx: &mut TranslationContext,
        stripped: &str,
        params: &[&str],
        out: &mut Translated,
    ) -> Result<()> {
        match params.get(1).copied() {
            Some("BFC") => {
                for &directive in &params[2..] {
                    match directive {
                        "CW" => ctx.winding = Winding::Cw,
                        "CCW" => ctx.winding = Winding::Ccw,
                        "INVERTNEXT" => ctx.invert_next = true,
                        _ => {}
                    }
                    out.records.push(Record::Bfc(directive.to_string()));
                }
            }
            Some("STEP") => {
                ctx.step += 1;
                out.records.push(Record::Step);
            }
            Some("FILE") => {
                let fields = split_fields(stripped, 2);
                check_fields(ctx, stripped, fields.len(), 3)?;
                out.boundary = Some(Boundary::File(fields[2].to_string()));
            }
            Some("NOFILE") => out.boundary = Some(Boundary::NoFile),
            _ => {}
        }
        Ok(())
    }
}

impl Default for LineTranslator {
    fn default() -> Self {
        Self::new(true)
    }
}

fn check_fields(ctx: &TranslationContext, line: &str, found: usize, expected: usize) -> Result<()> {
    if found < expected {
        return Err(ConvertError::ArgumentCount {
            unit: ctx.unit.clone(),
            line_no: ctx.line_no,
            line: line.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Copy record fields, re-encoding a direct colour (`0x2RRGGBB`) as decimal
fn record_fields(params: &[&str]) -> Vec<String> {
    params
        .iter()
        .enumerate()
        .map(|(pos, field)| match (pos, field.strip_prefix("0x")) {
            (1, Some(hex)) if hex.starts_with('2') => match u32::from_str_radix(hex, 16) {
                Ok(value) => value.to_string(),
                Err(_) => {
                    tracing::warn!(colour = %field, "Malformed direct colour, kept verbatim");
                    field.to_string()
                }
            },
            _ => field.to_string(),
        })
        .collect()
}
