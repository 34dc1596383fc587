// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! LDraw line translation
//!
//! Turns LDraw source lines into OpenSCAD records while collecting the
//! part references each unit depends on.

mod line;
mod naming;
mod record;

pub use line::{Boundary, Dependencies, LineTranslator, Translated, TranslationContext, Winding};
pub use naming::{function_name, reference_key, split_fields, IDENT_PREFIX};
pub use record::{PrimitiveKind, Record, SUBFILE_FIELDS};
