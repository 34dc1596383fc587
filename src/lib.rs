// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! LDraw to OpenSCAD translator
//!
//! Indexes an LDraw parts library, translates parts and models line by line
//! into OpenSCAD list functions, and emits every referenced part exactly once
//! in dependency order.

pub mod cli;
pub mod config;
pub mod converter;
pub mod emit;
pub mod error;
pub mod library;
pub mod translate;
pub mod units;

pub use config::Settings;
pub use converter::{Converter, DependencyReport, DirJob, DirPlan};
pub use emit::{EmitOptions, ScadEmitter};
pub use error::{ConvertError, Result};
pub use library::{ColorTable, LibraryIndex, PartLocation};
pub use translate::{function_name, reference_key, LineTranslator, Record};
pub use units::{Scheduler, UnitId, UnitProcessor, UnitRegistry, MAIN_UNIT};
