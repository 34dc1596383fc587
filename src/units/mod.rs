// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Units of translation and their dependency-ordered processing

mod processor;
mod registry;
mod scheduler;

pub use processor::UnitProcessor;
pub use registry::{Source, SourceId, Unit, UnitId, UnitKind, UnitRegistry, UnitState, MAIN_UNIT};
pub use scheduler::{FsReader, Scheduler, SourceReader};
