// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! LDraw library access - part index and colour tables

mod colors;
mod index;

pub use colors::{color_declarations, ColorEntry, ColorTable, Finish, ALT_TABLE, MAIN_TABLE};
pub use index::{LibraryIndex, PartLocation, PART_SUFFIX, PREFIX_SEPARATOR};
