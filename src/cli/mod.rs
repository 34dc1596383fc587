// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI support for the ldraw-to-scad binary

pub mod reporter;

pub use reporter::Reporter;
