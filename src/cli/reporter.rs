// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use colored::*;
use std::path::Path;
use std::time::Duration;

/// CLI reporter for operator-facing messages
pub struct Reporter;

impl Reporter {
    /// Announce a file translation
    pub fn report_translation(input: &Path, output: &Path) {
        println!(
            "{} {} {} {}...",
            "Translating".bold(),
            input.display().to_string().cyan(),
            "to".bright_black(),
            output.display().to_string().cyan()
        );
    }

    /// Report the end of a run
    pub fn report_summary(what: &str, count: usize, duration: Duration) {
        println!(
            "{} {} {} in {}",
            "✅".green(),
            count.to_string().cyan(),
            what.green(),
            Self::format_duration(duration).yellow()
        );
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    /// Report info
    pub fn report_info(message: &str) {
        println!("{} {}", "ℹ️".bright_blue(), message);
    }

    fn format_duration(duration: Duration) -> String {
        let micros = duration.as_micros();

        if micros < 1_000 {
            format!("{}µs", micros)
        } else if micros < 1_000_000 {
            format!("{:.2}ms", micros as f64 / 1_000.0)
        } else {
            format!("{:.2}s", micros as f64 / 1_000_000.0)
        }
    }
}
