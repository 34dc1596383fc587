// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! ldraw-to-scad CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use ldraw_scad::cli::Reporter;
use ldraw_scad::converter::default_output;
use ldraw_scad::{Converter, Settings};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ldraw-to-scad")]
#[command(about = "Convert an LDraw part, model or library to OpenSCAD", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Source file or model directory to translate
    #[arg(value_name = "FILENAME", conflicts_with = "translib")]
    input: Option<PathBuf>,

    /// Name of the translated file (or directory)
    #[arg(value_name = "OUTPUT_FILENAME")]
    output: Option<PathBuf>,

    /// Translate the library
    #[arg(short, long)]
    translib: bool,

    #[command(flatten)]
    options: Options,
}

#[derive(clap::Args)]
struct Options {
    /// Create self-contained files
    #[arg(short, long = "selfcontained", global = true)]
    self_contained: bool,

    /// Create uncommented files
    #[arg(short, long, global = true)]
    uncommented: bool,

    /// Location of the LDraw parts library
    #[arg(short, long, value_name = "LIB_DIR", global = true)]
    lib: Option<PathBuf>,

    /// Location of the OpenSCAD libraries
    #[arg(short = 'o', long = "openscadlibs", value_name = "OPENSCAD_LIB_DIR", global = true)]
    scad_libs: Option<PathBuf>,

    /// Name of the OpenSCAD library
    #[arg(short = 'n', long = "libname", value_name = "LIB_NAME", global = true)]
    lib_name: Option<String>,

    /// Width of lines, 0 for no lines
    #[arg(long, value_name = "LINE_WIDTH", global = true)]
    line: Option<f64>,

    /// Settings file (defaults to ./ldraw-scad.toml when present)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a file's parts and print the unit graph as JSON
    Deps {
        /// Source file
        input: PathBuf,

        /// Output JSON file
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

impl Options {
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::load()?,
        };
        if let Some(lib) = &self.lib {
            settings.library_root = lib.clone();
        }
        if let Some(libs) = &self.scad_libs {
            settings.scad_libs = libs.clone();
        }
        if let Some(name) = &self.lib_name {
            settings.lib_name = name.clone();
        }
        if let Some(line) = self.line {
            settings.line = line;
        }
        if self.uncommented {
            settings.commented = false;
        }
        if self.self_contained {
            settings.self_contained = true;
        }
        Ok(settings)
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.options.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(&cli) {
        Reporter::report_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = cli.options.settings()?;
    let verbose = cli.options.verbose;

    match &cli.command {
        Some(Commands::Deps { input, json }) => deps_command(settings, input, json.as_deref()),
        None if cli.translib => translib_command(settings, verbose),
        None => match &cli.input {
            Some(input) if input.is_dir() => {
                let dest = cli.output.clone().unwrap_or_else(|| input.clone());
                dir_command(settings, input, &dest)
            }
            Some(input) => {
                let output = cli.output.clone().unwrap_or_else(|| default_output(input));
                file_command(settings, input, &output)
            }
            None => {
                Reporter::report_error("a FILENAME or --translib is required");
                std::process::exit(2);
            }
        },
    }
}

fn translib_command(settings: Settings, verbose: bool) -> Result<()> {
    Reporter::report_info("Translating library...");
    let start = Instant::now();
    let converter = Converter::new(settings)?.show_progress(verbose);
    let written = converter.convert_lib()?;
    Reporter::report_summary("library files written", written, start.elapsed());
    Ok(())
}

fn file_command(settings: Settings, input: &Path, output: &Path) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    Reporter::report_translation(input, output);
    Converter::new(settings)?.convert_file(input, output)
}

fn dir_command(settings: Settings, src: &Path, dest: &Path) -> Result<()> {
    let start = Instant::now();
    let converter = Converter::new(settings)?;
    let plan = converter.convert_dir(src, dest, |job| Reporter::report_translation(&job.input, &job.output))?;
    Reporter::report_summary("models translated", plan.jobs.len(), start.elapsed());
    Ok(())
}

fn deps_command(settings: Settings, input: &Path, json: Option<&Path>) -> Result<()> {
    let report = Converter::new(settings)?.dependency_report(input)?;
    let text = report.to_json()?;

    match json {
        Some(path) => {
            std::fs::write(path, text)?;
            Reporter::report_info(&format!("Dependency report written to: {}", path.display()));
        }
        None => println!("{}", text),
    }
    Ok(())
}
