// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! LDraw colour table (`LDConfig.ldr`) loading and OpenSCAD lookup generation

use crate::error::{ConvertError, Result};
use ahash::AHashMap;
use std::path::Path;

/// Main colour table file name, without suffix
pub const MAIN_TABLE: &str = "LDConfig";
/// Alternate colour table file name, without suffix
pub const ALT_TABLE: &str = "LDCfgalt";

const VALUE_OPTIONS: [&str; 5] = ["CODE", "VALUE", "ALPHA", "LUMINANCE", "EDGE"];

/// Finish flags that carry no value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Finish {
    pub metal: bool,
    pub rubber: bool,
    pub pearlescent: bool,
    pub chrome: bool,
    pub matte_metallic: bool,
}

/// One `!COLOUR` definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorEntry {
    pub code: u32,
    pub name: String,
    /// Base colour, `#RRGGBB`
    pub value: String,
    /// Edge colour, `#RRGGBB` or a colour code
    pub edge: String,
    pub alpha: Option<u8>,
    pub luminance: Option<u8>,
    pub finish: Finish,
    /// Raw `MATERIAL` parameters
    pub material: Vec<String>,
}

impl ColorEntry {
    /// Base colour with alpha appended, `#RRGGBBAA`
    pub fn rgba(&self) -> String {
        format!("{}{:02X}", self.value, self.alpha.unwrap_or(255))
    }
}

/// Colour definitions of one table file, in file order
#[derive(Debug, Clone, Default)]
pub struct ColorTable {
    name: String,
    entries: Vec<ColorEntry>,
    by_code: AHashMap<u32, usize>,
}

impl ColorTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Read a table file; undecodable bytes are substituted
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ConvertError::io(path, e))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| MAIN_TABLE.to_string());
        Ok(Self::parse(name, &String::from_utf8_lossy(&bytes)))
    }

    /// Parse table text; malformed definitions are reported and skipped
    pub fn parse(name: impl Into<String>, source: &str) -> Self {
        let mut table = Self::new(name);
        for (line_no, line) in source.lines().enumerate() {
            let params: Vec<&str> = line.split_whitespace().collect();
            if params.len() < 2 || params[0] != "0" || params[1] != "!COLOUR" {
                continue;
            }
            if let Some(entry) = parse_colour(&table.name, line_no + 1, &params) {
                table.push(entry);
            }
        }
        table
    }

    fn push(&mut self, entry: ColorEntry) {
        if let Some(&pos) = self.by_code.get(&entry.code) {
            tracing::warn!(table = %self.name, code = entry.code, "Duplicate colour code, keeping the later one");
            self.entries[pos] = entry;
        } else {
            self.by_code.insert(entry.code, self.entries.len());
            self.entries.push(entry);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, code: u32) -> Option<&ColorEntry> {
        self.by_code.get(&code).map(|&pos| &self.entries[pos])
    }

    pub fn entries(&self) -> &[ColorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// OpenSCAD function `ldraw_color_<name>(id)` mapping codes to `[rgba, edge]`
    pub fn to_scad(&self) -> String {
        let mut lines = Vec::with_capacity(self.entries.len() + 2);
        lines.push(format!("function ldraw_color_{}(id) = (", self.name));
        for entry in &self.entries {
            lines.push(format!(
                "(id=={}) ? [\"{}\",\"{}\"] : (",
                entry.code,
                entry.rgba(),
                entry.edge
            ));
        }
        // Direct colours (0x2RRGGBB) decode to their hex value and its complement.
        lines.push(format!(
            "(id>=2*16^6) ? [chr(35, [for (i=[5:-1:0])let(n=floor(id/16^i)%16) n+(n<10?48:55)]),\
             chr(35, [for (i=[5:-1:0])let(n=15-floor(id/16^i)%16) n+(n<10?48:55)])] :\
             \"UNKNOWN\"{};",
            ")".repeat(lines.len())
        ));
        lines.join("\n") + "\n"
    }
}

fn parse_colour(table: &str, line_no: usize, params: &[&str]) -> Option<ColorEntry> {
    let Some(name) = params.get(2) else {
        tracing::warn!(table, line_no, "!COLOUR line with no data");
        return None;
    };

    let mut values: AHashMap<&str, &str> = AHashMap::new();
    let mut finish = Finish::default();
    let mut material = Vec::new();
    let mut options = params[3..].iter().copied();
    while let Some(option) = options.next() {
        match option {
            opt if VALUE_OPTIONS.contains(&opt) => match options.next() {
                Some(value) => {
                    values.insert(opt, value);
                }
                None => tracing::warn!(table, line_no, option = opt, "!COLOUR option without value"),
            },
            "METAL" => finish.metal = true,
            "RUBBER" => finish.rubber = true,
            "PEARLESCENT" => finish.pearlescent = true,
            "CHROME" => finish.chrome = true,
            "MATTE_METALLIC" => finish.matte_metallic = true,
            "MATERIAL" => {
                material = options.by_ref().map(str::to_string).collect();
            }
            other => tracing::warn!(table, line_no, option = other, "Unknown !COLOUR option"),
        }
    }

    let required = |key: &str| {
        let value = values.get(key).map(|v| v.to_string());
        if value.is_none() {
            tracing::warn!(table, line_no, colour = %name, attribute = key, "!COLOUR definition missing attribute, skipped");
        }
        value
    };
    let code = required("CODE")?;
    let value = required("VALUE")?;
    let edge = required("EDGE")?;
    let Ok(code) = code.parse::<u32>() else {
        tracing::warn!(table, line_no, colour = %name, code = %code, "!COLOUR code is not a number, skipped");
        return None;
    };

    Some(ColorEntry {
        code,
        name: name.to_string(),
        value,
        edge,
        alpha: byte_option(table, line_no, &values, "ALPHA"),
        luminance: byte_option(table, line_no, &values, "LUMINANCE"),
        finish,
        material,
    })
}

fn byte_option(table: &str, line_no: usize, values: &AHashMap<&str, &str>, key: &str) -> Option<u8> {
    let raw = values.get(key)?;
    match raw.parse::<u8>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(table, line_no, attribute = key, value = %raw, "!COLOUR attribute out of range, ignored");
            None
        }
    }
}

/// Colour declarations for a library root: the dispatching `ldraw_color`
/// function followed by the main and alternate tables
pub fn color_declarations(library_root: &Path) -> Result<String> {
    let main = ColorTable::load(library_root.join(format!("{MAIN_TABLE}.ldr")))?;
    let alt_path = library_root.join(format!("{ALT_TABLE}.ldr"));

    let mut text = format!(
        "function ldraw_color(id, alt=false) = alt ? ldraw_color_{ALT_TABLE}(id) : ldraw_color_{MAIN_TABLE}(id);\n"
    );
    text.push_str(&main.to_scad());
    if alt_path.is_file() {
        text.push_str(&ColorTable::load(&alt_path)?.to_scad());
    } else {
        tracing::warn!(path = %alt_path.display(), "Alternate colour table missing, using the main table");
        text.push_str(&format!(
            "function ldraw_color_{ALT_TABLE}(id) = ldraw_color_{MAIN_TABLE}(id);\n"
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
0 LDraw.org Configuration File
0 !COLOUR Black CODE 0 VALUE #1B2A34 EDGE #2B4354
0 !COLOUR Trans_Clear CODE 47 VALUE #FCFCFC EDGE #C3C3C3 ALPHA 128
0 !COLOUR Chrome_Gold CODE 334 VALUE #BBA53D EDGE #BBB23D CHROME
0 !COLOUR Glitter CODE 117 VALUE #FFFFFF EDGE #C3C3C3 ALPHA 128 MATERIAL GLITTER VALUE #FFFFFF FRACTION 0.08 SIZE 1
0 !COLOUR Broken VALUE #000000 EDGE #000000
0 !COLOUR Odd CODE 5 VALUE #FF00FF EDGE #000000 SPARKLY
";

    #[test]
    fn test_parses_definitions() {
        let table = ColorTable::parse("LDConfig", SAMPLE);
        assert_eq!(table.len(), 5);

        let black = table.get(0).unwrap();
        assert_eq!(black.name, "Black");
        assert_eq!(black.rgba(), "#1B2A34FF");
        assert_eq!(black.edge, "#2B4354");

        assert_eq!(table.get(47).unwrap().rgba(), "#FCFCFC80");
        assert!(table.get(334).unwrap().finish.chrome);
    }

    #[test]
    fn test_material_consumes_remaining_tokens() {
        let table = ColorTable::parse("LDConfig", SAMPLE);
        let glitter = table.get(117).unwrap();
        assert_eq!(glitter.alpha, Some(128));
        assert_eq!(glitter.material.first().map(String::as_str), Some("GLITTER"));
        assert_eq!(glitter.material.len(), 7);
    }

    #[test]
    fn test_unknown_option_is_not_fatal() {
        let table = ColorTable::parse("LDConfig", SAMPLE);
        assert_eq!(table.get(5).unwrap().value, "#FF00FF");
    }

    #[test]
    fn test_missing_code_is_skipped() {
        let table = ColorTable::parse("LDConfig", SAMPLE);
        assert!(table.entries().iter().all(|e| e.name != "Broken"));
    }

    #[test]
    fn test_no_data_line_is_skipped() {
        let table = ColorTable::parse("LDConfig", "0 !COLOUR\n");
        assert!(table.is_empty());
    }

    #[test]
    fn test_scad_lookup_function() {
        let table = ColorTable::parse(
            "LDConfig",
            "0 !COLOUR Black CODE 0 VALUE #1B2A34 EDGE #2B4354\n0 !COLOUR Blue CODE 1 VALUE #1E5AA8 EDGE #333333\n",
        );
        let scad = table.to_scad();
        let lines: Vec<&str> = scad.lines().collect();
        assert_eq!(lines[0], "function ldraw_color_LDConfig(id) = (");
        assert_eq!(lines[1], "(id==0) ? [\"#1B2A34FF\",\"#2B4354\"] : (");
        assert_eq!(lines[2], "(id==1) ? [\"#1E5AA8FF\",\"#333333\"] : (");
        assert!(lines[3].starts_with("(id>=2*16^6) ? [chr(35"));
        assert!(lines[3].ends_with("\"UNKNOWN\")));"));
    }

    #[test]
    fn test_declarations_without_alt_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("LDConfig.ldr"),
            "0 !COLOUR Black CODE 0 VALUE #1B2A34 EDGE #2B4354\n",
        )
        .unwrap();

        let text = color_declarations(dir.path()).unwrap();
        assert!(text.starts_with("function ldraw_color(id, alt=false)"));
        assert!(text.contains("function ldraw_color_LDConfig(id) = ("));
        assert!(text.contains("function ldraw_color_LDCfgalt(id) = ldraw_color_LDConfig(id);"));
    }

    #[test]
    fn test_declarations_require_main_table() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(color_declarations(dir.path()), Err(ConvertError::Io { .. })));
    }
}
