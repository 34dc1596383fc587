// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Names: canonical OpenSCAD identifiers, unit reference keys, field splitting

/// Prefix shared by every generated part function and module
pub const IDENT_PREFIX: &str = "ldraw_lib__";

/// Canonical OpenSCAD identifier for an LDraw file or unit name.
///
/// The name is lower-cased and cut at its first `.`; path separators become
/// `__` and every other character outside `[a-z0-9_]` becomes `_`.
pub fn function_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let stem = lower.split('.').next().unwrap_or_default();

    let mut ident = String::with_capacity(IDENT_PREFIX.len() + stem.len() + 4);
    ident.push_str(IDENT_PREFIX);
    for c in stem.chars() {
        match c {
            '\\' | '/' => ident.push_str("__"),
            'a'..='z' | '0'..='9' | '_' => ident.push(c),
            _ => ident.push('_'),
        }
    }
    ident
}

/// Registry key for a referenced file: lower-cased, `\`-separated
pub fn reference_key(name: &str) -> String {
    name.trim().replace('/', "\\").to_lowercase()
}

/// Split on whitespace at most `max_splits` times; the last field keeps the
/// rest of the line with its inner spacing.
pub fn split_fields(line: &str, max_splits: usize) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut rest = line.trim_start();
    while !rest.is_empty() {
        if fields.len() == max_splits {
            fields.push(rest.trim_end());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_names_are_identifiers() {
        let cases = [
            ("stud.dat", "ldraw_lib__stud"),
            ("s\\stuff.dat", "ldraw_lib__s__stuff"),
            ("4744.dat", "ldraw_lib__4744"),
            ("2-4cyli.dat", "ldraw_lib__2_4cyli"),
            ("__main__", "ldraw_lib____main__"),
            ("DUMMY_1", "ldraw_lib__dummy_1"),
            ("My Car+Trailer #2.ldr", "ldraw_lib__my_car_trailer__2"),
            ("48/1-4edge.dat", "ldraw_lib__48__1_4edge"),
        ];
        for (name, expected) in cases {
            assert_eq!(function_name(name), expected, "name: {name}");
        }
    }

    #[test]
    fn test_function_name_is_deterministic_and_clean() {
        for name in ["a b-c.dat", "S\\X-Y Z.DAT", "p/8/4-4disc.dat"] {
            let ident = function_name(name);
            assert_eq!(ident, function_name(name));
            assert!(ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'), "{ident}");
        }
    }

    #[test]
    fn test_reference_key_normalizes() {
        assert_eq!(reference_key("S/3001S01.DAT"), "s\\3001s01.dat");
        assert_eq!(reference_key("mdr_inner.ldr"), "mdr_inner.ldr");
    }

    #[test]
    fn test_split_fields_keeps_tail() {
        let fields = split_fields("1 16 0 0 0 1 0 0 0 1 0 0 0 1 my part.dat  ", 14);
        assert_eq!(fields.len(), 15);
        assert_eq!(fields[14], "my part.dat");

        assert_eq!(split_fields("  4 16  1 1 ", 14), vec!["4", "16", "1", "1"]);
        assert!(split_fields("   ", 14).is_empty());
        assert_eq!(split_fields("0 FILE a  b.ldr", 2), vec!["0", "FILE", "a  b.ldr"]);
    }
}
