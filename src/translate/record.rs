// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Translated records and their OpenSCAD rendering
//!
//! Records keep coordinates as the source text; they are never evaluated.

use super::naming::function_name;
use std::fmt;

/// Geometric record types that carry no dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Line,
    Triangle,
    Quad,
    OptionalLine,
}

impl PrimitiveKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "2" => Some(Self::Line),
            "3" => Some(Self::Triangle),
            "4" => Some(Self::Quad),
            "5" => Some(Self::OptionalLine),
            _ => None,
        }
    }

    /// Fields including the command code: code, colour, then 3 per point
    pub fn field_count(self) -> usize {
        2 + 3 * self.points()
    }

    pub fn points(self) -> usize {
        match self {
            Self::Line => 2,
            Self::Triangle => 3,
            Self::Quad | Self::OptionalLine => 4,
        }
    }
}

/// Number of fields of a sub-file reference: code, colour, position, matrix, file
pub const SUBFILE_FIELDS: usize = 15;

/// One translated statement inside a unit definition
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Verbatim echo of a source line
    Comment(String),
    /// Empty source line with comments disabled
    Blank,
    /// One back-face culling directive token
    Bfc(String),
    Step,
    /// Placement of another unit: code, colour, 3 position and 9 matrix fields
    SubFile { fields: Vec<String>, reference: String },
    Primitive { kind: PrimitiveKind, fields: Vec<String> },
}

impl Record {
    /// Referenced unit key, for sub-file records
    pub fn reference(&self) -> Option<&str> {
        match self {
            Record::SubFile { reference, .. } => Some(reference.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Comment(text) => write!(f, "// {text}"),
            Record::Blank => Ok(()),
            Record::Bfc(directive) => write!(f, "  [0,\"BFC\",\"{directive}\"],"),
            Record::Step => write!(f, "  [0,\"STEP\"],"),
            Record::SubFile { fields, reference } => {
                write!(f, "  [{}, {}()],", fields.join(","), function_name(reference))
            }
            Record::Primitive { fields, .. } => write!(f, "  [{}],", fields.join(",")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_field_counts() {
        assert_eq!(PrimitiveKind::Line.field_count(), 8);
        assert_eq!(PrimitiveKind::Triangle.field_count(), 11);
        assert_eq!(PrimitiveKind::Quad.field_count(), 14);
        assert_eq!(PrimitiveKind::OptionalLine.field_count(), 14);
        assert_eq!(PrimitiveKind::from_code("6"), None);
    }

    #[test]
    fn test_render_markers() {
        assert_eq!(Record::Bfc("CW".into()).to_string(), "  [0,\"BFC\",\"CW\"],");
        assert_eq!(Record::Step.to_string(), "  [0,\"STEP\"],");
        assert_eq!(Record::Comment("0 Stud".into()).to_string(), "// 0 Stud");
        assert_eq!(Record::Comment(String::new()).to_string(), "// ");
        assert_eq!(Record::Blank.to_string(), "");
    }

    #[test]
    fn test_render_subfile_reference() {
        let record = Record::SubFile {
            fields: strings(&["1", "16", "0", "0", "0", "1", "0", "0", "0", "1", "0", "0", "0", "1"]),
            reference: "s\\3001s01.dat".into(),
        };
        assert_eq!(record.reference(), Some("s\\3001s01.dat"));
        assert_eq!(record.to_string(), "  [1,16,0,0,0,1,0,0,0,1,0,0,0,1, ldraw_lib__s__3001s01()],");
    }

    #[test]
    fn test_render_primitive() {
        let record = Record::Primitive {
            kind: PrimitiveKind::Line,
            fields: strings(&["2", "24", "40", "96", "-20", "-40", "96", "-20"]),
        };
        assert_eq!(record.reference(), None);
        assert_eq!(record.to_string(), "  [2,24,40,96,-20,-40,96,-20],");
    }
}
