//! Anchor points for byte sequences.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a byte sequence is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    /// Matched left-to-right from the beginning of the source.
    #[serde(rename = "BOFoffset")]
    Bof,
    /// Matched right-to-left from the end of the source.
    #[serde(rename = "EOFoffset")]
    Eof,
    /// May start at any offset.
    #[serde(rename = "Variable")]
    Variable,
}

impl Anchor {
    /// The registry keyword for this anchor.
    pub fn keyword(&self) -> &'static str {
        match self {
            Anchor::Bof => "BOFoffset",
            Anchor::Eof => "EOFoffset",
            Anchor::Variable => "Variable",
        }
    }

    /// Parse an anchor keyword, case-insensitively.
    pub fn from_keyword(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "bofoffset" | "bof" => Some(Anchor::Bof),
            "eofoffset" | "eof" => Some(Anchor::Eof),
            "variable" | "var" => Some(Anchor::Variable),
            _ => None,
        }
    }

    /// True when matching runs from the end of the source.
    pub fn is_reversed(&self) -> bool {
        matches!(self, Anchor::Eof)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Anchor::from_keyword(s).ok_or_else(|| {
            format!(
                "anchor '{}' is not recognised; must be bofoffset, eofoffset or variable",
                s
            )
        })
    }
}
