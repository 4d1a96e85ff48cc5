//! Error types for expression compilation and signature loading.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// What went wrong while compiling an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("empty expression")]
    EmptyExpression,

    #[error("expression contains only gaps")]
    NoFragments,

    #[error("invalid hex byte")]
    InvalidHex,

    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),

    #[error("unbalanced '{0}'")]
    Unbalanced(char),

    #[error("unterminated string")]
    UnterminatedString,

    #[error("empty byte class")]
    EmptyClass,

    #[error("empty alternative")]
    EmptyAlternative,

    #[error("alternatives cannot be nested")]
    NestedAlternatives,

    #[error("gaps are not allowed inside alternatives")]
    GapInAlternatives,

    #[error("invalid gap: {0}")]
    InvalidGap(String),

    #[error("a {0} sequence cannot have a gap at this end")]
    EdgeGap(String),

    #[error("anchor '{0}' is not recognised; must be bofoffset, eofoffset or variable")]
    UnknownAnchor(String),

    #[error("cannot be expressed in {0} syntax")]
    Inexpressible(&'static str),

    #[error("invalid ByteSequence XML: {0}")]
    Xml(String),
}

/// A grammar violation, with the offending text and its character position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub position: usize,
    pub fragment: String,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, position: usize, fragment: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            fragment: fragment.into(),
        }
    }

    pub fn unknown_anchor(keyword: &str) -> Self {
        Self::new(
            CompileErrorKind::UnknownAnchor(keyword.to_string()),
            0,
            keyword,
        )
    }

    pub fn xml(message: impl Into<String>) -> Self {
        Self::new(CompileErrorKind::Xml(message.into()), 0, "")
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fragment.is_empty() {
            write!(f, "{} at position {}", self.kind, self.position)
        } else {
            write!(
                f,
                "{} at position {}: '{}'",
                self.kind, self.position, self.fragment
            )
        }
    }
}

impl std::error::Error for CompileError {}

pub type Result<T> = std::result::Result<T, CompileError>;

/// A signature catalogue that cannot be turned into an engine.
#[derive(Debug, Error)]
pub enum SignatureLoadError {
    #[error("failed to read signature file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed signature file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unrecognised signature file type")]
    UnknownFileType,

    #[error("signature {signature}: {source}")]
    InvalidSequence {
        signature: u32,
        #[source]
        source: CompileError,
    },

    #[error("signature {0} has no byte sequences")]
    EmptySignature(u32),

    #[error("duplicate signature id {0}")]
    DuplicateSignature(u32),

    #[error("duplicate format {0}")]
    DuplicateFormat(String),

    #[error("{owner} references unknown format {puid}")]
    UnknownFormat { owner: String, puid: String },

    #[error("priority cycle between formats: {}", .0.join(" > "))]
    PriorityCycle(Vec<String>),

    #[error("container signature {0} lists no files")]
    EmptyContainerSignature(u32),

    #[error("format mapping references unknown container signature {0}")]
    UnknownContainerSignature(u32),
}
