//! Serialization of compiled sequences back to expression text.

use crate::signature::anchor::Anchor;
use crate::signature::error::{CompileError, CompileErrorKind, Result};
use crate::signature::sequence::{ByteClass, ByteSequence, Gap, Token};
use serde::{Deserialize, Serialize};

/// Output dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Syntax {
    /// Compact PRONOM binary signature syntax: hex, `??`, ranges and alternatives.
    Binary,
    /// Container registry syntax: adds quoted strings and multi-item sets.
    #[default]
    Container,
}

impl Syntax {
    fn name(&self) -> &'static str {
        match self {
            Syntax::Binary => "binary",
            Syntax::Container => "container",
        }
    }
}

/// Render a sequence as an expression. Output is deterministic for a given model and
/// flags; recompiling it against the same anchor yields an equal model.
///
/// Fails only for binary syntax, when a set that is not a single (possibly negated)
/// range sits inside an alternatives group.
pub fn serialize(sequence: &ByteSequence, syntax: Syntax, spaces: bool) -> Result<String> {
    let mut out = Elements::new(spaces);
    let subs = sequence.subsequences();
    match sequence.anchor() {
        Anchor::Bof | Anchor::Variable => {
            for (i, sub) in subs.iter().enumerate() {
                let implicit = match (i, sequence.anchor()) {
                    (0, Anchor::Bof) => sub.gap.is_zero(),
                    (0, _) => sub.gap == Gap::ANY,
                    _ => false,
                };
                if !implicit {
                    out.push(gap_text(&sub.gap));
                }
                write_tokens(&mut out, &sub.tokens, syntax, false)?;
            }
        }
        Anchor::Eof => {
            for (i, sub) in subs.iter().enumerate() {
                write_tokens(&mut out, &sub.tokens, syntax, false)?;
                if !(i + 1 == subs.len() && sub.gap.is_zero()) {
                    out.push(gap_text(&sub.gap));
                }
            }
        }
    }
    Ok(out.finish())
}

/// Render a single fragment in compact container syntax.
pub fn serialize_fragment(tokens: &[Token]) -> String {
    let mut out = Elements::new(false);
    // Container syntax can express every token.
    let _ = write_tokens(&mut out, tokens, Syntax::Container, false);
    out.finish()
}

pub fn gap_text(gap: &Gap) -> String {
    match gap.max {
        Some(max) if max == gap.min => format!("{{{}}}", gap.min),
        Some(max) => format!("{{{}-{}}}", gap.min, max),
        None if gap.min == 0 => "*".to_string(),
        None => format!("{{{}-*}}", gap.min),
    }
}

struct Elements {
    spaces: bool,
    parts: Vec<String>,
}

impl Elements {
    fn new(spaces: bool) -> Self {
        Self {
            spaces,
            parts: Vec::new(),
        }
    }

    fn push(&mut self, part: String) {
        self.parts.push(part);
    }

    fn finish(self) -> String {
        self.parts.join(if self.spaces { " " } else { "" })
    }
}

fn write_tokens(out: &mut Elements, tokens: &[Token], syntax: Syntax, in_option: bool) -> Result<()> {
    let mut i = 0;
    while i < tokens.len() {
        if syntax == Syntax::Container {
            let run = printable_run(&tokens[i..]);
            if run.len() >= 3 {
                i += run.len();
                out.push(format!("'{}'", run));
                continue;
            }
        }
        match &tokens[i] {
            Token::Byte(b) => out.push(fmt_hex(*b)),
            Token::Any => out.push("??".to_string()),
            Token::Class(class) => out.push(class_text(class, syntax, in_option)?),
            Token::Alternatives(_) if in_option => {
                return Err(CompileError::new(CompileErrorKind::NestedAlternatives, 0, ""))
            }
            Token::Alternatives(options) => {
                let mut rendered = Vec::with_capacity(options.len());
                for option in options {
                    let mut inner = Elements::new(out.spaces);
                    write_tokens(&mut inner, option, syntax, true)?;
                    rendered.push(inner.finish());
                }
                out.push(format!("({})", rendered.join("|")));
            }
        }
        i += 1;
    }
    Ok(())
}

/// Leading run of printable ASCII bytes that can sit inside a quoted string.
fn printable_run(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map_while(|t| match t {
            Token::Byte(b) if (0x20..=0x7E).contains(b) && *b != b'\'' => Some(*b as char),
            _ => None,
        })
        .collect()
}

fn range_text(lo: u8, hi: u8) -> String {
    if lo == hi {
        fmt_hex(lo)
    } else {
        format!("{}:{}", fmt_hex(lo), fmt_hex(hi))
    }
}

fn class_text(class: &ByteClass, syntax: Syntax, in_option: bool) -> Result<String> {
    let ranges = class.ranges();
    let inverse = class.complement().ranges();
    match syntax {
        Syntax::Binary => {
            if let [(lo, hi)] = ranges.as_slice() {
                return Ok(format!("[{}:{}]", fmt_hex(*lo), fmt_hex(*hi)));
            }
            if let [(lo, hi)] = inverse.as_slice() {
                return Ok(format!("[!{}]", range_text(*lo, *hi)));
            }
            if in_option {
                return Err(CompileError::new(
                    CompileErrorKind::Inexpressible(syntax.name()),
                    0,
                    format!("{:?}", class),
                ));
            }
            let members: Vec<String> = class.iter().map(fmt_hex).collect();
            Ok(format!("({})", members.join("|")))
        }
        Syntax::Container => {
            let (negated, items) = if inverse.len() < ranges.len() {
                (true, inverse)
            } else {
                (false, ranges)
            };
            let body: Vec<String> = items.iter().map(|(lo, hi)| range_text(*lo, *hi)).collect();
            Ok(format!(
                "[{}{}]",
                if negated { "!" } else { "" },
                body.join(" ")
            ))
        }
    }
}

fn fmt_hex(b: u8) -> String {
    hex::encode_upper([b])
}
