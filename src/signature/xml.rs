//! XML form of a compiled sequence, as used in signature files.
//!
//! ```xml
//! <ByteSequence Reference="BOFoffset">
//!   <SubSequence Position="1" SubSeqMinOffset="0" SubSeqMaxOffset="0">
//!     <Sequence>'%PDF-'</Sequence>
//!   </SubSequence>
//! </ByteSequence>
//! ```
//!
//! `SubSeqMinOffset`/`SubSeqMaxOffset` carry each fragment's gap; a missing maximum
//! means unbounded. A missing `Reference` means a variable-offset sequence.

use crate::signature::anchor::Anchor;
use crate::signature::compiler::compile_fragment;
use crate::signature::error::{CompileError, CompileErrorKind, Result};
use crate::signature::sequence::{ByteSequence, Gap, SubSequence, Token};
use crate::signature::serializer::serialize_fragment;
use quick_xml::escape::{escape, partial_escape, resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt::Write as _;

/// Single-line XML.
pub fn to_xml(sequence: &ByteSequence) -> String {
    render(sequence, false)
}

/// Indented XML, one element per line.
pub fn to_xml_pretty(sequence: &ByteSequence) -> String {
    render(sequence, true)
}

fn render(sequence: &ByteSequence, pretty: bool) -> String {
    let (nl, ind1, ind2) = if pretty { ("\n", "  ", "    ") } else { ("", "", "") };
    let mut out = String::new();
    let _ = write!(
        out,
        "<ByteSequence Reference=\"{}\"",
        sequence.anchor().keyword()
    );
    if let Some(tag) = sequence.tag() {
        let _ = write!(out, " Tag=\"{}\"", escape(tag));
    }
    out.push('>');
    out.push_str(nl);
    for (i, sub) in sequence.subsequences().iter().enumerate() {
        let _ = write!(
            out,
            "{}<SubSequence Position=\"{}\" SubSeqMinOffset=\"{}\"",
            ind1,
            i + 1,
            sub.gap.min
        );
        if let Some(max) = sub.gap.max {
            let _ = write!(out, " SubSeqMaxOffset=\"{}\"", max);
        }
        out.push('>');
        out.push_str(nl);
        let _ = write!(
            out,
            "{}<Sequence>{}</Sequence>{}",
            ind2,
            partial_escape(&serialize_fragment(&sub.tokens)),
            nl
        );
        let _ = write!(out, "{}</SubSequence>{}", ind1, nl);
    }
    out.push_str("</ByteSequence>");
    out
}

#[derive(Default)]
struct PendingSubSequence {
    position: u64,
    gap: Gap,
    text: Option<String>,
}

/// Parse a `<ByteSequence>` element.
pub fn from_xml(xml: &str) -> Result<ByteSequence> {
    // Text is not trimmed: spaces next to an entity reference belong to the sequence.
    let mut reader = Reader::from_str(xml);

    let mut anchor: Option<Anchor> = None;
    let mut tag: Option<String> = None;
    let mut seen_root = false;
    let mut current: Option<PendingSubSequence> = None;
    let mut in_sequence = false;
    let mut parsed: Vec<(u64, SubSequence)> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match e.name().as_ref() {
                    b"ByteSequence" => {
                        seen_root = true;
                        for (key, value) in attributes(e)? {
                            match key.as_str() {
                                "Reference" => {
                                    anchor = Some(
                                        Anchor::from_keyword(&value)
                                            .ok_or_else(|| CompileError::unknown_anchor(&value))?,
                                    )
                                }
                                "Tag" => tag = Some(value),
                                _ => {}
                            }
                        }
                    }
                    b"SubSequence" => {
                        let mut pending = PendingSubSequence {
                            position: parsed.len() as u64 + 1,
                            gap: Gap::ANY,
                            text: None,
                        };
                        for (key, value) in attributes(e)? {
                            match key.as_str() {
                                "Position" => pending.position = number(&key, &value)?,
                                "SubSeqMinOffset" => pending.gap.min = number(&key, &value)?,
                                "SubSeqMaxOffset" => {
                                    pending.gap.max = Some(number(&key, &value)?)
                                }
                                _ => {}
                            }
                        }
                        if let Some(max) = pending.gap.max {
                            if max < pending.gap.min {
                                return Err(CompileError::new(
                                    CompileErrorKind::InvalidGap(format!(
                                        "maximum {} is less than minimum {}",
                                        max, pending.gap.min
                                    )),
                                    0,
                                    "",
                                ));
                            }
                        }
                        current = Some(pending);
                    }
                    b"Sequence" => in_sequence = matches!(current, Some(_)),
                    _ => {}
                }
            }
            Ok(Event::Text(t)) if in_sequence => {
                let raw = String::from_utf8(t.to_vec())
                    .map_err(|_| CompileError::xml("sequence text is not UTF-8"))?;
                let text = unescape(&raw)
                    .map_err(|e| CompileError::xml(e.to_string()))?
                    .into_owned();
                if let Some(pending) = current.as_mut() {
                    pending.text.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Ok(Event::GeneralRef(r)) if in_sequence => {
                let char_ref = r
                    .resolve_char_ref()
                    .map_err(|e| CompileError::xml(e.to_string()))?;
                let resolved = match char_ref {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = r.decode().map_err(|e| CompileError::xml(e.to_string()))?;
                        resolve_predefined_entity(&name)
                            .ok_or_else(|| CompileError::xml(format!("unknown entity &{name};")))?
                            .to_string()
                    }
                };
                if let Some(pending) = current.as_mut() {
                    pending.text.get_or_insert_with(String::new).push_str(&resolved);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"Sequence" => in_sequence = false,
                b"SubSequence" => {
                    in_sequence = false;
                    let pending = current
                        .take()
                        .ok_or_else(|| CompileError::xml("unbalanced SubSequence"))?;
                    let text = pending
                        .text
                        .ok_or_else(|| CompileError::xml("SubSequence without Sequence"))?;
                    let tokens = compile_fragment(&text)?;
                    parsed.push((pending.position, SubSequence::new(pending.gap, tokens)));
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(CompileError::xml(e.to_string())),
            _ => {}
        }
    }

    if !seen_root {
        return Err(CompileError::xml("missing ByteSequence element"));
    }
    if parsed.is_empty() {
        return Err(CompileError::new(CompileErrorKind::NoFragments, 0, ""));
    }
    parsed.sort_by_key(|(position, _)| *position);
    let anchor = anchor.unwrap_or(Anchor::Variable);
    let subsequences = normalise(anchor, parsed.into_iter().map(|(_, s)| s).collect())?;

    let sequence = ByteSequence::new(anchor, subsequences);
    Ok(match tag {
        Some(tag) => sequence.with_tag(tag),
        None => sequence,
    })
}

fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| CompileError::xml(e.to_string()))?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())
            .map_err(|_| CompileError::xml("attribute name is not UTF-8"))?;
        let raw = String::from_utf8(attr.value.to_vec())
            .map_err(|_| CompileError::xml("attribute value is not UTF-8"))?;
        let value = unescape(&raw)
            .map_err(|e| CompileError::xml(e.to_string()))?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn number(key: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        CompileError::new(
            CompileErrorKind::InvalidGap(format!("{} is not a number", key)),
            0,
            value,
        )
    })
}

/// Bring hand-written XML into the same shape the compiler produces.
fn normalise(anchor: Anchor, subsequences: Vec<SubSequence>) -> Result<Vec<SubSequence>> {
    let mut out: Vec<SubSequence> = Vec::with_capacity(subsequences.len());
    match anchor {
        Anchor::Bof | Anchor::Variable => {
            for (i, mut sub) in subsequences.into_iter().enumerate() {
                if i == 0 && anchor == Anchor::Variable {
                    if sub.gap.is_zero() {
                        sub.gap = Gap::ANY;
                    } else if !sub.gap.is_unbounded() {
                        return Err(CompileError::new(
                            CompileErrorKind::EdgeGap(anchor.keyword().to_string()),
                            0,
                            "",
                        ));
                    }
                }
                match out.last_mut() {
                    Some(prev) if sub.gap.is_zero() => prev.tokens.extend(sub.tokens),
                    _ => out.push(sub),
                }
            }
        }
        Anchor::Eof => {
            // Gaps sit to the right, so a zero gap joins a fragment to the next one.
            let mut carry: Vec<Token> = Vec::new();
            let count = subsequences.len();
            for (i, sub) in subsequences.into_iter().enumerate() {
                carry.extend(sub.tokens);
                if i + 1 == count || !sub.gap.is_zero() {
                    out.push(SubSequence::new(sub.gap, std::mem::take(&mut carry)));
                }
            }
        }
    }
    Ok(out)
}
