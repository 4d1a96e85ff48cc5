//! Expression compiler.
//!
//! Parses PRONOM-style byte pattern expressions in either dialect into a canonical
//! [`ByteSequence`]:
//!
//! ```text
//! expression   := element*
//! element      := hexbyte | '??' | class | alternatives | string | gap
//! class        := '[' '!'? (hexbyte | hexbyte ':' hexbyte | string)+ ']'
//! alternatives := '(' option ('|' option)+ ')'
//! gap          := '{' n '}' | '{' n '-' m '}' | '{' n '-*}' | '*'
//! ```

use crate::signature::anchor::Anchor;
use crate::signature::error::{CompileError, CompileErrorKind, Result};
use crate::signature::sequence::{ByteClass, ByteSequence, Gap, SubSequence, Token};
use tracing::trace;

/// Compile an expression against an anchor.
pub fn compile(expression: &str, anchor: Anchor) -> Result<ByteSequence> {
    let mut parser = Parser::new(expression);
    let items = parser.parse_items()?;
    if items.is_empty() {
        return Err(CompileError::new(
            CompileErrorKind::EmptyExpression,
            0,
            expression,
        ));
    }
    let sequence = assemble(expression, items, anchor)?;
    trace!(
        anchor = %anchor,
        expression,
        fragments = sequence.subsequences().len(),
        "compiled expression"
    );
    Ok(sequence)
}

/// Compile with the anchor given as a registry keyword (`BOFoffset`, `eofoffset`, ...).
pub fn compile_anchored(expression: &str, anchor_keyword: &str) -> Result<ByteSequence> {
    let anchor = Anchor::from_keyword(anchor_keyword)
        .ok_or_else(|| CompileError::unknown_anchor(anchor_keyword))?;
    compile(expression, anchor)
}

/// Compile a single gap-free fragment, as found in a `<Sequence>` element.
pub fn compile_fragment(text: &str) -> Result<Vec<Token>> {
    let mut parser = Parser::new(text);
    let items = parser.parse_items()?;
    let mut tokens = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Item::Token(token) => tokens.push(token),
            Item::Gap { start, end, .. } => {
                return Err(CompileError::new(
                    CompileErrorKind::InvalidGap("gaps are not allowed in a fragment".into()),
                    start,
                    slice(text, start, end),
                ))
            }
        }
    }
    if tokens.is_empty() {
        return Err(CompileError::new(CompileErrorKind::EmptyExpression, 0, text));
    }
    Ok(tokens)
}

#[derive(Debug)]
enum Item {
    Token(Token),
    Gap { gap: Gap, start: usize, end: usize },
}

/// Group tokens into fragments, fold gaps, and attach edge windows for the anchor.
fn assemble(text: &str, items: Vec<Item>, anchor: Anchor) -> Result<ByteSequence> {
    let mut fragments: Vec<Vec<Token>> = Vec::new();
    let mut between: Vec<Gap> = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut leading: Option<(Gap, usize, usize)> = None;
    let mut pending: Option<(Gap, usize, usize)> = None;

    for item in items {
        match item {
            Item::Gap { gap, start, end } => {
                pending = Some(match pending {
                    Some((acc, s, _)) => (acc.combine(&gap), s, end),
                    None => (gap, start, end),
                });
            }
            Item::Token(token) => {
                match pending.take() {
                    Some(edge) if fragments.is_empty() && current.is_empty() => {
                        leading = Some(edge)
                    }
                    // {0} joins its neighbours into one fragment
                    Some((gap, _, _)) if gap.is_zero() => {}
                    Some((gap, _, _)) => {
                        fragments.push(std::mem::take(&mut current));
                        between.push(gap);
                    }
                    None => {}
                }
                current.push(token);
            }
        }
    }

    if current.is_empty() {
        return Err(CompileError::new(CompileErrorKind::NoFragments, 0, text));
    }
    fragments.push(current);
    let trailing = pending;

    let edge_error = |start: usize, end: usize| {
        CompileError::new(
            CompileErrorKind::EdgeGap(anchor.keyword().to_string()),
            start,
            slice(text, start, end),
        )
    };
    // `*` and `{0}` on the far side never constrain anything.
    let droppable = |gap: &Gap| *gap == Gap::ANY || gap.is_zero();

    let subsequences = match anchor {
        Anchor::Bof | Anchor::Variable => {
            if let Some((gap, start, end)) = trailing {
                if !droppable(&gap) {
                    return Err(edge_error(start, end));
                }
            }
            let first = match (anchor, leading) {
                (Anchor::Bof, Some((gap, _, _))) => gap,
                (Anchor::Bof, None) => Gap::ZERO,
                (_, None) => Gap::ANY,
                (_, Some((gap, _, _))) if gap.is_zero() => Gap::ANY,
                (_, Some((gap, _, _))) if gap.is_unbounded() => gap,
                (_, Some((_, start, end))) => return Err(edge_error(start, end)),
            };
            std::iter::once(first)
                .chain(between)
                .zip(fragments)
                .map(|(gap, tokens)| SubSequence::new(gap, tokens))
                .collect()
        }
        Anchor::Eof => {
            if let Some((gap, start, end)) = leading {
                if !droppable(&gap) {
                    return Err(edge_error(start, end));
                }
            }
            let last = trailing.map(|(gap, _, _)| gap).unwrap_or(Gap::ZERO);
            between
                .into_iter()
                .chain(std::iter::once(last))
                .zip(fragments)
                .map(|(gap, tokens)| SubSequence::new(gap, tokens))
                .collect()
        }
    };

    Ok(ByteSequence::new(anchor, subsequences))
}

fn slice(text: &str, start: usize, end: usize) -> String {
    let mut start = start.min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = end.clamp(start, text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].to_string()
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, kind: CompileErrorKind, start: usize) -> CompileError {
        CompileError::new(kind, start, slice(self.text, start, self.pos + 1))
    }

    fn unexpected(&self) -> CompileError {
        let c = self.text[self.pos..].chars().next().unwrap_or('\0');
        CompileError::new(
            CompileErrorKind::UnexpectedCharacter(c),
            self.pos,
            c.to_string(),
        )
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_items(&mut self) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            let start = self.pos;
            match self.peek() {
                None => return Ok(items),
                Some(b'{') | Some(b'*') => {
                    let gap = self.parse_gap()?;
                    items.push(Item::Gap {
                        gap,
                        start,
                        end: self.pos,
                    });
                }
                Some(b'(') => {
                    items.extend(self.parse_alternatives()?.into_iter().map(Item::Token));
                }
                Some(c @ (b')' | b']' | b'}')) => {
                    return Err(self.error(CompileErrorKind::Unbalanced(c as char), start));
                }
                Some(_) => {
                    items.extend(self.parse_simple()?.into_iter().map(Item::Token));
                }
            }
        }
    }

    /// hexbyte, `??`, class or string.
    fn parse_simple(&mut self) -> Result<Vec<Token>> {
        match self.peek() {
            Some(b'?') => {
                if self.bytes.get(self.pos + 1) == Some(&b'?') {
                    self.pos += 2;
                    Ok(vec![Token::Any])
                } else {
                    Err(self.unexpected())
                }
            }
            Some(b'[') => Ok(vec![self.parse_class()?]),
            Some(b'\'') => Ok(self.parse_string()?.into_iter().map(Token::Byte).collect()),
            Some(c) if c.is_ascii_hexdigit() => Ok(vec![Token::Byte(self.parse_hex_byte()?)]),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_hex_byte(&mut self) -> Result<u8> {
        let start = self.pos;
        let hi = self.peek().and_then(hex_value);
        let lo = self.bytes.get(self.pos + 1).copied().and_then(hex_value);
        match (hi, lo) {
            (Some(hi), Some(lo)) => {
                self.pos += 2;
                Ok(hi << 4 | lo)
            }
            (Some(_), _) => {
                self.pos += 1;
                Err(self.error(CompileErrorKind::InvalidHex, start))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_string(&mut self) -> Result<Vec<u8>> {
        let start = self.pos;
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(CompileError::new(
                        CompileErrorKind::UnterminatedString,
                        start,
                        slice(self.text, start, self.text.len()),
                    ))
                }
                Some(b'\'') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) if (0x20..=0x7E).contains(&c) => {
                    out.push(c);
                    self.pos += 1;
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn parse_class(&mut self) -> Result<Token> {
        let start = self.pos;
        self.pos += 1;
        self.skip_ws();
        let negated = if self.peek() == Some(b'!') {
            self.pos += 1;
            true
        } else {
            false
        };

        let mut class = ByteClass::empty();
        loop {
            self.skip_ws();
            match self.peek() {
                None => {
                    return Err(CompileError::new(
                        CompileErrorKind::Unbalanced('['),
                        start,
                        slice(self.text, start, self.text.len()),
                    ))
                }
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\'') => {
                    for b in self.parse_string()? {
                        class.insert(b);
                    }
                }
                Some(c) if c.is_ascii_hexdigit() => {
                    let lo = self.parse_hex_byte()?;
                    self.skip_ws();
                    if self.peek() == Some(b':') {
                        self.pos += 1;
                        self.skip_ws();
                        let hi = self.parse_hex_byte()?;
                        class.insert_range(lo, hi);
                    } else {
                        class.insert(lo);
                    }
                }
                Some(_) => return Err(self.unexpected()),
            }
        }

        if class.is_empty() {
            return Err(self.error(CompileErrorKind::EmptyClass, start));
        }
        if negated {
            class = class.complement();
            if class.is_empty() {
                return Err(self.error(CompileErrorKind::EmptyClass, start));
            }
        }
        Ok(Token::from_class(class))
    }

    fn parse_gap(&mut self) -> Result<Gap> {
        let start = self.pos;
        if self.peek() == Some(b'*') {
            self.pos += 1;
            return Ok(Gap::ANY);
        }
        self.pos += 1;
        self.skip_ws();
        let min = self.parse_number(start)?;
        self.skip_ws();
        let gap = match self.peek() {
            Some(b'}') => Gap::fixed(min),
            Some(b'-') => {
                self.pos += 1;
                self.skip_ws();
                if self.peek() == Some(b'*') {
                    self.pos += 1;
                    Gap::at_least(min)
                } else {
                    let max = self.parse_number(start)?;
                    if max < min {
                        return Err(self.error(
                            CompileErrorKind::InvalidGap(format!(
                                "maximum {} is less than minimum {}",
                                max, min
                            )),
                            start,
                        ));
                    }
                    Gap::range(min, max)
                }
            }
            None => {
                return Err(CompileError::new(
                    CompileErrorKind::Unbalanced('{'),
                    start,
                    slice(self.text, start, self.text.len()),
                ))
            }
            Some(_) => return Err(self.unexpected()),
        };
        self.skip_ws();
        match self.peek() {
            Some(b'}') => {
                self.pos += 1;
                Ok(gap)
            }
            None => Err(CompileError::new(
                CompileErrorKind::Unbalanced('{'),
                start,
                slice(self.text, start, self.text.len()),
            )),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn parse_number(&mut self, gap_start: usize) -> Result<u64> {
        let digits_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if digits_start == self.pos {
            return Err(self.error(
                CompileErrorKind::InvalidGap("expected a number".into()),
                gap_start,
            ));
        }
        self.text[digits_start..self.pos].parse::<u64>().map_err(|_| {
            self.error(
                CompileErrorKind::InvalidGap("number too large".into()),
                gap_start,
            )
        })
    }

    /// Returns the canonical tokens for a group: one class when every option is a
    /// single position, otherwise an alternatives token.
    fn parse_alternatives(&mut self) -> Result<Vec<Token>> {
        let start = self.pos;
        self.pos += 1;
        let mut options: Vec<Vec<Token>> = Vec::new();
        let mut current: Vec<Token> = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => {
                    return Err(CompileError::new(
                        CompileErrorKind::Unbalanced('('),
                        start,
                        slice(self.text, start, self.text.len()),
                    ))
                }
                Some(c @ (b'|' | b')')) => {
                    if current.is_empty() {
                        return Err(self.error(CompileErrorKind::EmptyAlternative, self.pos));
                    }
                    options.push(std::mem::take(&mut current));
                    self.pos += 1;
                    if c == b')' {
                        break;
                    }
                }
                Some(b'(') => {
                    return Err(self.error(CompileErrorKind::NestedAlternatives, self.pos))
                }
                Some(b'{') | Some(b'*') => {
                    return Err(self.error(CompileErrorKind::GapInAlternatives, self.pos))
                }
                Some(c @ (b']' | b'}')) => {
                    return Err(self.error(CompileErrorKind::Unbalanced(c as char), self.pos))
                }
                Some(_) => current.extend(self.parse_simple()?),
            }
        }

        if options.len() == 1 {
            return Ok(options.pop().unwrap_or_default());
        }
        let single: Option<Vec<ByteClass>> = options
            .iter()
            .map(|opt| match opt.as_slice() {
                [token] => token.as_class(),
                _ => None,
            })
            .collect();
        Ok(match single {
            Some(classes) => {
                let merged = classes
                    .iter()
                    .fold(ByteClass::empty(), |acc, c| acc.union(c));
                vec![Token::from_class(merged)]
            }
            None => vec![Token::Alternatives(options)],
        })
    }
}

fn hex_value(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}
