//! The compiled byte sequence model.
//!
//! A [`ByteSequence`] is an anchored list of [`SubSequence`]s. Each subsequence is a
//! fragment of [`Token`]s preceded by a [`Gap`] on the side nearest the anchor: the
//! left side for BOF and Variable sequences, the right side for EOF sequences. For the
//! first fragment of a BOF sequence the gap is the offset window from the start of the
//! source; for the last fragment of an EOF sequence it is the window from the end.
//!
//! Values produced by the compiler are canonical, so two expressions describing the same
//! pattern compile to equal models.

use crate::signature::anchor::Anchor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A set of byte values stored as a 256-bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ByteClass {
    bits: [u64; 4],
}

impl ByteClass {
    pub const fn empty() -> Self {
        Self { bits: [0; 4] }
    }

    pub const fn all() -> Self {
        Self {
            bits: [u64::MAX; 4],
        }
    }

    pub fn single(byte: u8) -> Self {
        let mut class = Self::empty();
        class.insert(byte);
        class
    }

    /// Inclusive range; `lo > hi` is treated as `hi..=lo`.
    pub fn range(lo: u8, hi: u8) -> Self {
        let mut class = Self::empty();
        class.insert_range(lo, hi);
        class
    }

    pub fn insert(&mut self, byte: u8) {
        self.bits[(byte >> 6) as usize] |= 1u64 << (byte & 63);
    }

    pub fn insert_range(&mut self, lo: u8, hi: u8) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        for b in lo..=hi {
            self.insert(b);
        }
    }

    #[inline]
    pub fn contains(&self, byte: u8) -> bool {
        self.bits[(byte >> 6) as usize] & (1u64 << (byte & 63)) != 0
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    pub fn is_all(&self) -> bool {
        self.bits.iter().all(|w| *w == u64::MAX)
    }

    pub fn union(&self, other: &ByteClass) -> ByteClass {
        let mut bits = self.bits;
        for (a, b) in bits.iter_mut().zip(other.bits.iter()) {
            *a |= *b;
        }
        ByteClass { bits }
    }

    pub fn complement(&self) -> ByteClass {
        ByteClass {
            bits: [!self.bits[0], !self.bits[1], !self.bits[2], !self.bits[3]],
        }
    }

    /// The only member, if the class has exactly one.
    pub fn single_value(&self) -> Option<u8> {
        if self.len() == 1 {
            self.iter().next()
        } else {
            None
        }
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0u8..=255).filter(move |b| self.contains(*b))
    }

    /// Maximal runs of consecutive members, ascending.
    pub fn ranges(&self) -> Vec<(u8, u8)> {
        let mut out: Vec<(u8, u8)> = Vec::new();
        for b in self.iter() {
            match out.last_mut() {
                Some((_, hi)) if *hi as u16 + 1 == b as u16 => *hi = b,
                _ => out.push((b, b)),
            }
        }
        out
    }
}

impl fmt::Debug for ByteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ByteClass[")?;
        for (i, (lo, hi)) in self.ranges().into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if lo == hi {
                write!(f, "{:02X}", lo)?;
            } else {
                write!(f, "{:02X}:{:02X}", lo, hi)?;
            }
        }
        f.write_str("]")
    }
}

/// One position-consuming element of a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Byte(u8),
    /// `??`
    Any,
    /// A set of two to 255 byte values.
    Class(ByteClass),
    /// Two or more options, each a run of `Byte`, `Any` or `Class` tokens.
    Alternatives(Vec<Vec<Token>>),
}

impl Token {
    /// Canonical token for a byte class: a single byte, `??`, or a class.
    pub fn from_class(class: ByteClass) -> Token {
        if class.is_all() {
            Token::Any
        } else if let Some(b) = class.single_value() {
            Token::Byte(b)
        } else {
            Token::Class(class)
        }
    }

    /// The bytes this token accepts, for single-position tokens.
    pub fn as_class(&self) -> Option<ByteClass> {
        match self {
            Token::Byte(b) => Some(ByteClass::single(*b)),
            Token::Any => Some(ByteClass::all()),
            Token::Class(c) => Some(*c),
            Token::Alternatives(_) => None,
        }
    }

    /// Match a single-position token against one byte. Always false for alternatives.
    #[inline]
    pub fn accepts(&self, byte: u8) -> bool {
        match self {
            Token::Byte(b) => *b == byte,
            Token::Any => true,
            Token::Class(c) => c.contains(byte),
            Token::Alternatives(_) => false,
        }
    }

    pub fn min_len(&self) -> usize {
        match self {
            Token::Alternatives(options) => options.iter().map(Vec::len).min().unwrap_or(0),
            _ => 1,
        }
    }

    pub fn max_len(&self) -> usize {
        match self {
            Token::Alternatives(options) => options.iter().map(Vec::len).max().unwrap_or(0),
            _ => 1,
        }
    }
}

/// A skip distance between fragments. `max == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gap {
    pub min: u64,
    pub max: Option<u64>,
}

impl Gap {
    pub const ZERO: Gap = Gap {
        min: 0,
        max: Some(0),
    };

    /// `*`
    pub const ANY: Gap = Gap { min: 0, max: None };

    pub fn fixed(n: u64) -> Self {
        Gap {
            min: n,
            max: Some(n),
        }
    }

    pub fn range(min: u64, max: u64) -> Self {
        Gap {
            min,
            max: Some(max),
        }
    }

    pub fn at_least(min: u64) -> Self {
        Gap { min, max: None }
    }

    pub fn is_zero(&self) -> bool {
        *self == Gap::ZERO
    }

    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// The gap covering two adjacent gaps.
    pub fn combine(&self, other: &Gap) -> Gap {
        Gap {
            min: self.min.saturating_add(other.min),
            max: match (self.max, other.max) {
                (Some(a), Some(b)) => Some(a.saturating_add(b)),
                _ => None,
            },
        }
    }
}

impl Default for Gap {
    fn default() -> Self {
        Gap::ZERO
    }
}

/// A gap plus the fragment it leads to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubSequence {
    pub gap: Gap,
    pub tokens: Vec<Token>,
}

impl SubSequence {
    pub fn new(gap: Gap, tokens: Vec<Token>) -> Self {
        Self { gap, tokens }
    }

    pub fn min_len(&self) -> usize {
        self.tokens.iter().map(Token::min_len).sum()
    }

    pub fn max_len(&self) -> usize {
        self.tokens.iter().map(Token::max_len).sum()
    }

    /// The fragment as plain bytes, when it holds nothing but `Byte` tokens.
    pub fn literal(&self) -> Option<Vec<u8>> {
        self.tokens
            .iter()
            .map(|t| match t {
                Token::Byte(b) => Some(*b),
                _ => None,
            })
            .collect()
    }
}

/// An anchored, compiled byte pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ByteSequence {
    anchor: Anchor,
    subsequences: Vec<SubSequence>,
    tag: Option<String>,
}

impl ByteSequence {
    pub fn new(anchor: Anchor, subsequences: Vec<SubSequence>) -> Self {
        Self {
            anchor,
            subsequences,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn subsequences(&self) -> &[SubSequence] {
        &self.subsequences
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Smallest source length that could possibly match.
    pub fn min_length(&self) -> u64 {
        self.subsequences
            .iter()
            .map(|s| s.gap.min.saturating_add(s.min_len() as u64))
            .fold(0u64, u64::saturating_add)
    }
}
