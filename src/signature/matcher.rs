//! Byte sequence matching.
//!
//! Every sequence is evaluated over a direction-normalised view of the source: BOF and
//! Variable sequences read it forwards, EOF sequences read it backwards with their
//! fragments and tokens mirrored, so one left-to-right algorithm serves all anchors.
//!
//! For each fragment the matcher holds the set of candidate start windows (sorted,
//! merged, inclusive intervals), scans each window once, and derives the next fragment's
//! windows from the end positions it found and the following gap. Nothing is scanned
//! twice for the same fragment, so a sequence costs at most `O(view * fragments)`.

use crate::signature::anchor::Anchor;
use crate::signature::sequence::{ByteSequence, Gap, Token};
use memchr::memmem::{Finder, FinderRev};

/// A compiled sequence prepared for repeated matching.
#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    anchor: Anchor,
    steps: Vec<Step>,
}

#[derive(Debug, Clone)]
struct Step {
    gap: Gap,
    fragment: Fragment,
}

#[derive(Debug, Clone)]
struct Fragment {
    /// Tokens in view order.
    tokens: Vec<Token>,
    min_len: usize,
    literal: Option<Literal>,
}

/// A fragment made only of fixed bytes, searched with memmem.
#[derive(Debug, Clone)]
enum Literal {
    Forward(Finder<'static>),
    Reverse(FinderRev<'static>),
}

impl Literal {
    fn len(&self) -> usize {
        match self {
            Literal::Forward(f) => f.needle().len(),
            Literal::Reverse(f) => f.needle().len(),
        }
    }
}

impl SequenceMatcher {
    pub fn new(sequence: &ByteSequence) -> Self {
        let anchor = sequence.anchor();
        let reversed = anchor.is_reversed();
        let mut steps: Vec<Step> = sequence
            .subsequences()
            .iter()
            .map(|sub| {
                let literal = sub.literal().map(|bytes| {
                    // Needles stay in source order; the reverse finder walks the source
                    // back from the end.
                    if reversed {
                        Literal::Reverse(FinderRev::new(&bytes).into_owned())
                    } else {
                        Literal::Forward(Finder::new(&bytes).into_owned())
                    }
                });
                let tokens = if reversed {
                    mirror(&sub.tokens)
                } else {
                    sub.tokens.clone()
                };
                Step {
                    gap: sub.gap,
                    fragment: Fragment {
                        tokens,
                        min_len: sub.min_len(),
                        literal,
                    },
                }
            })
            .collect();
        if reversed {
            steps.reverse();
        }
        Self { anchor, steps }
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// True if the sequence occurs in `data`.
    ///
    /// `limit` caps how many bytes are examined, measured from the anchored end (the
    /// start for Variable sequences). `None` means unbounded.
    pub fn matches(&self, data: &[u8], limit: Option<u64>) -> bool {
        let view = View::new(data, limit, self.anchor.is_reversed());
        let Some(first) = self.steps.first() else {
            return false;
        };

        let mut windows = first_windows(&first.gap, view.len);
        for (i, step) in self.steps.iter().enumerate() {
            if windows.is_empty() {
                return false;
            }
            let next_gap = self.steps.get(i + 1).map(|s| s.gap);
            // With no bounded gap after it, only the earliest end of this fragment can
            // matter: it opens the widest window for whatever follows.
            let earliest_only = next_gap.map_or(true, |g| g.is_unbounded());
            let ends = scan(&view, &step.fragment, &windows, earliest_only);
            match next_gap {
                None => return !ends.is_empty(),
                Some(gap) => windows = next_windows(&ends, &gap, view.len),
            }
        }
        false
    }
}

/// Convenience wrapper for one-off matching.
pub fn matches(sequence: &ByteSequence, data: &[u8], limit: Option<u64>) -> bool {
    SequenceMatcher::new(sequence).matches(data, limit)
}

fn mirror(tokens: &[Token]) -> Vec<Token> {
    tokens
        .iter()
        .rev()
        .map(|t| match t {
            Token::Alternatives(options) => Token::Alternatives(
                options
                    .iter()
                    .map(|o| o.iter().rev().cloned().collect())
                    .collect(),
            ),
            other => other.clone(),
        })
        .collect()
}

struct View<'a> {
    data: &'a [u8],
    len: usize,
    reversed: bool,
}

impl<'a> View<'a> {
    fn new(data: &'a [u8], limit: Option<u64>, reversed: bool) -> Self {
        let len = match limit {
            Some(limit) => data.len().min(usize::try_from(limit).unwrap_or(usize::MAX)),
            None => data.len(),
        };
        Self {
            data,
            len,
            reversed,
        }
    }

    #[inline]
    fn byte(&self, pos: usize) -> u8 {
        if self.reversed {
            self.data[self.data.len() - 1 - pos]
        } else {
            self.data[pos]
        }
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn first_windows(gap: &Gap, len: usize) -> Vec<(usize, usize)> {
    let lo = to_usize(gap.min);
    if lo > len {
        return Vec::new();
    }
    let hi = gap.max.map_or(len, |m| to_usize(m).min(len));
    vec![(lo, hi)]
}

fn next_windows(ends: &[usize], gap: &Gap, len: usize) -> Vec<(usize, usize)> {
    let mut out: Vec<(usize, usize)> = Vec::new();
    for &end in ends {
        let lo = end.saturating_add(to_usize(gap.min));
        if lo > len {
            // ends are ascending, so every later window starts further out
            break;
        }
        let hi = match gap.max {
            Some(max) => end.saturating_add(to_usize(max)).min(len),
            None => len,
        };
        match out.last_mut() {
            Some((_, prev_hi)) if lo <= prev_hi.saturating_add(1) => {
                *prev_hi = (*prev_hi).max(hi)
            }
            _ => out.push((lo, hi)),
        }
        if gap.max.is_none() {
            break;
        }
    }
    out
}

/// Collect the end positions of every occurrence of `fragment` starting inside the
/// windows, ascending and de-duplicated. With `earliest_only` the result holds just the
/// smallest end, if any.
fn scan(
    view: &View<'_>,
    fragment: &Fragment,
    windows: &[(usize, usize)],
    earliest_only: bool,
) -> Vec<usize> {
    if view.len < fragment.min_len {
        return Vec::new();
    }
    let last_start = view.len - fragment.min_len;
    let mut ends: Vec<usize> = Vec::new();

    for &(lo, hi) in windows {
        if earliest_only && ends.first().is_some_and(|best| lo >= *best) {
            break;
        }
        let hi = hi.min(last_start);
        if lo > hi {
            continue;
        }
        match &fragment.literal {
            Some(literal) => {
                if scan_literal(view, literal, lo, hi, earliest_only, &mut ends) && earliest_only {
                    break;
                }
            }
            None => {
                for pos in lo..=hi {
                    // Every end found from here on is beyond `pos`.
                    if earliest_only && ends.first().is_some_and(|best| pos >= *best) {
                        break;
                    }
                    let before = ends.len();
                    match_at(view, &fragment.tokens, pos, &mut ends);
                    if earliest_only && ends.len() > before {
                        let min = ends.iter().copied().min().unwrap_or(pos);
                        ends.clear();
                        ends.push(min);
                    }
                }
            }
        }
    }

    ends.sort_unstable();
    ends.dedup();
    ends
}

/// Returns true if anything was found.
fn scan_literal(
    view: &View<'_>,
    literal: &Literal,
    lo: usize,
    hi: usize,
    earliest_only: bool,
    ends: &mut Vec<usize>,
) -> bool {
    let n = literal.len();
    let found_before = ends.len();
    match literal {
        Literal::Forward(finder) => {
            let hay = &view.data[lo..hi + n];
            let mut offset = 0;
            while let Some(i) = finder.find(&hay[offset..]) {
                let pos = lo + offset + i;
                ends.push(pos + n);
                if earliest_only {
                    break;
                }
                offset += i + 1;
            }
        }
        Literal::Reverse(finder) => {
            // View positions lo..=hi map to source starts total-hi-n ..= total-lo-n.
            let total = view.data.len();
            let base = total - hi - n;
            let hay = &view.data[base..total - lo];
            let mut bound = hay.len();
            while let Some(i) = finder.rfind(&hay[..bound]) {
                let start = base + i;
                let pos = total - start - n;
                ends.push(pos + n);
                if earliest_only || i == 0 {
                    break;
                }
                bound = i + n - 1;
            }
        }
    }
    ends.len() > found_before
}

/// Push every end position of `tokens` matched at `pos`.
///
/// Positions reachable after each token are kept as one sorted, de-duplicated frontier,
/// so alternatives that converge on the same offset are only continued once.
fn match_at(view: &View<'_>, tokens: &[Token], pos: usize, ends: &mut Vec<usize>) {
    let mut frontier = vec![pos];
    let mut next = Vec::new();
    for token in tokens {
        next.clear();
        for &p in &frontier {
            match token {
                Token::Alternatives(options) => {
                    next.extend(options.iter().filter_map(|o| match_simple(view, o, p)));
                }
                simple => {
                    if p < view.len && simple.accepts(view.byte(p)) {
                        next.push(p + 1);
                    }
                }
            }
        }
        if next.is_empty() {
            return;
        }
        next.sort_unstable();
        next.dedup();
        std::mem::swap(&mut frontier, &mut next);
    }
    ends.extend(frontier);
}

fn match_simple(view: &View<'_>, tokens: &[Token], pos: usize) -> Option<usize> {
    if pos + tokens.len() > view.len {
        return None;
    }
    tokens
        .iter()
        .enumerate()
        .all(|(k, t)| t.accepts(view.byte(pos + k)))
        .then_some(pos + tokens.len())
}
