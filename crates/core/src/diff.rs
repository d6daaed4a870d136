//! Word-level diffs between two revisions.
//!
//! Text is split into runs of word characters, runs of whitespace, and
//! single punctuation characters. The edit script is Myers' shortest edit
//! script over those tokens, after the common prefix and suffix are peeled
//! off. Within every changed stretch, removals are emitted before additions.
//!
//! Round-trip law: concatenating every segment that is not removed yields the
//! new text; concatenating every segment that is not added yields the old.

use serde::{Deserialize, Serialize};

use crate::revision::Revision;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One run of text in a field diff.
///
/// Raw engine output sets both flags explicitly. [`RevisionDiff::normalize`]
/// drops the `false` ones so only true flags are serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSegment {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
}

impl DiffSegment {
    fn new(op: Op, value: String) -> Self {
        Self {
            value,
            added: Some(op == Op::Insert),
            removed: Some(op == Op::Delete),
        }
    }

    pub fn is_added(&self) -> bool {
        self.added == Some(true)
    }

    pub fn is_removed(&self) -> bool {
        self.removed == Some(true)
    }

    fn strip_false_markers(&mut self) {
        if self.added == Some(false) {
            self.added = None;
        }
        if self.removed == Some(false) {
            self.removed = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDiff {
    pub title: Vec<DiffSegment>,
    pub path: Vec<DiffSegment>,
    pub body: Vec<DiffSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsDiff {
    pub read: Vec<DiffSegment>,
    pub write: Vec<DiffSegment>,
}

/// Field-by-field diff of two revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionDiff {
    pub content: ContentDiff,
    pub permissions: PermissionsDiff,
}

impl RevisionDiff {
    /// Remove `false` markers. Segments are neither added, removed, nor
    /// reordered.
    pub fn normalize(mut self) -> Self {
        for field in [
            &mut self.content.title,
            &mut self.content.path,
            &mut self.content.body,
            &mut self.permissions.read,
            &mut self.permissions.write,
        ] {
            field.iter_mut().for_each(DiffSegment::strip_false_markers);
        }
        self
    }

    /// `true` if no field changed.
    pub fn is_unchanged(&self) -> bool {
        [
            &self.content.title,
            &self.content.path,
            &self.content.body,
            &self.permissions.read,
            &self.permissions.write,
        ]
        .iter()
        .all(|field| field.iter().all(|s| !s.is_added() && !s.is_removed()))
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Diff every content and permission field of `old` against `new`.
pub fn diff(old: &Revision, new: &Revision) -> RevisionDiff {
    let (a, b) = (old.content(), new.content());
    let (pa, pb) = (old.permissions(), new.permissions());
    RevisionDiff {
        content: ContentDiff {
            title: diff_words(a.title(), b.title()),
            path: diff_words(a.path(), b.path()),
            body: diff_words(a.body(), b.body()),
        },
        permissions: PermissionsDiff {
            read: diff_words(pa.read.as_str(), pb.read.as_str()),
            write: diff_words(pa.write.as_str(), pb.write.as_str()),
        },
    }
}

/// Word-level diff of two strings.
pub fn diff_words(old: &str, new: &str) -> Vec<DiffSegment> {
    let old_tokens = tokenize(old);
    let new_tokens = tokenize(new);
    let script = edit_script(&old_tokens, &new_tokens);
    into_segments(group_changes(script))
}

/// Concatenate the segments that exist in the old text.
pub fn old_text(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_added())
        .map(|s| s.value.as_str())
        .collect()
}

/// Concatenate the segments that exist in the new text.
pub fn new_text(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_removed())
        .map(|s| s.value.as_str())
        .collect()
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenClass {
    Word,
    Space,
    Other,
}

impl TokenClass {
    fn of(c: char) -> Self {
        if c.is_alphanumeric() || c == '_' {
            Self::Word
        } else if c.is_whitespace() {
            Self::Space
        } else {
            Self::Other
        }
    }
}

/// Split into tokens whose concatenation is exactly `text`.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut prev: Option<TokenClass> = None;

    for (i, c) in text.char_indices() {
        let class = TokenClass::of(c);
        if let Some(p) = prev {
            if p != class || class == TokenClass::Other {
                tokens.push(&text[start..i]);
                start = i;
            }
        }
        prev = Some(class);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

// ---------------------------------------------------------------------------
// Edit script
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Insert,
    Delete,
}

fn edit_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<(Op, &'a str)> {
    let mut script = Vec::with_capacity(old.len().max(new.len()));
    let bound = (old.len() + new.len() + 1) / 2 + 1;
    let mut forward = Frontier::new(bound);
    let mut backward = Frontier::new(bound);
    conquer(old, new, &mut forward, &mut backward, &mut script);
    script
}

/// Furthest-reaching `x` per diagonal `k`, indexed from `-bound` to `bound`.
struct Frontier {
    offset: isize,
    xs: Vec<usize>,
}

impl Frontier {
    fn new(bound: usize) -> Self {
        Self {
            offset: bound as isize,
            xs: vec![0; 2 * bound + 1],
        }
    }

    fn get(&self, k: isize) -> usize {
        self.xs[(k + self.offset) as usize]
    }

    fn set(&mut self, k: isize, x: usize) {
        self.xs[(k + self.offset) as usize] = x;
    }
}

fn common_prefix(a: &[&str], b: &[&str]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[&str], b: &[&str]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Linear-space Myers: peel the common ends, split the rest at a middle
/// snake and recurse on both halves. Memory stays O(N+M) regardless of the
/// edit distance.
fn conquer<'a>(
    old: &[&'a str],
    new: &[&'a str],
    forward: &mut Frontier,
    backward: &mut Frontier,
    script: &mut Vec<(Op, &'a str)>,
) {
    let prefix = common_prefix(old, new);
    script.extend(old[..prefix].iter().map(|t| (Op::Equal, *t)));
    let (old, new) = (&old[prefix..], &new[prefix..]);

    let suffix = common_suffix(old, new);
    let (old, tail) = old.split_at(old.len() - suffix);
    let new = &new[..new.len() - suffix];

    if old.is_empty() {
        script.extend(new.iter().map(|t| (Op::Insert, *t)));
    } else if new.is_empty() {
        script.extend(old.iter().map(|t| (Op::Delete, *t)));
    } else if let Some((x, y)) = middle_snake(old, new, forward, backward) {
        conquer(&old[..x], &new[..y], forward, backward, script);
        conquer(&old[x..], &new[y..], forward, backward, script);
    } else {
        script.extend(old.iter().map(|t| (Op::Delete, *t)));
        script.extend(new.iter().map(|t| (Op::Insert, *t)));
    }

    script.extend(tail.iter().map(|t| (Op::Equal, *t)));
}

/// Run the forward and backward searches until they overlap and return the
/// point where the overlapping snake starts. Both inputs are non-empty and
/// share neither their first nor their last token.
fn middle_snake(
    old: &[&str],
    new: &[&str],
    forward: &mut Frontier,
    backward: &mut Frontier,
) -> Option<(usize, usize)> {
    let (n, m) = (old.len(), new.len());
    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;
    let bound = ((n + m + 1) / 2 + 1) as isize;

    forward.set(1, 0);
    backward.set(1, 0);

    for d in 0..bound {
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && forward.get(k - 1) < forward.get(k + 1)) {
                forward.get(k + 1)
            } else {
                forward.get(k - 1) + 1
            };
            let y = (x as isize - k) as usize;
            let start = (x, y);
            if x < n && y < m {
                x += common_prefix(&old[x..], &new[y..]);
            }
            forward.set(k, x);

            if odd && (k - delta).abs() < d && x + backward.get(delta - k) >= n {
                return Some(start);
            }
        }

        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && backward.get(k - 1) < backward.get(k + 1)) {
                backward.get(k + 1)
            } else {
                backward.get(k - 1) + 1
            };
            let mut y = (x as isize - k) as usize;
            if x < n && y < m {
                let run = common_suffix(&old[..n - x], &new[..m - y]);
                x += run;
                y += run;
            }
            backward.set(k, x);

            if !odd && (k - delta).abs() <= d && x + forward.get(delta - k) >= n {
                return Some((n - x, m - y));
            }
        }
    }
    None
}

/// Within each stretch between equal tokens, move deletions ahead of
/// insertions. Relative order inside each kind is kept.
fn group_changes(script: Vec<(Op, &str)>) -> Vec<(Op, &str)> {
    let mut out = Vec::with_capacity(script.len());
    let mut deletes = Vec::new();
    let mut inserts = Vec::new();

    for (op, token) in script {
        match op {
            Op::Delete => deletes.push((op, token)),
            Op::Insert => inserts.push((op, token)),
            Op::Equal => {
                out.append(&mut deletes);
                out.append(&mut inserts);
                out.push((op, token));
            }
        }
    }
    out.append(&mut deletes);
    out.append(&mut inserts);
    out
}

/// Merge consecutive tokens with the same op into segments.
fn into_segments(script: Vec<(Op, &str)>) -> Vec<DiffSegment> {
    let mut segments: Vec<DiffSegment> = Vec::new();
    let mut current: Option<(Op, String)> = None;

    for (op, token) in script {
        if let Some((cur_op, value)) = current.as_mut() {
            if *cur_op == op {
                value.push_str(token);
                continue;
            }
        }
        if let Some((cur_op, value)) = current.replace((op, token.to_string())) {
            segments.push(DiffSegment::new(cur_op, value));
        }
    }
    if let Some((op, value)) = current {
        segments.push(DiffSegment::new(op, value));
    }
    segments
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
