//! The replacement engine.
//!
//! Rules are matched against a virtual buffer formed by concatenating the
//! current text of every cell in order. Each match is spliced back onto the
//! cells it covers; a match may straddle several cells and the replacement
//! may be longer or shorter than the text it replaces. Offsets are counted in
//! `char`s so that splits never land inside a UTF-8 sequence.

use crate::rules::Rule;

/// A mutable piece of text participating in a match space.
///
/// Implemented for text units by the parse crate, and for `String` so the
/// engine can be exercised on plain text.
pub trait TextCell {
    /// Current text of the cell.
    fn text(&self) -> &str;
    /// Replace the cell's text.
    fn set_text(&mut self, text: String);
}

impl TextCell for String {
    fn text(&self) -> &str {
        self
    }

    fn set_text(&mut self, text: String) {
        *self = text;
    }
}

impl<T: TextCell + ?Sized> TextCell for &mut T {
    fn text(&self) -> &str {
        (**self).text()
    }

    fn set_text(&mut self, text: String) {
        (**self).set_text(text);
    }
}

/// Number of matches each rule produced, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplaceReport {
    /// `matches[i]` is the match count of the i-th rule.
    pub matches: Vec<usize>,
}

impl ReplaceReport {
    /// Total number of matches across all rules.
    pub fn total(&self) -> usize {
        self.matches.iter().sum()
    }

    /// Fold another report (e.g. from another page) into this one.
    pub fn merge(&mut self, other: &ReplaceReport) {
        if self.matches.len() < other.matches.len() {
            self.matches.resize(other.matches.len(), 0);
        }
        for (mine, theirs) in self.matches.iter_mut().zip(&other.matches) {
            *mine += theirs;
        }
    }
}

/// Apply `rules` in order; each rule sees the edits of the ones before it.
pub fn apply_rules<C: TextCell>(cells: &mut [C], rules: &[Rule]) -> ReplaceReport {
    ReplaceReport {
        matches: rules.iter().map(|rule| apply_rule(cells, rule)).collect(),
    }
}

/// Apply one rule to the match space and return the number of matches.
///
/// Matches are non-overlapping and leftmost-first. Empty matches are skipped
/// since they address no text.
pub fn apply_rule<C: TextCell>(cells: &mut [C], rule: &Rule) -> usize {
    if cells.is_empty() {
        return 0;
    }
    let buffer: String = cells.iter().map(|cell| cell.text()).collect();
    let mut offsets = CharOffsets::new(&buffer);
    let mut cursor = Cursor::default();
    let mut count = 0;

    for caps in rule.pattern().captures_iter(&buffer) {
        let Some(found) = caps.get(0) else {
            continue;
        };
        if found.start() == found.end() {
            continue;
        }
        let start = offsets.at(found.start());
        let end = offsets.at(found.end());
        let replacement = rule.replacement(&caps);
        cursor.splice(cells, start, end, &replacement);
        count += 1;
    }
    count
}

/// Incremental byte-offset to char-offset conversion for ascending offsets.
struct CharOffsets<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> CharOffsets<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
        }
    }

    fn at(&mut self, byte: usize) -> usize {
        self.chars += self.text[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }
}

/// Position within the cell list, shared by all matches of one rule.
///
/// `start` is the offset of cell `index` in the buffer as it was before any
/// edit by this rule. `delta` is how much the current cell has grown or
/// shrunk from earlier matches in it.
#[derive(Debug, Default)]
struct Cursor {
    index: usize,
    start: usize,
    delta: isize,
}

impl Cursor {
    /// Length of `cell` as seen by the (unedited) buffer.
    fn span(&self, cell: &impl TextCell) -> usize {
        let len = cell.text().chars().count() as isize;
        (len - self.delta).max(0) as usize
    }

    fn splice<C: TextCell>(
        &mut self,
        cells: &mut [C],
        mut from: usize,
        to: usize,
        replacement: &str,
    ) {
        let mut rest = replacement;
        while from < to {
            while let Some(cell) = cells.get(self.index) {
                let span = self.span(cell);
                if self.start + span > from {
                    break;
                }
                self.start += span;
                self.index += 1;
                self.delta = 0;
            }
            let Some(cell) = cells.get_mut(self.index) else {
                break;
            };

            let offset = from - self.start;
            let available = self.span(&*cell) - offset;
            let take = (to - from).min(available);
            let piece = if take < to - from {
                let (head, tail) = split_at_char(rest, take);
                rest = tail;
                head
            } else {
                std::mem::take(&mut rest)
            };

            let text = cell.text();
            let at = (offset as isize + self.delta) as usize;
            let lo = byte_index(text, at);
            let hi = byte_index(text, at + take);
            let mut edited = String::with_capacity(text.len() + piece.len());
            edited.push_str(&text[..lo]);
            edited.push_str(piece);
            edited.push_str(&text[hi..]);
            cell.set_text(edited);

            self.delta += piece.chars().count() as isize - take as isize;
            from += take;
        }
    }
}

fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}

fn split_at_char(text: &str, chars: usize) -> (&str, &str) {
    text.split_at(byte_index(text, chars))
}
