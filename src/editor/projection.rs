use super::HighlightRange;

/// What a display segment is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Plain,
    Highlight { color_tag: &'static str },
}

/// One run of the rendered prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
    /// Char offset of the first char of the run
    pub start: usize,
    /// Char offset one past the last char of the run
    pub end: usize,
}

impl Segment<'_> {
    pub fn is_highlight(&self) -> bool {
        matches!(self.kind, SegmentKind::Highlight { .. })
    }
}

/// Lazy walk over the base text that alternates plain and highlighted runs.
///
/// Ranges are visited in ascending `start` order (stable, so ties keep insertion
/// order). Each range emits the plain gap before it and then its own slice; the
/// cursor jumps to the range's end. Overlapping ranges are not merged, so the
/// concatenation only reproduces the text when the ranges are disjoint.
///
/// The iterator is `Clone`, so a projection can be replayed from any point.
#[derive(Debug, Clone)]
pub struct Projection<'a> {
    text: &'a str,
    len: usize,
    ranges: Vec<HighlightRange>,
    next_range: usize,
    cursor: usize,
    pending: Option<HighlightRange>,
    finished: bool,
}

impl<'a> Projection<'a> {
    pub(crate) fn new(text: &'a str, len: usize, highlights: &[HighlightRange]) -> Self {
        let mut ranges = highlights.to_vec();
        // sort_by_key is stable
        ranges.sort_by_key(|range| range.start);

        Self {
            text,
            len,
            ranges,
            next_range: 0,
            cursor: 0,
            pending: None,
            finished: false,
        }
    }

    /// Join every run back into a single string
    pub fn concat(self) -> String {
        self.map(|segment| segment.text).collect()
    }

    fn plain(&self, start: usize, end: usize) -> Segment<'a> {
        Segment {
            kind: SegmentKind::Plain,
            text: char_slice(self.text, start, end),
            start,
            end,
        }
    }
}

impl<'a> Iterator for Projection<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(range) = self.pending.take() {
            let start = range.start.min(self.len);
            let end = range.end.min(self.len).max(start);
            self.cursor = range.end;

            return Some(Segment {
                kind: SegmentKind::Highlight {
                    color_tag: range.color_tag,
                },
                text: char_slice(self.text, start, end),
                start,
                end,
            });
        }

        if let Some(range) = self.ranges.get(self.next_range).copied() {
            self.next_range += 1;
            self.pending = Some(range);

            if range.start > self.cursor {
                let gap_end = range.start.min(self.len);
                if gap_end > self.cursor {
                    return Some(self.plain(self.cursor, gap_end));
                }
            }

            return self.next();
        }

        if !self.finished {
            self.finished = true;
            if self.cursor < self.len {
                return Some(self.plain(self.cursor, self.len));
            }
        }

        None
    }
}

/// Slice `text` by char offsets, clamping both ends to the text
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let start_byte = byte_offset(text, start);
    let end_byte = byte_offset(text, end.max(start));
    &text[start_byte..end_byte]
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
