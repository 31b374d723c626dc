use crate::editor::Projection;
use crate::tui::theme::Theme;
use ratatui::style::Style;
use ratatui::text::{Line, Span};

/// Single-line text entry with a char-indexed cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Hand back the value and leave the input empty
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let at = self.byte_index(self.cursor - 1);
        self.value.remove(at);
        self.cursor -= 1;
    }

    pub fn delete_forward(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// The value as a line, with the cursor drawn when `focused`
    pub fn line(&self, theme: &Theme, focused: bool) -> Line<'static> {
        let mut builder = LineBuilder::default();
        for (i, ch) in self.value.chars().enumerate() {
            let style = if focused && i == self.cursor {
                theme.normal.patch(theme.cursor)
            } else {
                theme.normal
            };
            builder.push(ch, style);
        }
        if focused && self.cursor == self.value.chars().count() {
            builder.push(' ', theme.cursor);
        }
        builder.finish().into_iter().next().unwrap_or_default()
    }
}

/// Caret over the prompt text plus an optional selection anchor.
///
/// Positions are char offsets and always sit on a char, so the selection
/// `[min, max]` includes the char under the caret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptCursor {
    pub position: usize,
    pub anchor: Option<usize>,
}

impl PromptCursor {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn move_left(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    pub fn move_right(&mut self, len: usize) {
        self.position = (self.position + 1).min(len.saturating_sub(1));
    }

    pub fn move_up(&mut self, text: &str) {
        let lines = line_spans(text);
        let row = row_of(&lines, self.position);
        if row > 0 {
            self.position = column_in(&lines, row - 1, self.position - lines[row].0);
        }
    }

    pub fn move_down(&mut self, text: &str) {
        let lines = line_spans(text);
        let row = row_of(&lines, self.position);
        if row + 1 < lines.len() {
            let target = column_in(&lines, row + 1, self.position - lines[row].0);
            self.position = target.min(text.chars().count().saturating_sub(1));
        }
    }

    /// Start a selection at the caret, or drop the one in progress
    pub fn toggle_mark(&mut self) {
        self.anchor = match self.anchor {
            Some(_) => None,
            None => Some(self.position),
        };
    }

    /// The marked span as `[start, end)`, clamped to `len`
    pub fn selection(&self, len: usize) -> Option<(usize, usize)> {
        let anchor = self.anchor?;
        let start = anchor.min(self.position);
        let end = (anchor.max(self.position) + 1).min(len);
        (start < end).then_some((start, end))
    }
}

/// `(start, end)` char offsets of each line, `end` excluding the newline
fn line_spans(text: &str) -> Vec<(usize, usize)> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut index = 0;
    for ch in text.chars() {
        if ch == '\n' {
            lines.push((start, index));
            start = index + 1;
        }
        index += 1;
    }
    lines.push((start, index));
    lines
}

fn row_of(lines: &[(usize, usize)], position: usize) -> usize {
    lines
        .iter()
        .rposition(|(start, _)| *start <= position)
        .unwrap_or(0)
}

fn column_in(lines: &[(usize, usize)], row: usize, column: usize) -> usize {
    let (start, end) = lines[row];
    start + column.min(end - start)
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    current: String,
    style: Style,
}

impl LineBuilder {
    fn push(&mut self, ch: char, style: Style) {
        if style != self.style {
            self.flush();
            self.style = style;
        }
        self.current.push(ch);
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let text = std::mem::take(&mut self.current);
            self.spans.push(Span::styled(text, self.style));
        }
    }

    fn break_line(&mut self) {
        self.flush();
        self.lines.push(Line::from(std::mem::take(&mut self.spans)));
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.break_line();
        self.lines
    }
}

/// Styled lines for the prompt: suggestion highlights, then the selection, then the caret
pub fn prompt_lines(
    projection: Projection<'_>,
    theme: &Theme,
    selection: Option<(usize, usize)>,
    cursor: Option<usize>,
) -> Vec<Line<'static>> {
    let mut builder = LineBuilder::default();
    let mut end = 0;

    for segment in projection {
        let base = if segment.is_highlight() {
            theme.highlight
        } else {
            theme.normal
        };

        for (offset, ch) in segment.text.chars().enumerate() {
            let index = segment.start + offset;
            let mut style = base;
            if selection.is_some_and(|(from, to)| from <= index && index < to) {
                style = theme.selection;
            }
            let on_cursor = cursor == Some(index);
            if on_cursor {
                style = style.patch(theme.cursor);
            }

            if ch == '\n' {
                if on_cursor {
                    builder.push(' ', style);
                }
                builder.break_line();
            } else {
                builder.push(ch, style);
            }
        }
        end = end.max(segment.end);
    }

    if cursor == Some(end) {
        builder.push(' ', theme.cursor);
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SuggestionEditor;

    #[test]
    fn test_text_input_multibyte_editing() {
        let mut input = TextInput::new("naïve");
        input.move_left();
        input.move_left();
        input.delete_char();
        assert_eq!(input.value(), "nave");
        input.insert_char('ï');
        input.insert_char('!');
        assert_eq!(input.value(), "naï!ve");
        assert_eq!(input.cursor(), 4);
    }

    #[test]
    fn test_text_input_bounds() {
        let mut input = TextInput::default();
        input.delete_char();
        input.move_left();
        input.delete_forward();
        assert!(input.is_empty());

        input.insert_char('a');
        input.move_right();
        assert_eq!(input.cursor(), 1);
        input.move_home();
        input.delete_forward();
        assert!(input.is_empty());
    }

    #[test]
    fn test_text_input_take() {
        let mut input = TextInput::new("poem");
        assert_eq!(input.take(), "poem");
        assert!(input.is_empty());
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn test_cursor_selection_is_inclusive() {
        let mut cursor = PromptCursor::default();
        assert_eq!(cursor.selection(10), None);

        cursor.position = 8;
        cursor.toggle_mark();
        for _ in 0..4 {
            cursor.move_right(26);
        }
        assert_eq!(cursor.selection(26), Some((8, 13)));

        cursor.toggle_mark();
        assert_eq!(cursor.selection(26), None);
    }

    #[test]
    fn test_cursor_selection_backwards() {
        let mut cursor = PromptCursor {
            position: 5,
            anchor: None,
        };
        cursor.toggle_mark();
        cursor.move_left();
        cursor.move_left();
        assert_eq!(cursor.selection(10), Some((3, 6)));
    }

    #[test]
    fn test_cursor_stays_on_text() {
        let mut cursor = PromptCursor::default();
        cursor.move_left();
        assert_eq!(cursor.position, 0);
        cursor.move_right(0);
        assert_eq!(cursor.position, 0);
        cursor.position = 2;
        cursor.move_right(3);
        assert_eq!(cursor.position, 2);
    }

    #[test]
    fn test_cursor_vertical_movement() {
        let text = "Role: writer\nTask: poem\nOk";
        let mut cursor = PromptCursor {
            position: 10,
            anchor: None,
        };

        cursor.move_down(text);
        // "Task: poem" starts at 13 and is 10 chars long
        assert_eq!(cursor.position, 23);

        cursor.move_down(text);
        assert_eq!(cursor.position, 25);

        cursor.move_up(text);
        assert_eq!(cursor.position, 14);

        cursor.move_up(text);
        cursor.move_up(text);
        assert_eq!(cursor.position, 1);
    }

    fn spans(line: &Line<'_>) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_prompt_lines_styles_highlights() {
        let theme = Theme::dark();
        let mut editor = SuggestionEditor::new("Write a story about a dog.");
        editor.select_range(8, 13);
        editor.propose_suggestion("poem");

        let lines = prompt_lines(editor.render_projection(), &theme, None, None);
        assert_eq!(lines.len(), 1);
        assert_eq!(spans(&lines[0]), vec!["Write a ", "story", " about a dog."]);
        assert_eq!(lines[0].spans[1].style, theme.highlight);
    }

    #[test]
    fn test_prompt_lines_selection_and_cursor() {
        let theme = Theme::dark();
        let editor = SuggestionEditor::new("one\ntwo");

        let lines = prompt_lines(editor.render_projection(), &theme, Some((4, 6)), Some(5));
        assert_eq!(lines.len(), 2);
        assert_eq!(spans(&lines[0]), vec!["one"]);
        assert_eq!(spans(&lines[1]), vec!["t", "w", "o"]);
        assert_eq!(lines[1].spans[0].style, theme.selection);
        assert_eq!(lines[1].spans[1].style, theme.selection.patch(theme.cursor));
        assert_eq!(lines[1].spans[2].style, theme.normal);
    }

    #[test]
    fn test_prompt_lines_cursor_on_empty_text() {
        let theme = Theme::dark();
        let editor = SuggestionEditor::new("");
        let lines = prompt_lines(editor.render_projection(), &theme, None, Some(0));
        assert_eq!(spans(&lines[0]), vec![" "]);
    }

    #[test]
    fn test_input_line_shows_cursor_only_when_focused() {
        let theme = Theme::dark();
        let input = TextInput::new("hi");
        assert_eq!(spans(&input.line(&theme, true)), vec!["hi", " "]);
        assert_eq!(spans(&input.line(&theme, false)), vec!["hi"]);
    }
}
