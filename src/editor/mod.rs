//! Suggestion editor: a base prompt plus span-anchored replacement suggestions.
//!
//! Offsets are char offsets into the base text. The text is never edited in
//! place; it only changes through [`SuggestionEditor::set_base_text`] or a
//! successful optimize, and both drop every suggestion, so stored offsets are
//! always relative to the current text.

mod projection;

pub use projection::{char_slice, Projection, Segment, SegmentKind};

use crate::llm::PromptService;
use crate::{PromptsmithError, Result};
use serde::{Deserialize, Serialize};

/// The single tag every highlight carries
pub const HIGHLIGHT_COLOR: &str = "suggestion";

/// A span the user picked in the current text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// A proposed replacement for one span of the base text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub original_text: String,
    pub replacement_text: String,
    pub start_index: usize,
    pub end_index: usize,
}

/// Presentational span for a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
    pub color_tag: &'static str,
}

/// Snapshot handed to the optimizer by [`SuggestionEditor::begin_optimize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeRequest {
    pub base: String,
    pub suggestions: Vec<Suggestion>,
    pub guidance: String,
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizeOutcome {
    /// Nothing to send; the text is untouched and no call was made
    Unchanged,
    /// The optimizer's text is the new base
    Rewritten,
}

#[derive(Debug, Clone, Default)]
pub struct SuggestionEditor {
    text: String,
    len: usize,
    selection: Option<Selection>,
    suggestions: Vec<Suggestion>,
    highlights: Vec<HighlightRange>,
    revision: u64,
}

impl SuggestionEditor {
    pub fn new(text: impl Into<String>) -> Self {
        let mut editor = Self::default();
        editor.set_base_text(text);
        editor
    }

    /// Replace the text and drop the selection and every suggestion
    pub fn set_base_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.len = self.text.chars().count();
        self.selection = None;
        self.suggestions.clear();
        self.highlights.clear();
        self.revision += 1;

        tracing::debug!(
            length = self.len,
            revision = self.revision,
            "Base text replaced"
        );
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the text in chars
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when there is nothing worth editing: no text or only whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Bumped on every base text change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn highlights(&self) -> &[HighlightRange] {
        &self.highlights
    }

    /// Select `[start, end)`. Empty or out-of-range spans leave no selection.
    pub fn select_range(&mut self, start: usize, end: usize) -> bool {
        if end <= start || end > self.len {
            tracing::debug!(start, end, length = self.len, "Rejected selection");
            self.selection = None;
            return false;
        }

        let text = char_slice(&self.text, start, end).to_string();
        tracing::debug!(start, end, selected = %text, "User selected text");

        self.selection = Some(Selection { start, end, text });
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Record a replacement for the current selection.
    ///
    /// Returns `true` when a suggestion was added and the editing surface
    /// should close. Without a selection, or with a blank replacement, nothing
    /// changes and `false` is returned.
    pub fn propose_suggestion(&mut self, replacement: &str) -> bool {
        if replacement.trim().is_empty() {
            return false;
        }
        let Some(selection) = self.selection.take() else {
            return false;
        };

        tracing::info!(
            original = %selection.text,
            replacement,
            start = selection.start,
            end = selection.end,
            "User added suggestion"
        );

        self.highlights.push(HighlightRange {
            start: selection.start,
            end: selection.end,
            color_tag: HIGHLIGHT_COLOR,
        });
        self.suggestions.push(Suggestion {
            original_text: selection.text,
            replacement_text: replacement.to_string(),
            start_index: selection.start,
            end_index: selection.end,
        });

        true
    }

    /// Whether `[start, end)` intersects a span that already has a suggestion.
    ///
    /// Purely informational: overlapping suggestions are still accepted.
    pub fn overlaps_existing(&self, start: usize, end: usize) -> bool {
        self.highlights
            .iter()
            .any(|range| start < range.end && range.start < end)
    }

    /// Plain and highlighted runs covering the text end to end
    pub fn render_projection(&self) -> Projection<'_> {
        Projection::new(&self.text, self.len, &self.highlights)
    }

    /// Snapshot what an optimize call needs, or `None` when there are no
    /// suggestions and the guidance is blank.
    pub fn begin_optimize(&self, guidance: &str) -> Option<OptimizeRequest> {
        if self.suggestions.is_empty() && guidance.trim().is_empty() {
            return None;
        }

        Some(OptimizeRequest {
            base: self.text.clone(),
            suggestions: self.suggestions.clone(),
            guidance: guidance.to_string(),
            revision: self.revision,
        })
    }

    /// Install an optimizer result produced for `revision`.
    ///
    /// A result for an older revision is refused and the editor is left as is.
    pub fn complete_optimize(&mut self, revision: u64, rewritten: String) -> Result<()> {
        if revision != self.revision {
            tracing::warn!(
                expected = revision,
                current = self.revision,
                "Discarding stale optimize response"
            );
            return Err(PromptsmithError::StaleResponse {
                expected: revision,
                current: self.revision,
            });
        }

        self.set_base_text(rewritten);
        Ok(())
    }

    /// Send the text, every suggestion and the guidance to the optimizer.
    ///
    /// On failure the text and suggestions are unchanged and the error is
    /// returned.
    pub async fn optimize(
        &mut self,
        service: &dyn PromptService,
        guidance: &str,
    ) -> Result<OptimizeOutcome> {
        let Some(request) = self.begin_optimize(guidance) else {
            tracing::debug!("Nothing to optimize, keeping text");
            return Ok(OptimizeOutcome::Unchanged);
        };

        tracing::info!(
            prompt_length = self.len,
            suggestion_count = request.suggestions.len(),
            has_guidance = !request.guidance.trim().is_empty(),
            "Optimizing prompt with suggestions"
        );

        let rewritten = service
            .optimize_prompt(&request.base, &request.suggestions, &request.guidance)
            .await?;

        self.complete_optimize(request.revision, rewritten)?;
        Ok(OptimizeOutcome::Rewritten)
    }
}
