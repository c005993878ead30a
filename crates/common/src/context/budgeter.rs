//! Context Budgeter - bounds the prompt context for one query
//!
//! Adapted from window trimming against a token budget: fragments are
//! appended in priority order until the character budget is exhausted,
//! the last one cut to fit exactly.

use crate::vector::SearchHit;
use serde::{Deserialize, Serialize};

/// Header for text the reader selected in the book
pub const SELECTED_HEADER: &str = "EXPLICITLY SELECTED TEXT FROM BOOK:\n";

/// Header for passages found by similarity search
pub const RETRIEVED_HEADER: &str = "RELEVANT BOOK CONTENT:\n";

const FRAGMENT_SEPARATOR: &str = "\n\n";

/// Smallest budget that leaves room for a labelled selected fragment
pub const MIN_CONTEXT_LENGTH: usize = SELECTED_HEADER.len() + FRAGMENT_SEPARATOR.len();

/// Context handed to the generator when nothing usable was found
pub const NO_CONTEXT_SENTINEL: &str = "NO RELEVANT CONTENT FOUND IN THE BOOK FOR THIS QUESTION.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Selected,
    Retrieved,
}

impl FragmentKind {
    fn header(&self) -> &'static str {
        match self {
            FragmentKind::Selected => SELECTED_HEADER,
            FragmentKind::Retrieved => RETRIEVED_HEADER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFragment {
    pub kind: FragmentKind,
    pub text: String,
    pub truncated: bool,
    /// Rendered under its header; unset only for selected text in a
    /// budget too small to hold the header
    pub labelled: bool,
}

impl ContextFragment {
    fn rendered_len(&self) -> usize {
        let text_chars = self.text.chars().count();
        if self.labelled {
            fragment_len(self.kind, text_chars)
        } else {
            text_chars
        }
    }
}

fn fragment_len(kind: FragmentKind, text_chars: usize) -> usize {
    kind.header().chars().count() + text_chars + FRAGMENT_SEPARATOR.len()
}

/// Budgeted context for a single query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    /// Selected fragment first (if any), then retrieved fragments by rank
    pub fragments: Vec<ContextFragment>,

    /// Hits whose text made it into the bundle, in inclusion order
    pub sources: Vec<SearchHit>,

    /// Rendered length in characters
    pub length: usize,
}

impl ContextBundle {
    /// True when no fragment was collected and the sentinel will be rendered
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Highest-ranked included hit
    pub fn top_hit(&self) -> Option<&SearchHit> {
        self.sources.first()
    }

    /// Concatenate fragments under their headers, or the sentinel when empty
    pub fn render(&self) -> String {
        if self.fragments.is_empty() {
            return NO_CONTEXT_SENTINEL.to_string();
        }

        let mut out = String::with_capacity(self.length);
        for fragment in &self.fragments {
            if fragment.labelled {
                out.push_str(fragment.kind.header());
                out.push_str(&fragment.text);
                out.push_str(FRAGMENT_SEPARATOR);
            } else {
                out.push_str(&fragment.text);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ContextBudgeter {
    max_length: usize,
}

impl ContextBudgeter {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Build the bundle for `explicit_text` plus `ranked_hits` (best first).
    ///
    /// Selected text is always kept whole and consumes budget; its header
    /// is dropped when the budget cannot hold it, so the rendered length
    /// never exceeds `max_length` plus the selected text. Hits are appended
    /// while they fit; the first one that does not is cut to fill the
    /// remaining budget exactly and ends the scan.
    pub fn budget(&self, explicit_text: Option<&str>, ranked_hits: &[SearchHit]) -> ContextBundle {
        let mut bundle = ContextBundle::default();

        if let Some(text) = explicit_text.map(str::trim).filter(|t| !t.is_empty()) {
            let fragment = ContextFragment {
                kind: FragmentKind::Selected,
                text: text.to_string(),
                truncated: false,
                labelled: self.max_length >= MIN_CONTEXT_LENGTH,
            };
            bundle.length += fragment.rendered_len();
            bundle.fragments.push(fragment);
        }

        for hit in ranked_hits {
            let text = hit.text().trim();
            if text.is_empty() {
                continue;
            }

            let remaining = self.max_length.saturating_sub(bundle.length);
            let text_chars = text.chars().count();
            let needed = fragment_len(FragmentKind::Retrieved, text_chars);

            if needed <= remaining {
                bundle.length += needed;
                bundle.fragments.push(ContextFragment {
                    kind: FragmentKind::Retrieved,
                    text: text.to_string(),
                    truncated: false,
                    labelled: true,
                });
                bundle.sources.push(hit.clone());
                continue;
            }

            let overhead = fragment_len(FragmentKind::Retrieved, 0);
            if remaining > overhead {
                let fragment = ContextFragment {
                    kind: FragmentKind::Retrieved,
                    text: text.chars().take(remaining - overhead).collect(),
                    truncated: true,
                    labelled: true,
                };
                bundle.length += fragment.rendered_len();
                bundle.fragments.push(fragment);
                bundle.sources.push(hit.clone());
            }
            break;
        }

        tracing::debug!(
            fragments = bundle.fragments.len(),
            sources = bundle.sources.len(),
            length = bundle.length,
            max_length = self.max_length,
            "Context budgeted"
        );

        bundle
    }
}

/// Assemble the prompt context string for `explicit_text` and `ranked_hits`
pub fn assemble(explicit_text: Option<&str>, ranked_hits: &[SearchHit], max_length: usize) -> String {
    ContextBudgeter::new(max_length)
        .budget(explicit_text, ranked_hits)
        .render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::DocumentChunk;

    fn hit(text: &str, score: f32) -> SearchHit {
        SearchHit {
            chunk: DocumentChunk {
                text: text.to_string(),
                source_doc_id: "doc".to_string(),
                section: "main".to_string(),
                title: "Doc".to_string(),
            },
            score,
            vector_id: format!("v-{}", score),
        }
    }

    #[test]
    fn test_empty_inputs_render_sentinel() {
        assert_eq!(assemble(None, &[], 4096), NO_CONTEXT_SENTINEL);
        assert_eq!(
            assemble(Some("   "), &[hit(" \n ", 0.9)], 4096),
            NO_CONTEXT_SENTINEL
        );
    }

    #[test]
    fn test_selected_text_comes_first_and_is_labelled() {
        let context = assemble(
            Some("Actuators convert energy into motion."),
            &[hit("Servo motors are common actuators.", 0.8)],
            4096,
        );

        let selected_at = context.find(SELECTED_HEADER).unwrap();
        let retrieved_at = context.find(RETRIEVED_HEADER).unwrap();
        assert!(selected_at < retrieved_at);
        assert!(context.contains("Actuators convert energy into motion."));
        assert!(context.contains("Servo motors are common actuators."));
    }

    #[test]
    fn test_selected_text_is_never_truncated() {
        let selected = "s".repeat(500);
        let bundle = ContextBudgeter::new(100).budget(Some(&selected), &[hit("more", 0.5)]);

        assert_eq!(bundle.fragments.len(), 1);
        assert_eq!(bundle.fragments[0].text, selected);
        assert!(bundle.sources.is_empty());
    }

    #[test]
    fn test_last_hit_is_cut_to_fill_budget() {
        let max = 120;
        let hits = vec![hit(&"a".repeat(40), 0.9), hit(&"b".repeat(200), 0.8), hit("never", 0.7)];
        let bundle = ContextBudgeter::new(max).budget(None, &hits);

        assert_eq!(bundle.fragments.len(), 2);
        assert!(!bundle.fragments[0].truncated);
        assert!(bundle.fragments[1].truncated);
        assert_eq!(bundle.length, max);
        assert_eq!(bundle.render().chars().count(), max);
        assert_eq!(bundle.sources.len(), 2);
    }

    #[test]
    fn test_rendered_length_stays_within_budget() {
        let hits: Vec<SearchHit> = (0..10).map(|i| hit(&"y".repeat(97), i as f32)).collect();

        for selected in ["x", "selected passage", &"x".repeat(300)] {
            for max in [0, 1, 10, 20, 37, 38, 64, 200, 1000, 5000] {
                let context = assemble(Some(selected), &hits, max);
                assert!(
                    context.chars().count() <= max + selected.chars().count(),
                    "max={} selected={} len={}",
                    max,
                    selected.len(),
                    context.chars().count()
                );
            }
        }
    }

    #[test]
    fn test_tiny_budget_keeps_selected_text_unlabelled() {
        let context = assemble(Some("x"), &[], 20);
        assert_eq!(context, "x");

        let bundle = ContextBudgeter::new(MIN_CONTEXT_LENGTH).budget(Some("x"), &[hit("more", 0.4)]);
        assert!(bundle.fragments[0].labelled);
        assert_eq!(bundle.render(), format!("{}x\n\n", SELECTED_HEADER));
        assert!(bundle.sources.is_empty());
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let urdu = "کتاب".repeat(50);
        let bundle = ContextBudgeter::new(60).budget(None, &[hit(&urdu, 0.9)]);

        assert_eq!(bundle.fragments.len(), 1);
        assert_eq!(bundle.render().chars().count(), 60);
    }

    #[test]
    fn test_budget_too_small_for_header_stops() {
        let bundle = ContextBudgeter::new(10).budget(None, &[hit("anything", 0.9)]);
        assert!(bundle.is_empty());
        assert_eq!(bundle.render(), NO_CONTEXT_SENTINEL);
    }

    #[test]
    fn test_whitespace_hits_are_skipped() {
        let bundle = ContextBudgeter::new(4096).budget(None, &[hit("  ", 0.9), hit("real", 0.5)]);
        assert_eq!(bundle.sources.len(), 1);
        assert_eq!(bundle.top_hit().unwrap().text(), "real");
    }
}
