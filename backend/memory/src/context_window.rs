//! Context-window estimation: which trailing words of a text fit a token budget.
//!
//! Scanning from the last word backward, the first word whose tail (that word
//! through the end of the text) tokenizes to more than the budget is the limit
//! word. Words after it fit, words before it fall outside the window.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::tokenizer::{SubwordTokenizer, Tokenizer};

/// Token budget used when none is configured.
pub const DEFAULT_TOKEN_LIMIT: usize = 100;

/// Where a word sits relative to the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WordBudget {
    Within,
    /// First word from the end that pushes the tail over the budget.
    Flagged,
    Outside,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowWord<'a> {
    pub text: &'a str,
    pub budget: WordBudget,
}

/// Result of analysing one text against a budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextWindowReport<'a> {
    pub token_count: usize,
    pub limit: usize,
    pub limit_index: Option<usize>,
    pub words: Vec<WindowWord<'a>>,
}

impl ContextWindowReport<'_> {
    pub fn fits(&self) -> bool {
        self.limit_index.is_none()
    }

    /// The text that fits the window, from the first word after the limit word.
    pub fn visible_words(&self) -> impl Iterator<Item = &str> {
        self.words
            .iter()
            .filter(|w| w.budget == WordBudget::Within)
            .map(|w| w.text)
    }
}

/// Budgets trailing text against a fixed token limit.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    tokenizer: Arc<dyn Tokenizer>,
    limit: usize,
}

impl ContextWindow {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, limit: usize) -> Self {
        Self { tokenizer, limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    pub fn token_count(&self, text: &str) -> usize {
        self.tokenizer.count_tokens(text)
    }

    /// Index of the word that pushes the trailing window over the limit.
    ///
    /// Tails are re-tokenized for every candidate start, so sub-word tokenizers
    /// whose counts are not additive across words are handled exactly. The scan
    /// stops at the first word over the limit.
    pub fn limit_index(&self, text: &str) -> Option<usize> {
        let spans = word_spans(text);
        self.limit_index_in(text, &spans)
    }

    fn limit_index_in(&self, text: &str, spans: &[(usize, usize)]) -> Option<usize> {
        let end = spans.last()?.1;
        spans.iter().enumerate().rev().find_map(|(i, &(start, _))| {
            let tail = &text[start..end];
            (self.tokenizer.count_tokens(tail) > self.limit).then_some(i)
        })
    }

    /// Classify every word of `text` against the budget.
    pub fn analyze<'a>(&self, text: &'a str) -> ContextWindowReport<'a> {
        let spans = word_spans(text);
        let token_count = self.token_count(text);
        let limit_index = self.limit_index_in(text, &spans);

        let words = spans
            .iter()
            .enumerate()
            .map(|(i, &(start, end))| {
                let budget = match limit_index {
                    Some(li) if i == li => WordBudget::Flagged,
                    Some(li) if i < li => WordBudget::Outside,
                    _ => WordBudget::Within,
                };
                WindowWord {
                    text: &text[start..end],
                    budget,
                }
            })
            .collect();

        debug!(
            tokenizer = self.tokenizer.name(),
            token_count,
            limit = self.limit,
            limit_index = ?limit_index,
            "Analyzed context window"
        );

        ContextWindowReport {
            token_count,
            limit: self.limit,
            limit_index,
            words,
        }
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(Arc::new(SubwordTokenizer::new()), DEFAULT_TOKEN_LIMIT)
    }
}

/// Byte ranges of whitespace-delimited words, in order.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, idx));
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}
