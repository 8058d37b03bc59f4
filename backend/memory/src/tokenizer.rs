//! Tokenizers used for context-window accounting.
//!
//! A tokenizer maps text to an ordered sequence of tokens; the token count of a
//! text is the length of that sequence.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Text to token sequence.
pub trait Tokenizer: Send + Sync + fmt::Debug {
    /// Tokenizer name, for logs.
    fn name(&self) -> &'static str;

    /// Split `text` into tokens, in order.
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str>;

    /// Number of tokens in `text`.
    fn count_tokens(&self, text: &str) -> usize {
        self.tokenize(text).len()
    }
}

/// One token per whitespace-delimited word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn name(&self) -> &'static str {
        "whitespace"
    }

    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_whitespace().collect()
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Pre-tokenization pattern in the style of cl100k: contractions, words with
/// one leading non-letter, digit runs of up to three, punctuation runs, and
/// whitespace.
static PIECE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i:'s|'t|'re|'ve|'m|'ll|'d)|[^\r\n\p{L}\p{N}]?\p{L}+|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+",
    )
    .unwrap()
});

/// Sub-word tokenizer approximating GPT-style byte-pair encodings.
///
/// Text is split with a cl100k-like pattern; pieces longer than
/// `max_piece_chars` are cut into chunks of that many characters, standing in
/// for the merges a trained vocabulary would apply.
#[derive(Debug, Clone, Copy)]
pub struct SubwordTokenizer {
    max_piece_chars: usize,
}

impl SubwordTokenizer {
    pub const DEFAULT_MAX_PIECE_CHARS: usize = 6;

    pub fn new() -> Self {
        Self {
            max_piece_chars: Self::DEFAULT_MAX_PIECE_CHARS,
        }
    }

    pub fn with_max_piece_chars(max_piece_chars: usize) -> Self {
        Self {
            max_piece_chars: max_piece_chars.max(1),
        }
    }

    fn push_chunks<'a>(&self, piece: &'a str, out: &mut Vec<&'a str>) {
        let mut start = 0;
        let mut chars = 0;
        for (idx, _) in piece.char_indices() {
            if chars == self.max_piece_chars {
                out.push(&piece[start..idx]);
                start = idx;
                chars = 0;
            }
            chars += 1;
        }
        if start < piece.len() {
            out.push(&piece[start..]);
        }
    }
}

impl Default for SubwordTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for SubwordTokenizer {
    fn name(&self) -> &'static str {
        "subword"
    }

    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut tokens = Vec::new();
        for piece in PIECE_PATTERN.find_iter(text) {
            self.push_chunks(piece.as_str(), &mut tokens);
        }
        tokens
    }
}
