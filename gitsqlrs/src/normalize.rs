//! Lexical normalization: lowercasing, word tokenization and stopword removal.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CompileError, Result};

/// English stopwords dropped from the token stream.
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
    "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

static STOPWORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOPWORDS.iter().copied().collect());

static WORD: Lazy<std::result::Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\w+"));

/// Lowercased input plus the tokens that carry signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub tokens: Vec<String>,
}

impl Normalized {
    pub fn has_tokens(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// A multi-word cue must appear in the text; a single word must be a whole token.
    pub fn mentions(&self, cue: &str) -> bool {
        if cue.contains(' ') {
            self.text.contains(cue)
        } else {
            self.contains_token(cue)
        }
    }
}

/// Normalize raw input. Never fails: a tokenizer fault yields no tokens.
pub fn normalize(text: &str) -> Normalized {
    let lowered = text.to_lowercase();
    let tokens = match tokenize(&lowered) {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!(error = %e, "tokenizer failed, continuing without tokens");
            Vec::new()
        }
    };
    Normalized {
        text: lowered,
        tokens,
    }
}

fn tokenize(lowered: &str) -> Result<Vec<String>> {
    let word = WORD
        .as_ref()
        .map_err(|e| CompileError::InternalFault(format!("word pattern: {e}")))?;
    Ok(word
        .find_iter(lowered)
        .map(|m| m.as_str())
        .filter(|w| w.chars().all(char::is_alphanumeric))
        .filter(|w| !STOPWORD_SET.contains(w))
        .map(str::to_string)
        .collect())
}
