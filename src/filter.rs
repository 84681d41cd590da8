use std::path::Path;

use crate::error::{GuestbookError, Rejection};

// Deny-list based wish filter. Rejects whole submissions, never redacts.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    words: Vec<String>, // lowercased, non-blank
    max_len: usize,     // in characters
}

impl ContentFilter {
    pub fn new<I, S>(words: I, max_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            // an empty needle would match every wish
            .filter(|w| !w.is_empty())
            .collect();
        Self { words, max_len }
    }

    // Load the deny-list from a JSON array of strings; missing file = empty list
    pub fn load(path: &Path, max_len: usize) -> Result<Self, GuestbookError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "deny-list not found, filtering disabled");
            return Ok(Self::new(Vec::<String>::new(), max_len));
        }

        let raw = std::fs::read_to_string(path).map_err(|source| GuestbookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let words: Vec<String> =
            serde_json::from_str(&raw).map_err(|source| GuestbookError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let filter = Self::new(words, max_len);
        tracing::info!(words = filter.words.len(), "deny-list loaded");
        Ok(filter)
    }

    /// Checks emptiness, then length, then forbidden words. First failure wins.
    /// `text` is expected to be trimmed already.
    pub fn check(&self, text: &str) -> Result<(), Rejection> {
        if text.trim().is_empty() {
            return Err(Rejection::Empty);
        }
        if text.chars().count() > self.max_len {
            return Err(Rejection::TooLong { max: self.max_len });
        }
        let lowered = text.to_lowercase();
        if self.words.iter().any(|w| lowered.contains(w.as_str())) {
            return Err(Rejection::ForbiddenWords);
        }
        Ok(())
    }

    pub fn is_permitted(&self, text: &str) -> bool {
        self.check(text).is_ok()
    }
}
