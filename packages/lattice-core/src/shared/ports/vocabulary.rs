//! Vocabulary port and the default symbol table

use ahash::{AHashMap, AHashSet};

use crate::shared::models::{NodeLabel, WordId};

/// Label written for epsilon nodes in text formats
pub const NULL_LABEL: &str = "NULL";

pub const SENTENCE_START: &str = "<s>";
pub const SENTENCE_END: &str = "</s>";
pub const UNKNOWN_WORD: &str = "<unk>";

/// Word string to id mapping
pub trait Vocabulary {
    fn add_or_lookup(&mut self, word: &str) -> WordId;

    fn lookup(&self, word: &str) -> Option<WordId>;

    fn id_to_string(&self, id: WordId) -> Option<&str>;

    fn sentence_start(&self) -> WordId;

    fn sentence_end(&self) -> WordId;

    fn unknown(&self) -> WordId;

    /// Words that never count as recognition errors (sentence boundaries,
    /// pauses, noise markers)
    fn is_non_event(&self, id: WordId) -> bool {
        id == self.sentence_start() || id == self.sentence_end()
    }

    /// Text form of a node label, `NULL` for epsilon
    fn label_to_string(&self, label: NodeLabel) -> String {
        match label {
            None => NULL_LABEL.to_string(),
            Some(id) => self
                .id_to_string(id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", id)),
        }
    }

    /// Parse a text label; `NULL` maps to epsilon
    fn label_from_str(&mut self, word: &str) -> NodeLabel {
        if word == NULL_LABEL {
            None
        } else {
            Some(self.add_or_lookup(word))
        }
    }
}

/// In-memory symbol table
#[derive(Debug, Clone)]
pub struct SymbolTable {
    words: Vec<String>,
    ids: AHashMap<String, WordId>,
    non_events: AHashSet<WordId>,
    start: WordId,
    end: WordId,
    unknown: WordId,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self {
            words: Vec::new(),
            ids: AHashMap::new(),
            non_events: AHashSet::new(),
            start: 0,
            end: 0,
            unknown: 0,
        };
        table.start = table.add_or_lookup(SENTENCE_START);
        table.end = table.add_or_lookup(SENTENCE_END);
        table.unknown = table.add_or_lookup(UNKNOWN_WORD);
        table
    }

    /// Treat `word` as a non-event (e.g. a pause marker)
    pub fn add_non_event(&mut self, word: &str) -> WordId {
        let id = self.add_or_lookup(word);
        self.non_events.insert(id);
        id
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Ids for a whitespace-separated word string
    pub fn encode(&mut self, text: &str) -> Vec<WordId> {
        text.split_whitespace()
            .map(|w| self.add_or_lookup(w))
            .collect()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary for SymbolTable {
    fn add_or_lookup(&mut self, word: &str) -> WordId {
        if let Some(id) = self.ids.get(word) {
            return *id;
        }
        let id = self.words.len() as WordId;
        self.words.push(word.to_string());
        self.ids.insert(word.to_string(), id);
        id
    }

    fn lookup(&self, word: &str) -> Option<WordId> {
        self.ids.get(word).copied()
    }

    fn id_to_string(&self, id: WordId) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }

    fn sentence_start(&self) -> WordId {
        self.start
    }

    fn sentence_end(&self) -> WordId {
        self.end
    }

    fn unknown(&self) -> WordId {
        self.unknown
    }

    fn is_non_event(&self, id: WordId) -> bool {
        id == self.start || id == self.end || self.non_events.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_words() {
        let vocab = SymbolTable::new();
        assert_eq!(vocab.id_to_string(vocab.sentence_start()), Some("<s>"));
        assert_eq!(vocab.id_to_string(vocab.sentence_end()), Some("</s>"));
        assert_eq!(vocab.lookup("<unk>"), Some(vocab.unknown()));
    }

    #[test]
    fn test_add_or_lookup_is_stable() {
        let mut vocab = SymbolTable::new();
        let a = vocab.add_or_lookup("hello");
        let b = vocab.add_or_lookup("hello");
        assert_eq!(a, b);
        assert_eq!(vocab.len(), 4);
    }

    #[test]
    fn test_labels() {
        let mut vocab = SymbolTable::new();
        assert_eq!(vocab.label_from_str("NULL"), None);
        let label = vocab.label_from_str("word");
        assert_eq!(vocab.label_to_string(label), "word");
        assert_eq!(vocab.label_to_string(None), "NULL");
    }

    #[test]
    fn test_non_events() {
        let mut vocab = SymbolTable::new();
        let pau = vocab.add_non_event("-pau-");
        let word = vocab.add_or_lookup("a");
        assert!(vocab.is_non_event(pau));
        assert!(vocab.is_non_event(vocab.sentence_end()));
        assert!(!vocab.is_non_event(word));
    }
}
