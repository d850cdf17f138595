//! ARPA back-off language model
//!
//! ```text
//! \data\
//! ngram 1=<count>
//! ngram 2=<count>
//!
//! \1-grams:
//! <log10 prob> <w1> [<log10 back-off>]
//!
//! \2-grams:
//! <log10 prob> <w1> <w2> [<log10 back-off>]
//!
//! \end\
//! ```
//!
//! N-grams are stored oldest word first, as written in the file. Contexts
//! passed through [`LanguageModel`] are most-recent-first and get reversed
//! on lookup.

use std::path::Path;

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::errors::{LatticeError, Result};
use crate::shared::models::WordId;
use crate::shared::ports::{LanguageModel, Vocabulary};
use crate::shared::utils::log_prob::{LogP, LOG_P_ONE, LOG_P_ZERO};

/// Probabilities at or below this are read as zero
const ARPA_LOG_ZERO: f64 = -99.0;

#[derive(Debug, Clone, Copy)]
struct NgramEntry {
    prob: LogP,
    backoff: Option<LogP>,
}

#[derive(Debug, Clone)]
pub struct ArpaModel {
    order: usize,
    ngrams: AHashMap<Vec<WordId>, NgramEntry>,
    unknown: Option<WordId>,
}

fn parse_log(line: usize, token: &str) -> Result<LogP> {
    let value: f64 = token
        .parse()
        .map_err(|_| LatticeError::parse(line, format!("expected log probability, found '{}'", token)))?;
    Ok(if value <= ARPA_LOG_ZERO { LOG_P_ZERO } else { value })
}

/// Oldest-first n-gram for `word` after the first `len` words of `context`
fn ngram_key(word: WordId, context: &[WordId], len: usize) -> Vec<WordId> {
    let mut key: Vec<WordId> = context[..len].iter().rev().copied().collect();
    key.push(word);
    key
}

impl ArpaModel {
    /// Parse ARPA text, adding every word to `vocab`
    pub fn parse(text: &str, vocab: &mut dyn Vocabulary) -> Result<Self> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

        loop {
            match lines.next() {
                Some((_, "\\data\\")) => break,
                Some(_) => continue,
                None => return Err(LatticeError::parse(1, "missing \\data\\ section")),
            }
        }

        let mut declared: Vec<usize> = Vec::new();
        let mut current: Option<usize> = None;
        let mut ngrams = AHashMap::new();
        let mut seen: Vec<usize> = Vec::new();
        let mut ended = false;

        for (number, line) in lines {
            if line.is_empty() {
                continue;
            }
            if line == "\\end\\" {
                ended = true;
                break;
            }
            if let Some(spec) = line.strip_prefix("ngram ") {
                if current.is_some() {
                    return Err(LatticeError::parse(number, "n-gram count after n-gram data"));
                }
                let (n, count) = spec
                    .split_once('=')
                    .ok_or_else(|| LatticeError::parse(number, format!("malformed count line '{}'", line)))?;
                let n: usize = n
                    .trim()
                    .parse()
                    .map_err(|_| LatticeError::parse(number, format!("bad n-gram order '{}'", n)))?;
                let count: usize = count
                    .trim()
                    .parse()
                    .map_err(|_| LatticeError::parse(number, format!("bad n-gram count '{}'", count)))?;
                if n != declared.len() + 1 {
                    return Err(LatticeError::parse(number, format!("n-gram order {} out of sequence", n)));
                }
                declared.push(count);
                continue;
            }
            if let Some(header) = line.strip_prefix('\\').and_then(|l| l.strip_suffix("-grams:")) {
                let n: usize = header
                    .parse()
                    .map_err(|_| LatticeError::parse(number, format!("bad section header '{}'", line)))?;
                if n == 0 || n > declared.len() {
                    return Err(LatticeError::parse(number, format!("undeclared {}-gram section", n)));
                }
                current = Some(n);
                seen.resize(seen.len().max(n), 0);
                continue;
            }

            let n = current.ok_or_else(|| LatticeError::parse(number, format!("unexpected line '{}'", line)))?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != n + 1 && tokens.len() != n + 2 {
                warn!(line = number, order = n, "skipping malformed n-gram line");
                continue;
            }
            let prob = parse_log(number, tokens[0])?;
            let backoff = match tokens.get(n + 1) {
                Some(token) => Some(parse_log(number, token)?),
                None => None,
            };
            let words: Vec<WordId> = tokens[1..=n].iter().map(|w| vocab.add_or_lookup(w)).collect();
            ngrams.insert(words, NgramEntry { prob, backoff });
            seen[n - 1] += 1;
        }

        if declared.is_empty() {
            return Err(LatticeError::parse(1, "no n-gram counts in \\data\\ section"));
        }
        if !ended {
            warn!("ARPA model has no \\end\\ marker");
        }
        for (i, (&expected, found)) in declared.iter().zip(seen.iter().chain(std::iter::repeat(&0))).enumerate() {
            if expected != *found {
                warn!(order = i + 1, expected, found, "n-gram count mismatch");
            }
        }

        let unknown = vocab.lookup("<unk>").filter(|unk| ngrams.contains_key([*unk].as_slice()));
        debug!(order = declared.len(), ngrams = ngrams.len(), "read ARPA model");
        Ok(Self {
            order: declared.len(),
            ngrams,
            unknown,
        })
    }

    pub fn from_file(path: impl AsRef<Path>, vocab: &mut dyn Vocabulary) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&text, vocab)
    }

    /// Number of stored n-grams of all orders
    pub fn len(&self) -> usize {
        self.ngrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ngrams.is_empty()
    }

    fn max_context(&self, context: &[WordId]) -> usize {
        context.len().min(self.order.saturating_sub(1))
    }
}

impl LanguageModel for ArpaModel {
    fn order(&self) -> usize {
        self.order
    }

    fn word_prob(&self, word: WordId, context: &[WordId]) -> LogP {
        let word = match self.unknown {
            Some(unk) if !self.ngrams.contains_key([word].as_slice()) => unk,
            _ => word,
        };
        let mut backoff = LOG_P_ONE;
        for len in (0..=self.max_context(context)).rev() {
            if let Some(entry) = self.ngrams.get(&ngram_key(word, context, len)) {
                return entry.prob + backoff;
            }
            if len > 0 {
                backoff += self.backoff_weight(&context[..len]);
            }
        }
        LOG_P_ZERO
    }

    fn context_length_used(&self, context: &[WordId]) -> usize {
        (1..=self.max_context(context))
            .rev()
            .find(|&len| {
                let key: Vec<WordId> = context[..len].iter().rev().copied().collect();
                self.ngrams.get(&key).is_some_and(|entry| entry.backoff.is_some())
            })
            .unwrap_or(0)
    }

    fn backoff_weight(&self, context: &[WordId]) -> LogP {
        if context.is_empty() || context.len() >= self.order {
            return LOG_P_ONE;
        }
        let key: Vec<WordId> = context.iter().rev().copied().collect();
        self.ngrams
            .get(&key)
            .and_then(|entry| entry.backoff)
            .unwrap_or(LOG_P_ONE)
    }
}
