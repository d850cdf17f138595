//! Test fixtures: PFSG texts, ARPA models and a table-driven language model

use std::collections::HashMap;

use lattice_core::shared::models::WordId;
use lattice_core::shared::ports::LanguageModel;
use lattice_core::shared::utils::log_prob::LogP;

/// Two single-word alternatives "A" (intlog -500) and "B" (intlog -2000)
pub const TWO_ALTERNATIVES: &str = "\
name two
nodes 4 NULL A B NULL
initial 0
final 3
transitions 4
0 1 -500
0 2 -2000
1 3 0
2 3 0
";

/// Word, pause, word with in-weight -100 and out-weight -50 around the pause
pub const PAUSE_BETWEEN_WORDS: &str = "\
name pause
nodes 5 NULL A -pau- B NULL
initial 0
final 4
transitions 4
0 1 0
1 2 -100
2 3 -50
3 4 0
";

/// Top-level graph referring to a sub-graph by label
pub const NESTED: &str = "\
name sentence
nodes 4 NULL hello NAME NULL
initial 0
final 3
transitions 3
0 1 0
1 2 -200
2 3 0

name NAME
nodes 4 NULL alice bob NULL
initial 0
final 3
transitions 4
0 1 -600
0 2 -800
1 3 0
2 3 0
";

/// Bigram ARPA model over `a b </s>`
pub const BIGRAM_ARPA: &str = "\
\\data\\
ngram 1=5
ngram 2=4

\\1-grams:
-99 <s> -0.3
-1.0 </s>
-0.6 a -0.2
-0.6 b -0.2
-2.0 <unk>

\\2-grams:
-0.1 <s> a
-0.4 a b
-0.5 b a
-0.2 b </s>

\\end\\
";

/// Language model answering from an explicit table of
/// `(word, most-recent-first context) -> log10 prob`; unknown entries back
/// off to shorter contexts at no cost and finally to `floor`.
pub struct TableLm {
    pub order: usize,
    pub floor: LogP,
    pub table: HashMap<(WordId, Vec<WordId>), LogP>,
}

impl TableLm {
    pub fn new(order: usize, floor: LogP) -> Self {
        Self {
            order,
            floor,
            table: HashMap::new(),
        }
    }

    pub fn set(&mut self, word: WordId, context: &[WordId], prob: LogP) -> &mut Self {
        self.table.insert((word, context.to_vec()), prob);
        self
    }
}

impl LanguageModel for TableLm {
    fn order(&self) -> usize {
        self.order
    }

    fn word_prob(&self, word: WordId, context: &[WordId]) -> LogP {
        let longest = context.len().min(self.order - 1);
        (0..=longest)
            .rev()
            .find_map(|len| self.table.get(&(word, context[..len].to_vec())).copied())
            .unwrap_or(self.floor)
    }

    fn context_length_used(&self, context: &[WordId]) -> usize {
        context.len().min(self.order - 1)
    }

    fn backoff_weight(&self, _context: &[WordId]) -> LogP {
        0.0
    }
}
