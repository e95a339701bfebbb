//! Group tagged tokens into phrase-level chunks.
//!
//! Consecutive tokens of the same phrase family merge into one chunk.
//! Tokens that fit no phrase family (conjunctions, interjections,
//! punctuation) become one `O` chunk each and get filtered out upstream.

use std::fmt;

use super::tagger::{Pos, TaggedWord};

/// Phrase-level chunk tag, rendered as treebank-style codes in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkTag {
    NounPhrase,
    VerbPhrase,
    PrepPhrase,
    AdjPhrase,
    AdvPhrase,
    Other,
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ChunkTag::NounPhrase => "NP",
            ChunkTag::VerbPhrase => "VP",
            ChunkTag::PrepPhrase => "PP",
            ChunkTag::AdjPhrase => "ADJP",
            ChunkTag::AdvPhrase => "ADVP",
            ChunkTag::Other => "O",
        };
        f.write_str(code)
    }
}

/// A tagged group of consecutive tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub tag: ChunkTag,
    pub words: Vec<TaggedWord>,
}

impl Chunk {
    /// The chunk's words joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Phrase family a token can extend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run {
    Nominal,
    Verbal,
    Prep,
    Adverb,
    None,
}

fn run_of(pos: Pos) -> Run {
    match pos {
        Pos::Determiner | Pos::Adjective | Pos::Number | Pos::Noun | Pos::Pronoun => Run::Nominal,
        Pos::Modal | Pos::Verb => Run::Verbal,
        Pos::Preposition => Run::Prep,
        Pos::Adverb => Run::Adverb,
        Pos::Conjunction | Pos::Interjection | Pos::Punct => Run::None,
    }
}

fn close_run(chunks: &mut Vec<Chunk>, current: &mut Vec<TaggedWord>, run: Run) {
    if current.is_empty() {
        return;
    }
    let words = std::mem::take(current);
    let tag = match run {
        Run::Nominal => {
            // a nominal run with no head noun is adjectival ("silent")
            if words
                .iter()
                .any(|w| matches!(w.pos, Pos::Noun | Pos::Pronoun | Pos::Number))
            {
                ChunkTag::NounPhrase
            } else if words.iter().any(|w| w.pos == Pos::Adjective) {
                ChunkTag::AdjPhrase
            } else {
                ChunkTag::NounPhrase
            }
        }
        Run::Verbal => ChunkTag::VerbPhrase,
        Run::Prep => ChunkTag::PrepPhrase,
        Run::Adverb => ChunkTag::AdvPhrase,
        Run::None => ChunkTag::Other,
    };
    chunks.push(Chunk { tag, words });
}

/// Group a tagged sentence into ordered chunks.
pub fn chunk(words: &[TaggedWord]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current: Vec<TaggedWord> = Vec::new();
    let mut run = Run::None;

    for word in words {
        let next = run_of(word.pos);
        if next != run && !current.is_empty() {
            close_run(&mut chunks, &mut current, run);
        }
        run = next;
        current.push(word.clone());
        if run == Run::None {
            close_run(&mut chunks, &mut current, run);
        }
    }
    close_run(&mut chunks, &mut current, run);
    chunks
}
