//! Heuristic part-of-speech tagging over Unicode word boundaries.
//!
//! Closed word classes come from a static lexicon; open classes fall back
//! to suffix heuristics, and anything unrecognized tags as a noun. The
//! output only needs to be good enough to drive chunk grouping; this is a
//! rule tagger, not a model.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use unicode_segmentation::UnicodeSegmentation;

/// Part-of-speech classes the chunker distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    Determiner,
    Preposition,
    Pronoun,
    Conjunction,
    Modal,
    Verb,
    Adverb,
    Adjective,
    Noun,
    Number,
    Interjection,
    Punct,
}

/// A token with its assigned part of speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedWord {
    pub text: String,
    pub pos: Pos,
}

const DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "my", "your", "his", "her", "its", "our",
    "their", "some", "any", "no", "each", "every", "another",
];

const PREPOSITIONS: &[&str] = &[
    "of", "in", "on", "at", "by", "for", "with", "about", "against", "between", "into", "through",
    "during", "before", "after", "above", "below", "to", "from", "up", "down", "out", "off",
    "over", "under", "near", "across", "around", "behind", "beside", "beyond", "inside", "onto",
    "outside", "toward", "upon", "within", "without",
];

const PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "us", "them", "who", "whom", "what",
    "which", "someone", "something", "anyone", "anything", "everyone", "everything", "nobody",
    "nothing", "myself", "yourself", "himself", "herself", "itself", "ourselves", "themselves",
];

const CONJUNCTIONS: &[&str] = &[
    "and", "but", "or", "nor", "so", "yet", "because", "although", "while", "if", "unless",
    "until", "since", "whereas", "when",
];

const MODALS: &[&str] = &[
    "can", "could", "will", "would", "shall", "should", "may", "might", "must",
];

const VERBS: &[&str] = &[
    "am", "is", "are", "was", "were", "be", "been", "being", "has", "have", "had", "do", "does",
    "did", "go", "goes", "went", "gone", "get", "gets", "got", "stood", "stand", "stands", "say",
    "says", "said", "see", "sees", "saw", "seen", "know", "knows", "knew", "think", "thinks",
    "thought", "make", "makes", "made", "take", "takes", "took", "come", "comes", "came", "want",
    "wants", "like", "likes", "look", "looks", "use", "uses", "find", "finds", "found", "give",
    "gives", "gave", "tell", "tells", "told", "work", "works", "call", "calls", "try", "tries",
    "ask", "asks", "need", "needs", "feel", "feels", "felt", "become", "becomes", "became",
    "leave", "leaves", "left", "put", "puts", "mean", "means", "meant", "keep", "keeps", "kept",
    "let", "lets", "begin", "begins", "began", "seem", "seems", "help", "helps", "talk", "talks",
    "turn", "turns", "start", "starts", "show", "shows", "showed", "hear", "hears", "heard",
    "play", "plays", "run", "runs", "ran", "move", "moves", "live", "lives", "believe",
    "believes", "bring", "brings", "brought", "happen", "happens", "write", "writes", "wrote",
    "sit", "sits", "sat", "lose", "loses", "lost", "pay", "pays", "paid", "meet", "meets", "met",
];

const ADVERBS: &[&str] = &[
    "very", "not", "never", "always", "often", "sometimes", "really", "just", "still", "too",
    "also", "quite", "perhaps", "maybe", "soon", "now", "then", "here", "there", "again",
    "already", "almost", "away", "back", "even", "ever", "far", "instead", "later", "once",
    "only", "rather", "together", "today", "well",
];

const ADJECTIVES: &[&str] = &[
    "good", "bad", "old", "new", "great", "big", "small", "little", "long", "short", "high",
    "low", "silent", "dark", "bright", "cold", "hot", "warm", "happy", "sad", "young", "early",
    "late", "important", "different", "large", "next", "last", "same", "able", "best", "better",
    "free", "full", "whole", "real", "sure", "strange", "quiet",
];

const INTERJECTIONS: &[&str] = &[
    "oh", "hey", "wow", "yeah", "hi", "hello", "hmm", "ah", "ugh", "ouch", "alas",
];

static LEXICON: Lazy<HashMap<&'static str, Pos>> = Lazy::new(|| {
    let classes: &[(&[&str], Pos)] = &[
        (DETERMINERS, Pos::Determiner),
        (PREPOSITIONS, Pos::Preposition),
        (PRONOUNS, Pos::Pronoun),
        (CONJUNCTIONS, Pos::Conjunction),
        (MODALS, Pos::Modal),
        (VERBS, Pos::Verb),
        (ADVERBS, Pos::Adverb),
        (ADJECTIVES, Pos::Adjective),
        (INTERJECTIONS, Pos::Interjection),
    ];
    let mut map = HashMap::new();
    for (words, pos) in classes {
        for word in *words {
            map.insert(*word, *pos);
        }
    }
    map
});

/// Split text into tokens: Unicode word bounds with whitespace dropped and
/// contractions split treebank-style (`it's` → `it` + `'s`, `don't` →
/// `do` + `n't`).
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for piece in text.split_word_bounds() {
        if piece.trim().is_empty() {
            continue;
        }
        push_token(piece, &mut tokens);
    }
    tokens
}

fn push_token(piece: &str, tokens: &mut Vec<String>) {
    if let Some(idx) = piece.rfind('\'') {
        if idx > 0 && idx < piece.len() - 1 {
            let split_at = if piece[..idx].ends_with('n') && piece[idx + 1..].eq_ignore_ascii_case("t")
            {
                idx - 1
            } else {
                idx
            };
            tokens.push(piece[..split_at].to_string());
            tokens.push(piece[split_at..].to_string());
            return;
        }
    }
    tokens.push(piece.to_string());
}

/// Tokenize `text` and tag every token.
pub fn tag(text: &str) -> Vec<TaggedWord> {
    tokenize(text)
        .into_iter()
        .map(|token| {
            let pos = tag_word(&token);
            TaggedWord { text: token, pos }
        })
        .collect()
}

fn tag_word(word: &str) -> Pos {
    if word.chars().all(|c| !c.is_alphanumeric()) {
        return Pos::Punct;
    }
    if word.chars().next().is_some_and(|c| c.is_ascii_digit())
        && word
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '%'))
    {
        return Pos::Number;
    }
    let lower = word.to_lowercase();
    if let Some(pos) = LEXICON.get(lower.as_str()) {
        return *pos;
    }
    suffix_tag(&lower)
}

fn suffix_tag(lower: &str) -> Pos {
    if lower.len() > 3 && lower.ends_with("ly") {
        return Pos::Adverb;
    }
    if lower.len() > 4 && (lower.ends_with("ing") || lower.ends_with("ize") || lower.ends_with("ise"))
    {
        return Pos::Verb;
    }
    if lower.len() > 3 && lower.ends_with("ed") {
        return Pos::Verb;
    }
    for suffix in ["ful", "ous", "ive", "able", "ible", "less", "ish", "est"] {
        if lower.len() > suffix.len() + 2 && lower.ends_with(suffix) {
            return Pos::Adjective;
        }
    }
    Pos::Noun
}
