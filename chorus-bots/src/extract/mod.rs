//! Natural-language prompt extraction.
//!
//! Reduces a raw chat message to a short prompt fragment: pick the longest
//! sentence, tokenize and tag it, group it into phrase chunks, filter out
//! the noise, and pick one surviving chunk at random. Anything that doesn't
//! survive yields an empty fragment; an empty prompt is always acceptable
//! downstream, so nothing in this pipeline is allowed to fail the caller.

pub mod chunker;
pub mod tagger;

use anyhow::Result;
use pragmatic_segmenter::Segmenter;
use rand::Rng;

use chunker::{Chunk, ChunkTag};

/// Message-to-fragment extractor. Owns the sentence segmenter, which is
/// built once at startup; the per-message pipeline cannot fail.
pub struct Extractor {
    segmenter: Segmenter,
}

impl Extractor {
    pub fn new() -> Result<Self> {
        let segmenter =
            Segmenter::new().map_err(|e| anyhow::anyhow!("segmenter init failed: {e:?}"))?;
        Ok(Self { segmenter })
    }

    /// Derive a prompt fragment from `message`. Returns an empty string
    /// when the message offers nothing usable.
    pub fn fragment_from(&self, message: &str, rng: &mut impl Rng) -> String {
        tracing::debug!(message = %message, "extracting prompt");
        let working = self.working_text(message);

        // links make poor prompts
        if working.contains("http") {
            return String::new();
        }

        let tagged = tagger::tag(&working);
        let chunks: Vec<Chunk> = chunker::chunk(&tagged)
            .into_iter()
            .filter(usable_chunk)
            .collect();

        for chunk in &chunks {
            tracing::debug!(tag = %chunk.tag, text = %chunk.text(), "candidate chunk");
        }

        let selected = match chunks.len() {
            0 => return String::new(),
            1 => &chunks[0],
            // the final chunk is out of selection range
            n => &chunks[rng.gen_range(0..n - 1)],
        };

        let fragment = selected.text().trim().to_string();
        // a fragment that just echoes the whole sentence steers nothing
        if fragment == working {
            return String::new();
        }

        tracing::debug!(fragment = %fragment, "extracted prompt fragment");
        fragment
    }

    /// The longest sentence by character count (first occurrence wins
    /// ties), or the whole message when no sentence boundary is found.
    fn working_text(&self, message: &str) -> String {
        let mut best: Option<&str> = None;
        for sentence in self.segmenter.segment(message) {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            let better = match best {
                Some(current) => sentence.chars().count() > current.chars().count(),
                None => true,
            };
            if better {
                best = Some(sentence);
            }
        }
        best.unwrap_or(message.trim()).to_string()
    }
}

fn usable_chunk(chunk: &Chunk) -> bool {
    if chunk.tag == ChunkTag::Other {
        return false;
    }
    // contraction splitting leaves artifacts like "'s" that make no prompt
    if chunk
        .words
        .iter()
        .any(|w| w.text.starts_with('\'') || w.text.ends_with('\''))
    {
        return false;
    }
    // neither does a lone preposition
    if chunk.tag == ChunkTag::PrepPhrase && chunk.words.len() == 1 {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn extract(message: &str, seed: u64) -> String {
        let extractor = Extractor::new().unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        extractor.fragment_from(message, &mut rng)
    }

    #[test]
    fn links_yield_nothing() {
        assert_eq!(
            extract("Check out this great article http://example.com about cats", 1),
            ""
        );
        assert_eq!(extract("see https://example.org for details", 1), "");
    }

    #[test]
    fn empty_and_punctuation_only_yield_nothing() {
        assert_eq!(extract("", 1), "");
        assert_eq!(extract("?! ... !!", 1), "");
    }

    #[test]
    fn full_echo_is_suppressed() {
        // the only surviving chunk equals the whole working text
        assert_eq!(extract("cats", 1), "");
        assert_eq!(extract("the storm", 1), "");
    }

    #[test]
    fn lone_preposition_yields_nothing() {
        assert_eq!(extract("of", 1), "");
    }

    #[test]
    fn contraction_artifacts_never_surface() {
        assert_eq!(extract("it's", 1), "");
        // "'ll" sinks its whole chunk, leaving only the verb
        for seed in 0..20 {
            assert_eq!(extract("we'll see", seed), "see");
        }
    }

    #[test]
    fn longest_sentence_drives_the_fragment() {
        // the longer second sentence carries the link, so nothing survives
        let message = "Nice. Check out this great article at http somewhere else.";
        assert_eq!(extract(message, 1), "");

        // the longer clean sentence always yields something
        let message = "Hi. The old lighthouse stood silent against the storm.";
        for seed in 0..20 {
            assert!(!extract(message, seed).is_empty());
        }
    }

    #[test]
    fn final_chunk_is_never_selected() {
        // candidates in order: "The old lighthouse", "stood", "silent",
        // "the storm"; the last must never come back
        let message = "The old lighthouse stood silent against the storm.";
        for seed in 0..200 {
            let fragment = extract(message, seed);
            assert_ne!(fragment, "the storm");
            assert!(
                ["The old lighthouse", "stood", "silent"].contains(&fragment.as_str()),
                "unexpected fragment {fragment:?}"
            );
        }
    }

    #[test]
    fn single_candidate_is_taken_without_randomness() {
        // "against" is filtered as a lone preposition, leaving one chunk
        assert_eq!(extract("against the storm", 9), "the storm");
    }
}
