//! Concept extraction
//!
//! Turns raw page text into weighted, domain-tagged concept candidates.
//! Candidates come from three sources per sentence: a fixed technical-term
//! dictionary, runs of non-stopword tokens, and capitalized multi-word phrases.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::concepts::domain::classify_domain;
use crate::concepts::text::{find_sequence, normalize_id, tokenize, tokens};
use crate::concepts::types::{ConceptCandidate, MAX_CONCEPT_WEIGHT};
use crate::config::ExtractionConfig;

/// Weight bonus for dictionary terms
const DICTIONARY_BONUS: f64 = 2.0;
/// Maximum bonus for appearing at the very start of the text
const POSITION_BONUS: f64 = 0.5;
/// Bonus for a capitalized surface form
const CAPITALIZATION_BONUS: f64 = 0.5;
/// Single-token run candidates shorter than this are dropped
const MIN_SINGLE_TOKEN_CHARS: usize = 4;

/// Technical terms recognized regardless of stopwords or casing
pub const TECHNICAL_TERMS: &[&str] = &[
    "machine learning",
    "deep learning",
    "neural network",
    "neural networks",
    "artificial intelligence",
    "natural language processing",
    "computer vision",
    "reinforcement learning",
    "supervised learning",
    "unsupervised learning",
    "gradient descent",
    "backpropagation",
    "transformer",
    "large language model",
    "algorithm",
    "data structure",
    "api",
    "database",
    "compiler",
    "operating system",
    "cloud computing",
    "distributed system",
    "microservices",
    "recursion",
    "encryption",
    "cryptography",
    "blockchain",
    "quantum computing",
    "quantum mechanics",
    "relativity",
    "thermodynamics",
    "linear algebra",
    "calculus",
    "probability",
    "statistics",
    "regression",
    "photosynthesis",
    "natural selection",
    "evolution",
    "dna",
    "rna",
    "protein synthesis",
    "supply and demand",
    "inflation",
    "working memory",
    "cognitive load",
];

/// Common English function words excluded from token runs
pub const STOPWORDS: &[&str] = &[
    "a", "about", "also", "an", "and", "any", "are", "as", "at", "be", "been", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "each", "for", "from", "had", "has", "have",
    "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "like", "many",
    "may", "might", "more", "most", "much", "must", "no", "not", "of", "on", "only", "or", "other",
    "our", "over", "she", "should", "so", "some", "such", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "those", "through", "to", "under", "use", "used",
    "uses", "using", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who",
    "will", "with", "would", "you", "your",
];

fn capitalized_phrase_regex() -> &'static Regex {
    static PHRASE: OnceLock<Regex> = OnceLock::new();
    PHRASE.get_or_init(|| {
        Regex::new(r"\b\p{Lu}[\p{L}\p{N}]*(?:\s+\p{Lu}[\p{L}\p{N}]*)+\b")
            .expect("capitalized phrase pattern is valid")
    })
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

/// A raw candidate before scoring: surface form plus the sentence it came from
struct RawCandidate {
    surface: String,
    technical: bool,
    context: String,
}

/// Concept extractor
#[derive(Debug, Clone, Default)]
pub struct ConceptExtractor {
    config: ExtractionConfig,
}

impl ConceptExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extract the top-K concept candidates from `text`, highest weight first.
    /// Empty or whitespace-only text yields no candidates.
    pub fn extract_concepts(&self, text: &str) -> Vec<ConceptCandidate> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let text_tokens = tokenize(text);
        let raw: Vec<RawCandidate> = split_sentences(text, self.config.min_sentence_chars)
            .into_iter()
            .flat_map(|sentence| self.sentence_candidates(sentence))
            .collect();

        let mut merged: HashMap<String, ConceptCandidate> = HashMap::new();
        let mut scored_variants: HashSet<(String, bool)> = HashSet::new();
        for candidate in raw {
            let id = normalize_id(&candidate.surface);
            if id.is_empty() {
                continue;
            }
            // Same spelling already scored; only the context can be new
            if !scored_variants.insert((candidate.surface.clone(), candidate.technical)) {
                if let Some(existing) = merged.get_mut(&id) {
                    if !existing.contexts.contains(&candidate.context) {
                        existing.contexts.push(candidate.context);
                    }
                }
                continue;
            }
            let scored = score_candidate(&id, candidate, &text_tokens);
            match merged.get_mut(&id) {
                Some(existing) => merge_into(existing, scored),
                None => {
                    merged.insert(id, scored);
                }
            }
        }

        let mut candidates: Vec<ConceptCandidate> = merged.into_values().collect();
        candidates.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.id.cmp(&b.id)));
        candidates.truncate(self.config.top_k);

        debug!(
            "extracted {} concepts from {} tokens",
            candidates.len(),
            text_tokens.len()
        );
        candidates
    }

    fn sentence_candidates(&self, sentence: &str) -> Vec<RawCandidate> {
        let mut out = Vec::new();
        let toks = tokens(sentence);
        let lowers: Vec<&str> = toks.iter().map(|t| t.lower.as_str()).collect();

        // Dictionary matches, keeping the surface spelling of the first hit
        for term in TECHNICAL_TERMS {
            let needle: Vec<&str> = term.split_whitespace().collect();
            if let Some(&start) = find_sequence(&lowers, &needle).first() {
                let end = start + needle.len() - 1;
                let surface = &sentence[toks[start].start..toks[end].start + toks[end].text.len()];
                out.push(RawCandidate {
                    surface: surface.to_string(),
                    technical: true,
                    context: sentence.to_string(),
                });
            }
        }

        // Non-stopword runs, chunked to at most `max_phrase_tokens`
        let max_tokens = self.config.max_phrase_tokens.max(1);
        let mut run: Vec<usize> = Vec::new();
        for (i, token) in toks.iter().enumerate() {
            let breaks_run =
                is_stopword(&token.lower) || token.lower.chars().all(|c| c.is_ascii_digit());
            if !breaks_run {
                run.push(i);
            }
            if breaks_run || i == toks.len() - 1 {
                for chunk in run.chunks(max_tokens) {
                    if chunk.len() == 1
                        && toks[chunk[0]].text.chars().count() < MIN_SINGLE_TOKEN_CHARS
                    {
                        continue;
                    }
                    let surface = chunk
                        .iter()
                        .map(|&j| toks[j].text)
                        .collect::<Vec<_>>()
                        .join(" ");
                    out.push(RawCandidate {
                        surface,
                        technical: false,
                        context: sentence.to_string(),
                    });
                }
                run.clear();
            }
        }

        // Capitalized multi-word phrases
        for m in capitalized_phrase_regex().find_iter(sentence) {
            let phrase = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
            if phrase.chars().count() > 2 {
                out.push(RawCandidate {
                    surface: phrase,
                    technical: false,
                    context: sentence.to_string(),
                });
            }
        }

        out
    }
}

/// Split on `.`, `!` and `?`, dropping fragments shorter than `min_chars`
fn split_sentences(text: &str, min_chars: usize) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.chars().count() >= min_chars)
        .collect()
}

/// Compute candidate weight
///
/// Formula:
/// ```text
/// weight = 2.0 * in_dictionary
///        + ln(frequency_in_text + 1)
///        + 0.5 * (1 - first_token_index / token_count)
///        + 0.5 * starts_uppercase
/// ```
/// capped at 10.
fn score_candidate(id: &str, raw: RawCandidate, text_tokens: &[String]) -> ConceptCandidate {
    let needle = tokenize(&raw.surface);
    let occurrences = find_sequence(text_tokens, &needle);
    let frequency = u32::try_from(occurrences.len()).unwrap_or(u32::MAX);

    let relative_position = match occurrences.first() {
        Some(&first) if !text_tokens.is_empty() => first as f64 / text_tokens.len() as f64,
        _ => 1.0,
    };

    let technical = raw.technical || TECHNICAL_TERMS.contains(&needle.join(" ").as_str());
    let dictionary_bonus = if technical { DICTIONARY_BONUS } else { 0.0 };
    let capitalization_bonus = if raw.surface.chars().next().is_some_and(char::is_uppercase) {
        CAPITALIZATION_BONUS
    } else {
        0.0
    };

    let weight = dictionary_bonus
        + (frequency as f64 + 1.0).ln()
        + (1.0 - relative_position) * POSITION_BONUS
        + capitalization_bonus;

    ConceptCandidate {
        id: id.to_string(),
        domain: classify_domain(&raw.surface, &raw.context).to_string(),
        concept: raw.surface,
        weight: weight.clamp(0.0, MAX_CONCEPT_WEIGHT),
        frequency,
        technical,
        contexts: vec![raw.context],
    }
}

/// Merge a duplicate into the first-seen candidate: keep the maximum weight and
/// append any new contexts
fn merge_into(existing: &mut ConceptCandidate, duplicate: ConceptCandidate) {
    if duplicate.weight > existing.weight {
        existing.weight = duplicate.weight;
    }
    existing.technical |= duplicate.technical;
    existing.frequency = existing.frequency.max(duplicate.frequency);
    for context in duplicate.contexts {
        if !existing.contexts.contains(&context) {
            existing.contexts.push(context);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ConceptExtractor {
        ConceptExtractor::default()
    }

    fn ids(candidates: &[ConceptCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_stopwords_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn test_empty_text() {
        assert!(extractor().extract_concepts("").is_empty());
        assert!(extractor().extract_concepts("   \n\t ").is_empty());
    }

    #[test]
    fn test_short_fragments_discarded() {
        assert!(extractor().extract_concepts("Hi there. Ok!").is_empty());
    }

    #[test]
    fn test_dictionary_terms_extracted() {
        let concepts =
            extractor().extract_concepts("Machine learning uses neural networks for deep learning tasks");
        let found = ids(&concepts);

        assert!(found.contains(&"machine-learning"));
        assert!(found.contains(&"neural-networks"));
        assert!(found.contains(&"deep-learning"));

        let ml = concepts.iter().find(|c| c.id == "machine-learning").unwrap();
        assert!(ml.technical);
        assert_eq!(ml.domain, "Computer Science");
        assert_eq!(ml.concept, "Machine learning");
    }

    #[test]
    fn test_weight_formula() {
        let text = "Photosynthesis converts light into chemical energy";
        let concepts = extractor().extract_concepts(text);
        let photo = concepts.iter().find(|c| c.id == "photosynthesis").unwrap();

        // dictionary 2 + ln(2) + position 0.5 + capitalized 0.5
        let expected = 2.0 + 2f64.ln() + 0.5 + 0.5;
        assert!((photo.weight - expected).abs() < 1e-9);
        assert_eq!(photo.domain, "Biology");
    }

    #[test]
    fn test_weights_are_capped() {
        let text = "Algorithm ".repeat(2000) + ". Algorithm design matters a lot";
        let concepts = extractor().extract_concepts(&text);
        assert!(concepts.iter().all(|c| c.weight <= MAX_CONCEPT_WEIGHT));
    }

    #[test]
    fn test_duplicates_merge_contexts() {
        let text = "Recursion is elegant in functional code. Deep recursion can overflow the stack.";
        let concepts = extractor().extract_concepts(text);
        let recursion = concepts.iter().find(|c| c.id == "recursion").unwrap();

        assert_eq!(recursion.frequency, 2);
        assert_eq!(recursion.contexts.len(), 2);
        assert_eq!(concepts.iter().filter(|c| c.id == "recursion").count(), 1);
    }

    #[test]
    fn test_capitalized_phrases() {
        let text = "The talk was given at Carnegie Mellon University last spring";
        let concepts = extractor().extract_concepts(text);
        assert!(ids(&concepts).contains(&"carnegie-mellon-university"));
    }

    #[test]
    fn test_top_k_limit_and_order() {
        let config = ExtractionConfig {
            top_k: 3,
            ..ExtractionConfig::default()
        };
        let text = "Compilers translate source programs. Databases store records durably. \
                    Encryption protects messages in transit. Blockchain ledgers replicate state.";
        let concepts = ConceptExtractor::new(config).extract_concepts(text);

        assert_eq!(concepts.len(), 3);
        assert!(concepts.windows(2).all(|w| w[0].weight >= w[1].weight));
    }

    #[test]
    fn test_runs_capped_at_three_tokens() {
        let text = "Quantum entanglement experiment results surprised everyone";
        let concepts = extractor().extract_concepts(text);
        assert!(concepts
            .iter()
            .all(|c| c.concept.split_whitespace().count() <= 3));
    }

    #[test]
    fn test_accented_text_keeps_whole_words() {
        let concepts =
            extractor().extract_concepts("Gödel proved the incompleteness theorems in Zürich");
        let found = ids(&concepts);

        assert!(found.contains(&"gödel-proved"));
        assert!(found.contains(&"incompleteness-theorems"));
        assert!(found.contains(&"zürich"));
        assert!(found.iter().all(|id| !id.contains("g-del") && !id.contains("z-rich")));
    }

    #[test]
    fn test_accented_capitalized_phrase() {
        let text = "We visited the Universität Zürich campus last week";
        let concepts = extractor().extract_concepts(text);
        assert!(ids(&concepts).contains(&"universität-zürich"));
    }
}
