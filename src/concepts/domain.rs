//! Domain tagging
//!
//! Ordered domain → keyword table. The concept itself is checked against
//! every domain first; only if nothing matches is the surrounding sentence
//! consulted. First match wins.

use crate::concepts::text::{find_sequence, tokenize};
use crate::concepts::types::GENERAL_DOMAIN;

/// Domain keyword table, in priority order
pub const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Computer Science",
        &[
            "programming",
            "algorithm",
            "algorithms",
            "api",
            "software",
            "code",
            "database",
            "computer",
            "compiler",
            "machine learning",
            "deep learning",
            "neural network",
            "neural networks",
            "artificial intelligence",
            "data structure",
            "javascript",
            "python",
            "rust",
            "server",
            "network protocol",
            "encryption",
        ],
    ),
    (
        "Mathematics",
        &[
            "equation",
            "theorem",
            "calculus",
            "algebra",
            "matrix",
            "probability",
            "statistics",
            "geometry",
            "derivative",
            "integral",
            "proof",
        ],
    ),
    (
        "Physics",
        &[
            "quantum",
            "energy",
            "force",
            "particle",
            "relativity",
            "gravity",
            "momentum",
            "thermodynamics",
            "velocity",
        ],
    ),
    (
        "Biology",
        &[
            "cell",
            "cells",
            "gene",
            "genes",
            "protein",
            "dna",
            "rna",
            "evolution",
            "organism",
            "enzyme",
            "photosynthesis",
        ],
    ),
    (
        "Chemistry",
        &[
            "molecule",
            "atom",
            "reaction",
            "compound",
            "chemical",
            "acid",
            "catalyst",
        ],
    ),
    (
        "Economics",
        &[
            "market",
            "price",
            "inflation",
            "economy",
            "supply",
            "demand",
            "trade",
            "finance",
        ],
    ),
    (
        "Psychology",
        &[
            "cognitive",
            "behavior",
            "memory",
            "attention",
            "perception",
            "emotion",
            "learning theory",
        ],
    ),
    (
        "History",
        &["war", "empire", "century", "revolution", "dynasty", "ancient"],
    ),
];

/// Tag a concept with a domain, falling back to its sentence context
pub fn classify_domain(concept: &str, sentence_context: &str) -> &'static str {
    match_domain(&tokenize(concept))
        .or_else(|| match_domain(&tokenize(sentence_context)))
        .unwrap_or(GENERAL_DOMAIN)
}

fn match_domain(tokens: &[String]) -> Option<&'static str> {
    if tokens.is_empty() {
        return None;
    }
    DOMAIN_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords.iter().any(|keyword| {
                let needle: Vec<&str> = keyword.split_whitespace().collect();
                !find_sequence(tokens, &needle).is_empty()
            })
        })
        .map(|(domain, _)| *domain)
}
