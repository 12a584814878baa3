// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Feature Extractor
//!
//! Turns a caller-supplied [`TaskRequest`] into a [`TaskSignature`]. Pure:
//! no state is read or written, and the only failure mode is a
//! [`ValidationError`] for malformed input.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Coarse categorical features for routing (no language understanding)

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::errors::ValidationError;
use crate::domain::sanitizer::InputSanitizer;
use crate::domain::signature::{normalize_weights, TaskSignature, DEFAULT_OUTPUT_TYPE, GENERAL_DOMAIN};
use crate::domain::task::{DomainSpec, TaskRequest};

/// Share of the domain mass given to an explicit domain when keyword hits exist too.
const EXPLICIT_DOMAIN_SHARE: f64 = 0.7;

/// Keywords derived from the description when the caller gives none.
const MAX_DERIVED_KEYWORDS: usize = 8;
const MIN_DERIVED_KEYWORD_LEN: usize = 4;

/// Word count at which the length term of the complexity heuristic saturates.
const COMPLEXITY_WORD_SATURATION: f64 = 200.0;

/// Terms associated with each domain. Multi-word entries match as phrases.
const DOMAIN_TERMS: &[(&str, &[&str])] = &[
    (
        "research",
        &["research", "investigate", "analyze", "analysis", "study", "explore", "what is", "explain", "how does", "works"],
    ),
    ("writing", &["write", "create", "draft", "compose", "tutorial", "guide", "how to", "article", "essay"]),
    ("review", &["review", "check", "evaluate", "critique", "assess", "improve", "audit"]),
    ("coding", &["code", "implement", "build", "develop", "program", "function", "debug", "refactor", "api"]),
    ("comparison", &["compare", "vs", "versus", "difference", "better", "which", "tradeoffs"]),
];

/// Terms that push the complexity estimate up.
const COMPLEXITY_TERMS: &[&str] = &[
    "technical",
    "architecture",
    "details",
    "detailed",
    "mechanism",
    "algorithm",
    "advanced",
    "comprehensive",
    "distributed",
    "concurrency",
    "optimize",
    "scalable",
    "production",
    "in-depth",
];

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by", "can",
    "could", "do", "does", "for", "from", "get", "has", "have", "how", "i", "if", "in", "into", "is", "it", "its",
    "just", "me", "more", "my", "need", "not", "of", "on", "or", "our", "please", "should", "so", "some", "than",
    "that", "the", "their", "them", "then", "there", "these", "this", "those", "to", "up", "us", "use", "using",
    "want", "was", "we", "what", "when", "where", "which", "while", "who", "why", "will", "with", "would", "you",
    "your",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// Stateless extractor; cheap to share.
#[derive(Default)]
pub struct FeatureExtractor {
    sanitizer: InputSanitizer,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sanitizer(sanitizer: InputSanitizer) -> Self {
        Self { sanitizer }
    }

    pub fn extract(&self, task: &TaskRequest) -> Result<TaskSignature, ValidationError> {
        let description = self.sanitizer.text("description", &task.description)?;
        let lowered = description.to_lowercase();
        let tokens = tokenize(&lowered);

        if let Some(hours) = task.estimated_duration {
            ValidationError::check_range("estimated_duration", hours, 0.0, f64::MAX)?;
        }

        let explicit = explicit_domains(task.domain.as_ref())?;
        let keywords = keyword_set(&task.keywords, &tokens);
        let associated = associated_domains(&lowered, &tokens, &keywords);
        let domain_weights = combine_domains(explicit, associated);

        let complexity = match task.complexity {
            Some(value) => ValidationError::check_range("complexity", value, 0.0, 1.0)?,
            None => estimate_complexity(&tokens),
        };

        let output_type = match task.output_type.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => InputSanitizer::slug(raw),
            _ => DEFAULT_OUTPUT_TYPE.to_string(),
        };

        Ok(TaskSignature::new(domain_weights, complexity, keywords, output_type))
    }
}

fn tokenize(lowered: &str) -> Vec<String> {
    lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|t| t.trim_matches('-'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn explicit_domains(spec: Option<&DomainSpec>) -> Result<BTreeMap<String, f64>, ValidationError> {
    let mut weights = BTreeMap::new();
    match spec {
        None => {}
        Some(DomainSpec::Single(name)) => {
            if !name.trim().is_empty() {
                weights.insert(InputSanitizer::slug(name), 1.0);
            }
        }
        Some(DomainSpec::Weighted(map)) => {
            for (name, weight) in map {
                let weight = ValidationError::check_range("domain", *weight, 0.0, 1.0)?;
                if name.trim().is_empty() {
                    continue;
                }
                *weights.entry(InputSanitizer::slug(name)).or_insert(0.0) += weight;
            }
        }
    }
    normalize_weights(&mut weights);
    Ok(weights)
}

/// Caller keywords when given, otherwise the first distinct content words of the description.
fn keyword_set(given: &[String], tokens: &[String]) -> BTreeSet<String> {
    let normalized: BTreeSet<String> = given
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty() && !is_stop_word(k))
        .map(|k| InputSanitizer::slug(&k))
        .collect();
    if !normalized.is_empty() {
        return normalized;
    }

    let mut seen = BTreeSet::new();
    for token in tokens {
        if seen.len() >= MAX_DERIVED_KEYWORDS {
            break;
        }
        if token.chars().count() >= MIN_DERIVED_KEYWORD_LEN && !is_stop_word(token) {
            seen.insert(token.clone());
        }
    }
    seen
}

fn associated_domains(lowered: &str, tokens: &[String], keywords: &BTreeSet<String>) -> BTreeMap<String, f64> {
    let mut hits = BTreeMap::new();
    for (domain, terms) in DOMAIN_TERMS {
        let count = terms
            .iter()
            .filter(|term| {
                if term.contains(' ') {
                    lowered.contains(*term)
                } else {
                    tokens.iter().any(|t| t == *term) || keywords.contains(**term)
                }
            })
            .count();
        if count > 0 {
            hits.insert(domain.to_string(), count as f64);
        }
    }
    normalize_weights(&mut hits);
    hits
}

fn combine_domains(explicit: BTreeMap<String, f64>, associated: BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    match (explicit.is_empty(), associated.is_empty()) {
        (true, true) => BTreeMap::from([(GENERAL_DOMAIN.to_string(), 1.0)]),
        (false, true) => explicit,
        (true, false) => associated,
        (false, false) => {
            let mut combined: BTreeMap<String, f64> = explicit
                .into_iter()
                .map(|(k, v)| (k, v * EXPLICIT_DOMAIN_SHARE))
                .collect();
            for (domain, weight) in associated {
                *combined.entry(domain).or_insert(0.0) += weight * (1.0 - EXPLICIT_DOMAIN_SHARE);
            }
            normalize_weights(&mut combined);
            combined
        }
    }
}

/// `0.3 + 0.4·min(words/200, 1) + min(0.1·hits, 0.3)`
fn estimate_complexity(tokens: &[String]) -> f64 {
    let words = tokens.len() as f64;
    let hits = tokens.iter().filter(|t| COMPLEXITY_TERMS.contains(&t.as_str())).count() as f64;
    let estimate = 0.3 + 0.4 * (words / COMPLEXITY_WORD_SATURATION).min(1.0) + (0.1 * hits).min(0.3);
    estimate.clamp(0.0, 1.0)
}
