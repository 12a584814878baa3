// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Signatures & Similarity
//!
//! A [`TaskSignature`] is the coarse feature set the router works with: a
//! domain weight map, a complexity scalar, a keyword set and an output type.
//! Signatures are produced fresh per task and never mutated.
//!
//! Specialist profiles are running centroids of the signatures they served
//! ([`SignatureCentroid`]). Both project into a sparse, non-negative
//! [`FeatureVector`] so resonance is a plain cosine similarity bounded to
//! `[0, 1]`.
//!
//! ## Vector layout
//!
//! | Block | Dimensions | Block norm |
//! |-------|-----------|------------|
//! | Domain | one per domain name | 1.0 |
//! | Complexity | single dimension | raw value |
//! | Keywords | one per keyword | 0.5 |
//! | Output type | one per output type | 0.5 |

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Fallback domain when nothing else is known about a task.
pub const GENERAL_DOMAIN: &str = "general";

/// Fallback output type.
pub const DEFAULT_OUTPUT_TYPE: &str = "explanation";

const DOMAIN_BLOCK_NORM: f64 = 1.0;
const KEYWORD_BLOCK_NORM: f64 = 0.5;
const OUTPUT_BLOCK_NORM: f64 = 0.5;

/// Entries of a running bag below this weight are dropped.
pub const MIN_BAG_WEIGHT: f64 = 0.01;

/// Coarse bucket signals are keyed by, so they generalize across similar tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskClassKey(pub String);

impl TaskClassKey {
    pub fn new(domain: &str, output_type: &str) -> Self {
        Self(format!("{}:{}", domain, output_type))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSignature {
    /// Domain name to weight; weights sum to at most 1.
    pub domain_weights: BTreeMap<String, f64>,
    /// Complexity in `[0, 1]`.
    pub complexity: f64,
    /// Lowercased, stop-word filtered keywords.
    pub keywords: BTreeSet<String>,
    pub output_type: String,
}

impl TaskSignature {
    pub fn new(
        domain_weights: BTreeMap<String, f64>,
        complexity: f64,
        keywords: BTreeSet<String>,
        output_type: impl Into<String>,
    ) -> Self {
        Self {
            domain_weights,
            complexity,
            keywords,
            output_type: output_type.into(),
        }
    }

    /// Single-domain signature, mostly useful for tests and seeds.
    pub fn single_domain(domain: &str, complexity: f64, keywords: &[&str], output_type: &str) -> Self {
        let mut domain_weights = BTreeMap::new();
        domain_weights.insert(domain.to_string(), 1.0);
        Self::new(
            domain_weights,
            complexity,
            keywords.iter().map(|k| k.to_string()).collect(),
            output_type,
        )
    }

    /// Highest-weighted domain, ties broken by name.
    pub fn dominant_domain(&self) -> &str {
        dominant_key(&self.domain_weights).unwrap_or(GENERAL_DOMAIN)
    }

    pub fn task_class_key(&self) -> TaskClassKey {
        TaskClassKey::new(self.dominant_domain(), &self.output_type)
    }

    pub fn to_feature_vector(&self) -> FeatureVector {
        let keywords: BTreeMap<String, f64> =
            self.keywords.iter().map(|k| (k.clone(), 1.0)).collect();
        let mut outputs = BTreeMap::new();
        outputs.insert(self.output_type.clone(), 1.0);
        FeatureVector::from_blocks(&self.domain_weights, self.complexity, &keywords, &outputs)
    }

    /// Stable textual form used for hashing into identifiers.
    pub fn canonical_string(&self) -> String {
        let domains: Vec<String> = self
            .domain_weights
            .iter()
            .map(|(k, v)| format!("{}={:.4}", k, v))
            .collect();
        let keywords: Vec<&str> = self.keywords.iter().map(String::as_str).collect();
        format!(
            "{}|{:.4}|{}|{}",
            domains.join(","),
            self.complexity,
            keywords.join(","),
            self.output_type
        )
    }
}

/// Running centroid of signatures; keywords and output types become weighted bags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureCentroid {
    pub domain_weights: BTreeMap<String, f64>,
    pub complexity: f64,
    pub keyword_weights: BTreeMap<String, f64>,
    pub output_weights: BTreeMap<String, f64>,
}

impl SignatureCentroid {
    pub fn from_signature(signature: &TaskSignature) -> Self {
        let mut output_weights = BTreeMap::new();
        output_weights.insert(signature.output_type.clone(), 1.0);
        Self {
            domain_weights: signature.domain_weights.clone(),
            complexity: signature.complexity,
            keyword_weights: signature.keywords.iter().map(|k| (k.clone(), 1.0)).collect(),
            output_weights,
        }
    }

    /// `self ← (1-α)·self + α·signature`. Returns how far the centroid moved (L2).
    pub fn blend(&mut self, signature: &TaskSignature, alpha: f64) -> f64 {
        let alpha = alpha.clamp(0.0, 1.0);
        let before = self.to_feature_vector();

        let keywords: BTreeMap<String, f64> =
            signature.keywords.iter().map(|k| (k.clone(), 1.0)).collect();
        let mut outputs = BTreeMap::new();
        outputs.insert(signature.output_type.clone(), 1.0);

        self.domain_weights = blend_maps(&self.domain_weights, &signature.domain_weights, alpha);
        self.complexity = ((1.0 - alpha) * self.complexity + alpha * signature.complexity).clamp(0.0, 1.0);
        self.keyword_weights = blend_maps(&self.keyword_weights, &keywords, alpha);
        self.output_weights = blend_maps(&self.output_weights, &outputs, alpha);

        before.distance(&self.to_feature_vector())
    }

    pub fn to_feature_vector(&self) -> FeatureVector {
        FeatureVector::from_blocks(
            &self.domain_weights,
            self.complexity,
            &self.keyword_weights,
            &self.output_weights,
        )
    }

    /// Cosine similarity between this centroid and a signature, in `[0, 1]`.
    pub fn resonance(&self, signature: &TaskSignature) -> f64 {
        self.to_feature_vector().cosine(&signature.to_feature_vector())
    }

    pub fn dominant_domain(&self) -> &str {
        dominant_key(&self.domain_weights).unwrap_or(GENERAL_DOMAIN)
    }

    pub fn dominant_output_type(&self) -> &str {
        dominant_key(&self.output_weights).unwrap_or(DEFAULT_OUTPUT_TYPE)
    }
}

/// Sparse non-negative feature vector keyed by namespaced dimension name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    components: BTreeMap<String, f64>,
}

impl FeatureVector {
    fn from_blocks(
        domains: &BTreeMap<String, f64>,
        complexity: f64,
        keywords: &BTreeMap<String, f64>,
        outputs: &BTreeMap<String, f64>,
    ) -> Self {
        let mut components = BTreeMap::new();
        insert_block(&mut components, "d", domains, DOMAIN_BLOCK_NORM);
        if complexity > 0.0 {
            components.insert("c".to_string(), complexity);
        }
        insert_block(&mut components, "k", keywords, KEYWORD_BLOCK_NORM);
        insert_block(&mut components, "o", outputs, OUTPUT_BLOCK_NORM);
        Self { components }
    }

    pub fn norm(&self) -> f64 {
        self.components.values().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Cosine similarity; zero when either vector is empty.
    pub fn cosine(&self, other: &FeatureVector) -> f64 {
        let norm_a = self.norm();
        let norm_b = other.norm();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        let dot: f64 = self
            .components
            .iter()
            .filter_map(|(k, a)| other.components.get(k).map(|b| a * b))
            .sum();
        (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    }

    /// Euclidean distance.
    pub fn distance(&self, other: &FeatureVector) -> f64 {
        let keys: BTreeSet<&String> = self.components.keys().chain(other.components.keys()).collect();
        keys.into_iter()
            .map(|k| {
                let a = self.components.get(k).copied().unwrap_or(0.0);
                let b = other.components.get(k).copied().unwrap_or(0.0);
                (a - b) * (a - b)
            })
            .sum::<f64>()
            .sqrt()
    }
}

fn insert_block(
    components: &mut BTreeMap<String, f64>,
    prefix: &str,
    block: &BTreeMap<String, f64>,
    target_norm: f64,
) {
    let norm = block.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 {
        return;
    }
    for (key, value) in block {
        if *value > 0.0 {
            components.insert(format!("{}:{}", prefix, key), value / norm * target_norm);
        }
    }
}

/// Element-wise EMA over the union of keys; entries below [`MIN_BAG_WEIGHT`] are dropped.
pub fn blend_maps(
    current: &BTreeMap<String, f64>,
    incoming: &BTreeMap<String, f64>,
    alpha: f64,
) -> BTreeMap<String, f64> {
    let keys: BTreeSet<&String> = current.keys().chain(incoming.keys()).collect();
    keys.into_iter()
        .filter_map(|k| {
            let old = current.get(k).copied().unwrap_or(0.0);
            let new = incoming.get(k).copied().unwrap_or(0.0);
            let blended = (1.0 - alpha) * old + alpha * new;
            (blended >= MIN_BAG_WEIGHT).then(|| (k.clone(), blended))
        })
        .collect()
}

/// Cosine similarity between two weight maps, in `[0, 1]`.
pub fn cosine_maps(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    let norm_a = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(k, va)| b.get(k).map(|vb| va * vb))
        .sum();
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Jaccard overlap; zero when both sets are empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Rescale weights so they sum to 1. Empty or zero maps stay empty.
pub fn normalize_weights(weights: &mut BTreeMap<String, f64>) {
    weights.retain(|_, v| v.is_finite() && *v > 0.0);
    let total: f64 = weights.values().sum();
    if total <= 0.0 {
        weights.clear();
        return;
    }
    for value in weights.values_mut() {
        *value /= total;
    }
}

fn dominant_key(weights: &BTreeMap<String, f64>) -> Option<&str> {
    // BTreeMap iterates by name, so keeping the first maximum breaks ties by name.
    let mut best: Option<(&String, f64)> = None;
    for (key, value) in weights {
        match best {
            Some((_, best_value)) if *value <= best_value => {}
            _ => best = Some((key, *value)),
        }
    }
    best.map(|(k, _)| k.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_task_class_key_uses_dominant_domain() {
        let sig = TaskSignature::new(
            weights(&[("coding", 0.3), ("writing", 0.7)]),
            0.5,
            BTreeSet::new(),
            "tutorial",
        );
        assert_eq!(sig.task_class_key().as_str(), "writing:tutorial");
    }

    #[test]
    fn test_dominant_domain_ties_break_by_name() {
        let sig = TaskSignature::new(
            weights(&[("writing", 0.5), ("coding", 0.5)]),
            0.5,
            BTreeSet::new(),
            "code",
        );
        assert_eq!(sig.dominant_domain(), "coding");
    }

    #[test]
    fn test_identical_signatures_resonate_fully() {
        let sig = TaskSignature::single_domain("coding", 0.6, &["rust", "parser"], "code");
        let centroid = SignatureCentroid::from_signature(&sig);
        assert!((centroid.resonance(&sig) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_resonance_bounded_and_symmetric_under_domain_permutation() {
        let a = TaskSignature::new(
            weights(&[("coding", 0.5), ("review", 0.5)]),
            0.4,
            ["api"].iter().map(|s| s.to_string()).collect(),
            "code",
        );
        let b = TaskSignature::new(
            weights(&[("review", 0.5), ("coding", 0.5)]),
            0.4,
            ["api"].iter().map(|s| s.to_string()).collect(),
            "code",
        );
        let other = TaskSignature::single_domain("writing", 0.9, &["essay"], "article");

        let ra = SignatureCentroid::from_signature(&a).resonance(&other);
        let rb = SignatureCentroid::from_signature(&b).resonance(&other);
        assert_eq!(ra, rb);
        assert!((0.0..=1.0).contains(&ra));

        let ab = a.to_feature_vector().cosine(&b.to_feature_vector());
        let ba = b.to_feature_vector().cosine(&a.to_feature_vector());
        assert_eq!(ab, ba);
        assert!((ab - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrelated_signatures_resonate_weakly() {
        let coding = TaskSignature::single_domain("coding", 0.5, &["rust"], "code");
        let writing = TaskSignature::single_domain("writing", 0.5, &["essay"], "article");
        let r = SignatureCentroid::from_signature(&coding).resonance(&writing);
        assert!(r < 0.3, "resonance was {}", r);
    }

    #[test]
    fn test_blend_moves_toward_signature_and_reports_drift() {
        let start = TaskSignature::single_domain("coding", 0.2, &["rust"], "code");
        let target = TaskSignature::single_domain("coding", 1.0, &["rust"], "code");
        let mut centroid = SignatureCentroid::from_signature(&start);

        let drift = centroid.blend(&target, 0.5);
        assert!((centroid.complexity - 0.6).abs() < 1e-9);
        assert!(drift > 0.0);

        let same = centroid.blend(&TaskSignature::single_domain("coding", 0.6, &["rust"], "code"), 0.5);
        assert!(same < 1e-9);
    }

    #[test]
    fn test_blend_keyword_bag_decays_and_drops() {
        let mut centroid =
            SignatureCentroid::from_signature(&TaskSignature::single_domain("coding", 0.5, &["old"], "code"));
        let next = TaskSignature::single_domain("coding", 0.5, &["new"], "code");
        for _ in 0..20 {
            centroid.blend(&next, 0.3);
        }
        assert!(!centroid.keyword_weights.contains_key("old"));
        assert!(centroid.keyword_weights["new"] > 0.99);
    }

    #[test]
    fn test_jaccard_and_cosine_helpers() {
        let a: BTreeSet<&str> = ["a", "b"].into_iter().collect();
        let b: BTreeSet<&str> = ["b", "c"].into_iter().collect();
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(jaccard::<&str>(&BTreeSet::new(), &BTreeSet::new()), 0.0);

        let x = weights(&[("coding", 1.0)]);
        let y = weights(&[("writing", 1.0)]);
        assert_eq!(cosine_maps(&x, &y), 0.0);
        assert!((cosine_maps(&x, &x) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_weights() {
        let mut w = weights(&[("a", 2.0), ("b", 2.0), ("c", -1.0)]);
        normalize_weights(&mut w);
        assert_eq!(w.len(), 2);
        assert!((w["a"] - 0.5).abs() < 1e-9);
    }
}
