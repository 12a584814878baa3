// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pattern extraction from a record cluster: a pattern signature built from
//! member signatures, and a style descriptor voted from member content
//! features.

use chrono::{DateTime, Utc};
use hybrid_swarm_core::domain::approach::PatternSignature;
use hybrid_swarm_core::domain::execution::ExecutionRecord;
use hybrid_swarm_core::domain::pattern::{Pattern, PatternId};
use hybrid_swarm_core::domain::signature::{cosine_maps, normalize_weights};
use hybrid_swarm_core::domain::style::StyleDescriptor;
use std::collections::{BTreeMap, HashMap};

use super::clustering::RecordCluster;

pub const MAX_PATTERN_KEYWORDS: usize = 10;
pub const MAX_PATTERN_OUTPUT_TYPES: usize = 3;
/// Share of the member complexity span added on each side of the range.
pub const COMPLEXITY_RANGE_PADDING: f64 = 0.1;

pub fn extract_pattern(cluster: &RecordCluster, now: DateTime<Utc>) -> Pattern {
    let members = &cluster.members;
    let signature = pattern_signature(members);
    let styles: Vec<StyleDescriptor> = members
        .iter()
        .map(|r| r.content_features.as_ref().map(|f| f.style()).unwrap_or_default())
        .collect();
    let (style, style_support) = vote_style(&styles);

    let cohesion = if members.is_empty() {
        0.0
    } else {
        members
            .iter()
            .map(|r| cosine_maps(&signature.domain_weights, &r.task_signature.domain_weights))
            .sum::<f64>()
            / members.len() as f64
    };
    let avg_quality = if members.is_empty() {
        0.0
    } else {
        members.iter().map(|r| r.quality).sum::<f64>() / members.len() as f64
    };

    Pattern {
        id: PatternId::from_members(members.iter().map(|r| &r.task_id)),
        member_task_ids: members.iter().map(|r| r.task_id.clone()).collect(),
        signature,
        style,
        style_support,
        cohesion,
        avg_quality,
        discovered_at: now,
    }
}

/// Quality-weighted domains, padded complexity range, most frequent keywords and outputs.
pub fn pattern_signature(members: &[ExecutionRecord]) -> PatternSignature {
    let mut domains: BTreeMap<String, f64> = BTreeMap::new();
    let total_quality: f64 = members.iter().map(|r| r.quality).sum();
    for record in members {
        let weight = if total_quality > 0.0 { record.quality } else { 1.0 };
        for (domain, w) in &record.task_signature.domain_weights {
            *domains.entry(domain.clone()).or_insert(0.0) += weight * w;
        }
    }
    normalize_weights(&mut domains);

    let (lo, hi) = members
        .iter()
        .map(|r| r.task_signature.complexity)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c), hi.max(c)));
    let (lo, hi) = if lo.is_finite() && hi.is_finite() {
        let pad = (hi - lo) * COMPLEXITY_RANGE_PADDING;
        ((lo - pad).max(0.0), (hi + pad).min(1.0))
    } else {
        (0.0, 1.0)
    };

    let keywords = most_frequent(
        members.iter().flat_map(|r| r.task_signature.keywords.iter()),
        MAX_PATTERN_KEYWORDS,
    );
    let outputs = most_frequent(
        members.iter().map(|r| &r.task_signature.output_type),
        MAX_PATTERN_OUTPUT_TYPES,
    );

    PatternSignature::new(domains, (lo, hi), keywords, outputs)
}

/// Top `limit` values by frequency, ties by name.
fn most_frequent<'a>(values: impl Iterator<Item = &'a String>, limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(limit).map(|(v, _)| v.to_string()).collect()
}

/// Per-field mode with ties broken by tag name; support is the mean winning share.
pub fn vote_style(styles: &[StyleDescriptor]) -> (StyleDescriptor, f64) {
    if styles.is_empty() {
        return (StyleDescriptor::default(), 0.0);
    }
    let defaults = StyleDescriptor::default();

    let (structure, s1) = mode(styles, |s| &s.structure, |t| t.as_str(), defaults.structure);
    let (tone, s2) = mode(styles, |s| &s.tone, |t| t.as_str(), defaults.tone);
    let (voice, s3) = mode(styles, |s| &s.voice, |t| t.as_str(), defaults.voice);
    let (depth, s4) = mode(styles, |s| &s.depth, |t| t.as_str(), defaults.depth);
    let (code_density, s5) = mode(styles, |s| &s.code_density, |t| t.as_str(), defaults.code_density);
    let (example_density, s6) = mode(styles, |s| &s.example_density, |t| t.as_str(), defaults.example_density);

    let style = StyleDescriptor {
        structure,
        tone,
        voice,
        depth,
        code_density,
        example_density,
    };
    (style, (s1 + s2 + s3 + s4 + s5 + s6) / 6.0)
}

fn mode<T: Clone>(
    styles: &[StyleDescriptor],
    field: impl Fn(&StyleDescriptor) -> &T,
    tag: impl Fn(&T) -> &str,
    fallback: T,
) -> (T, f64) {
    let mut counts: BTreeMap<String, (usize, T)> = BTreeMap::new();
    for style in styles {
        let value = field(style);
        counts
            .entry(tag(value).to_string())
            .or_insert_with(|| (0, value.clone()))
            .0 += 1;
    }

    // BTreeMap iterates by tag name, so the first maximum wins ties.
    let mut best: Option<(usize, T)> = None;
    for (count, value) in counts.into_values() {
        if best.as_ref().map_or(true, |(c, _)| count > *c) {
            best = Some((count, value));
        }
    }
    match best {
        Some((count, value)) => (value, count as f64 / styles.len() as f64),
        None => (fallback, 0.0),
    }
}
