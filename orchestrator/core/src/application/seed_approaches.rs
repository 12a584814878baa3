// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Built-in approaches installed into an empty catalog: a comprehensive
//! research analysis, a step-by-step tutorial and a concise summary.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::approach::{Approach, ApproachId, ApproachOrigin, PatternSignature};
use crate::domain::style::{CodeDensity, Depth, ExampleDensity, StructureStyle, StyleDescriptor, Tone, Voice};

pub const SEED_COMPREHENSIVE: &str = "seed_comprehensive";
pub const SEED_TUTORIAL: &str = "seed_tutorial";
pub const SEED_SUMMARY: &str = "seed_summary";

fn domains(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub fn seed_approaches(now: DateTime<Utc>) -> Vec<Approach> {
    let comprehensive = Approach::new(
        ApproachId::from(SEED_COMPREHENSIVE),
        "Comprehensive Research",
        PatternSignature::new(
            domains(&[("research", 0.9), ("comparison", 0.7), ("writing", 0.6), ("review", 0.5)]),
            (0.5, 1.0),
            ["research", "investigate", "analyze", "study", "explore", "comprehensive"],
            ["explanation", "analysis", "research", "comparison"],
        ),
        StyleDescriptor {
            structure: StructureStyle::Hierarchical,
            tone: Tone::Formal,
            voice: Voice::ThirdPerson,
            depth: Depth::Comprehensive,
            code_density: CodeDensity::NoCode,
            example_density: ExampleDensity::Medium,
        },
        ApproachOrigin::Seed,
        now,
    )
    .with_description("Multi-source research with a structured introduction, body, examples and summary")
    .with_tags(["seed", "research", "comprehensive", "formal", "analysis"]);

    let tutorial = Approach::new(
        ApproachId::from(SEED_TUTORIAL),
        "Step-by-Step Tutorial",
        PatternSignature::new(
            domains(&[("writing", 0.9), ("coding", 0.7), ("research", 0.3)]),
            (0.3, 0.8),
            ["tutorial", "guide", "how_to", "step", "learn"],
            ["tutorial", "guide", "walkthrough", "explanation"],
        ),
        StyleDescriptor {
            structure: StructureStyle::SequentialSteps,
            tone: Tone::Educational,
            voice: Voice::SecondPerson,
            depth: Depth::Moderate,
            code_density: CodeDensity::Annotated,
            example_density: ExampleDensity::High,
        },
        ApproachOrigin::Seed,
        now,
    )
    .with_description("Hands-on numbered steps with practical, annotated examples")
    .with_tags(["seed", "tutorial", "step-by-step", "educational", "practical"]);

    let summary = Approach::new(
        ApproachId::from(SEED_SUMMARY),
        "Summary & Key Points",
        PatternSignature::new(
            domains(&[("review", 0.8), ("writing", 0.7), ("research", 0.6), ("comparison", 0.6)]),
            (0.2, 0.6),
            ["summary", "list", "quick", "overview", "key_points"],
            ["list", "summary", "overview", "explanation"],
        ),
        StyleDescriptor {
            structure: StructureStyle::Bulleted,
            tone: Tone::Casual,
            voice: Voice::SecondPerson,
            depth: Depth::Concise,
            code_density: CodeDensity::Minimal,
            example_density: ExampleDensity::Low,
        },
        ApproachOrigin::Seed,
        now,
    )
    .with_description("Concise bullet points for quick reference")
    .with_tags(["seed", "summary", "concise", "quick-reference", "bullets"]);

    vec![comprehensive, tutorial, summary]
}
