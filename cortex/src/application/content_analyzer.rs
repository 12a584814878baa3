// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Content Analyzer
//!
//! Rule-based extraction of [`ContentFeatures`] from produced Markdown-ish
//! output, so executors can report style signals without building them by
//! hand. Only coarse structure and tone markers are detected.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Turns output text into features consumed by discovery

use hybrid_swarm_core::domain::execution::ContentFeatures;
use hybrid_swarm_core::domain::style::{StructureStyle, Tone};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const EDUCATIONAL_PATTERNS: &[&str] = &[
    r"\bfor example\b",
    r"\blet's\s+\w+",
    r"\byou\s+can\b",
    r"\bstep\s+\d+\b",
    r"\bhow\s+to\b",
];

/// Compiled once per process; every analyzer shares the same set.
static PATTERNS: Lazy<Result<Arc<Patterns>, regex::Error>> = Lazy::new(|| Patterns::compile().map(Arc::new));

#[derive(Debug)]
struct Patterns {
    header: Regex,
    code_block: Regex,
    inline_code: Regex,
    numbered_item: Regex,
    bullet_item: Regex,
    numbered_item_line: Regex,
    bullet_item_line: Regex,
    table_row: Regex,
    contraction: Regex,
    step_marker: Regex,
    example_span: Regex,
    educational: Vec<Regex>,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            header: Regex::new(r"(?m)^#{1,6}\s+\S")?,
            code_block: Regex::new(r"(?s)```.*?```")?,
            inline_code: Regex::new(r"`[^`\n]+`")?,
            numbered_item: Regex::new(r"(?m)^\s*\d+\.\s+\S")?,
            bullet_item: Regex::new(r"(?m)^\s*[*+-]\s+\S")?,
            numbered_item_line: Regex::new(r"(?m)^\s*\d+\.\s+.*$")?,
            bullet_item_line: Regex::new(r"(?m)^\s*[*+-]\s+.*$")?,
            table_row: Regex::new(r"(?m)^\s*\|.+\|\s*$")?,
            contraction: Regex::new(r"\w+'\w+")?,
            step_marker: Regex::new(r"(?im)step\s+\d+|^\s*\d+\.\s+(first|then|next|finally)\b")?,
            example_span: Regex::new(r"(?is)(for example|for instance|example|e\.g\.):.{0,500}")?,
            educational: EDUCATIONAL_PATTERNS
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

const FORMAL_MARKERS: &[&str] = &[
    "aforementioned",
    "consequently",
    "furthermore",
    "hereby",
    "moreover",
    "pursuant",
    "therefore",
    "thus",
    "whereas",
];
const CASUAL_MARKERS: &[&str] = &[
    "awesome",
    "basically",
    "can't",
    "cool",
    "don't",
    "it's",
    "kinda",
    "let's",
    "pretty much",
    "we'll",
    "you'll",
];
const TECHNICAL_MARKERS: &[&str] = &[
    "algorithm",
    "architecture",
    "complexity",
    "efficiency",
    "implementation",
    "interface",
    "optimize",
    "protocol",
];

/// Bullet lines needed before content counts as bulleted.
const MIN_BULLETS_FOR_LIST: usize = 5;
/// Headers needed before content counts as hierarchical.
const MIN_SECTIONS_FOR_HIERARCHY: usize = 4;

#[derive(Debug, Clone)]
pub struct ContentAnalyzer {
    patterns: Arc<Patterns>,
}

impl ContentAnalyzer {
    pub fn new() -> Result<Self, regex::Error> {
        match &*PATTERNS {
            Ok(patterns) => Ok(Self {
                patterns: Arc::clone(patterns),
            }),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn analyze(&self, content: &str) -> ContentFeatures {
        let length = content.chars().count();
        let word_count = content.split_whitespace().count();
        if word_count == 0 {
            return ContentFeatures {
                structure: StructureStyle::Prose,
                tone: Tone::Neutral,
                formality: 0.5,
                length,
                word_count: 0,
                section_count: 0,
                has_numbered_steps: false,
                has_bullet_points: false,
                has_code_blocks: false,
                has_tables: false,
                code_ratio: 0.0,
                example_ratio: 0.0,
                explanation_ratio: 0.0,
            };
        }

        let p = &*self.patterns;
        let lowered = content.to_lowercase();
        let section_count = p.header.find_iter(content).count().max(1);
        let bullet_lines = p.bullet_item.find_iter(content).count();
        let has_numbered_steps = p.numbered_item.is_match(content);

        ContentFeatures {
            structure: structure(p, content, has_numbered_steps, bullet_lines, section_count),
            tone: tone(p, &lowered),
            formality: formality(p, content, &lowered, word_count),
            length,
            word_count,
            section_count,
            has_numbered_steps,
            has_bullet_points: bullet_lines > 0,
            has_code_blocks: p.code_block.is_match(content),
            has_tables: p.table_row.find_iter(content).count() >= 2,
            code_ratio: code_ratio(p, content),
            example_ratio: example_ratio(p, content),
            explanation_ratio: explanation_ratio(p, content),
        }
    }
}

fn structure(p: &Patterns, content: &str, numbered: bool, bullet_lines: usize, sections: usize) -> StructureStyle {
    if numbered && p.step_marker.is_match(content) {
        StructureStyle::SequentialSteps
    } else if bullet_lines >= MIN_BULLETS_FOR_LIST {
        StructureStyle::Bulleted
    } else if sections >= MIN_SECTIONS_FOR_HIERARCHY {
        StructureStyle::Hierarchical
    } else {
        StructureStyle::Prose
    }
}

fn count_markers(lowered: &str, markers: &[&str]) -> usize {
    markers.iter().filter(|m| lowered.contains(*m)).count()
}

/// Dominant marker family; ties resolve formal, casual, technical, educational.
fn tone(p: &Patterns, lowered: &str) -> Tone {
    let scores = [
        (Tone::Formal, count_markers(lowered, FORMAL_MARKERS)),
        (Tone::Casual, count_markers(lowered, CASUAL_MARKERS)),
        (Tone::Technical, count_markers(lowered, TECHNICAL_MARKERS)),
        (Tone::Educational, p.educational.iter().filter(|r| r.is_match(lowered)).count()),
    ];
    let mut best = (Tone::Neutral, 0);
    for (tone, score) in scores {
        if score > best.1 {
            best = (tone, score);
        }
    }
    best.0
}

fn formality(p: &Patterns, content: &str, lowered: &str, word_count: usize) -> f64 {
    let formal = count_markers(lowered, FORMAL_MARKERS) as f64;
    let casual = (count_markers(lowered, CASUAL_MARKERS) + p.contraction.find_iter(content).count()) as f64;
    let words = word_count as f64;
    let formal_score = formal / words;
    let casual_score = casual / words;
    if formal_score + casual_score == 0.0 {
        return 0.5;
    }
    formal_score / (formal_score + casual_score)
}

fn ratio(part: usize, content: &str) -> f64 {
    let total = content.len();
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64).min(1.0)
}

fn code_ratio(p: &Patterns, content: &str) -> f64 {
    let blocks: usize = p.code_block.find_iter(content).map(|m| m.len()).sum();
    let without_blocks = p.code_block.replace_all(content, "");
    let inline: usize = p.inline_code.find_iter(&without_blocks).map(|m| m.len()).sum();
    ratio(blocks + inline, content)
}

fn example_ratio(p: &Patterns, content: &str) -> f64 {
    let examples: usize = p.example_span.find_iter(content).map(|m| m.len()).sum();
    ratio(examples, content)
}

fn explanation_ratio(p: &Patterns, content: &str) -> f64 {
    let without_code = p.code_block.replace_all(content, "");
    let without_numbered = p.numbered_item_line.replace_all(&without_code, "");
    let prose = p.bullet_item_line.replace_all(&without_numbered, "");
    ratio(prose.trim().len(), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybrid_swarm_core::domain::style::Voice;

    const TUTORIAL: &str = r#"# Python Functions Tutorial

## Introduction

Functions are reusable blocks of code. Let's learn how to create them!

## Step-by-Step Guide

1. First, define a function using `def`
2. Then add parameters if needed
3. Next write the function body
4. Finally return a value

### Example Code

```python
def greet(name):
    return f"Hello, {name}!"
```

## Summary

You can now create basic Python functions.
"#;

    #[test]
    fn test_tutorial_features() {
        let features = ContentAnalyzer::new().unwrap().analyze(TUTORIAL);
        assert_eq!(features.structure, StructureStyle::SequentialSteps);
        assert_eq!(features.tone, Tone::Educational);
        assert_eq!(features.section_count, 5);
        assert!(features.has_numbered_steps);
        assert!(features.has_code_blocks);
        assert!(!features.has_tables);
        assert!(features.code_ratio > 0.0 && features.code_ratio < 1.0);
        assert!(features.explanation_ratio > 0.0 && features.explanation_ratio < 1.0);
    }

    #[test]
    fn test_formal_and_casual_tone() {
        let analyzer = ContentAnalyzer::new().unwrap();
        let formal = analyzer.analyze(
            "Furthermore, it is necessary to consider the aforementioned implications. Therefore, we proceed.",
        );
        assert_eq!(formal.tone, Tone::Formal);
        assert!(formal.formality > 0.9);
        assert_eq!(formal.style().voice, Voice::ThirdPerson);

        let casual = analyzer.analyze("Hey! Let's dive in. It's pretty cool how this works. You'll love it!");
        assert_eq!(casual.tone, Tone::Casual);
        assert!(casual.formality < 0.1);
    }

    #[test]
    fn test_bullets_and_tables() {
        let content = "- one\n- two\n- three\n- four\n- five\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        let features = ContentAnalyzer::new().unwrap().analyze(content);
        assert_eq!(features.structure, StructureStyle::Bulleted);
        assert!(features.has_bullet_points);
        assert!(features.has_tables);
    }

    #[test]
    fn test_analyzers_share_one_compiled_set() {
        assert!(Patterns::compile().is_ok());
        let a = ContentAnalyzer::new().unwrap();
        let b = a.clone();
        let c = ContentAnalyzer::new().unwrap();
        assert!(Arc::ptr_eq(&a.patterns, &b.patterns));
        assert!(Arc::ptr_eq(&a.patterns, &c.patterns));
        assert_eq!(a.patterns.educational.len(), EDUCATIONAL_PATTERNS.len());
    }

    #[test]
    fn test_empty_content_is_neutral() {
        let features = ContentAnalyzer::new().unwrap().analyze("   \n");
        assert_eq!(features.tone, Tone::Neutral);
        assert_eq!(features.structure, StructureStyle::Prose);
        assert_eq!(features.formality, 0.5);
        assert_eq!(features.word_count, 0);
    }
}
