// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Execution Records
//!
//! One immutable [`ExecutionRecord`] is appended per reported outcome. The
//! ledger is append-only: corrections are new records, never edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::approach::ApproachId;
use super::signature::{TaskClassKey, TaskSignature};
use super::specialist::SpecialistId;
use super::style::{CodeDensity, Depth, ExampleDensity, StructureStyle, StyleDescriptor, Tone, Voice};
use super::task::TaskId;

/// Coarse style signals extracted from produced output, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentFeatures {
    pub structure: StructureStyle,
    pub tone: Tone,
    /// 0 = casual, 1 = formal.
    pub formality: f64,
    /// Output length in characters.
    pub length: usize,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub section_count: usize,
    #[serde(default)]
    pub has_numbered_steps: bool,
    #[serde(default)]
    pub has_bullet_points: bool,
    #[serde(default)]
    pub has_code_blocks: bool,
    #[serde(default)]
    pub has_tables: bool,
    /// Share of output that is code.
    #[serde(default)]
    pub code_ratio: f64,
    /// Share of paragraphs that are examples.
    #[serde(default)]
    pub example_ratio: f64,
    #[serde(default)]
    pub explanation_ratio: f64,
}

impl ContentFeatures {
    /// Style descriptor implied by these features.
    pub fn style(&self) -> StyleDescriptor {
        StyleDescriptor {
            structure: self.structure.clone(),
            tone: self.tone.clone(),
            voice: Voice::from_formality(self.formality),
            depth: Depth::from_length(self.length),
            code_density: CodeDensity::from_ratio(self.code_ratio),
            example_density: ExampleDensity::from_ratio(self.example_ratio),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub task_id: TaskId,
    /// Caller's own task reference, if one was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_task_id: Option<String>,
    pub specialist_id: SpecialistId,
    pub approach_id: ApproachId,
    pub task_signature: TaskSignature,
    pub task_class: TaskClassKey,
    pub quality: f64,
    pub success: bool,
    pub quality_target: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_features: Option<ContentFeatures>,
    pub timestamp: DateTime<Utc>,
}

/// Filter for [`ExecutionHistoryRepository::query_recent`](super::repository::ExecutionHistoryRepository::query_recent).
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub limit: usize,
    pub min_quality: Option<f64>,
    pub approach_id: Option<ApproachId>,
}

impl HistoryQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            limit,
            min_quality: None,
            approach_id: None,
        }
    }

    pub fn with_min_quality(mut self, min_quality: f64) -> Self {
        self.min_quality = Some(min_quality);
        self
    }

    pub fn for_approach(mut self, approach_id: ApproachId) -> Self {
        self.approach_id = Some(approach_id);
        self
    }

    pub fn matches(&self, record: &ExecutionRecord) -> bool {
        if let Some(min) = self.min_quality {
            if record.quality < min {
                return false;
            }
        }
        if let Some(approach_id) = &self.approach_id {
            if &record.approach_id != approach_id {
                return false;
            }
        }
        true
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_query_filters() {
        let record = fixtures::record("t1", "seed_tutorial", 0.6, Utc::now());
        assert!(HistoryQuery::recent(10).matches(&record));
        assert!(!HistoryQuery::recent(10).with_min_quality(0.7).matches(&record));
        assert!(!HistoryQuery::recent(10)
            .for_approach(ApproachId::from("seed_summary"))
            .matches(&record));
    }

    #[test]
    fn test_content_features_imply_style() {
        let features = ContentFeatures {
            structure: StructureStyle::SequentialSteps,
            tone: Tone::Educational,
            formality: 0.5,
            length: 2500,
            word_count: 400,
            section_count: 3,
            has_numbered_steps: true,
            has_bullet_points: false,
            has_code_blocks: true,
            has_tables: false,
            code_ratio: 0.25,
            example_ratio: 0.5,
            explanation_ratio: 0.3,
        };
        let style = features.style();
        assert_eq!(style.voice, Voice::SecondPerson);
        assert_eq!(style.depth, Depth::Moderate);
        assert_eq!(style.code_density, CodeDensity::Annotated);
        assert_eq!(style.example_density, ExampleDensity::High);
    }
}
