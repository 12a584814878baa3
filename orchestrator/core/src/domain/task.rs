// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Task input and decision identifiers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identifier the coordinator allocates for every issued decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(format!("task_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Either a single domain name or an explicit weight map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainSpec {
    Single(String),
    Weighted(BTreeMap<String, f64>),
}

/// Structured task record supplied by the external executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Caller's own reference; kept for correlation only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainSpec>,

    /// Complexity in `[0, 1]`; estimated from the description when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<f64>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,

    /// Estimated duration in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<f64>,
}

impl TaskRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(DomainSpec::Single(domain.into()));
        self
    }

    pub fn with_domain_weights(mut self, weights: BTreeMap<String, f64>) -> Self {
        self.domain = Some(DomainSpec::Weighted(weights));
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_type(mut self, output_type: impl Into<String>) -> Self {
        self.output_type = Some(output_type.into());
        self
    }

    pub fn with_estimated_duration(mut self, hours: f64) -> Self {
        self.estimated_duration = Some(hours);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_ids_are_unique() {
        assert_ne!(TaskId::new(), TaskId::new());
        assert!(TaskId::new().as_str().starts_with("task_"));
    }

    #[test]
    fn test_task_request_accepts_single_or_weighted_domain() {
        let single: TaskRequest =
            serde_json::from_str(r#"{"description":"Fix bug","domain":"coding"}"#).unwrap();
        assert_eq!(single.domain, Some(DomainSpec::Single("coding".into())));

        let weighted: TaskRequest = serde_json::from_str(
            r#"{"description":"Compare","domain":{"research":0.6,"comparison":0.4}}"#,
        )
        .unwrap();
        match weighted.domain {
            Some(DomainSpec::Weighted(w)) => assert_eq!(w.len(), 2),
            other => panic!("unexpected domain: {:?}", other),
        }
    }
}
