// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Style Descriptors
//!
//! Generation guidance attached to every approach. The core never interprets
//! these tags; it only stores them, votes on them during discovery and hands
//! them to the external executor.
//!
//! Each field is a closed enum with an `Extension` bucket so tags written by
//! newer versions survive a round trip through older ones.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! style_tag {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $tag:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// Tag unknown to this version, preserved verbatim.
            Extension(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $tag,)+
                    Self::Extension(other) => other.as_str(),
                }
            }
        }

        impl From<&str> for $name {
            fn from(tag: &str) -> Self {
                match tag.trim().to_ascii_lowercase().as_str() {
                    $($tag => Self::$variant,)+
                    _ => Self::Extension(tag.trim().to_string()),
                }
            }
        }

        impl From<String> for $name {
            fn from(tag: String) -> Self {
                Self::from(tag.as_str())
            }
        }

        impl From<$name> for String {
            fn from(tag: $name) -> Self {
                tag.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

style_tag!(
    /// Overall layout of the produced content.
    StructureStyle {
        SequentialSteps => "sequential_steps",
        Bulleted => "bulleted",
        Hierarchical => "hierarchical",
        Prose => "prose",
    }
);

style_tag!(
    Tone {
        Formal => "formal",
        Casual => "casual",
        Technical => "technical",
        Educational => "educational",
        Neutral => "neutral",
    }
);

style_tag!(
    Voice {
        FirstPerson => "first_person",
        SecondPerson => "second_person",
        ThirdPerson => "third_person",
    }
);

style_tag!(
    Depth {
        Concise => "concise",
        Moderate => "moderate",
        Comprehensive => "comprehensive",
        Exhaustive => "exhaustive",
    }
);

style_tag!(
    /// How much code the output should carry.
    CodeDensity {
        NoCode => "none",
        Minimal => "minimal",
        Annotated => "annotated",
        Production => "production",
    }
);

style_tag!(
    ExampleDensity {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

impl StructureStyle {
    /// Human-readable label used in generated approach names.
    pub fn display_name(&self) -> String {
        match self {
            Self::SequentialSteps => "Step-by-Step".to_string(),
            Self::Bulleted => "Bulleted".to_string(),
            Self::Hierarchical => "Structured".to_string(),
            Self::Prose => "Narrative".to_string(),
            Self::Extension(other) => title_case(other),
        }
    }
}

impl Voice {
    /// >0.7 third person, <0.3 first person, otherwise second person.
    pub fn from_formality(formality: f64) -> Self {
        if formality > 0.7 {
            Self::ThirdPerson
        } else if formality < 0.3 {
            Self::FirstPerson
        } else {
            Self::SecondPerson
        }
    }
}

impl Depth {
    /// Bucket by output length in characters.
    pub fn from_length(chars: usize) -> Self {
        match chars {
            0..=999 => Self::Concise,
            1000..=2999 => Self::Moderate,
            3000..=4999 => Self::Comprehensive,
            _ => Self::Exhaustive,
        }
    }
}

impl CodeDensity {
    pub fn from_ratio(code_ratio: f64) -> Self {
        if code_ratio < 0.05 {
            Self::NoCode
        } else if code_ratio < 0.2 {
            Self::Minimal
        } else if code_ratio < 0.4 {
            Self::Annotated
        } else {
            Self::Production
        }
    }
}

impl ExampleDensity {
    pub fn from_ratio(example_ratio: f64) -> Self {
        if example_ratio < 0.2 {
            Self::Low
        } else if example_ratio < 0.4 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// Complete style guidance for one approach.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleDescriptor {
    pub structure: StructureStyle,
    pub tone: Tone,
    pub voice: Voice,
    pub depth: Depth,
    pub code_density: CodeDensity,
    pub example_density: ExampleDensity,
}

impl Default for StyleDescriptor {
    fn default() -> Self {
        Self {
            structure: StructureStyle::Prose,
            tone: Tone::Neutral,
            voice: Voice::SecondPerson,
            depth: Depth::Moderate,
            code_density: CodeDensity::NoCode,
            example_density: ExampleDensity::Medium,
        }
    }
}

pub(crate) fn title_case(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags_parse_case_insensitively() {
        assert_eq!(Tone::from("Formal"), Tone::Formal);
        assert_eq!(StructureStyle::from("sequential_steps"), StructureStyle::SequentialSteps);
        assert_eq!(CodeDensity::from("none"), CodeDensity::NoCode);
    }

    #[test]
    fn test_unknown_tags_land_in_extension_bucket() {
        let tone = Tone::from("whimsical");
        assert_eq!(tone, Tone::Extension("whimsical".into()));
        assert_eq!(tone.as_str(), "whimsical");
    }

    #[test]
    fn test_style_serializes_as_plain_tags() {
        let style = StyleDescriptor {
            tone: Tone::Extension("poetic".into()),
            ..StyleDescriptor::default()
        };
        let json = serde_json::to_value(&style).unwrap();
        assert_eq!(json["structure"], "prose");
        assert_eq!(json["tone"], "poetic");
        assert_eq!(json["code_density"], "none");

        let back: StyleDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, style);
    }

    #[test]
    fn test_bucketing_thresholds() {
        assert_eq!(Voice::from_formality(0.8), Voice::ThirdPerson);
        assert_eq!(Voice::from_formality(0.2), Voice::FirstPerson);
        assert_eq!(Voice::from_formality(0.5), Voice::SecondPerson);
        assert_eq!(Depth::from_length(999), Depth::Concise);
        assert_eq!(Depth::from_length(1000), Depth::Moderate);
        assert_eq!(Depth::from_length(6000), Depth::Exhaustive);
        assert_eq!(CodeDensity::from_ratio(0.3), CodeDensity::Annotated);
        assert_eq!(ExampleDensity::from_ratio(0.45), ExampleDensity::High);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(StructureStyle::SequentialSteps.display_name(), "Step-by-Step");
        assert_eq!(StructureStyle::from("q_and_a").display_name(), "Q And A");
    }
}
