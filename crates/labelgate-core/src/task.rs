//! Task types and their timing expectations.
//!
//! Two distinct minimum-time tables exist on purpose: bot detection asks "how
//! fast is physically plausible for an attentive human", while the threshold
//! strategy asks "how fast do we accept without a quality penalty". The bot
//! table is the stricter of the two.

use serde::{Deserialize, Serialize};

/// Kind of labeling task a submission answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Visual question answering.
    Vqa,
    /// Text classification.
    TextClassification,
    /// Multiple choice selection.
    MultipleChoice,
    /// Free-form text entry.
    OpenText,
    /// Any task type the engine has no specific tuning for.
    #[serde(untagged)]
    Other(String),
}

impl TaskType {
    /// Minimum time in milliseconds an attentive human plausibly needs,
    /// used by bot detection.
    #[must_use]
    pub const fn min_expected_time_ms(&self) -> i64 {
        match self {
            Self::Vqa => 2_000,
            Self::TextClassification => 1_500,
            Self::MultipleChoice => 1_000,
            Self::OpenText => 3_000,
            Self::Other(_) => 1_500,
        }
    }

    /// Minimum time in milliseconds below which the threshold strategy starts
    /// discounting quality.
    #[must_use]
    pub const fn min_threshold_time_ms(&self) -> i64 {
        match self {
            Self::Vqa => 1_500,
            Self::TextClassification => 1_000,
            Self::MultipleChoice => 800,
            Self::OpenText => 2_000,
            Self::Other(_) => 1_000,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vqa => f.write_str("vqa"),
            Self::TextClassification => f.write_str("text_classification"),
            Self::MultipleChoice => f.write_str("multiple_choice"),
            Self::OpenText => f.write_str("open_text"),
            Self::Other(name) => f.write_str(name),
        }
    }
}
