use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::structure::classify::{ClassificationResult, Method};
use crate::structure::BlockType;

/// A block type and label assigned by the user to a header text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub block_type: BlockType,
    pub label: String,
    pub recorded_at: DateTime<Utc>,
}

/// What the classifier has learned about header lines.
///
/// All maps are keyed by the lowercase, trimmed line text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningStore {
    /// Types taught by user corrections.
    pub learned_terms: BTreeMap<String, BlockType>,
    /// Types recognized from primary dictionary terms.
    pub pattern_history: BTreeMap<String, BlockType>,
    pub user_corrections: BTreeMap<String, Correction>,
    /// Highest confidence seen for each line.
    pub confidence: BTreeMap<String, f64>,
}

/// Entry counts per map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LearningStats {
    pub learned_terms: usize,
    pub pattern_history: usize,
    pub user_corrections: usize,
    pub confidence_scores: usize,
}

/// Normalize a line into a store key.
pub fn store_key(line: &str) -> String {
    line.trim().to_lowercase()
}

impl LearningStore {
    /// Record a confident classification of `line`.
    pub fn observe(&mut self, line: &str, result: &ClassificationResult) {
        let key = store_key(line);
        let seen = self.confidence.entry(key.clone()).or_insert(0.0);
        *seen = seen.max(result.confidence);

        if result.method == Method::Explicit {
            self.pattern_history.insert(key, result.block_type);
        }
    }

    /// Teach the store that `legend` is a `block_type` block labeled `label`.
    pub fn record_correction(&mut self, legend: &str, block_type: BlockType, label: &str) {
        let key = store_key(legend);
        self.user_corrections.insert(
            key.clone(),
            Correction {
                block_type,
                label: label.to_string(),
                recorded_at: Utc::now(),
            },
        );
        self.learned_terms.insert(key, block_type);
    }

    pub fn correction_for(&self, line: &str) -> Option<&Correction> {
        self.user_corrections.get(&store_key(line))
    }

    pub fn clear(&mut self) {
        self.learned_terms.clear();
        self.pattern_history.clear();
        self.user_corrections.clear();
        self.confidence.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.learned_terms.is_empty()
            && self.pattern_history.is_empty()
            && self.user_corrections.is_empty()
            && self.confidence.is_empty()
    }

    pub fn stats(&self) -> LearningStats {
        LearningStats {
            learned_terms: self.learned_terms.len(),
            pattern_history: self.pattern_history.len(),
            user_corrections: self.user_corrections.len(),
            confidence_scores: self.confidence.len(),
        }
    }
}
