use crate::core::category::normalize_category;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Number of answer choices every question carries.
pub const OPTION_COUNT: usize = 4;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Duplicate question id: {id}")]
    DuplicateId { id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Difficulty tier of the exam a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "2級")]
    Second,
    #[serde(rename = "3級")]
    Third,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Second => "2級",
            Level::Third => "3級",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only records sharing a partition key are ever compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub level: Level,
    pub category: String,
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level, self.category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: String,
    pub level: Level,
    pub category: String,
    pub exam_year: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
}

impl QuestionRecord {
    /// Level plus canonical category, so spelling variants share a partition.
    pub fn partition_key(&self) -> PartitionKey {
        PartitionKey {
            level: self.level,
            category: normalize_category(&self.category).to_string(),
        }
    }

    pub fn shares_partition(&self, other: &QuestionRecord) -> bool {
        self.level == other.level
            && normalize_category(&self.category) == normalize_category(&other.category)
    }

    /// Check the invariants the similarity engine relies on.
    pub fn validate(&self) -> Result<(), RecordError> {
        let invalid = |reason: String| RecordError::InvalidRecord {
            id: self.id.clone(),
            reason,
        };

        let digits = self.id.strip_prefix('q').unwrap_or_default();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(format!(
                "id must be 'q' followed by digits, got {:?}",
                self.id
            )));
        }

        if self.question.trim().is_empty() {
            return Err(invalid("question text is empty".to_string()));
        }

        if self.options.len() != OPTION_COUNT {
            return Err(invalid(format!(
                "expected {} options, found {}",
                OPTION_COUNT,
                self.options.len()
            )));
        }

        let distinct: HashSet<&str> = self.options.iter().map(String::as_str).collect();
        if distinct.len() != self.options.len() {
            return Err(invalid("options are not distinct".to_string()));
        }

        if self.correct_answer >= self.options.len() {
            return Err(invalid(format!(
                "correctAnswer {} is out of range 0..{}",
                self.correct_answer,
                self.options.len()
            )));
        }

        Ok(())
    }
}

/// On-disk question file: `{"questions": [...]}`. Unknown top-level keys survive a
/// load/save cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionBank {
    pub questions: Vec<QuestionRecord>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl QuestionBank {
    pub fn new(questions: Vec<QuestionRecord>) -> Self {
        Self {
            questions,
            extra: serde_json::Map::new(),
        }
    }

    /// Parse without validating, used when repairing a bank.
    pub fn load_unchecked(path: &Path) -> Result<Self, RecordError> {
        let raw = fs::read_to_string(path)?;
        let bank: QuestionBank = serde_json::from_str(&raw)?;
        log::debug!(
            "loaded {} questions from {}",
            bank.questions.len(),
            path.display()
        );
        Ok(bank)
    }

    /// Parse and validate every record, rejecting repeated identifiers.
    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let bank = Self::load_unchecked(path)?;
        bank.validate()?;
        Ok(bank)
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        let mut seen = HashSet::new();
        for record in &self.questions {
            record.validate()?;
            if !seen.insert(record.id.as_str()) {
                return Err(RecordError::DuplicateId {
                    id: record.id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), RecordError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json + "\n")?;
        Ok(())
    }
}

/// Number of records per (level, category).
pub fn partition_counts(records: &[QuestionRecord]) -> BTreeMap<PartitionKey, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.partition_key()).or_insert(0) += 1;
    }
    counts
}
