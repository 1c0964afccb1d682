pub mod core;

pub use crate::core::category::normalize_category;
pub use crate::core::classifier::{classify, ComparisonMode, Verdict};
pub use crate::core::keywords::{KeywordExtractor, PatternKeywordExtractor, TermSet};
pub use crate::core::normalize::normalize;
pub use crate::core::record::{Level, PartitionKey, QuestionBank, QuestionRecord, RecordError};
pub use crate::core::scanner::{
    Collision, CorpusMatch, CorpusScanner, MatchPolicy, Report, ScanError, ScanOptions,
};
pub use crate::core::similarity::{SimilarityResult, SimilarityScorer};
