use serde::{Deserialize, Serialize};

/// Above this a candidate duplicates a corpus record.
pub const CORPUS_DUPLICATE_THRESHOLD: f64 = 0.7;
/// Corpus matches at or below this are never reported.
pub const CORPUS_SIMILAR_FLOOR: f64 = 0.4;
/// Above this two candidates of the same batch collide.
pub const BATCH_COLLISION_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonMode {
    /// New candidate against the existing corpus.
    CandidateVsCorpus,
    /// Two candidates drafted in the same batch.
    CandidateVsCandidate,
}

impl ComparisonMode {
    /// Lowest score (exclusive) that produces anything other than `NoMatch`.
    pub fn floor(self) -> f64 {
        match self {
            ComparisonMode::CandidateVsCorpus => CORPUS_SIMILAR_FLOOR,
            ComparisonMode::CandidateVsCandidate => BATCH_COLLISION_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    NoMatch,
    Similar,
    Duplicate,
}

/// Map a composite score to a verdict. Candidate-vs-candidate has no `Similar`
/// tier: a collision is reported as `Duplicate`.
pub fn classify(score: f64, mode: ComparisonMode) -> Verdict {
    match mode {
        ComparisonMode::CandidateVsCorpus => {
            if score > CORPUS_DUPLICATE_THRESHOLD {
                Verdict::Duplicate
            } else if score > CORPUS_SIMILAR_FLOOR {
                Verdict::Similar
            } else {
                Verdict::NoMatch
            }
        }
        ComparisonMode::CandidateVsCandidate => {
            if score > BATCH_COLLISION_THRESHOLD {
                Verdict::Duplicate
            } else {
                Verdict::NoMatch
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_mode_tiers() {
        let mode = ComparisonMode::CandidateVsCorpus;
        assert_eq!(classify(1.0, mode), Verdict::Duplicate);
        assert_eq!(classify(0.71, mode), Verdict::Duplicate);
        assert_eq!(classify(0.7, mode), Verdict::Similar);
        assert_eq!(classify(0.41, mode), Verdict::Similar);
        assert_eq!(classify(0.4, mode), Verdict::NoMatch);
        assert_eq!(classify(0.0, mode), Verdict::NoMatch);
    }

    #[test]
    fn test_batch_mode_has_no_similar_tier() {
        let mode = ComparisonMode::CandidateVsCandidate;
        assert_eq!(classify(0.65, mode), Verdict::Duplicate);
        assert_eq!(classify(0.6, mode), Verdict::NoMatch);
        assert_eq!(classify(0.5, mode), Verdict::NoMatch);
    }

    #[test]
    fn test_floors() {
        assert_eq!(ComparisonMode::CandidateVsCorpus.floor(), 0.4);
        assert_eq!(ComparisonMode::CandidateVsCandidate.floor(), 0.6);
    }
}
