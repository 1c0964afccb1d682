use crate::core::classifier::{classify, ComparisonMode, Verdict};
use crate::core::record::{partition_counts, PartitionKey, QuestionRecord, RecordError};
use crate::core::similarity::{compare_profiles, QuestionProfile, SimilarityResult, SimilarityScorer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    InvalidRecord(#[from] RecordError),

    #[error("Question id {id} appears more than once in the {set}")]
    DuplicateId { id: String, set: &'static str },

    #[error("Question id {id} is present in both the candidates and the corpus")]
    Overlap { id: String },
}

/// Which corpus matches above the floor are kept per candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPolicy {
    /// Highest-scoring match only.
    #[default]
    BestOnly,
    /// Every match above the floor, best first.
    AllAboveFloor,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub policy: MatchPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanPhase {
    CorpusComparison,
    BatchComparison,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    pub processed: usize,
    pub total: usize,
    pub phase: ScanPhase,
}

/// A candidate paired with an existing corpus record: the verdict, the matched
/// record (and so its id) and the result that produced the verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusMatch {
    pub verdict: Verdict,
    pub candidate: QuestionRecord,
    pub existing: QuestionRecord,
    pub result: SimilarityResult,
}

/// Two candidates of the same batch that look alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collision {
    pub first: QuestionRecord,
    pub second: QuestionRecord,
    pub result: SimilarityResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub duplicates: Vec<CorpusMatch>,
    pub similar: Vec<CorpusMatch>,
    pub collisions: Vec<Collision>,
    /// Candidate count per "<level> <category>".
    pub candidate_partitions: BTreeMap<String, usize>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.collisions.is_empty()
    }
}

type ProgressFn = Box<dyn Fn(ScanProgress) + Send + Sync>;

pub struct CorpusScanner {
    scorer: SimilarityScorer,
    options: ScanOptions,
    progress: Option<ProgressFn>,
}

impl CorpusScanner {
    pub fn new() -> Self {
        Self::with_scorer(SimilarityScorer::new())
    }

    pub fn with_scorer(scorer: SimilarityScorer) -> Self {
        Self {
            scorer,
            options: ScanOptions::default(),
            progress: None,
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress(mut self, progress: impl Fn(ScanProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Compare every candidate against same-partition corpus records and against
    /// its sibling candidates.
    pub fn scan(
        &self,
        candidates: &[QuestionRecord],
        corpus: &[QuestionRecord],
    ) -> Result<Report, ScanError> {
        validate_sets(candidates, corpus)?;

        let mut partitions: HashMap<PartitionKey, Vec<QuestionProfile<'_>>> = HashMap::new();
        for record in corpus {
            partitions
                .entry(record.partition_key())
                .or_default()
                .push(self.scorer.profile(record));
        }
        log::info!(
            "scanning {} candidates against {} corpus records in {} partitions",
            candidates.len(),
            corpus.len(),
            partitions.len()
        );

        let profiles: Vec<QuestionProfile<'_>> = candidates
            .par_iter()
            .map(|record| self.scorer.profile(record))
            .collect();

        let mut report = Report {
            candidate_partitions: partition_counts(candidates)
                .into_iter()
                .map(|(key, count)| (key.to_string(), count))
                .collect(),
            ..Report::default()
        };

        for entry in self.corpus_matches(&profiles, &partitions) {
            let verdict = entry.verdict;
            match verdict {
                Verdict::Duplicate => report.duplicates.push(entry),
                Verdict::Similar => report.similar.push(entry),
                Verdict::NoMatch => {}
            }
        }

        report.collisions = self.batch_collisions(&profiles);

        self.send_progress(ScanProgress {
            processed: candidates.len(),
            total: candidates.len(),
            phase: ScanPhase::Complete,
        });
        log::info!(
            "scan complete: {} duplicates, {} similar, {} collisions",
            report.duplicates.len(),
            report.similar.len(),
            report.collisions.len()
        );

        Ok(report)
    }

    fn corpus_matches(
        &self,
        candidates: &[QuestionProfile<'_>],
        partitions: &HashMap<PartitionKey, Vec<QuestionProfile<'_>>>,
    ) -> Vec<CorpusMatch> {
        let total = candidates.len();
        let processed = AtomicUsize::new(0);

        candidates
            .par_iter()
            .map(|candidate| {
                let key = candidate.record.partition_key();
                let peers = partitions.get(&key).map(Vec::as_slice).unwrap_or_default();
                log::debug!(
                    "{}: {} corpus records in partition {}",
                    candidate.record.id,
                    peers.len(),
                    key
                );

                let matches = self.matches_for(candidate, peers);

                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                self.send_progress(ScanProgress {
                    processed: done,
                    total,
                    phase: ScanPhase::CorpusComparison,
                });

                matches
                    .into_iter()
                    .map(|(existing, result)| CorpusMatch {
                        verdict: classify(result.score, ComparisonMode::CandidateVsCorpus),
                        candidate: candidate.record.clone(),
                        existing: existing.clone(),
                        result,
                    })
                    .collect::<Vec<_>>()
            })
            .flatten()
            .collect()
    }

    /// Corpus matches above the floor for one candidate, per the match policy.
    fn matches_for<'a>(
        &self,
        candidate: &QuestionProfile<'_>,
        peers: &[QuestionProfile<'a>],
    ) -> Vec<(&'a QuestionRecord, SimilarityResult)> {
        let floor = ComparisonMode::CandidateVsCorpus.floor();

        match self.options.policy {
            MatchPolicy::BestOnly => {
                let mut best: Option<(&'a QuestionRecord, SimilarityResult)> = None;
                for peer in peers {
                    let result = compare_profiles(candidate, peer);
                    let best_score = best.as_ref().map_or(floor, |(_, r)| r.score);
                    if result.score > best_score {
                        let exact = result.score >= 1.0;
                        best = Some((peer.record, result));
                        if exact {
                            break;
                        }
                    }
                }
                best.into_iter().collect()
            }
            MatchPolicy::AllAboveFloor => {
                let mut matches: Vec<_> = peers
                    .iter()
                    .map(|peer| (peer.record, compare_profiles(candidate, peer)))
                    .filter(|(_, result)| result.score > floor)
                    .collect();
                matches.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));
                matches
            }
        }
    }

    /// Unordered same-partition candidate pairs scoring above the collision threshold.
    fn batch_collisions(&self, candidates: &[QuestionProfile<'_>]) -> Vec<Collision> {
        let pairs: Vec<(usize, usize)> = (0..candidates.len())
            .flat_map(|i| ((i + 1)..candidates.len()).map(move |j| (i, j)))
            .filter(|&(i, j)| candidates[i].record.shares_partition(candidates[j].record))
            .collect();

        let total = pairs.len();
        let processed = AtomicUsize::new(0);

        pairs
            .par_iter()
            .filter_map(|&(i, j)| {
                let (first, second) = (&candidates[i], &candidates[j]);
                let result = compare_profiles(first, second);

                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                self.send_progress(ScanProgress {
                    processed: done,
                    total,
                    phase: ScanPhase::BatchComparison,
                });

                match classify(result.score, ComparisonMode::CandidateVsCandidate) {
                    Verdict::Duplicate => Some(Collision {
                        first: first.record.clone(),
                        second: second.record.clone(),
                        result,
                    }),
                    _ => None,
                }
            })
            .collect()
    }

    fn send_progress(&self, progress: ScanProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

impl Default for CorpusScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Both sets must hold valid records, unique ids within each set, and no id in both.
fn validate_sets(candidates: &[QuestionRecord], corpus: &[QuestionRecord]) -> Result<(), ScanError> {
    let corpus_ids = unique_ids(corpus, "corpus")?;
    unique_ids(candidates, "candidates")?;

    if let Some(id) = candidates
        .iter()
        .map(|r| r.id.as_str())
        .find(|id| corpus_ids.contains(id))
    {
        return Err(ScanError::Overlap { id: id.to_string() });
    }

    Ok(())
}

fn unique_ids<'a>(records: &'a [QuestionRecord], set: &'static str) -> Result<HashSet<&'a str>, ScanError> {
    let mut ids = HashSet::with_capacity(records.len());
    for record in records {
        record.validate()?;
        if !ids.insert(record.id.as_str()) {
            return Err(ScanError::DuplicateId {
                id: record.id.clone(),
                set,
            });
        }
    }
    Ok(ids)
}
