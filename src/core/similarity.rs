use crate::core::keywords::{KeywordExtractor, PatternKeywordExtractor, TermSet};
use crate::core::normalize::normalize;
use crate::core::record::QuestionRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub const TEXT_WEIGHT: f64 = 0.5;
pub const KEYWORD_WEIGHT: f64 = 0.3;
pub const OPTION_WEIGHT: f64 = 0.2;

// Reporting thresholds only; classification lives in `classifier`.
const TEXT_REASON_THRESHOLD: f64 = 0.6;
const KEYWORD_REASON_THRESHOLD: f64 = 0.5;
const OPTION_REASON_THRESHOLD: f64 = 0.5;
const MAX_SHARED_KEYWORDS: usize = 3;

pub const LOW_SIMILARITY: &str = "low similarity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResult {
    pub score: f64,
    pub text_similarity: f64,
    pub keyword_similarity: f64,
    pub option_similarity: f64,
    pub reasons: Vec<String>,
}

impl SimilarityResult {
    pub fn justification(&self) -> String {
        self.reasons.join(" | ")
    }
}

/// Comparison inputs derived from one record, computed once per scan.
#[derive(Debug, Clone)]
pub struct QuestionProfile<'a> {
    pub record: &'a QuestionRecord,
    pub text: String,
    pub terms: TermSet,
    pub options: BTreeSet<String>,
}

pub struct SimilarityScorer {
    extractor: Box<dyn KeywordExtractor>,
}

impl SimilarityScorer {
    pub fn new() -> Self {
        Self::with_extractor(PatternKeywordExtractor::new())
    }

    pub fn with_extractor(extractor: impl KeywordExtractor + 'static) -> Self {
        Self {
            extractor: Box::new(extractor),
        }
    }

    pub fn profile<'a>(&self, record: &'a QuestionRecord) -> QuestionProfile<'a> {
        QuestionProfile {
            record,
            text: normalize(&record.question),
            terms: self.extractor.extract_terms(&record.question),
            options: record.options.iter().map(|o| normalize(o)).collect(),
        }
    }

    pub fn score(&self, a: &QuestionRecord, b: &QuestionRecord) -> SimilarityResult {
        compare_profiles(&self.profile(a), &self.profile(b))
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Weighted composite of text, keyword and option similarity, with reasons.
pub fn compare_profiles(a: &QuestionProfile<'_>, b: &QuestionProfile<'_>) -> SimilarityResult {
    let text_similarity = sequence_ratio(&a.text, &b.text);
    let keyword_similarity = jaccard(&a.terms, &b.terms);
    let option_similarity = jaccard(&a.options, &b.options);

    let score = text_similarity * TEXT_WEIGHT
        + keyword_similarity * KEYWORD_WEIGHT
        + option_similarity * OPTION_WEIGHT;

    let mut reasons = Vec::new();
    if text_similarity > TEXT_REASON_THRESHOLD {
        reasons.push(format!("question-text similarity: {:.2}", text_similarity));
    }
    if keyword_similarity > KEYWORD_REASON_THRESHOLD {
        reasons.push(format!("keyword overlap: {:.2}", keyword_similarity));
        let shared: Vec<&str> = a
            .terms
            .intersection(&b.terms)
            .take(MAX_SHARED_KEYWORDS)
            .map(String::as_str)
            .collect();
        if !shared.is_empty() {
            reasons.push(format!("shared keywords: {}", shared.join(", ")));
        }
    }
    if option_similarity > OPTION_REASON_THRESHOLD {
        reasons.push(format!("option overlap: {:.2}", option_similarity));
    }
    if reasons.is_empty() {
        reasons.push(LOW_SIMILARITY.to_string());
    }

    SimilarityResult {
        score,
        text_similarity,
        keyword_similarity,
        option_similarity,
        reasons,
    }
}

/// `|A ∩ B| / |A ∪ B|`, 0 when both sets are empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Ratcliff/Obershelp ratio `2*M / T` over characters. Two empty strings give 1.0.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    // Longest-match tie-breaking depends on operand order.
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block in `a[alo..ahi]` / `b[blo..bhi]`, earliest in `a` on ties.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // j2len[j] = length of the match ending at a[i-1], b[j]
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = if j > 0 { j2len.get(&(j - 1)).copied().unwrap_or(0) } else { 0 } + 1;
                next.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::tests::record;

    const EPS: f64 = 1e-9;

    fn kinkaku(id: &str) -> QuestionRecord {
        record(
            id,
            "寺院",
            "金閣寺を建立した室町幕府の将軍は誰か？",
            ["足利義満", "足利義政", "足利尊氏", "織田信長"],
        )
    }

    #[test]
    fn test_sequence_ratio_basics() {
        assert!((sequence_ratio("abc", "abc") - 1.0).abs() < EPS);
        assert!((sequence_ratio("abcd", "bcde") - 0.75).abs() < EPS);
        assert!((sequence_ratio("", "") - 1.0).abs() < EPS);
        assert_eq!(sequence_ratio("ab", ""), 0.0);
        assert_eq!(sequence_ratio("ab", "cd"), 0.0);
    }

    #[test]
    fn test_sequence_ratio_recurses_both_sides() {
        // "qabxcd" vs "abycdf": blocks "ab" and "cd"
        assert!((sequence_ratio("qabxcd", "abycdf") - 8.0 / 12.0).abs() < EPS);
    }

    #[test]
    fn test_sequence_ratio_is_symmetric() {
        let pairs = [
            ("abab", "baba"),
            ("清水寺の舞台", "舞台の清水寺"),
            ("aaab", "abaa"),
            ("xyz", "zyx"),
        ];
        for (a, b) in pairs {
            assert_eq!(sequence_ratio(a, b), sequence_ratio(b, a));
        }
    }

    #[test]
    fn test_jaccard_empty_sets_are_zero() {
        let empty: BTreeSet<String> = BTreeSet::new();
        assert_eq!(jaccard(&empty, &empty), 0.0);

        let one: BTreeSet<String> = ["a".to_string()].into_iter().collect();
        assert_eq!(jaccard(&one, &empty), 0.0);
        assert_eq!(jaccard(&one, &one), 1.0);
    }

    #[test]
    fn test_self_similarity_is_maximal() {
        let scorer = SimilarityScorer::new();
        let a = kinkaku("q001");
        let result = scorer.score(&a, &a);
        assert!((result.text_similarity - 1.0).abs() < EPS);
        assert!((result.keyword_similarity - 1.0).abs() < EPS);
        assert!((result.option_similarity - 1.0).abs() < EPS);
        assert!((result.score - 1.0).abs() < EPS);
        assert!(result.reasons[0].starts_with("question-text similarity: 1.00"));
        assert!(result.justification().contains("shared keywords: "));
        assert!(result.justification().contains("option overlap: 1.00"));
    }

    #[test]
    fn test_explanation_is_ignored() {
        let scorer = SimilarityScorer::new();
        let a = kinkaku("q001");
        let mut b = kinkaku("q002");
        b.explanation = "鹿苑寺とも呼ばれる".to_string();
        assert!((scorer.score(&a, &b).score - 1.0).abs() < EPS);
    }

    #[test]
    fn test_score_is_symmetric() {
        let scorer = SimilarityScorer::new();
        let a = kinkaku("q001");
        let b = record(
            "q002",
            "寺院",
            "銀閣寺を建立した室町幕府の将軍は？",
            ["足利義政", "足利義満", "足利義教", "徳川家康"],
        );
        assert_eq!(scorer.score(&a, &b), scorer.score(&b, &a));
    }

    #[test]
    fn test_option_overlap_only_stays_low() {
        let scorer = SimilarityScorer::new();
        let a = record("q001", "寺院", "金閣寺を建てたのは誰", ["足利義満", "足利義政", "空海", "最澄"]);
        let b = record("q002", "寺院", "お茶のふるさとはどこ", ["足利義満", "足利義政", "宇治", "嵯峨"]);
        let result = scorer.score(&a, &b);

        // two shared out of a six-element union
        assert!((result.option_similarity - 2.0 / 6.0).abs() < EPS);
        assert_eq!(result.keyword_similarity, 0.0);
        assert!(result.score < 0.4);
        assert_eq!(result.reasons, vec![LOW_SIMILARITY.to_string()]);
    }

    #[test]
    fn test_score_is_bounded() {
        let scorer = SimilarityScorer::new();
        let records = [
            kinkaku("q001"),
            record("q002", "寺院", "？", ["a", "b", "c", "d"]),
            record("q003", "寺院", "Which temple?", ["A", "B", "C", "D"]),
        ];
        for a in &records {
            for b in &records {
                let s = scorer.score(a, b).score;
                assert!((0.0..=1.0 + EPS).contains(&s), "score {} out of range", s);
            }
        }
    }

    #[test]
    fn test_custom_extractor() {
        struct NoTerms;
        impl KeywordExtractor for NoTerms {
            fn extract_terms(&self, _text: &str) -> TermSet {
                TermSet::new()
            }
        }

        let scorer = SimilarityScorer::with_extractor(NoTerms);
        let a = kinkaku("q001");
        let result = scorer.score(&a, &a);
        assert_eq!(result.keyword_similarity, 0.0);
        assert!((result.score - 0.7).abs() < EPS);
    }
}
