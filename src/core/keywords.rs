use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use thiserror::Error;

/// Ordered so that shared-term listings come out the same on every run.
pub type TermSet = BTreeSet<String>;

#[derive(Debug, Error)]
pub enum KeywordError {
    #[error("Invalid keyword pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Pulls candidate named entities out of a question.
pub trait KeywordExtractor: Send + Sync {
    fn extract_terms(&self, text: &str) -> TermSet;
}

/// Domain patterns matched against the raw question text: eras, temples and
/// shrines, emperors and shoguns, festivals, streets, crafts.
pub const DEFAULT_PATTERNS: &[&str] = &[
    r"[年代]\d+年",
    r"[平鎌室江明大昭]\w+時代",
    r"\w+[寺院神社]",
    r"\w+[天皇将軍]",
    r"\w+[祭り祭]",
    r"\w+[通り道]",
    r"\w+[織焼]",
];

/// Runs of katakana or of kanji, two characters or longer.
const PROPER_NOUN_PATTERN: &str = r"[ア-ヲ]{2,}|[一-龯]{2,}";

static DEFAULT_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DEFAULT_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("Failed to compile keyword pattern"))
        .collect()
});

static PROPER_NOUN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(PROPER_NOUN_PATTERN).expect("Failed to compile proper noun pattern")
});

/// Regex-driven extractor for Japanese question text.
#[derive(Debug, Clone)]
pub struct PatternKeywordExtractor {
    patterns: Vec<Regex>,
}

impl PatternKeywordExtractor {
    pub fn new() -> Self {
        Self {
            patterns: DEFAULT_REGEXES.clone(),
        }
    }

    /// Default patterns plus `extra`.
    pub fn with_extra_patterns<I, S>(extra: I) -> Result<Self, KeywordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extractor = Self::new();
        for pattern in extra {
            let pattern = pattern.as_ref();
            let regex = Regex::new(pattern).map_err(|source| KeywordError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            extractor.patterns.push(regex);
        }
        Ok(extractor)
    }
}

impl Default for PatternKeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordExtractor for PatternKeywordExtractor {
    fn extract_terms(&self, text: &str) -> TermSet {
        let mut terms = TermSet::new();

        for pattern in &self.patterns {
            terms.extend(pattern.find_iter(text).map(|m| m.as_str().to_string()));
        }

        terms.extend(
            PROPER_NOUN_REGEX
                .find_iter(text)
                .map(|m| m.as_str())
                .filter(|noun| noun.chars().count() >= 2)
                .map(str::to_string),
        );

        terms
    }
}
