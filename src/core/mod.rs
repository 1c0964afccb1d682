// Duplicate detection for quiz question banks:
// - category: canonical category names for partitioning
// - normalize: canonical form of question/option text
// - keywords: named-entity style term extraction
// - similarity: text / keyword / option signals and the composite score
// - classifier: score thresholds per comparison mode
// - scanner: candidate-vs-corpus and candidate-vs-candidate passes
// - exact: identical-text and identifier checks over a single bank

pub mod category;
pub mod classifier;
pub mod exact;
pub mod keywords;
pub mod normalize;
pub mod record;
pub mod scanner;
pub mod similarity;
