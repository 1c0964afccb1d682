use crate::core::record::{Level, QuestionRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a record sits in its bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub index: usize,
    pub id: String,
    pub level: Level,
    pub category: String,
}

impl Occurrence {
    fn of(index: usize, record: &QuestionRecord) -> Self {
        Self {
            index,
            id: record.id.clone(),
            level: record.level,
            category: record.category.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDuplicate {
    pub text: String,
    pub first: Occurrence,
    pub duplicate: Occurrence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdDuplicate {
    pub id: String,
    pub first_index: usize,
    pub duplicate_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactReport {
    pub unique_texts: usize,
    pub text_duplicates: Vec<TextDuplicate>,
    pub id_duplicates: Vec<IdDuplicate>,
}

/// Records whose trimmed question text, or whose id, already appeared earlier in
/// the bank. Works on unvalidated banks.
pub fn find_exact_duplicates(records: &[QuestionRecord]) -> ExactReport {
    let mut texts: HashMap<&str, Occurrence> = HashMap::new();
    let mut ids: HashMap<&str, usize> = HashMap::new();
    let mut report = ExactReport::default();

    for (index, record) in records.iter().enumerate() {
        let text = record.question.trim();
        match texts.get(text) {
            Some(first) => report.text_duplicates.push(TextDuplicate {
                text: text.to_string(),
                first: first.clone(),
                duplicate: Occurrence::of(index, record),
            }),
            None => {
                texts.insert(text, Occurrence::of(index, record));
            }
        }

        match ids.get(record.id.as_str()) {
            Some(&first_index) => report.id_duplicates.push(IdDuplicate {
                id: record.id.clone(),
                first_index,
                duplicate_index: index,
            }),
            None => {
                ids.insert(record.id.as_str(), index);
            }
        }
    }

    report.unique_texts = texts.len();
    report
}

/// Keep the first record for each trimmed question text. Returns `(kept, removed)`,
/// both in input order.
pub fn remove_exact_duplicates(
    records: Vec<QuestionRecord>,
) -> (Vec<QuestionRecord>, Vec<QuestionRecord>) {
    let mut seen = std::collections::HashSet::new();
    records
        .into_iter()
        .partition(|record| seen.insert(record.question.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::tests::record;
    use pretty_assertions::assert_eq;

    fn bank() -> Vec<QuestionRecord> {
        vec![
            record("q001", "寺院", "金閣寺の正式名称は？", ["鹿苑寺", "慈照寺", "東寺", "西寺"]),
            record("q002", "寺院", "銀閣寺の正式名称は？", ["鹿苑寺", "慈照寺", "東寺", "西寺"]),
            record("q003", "歴史", "  金閣寺の正式名称は？ ", ["鹿苑寺", "慈照寺", "東寺", "西寺"]),
            record("q002", "庭園", "龍安寺の石庭の石の数は？", ["十五", "十二", "七", "九"]),
        ]
    }

    #[test]
    fn test_finds_trimmed_text_duplicates() {
        let report = find_exact_duplicates(&bank());

        assert_eq!(report.unique_texts, 3);
        assert_eq!(report.text_duplicates.len(), 1);
        let dup = &report.text_duplicates[0];
        assert_eq!(dup.text, "金閣寺の正式名称は？");
        assert_eq!(dup.first.id, "q001");
        assert_eq!(dup.duplicate.id, "q003");
        assert_eq!(dup.duplicate.category, "歴史");
    }

    #[test]
    fn test_finds_repeated_ids() {
        let report = find_exact_duplicates(&bank());
        assert_eq!(
            report.id_duplicates,
            vec![IdDuplicate {
                id: "q002".to_string(),
                first_index: 1,
                duplicate_index: 3,
            }]
        );
    }

    #[test]
    fn test_clean_bank() {
        let report = find_exact_duplicates(&bank()[..2]);
        assert_eq!(report.unique_texts, 2);
        assert!(report.text_duplicates.is_empty());
        assert!(report.id_duplicates.is_empty());
    }

    #[test]
    fn test_remove_keeps_first_occurrence() {
        let (kept, removed) = remove_exact_duplicates(bank());
        let kept_ids: Vec<&str> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(kept_ids, vec!["q001", "q002", "q002"]);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].category, "歴史");
    }
}
