use crate::core::record::QuestionRecord;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// Spelling variants and compound labels folded onto the canonical category list.
/// Compound labels keep their first category.
const CATEGORY_ALIASES: &[(&str, &str)] = &[
    ("神 社", "神社"),
    ("祭り", "祭と行事"),
    ("祭り・行事", "祭と行事"),
    ("祭事・行事", "祭と行事"),
    ("歴史・史跡", "歴史"),
    ("歴史、史跡", "歴史"),
    ("社寺", "寺院"),
    ("神社、寺院", "神社"),
    ("建築・庭園", "建築"),
    ("庭園・建築", "庭園"),
    ("建築、庭園、美術", "建築"),
    ("美術・文学", "美術"),
    ("美術・伝統工芸", "美術"),
    ("京料理・京菓子", "京料理"),
    ("花街・祇園祭", "花街"),
    ("地理・地名", "地名"),
    ("地理・街路", "地名"),
    ("地域・地名", "地名"),
    ("食文化", "京料理"),
    ("慣習・文化", "ならわし"),
];

pub const CANONICAL_CATEGORIES: &[&str] = &[
    "歴史",
    "史跡",
    "神社",
    "寺院",
    "建築",
    "庭園",
    "美術",
    "伝統工芸",
    "伝統文化",
    "花街",
    "祭と行事",
    "京料理",
    "京菓子",
    "ならわし",
    "ことばと伝説",
    "地名",
    "自然",
    "観光学",
];

static ALIASES: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| CATEGORY_ALIASES.iter().copied().collect());

/// Canonical name for `category`; labels outside the alias table pass through.
pub fn normalize_category(category: &str) -> &str {
    ALIASES.get(category).copied().unwrap_or(category)
}

/// Category changed by `normalize_categories`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryChange {
    pub index: usize,
    pub id: String,
    pub from: String,
    pub to: String,
}

/// Rewrite every record's category to its canonical name. Returns the changes and
/// the per-category counts after rewriting.
pub fn normalize_categories(
    records: &mut [QuestionRecord],
) -> (Vec<CategoryChange>, BTreeMap<String, usize>) {
    let mut changes = Vec::new();
    let mut counts = BTreeMap::new();

    for (index, record) in records.iter_mut().enumerate() {
        let canonical = normalize_category(&record.category).to_string();
        if canonical != record.category {
            log::debug!("{}: category {:?} → {:?}", record.id, record.category, canonical);
            changes.push(CategoryChange {
                index,
                id: record.id.clone(),
                from: std::mem::replace(&mut record.category, canonical.clone()),
                to: canonical.clone(),
            });
        }
        *counts.entry(canonical).or_insert(0) += 1;
    }

    (changes, counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::tests::record;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_variants_fold_to_canonical() {
        assert_eq!(normalize_category("神 社"), "神社");
        assert_eq!(normalize_category("祭り"), "祭と行事");
        assert_eq!(normalize_category("歴史・史跡"), "歴史");
        assert_eq!(normalize_category("社寺"), "寺院");
        assert_eq!(normalize_category("神社、寺院"), "神社");
    }

    #[test]
    fn test_canonical_and_unknown_pass_through() {
        for category in CANONICAL_CATEGORIES {
            assert_eq!(normalize_category(category), *category);
        }
        assert_eq!(normalize_category("その他"), "その他");
    }

    #[test]
    fn test_aliases_target_canonical_names() {
        for (_, target) in CATEGORY_ALIASES {
            assert!(CANONICAL_CATEGORIES.contains(target), "{} is not canonical", target);
        }
    }

    #[test]
    fn test_normalize_categories_rewrites_records() {
        let options = ["a", "b", "c", "d"];
        let mut records = vec![
            record("q001", "神 社", "伏見稲荷大社の祭神は？", options),
            record("q002", "神社", "下鴨神社の祭は？", options),
            record("q003", "祭り", "祇園祭の月は？", options),
        ];

        let (changes, counts) = normalize_categories(&mut records);

        assert_eq!(
            changes.iter().map(|c| (c.id.as_str(), c.to.as_str())).collect::<Vec<_>>(),
            vec![("q001", "神社"), ("q003", "祭と行事")]
        );
        assert_eq!(changes[0].from, "神 社");
        assert_eq!(records[0].category, "神社");
        assert_eq!(counts.get("神社"), Some(&2));
        assert_eq!(counts.get("祭と行事"), Some(&1));
    }
}
