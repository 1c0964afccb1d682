/// Brackets, question marks and sentence punctuation dropped before comparison,
/// in both full-width and half-width forms.
const STRIPPED: &[char] = &[
    '（', '）', '(', ')', '［', '］', '[', ']', '【', '】', '「', '」', '『', '』', '？', '?', '。',
    '、',
];

/// Canonical form of a question or option string: punctuation and all whitespace
/// removed, then lower-cased.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !STRIPPED.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}
