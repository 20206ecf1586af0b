//! Query-text preprocessing: content-word filtering before embedding.
//!
//! Keeps the tokens that carry meaning (minimum length, stopwords
//! dropped, light suffix stripping so inflected forms match) and hands
//! the filtered text to the encoder. When filtering would leave nothing,
//! the raw text is used as-is so the encoder never sees an empty string.

const MIN_TOKEN_LEN: usize = 2;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has",
    "have", "in", "is", "it", "its", "of", "on", "or", "that", "the",
    "this", "to", "was", "were", "will", "with", "near", "around",
];

/// Filter a query down to its content words, joined by single spaces.
pub fn filter_query(text: &str) -> String {
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .map(|t| strip_suffix(&t))
        .collect();

    if tokens.is_empty() {
        text.trim().to_string()
    } else {
        tokens.join(" ")
    }
}

/// Strip a common inflectional suffix. Ordered longest-first so "-ies"
/// wins over "-es" wins over "-s".
fn strip_suffix(word: &str) -> String {
    if word.chars().count() <= 3 || !word.is_ascii() {
        return word.to_string();
    }

    let rules: &[(&str, &str)] = &[
        ("ies", "y"),
        ("ing", ""),
        ("ches", "ch"),
        ("shes", "sh"),
        ("es", "e"),
        ("ed", ""),
        ("ss", "ss"),
        ("s", ""),
    ];

    for &(suffix, replacement) in rules {
        if word.len() > suffix.len() + 1 && word.ends_with(suffix) {
            return format!("{}{}", &word[..word.len() - suffix.len()], replacement);
        }
    }

    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_stopwords_and_short_tokens() {
        assert_eq!(filter_query("a walk by the old bridge"), "walk old bridge");
    }

    #[test]
    fn test_suffix_stripping() {
        assert_eq!(strip_suffix("bridges"), "bridge");
        assert_eq!(strip_suffix("cities"), "city");
        assert_eq!(strip_suffix("hiking"), "hik");
        assert_eq!(strip_suffix("glass"), "glass");
    }

    #[test]
    fn test_non_ascii_tokens_pass_through() {
        // Non-ASCII words keep their full form; no suffix rules apply.
        assert_eq!(filter_query("函館 夜景"), "函館 夜景");
    }

    #[test]
    fn test_all_filtered_falls_back_to_raw() {
        assert_eq!(filter_query("at the"), "at the");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(filter_query("mountain views"), filter_query("mountain views"));
    }
}
