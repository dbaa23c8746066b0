//! Trigram extraction for fuzzy name matching / 三元组模糊匹配
//!
//! Follows the pg_trgm model so similarity scores are comparable to a
//! PostgreSQL deployment of the same corpus:
//! - text is split into words of alphanumeric characters and lower-cased
//! - each word is padded with two spaces in front and one behind
//! - the trigram set is every 3-character window of every padded word
//! - similarity = shared / (|A| + |B| - shared)

use std::collections::BTreeSet;

/// Minimum similarity for a name to count as a fuzzy match / 模糊匹配阈值
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

/// Extract the trigram set of a text / 提取三元组集合
pub fn trigrams(text: &str) -> BTreeSet<String> {
    let mut set = BTreeSet::new();

    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.chars().flat_map(char::to_lowercase))
            .chain(std::iter::once(' '))
            .collect();

        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }

    set
}
