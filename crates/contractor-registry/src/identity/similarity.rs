use std::collections::BTreeSet;

/// Levenshtein similarity as a percentage rounded to two decimals.
///
/// Inputs are expected to be normalized already. Two empty names are identical.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 100.0;
    }

    let distance = strsim::levenshtein(a, b);
    let ratio = 1.0 - distance as f64 / longest as f64;
    round_to_hundredths(ratio * 100.0)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Word trigram similarity in `[0, 1]`, matching the usual trigram index semantics:
/// each lowercase word is padded with two leading blanks and one trailing blank and
/// the resulting trigram sets are compared by Jaccard ratio.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let left = trigrams(a);
    let right = trigrams(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(&right).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}

fn trigrams(value: &str) -> BTreeSet<[char; 3]> {
    let mut set = BTreeSet::new();
    let lowered = value.to_lowercase();

    for word in lowered
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        for window in padded.windows(3) {
            set.insert([window[0], window[1], window[2]]);
        }
    }

    set
}
