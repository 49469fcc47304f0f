//! String similarity for fuzzy suburb matching
//!
//! Scorers implement `SimilarityScorer` and return 0-100. The default,
//! `WeightedRatio`, combines a plain Indel ratio with token-sorted,
//! token-set and partial (substring) variants, weighting each by how
//! different the string lengths are. It tolerates word reordering
//! ("BAY NEUTRAL") and partial overlap ("NORTH SYDNEY" vs "SYDNEY").

/// Pluggable similarity strategy
pub trait SimilarityScorer: Send + Sync {
    /// Similarity of two already-normalized strings, 0 (unrelated) to 100 (identical)
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Normalize for comparison: non-alphanumerics become spaces, whitespace is
/// collapsed, case is folded to upper.
pub fn normalize(s: &str) -> String {
    let mapped: String =
        s.chars().map(|c| if c.is_alphanumeric() { c } else { ' ' }).collect::<String>();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

/// Length of the longest common subsequence
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { prev[j + 1].max(curr[j]) };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Insertions + deletions needed to turn `a` into `b`
fn indel_distance(a: &[char], b: &[char]) -> usize {
    a.len() + b.len() - 2 * lcs_len(a, b)
}

/// Normalized Indel similarity on 0-100
fn indel_ratio(a: &[char], b: &[char]) -> f64 {
    let lensum = a.len() + b.len();
    if lensum == 0 {
        return 100.0;
    }
    100.0 * (1.0 - indel_distance(a, b) as f64 / lensum as f64)
}

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

/// Plain ratio of two strings
pub fn ratio(a: &str, b: &str) -> f64 {
    indel_ratio(&chars(a), &chars(b))
}

/// Best ratio of the shorter string against any same-length window of the
/// longer one, including windows that hang off either end
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (a, b) = (chars(a), chars(b));
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let (len_s, len_l) = (short.len(), long.len());

    let mut best = 0.0f64;
    let mut consider = |window: &[char]| {
        let r = indel_ratio(short, window);
        if r > best {
            best = r;
        }
    };

    for end in 1..len_s {
        consider(&long[..end]);
    }
    for start in 0..=(len_l - len_s) {
        consider(&long[start..start + len_s]);
    }
    for start in (len_l - len_s + 1)..len_l {
        consider(&long[start..]);
    }
    best
}

fn sorted_tokens(s: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

fn unique_sorted_tokens(s: &str) -> Vec<&str> {
    let mut tokens = sorted_tokens(s);
    tokens.dedup();
    tokens
}

/// Ratio after sorting the words of both strings
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a).join(" "), &sorted_tokens(b).join(" "))
}

/// Compare the shared words against each side's leftovers
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a = unique_sorted_tokens(a);
    let tokens_b = unique_sorted_tokens(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersect: Vec<&str> = tokens_a.iter().copied().filter(|t| tokens_b.contains(t)).collect();
    let diff_ab: Vec<&str> = tokens_a.iter().copied().filter(|t| !tokens_b.contains(t)).collect();
    let diff_ba: Vec<&str> = tokens_b.iter().copied().filter(|t| !tokens_a.contains(t)).collect();

    if !intersect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let diff_ab_joined = chars(&diff_ab.join(" "));
    let diff_ba_joined = chars(&diff_ba.join(" "));
    let ab_len = diff_ab_joined.len();
    let ba_len = diff_ba_joined.len();
    let sect_len = intersect.join(" ").chars().count();
    let sep = usize::from(sect_len != 0);

    // Lengths of "intersection + leftovers" on each side
    let sect_ab_len = sect_len + sep + ab_len;
    let sect_ba_len = sect_len + sep + ba_len;

    let dist = indel_distance(&diff_ab_joined, &diff_ba_joined);
    let mut result = 100.0 * (1.0 - dist as f64 / (sect_ab_len + sect_ba_len) as f64);

    if sect_len == 0 {
        return result;
    }

    let sect_ab_ratio = 100.0 * (1.0 - (sep + ab_len) as f64 / (sect_len + sect_ab_len) as f64);
    let sect_ba_ratio = 100.0 * (1.0 - (sep + ba_len) as f64 / (sect_len + sect_ba_len) as f64);
    result = result.max(sect_ab_ratio).max(sect_ba_ratio);
    result
}

/// Partial ratio over sorted words; any shared word scores 100
pub fn partial_token_ratio(a: &str, b: &str) -> f64 {
    let split_a = sorted_tokens(a);
    let split_b = sorted_tokens(b);
    let tokens_a = unique_sorted_tokens(a);
    let tokens_b = unique_sorted_tokens(b);

    if tokens_a.iter().any(|t| tokens_b.contains(t)) {
        return 100.0;
    }

    let result = partial_ratio(&split_a.join(" "), &split_b.join(" "));

    // Without duplicate words the set difference is the same string again
    if split_a.len() == tokens_a.len() && split_b.len() == tokens_b.len() {
        return result;
    }
    result.max(partial_ratio(&tokens_a.join(" "), &tokens_b.join(" ")))
}

/// Length-aware blend of the ratio family
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedRatio;

const UNBASE_SCALE: f64 = 0.95;

impl SimilarityScorer for WeightedRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        let (len_a, len_b) = (a.chars().count(), b.chars().count());
        if len_a == 0 || len_b == 0 {
            return 0.0;
        }

        let len_ratio = if len_a > len_b {
            len_a as f64 / len_b as f64
        } else {
            len_b as f64 / len_a as f64
        };

        let end_ratio = ratio(a, b);

        if len_ratio < 1.5 {
            let token_ratio = token_sort_ratio(a, b).max(token_set_ratio(a, b));
            return end_ratio.max(token_ratio * UNBASE_SCALE);
        }

        let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
        let end_ratio = end_ratio.max(partial_ratio(a, b) * partial_scale);
        end_ratio.max(partial_token_ratio(a, b) * UNBASE_SCALE * partial_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 0.01
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  St.  Leonards  "), "ST LEONARDS");
        assert_eq!(normalize("Manly (NSW)"), "MANLY NSW");
        assert_eq!(normalize("Mcmahons-Point"), "MCMAHONS POINT");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_ratio_basics() {
        assert!(approx(ratio("SYDNEY", "SYDNEY"), 100.0));
        assert!(approx(ratio("SYNDEY", "SYDNEY"), 83.333));
        assert!(approx(ratio("PARRAMATA", "PARRAMATTA"), 94.737));
        assert!(approx(ratio("", ""), 100.0));
        assert!(approx(ratio("ABC", "XYZ"), 0.0));
    }

    #[test]
    fn test_partial_ratio_finds_substring() {
        assert!(approx(partial_ratio("SYDNEY", "NORTH SYDNEY"), 100.0));
        assert!(approx(partial_ratio("NORTH SYDNEY", "SYDNEY"), 100.0));
        assert!(approx(partial_ratio("", "SYDNEY"), 0.0));
    }

    #[test]
    fn test_token_sort_ignores_order() {
        assert!(approx(token_sort_ratio("BAY NEUTRAL", "NEUTRAL BAY"), 100.0));
    }

    #[test]
    fn test_token_set_subset_is_full_score() {
        assert!(approx(token_set_ratio("POTTS POINT", "POTTS POINT POTTS"), 100.0));
        assert!(approx(token_set_ratio("SYNDEY", "SYDNEY"), 83.333));
    }

    #[test]
    fn test_weighted_ratio_misspelling() {
        let scorer = WeightedRatio;
        assert!(approx(scorer.score("SYNDEY", "SYDNEY"), 83.333));
        assert!(scorer.score("PARRAMATA", "PARRAMATTA") >= 85.0);
    }

    #[test]
    fn test_weighted_ratio_reordered_words() {
        assert!(approx(WeightedRatio.score("BAY NEUTRAL", "NEUTRAL BAY"), 95.0));
    }

    #[test]
    fn test_weighted_ratio_partial_overlap() {
        // 6 vs 12 chars: partial match scaled by 0.9
        assert!(approx(WeightedRatio.score("SYDNEY", "NORTH SYDNEY"), 90.0));
    }

    #[test]
    fn test_weighted_ratio_empty() {
        assert_eq!(WeightedRatio.score("", "SYDNEY"), 0.0);
        assert_eq!(WeightedRatio.score("SYDNEY", ""), 0.0);
    }

    #[test]
    fn test_weighted_ratio_symmetric() {
        let pairs = [("GLEBE", "GLEEB"), ("KINGS CROSS", "CROSS KING"), ("RYDE", "WEST RYDE")];
        for (a, b) in pairs {
            assert!(approx(WeightedRatio.score(a, b), WeightedRatio.score(b, a)), "{a} / {b}");
        }
    }
}
