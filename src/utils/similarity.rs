// src/utils/similarity.rs

//! Character-level similarity used to grade essays.
//!
//! The ratio is `2 * M / (len(a) + len(b)) * 100`, where `M` is found by
//! taking the longest common substring of the two inputs, then repeating
//! on the pieces to its left and to its right. Lengths count Unicode
//! scalar values, not bytes. When several common substrings share the
//! maximum length, the one starting earliest in `a` (then in `b`) wins,
//! so the result is fully deterministic. Swapping the arguments can only
//! change the result through that tie-break.
//!
//! Only the first [`MAX_COMPARED_CHARS`] characters of each side are
//! compared. The walk is cubic in the worst case, so the bound keeps a
//! single essay from tying up a thread.

/// Characters of each input that take part in the comparison.
pub const MAX_COMPARED_CHARS: usize = 1_000;

/// Similarity of `a` and `b` as a percentage in `[0, 100]`. Two empty strings score 0.
pub fn similarity_percent(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().take(MAX_COMPARED_CHARS).collect();
    let b: Vec<char> = b.chars().take(MAX_COMPARED_CHARS).collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }

    let matched = matching_chars(&a, &b);
    (matched * 2) as f64 * 100.0 / total as f64
}

/// Total characters matched by the longest-common-substring walk.
///
/// Pending `(a, b)` pieces sit on an explicit stack rather than the call
/// stack, so long inputs cannot overflow it.
pub fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(a, b)];

    while let Some((a, b)) = pending.pop() {
        let (pos_a, pos_b, len) = longest_common_substring(a, b);
        if len == 0 {
            continue;
        }
        matched += len;
        pending.push((&a[..pos_a], &b[..pos_b]));
        pending.push((&a[pos_a + len..], &b[pos_b + len..]));
    }

    matched
}

/// Returns `(start_in_a, start_in_b, length)` of the earliest longest common substring.
fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    if a.is_empty() || b.is_empty() {
        return (0, 0, 0);
    }

    // prev[j + 1] = length of the common run ending at a[i - 1], b[j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    let (mut best_len, mut best_a, mut best_b) = (0, 0, 0);

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };

            let run = curr[j + 1];
            if run == 0 {
                continue;
            }
            let (start_a, start_b) = (i + 1 - run, j + 1 - run);
            if run > best_len || (run == best_len && (start_a, start_b) < (best_a, best_b)) {
                best_len = run;
                best_a = start_a;
                best_b = start_b;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_a, best_b, best_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_identical_is_full_match() {
        assert_eq!(similarity_percent("the cat sat on the mat", "the cat sat on the mat"), 100.0);
    }

    #[test]
    fn test_disjoint_is_zero() {
        assert_eq!(similarity_percent("abc", "xyz"), 0.0);
        assert_eq!(similarity_percent("", "xyz"), 0.0);
        assert_eq!(similarity_percent("", ""), 0.0);
    }

    #[test]
    fn test_known_values() {
        // "World" vs "Word": "Wor" then "d" on the right => 4 matched.
        assert_eq!(matching_chars(&chars("World"), &chars("Word")), 4);
        let p = similarity_percent("World", "Word");
        assert!((p - 800.0 / 9.0).abs() < 1e-9);

        // "foo" wins the tie over "bar", then "ba" matches on the left.
        assert_eq!(matching_chars(&chars("bafoobar"), &chars("barfoo")), 5);
        // Swapped, "bar" comes first and nothing is left to its right.
        assert_eq!(matching_chars(&chars("barfoo"), &chars("bafoobar")), 3);
    }

    #[test]
    fn test_earliest_run_wins_ties() {
        assert_eq!(longest_common_substring(&chars("abxab"), &chars("ab")), (0, 0, 2));
        assert_eq!(longest_common_substring(&chars("xyab"), &chars("abxy")), (0, 2, 2));
    }

    #[test]
    fn test_unicode_counts_scalars() {
        assert_eq!(similarity_percent("café", "café"), 100.0);
        assert_eq!(similarity_percent("é", "e"), 0.0);
    }

    #[test]
    fn test_only_the_leading_chars_are_compared() {
        let filler_a = "x".repeat(MAX_COMPARED_CHARS);
        let filler_b = "y".repeat(MAX_COMPARED_CHARS);

        // The shared tail lies past the bound on both sides.
        let a = format!("{}shared tail", filler_a);
        let b = format!("{}shared tail", filler_b);
        assert_eq!(similarity_percent(&a, &b), 0.0);

        // Anything past the bound does not change the result.
        let long = format!("{}{}", "ab".repeat(MAX_COMPARED_CHARS), "zzzz");
        let cut: String = long.chars().take(MAX_COMPARED_CHARS).collect();
        assert_eq!(similarity_percent(&long, "abab"), similarity_percent(&cut, "abab"));
    }

    #[test]
    fn test_scattered_single_char_matches() {
        // Each reference char matches alone, so the walk splits once per char.
        let reference: String = (0..200u32).filter_map(|i| char::from_u32(0x4E00 + i)).collect();
        let answer: String = reference.chars().flat_map(|c| [c, '#']).collect();

        let p = similarity_percent(&answer, &reference);
        assert!((p - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let a = "photosynthesis converts light into chemical energy";
        let b = "plants convert light energy to chemical energy";
        assert_eq!(similarity_percent(a, b), similarity_percent(a, b));
    }
}
