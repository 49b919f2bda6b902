// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Did-you-mean suggestions for unresolved names.

/// Largest edit distance a suggestion may have. Candidates shorter than
/// this are never suggested.
pub const SUGGESTION_DISTANCE: usize = 2;

/// Levenshtein distance between `a` and `b`, or `None` once it must exceed
/// `limit`.
pub fn bounded_edit_distance(a: &str, b: &str, limit: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > limit {
        return None;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, a_ch) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, b_ch) in b.iter().enumerate() {
            let cost = if a_ch == b_ch { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
            row_min = row_min.min(curr[j + 1]);
        }
        if row_min > limit {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    Some(prev[b.len()]).filter(|&d| d <= limit)
}

/// Closest candidate within [`SUGGESTION_DISTANCE`]. Ties keep the first seen.
pub fn closest_match<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;

    for candidate in candidates {
        if candidate.chars().count() < SUGGESTION_DISTANCE || candidate == name {
            continue;
        }
        let Some(dist) = bounded_edit_distance(name, candidate, SUGGESTION_DISTANCE) else {
            continue;
        };
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((candidate, dist));
        }
    }

    best.map(|(closest, _)| closest)
}

/// Returns `Some("did you mean 'closest'?")` if a close match is found.
pub fn did_you_mean<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    closest_match(name, candidates).map(|closest| format!("did you mean '{}'?", closest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_you_mean() {
        let candidates = ["counter", "count", "name", "value"];

        assert_eq!(
            did_you_mean("conter", candidates.iter().copied()),
            Some("did you mean 'counter'?".to_string())
        );
        assert_eq!(
            did_you_mean("cout", candidates.iter().copied()),
            Some("did you mean 'count'?".to_string())
        );
        assert_eq!(did_you_mean("xyz", candidates.iter().copied()), None);
    }

    #[test]
    fn short_candidates_are_skipped() {
        assert_eq!(closest_match("a", ["b", "ab"]), Some("ab"));
        assert_eq!(closest_match("x", ["y"]), None);
    }

    #[test]
    fn prefers_smaller_distance() {
        assert_eq!(closest_match("nme", ["names", "name"]), Some("name"));
        assert_eq!(closest_match("valuee", ["vale", "value"]), Some("value"));
    }

    #[test]
    fn test_bounded_edit_distance() {
        assert_eq!(bounded_edit_distance("kitten", "sitting", 3), Some(3));
        assert_eq!(bounded_edit_distance("kitten", "sitting", 2), None);
        assert_eq!(bounded_edit_distance("", "hello", 5), Some(5));
        assert_eq!(bounded_edit_distance("abc", "abc", 2), Some(0));
        assert_eq!(bounded_edit_distance("abc", "abd", 2), Some(1));
        assert_eq!(bounded_edit_distance("a", "abcd", 2), None);
    }
}
