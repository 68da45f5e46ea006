//! Candidate scoring.
//!
//! Scores are case-insensitive and fall into bands:
//!
//! | match            | score                                   |
//! |------------------|-----------------------------------------|
//! | exact            | 100                                     |
//! | prefix           | 80 + 20 * len(input) / len(candidate)   |
//! | substring        | 60                                      |
//! | subsequence      | up to 50 (ratio * compactness)          |
//! | none             | 0                                       |

pub const EXACT: f64 = 100.0;
pub const PREFIX_BASE: f64 = 80.0;
pub const SUBSTRING: f64 = 60.0;
pub const FUZZY_MAX: f64 = 50.0;

/// Score `candidate` against `input`. Zero means no match.
pub fn score(input: &str, candidate: &str) -> f64 {
    if input.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let input = input.to_lowercase();
    let candidate = candidate.to_lowercase();

    if input == candidate {
        return EXACT;
    }
    if candidate.starts_with(&input) {
        let ratio = input.chars().count() as f64 / candidate.chars().count() as f64;
        return PREFIX_BASE + ratio * 20.0;
    }
    if candidate.contains(&input) {
        return SUBSTRING;
    }
    fuzzy(&input, &candidate)
}

/// Subsequence score: the share of the candidate the input covers, times how
/// tightly the matched characters cluster.
fn fuzzy(input: &str, candidate: &str) -> f64 {
    let cand: Vec<char> = candidate.chars().collect();
    let mut first = None;
    let mut last = 0;
    let mut pos = 0;
    let mut matched = 0usize;

    for ch in input.chars() {
        let Some(offset) = cand[pos..].iter().position(|&c| c == ch) else {
            return 0.0;
        };
        let at = pos + offset;
        first.get_or_insert(at);
        last = at;
        pos = at + 1;
        matched += 1;
    }

    let Some(first) = first else {
        return 0.0;
    };
    let span = (last - first + 1) as f64;
    let ratio = matched as f64 / cand.len() as f64;
    let compactness = matched as f64 / span;
    (FUZZY_MAX * ratio * compactness).min(FUZZY_MAX)
}
