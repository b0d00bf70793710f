//! Greedy selection of duplicate issue pairs from neighbor lists.
//!
//! Every neighbor scoring strictly above the threshold becomes a candidate
//! pair. Candidates are collapsed to unordered pairs, sorted by score and
//! accepted greedily, so each issue ends up in at most one reported pair.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::semantic::index::NeighborResult;

/// Default similarity above which two titles are reported as duplicates.
pub const DEFAULT_DUPLICATE_THRESHOLD: f32 = 0.85;

/// Default neighbor count per issue, self included.
pub const DEFAULT_NEIGHBORS: usize = 5;

/// Two issues reported as likely duplicates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicatePair {
    /// Issue whose neighbor list produced the pair
    pub issue: u64,
    /// The matched neighbor
    pub duplicate: u64,
    pub score: f32,
}

impl DuplicatePair {
    /// Unordered key of the pair.
    fn key(&self) -> (u64, u64) {
        (self.issue.min(self.duplicate), self.issue.max(self.duplicate))
    }
}

/// Select a matching of duplicate pairs, best score first.
///
/// The self-match (rank 0 of a self-search) and any neighbor carrying the
/// source id are skipped, as are results without a source. (A, B) and
/// (B, A) are folded into one candidate holding the higher score, so a pair
/// is reported once even when similarity is not exactly symmetric.
pub fn select_duplicates(neighbor_results: &[NeighborResult], threshold: f32) -> Vec<DuplicatePair> {
    let mut candidates: HashMap<(u64, u64), DuplicatePair> = HashMap::new();

    for result in neighbor_results {
        let Some(source) = result.source else {
            continue;
        };

        for neighbor in result.neighbors.iter().filter(|n| n.id != source) {
            if neighbor.score <= threshold {
                continue;
            }

            let candidate = DuplicatePair {
                issue: source,
                duplicate: neighbor.id,
                score: neighbor.score,
            };
            candidates
                .entry(candidate.key())
                .and_modify(|existing| {
                    if candidate.score > existing.score {
                        *existing = candidate.clone();
                    }
                })
                .or_insert(candidate);
        }
    }

    let mut candidates: Vec<DuplicatePair> = candidates.into_values().collect();
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.key().cmp(&b.key()))
    });

    let mut seen: HashSet<u64> = HashSet::new();
    let mut pairs = Vec::new();

    for candidate in candidates {
        if seen.contains(&candidate.issue) || seen.contains(&candidate.duplicate) {
            continue;
        }
        seen.insert(candidate.issue);
        seen.insert(candidate.duplicate);
        pairs.push(candidate);
    }

    log::debug!(
        "Selected {} duplicate pairs above threshold {:.3}",
        pairs.len(),
        threshold
    );

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::index::{FlatIndex, SearchResult, SimilarityIndex};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn result(source: u64, neighbors: &[(u64, f32)]) -> NeighborResult {
        NeighborResult {
            source: Some(source),
            neighbors: neighbors
                .iter()
                .map(|&(id, score)| SearchResult { id, score })
                .collect(),
        }
    }

    /// "Fix memory leak in reader", "Memory leak in reader is not fixed",
    /// "Add support for Parquet v3".
    fn three_titles() -> Vec<NeighborResult> {
        vec![
            result(0, &[(0, 1.0), (1, 0.93), (2, 0.10)]),
            result(1, &[(1, 1.0), (0, 0.93), (2, 0.08)]),
            result(2, &[(2, 1.0), (0, 0.10), (1, 0.08)]),
        ]
    }

    fn assert_matching(pairs: &[DuplicatePair]) {
        let mut seen = HashSet::new();
        for pair in pairs {
            assert_ne!(pair.issue, pair.duplicate, "self pair {:?}", pair);
            assert!(seen.insert(pair.issue), "{} reported twice", pair.issue);
            assert!(seen.insert(pair.duplicate), "{} reported twice", pair.duplicate);
        }
    }

    #[test]
    fn test_three_titles_default_threshold() {
        let pairs = select_duplicates(&three_titles(), DEFAULT_DUPLICATE_THRESHOLD);

        assert_eq!(
            pairs,
            vec![DuplicatePair {
                issue: 0,
                duplicate: 1,
                score: 0.93
            }]
        );
        assert!(!pairs.iter().any(|p| p.issue == 2 || p.duplicate == 2));
    }

    #[test]
    fn test_three_titles_high_threshold() {
        assert!(select_duplicates(&three_titles(), 0.95).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let results = vec![result(0, &[(0, 1.0), (1, 0.85)])];
        assert!(select_duplicates(&results, 0.85).is_empty());
        assert_eq!(select_duplicates(&results, 0.849).len(), 1);
    }

    #[test]
    fn test_reversed_pair_reported_once() {
        // Asymmetric scores with a third candidate sorting between them.
        let results = vec![
            result(0, &[(0, 1.0), (1, 0.95)]),
            result(1, &[(1, 1.0), (0, 0.90)]),
            result(2, &[(2, 1.0), (3, 0.92)]),
        ];

        let pairs = select_duplicates(&results, 0.85);

        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[0].issue, pairs[0].duplicate), (0, 1));
        assert!((pairs[0].score - 0.95).abs() < f32::EPSILON);
        assert_eq!((pairs[1].issue, pairs[1].duplicate), (2, 3));
        assert_matching(&pairs);
    }

    #[test]
    fn test_reversed_orientation_keeps_higher_score() {
        let results = vec![
            result(0, &[(0, 1.0), (1, 0.88)]),
            result(1, &[(1, 1.0), (0, 0.91)]),
        ];

        let pairs = select_duplicates(&results, 0.85);
        assert_eq!(
            pairs,
            vec![DuplicatePair {
                issue: 1,
                duplicate: 0,
                score: 0.91
            }]
        );
    }

    #[test]
    fn test_greedy_prefers_best_score() {
        // 1 is close to both 0 and 2; the stronger link wins, 0 stays alone
        // even though 0-2 would also clear the threshold.
        let results = vec![
            result(0, &[(0, 1.0), (1, 0.90), (2, 0.86)]),
            result(1, &[(1, 1.0), (2, 0.97), (0, 0.90)]),
            result(2, &[(2, 1.0), (1, 0.97), (0, 0.86)]),
        ];

        let pairs = select_duplicates(&results, 0.85);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].issue, pairs[0].duplicate), (1, 2));
    }

    #[test]
    fn test_self_neighbor_never_paired() {
        // Self shows up below rank 0, e.g. from a backend without self-first order.
        let results = vec![result(5, &[(6, 0.99), (5, 0.99)])];
        let pairs = select_duplicates(&results, 0.5);
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].issue, pairs[0].duplicate), (5, 6));
    }

    #[test]
    fn test_adhoc_results_ignored() {
        let results = vec![NeighborResult {
            source: None,
            neighbors: vec![SearchResult { id: 1, score: 0.99 }],
        }];
        assert!(select_duplicates(&results, 0.5).is_empty());
    }

    #[test]
    fn test_random_index_properties() {
        let mut rng = StdRng::seed_from_u64(7);
        // Clustered vectors so plenty of pairs clear the thresholds.
        let centers: Vec<Vec<f32>> = (0..6)
            .map(|_| (0..12).map(|_| rng.random_range(-1.0..1.0)).collect())
            .collect();
        let entries: Vec<(u64, Vec<f32>)> = (0..60u64)
            .map(|id| {
                let center = &centers[id as usize % centers.len()];
                let v = center
                    .iter()
                    .map(|c| c + rng.random_range(-0.15..0.15))
                    .collect();
                (id, v)
            })
            .collect();

        let index = FlatIndex::build(12, entries).unwrap();
        let neighbors = index.search_indexed(DEFAULT_NEIGHBORS).unwrap();

        let mut previous = usize::MAX;
        for step in 0..=20 {
            let threshold = 0.5 + step as f32 * 0.025;
            let pairs = select_duplicates(&neighbors, threshold);

            assert_matching(&pairs);
            assert!(pairs.iter().all(|p| p.score > threshold));
            for window in pairs.windows(2) {
                assert!(window[0].score >= window[1].score);
            }
            assert!(pairs.len() <= previous, "threshold {} grew the result", threshold);
            previous = pairs.len();
        }
    }
}
