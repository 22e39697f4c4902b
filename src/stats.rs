//! Mann-Whitney U / rank-biserial correlation, kept as a pure, synchronous
//! function so it can be tested independently of the graph store and the
//! async pipeline.
//!
//! Ties are broken by averaging the tied rank positions, matching
//! `scipy.stats.mannwhitneyu`'s documented default tie-handling rule.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannWhitneyResult {
    /// U statistic for the first (`baseline`) sample.
    pub u_statistic: f64,
    /// `U / (|baseline| * |mutant|)` — probability a random baseline
    /// sample outranks a random mutant sample.
    pub common_language_effect_size: f64,
    /// `2f - 1`, in `[-1, 1]`. Positive ⇒ baseline ranks above mutant ⇒
    /// mutant is faster.
    pub rank_biserial_correlation: f64,
}

/// Computes the Mann-Whitney U statistic (for `baseline`) and its derived
/// effect sizes over two samples. Returns `None` if either sample is empty
/// — the statistical test is undefined in that case; callers decide what
/// that means.
pub fn mann_whitney_u(baseline: &[i64], mutant: &[i64]) -> Option<MannWhitneyResult> {
    if baseline.is_empty() || mutant.is_empty() {
        return None;
    }

    let n1 = baseline.len();
    let n2 = mutant.len();

    // Tag each value with which sample it came from, then sort by value so
    // ranks (1-based) can be assigned in one pass, averaging ranks within
    // runs of equal values.
    let mut tagged: Vec<(i64, bool)> = baseline
        .iter()
        .map(|&v| (v, true))
        .chain(mutant.iter().map(|&v| (v, false)))
        .collect();
    tagged.sort_by_key(|(v, _)| *v);

    let mut baseline_rank_sum = 0.0;
    let mut i = 0;
    while i < tagged.len() {
        let mut j = i;
        while j < tagged.len() && tagged[j].0 == tagged[i].0 {
            j += 1;
        }
        // Ranks i+1..=j (1-based) all tie; assign their average to each
        // member of the run.
        let avg_rank = ((i + 1) + j) as f64 / 2.0;
        for (_, is_baseline) in &tagged[i..j] {
            if *is_baseline {
                baseline_rank_sum += avg_rank;
            }
        }
        i = j;
    }

    let u_statistic = baseline_rank_sum - (n1 * (n1 + 1)) as f64 / 2.0;
    let common_language_effect_size = u_statistic / (n1 * n2) as f64;
    let rank_biserial_correlation = 2.0 * common_language_effect_size - 1.0;

    Some(MannWhitneyResult {
        u_statistic,
        common_language_effect_size,
        rank_biserial_correlation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_samples_have_zero_correlation() {
        let a = vec![1, 2, 3, 4, 5];
        let b = vec![1, 2, 3, 4, 5];
        let result = mann_whitney_u(&a, &b).unwrap();
        assert!(result.rank_biserial_correlation.abs() < 1e-9);
    }

    #[test]
    fn baseline_strictly_larger_gives_positive_r() {
        // Every baseline value outranks every mutant value: U = n1*n2, f = 1, r = 1.
        let baseline = vec![100, 200, 300];
        let mutant = vec![1, 2, 3];
        let result = mann_whitney_u(&baseline, &mutant).unwrap();
        assert!((result.rank_biserial_correlation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mutant_strictly_larger_gives_negative_r() {
        let baseline = vec![1, 2, 3];
        let mutant = vec![100, 200, 300];
        let result = mann_whitney_u(&baseline, &mutant).unwrap();
        assert!((result.rank_biserial_correlation - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn empty_sample_returns_none() {
        assert!(mann_whitney_u(&[], &[1, 2, 3]).is_none());
        assert!(mann_whitney_u(&[1, 2, 3], &[]).is_none());
        assert!(mann_whitney_u(&[], &[]).is_none());
    }

    // Invariant 4 (path-symmetric analysis): swapping baseline and mutant
    // negates r and preserves |r|.
    #[test]
    fn swapping_samples_negates_r() {
        let a = vec![5, 10, 15, 1000];
        let b = vec![1, 2, 3, 4, 20];
        let forward = mann_whitney_u(&a, &b).unwrap();
        let backward = mann_whitney_u(&b, &a).unwrap();
        assert!((forward.rank_biserial_correlation + backward.rank_biserial_correlation).abs() < 1e-9);
        assert!(
            (forward.rank_biserial_correlation.abs() - backward.rank_biserial_correlation.abs()).abs() < 1e-9
        );
    }

    #[test]
    fn ties_use_average_rank() {
        // All values tied: every rank is the average rank, U should come
        // out to exactly half of n1*n2 (f = 0.5, r = 0).
        let a = vec![7, 7, 7];
        let b = vec![7, 7];
        let result = mann_whitney_u(&a, &b).unwrap();
        assert!(result.rank_biserial_correlation.abs() < 1e-9);
    }
}
