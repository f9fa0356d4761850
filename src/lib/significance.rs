use crate::error::PowerError;
use ordered_float::OrderedFloat;
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::function::gamma::ln_gamma;

/// Two-sample Wilcoxon rank-sum p-value (two-sided).
///
/// Ties receive midranks and the rank-sum variance carries the usual tie
/// correction. The p-value uses the normal approximation with a continuity
/// correction of 0.5; an exact permutation null is not computed, even for
/// small groups.
pub fn rank_sum_p(xs: &[f64], ys: &[f64]) -> Result<f64, PowerError> {
    let n1 = xs.len();
    let n2 = ys.len();
    if n1 == 0 || n2 == 0 {
        return Err(PowerError::DegenerateInput(
            "rank-sum test on an empty sample".to_string(),
        ));
    }
    let total = n1 + n2;

    let mut pooled: Vec<(OrderedFloat<f64>, bool)> = xs
        .iter()
        .map(|&v| (OrderedFloat(v), true))
        .chain(ys.iter().map(|&v| (OrderedFloat(v), false)))
        .collect();
    pooled.sort_by_key(|&(v, _)| v);

    // Walk tie groups once, accumulating the first sample's rank sum and the
    // tie term sum(t^3 - t) for the variance correction.
    let mut rank_sum_first = 0.0;
    let mut tie_sum = 0.0;
    let mut i = 0;
    while i < total {
        let mut j = i;
        while j + 1 < total && pooled[j + 1].0 == pooled[i].0 {
            j += 1;
        }
        let midrank = (i + j + 2) as f64 / 2.0;
        let t = (j - i + 1) as f64;
        tie_sum += t * t * t - t;
        for &(_, in_first) in &pooled[i..=j] {
            if in_first {
                rank_sum_first += midrank;
            }
        }
        i = j + 1;
    }

    let n1f = n1 as f64;
    let n2f = n2 as f64;
    let nf = total as f64;
    let mean = n1f * (nf + 1.0) / 2.0;
    let variance = n1f * n2f / 12.0 * ((nf + 1.0) - tie_sum / (nf * (nf - 1.0)));
    if variance <= 0.0 {
        return Err(PowerError::DegenerateInput(
            "all pooled observations are identical".to_string(),
        ));
    }

    let z = ((rank_sum_first - mean).abs() - 0.5).max(0.0) / variance.sqrt();
    let p = 2.0 * (1.0 - Normal::standard().cdf(z));
    Ok(p.min(1.0))
}

/// Fisher's exact test on the 2x2 table
/// `[[relapse_control, survive_control], [relapse_treat, survive_treat]]`.
///
/// Two-sided p-value under the hypergeometric null: the total probability of
/// every table (with the observed margins) whose probability does not exceed
/// the observed table's, with a small relative tolerance for float ties.
pub fn fisher_exact_p(
    relapse_control: u64,
    survive_control: u64,
    relapse_treat: u64,
    survive_treat: u64,
) -> Result<f64, PowerError> {
    let n1 = relapse_control + survive_control;
    let n2 = relapse_treat + survive_treat;
    if n1 == 0 || n2 == 0 {
        return Err(PowerError::DegenerateInput(
            "contingency table with an empty group".to_string(),
        ));
    }
    let relapses = relapse_control + relapse_treat;
    let total = n1 + n2;
    if relapses == 0 || relapses == total {
        return Err(PowerError::DegenerateInput(
            "contingency table with a zero outcome margin".to_string(),
        ));
    }

    let ln_denom = ln_choose(total, relapses);
    let ln_table = |k: u64| ln_choose(n1, k) + ln_choose(n2, relapses - k) - ln_denom;

    let observed = ln_table(relapse_control).exp();
    let cutoff = observed * (1.0 + 1e-7);

    let lo = relapses.saturating_sub(n2);
    let hi = relapses.min(n1);
    let p: f64 = (lo..=hi)
        .map(|k| ln_table(k).exp())
        .filter(|&mass| mass <= cutoff)
        .sum();
    Ok(p.min(1.0))
}

fn ln_choose(n: u64, k: u64) -> f64 {
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_sum_separated_groups() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [6.0, 7.0, 8.0, 9.0, 10.0];
        let p = rank_sum_p(&xs, &ys).unwrap();
        // W = 15, mean = 27.5, var = 275/12, continuity-corrected z = 2.5067
        assert!((p - 0.0121858).abs() < 1e-4);
    }

    #[test]
    fn test_rank_sum_is_symmetric_in_group_order() {
        let xs = [0.12, 0.31, 0.05, 0.44];
        let ys = [0.22, 0.18, 0.40, 0.09, 0.27];
        let p1 = rank_sum_p(&xs, &ys).unwrap();
        let p2 = rank_sum_p(&ys, &xs).unwrap();
        assert!((p1 - p2).abs() < 1e-12);
    }

    #[test]
    fn test_rank_sum_midranks_balanced_ties() {
        // Pooled values 1,1,2,2 give midranks 1.5,1.5,3.5,3.5; the groups
        // split them evenly, so the statistic sits exactly at its mean.
        let p = rank_sum_p(&[1.0, 2.0], &[1.0, 2.0]).unwrap();
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rank_sum_all_identical_is_degenerate() {
        let result = rank_sum_p(&[0.3, 0.3, 0.3], &[0.3, 0.3]);
        assert!(matches!(result, Err(PowerError::DegenerateInput(_))));
    }

    #[test]
    fn test_rank_sum_empty_sample_is_degenerate() {
        assert!(rank_sum_p(&[], &[1.0]).is_err());
        assert!(rank_sum_p(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_fisher_balanced_table_is_one() {
        // Identical relapse proportions in both arms carry no evidence.
        let p = fisher_exact_p(5, 15, 5, 15).unwrap();
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fisher_known_table() {
        // 4x4 margins, observed [[3,1],[1,3]]: p = 34/70 exactly.
        let p = fisher_exact_p(3, 1, 1, 3).unwrap();
        assert!((p - 34.0 / 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_fisher_extreme_table_is_small() {
        let p = fisher_exact_p(10, 0, 0, 10).unwrap();
        // Only the two most extreme tables qualify: p = 2/C(20,10)
        assert!((p - 2.0 / 184_756.0).abs() < 1e-12);
    }

    #[test]
    fn test_fisher_zero_margin_is_degenerate() {
        assert!(matches!(
            fisher_exact_p(0, 10, 0, 20),
            Err(PowerError::DegenerateInput(_))
        ));
        assert!(matches!(
            fisher_exact_p(10, 0, 20, 0),
            Err(PowerError::DegenerateInput(_))
        ));
        assert!(matches!(
            fisher_exact_p(0, 0, 5, 5),
            Err(PowerError::DegenerateInput(_))
        ));
    }
}
