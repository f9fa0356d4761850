use crate::error::PowerError;
use crate::model::{PowerEstimate, Scenario};
use crate::sampler::{SimulatedSample, draw_group};
use crate::significance::{fisher_exact_p, rank_sum_p};
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// How the estimator treats a replicate whose significance test is
/// uninformative (e.g. a zero contingency-table margin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegeneratePolicy {
    /// Count the replicate as failing to reject the null.
    #[default]
    CountNonSignificant,
    /// Discard the replicate and draw a fresh one.
    Redraw,
}

/// Under the redraw policy, the total number of draws allowed per scenario
/// relative to the requested replicate count. Overrunning it means nearly
/// every replicate is degenerate and the scenario cannot be estimated.
const REDRAW_BUDGET_FACTOR: usize = 10;

/// Estimate the power of one scenario: the fraction of `replicates`
/// independent simulate-then-test replicates with p-value at or below the
/// scenario's alpha.
///
/// The random stream is owned by this call and seeded from `seed`, so a
/// scenario's estimate is reproducible and independent of any other
/// scenario's.
pub fn estimate(
    scenario: &Scenario,
    seed: u64,
    policy: DegeneratePolicy,
) -> Result<PowerEstimate, PowerError> {
    scenario.validate()?;
    let control_model = scenario.baseline;
    let treated_model = scenario.baseline.with_effect(scenario.effect)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let budget = scenario.replicates.saturating_mul(REDRAW_BUDGET_FACTOR);
    let mut rejections = 0;
    let mut completed = 0;
    let mut attempts = 0;
    let mut degenerate = 0;

    while completed < scenario.replicates {
        attempts += 1;
        if attempts > budget {
            return Err(PowerError::DrawBudgetExhausted { attempts });
        }
        let control = draw_group(&control_model, scenario.n_control, &mut rng)?;
        let treated = draw_group(&treated_model, scenario.n_treatment, &mut rng)?;
        let p = match test_pair(&control, &treated) {
            Ok(p) => p,
            Err(PowerError::DegenerateInput(_)) => {
                degenerate += 1;
                match policy {
                    DegeneratePolicy::CountNonSignificant => 1.0,
                    DegeneratePolicy::Redraw => continue,
                }
            }
            Err(e) => return Err(e),
        };
        if p <= scenario.alpha {
            rejections += 1;
        }
        completed += 1;
    }

    if degenerate > 0 {
        debug!(
            "{degenerate} degenerate replicates out of {attempts} draws (policy {policy:?})"
        );
    }
    Ok(PowerEstimate::new(rejections, scenario.replicates))
}

/// Apply the significance test matching the sample kind: rank-sum for
/// continuous biomarker samples, Fisher's exact test for relapse counts.
pub fn test_pair(control: &SimulatedSample, treated: &SimulatedSample) -> Result<f64, PowerError> {
    match (control, treated) {
        (SimulatedSample::Continuous(xs), SimulatedSample::Continuous(ys)) => rank_sum_p(xs, ys),
        (
            SimulatedSample::Count {
                events: relapse_control,
                trials: n_control,
            },
            SimulatedSample::Count {
                events: relapse_treat,
                trials: n_treat,
            },
        ) => fisher_exact_p(
            *relapse_control,
            n_control - relapse_control,
            *relapse_treat,
            n_treat - relapse_treat,
        ),
        _ => Err(PowerError::InvalidParameter(
            "cannot test a continuous sample against a count sample".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BaselineModel;

    fn ki67_scenario(n_control: usize, n_treatment: usize, effect: f64) -> Scenario {
        Scenario {
            n_control,
            n_treatment,
            baseline: BaselineModel::BoundedProportion { mean: 0.2, sd: 0.1 },
            effect,
            alpha: 0.05,
            replicates: 3000,
        }
    }

    #[test]
    fn test_power_is_a_proportion() {
        let est = estimate(&ki67_scenario(10, 10, 0.5), 1, DegeneratePolicy::default()).unwrap();
        assert!((0.0..=1.0).contains(&est.power));
        assert!(est.std_error >= 0.0);
    }

    #[test]
    fn test_null_calibration_matches_alpha() {
        // With no true effect the rejection rate estimates alpha itself.
        let scenario = Scenario {
            replicates: 20_000,
            ..ki67_scenario(30, 30, 0.0)
        };
        let est = estimate(&scenario, 2, DegeneratePolicy::default()).unwrap();
        assert!(
            (est.power - scenario.alpha).abs() < 0.015,
            "null rejection rate {} too far from alpha {}",
            est.power,
            scenario.alpha
        );
    }

    #[test]
    fn test_power_increases_with_effect() {
        let weak = estimate(&ki67_scenario(25, 25, 0.3), 3, DegeneratePolicy::default()).unwrap();
        let strong = estimate(&ki67_scenario(25, 25, 0.7), 4, DegeneratePolicy::default()).unwrap();
        // Expected ~0.59 vs ~1.0; far outside Monte Carlo noise.
        assert!(strong.power > weak.power + 0.2);
    }

    #[test]
    fn test_power_increases_with_sample_size() {
        let small = estimate(&ki67_scenario(10, 10, 0.5), 5, DegeneratePolicy::default()).unwrap();
        let large = estimate(&ki67_scenario(40, 40, 0.5), 6, DegeneratePolicy::default()).unwrap();
        // Expected ~0.64 vs ~0.998.
        assert!(large.power > small.power + 0.2);
    }

    #[test]
    fn test_ki67_planning_scenario() {
        let scenario = Scenario {
            n_control: 20,
            n_treatment: 40,
            baseline: BaselineModel::BoundedProportion { mean: 0.2, sd: 0.1 },
            effect: 0.7,
            alpha: 0.05 / 3.0,
            replicates: 10_000,
        };
        let est = estimate(&scenario, 7, DegeneratePolicy::default()).unwrap();
        assert!(est.power >= 0.90, "power {} below planning target", est.power);
    }

    #[test]
    fn test_relapse_planning_scenario() {
        let scenario = Scenario {
            n_control: 20,
            n_treatment: 40,
            baseline: BaselineModel::BinomialCount { rate: 0.5 },
            effect: 0.5,
            alpha: 0.05,
            replicates: 5000,
        };
        let est = estimate(&scenario, 8, DegeneratePolicy::default()).unwrap();
        // Exact enumeration over both binomial arms puts the true power of
        // the two-sided test at 0.4493.
        assert!(
            (est.power - 0.4493).abs() < 0.03,
            "power {} too far from enumerated truth",
            est.power
        );
    }

    #[test]
    fn test_degenerate_replicates_count_as_non_significant() {
        // A zero relapse rate in both arms makes every table degenerate.
        let scenario = Scenario {
            n_control: 10,
            n_treatment: 10,
            baseline: BaselineModel::BinomialCount { rate: 0.0 },
            effect: 0.0,
            alpha: 0.05,
            replicates: 50,
        };
        let est = estimate(&scenario, 9, DegeneratePolicy::CountNonSignificant).unwrap();
        assert_eq!(est.power, 0.0);
    }

    #[test]
    fn test_redraw_policy_exhausts_on_always_degenerate_input() {
        let scenario = Scenario {
            n_control: 10,
            n_treatment: 10,
            baseline: BaselineModel::BinomialCount { rate: 0.0 },
            effect: 0.0,
            alpha: 0.05,
            replicates: 50,
        };
        let result = estimate(&scenario, 10, DegeneratePolicy::Redraw);
        assert!(matches!(
            result,
            Err(PowerError::DrawBudgetExhausted { .. })
        ));
    }

    #[test]
    fn test_same_seed_reproduces_estimate() {
        let scenario = ki67_scenario(15, 15, 0.4);
        let a = estimate(&scenario, 11, DegeneratePolicy::default()).unwrap();
        let b = estimate(&scenario, 11, DegeneratePolicy::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mismatched_sample_kinds_rejected() {
        let continuous = SimulatedSample::Continuous(vec![0.1, 0.2]);
        let count = SimulatedSample::Count { events: 3, trials: 10 };
        assert!(matches!(
            test_pair(&continuous, &count),
            Err(PowerError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_invalid_scenario_fails_fast() {
        let scenario = Scenario {
            n_control: 0,
            ..ki67_scenario(10, 10, 0.5)
        };
        assert!(matches!(
            estimate(&scenario, 12, DegeneratePolicy::default()),
            Err(PowerError::InvalidParameter(_))
        ));
    }
}
