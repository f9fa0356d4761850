use crate::error::PowerError;
use crate::estimator::{DegeneratePolicy, estimate};
use crate::model::{BaselineModel, ResultRow, Scenario};
use itertools::iproduct;
use log::{debug, info};
use rayon::prelude::*;

/// How the sweep enumerates (control, treatment) group-size pairs.
#[derive(Debug, Clone, PartialEq)]
pub enum SizePlan {
    /// Full cross of control sizes with treatment-to-control ratios.
    Crossed {
        control_sizes: Vec<usize>,
        ratios: Vec<usize>,
    },
    /// Explicit list of (control, treatment) pairs, used where crossing the
    /// axes would produce scenarios the study never plans to run.
    Paired(Vec<(usize, usize)>),
}

impl SizePlan {
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        match self {
            SizePlan::Crossed {
                control_sizes,
                ratios,
            } => iproduct!(control_sizes.iter(), ratios.iter())
                .map(|(&n, &ratio)| (n, n * ratio))
                .collect(),
            SizePlan::Paired(pairs) => pairs.clone(),
        }
    }
}

/// One sweep grid: size plan x baseline models x effect magnitudes, with a
/// shared significance threshold and replicate count.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub sizes: SizePlan,
    pub baselines: Vec<BaselineModel>,
    pub effects: Vec<f64>,
    pub alpha: f64,
    pub replicates: usize,
}

impl GridSpec {
    /// Expand the grid into scenarios in deterministic order: size pairs
    /// outermost, then baselines, then effects. Result rows keep this order.
    pub fn expand(&self) -> Vec<Scenario> {
        let pairs = self.sizes.pairs();
        iproduct!(pairs.iter(), self.baselines.iter(), self.effects.iter())
            .map(|(&(n_control, n_treatment), &baseline, &effect)| Scenario {
                n_control,
                n_treatment,
                baseline,
                effect,
                alpha: self.alpha,
                replicates: self.replicates,
            })
            .collect()
    }
}

/// Run every scenario of the grid and collect one result row per scenario,
/// in enumeration order.
///
/// Scenarios are estimated in parallel on the ambient rayon pool; the
/// indexed collect restores enumeration order no matter which worker
/// finishes first. Each scenario owns an independent random stream seeded
/// from the base seed and its enumeration index. Scenario-level parameter
/// errors become error rows; draw-budget exhaustion aborts the sweep.
pub fn run(
    grid: &GridSpec,
    seed: u64,
    policy: DegeneratePolicy,
) -> Result<Vec<ResultRow>, PowerError> {
    let scenarios = grid.expand();
    info!(
        "Sweeping {} scenarios ({} replicates each, alpha {:.4})",
        scenarios.len(),
        grid.replicates,
        grid.alpha
    );
    let rows: Result<Vec<ResultRow>, PowerError> = scenarios
        .par_iter()
        .enumerate()
        .map(
            |(index, scenario)| match estimate(scenario, seed.wrapping_add(index as u64), policy) {
                Ok(est) => {
                    debug!(
                        "n={}/{} baseline={:.3} effect={:.2} -> power {:.4}",
                        scenario.n_control,
                        scenario.n_treatment,
                        scenario.baseline.level(),
                        scenario.effect,
                        est.power
                    );
                    Ok(ResultRow::from_estimate(scenario, est))
                }
                Err(e) if e.is_fatal() => Err(e),
                Err(e) => Ok(ResultRow::from_error(scenario, e.to_string())),
            },
        )
        .collect();
    rows
}
