use crate::error::PowerError;
use crate::model::BaselineModel;
use rand::Rng;
use rand::distributions::Distribution;
use statrs::distribution::Normal;

/// Per-draw cap on the truncated-normal rejection loop. With any valid mean
/// in [0,1] the acceptance probability is far from zero, so hitting the cap
/// means the random source or the parameters are unusable.
const MAX_REJECTIONS: usize = 100_000;

/// Synthetic observations for one group in one replicate. Created fresh per
/// replicate and discarded as soon as the significance test has run.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatedSample {
    /// Biomarker percentages in [0,1], one per animal.
    Continuous(Vec<f64>),
    /// Relapse count out of `trials` animals.
    Count { events: u64, trials: u64 },
}

/// Draw one group of size `n` from the given baseline (or effect-adjusted)
/// model, using the injected random source.
pub fn draw_group<R: Rng + ?Sized>(
    model: &BaselineModel,
    n: usize,
    rng: &mut R,
) -> Result<SimulatedSample, PowerError> {
    if n < 1 {
        return Err(PowerError::InvalidParameter(format!(
            "group size must be at least 1, got {n}"
        )));
    }
    model.validate()?;
    match model {
        BaselineModel::BoundedProportion { mean, sd } => {
            let normal = Normal::new(*mean, *sd)
                .map_err(|e| PowerError::InvalidParameter(format!("normal({mean}, {sd}): {e}")))?;
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                values.push(draw_truncated(&normal, rng)?);
            }
            Ok(SimulatedSample::Continuous(values))
        }
        BaselineModel::BinomialCount { rate } => {
            let mut events = 0u64;
            for _ in 0..n {
                if rng.gen_bool(*rate) {
                    events += 1;
                }
            }
            Ok(SimulatedSample::Count {
                events,
                trials: n as u64,
            })
        }
    }
}

/// Normal draw truncated to [0,1]. Out-of-range draws are rejected and
/// redrawn, never clamped: clamping piles probability mass on the interval
/// bounds and biases the power estimate.
fn draw_truncated<R: Rng + ?Sized>(normal: &Normal, rng: &mut R) -> Result<f64, PowerError> {
    for _ in 0..MAX_REJECTIONS {
        let x = normal.sample(rng);
        if (0.0..=1.0).contains(&x) {
            return Ok(x);
        }
    }
    Err(PowerError::DrawBudgetExhausted {
        attempts: MAX_REJECTIONS,
    })
}
