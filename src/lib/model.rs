use crate::error::PowerError;
use serde::Serialize;
use strum_macros::{Display, EnumIter};

/// Tag distinguishing the two simulation models, used as the `model` column
/// of the result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ModelKind {
    BoundedProportion,
    BinomialCount,
}

/// Baseline (control-arm) distributional model for one group.
///
/// The treated arm is derived from the baseline via `with_effect`, never
/// parameterized independently, so a scenario can only compare like with
/// like.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BaselineModel {
    /// Ki67-style biomarker percentage: normal with the given mean and sd,
    /// truncated to [0,1].
    BoundedProportion { mean: f64, sd: f64 },
    /// CT-relapse outcome: per-animal relapse probability.
    BinomialCount { rate: f64 },
}

impl BaselineModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            BaselineModel::BoundedProportion { .. } => ModelKind::BoundedProportion,
            BaselineModel::BinomialCount { .. } => ModelKind::BinomialCount,
        }
    }

    /// Baseline level reported in the result table (mean or relapse rate).
    pub fn level(&self) -> f64 {
        match self {
            BaselineModel::BoundedProportion { mean, .. } => *mean,
            BaselineModel::BinomialCount { rate } => *rate,
        }
    }

    /// Standard deviation, where the model has one.
    pub fn sd(&self) -> Option<f64> {
        match self {
            BaselineModel::BoundedProportion { sd, .. } => Some(*sd),
            BaselineModel::BinomialCount { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<(), PowerError> {
        match self {
            BaselineModel::BoundedProportion { mean, sd } => {
                if !mean.is_finite() || !(0.0..=1.0).contains(mean) {
                    return Err(PowerError::InvalidParameter(format!(
                        "bounded-proportion mean must lie in [0,1], got {mean}"
                    )));
                }
                if !sd.is_finite() || *sd <= 0.0 {
                    return Err(PowerError::InvalidParameter(format!(
                        "bounded-proportion sd must be positive, got {sd}"
                    )));
                }
            }
            BaselineModel::BinomialCount { rate } => {
                if !rate.is_finite() || !(0.0..=1.0).contains(rate) {
                    return Err(PowerError::InvalidParameter(format!(
                        "relapse rate must lie in [0,1], got {rate}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Apply a fractional treatment effect to the baseline.
    ///
    /// For the bounded-proportion model a reduction `r` scales the mean by
    /// `1-r` and the variance (not the sd) by `1-r`, so the sd picks up a
    /// `sqrt(1-r)` factor. For the binomial model an improvement `r` scales
    /// the relapse rate by `1-r`.
    pub fn with_effect(&self, effect: f64) -> Result<BaselineModel, PowerError> {
        if !effect.is_finite() || !(0.0..1.0).contains(&effect) {
            return Err(PowerError::InvalidParameter(format!(
                "effect fraction must lie in [0,1), got {effect}"
            )));
        }
        let remaining = 1.0 - effect;
        let treated = match self {
            BaselineModel::BoundedProportion { mean, sd } => BaselineModel::BoundedProportion {
                mean: remaining * mean,
                sd: remaining.sqrt() * sd,
            },
            BaselineModel::BinomialCount { rate } => BaselineModel::BinomialCount {
                rate: remaining * rate,
            },
        };
        Ok(treated)
    }
}

/// One point of the sweep grid: a pair of group sizes, a baseline model, an
/// effect magnitude and the testing parameters. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenario {
    pub n_control: usize,
    pub n_treatment: usize,
    pub baseline: BaselineModel,
    pub effect: f64,
    pub alpha: f64,
    pub replicates: usize,
}

impl Scenario {
    pub fn size_ratio(&self) -> f64 {
        self.n_treatment as f64 / self.n_control as f64
    }

    pub fn validate(&self) -> Result<(), PowerError> {
        if self.n_control < 1 || self.n_treatment < 1 {
            return Err(PowerError::InvalidParameter(format!(
                "group sizes must be positive, got {}/{}",
                self.n_control, self.n_treatment
            )));
        }
        if !self.alpha.is_finite() || self.alpha <= 0.0 || self.alpha >= 1.0 {
            return Err(PowerError::InvalidParameter(format!(
                "alpha must lie in (0,1), got {}",
                self.alpha
            )));
        }
        if self.replicates < 1 {
            return Err(PowerError::InvalidParameter(
                "replicate count must be positive".to_string(),
            ));
        }
        self.baseline.validate()?;
        // with_effect re-checks the range; run it here so a bad effect
        // fraction fails before any replicate is drawn.
        self.baseline.with_effect(self.effect)?;
        Ok(())
    }
}

/// Empirical power for one scenario, with its Monte Carlo standard error
/// `sqrt(p(1-p)/replicates)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerEstimate {
    pub power: f64,
    pub std_error: f64,
}

impl PowerEstimate {
    pub fn new(rejections: usize, replicates: usize) -> Self {
        let power = rejections as f64 / replicates as f64;
        let std_error = (power * (1.0 - power) / replicates as f64).sqrt();
        Self { power, std_error }
    }
}

/// One row of the result table, in the documented column schema. Scenarios
/// that failed validation keep their grid coordinates but carry an empty
/// power and a recorded error reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub model: String,
    pub n_control: usize,
    pub n_treatment: usize,
    pub size_ratio: f64,
    pub baseline: f64,
    pub baseline_sd: Option<f64>,
    pub effect: f64,
    pub power: Option<f64>,
    pub std_error: Option<f64>,
    pub error: Option<String>,
}

impl ResultRow {
    pub fn from_estimate(scenario: &Scenario, estimate: PowerEstimate) -> Self {
        Self {
            power: Some(estimate.power),
            std_error: Some(estimate.std_error),
            error: None,
            ..Self::coordinates(scenario)
        }
    }

    pub fn from_error(scenario: &Scenario, reason: String) -> Self {
        Self {
            power: None,
            std_error: None,
            error: Some(reason),
            ..Self::coordinates(scenario)
        }
    }

    fn coordinates(scenario: &Scenario) -> Self {
        Self {
            model: scenario.baseline.kind().to_string(),
            n_control: scenario.n_control,
            n_treatment: scenario.n_treatment,
            size_ratio: scenario.size_ratio(),
            baseline: scenario.baseline.level(),
            baseline_sd: scenario.baseline.sd(),
            effect: scenario.effect,
            power: None,
            std_error: None,
            error: None,
        }
    }
}
