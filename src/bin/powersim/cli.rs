// src/cli.rs
use clap::{Parser, ValueEnum};
use powersim_utils::estimator::DegeneratePolicy;

/// CLI for the Monte Carlo power calculations of the planned animal study.
#[derive(Parser, Debug)]
#[command(
    name = "powersim",
    version,
    about = "Monte Carlo power estimation for Ki67 and CT-relapse endpoints"
)]
pub struct Cli {
    #[arg(
        long,
        short,
        default_value = "powersim",
        value_name = "OUT",
        help = "Output directory for the result tables"
    )]
    pub out: String,

    #[arg(
        value_enum,
        long,
        default_value = "both",
        help = "Which study endpoint to sweep"
    )]
    pub study: Study,

    #[arg(long, default_value = "42", help = "Base seed for the random streams")]
    pub seed: u64,

    #[arg(long, short, default_value = "5", help = "Number of threads to use")]
    pub threads: usize,

    #[arg(
        value_enum,
        long,
        default_value = "count-non-significant",
        help = "Policy for replicates whose test is degenerate"
    )]
    pub degenerate: DegenerateArg,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "10,15,20,25,30,35,40,45,50",
        help = "Control group sizes for the Ki67 sweep"
    )]
    pub control_sizes: Vec<usize>,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "1,2",
        help = "Treatment-to-control size ratios for the Ki67 sweep"
    )]
    pub size_ratios: Vec<usize>,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "0.1,0.2,0.3",
        help = "Baseline Ki67 mean fractions"
    )]
    pub ki67_baselines: Vec<f64>,

    #[arg(
        long,
        default_value = "0.1",
        help = "Baseline Ki67 standard deviation, calibrated from the observed measurements upstream"
    )]
    pub ki67_sd: f64,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "0.5,0.6,0.7",
        help = "Hypothesized Ki67 reduction fractions"
    )]
    pub reductions: Vec<f64>,

    #[arg(
        long,
        default_value_t = 0.05 / 3.0,
        help = "Significance threshold for the Ki67 sweep (Bonferroni-corrected for three comparisons)"
    )]
    pub ki67_alpha: f64,

    #[arg(
        long,
        default_value = "10000",
        help = "Monte Carlo replicates per Ki67 scenario"
    )]
    pub ki67_replicates: usize,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "10:10,10:20,20:20,20:40,30:30",
        help = "Paired control:treatment group sizes for the relapse sweep"
    )]
    pub relapse_sizes: Vec<String>,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "0.5",
        help = "Baseline relapse rates"
    )]
    pub relapse_rates: Vec<f64>,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "0.5,0.6,0.7",
        help = "Hypothesized relapse improvement fractions"
    )]
    pub improvements: Vec<f64>,

    #[arg(
        long,
        default_value = "0.05",
        help = "Significance threshold for the relapse sweep"
    )]
    pub relapse_alpha: f64,

    #[arg(
        long,
        default_value = "5000",
        help = "Monte Carlo replicates per relapse scenario"
    )]
    pub relapse_replicates: usize,

    #[arg(
        value_enum,
        long,
        default_value = "normal",
        value_name = "VERBOSITY",
        help = "Verbosity level"
    )]
    pub verbosity: LogLevel,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum LogLevel {
    verbose,
    normal,
    silent,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Study {
    Ki67,
    Relapse,
    Both,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DegenerateArg {
    CountNonSignificant,
    Redraw,
}

impl From<DegenerateArg> for DegeneratePolicy {
    fn from(arg: DegenerateArg) -> Self {
        match arg {
            DegenerateArg::CountNonSignificant => DegeneratePolicy::CountNonSignificant,
            DegenerateArg::Redraw => DegeneratePolicy::Redraw,
        }
    }
}
