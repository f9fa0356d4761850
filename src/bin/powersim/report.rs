use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::Writer;
use log::info;

use powersim_utils::estimator::DegeneratePolicy;
use powersim_utils::model::{BaselineModel, ResultRow};
use powersim_utils::sweep::{self, GridSpec, SizePlan};

use crate::cli::{Cli, Study};

/// Build and run the requested sweeps, one CSV per study endpoint.
pub fn run(args: &Cli) -> Result<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .context("Could not build the worker pool")?;
    let policy: DegeneratePolicy = args.degenerate.into();
    let out_dir = Path::new(&args.out);

    if matches!(args.study, Study::Ki67 | Study::Both) {
        info!("Sweeping the Ki67 biomarker endpoint (rank-sum test)");
        let rows = sweep::run(&ki67_grid(args), args.seed, policy)?;
        write_rows(&out_dir.join("ki67_power.csv"), &rows)?;
    }
    if matches!(args.study, Study::Relapse | Study::Both) {
        info!("Sweeping the CT-relapse endpoint (Fisher's exact test)");
        // Offset the base seed so the two sweeps never share a stream.
        let seed = args.seed.wrapping_add(0x9e3779b97f4a7c15);
        let rows = sweep::run(&relapse_grid(args)?, seed, policy)?;
        write_rows(&out_dir.join("relapse_power.csv"), &rows)?;
    }
    Ok(())
}

fn ki67_grid(args: &Cli) -> GridSpec {
    GridSpec {
        sizes: SizePlan::Crossed {
            control_sizes: args.control_sizes.clone(),
            ratios: args.size_ratios.clone(),
        },
        baselines: args
            .ki67_baselines
            .iter()
            .map(|&mean| BaselineModel::BoundedProportion {
                mean,
                sd: args.ki67_sd,
            })
            .collect(),
        effects: args.reductions.clone(),
        alpha: args.ki67_alpha,
        replicates: args.ki67_replicates,
    }
}

fn relapse_grid(args: &Cli) -> Result<GridSpec> {
    Ok(GridSpec {
        sizes: SizePlan::Paired(parse_size_pairs(&args.relapse_sizes)?),
        baselines: args
            .relapse_rates
            .iter()
            .map(|&rate| BaselineModel::BinomialCount { rate })
            .collect(),
        effects: args.improvements.clone(),
        alpha: args.relapse_alpha,
        replicates: args.relapse_replicates,
    })
}

/// Parse "control:treatment" size pairs, e.g. "20:40".
fn parse_size_pairs(specs: &[String]) -> Result<Vec<(usize, usize)>> {
    let mut pairs = Vec::with_capacity(specs.len());
    for spec in specs {
        let Some((control, treatment)) = spec.split_once(':') else {
            bail!("Malformed size pair '{spec}', expected control:treatment");
        };
        let control = control
            .trim()
            .parse()
            .with_context(|| format!("Bad control size in '{spec}'"))?;
        let treatment = treatment
            .trim()
            .parse()
            .with_context(|| format!("Bad treatment size in '{spec}'"))?;
        pairs.push((control, treatment));
    }
    Ok(pairs)
}

fn write_rows(path: &Path, rows: &[ResultRow]) -> Result<()> {
    let mut writer =
        Writer::from_path(path).with_context(|| format!("Could not open {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
