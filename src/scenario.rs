//! Scenario glue: load, optimise, analyse, write.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analysis::ScenarioAnalysis;
use crate::config::Config;
use crate::domain::{A2pTechnology, OptimizationResults, TimeSeries};
use crate::economics::{LevelizedCosts, SystemEconomics};
use crate::io;
use crate::optimizer::{MilpSolver, StorageOptimizer};
use crate::process_units::{AmmoniaBattery, CostBasis};
use crate::report::{ScenarioParameters, ScenarioReport};

pub const LEDGER_FILE: &str = "optimization_results.csv";
pub const REPORT_FILE: &str = "summary.json";
pub const CURTAILMENT_SUMMARY_FILE: &str = "curtailment_summary.txt";

/// Periods per day assumed when the input has a single row.
const DEFAULT_PERIODS_PER_DAY: usize = 48;

#[derive(Debug, Clone)]
pub struct ScenarioOptions {
    pub name: String,
    pub data_file: PathBuf,
    /// Days of input, counted from the first row, to optimise over.
    pub days: u32,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub results: OptimizationResults,
    pub report: ScenarioReport,
    pub scenario_dir: PathBuf,
}

/// Rows covering `days` at the series' own sampling interval.
pub fn rows_for_days(series: &TimeSeries, days: u32) -> usize {
    let per_day = series
        .interval_hours()
        .filter(|h| *h > 0.0)
        .map(|h| (24.0 / h).round() as usize)
        .unwrap_or(DEFAULT_PERIODS_PER_DAY);
    days as usize * per_day
}

/// Runs one scenario with the configured good_lp backend.
///
/// `Ok(None)` when the solver finds no usable solution; nothing is written then.
pub fn run_single_scenario(options: &ScenarioOptions, config: &Config) -> Result<Option<ScenarioOutcome>> {
    let optimizer = StorageOptimizer::new(
        &config.system,
        &config.solver,
        config.economics.cost_basis(),
    )
    .context("failed to configure the ammonia battery")?;
    run_with_optimizer(options, config, &optimizer)
}

pub fn run_with_optimizer<S: MilpSolver>(
    options: &ScenarioOptions,
    config: &Config,
    optimizer: &StorageOptimizer<S>,
) -> Result<Option<ScenarioOutcome>> {
    info!(scenario = %options.name, "running scenario");
    let battery = optimizer
        .battery()
        .context("optimizer was built without a battery")?;

    let series = io::read_series(&options.data_file)
        .with_context(|| format!("failed to load {}", options.data_file.display()))?;
    let series = series.truncated(rows_for_days(&series, options.days));

    let Some(results) = optimizer.optimize(&series).context("optimization failed")? else {
        warn!(scenario = %options.name, "scenario failed to optimize; skipping analysis");
        return Ok(None);
    };

    let economics = &config.economics;
    let system = SystemEconomics::with_optimal_storage(&results, battery, economics);
    let levelized = LevelizedCosts::calculate(&results, battery, &system, economics);
    let analysis = ScenarioAnalysis::analyse(&results, battery, economics);
    let report = ScenarioReport::new(
        options.name.clone(),
        ScenarioParameters::describe(battery, config.system.time_interval_hours, config.solver.mipgap),
        &results,
        battery,
        system,
        levelized,
        analysis,
    );

    let scenario_dir = options.output_dir.join(&options.name);
    write_outputs(&scenario_dir, &results, &report)?;
    info!(scenario = %options.name, dir = %scenario_dir.display(), "scenario complete");

    Ok(Some(ScenarioOutcome {
        results,
        report,
        scenario_dir,
    }))
}

fn write_outputs(dir: &Path, results: &OptimizationResults, report: &ScenarioReport) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    io::write_ledger(&dir.join(LEDGER_FILE), results.ledger()).context("failed to write ledger")?;
    report.write(&dir.join(REPORT_FILE)).context("failed to write report")?;
    fs::write(
        dir.join(CURTAILMENT_SUMMARY_FILE),
        report.analysis.curtailment.to_string(),
    )
    .context("failed to write curtailment summary")?;
    Ok(())
}

/// One row of the A2P technology comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TechnologyComparison {
    pub technology: A2pTechnology,
    pub efficiency: f64,
    pub round_trip_efficiency: f64,
    pub a2p_capex: f64,
}

/// Cost and efficiency of every A2P technology at one sizing, without solving.
pub fn compare_a2p_technologies(
    p2a_capacity_mw: f64,
    storage_capacity_tonnes: f64,
    a2p_capacity_mw: f64,
    basis: CostBasis,
) -> Result<Vec<TechnologyComparison>> {
    A2pTechnology::all()
        .map(|technology| {
            let battery = AmmoniaBattery::new(
                format!("comparison_{technology}"),
                p2a_capacity_mw,
                storage_capacity_tonnes,
                a2p_capacity_mw,
                technology,
                basis,
            )
            .with_context(|| format!("failed to size {technology} battery"))?;
            Ok(TechnologyComparison {
                technology,
                efficiency: battery.discharging_efficiency(),
                round_trip_efficiency: battery.round_trip_efficiency(),
                a2p_capex: battery.system_costs().a2p_capex,
            })
        })
        .collect()
}
