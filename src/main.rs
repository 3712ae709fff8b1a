use anyhow::Result;
use clap::{Parser, Subcommand};
use nh3_storage::config::Config;
use nh3_storage::scenario::{self, ScenarioOptions};
use nh3_storage::telemetry::init_tracing;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "nh3-storage")]
#[command(about = "Size and dispatch an ammonia energy-storage asset against historical prices")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "NH3_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimise one scenario and write its ledger and report
    Run {
        /// Input CSV with DATETIME,PRICE,DEMAND,WIND,CURTAILMENT,CARBON_BASED_FUELS
        #[arg(short, long)]
        data: PathBuf,

        #[arg(short, long, default_value = "base_case")]
        name: String,

        /// Days of input to optimise over
        #[arg(long, default_value_t = 366)]
        days: u32,

        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },
    /// Compare A2P technologies at one sizing without solving
    Compare {
        #[arg(long, default_value_t = 100.0)]
        p2a_capacity: f64,

        #[arg(long, default_value_t = 10_000.0)]
        storage_capacity: f64,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::load(args.config.as_deref())?;
    init_tracing(&cfg.logging);

    match args.command {
        Command::Run {
            data,
            name,
            days,
            output,
        } => {
            let options = ScenarioOptions {
                name,
                data_file: data,
                days,
                output_dir: output,
            };
            match scenario::run_single_scenario(&options, &cfg)? {
                Some(outcome) => {
                    let design = outcome.report.optimal_design;
                    let economics = outcome.report.system_economics;
                    info!(
                        dir = %outcome.scenario_dir.display(),
                        capacity_tonnes = design.optimal_capacity_tonnes,
                        net_annual_profit = economics.net_annual_profit,
                        "results written"
                    );
                }
                None => warn!(scenario = %options.name, "no feasible schedule found"),
            }
        }
        Command::Compare {
            p2a_capacity,
            storage_capacity,
        } => {
            let rows = scenario::compare_a2p_technologies(
                p2a_capacity,
                storage_capacity,
                cfg.system.a2p_capacity_mw,
                cfg.economics.cost_basis(),
            )?;
            println!("{:<25} {:<15} {:<20}", "Technology", "Efficiency", "A2P CAPEX (£M)");
            println!("{}", "-".repeat(60));
            for row in rows {
                println!(
                    "{:<25} {:<15} {:<20.2}",
                    row.technology.label(),
                    format!("{:.2}%", row.efficiency * 100.0),
                    row.a2p_capex / 1e6
                );
            }
        }
    }

    Ok(())
}
