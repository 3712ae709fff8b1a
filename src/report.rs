use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use crate::analysis::ScenarioAnalysis;
use crate::domain::{A2pTechnology, OptimalDesign, OptimizationResults};
use crate::economics::{LevelizedCosts, SystemEconomics};
use crate::error::EngineResult;
use crate::process_units::{AmmoniaBattery, SystemCosts};

/// Inputs that shaped the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameters {
    pub p2a_capacity_mw: f64,
    pub a2p_capacity_mw: f64,
    pub a2p_technology: A2pTechnology,
    pub time_interval_hours: f64,
    pub max_storage_capacity_tonnes: f64,
    pub mipgap: f64,
    pub charging_efficiency: f64,
    pub discharging_efficiency: f64,
    pub round_trip_efficiency: f64,
}

impl ScenarioParameters {
    pub fn describe(battery: &AmmoniaBattery, time_interval_hours: f64, mipgap: f64) -> Self {
        Self {
            p2a_capacity_mw: battery.p2a.capacity_mw,
            a2p_capacity_mw: battery.a2p.capacity_mw,
            a2p_technology: battery.a2p.technology(),
            time_interval_hours,
            max_storage_capacity_tonnes: battery.storage.capacity_tonnes,
            mipgap,
            charging_efficiency: battery.charging_efficiency(),
            discharging_efficiency: battery.discharging_efficiency(),
            round_trip_efficiency: battery.round_trip_efficiency(),
        }
    }
}

/// Summary written next to the ledger. Infinite levelized costs serialise as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub parameters: ScenarioParameters,
    pub optimal_design: OptimalDesign,
    pub objective_value: f64,
    pub reference_costs: SystemCosts,
    pub system_economics: SystemEconomics,
    pub levelized_costs: LevelizedCosts,
    pub analysis: ScenarioAnalysis,
}

impl ScenarioReport {
    pub fn new(
        scenario: impl Into<String>,
        parameters: ScenarioParameters,
        results: &OptimizationResults,
        battery: &AmmoniaBattery,
        system_economics: SystemEconomics,
        levelized_costs: LevelizedCosts,
        analysis: ScenarioAnalysis,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            parameters,
            optimal_design: results.optimal_design,
            objective_value: results.objective_value,
            reference_costs: battery.system_costs(),
            system_economics,
            levelized_costs,
            analysis,
        }
    }

    pub fn write(&self, path: &Path) -> EngineResult<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        info!(path = %path.display(), "wrote scenario report");
        Ok(())
    }
}
