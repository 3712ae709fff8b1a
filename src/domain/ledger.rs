use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One timestep of the operational ledger.
///
/// Field names serialise to the ledger's published column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "Time")]
    pub time: NaiveDateTime,
    #[serde(rename = "TimeStep")]
    pub time_step: usize,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Charging_Power_MW")]
    pub charging_power_mw: f64,
    #[serde(rename = "Discharging_Power_MW")]
    pub discharging_power_mw: f64,
    #[serde(rename = "NH3_Level_Tonnes")]
    pub nh3_level_tonnes: f64,
    #[serde(rename = "NH3_Produced_Tonnes")]
    pub nh3_produced_tonnes: f64,
    #[serde(rename = "NH3_Consumed_Tonnes")]
    pub nh3_consumed_tonnes: f64,
    #[serde(rename = "Charging_Cost")]
    pub charging_cost: f64,
    #[serde(rename = "Discharging_Revenue")]
    pub discharging_revenue: f64,
    #[serde(rename = "Net_Revenue")]
    pub net_revenue: f64,
    #[serde(rename = "Is_Charging")]
    pub is_charging: u8,
    #[serde(rename = "Is_Discharging")]
    pub is_discharging: u8,
    #[serde(rename = "Demand")]
    pub demand: f64,
    #[serde(rename = "Wind")]
    pub wind: f64,
    #[serde(rename = "Curtailment")]
    pub curtailment: f64,
    #[serde(rename = "Carbon_based_fuels")]
    pub carbon_based_fuels: f64,
    #[serde(rename = "Cumulative_NH3_Produced")]
    pub cumulative_nh3_produced: f64,
    #[serde(rename = "Cumulative_NH3_Consumed")]
    pub cumulative_nh3_consumed: f64,
    #[serde(rename = "Cumulative_Net_Revenue")]
    pub cumulative_net_revenue: f64,
}

impl ResultRecord {
    pub fn charging(&self) -> bool {
        self.is_charging == 1
    }

    pub fn discharging(&self) -> bool {
        self.is_discharging == 1
    }

    pub fn idle(&self) -> bool {
        !self.charging() && !self.discharging()
    }
}

/// Storage design chosen by the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimalDesign {
    pub optimal_capacity_tonnes: f64,
    /// Start level; the cyclic closure makes it the end level too.
    pub optimal_initial_level_tonnes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodEconomics {
    pub period_operational_profit: f64,
    pub period_hours: f64,
}

/// Everything that survives a successful solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResults {
    pub operational_results: Vec<ResultRecord>,
    pub optimal_design: OptimalDesign,
    pub economics: PeriodEconomics,
    /// Objective value evaluated on the solved variables.
    pub objective_value: f64,
    /// Timestep duration the model was solved with (hours).
    pub timestep_hours: f64,
}

impl OptimizationResults {
    pub fn ledger(&self) -> &[ResultRecord] {
        &self.operational_results
    }

    pub fn total_produced_tonnes(&self) -> f64 {
        self.operational_results.iter().map(|r| r.nh3_produced_tonnes).sum()
    }

    pub fn total_consumed_tonnes(&self) -> f64 {
        self.operational_results.iter().map(|r| r.nh3_consumed_tonnes).sum()
    }

    pub fn total_charging_cost(&self) -> f64 {
        self.operational_results.iter().map(|r| r.charging_cost).sum()
    }

    /// Energy delivered by the A2P block over the period (MWh).
    pub fn energy_discharged_mwh(&self) -> f64 {
        self.operational_results
            .iter()
            .map(|r| r.discharging_power_mw)
            .sum::<f64>()
            * self.timestep_hours
    }

    pub fn energy_charged_mwh(&self) -> f64 {
        self.operational_results
            .iter()
            .map(|r| r.charging_power_mw)
            .sum::<f64>()
            * self.timestep_hours
    }
}
