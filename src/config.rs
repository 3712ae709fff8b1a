use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::domain::A2pTechnology;
use crate::process_units::CostBasis;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub system: SystemConfig,
    #[validate(nested)]
    pub solver: SolverConfig,
    #[validate(nested)]
    pub economics: EconomicsConfig,
    pub logging: LoggingConfig,
}

/// Physical configuration of the asset and the model timestep.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SystemConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub p2a_capacity_mw: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub a2p_capacity_mw: f64,
    pub a2p_technology: A2pTechnology,
    /// Resampling target and model timestep.
    #[validate(range(exclusive_min = 0.0, max = 24.0))]
    pub time_interval_hours: f64,
    /// Upper bound of the storage capacity design variable.
    #[validate(range(min = 0.0))]
    pub max_storage_capacity_tonnes: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_charging_threshold: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_discharging_threshold: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            p2a_capacity_mw: 100.0,
            a2p_capacity_mw: 100.0,
            a2p_technology: A2pTechnology::DirectCombustion,
            time_interval_hours: 0.5,
            max_storage_capacity_tonnes: 100_000.0,
            min_charging_threshold: 0.0,
            min_discharging_threshold: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SolverConfig {
    /// Relative optimality gap at which the MILP search may stop.
    #[validate(range(min = 0.0, exclusive_max = 1.0))]
    pub mipgap: f64,
    pub log_output: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mipgap: 0.01,
            log_output: false,
        }
    }
}

/// Financial assumptions used after the solve; the optimizer never reads them.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EconomicsConfig {
    #[validate(range(min = 0.0, max = 1.0))]
    pub discount_rate: f64,
    #[validate(range(min = 1))]
    pub lifetime_years: u32,
    /// CEPCI year all costs are escalated to.
    pub cost_year: i32,
    /// Hours in the reference year used to annualise period results.
    #[validate(range(exclusive_min = 0.0))]
    pub reference_year_hours: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub opex_fraction: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub usd_to_gbp: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub eur_to_gbp: f64,
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            discount_rate: 0.07,
            lifetime_years: 25,
            cost_year: 2024,
            reference_year_hours: 366.0 * 24.0,
            opex_fraction: 0.02,
            usd_to_gbp: 0.75,
            eur_to_gbp: 0.85,
        }
    }
}

impl EconomicsConfig {
    pub fn cost_basis(&self) -> CostBasis {
        CostBasis {
            target_year: self.cost_year,
            usd_to_gbp: self.usd_to_gbp,
            eur_to_gbp: self.eur_to_gbp,
            opex_fraction: self.opex_fraction,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (if given), then `NH3__SECTION__KEY` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }
        Self::extract(figment.merge(Env::prefixed("NH3__").split("__")))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().context("invalid configuration")?;
        config.validate().context("configuration out of range")?;
        Ok(config)
    }
}
