//! Post-hoc analytics over a solved operational ledger.
//!
//! Every ratio here is guarded: an empty denominator resolves to `0.0`.

pub mod curtailment;
pub mod operational;

use serde::{Deserialize, Serialize};

pub use curtailment::*;
pub use operational::*;

use crate::config::EconomicsConfig;
use crate::domain::OptimizationResults;
use crate::process_units::AmmoniaBattery;

/// `numerator / denominator`, or `0.0` when the denominator is not positive.
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// All analytics of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAnalysis {
    pub summary: OperationalSummary,
    pub time_based: TimeBasedMetrics,
    pub utilisation: StorageUtilisation,
    pub price_response: Vec<PriceBinStats>,
    pub curtailment: CurtailmentInteraction,
    pub curtailment_interpretation: CurtailmentInterpretation,
}

impl ScenarioAnalysis {
    pub fn analyse(
        results: &OptimizationResults,
        battery: &AmmoniaBattery,
        config: &EconomicsConfig,
    ) -> Self {
        let curtailment = CurtailmentInteraction::calculate(results);
        Self {
            summary: OperationalSummary::calculate(results, battery, config),
            time_based: TimeBasedMetrics::calculate(results),
            utilisation: StorageUtilisation::calculate(results),
            price_response: PriceBinStats::calculate(results),
            curtailment_interpretation: curtailment.interpretation(),
            curtailment,
        }
    }
}
