//! Parameter source: physical efficiencies and equipment cost curves for the
//! power-to-ammonia chain, the storage tank and the ammonia-to-power block.
//!
//! All costs are reported in GBP at the [`CostBasis::target_year`] price level.

pub mod cepci;
pub mod equipment;
pub mod systems;

use serde::{Deserialize, Serialize};

pub use cepci::*;
pub use equipment::*;
pub use systems::*;

/// Lower heating value of ammonia (MJ/kg).
pub const LHV_NH3_MJ_PER_KG: f64 = 18.6;
/// Lower heating value of hydrogen (MJ/kg).
pub const LHV_H2_MJ_PER_KG: f64 = 120.1;

/// Price level, currency and OPEX assumptions applied to every cost curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBasis {
    pub target_year: i32,
    pub usd_to_gbp: f64,
    pub eur_to_gbp: f64,
    /// Annual OPEX as a fraction of sized CAPEX.
    pub opex_fraction: f64,
}

impl Default for CostBasis {
    fn default() -> Self {
        Self {
            target_year: 2024,
            usd_to_gbp: 0.75,
            eur_to_gbp: 0.85,
            opex_fraction: 0.02,
        }
    }
}

/// Currency a cost correlation was published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
}

impl CostBasis {
    pub fn to_gbp(&self, amount: f64, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => amount * self.usd_to_gbp,
            Currency::Eur => amount * self.eur_to_gbp,
            Currency::Gbp => amount,
        }
    }

    /// Inflate `amount` from `base_year` to the target year, then convert to GBP.
    pub fn escalate(
        &self,
        amount: f64,
        base_year: i32,
        currency: Currency,
    ) -> crate::error::EngineResult<f64> {
        let inflated = adjust_cost(amount, base_year, self.target_year)?;
        Ok(self.to_gbp(inflated, currency))
    }
}
