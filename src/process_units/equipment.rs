use serde::{Deserialize, Serialize};

use super::{CostBasis, Currency, LHV_NH3_MJ_PER_KG};
use crate::domain::A2pTechnology;
use crate::error::EngineResult;

/// Common surface of every sized piece of equipment.
pub trait ProcessUnit {
    fn name(&self) -> &str;

    /// Installed cost in GBP at the cost basis price level.
    fn sized_capex(&self) -> f64;

    fn annual_opex(&self, basis: &CostBasis) -> f64 {
        basis.opex_fraction * self.sized_capex()
    }
}

/// Electrolyser energy demand per kg NH3 (MJ/kg).
const ELECTROLYSER_ENERGY_MJ_PER_KG: f64 = 35.3;
/// Hydrogen energy content per kg NH3 produced (MJ/kg NH3).
const ELECTROLYSER_H2_LHV_PER_KG_NH3: f64 = 21.28;
const ELECTROLYSER_UNIT_CAPEX_USD_PER_MW: f64 = 750_000.0;
const ELECTROLYSER_REFERENCE_MW: f64 = 10.0;
const ELECTROLYSER_STACK_FRACTION: f64 = 0.6;
const ELECTROLYSER_BOP_FRACTION: f64 = 0.4;
const ELECTROLYSER_BOP_EXPONENT: f64 = 0.6;
const ELECTROLYSER_BASE_YEAR: i32 = 2024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Electrolyser {
    pub name: String,
    pub power_mw: f64,
    pub capex: f64,
}

impl Electrolyser {
    pub const ENERGY_MJ_PER_KG: f64 = ELECTROLYSER_ENERGY_MJ_PER_KG;

    /// Stack cost scales linearly; balance of plant follows a power law
    /// around the 10 MW reference.
    pub fn sized(name: impl Into<String>, power_mw: f64, basis: &CostBasis) -> EngineResult<Self> {
        let unit_capex = basis.escalate(
            ELECTROLYSER_UNIT_CAPEX_USD_PER_MW,
            ELECTROLYSER_BASE_YEAR,
            Currency::Usd,
        )?;
        let capex = if power_mw > 0.0 {
            let stack = unit_capex * ELECTROLYSER_STACK_FRACTION * power_mw;
            let scaling =
                (power_mw / ELECTROLYSER_REFERENCE_MW).powf(ELECTROLYSER_BOP_EXPONENT - 1.0);
            let bop = unit_capex * ELECTROLYSER_BOP_FRACTION * power_mw * scaling;
            stack + bop
        } else {
            0.0
        };
        Ok(Self {
            name: name.into(),
            power_mw,
            capex,
        })
    }

    pub fn efficiency(&self) -> f64 {
        ELECTROLYSER_H2_LHV_PER_KG_NH3 / ELECTROLYSER_ENERGY_MJ_PER_KG
    }

    /// Share of the sized cost that is replaced at end of stack life.
    pub fn stack_capex(&self) -> f64 {
        self.capex * ELECTROLYSER_STACK_FRACTION
    }
}

impl ProcessUnit for Electrolyser {
    fn name(&self) -> &str {
        &self.name
    }

    fn sized_capex(&self) -> f64 {
        self.capex
    }
}

/// `unit_cost = a * size^b + c`, total = unit_cost * size, in USD.
#[derive(Debug, Clone, Copy)]
struct Correlation {
    a: f64,
    b: f64,
    c: f64,
    base_year: i32,
}

impl Correlation {
    fn capex(&self, size: f64, basis: &CostBasis) -> EngineResult<f64> {
        if size <= 0.0 {
            return Ok(0.0);
        }
        let unit = self.a * size.powf(self.b) + self.c;
        basis.escalate(unit * size, self.base_year, Currency::Usd)
    }
}

const ASU_CORRELATION: Correlation = Correlation {
    a: 1_606_000.0,
    b: -0.6249,
    c: 9_318.0,
    base_year: 2010,
};
const N2_TO_NH3_MASS_RATIO: f64 = 14.01 / 17.0034;

/// Air separation unit supplying nitrogen to the synthesis loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirSeparationUnit {
    pub name: String,
    /// NH3 production it supports (t/day).
    pub nh3_tonnes_per_day: f64,
    pub capex: f64,
}

impl AirSeparationUnit {
    pub const ENERGY_MJ_PER_KG: f64 = 0.74;

    pub fn sized(
        name: impl Into<String>,
        nh3_tonnes_per_day: f64,
        basis: &CostBasis,
    ) -> EngineResult<Self> {
        let n2_tonnes_per_day = nh3_tonnes_per_day * N2_TO_NH3_MASS_RATIO;
        Ok(Self {
            name: name.into(),
            nh3_tonnes_per_day,
            capex: ASU_CORRELATION.capex(n2_tonnes_per_day, basis)?,
        })
    }
}

impl ProcessUnit for AirSeparationUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn sized_capex(&self) -> f64 {
        self.capex
    }
}

const SYNTHESIS_CORRELATION: Correlation = Correlation {
    a: 23_850_000.0,
    b: -1.340,
    c: 173_500.0,
    base_year: 2010,
};

/// Compressors plus Haber-Bosch reactor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisLoop {
    pub name: String,
    pub nh3_tonnes_per_day: f64,
    pub capex: f64,
}

impl SynthesisLoop {
    const H2_COMPRESSION_MJ_PER_KG: f64 = 0.763;
    const N2_COMPRESSION_MJ_PER_KG: f64 = 0.587;
    const REACTOR_MJ_PER_KG: f64 = 0.294;
    pub const ENERGY_MJ_PER_KG: f64 = Self::H2_COMPRESSION_MJ_PER_KG
        + Self::N2_COMPRESSION_MJ_PER_KG
        + Self::REACTOR_MJ_PER_KG;

    pub fn sized(
        name: impl Into<String>,
        nh3_tonnes_per_day: f64,
        basis: &CostBasis,
    ) -> EngineResult<Self> {
        Ok(Self {
            name: name.into(),
            nh3_tonnes_per_day,
            capex: SYNTHESIS_CORRELATION.capex(nh3_tonnes_per_day, basis)?,
        })
    }
}

impl ProcessUnit for SynthesisLoop {
    fn name(&self) -> &str {
        &self.name
    }

    fn sized_capex(&self) -> f64 {
        self.capex
    }
}

const STORAGE_REFERENCE_TONNES: f64 = 25_000.0;
const STORAGE_REFERENCE_COST_USD: f64 = 39_000_000.0;
const STORAGE_SMALL_TANK_TONNES: f64 = 10_000.0;

/// Refrigerated NH3 tank, costed by the six-tenths rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageTank {
    pub name: String,
    pub capacity_tonnes: f64,
    pub capex: f64,
}

impl StorageTank {
    pub fn sized(name: impl Into<String>, capacity_tonnes: f64, basis: &CostBasis) -> Self {
        let exponent = if capacity_tonnes < STORAGE_SMALL_TANK_TONNES {
            0.7
        } else {
            0.6
        };
        let cost_usd = if capacity_tonnes > 0.0 {
            STORAGE_REFERENCE_COST_USD * (capacity_tonnes / STORAGE_REFERENCE_TONNES).powf(exponent)
        } else {
            0.0
        };
        Self {
            name: name.into(),
            capacity_tonnes,
            capex: basis.to_gbp(cost_usd, Currency::Usd),
        }
    }

    /// Chemical energy held by a full tank (MJ).
    pub fn max_energy_mj(&self) -> f64 {
        self.capacity_tonnes * 1_000.0 * LHV_NH3_MJ_PER_KG
    }
}

impl ProcessUnit for StorageTank {
    fn name(&self) -> &str {
        &self.name
    }

    fn sized_capex(&self) -> f64 {
        self.capex
    }
}

const CCGT_REFERENCE_MW: f64 = 1_000.0;
const CCGT_REFERENCE_USD_PER_KW: f64 = 766.0;
const CCGT_SCALING_EXPONENT: f64 = 0.8;
const A2P_BASE_YEAR: i32 = 2019;
const CRACKER_CONVERSION: f64 = 0.99;
/// kg H2 released per kg NH3 cracked (2 NH3 -> N2 + 3 H2).
const H2_PER_NH3: f64 = (3.0 * 1.008 * 2.0) / (2.0 * 17.031);

/// Gas-turbine power block, with an ammonia cracker where the technology needs one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerBlock {
    pub name: String,
    pub technology: A2pTechnology,
    pub power_mw: f64,
    pub ccgt_capex: f64,
    pub cracker_capex: f64,
}

impl PowerBlock {
    pub fn sized(
        name: impl Into<String>,
        technology: A2pTechnology,
        power_mw: f64,
        basis: &CostBasis,
    ) -> EngineResult<Self> {
        let reference_cost_usd = CCGT_REFERENCE_USD_PER_KW * 1_000.0 * CCGT_REFERENCE_MW;
        let ccgt_usd = if power_mw > 0.0 {
            reference_cost_usd * (power_mw / CCGT_REFERENCE_MW).powf(CCGT_SCALING_EXPONENT)
        } else {
            0.0
        };
        let ccgt_capex = basis.escalate(ccgt_usd, A2P_BASE_YEAR, Currency::Usd)?;

        let h2_tonnes_per_hour = Self::ammonia_flow_kg_per_hour(technology, power_mw)
            * technology.cracked_fraction()
            * H2_PER_NH3
            * CRACKER_CONVERSION
            / 1_000.0;
        let cracker_capex = if h2_tonnes_per_hour > 0.0 {
            let cracker_usd = 18.171 * h2_tonnes_per_hour.powf(0.7451) * 1_000_000.0;
            basis.escalate(cracker_usd, A2P_BASE_YEAR, Currency::Usd)?
        } else {
            0.0
        };

        Ok(Self {
            name: name.into(),
            technology,
            power_mw,
            ccgt_capex,
            cracker_capex,
        })
    }

    /// NH3 feed needed to deliver `power_mw` of electricity (kg/h).
    pub fn ammonia_flow_kg_per_hour(technology: A2pTechnology, power_mw: f64) -> f64 {
        let thermal_input_mj_per_hour = power_mw / technology.efficiency() * 3_600.0;
        thermal_input_mj_per_hour / LHV_NH3_MJ_PER_KG
    }

    pub fn efficiency(&self) -> f64 {
        self.technology.efficiency()
    }
}

impl ProcessUnit for PowerBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn sized_capex(&self) -> f64 {
        self.ccgt_capex + self.cracker_capex
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn electrolyser_at_reference_size() {
        let basis = CostBasis::default();
        let unit = Electrolyser::sized("e", 10.0, &basis).unwrap();
        // At the reference size the BOP scaling factor is 1.
        assert_relative_eq!(unit.capex, 750_000.0 * 0.75 * 10.0, epsilon = 1e-6);
        assert_relative_eq!(unit.stack_capex(), unit.capex * 0.6);
    }

    #[test]
    fn zero_sized_units_cost_nothing() {
        let basis = CostBasis::default();
        assert_eq!(Electrolyser::sized("e", 0.0, &basis).unwrap().capex, 0.0);
        assert_eq!(AirSeparationUnit::sized("a", 0.0, &basis).unwrap().capex, 0.0);
        assert_eq!(SynthesisLoop::sized("s", 0.0, &basis).unwrap().capex, 0.0);
        assert_eq!(StorageTank::sized("t", 0.0, &basis).capex, 0.0);
    }

    #[test]
    fn storage_uses_reference_cost_at_reference_size() {
        let tank = StorageTank::sized("t", 25_000.0, &CostBasis::default());
        assert_relative_eq!(tank.capex, 39_000_000.0 * 0.75, epsilon = 1e-6);
    }

    #[test]
    fn small_tanks_scale_steeper() {
        let basis = CostBasis::default();
        let small = StorageTank::sized("t", 5_000.0, &basis);
        let expected = 39_000_000.0 * (5_000.0_f64 / 25_000.0).powf(0.7) * 0.75;
        assert_relative_eq!(small.capex, expected, epsilon = 1e-6);
    }

    #[test]
    fn unsupported_target_year_propagates() {
        let basis = CostBasis {
            target_year: 2035,
            ..CostBasis::default()
        };
        assert!(Electrolyser::sized("e", 10.0, &basis).is_err());
    }

    #[rstest]
    #[case(A2pTechnology::DirectCombustion, false)]
    #[case(A2pTechnology::BlendCombustion, true)]
    #[case(A2pTechnology::H2Combustion, true)]
    fn cracker_only_where_needed(#[case] technology: A2pTechnology, #[case] has_cracker: bool) {
        let block = PowerBlock::sized("p", technology, 100.0, &CostBasis::default()).unwrap();
        assert_eq!(block.cracker_capex > 0.0, has_cracker);
        assert!(block.ccgt_capex > 0.0);
    }

    #[test]
    fn full_cracking_costs_more_than_blend() {
        let basis = CostBasis::default();
        let blend = PowerBlock::sized("b", A2pTechnology::BlendCombustion, 100.0, &basis).unwrap();
        let h2 = PowerBlock::sized("h", A2pTechnology::H2Combustion, 100.0, &basis).unwrap();
        assert!(h2.cracker_capex > blend.cracker_capex);
    }

    #[test]
    fn ammonia_flow_follows_efficiency() {
        let flow = PowerBlock::ammonia_flow_kg_per_hour(A2pTechnology::DirectCombustion, 100.0);
        assert_relative_eq!(flow, 100.0 / 0.6 * 3_600.0 / 18.6, epsilon = 1e-9);
    }
}
