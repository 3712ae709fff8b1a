use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    AirSeparationUnit, CostBasis, Electrolyser, PowerBlock, ProcessUnit, StorageTank,
    SynthesisLoop, LHV_NH3_MJ_PER_KG,
};
use crate::domain::A2pTechnology;
use crate::error::{EngineError, EngineResult};

/// Electricity to stored ammonia: electrolyser, air separation and synthesis loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerToAmmonia {
    pub capacity_mw: f64,
    pub electrolyser: Electrolyser,
    pub air_separation: AirSeparationUnit,
    pub synthesis_loop: SynthesisLoop,
}

impl PowerToAmmonia {
    pub fn new(name: &str, capacity_mw: f64, basis: &CostBasis) -> EngineResult<Self> {
        if !(capacity_mw > 0.0) {
            return Err(EngineError::invalid(
                "p2a_capacity",
                format!("must be positive, got {capacity_mw}"),
            ));
        }

        let total = Self::specific_energy_mj_per_kg();
        let electrolyser_mw = Electrolyser::ENERGY_MJ_PER_KG / total * capacity_mw;
        let nh3_tonnes_per_day = Self::max_daily_production_for(capacity_mw);

        Ok(Self {
            capacity_mw,
            electrolyser: Electrolyser::sized(format!("{name}_electrolyser"), electrolyser_mw, basis)?,
            air_separation: AirSeparationUnit::sized(format!("{name}_asu"), nh3_tonnes_per_day, basis)?,
            synthesis_loop: SynthesisLoop::sized(
                format!("{name}_synthesis_loop"),
                nh3_tonnes_per_day,
                basis,
            )?,
        })
    }

    /// Electricity consumed per kg of NH3 across the whole chain (MJ/kg).
    pub fn specific_energy_mj_per_kg() -> f64 {
        Electrolyser::ENERGY_MJ_PER_KG
            + AirSeparationUnit::ENERGY_MJ_PER_KG
            + SynthesisLoop::ENERGY_MJ_PER_KG
    }

    /// Chemical energy stored per unit of electricity drawn.
    pub fn efficiency() -> f64 {
        LHV_NH3_MJ_PER_KG / Self::specific_energy_mj_per_kg()
    }

    fn max_daily_production_for(capacity_mw: f64) -> f64 {
        let daily_energy_mj = capacity_mw * 24.0 * 3_600.0;
        daily_energy_mj / Self::specific_energy_mj_per_kg() / 1_000.0
    }

    /// NH3 produced by a day at full power (t/day).
    pub fn max_daily_production_tonnes(&self) -> f64 {
        Self::max_daily_production_for(self.capacity_mw)
    }

    fn units(&self) -> [&dyn ProcessUnit; 3] {
        [&self.electrolyser, &self.air_separation, &self.synthesis_loop]
    }

    pub fn total_capex(&self) -> f64 {
        self.units().iter().map(|u| u.sized_capex()).sum()
    }

    pub fn annual_opex(&self, basis: &CostBasis) -> f64 {
        self.units().iter().map(|u| u.annual_opex(basis)).sum()
    }
}

/// Stored ammonia back to electricity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmmoniaToPower {
    pub capacity_mw: f64,
    pub power_block: PowerBlock,
}

impl AmmoniaToPower {
    pub fn new(
        name: &str,
        capacity_mw: f64,
        technology: A2pTechnology,
        basis: &CostBasis,
    ) -> EngineResult<Self> {
        if !(capacity_mw > 0.0) {
            return Err(EngineError::invalid(
                "a2p_capacity",
                format!("must be positive, got {capacity_mw}"),
            ));
        }
        Ok(Self {
            capacity_mw,
            power_block: PowerBlock::sized(
                format!("{name}_{technology}"),
                technology,
                capacity_mw,
                basis,
            )?,
        })
    }

    pub fn technology(&self) -> A2pTechnology {
        self.power_block.technology
    }

    pub fn efficiency(&self) -> f64 {
        self.power_block.efficiency()
    }

    /// NH3 burnt by a day at full power (t/day).
    pub fn daily_nh3_consumption_tonnes(&self) -> f64 {
        PowerBlock::ammonia_flow_kg_per_hour(self.technology(), self.capacity_mw) * 24.0 / 1_000.0
    }

    pub fn total_capex(&self) -> f64 {
        self.power_block.sized_capex()
    }

    pub fn annual_opex(&self, basis: &CostBasis) -> f64 {
        self.power_block.annual_opex(basis)
    }
}

/// CAPEX and annual OPEX per subsystem (GBP).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemCosts {
    pub p2a_capex: f64,
    pub storage_capex: f64,
    pub a2p_capex: f64,
    pub total_capex: f64,
    pub p2a_opex: f64,
    pub storage_opex: f64,
    pub a2p_opex: f64,
    pub total_opex: f64,
}

/// Complete ammonia battery: charging chain, tank and power block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmmoniaBattery {
    pub name: String,
    pub p2a: PowerToAmmonia,
    pub storage: StorageTank,
    pub a2p: AmmoniaToPower,
    basis: CostBasis,
}

impl AmmoniaBattery {
    pub fn new(
        name: impl Into<String>,
        p2a_capacity_mw: f64,
        storage_capacity_tonnes: f64,
        a2p_capacity_mw: f64,
        technology: A2pTechnology,
        basis: CostBasis,
    ) -> EngineResult<Self> {
        let name = name.into();
        Ok(Self {
            p2a: PowerToAmmonia::new(&format!("{name}_p2a"), p2a_capacity_mw, &basis)?,
            storage: StorageTank::sized(format!("{name}_storage"), storage_capacity_tonnes, &basis),
            a2p: AmmoniaToPower::new(&format!("{name}_a2p"), a2p_capacity_mw, technology, &basis)?,
            name,
            basis,
        })
    }

    pub fn basis(&self) -> &CostBasis {
        &self.basis
    }

    pub fn charging_efficiency(&self) -> f64 {
        PowerToAmmonia::efficiency()
    }

    pub fn discharging_efficiency(&self) -> f64 {
        self.a2p.efficiency()
    }

    pub fn round_trip_efficiency(&self) -> f64 {
        self.charging_efficiency() * self.discharging_efficiency()
    }

    pub fn system_costs(&self) -> SystemCosts {
        let p2a_capex = self.p2a.total_capex();
        let storage_capex = self.storage.sized_capex();
        let a2p_capex = self.a2p.total_capex();
        let p2a_opex = self.p2a.annual_opex(&self.basis);
        let storage_opex = self.storage.annual_opex(&self.basis);
        let a2p_opex = self.a2p.annual_opex(&self.basis);
        SystemCosts {
            p2a_capex,
            storage_capex,
            a2p_capex,
            total_capex: p2a_capex + storage_capex + a2p_capex,
            p2a_opex,
            storage_opex,
            a2p_opex,
            total_opex: p2a_opex + storage_opex + a2p_opex,
        }
    }

    pub fn log_summary(&self) {
        let costs = self.system_costs();
        info!(
            battery = %self.name,
            p2a_mw = self.p2a.capacity_mw,
            storage_tonnes = self.storage.capacity_tonnes,
            a2p_mw = self.a2p.capacity_mw,
            technology = %self.a2p.technology(),
            charging_efficiency = self.charging_efficiency(),
            discharging_efficiency = self.discharging_efficiency(),
            round_trip_efficiency = self.round_trip_efficiency(),
            total_capex_gbp = costs.total_capex,
            annual_opex_gbp = costs.total_opex,
            "ammonia battery configured"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn battery(technology: A2pTechnology) -> AmmoniaBattery {
        AmmoniaBattery::new("test", 100.0, 10_000.0, 100.0, technology, CostBasis::default())
            .unwrap()
    }

    #[test]
    fn p2a_efficiency_from_specific_energy() {
        let expected = 18.6 / (35.3 + 0.74 + 0.763 + 0.587 + 0.294);
        assert_relative_eq!(PowerToAmmonia::efficiency(), expected, epsilon = 1e-12);
    }

    #[test]
    fn electrolyser_takes_its_power_fraction() {
        let b = battery(A2pTechnology::DirectCombustion);
        let fraction = 35.3 / PowerToAmmonia::specific_energy_mj_per_kg();
        assert_relative_eq!(b.p2a.electrolyser.power_mw, 100.0 * fraction, epsilon = 1e-9);
    }

    #[rstest]
    #[case(A2pTechnology::DirectCombustion, 0.60)]
    #[case(A2pTechnology::BlendCombustion, 0.574)]
    #[case(A2pTechnology::H2Combustion, 0.525)]
    fn discharging_efficiency_per_technology(
        #[case] technology: A2pTechnology,
        #[case] efficiency: f64,
    ) {
        assert_relative_eq!(battery(technology).discharging_efficiency(), efficiency);
    }

    #[test]
    fn totals_add_up() {
        let costs = battery(A2pTechnology::BlendCombustion).system_costs();
        assert_relative_eq!(
            costs.total_capex,
            costs.p2a_capex + costs.storage_capex + costs.a2p_capex
        );
        assert_relative_eq!(costs.total_opex, 0.02 * costs.total_capex, epsilon = 1e-6);
    }

    #[test]
    fn rejects_non_positive_capacity() {
        let err = AmmoniaBattery::new(
            "bad",
            0.0,
            1_000.0,
            100.0,
            A2pTechnology::DirectCombustion,
            CostBasis::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name: "p2a_capacity", .. }));
    }
}
