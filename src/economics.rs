//! Post-solve economics.
//!
//! The optimizer only sees the operating margin. Everything here combines a
//! solved ledger with equipment costs and the financial assumptions in
//! [`EconomicsConfig`] to produce annualised and levelized figures.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EconomicsConfig;
use crate::domain::{A2pTechnology, OptimizationResults};
use crate::process_units::{
    AmmoniaBattery, ProcessUnit, StorageTank, LHV_NH3_MJ_PER_KG,
};

/// `r(1+r)^n / ((1+r)^n - 1)`, or `1/n` without discounting.
pub fn capital_recovery_factor(discount_rate: f64, lifetime_years: u32) -> f64 {
    let n = lifetime_years as f64;
    if discount_rate == 0.0 {
        return if n > 0.0 { 1.0 / n } else { 0.0 };
    }
    let growth = (1.0 + discount_rate).powf(n);
    discount_rate * growth / (growth - 1.0)
}

pub fn annualized_cost(capex: f64, discount_rate: f64, lifetime_years: u32) -> f64 {
    capex * capital_recovery_factor(discount_rate, lifetime_years)
}

/// Present value of one unit paid every year: `(1 - (1+r)^-n) / r`.
pub fn present_value_factor(discount_rate: f64, lifetime_years: u32) -> f64 {
    let n = lifetime_years as f64;
    if discount_rate == 0.0 {
        return n;
    }
    (1.0 - (1.0 + discount_rate).powf(-n)) / discount_rate
}

/// Inputs of a generic levelized cost (LCOx) calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LevelizedCostInputs {
    /// Physical output per year (t or MWh).
    pub annual_output: f64,
    pub capital_cost: f64,
    pub annual_fixed_cost: f64,
    pub annual_variable_cost: f64,
    /// Present value of intermittent replacements.
    pub pv_replacement_costs: f64,
}

/// Discounted lifetime cost per unit of discounted lifetime output.
///
/// Zero output yields `f64::INFINITY`.
pub fn levelized_cost(inputs: LevelizedCostInputs, discount_rate: f64, lifetime_years: u32) -> f64 {
    if inputs.annual_output == 0.0 {
        return f64::INFINITY;
    }
    let pvf = present_value_factor(discount_rate, lifetime_years);
    let pv_costs = inputs.capital_cost
        + (inputs.annual_fixed_cost + inputs.annual_variable_cost) * pvf
        + inputs.pv_replacement_costs;
    pv_costs / (inputs.annual_output * pvf)
}

/// Share of the reference year covered by a period.
pub fn time_fraction(period_hours: f64, reference_year_hours: f64) -> f64 {
    if reference_year_hours > 0.0 {
        period_hours / reference_year_hours
    } else {
        0.0
    }
}

/// Scale a period total to a full year; `0` when the period is empty.
pub fn annualise(period_value: f64, time_fraction: f64) -> f64 {
    if time_fraction > 0.0 {
        period_value / time_fraction
    } else {
        0.0
    }
}

/// Hours in the period with the P2A chain running.
fn charging_hours(results: &OptimizationResults) -> f64 {
    let steps = results
        .operational_results
        .iter()
        .filter(|r| r.charging_power_mw > 0.0)
        .count();
    steps as f64 * results.timestep_hours
}

/// Present value of the electrolyser stack replacements over the lifetime.
///
/// Stacks wear with charging hours; a replacement falling after the last
/// project year is not counted.
pub fn electrolyser_replacement_pv(
    results: &OptimizationResults,
    technology: A2pTechnology,
    electrolyser_capex: f64,
    time_fraction: f64,
    config: &EconomicsConfig,
) -> f64 {
    let annual_hours = annualise(charging_hours(results), time_fraction);
    if annual_hours <= 0.0 {
        return 0.0;
    }

    let interval = technology.stack_replacement_hours();
    let lifetime = config.lifetime_years as f64;
    let replacements = (annual_hours * lifetime / interval).floor() as u32;
    let stack_cost = electrolyser_capex * 0.6;

    (1..=replacements)
        .map(|k| k as f64 * interval / annual_hours)
        .take_while(|&year| year <= lifetime)
        .map(|year| stack_cost / (1.0 + config.discount_rate).powf(year))
        .sum()
}

/// Whole-system economics with the storage tank re-costed at the optimal size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemEconomics {
    pub optimal_storage_capex: f64,
    pub p2a_capex: f64,
    pub a2p_capex: f64,
    pub total_system_capex: f64,
    pub annualized_capex: f64,
    pub p2a_opex: f64,
    pub storage_opex: f64,
    pub a2p_opex: f64,
    pub total_annual_opex: f64,
    pub annual_operational_profit: f64,
    pub net_annual_profit: f64,
    pub period_operational_profit: f64,
    pub period_hours: f64,
    pub time_fraction: f64,
}

impl SystemEconomics {
    pub fn with_optimal_storage(
        results: &OptimizationResults,
        battery: &AmmoniaBattery,
        config: &EconomicsConfig,
    ) -> Self {
        let basis = battery.basis();
        let tank = StorageTank::sized(
            "optimal_storage",
            results.optimal_design.optimal_capacity_tonnes,
            basis,
        );
        let optimal_storage_capex = tank.sized_capex();
        let p2a_capex = battery.p2a.total_capex();
        let a2p_capex = battery.a2p.total_capex();
        let total_system_capex = p2a_capex + optimal_storage_capex + a2p_capex;

        let p2a_opex = config.opex_fraction * p2a_capex;
        let storage_opex = config.opex_fraction * optimal_storage_capex;
        let a2p_opex = config.opex_fraction * a2p_capex;
        let total_annual_opex = p2a_opex + storage_opex + a2p_opex;

        let annualized_capex =
            annualized_cost(total_system_capex, config.discount_rate, config.lifetime_years);
        let period = results.economics;
        let fraction = time_fraction(period.period_hours, config.reference_year_hours);
        let annual_operational_profit = annualise(period.period_operational_profit, fraction);

        let economics = Self {
            optimal_storage_capex,
            p2a_capex,
            a2p_capex,
            total_system_capex,
            annualized_capex,
            p2a_opex,
            storage_opex,
            a2p_opex,
            total_annual_opex,
            annual_operational_profit,
            net_annual_profit: annual_operational_profit - annualized_capex - total_annual_opex,
            period_operational_profit: period.period_operational_profit,
            period_hours: period.period_hours,
            time_fraction: fraction,
        };
        info!(
            total_capex = economics.total_system_capex,
            annualized_capex = economics.annualized_capex,
            annual_opex = economics.total_annual_opex,
            annual_profit = economics.annual_operational_profit,
            net_annual_profit = economics.net_annual_profit,
            "system economics"
        );
        economics
    }
}

/// Levelized cost of ammonia (per tonne produced).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lcoa {
    pub lcoa_per_tonne: f64,
    pub annual_production_tonnes: f64,
    pub p2a_capital_cost: f64,
    pub electrolyser_replacement_pv: f64,
}

/// Levelized cost of electricity generated, with fuel bought at the LCOA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lcoe {
    pub lcoe_per_mwh: f64,
    pub annual_generation_mwh: f64,
    pub annual_fuel_cost: f64,
}

/// Levelized cost of storage (per MWh discharged).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lcos {
    pub lcos_per_mwh: f64,
    pub annual_energy_discharged_mwh: f64,
    pub annual_cycles: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelizedCosts {
    pub lcoa: Lcoa,
    pub lcoe: Lcoe,
    pub lcos: Lcos,
}

impl LevelizedCosts {
    pub fn calculate(
        results: &OptimizationResults,
        battery: &AmmoniaBattery,
        system: &SystemEconomics,
        config: &EconomicsConfig,
    ) -> Self {
        let r = config.discount_rate;
        let n = config.lifetime_years;
        let fraction = system.time_fraction;
        let technology = battery.a2p.technology();
        let replacement_pv = electrolyser_replacement_pv(
            results,
            technology,
            battery.p2a.electrolyser.sized_capex(),
            fraction,
            config,
        );

        let annual_production = annualise(results.total_produced_tonnes(), fraction);
        let annual_electricity_cost = annualise(results.total_charging_cost(), fraction);
        let lcoa_per_tonne = levelized_cost(
            LevelizedCostInputs {
                annual_output: annual_production,
                capital_cost: system.p2a_capex,
                annual_fixed_cost: system.p2a_opex,
                annual_variable_cost: annual_electricity_cost,
                pv_replacement_costs: replacement_pv,
            },
            r,
            n,
        );

        let annual_generation = annualise(results.energy_discharged_mwh(), fraction);
        let annual_fuel_cost = annualise(results.total_consumed_tonnes(), fraction) * lcoa_per_tonne;
        let lcoe_per_mwh = levelized_cost(
            LevelizedCostInputs {
                annual_output: annual_generation,
                capital_cost: system.a2p_capex,
                annual_fixed_cost: system.a2p_opex,
                annual_variable_cost: annual_fuel_cost,
                pv_replacement_costs: 0.0,
            },
            r,
            n,
        );

        let lcos_per_mwh = levelized_cost(
            LevelizedCostInputs {
                annual_output: annual_generation,
                capital_cost: system.total_system_capex,
                annual_fixed_cost: system.total_annual_opex,
                annual_variable_cost: 0.0,
                pv_replacement_costs: replacement_pv,
            },
            r,
            n,
        );
        let storage_energy_mwh =
            results.optimal_design.optimal_capacity_tonnes * 1_000.0 * LHV_NH3_MJ_PER_KG / 3_600.0;
        let annual_cycles = if storage_energy_mwh > 0.0 {
            annual_generation / storage_energy_mwh
        } else {
            0.0
        };

        Self {
            lcoa: Lcoa {
                lcoa_per_tonne,
                annual_production_tonnes: annual_production,
                p2a_capital_cost: system.p2a_capex,
                electrolyser_replacement_pv: replacement_pv,
            },
            lcoe: Lcoe {
                lcoe_per_mwh,
                annual_generation_mwh: annual_generation,
                annual_fuel_cost,
            },
            lcos: Lcos {
                lcos_per_mwh,
                annual_energy_discharged_mwh: annual_generation,
                annual_cycles,
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::domain::series::fixtures::start;
    use crate::domain::{OptimalDesign, OptimizationResults, PeriodEconomics, ResultRecord};
    use chrono::Duration;

    /// Hourly ledger built from `(charging_mw, discharging_mw, price)` rows.
    pub fn results_from(rows: &[(f64, f64, f64)], capacity: f64) -> OptimizationResults {
        let mut net_total = 0.0;
        let operational_results: Vec<ResultRecord> = rows
            .iter()
            .enumerate()
            .map(|(t, &(c, d, price))| {
                let net = (d - c) * price;
                net_total += net;
                ResultRecord {
                    time: start() + Duration::hours(t as i64),
                    time_step: t,
                    price,
                    charging_power_mw: c,
                    discharging_power_mw: d,
                    nh3_level_tonnes: capacity / 2.0,
                    nh3_produced_tonnes: c * 0.1,
                    nh3_consumed_tonnes: d * 0.2,
                    charging_cost: c * price,
                    discharging_revenue: d * price,
                    net_revenue: net,
                    is_charging: u8::from(c > 0.0),
                    is_discharging: u8::from(d > 0.0),
                    demand: 30_000.0,
                    wind: 8_000.0,
                    curtailment: if t % 2 == 0 { 50.0 } else { 0.0 },
                    carbon_based_fuels: 12_000.0,
                    cumulative_nh3_produced: 0.0,
                    cumulative_nh3_consumed: 0.0,
                    cumulative_net_revenue: net_total,
                }
            })
            .collect();
        OptimizationResults {
            optimal_design: OptimalDesign {
                optimal_capacity_tonnes: capacity,
                optimal_initial_level_tonnes: capacity / 2.0,
            },
            economics: PeriodEconomics {
                period_operational_profit: net_total,
                period_hours: rows.len() as f64,
            },
            objective_value: net_total,
            timestep_hours: 1.0,
            operational_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::results_from;
    use super::*;
    use crate::process_units::CostBasis;
    use approx::assert_relative_eq;

    fn battery() -> AmmoniaBattery {
        AmmoniaBattery::new(
            "econ",
            100.0,
            100_000.0,
            100.0,
            A2pTechnology::DirectCombustion,
            CostBasis::default(),
        )
        .unwrap()
    }

    #[test]
    fn crf_matches_closed_form() {
        let crf = capital_recovery_factor(0.07, 25);
        assert_relative_eq!(crf, 0.085_810_5, epsilon = 1e-6);
        assert_relative_eq!(capital_recovery_factor(0.0, 20), 0.05);
    }

    #[test]
    fn pvf_is_inverse_of_crf() {
        let product = present_value_factor(0.07, 25) * capital_recovery_factor(0.07, 25);
        assert_relative_eq!(product, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_output_has_infinite_levelized_cost() {
        let inputs = LevelizedCostInputs {
            capital_cost: 1_000.0,
            ..LevelizedCostInputs::default()
        };
        assert!(levelized_cost(inputs, 0.07, 25).is_infinite());
    }

    #[test]
    fn levelized_cost_of_pure_capex() {
        let inputs = LevelizedCostInputs {
            annual_output: 100.0,
            capital_cost: 1_000_000.0,
            ..LevelizedCostInputs::default()
        };
        let expected = 1_000_000.0 * capital_recovery_factor(0.07, 25) / 100.0;
        assert_relative_eq!(levelized_cost(inputs, 0.07, 25), expected, epsilon = 1e-6);
    }

    #[test]
    fn empty_period_annualises_to_zero() {
        assert_eq!(annualise(123.0, 0.0), 0.0);
        assert_eq!(time_fraction(10.0, 0.0), 0.0);
    }

    #[test]
    fn storage_is_recosted_at_optimal_capacity() {
        let battery = battery();
        let config = EconomicsConfig::default();
        let results = results_from(&[(10.0, 0.0, 20.0), (0.0, 10.0, 80.0)], 5_000.0);
        let economics = SystemEconomics::with_optimal_storage(&results, &battery, &config);

        let expected_tank = StorageTank::sized("t", 5_000.0, battery.basis()).sized_capex();
        assert_relative_eq!(economics.optimal_storage_capex, expected_tank);
        assert!(economics.optimal_storage_capex < battery.storage.sized_capex());
        assert_relative_eq!(
            economics.total_annual_opex,
            0.02 * economics.total_system_capex,
            epsilon = 1e-6
        );
        assert_relative_eq!(economics.time_fraction, 2.0 / 8_784.0);
        assert_relative_eq!(economics.annual_operational_profit, 600.0 * 8_784.0 / 2.0, epsilon = 1e-6);
        assert_relative_eq!(
            economics.net_annual_profit,
            economics.annual_operational_profit - economics.annualized_capex - economics.total_annual_opex
        );
    }

    #[test]
    fn zero_capacity_costs_nothing_to_store() {
        let battery = battery();
        let results = results_from(&[(0.0, 0.0, 0.0), (0.0, 0.0, 0.0)], 0.0);
        let economics =
            SystemEconomics::with_optimal_storage(&results, &battery, &EconomicsConfig::default());
        assert_eq!(economics.optimal_storage_capex, 0.0);
        assert_eq!(economics.annual_operational_profit, 0.0);
    }

    #[test]
    fn replacements_follow_charging_hours() {
        let config = EconomicsConfig::default();
        // Charging every hour of a two-hour period: 8784 h/year, 219 600 h over 25 years.
        let results = results_from(&[(10.0, 0.0, 1.0), (10.0, 0.0, 1.0)], 100.0);
        let fraction = time_fraction(2.0, config.reference_year_hours);
        let pv = electrolyser_replacement_pv(
            &results,
            A2pTechnology::DirectCombustion,
            1_000.0,
            fraction,
            &config,
        );
        let expected: f64 = (1..=2)
            .map(|k| 600.0 / 1.07f64.powf(k as f64 * 80_000.0 / 8_784.0))
            .sum();
        assert_relative_eq!(pv, expected, epsilon = 1e-9);

        let idle = results_from(&[(0.0, 0.0, 1.0)], 100.0);
        assert_eq!(
            electrolyser_replacement_pv(&idle, A2pTechnology::H2Combustion, 1_000.0, fraction, &config),
            0.0
        );
    }

    #[test]
    fn idle_schedule_has_infinite_levelized_costs() {
        let battery = battery();
        let config = EconomicsConfig::default();
        let results = results_from(&[(0.0, 0.0, 10.0), (0.0, 0.0, 10.0)], 0.0);
        let system = SystemEconomics::with_optimal_storage(&results, &battery, &config);
        let costs = LevelizedCosts::calculate(&results, &battery, &system, &config);
        assert!(costs.lcoa.lcoa_per_tonne.is_infinite());
        assert!(costs.lcos.lcos_per_mwh.is_infinite());
        assert_eq!(costs.lcos.annual_cycles, 0.0);
    }

    #[test]
    fn active_schedule_has_finite_levelized_costs() {
        let battery = battery();
        let config = EconomicsConfig::default();
        let results = results_from(&[(50.0, 0.0, 10.0), (0.0, 40.0, 90.0)], 1_000.0);
        let system = SystemEconomics::with_optimal_storage(&results, &battery, &config);
        let costs = LevelizedCosts::calculate(&results, &battery, &system, &config);
        assert!(costs.lcoa.lcoa_per_tonne.is_finite());
        assert!(costs.lcoe.lcoe_per_mwh > 0.0);
        assert_relative_eq!(costs.lcos.annual_energy_discharged_mwh, 40.0 * 8_784.0 / 2.0, epsilon = 1e-6);
        assert!(costs.lcos.annual_cycles > 0.0);
    }
}
