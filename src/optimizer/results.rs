use tracing::info;

use super::model::{BoundModel, SolvedValues};
use crate::domain::{OptimalDesign, OptimizationResults, PeriodEconomics, ResultRecord};

/// Binary flags come back from the solver as floats.
const FLAG_THRESHOLD: f64 = 0.5;

/// Folds solved variable values into the operational ledger and design summary.
///
/// Pure: reads the bound model and the solved values, never the solver.
#[derive(Debug, Clone, Copy)]
pub struct ResultMaterializer<'a> {
    bound: &'a BoundModel,
}

impl<'a> ResultMaterializer<'a> {
    pub fn new(bound: &'a BoundModel) -> Self {
        Self { bound }
    }

    pub fn materialize(&self, values: &SolvedValues) -> OptimizationResults {
        let dt = self.bound.timestep_hours;
        let mut cumulative_produced = 0.0;
        let mut cumulative_consumed = 0.0;
        let mut cumulative_net = 0.0;

        let operational_results: Vec<ResultRecord> = self
            .bound
            .series
            .points()
            .iter()
            .enumerate()
            .map(|(t, point)| {
                let charging = values.charging.get(t).copied().unwrap_or(0.0);
                let discharging = values.discharging.get(t).copied().unwrap_or(0.0);

                let produced = self.bound.charge_in(charging);
                let consumed = self.bound.discharge_out(discharging);
                let cost = charging * dt * point.price;
                let revenue = discharging * dt * point.price;
                let net = revenue - cost;

                cumulative_produced += produced;
                cumulative_consumed += consumed;
                cumulative_net += net;

                ResultRecord {
                    time: point.timestamp,
                    time_step: t,
                    price: point.price,
                    charging_power_mw: charging,
                    discharging_power_mw: discharging,
                    nh3_level_tonnes: values.level.get(t).copied().unwrap_or(0.0),
                    nh3_produced_tonnes: produced,
                    nh3_consumed_tonnes: consumed,
                    charging_cost: cost,
                    discharging_revenue: revenue,
                    net_revenue: net,
                    is_charging: flag(values.is_charging.get(t)),
                    is_discharging: flag(values.is_discharging.get(t)),
                    demand: point.demand,
                    wind: point.wind,
                    curtailment: point.curtailment,
                    carbon_based_fuels: point.carbon_based_fuels,
                    cumulative_nh3_produced: cumulative_produced,
                    cumulative_nh3_consumed: cumulative_consumed,
                    cumulative_net_revenue: cumulative_net,
                }
            })
            .collect();

        let objective_value = values.objective;
        let optimal_design = OptimalDesign {
            optimal_capacity_tonnes: values.capacity,
            optimal_initial_level_tonnes: values.initial_level,
        };
        let economics = PeriodEconomics {
            period_operational_profit: cumulative_net,
            period_hours: self.bound.period_hours(),
        };

        info!(
            capacity_tonnes = optimal_design.optimal_capacity_tonnes,
            initial_level_tonnes = optimal_design.optimal_initial_level_tonnes,
            objective = objective_value,
            period_profit = economics.period_operational_profit,
            period_hours = economics.period_hours,
            "optimal design"
        );

        OptimizationResults {
            operational_results,
            optimal_design,
            economics,
            objective_value,
            timestep_hours: dt,
        }
    }
}

fn flag(value: Option<&f64>) -> u8 {
    match value {
        Some(&v) if v > FLAG_THRESHOLD => 1,
        _ => 0,
    }
}

/// Recompute the inventory trajectory from a ledger and a start level.
pub fn replay_inventory(initial_level: f64, ledger: &[ResultRecord]) -> Vec<f64> {
    ledger
        .iter()
        .scan(initial_level, |level, record| {
            *level += record.nh3_produced_tonnes - record.nh3_consumed_tonnes;
            Some(*level)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::model::fixtures::{bound, bound_with, unit_params};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    /// Hand-built schedule consistent with the mass balance.
    fn consistent_values(bound: &BoundModel, charging: &[f64], discharging: &[f64], start: f64) -> SolvedValues {
        let mut level = Vec::with_capacity(charging.len());
        let mut current = start;
        for (&c, &d) in charging.iter().zip(discharging) {
            current += bound.charge_in(c) - bound.discharge_out(d);
            level.push(current);
        }
        let objective = bound
            .series
            .points()
            .iter()
            .zip(charging.iter().zip(discharging))
            .map(|(point, (&c, &d))| point.price * bound.timestep_hours * (d - c))
            .sum();
        SolvedValues {
            objective,
            capacity: level.iter().copied().fold(start, f64::max),
            initial_level: start,
            is_charging: charging.iter().map(|&c| if c > 0.0 { 1.0 } else { 0.0 }).collect(),
            is_discharging: discharging.iter().map(|&d| if d > 0.0 { 1.0 } else { 0.0 }).collect(),
            charging: charging.to_vec(),
            discharging: discharging.to_vec(),
            level,
        }
    }

    #[test]
    fn derives_mass_and_money_per_step() {
        let bound = bound(&[10.0, 50.0]);
        let values = consistent_values(&bound, &[8.0, 0.0], &[0.0, 6.0], 5.0);
        let results = ResultMaterializer::new(&bound).materialize(&values);
        let cf = unit_params().conversion_factor();

        let first = &results.operational_results[0];
        assert_relative_eq!(first.nh3_produced_tonnes, 8.0 * cf);
        assert_relative_eq!(first.charging_cost, 80.0);
        assert_relative_eq!(first.net_revenue, -80.0);
        assert_eq!((first.is_charging, first.is_discharging), (1, 0));

        let second = &results.operational_results[1];
        assert_relative_eq!(second.nh3_consumed_tonnes, 6.0 * cf);
        assert_relative_eq!(second.discharging_revenue, 300.0);
        assert_relative_eq!(second.cumulative_net_revenue, 220.0);
        assert_eq!(second.time_step, 1);
        assert_relative_eq!(second.demand, 30_000.0);
    }

    #[test]
    fn summary_carries_design_and_period() {
        let bound = bound(&[10.0, 50.0, 20.0]);
        let values = consistent_values(&bound, &[8.0, 0.0, 0.0], &[0.0, 8.0, 0.0], 0.0);
        let results = ResultMaterializer::new(&bound).materialize(&values);
        assert_relative_eq!(results.optimal_design.optimal_initial_level_tonnes, 0.0);
        assert_relative_eq!(results.economics.period_hours, 3.0);
        assert_relative_eq!(results.economics.period_operational_profit, 320.0);
        assert_relative_eq!(results.objective_value, 320.0);
        assert_relative_eq!(results.timestep_hours, 1.0);
    }

    #[test]
    fn objective_is_taken_from_the_solver() {
        let bound = bound(&[10.0, 50.0]);
        let mut values = consistent_values(&bound, &[8.0, 0.0], &[0.0, 6.0], 5.0);
        values.objective = 1_234.5;
        let results = ResultMaterializer::new(&bound).materialize(&values);
        assert_relative_eq!(results.objective_value, 1_234.5);
        assert_relative_eq!(results.economics.period_operational_profit, 220.0);
    }

    #[test]
    fn fractional_flags_round_at_half() {
        assert_eq!(flag(Some(&0.9999)), 1);
        assert_eq!(flag(Some(&1e-7)), 0);
        assert_eq!(flag(None), 0);
    }

    #[test]
    fn lossy_efficiencies_apply_asymmetrically() {
        let mut params = unit_params();
        params.charging_efficiency = 0.5;
        params.discharging_efficiency = 0.8;
        let bound = bound_with(params, &[1.0, 2.0]);
        let values = consistent_values(&bound, &[10.0, 0.0], &[0.0, 4.0], 1.0);
        let results = ResultMaterializer::new(&bound).materialize(&values);
        let cf = params.conversion_factor();
        assert_relative_eq!(results.operational_results[0].nh3_produced_tonnes, 10.0 * 0.5 * cf);
        assert_relative_eq!(results.operational_results[1].nh3_consumed_tonnes, 4.0 / 0.8 * cf);
    }

    proptest! {
        #[test]
        fn cumulative_mass_never_decreases(
            schedule in prop::collection::vec((0.0f64..10.0, 0.0f64..10.0, 0.0f64..200.0), 1..48)
        ) {
            let prices: Vec<f64> = schedule.iter().map(|s| s.2).collect();
            let charging: Vec<f64> = schedule.iter().map(|s| s.0).collect();
            let discharging: Vec<f64> = schedule.iter().map(|s| s.1).collect();
            let bound = bound(&prices);
            let values = consistent_values(&bound, &charging, &discharging, 100.0);
            let ledger = ResultMaterializer::new(&bound).materialize(&values).operational_results;

            for pair in ledger.windows(2) {
                prop_assert!(pair[1].cumulative_nh3_produced >= pair[0].cumulative_nh3_produced);
                prop_assert!(pair[1].cumulative_nh3_consumed >= pair[0].cumulative_nh3_consumed);
            }
        }

        #[test]
        fn replay_reproduces_levels(
            schedule in prop::collection::vec((0.0f64..10.0, 0.0f64..10.0), 1..48)
        ) {
            let prices = vec![42.0; schedule.len()];
            let charging: Vec<f64> = schedule.iter().map(|s| s.0).collect();
            let discharging: Vec<f64> = schedule.iter().map(|s| s.1).collect();
            let bound = bound(&prices);
            let values = consistent_values(&bound, &charging, &discharging, 100.0);
            let ledger = ResultMaterializer::new(&bound).materialize(&values).operational_results;

            let replayed = replay_inventory(100.0, &ledger);
            for (record, level) in ledger.iter().zip(replayed) {
                prop_assert!((record.nh3_level_tonnes - level).abs() < 1e-9);
            }
        }
    }
}
