use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

use super::ratio;
use crate::config::EconomicsConfig;
use crate::domain::{OptimizationResults, ResultRecord};
use crate::economics::{annualise, time_fraction};
use crate::process_units::AmmoniaBattery;

/// Annualised operating picture of the battery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationalSummary {
    pub total_profit: f64,
    /// Mean price over charging steps; 0 if the battery never charged.
    pub average_charging_price: f64,
    pub average_discharging_price: f64,
    pub annual_charging_hours: f64,
    pub annual_discharging_hours: f64,
    /// Energy drawn by P2A over what it could draw running flat out all year.
    pub charging_capex_utilisation: f64,
    pub discharging_capex_utilisation: f64,
    pub electrolyser_replacements: u32,
}

impl OperationalSummary {
    pub fn calculate(
        results: &OptimizationResults,
        battery: &AmmoniaBattery,
        config: &EconomicsConfig,
    ) -> Self {
        let ledger = results.ledger();
        let dt = results.timestep_hours;
        let fraction = time_fraction(ledger.len() as f64 * dt, config.reference_year_hours);

        let charging_steps = ledger.iter().filter(|r| r.charging_power_mw > 0.0).count() as f64;
        let discharging_steps = ledger.iter().filter(|r| r.discharging_power_mw > 0.0).count() as f64;
        let annual_charging_hours = annualise(charging_steps * dt, fraction);
        let annual_discharging_hours = annualise(discharging_steps * dt, fraction);

        let annual_consumed_mwh = annualise(results.energy_charged_mwh(), fraction);
        let annual_generated_mwh = annualise(results.energy_discharged_mwh(), fraction);
        let max_consumed_mwh = battery.p2a.capacity_mw * config.reference_year_hours;
        let max_generated_mwh = battery.a2p.capacity_mw * config.reference_year_hours;

        let lifetime_hours = annual_charging_hours * config.lifetime_years as f64;
        let interval = battery.a2p.technology().stack_replacement_hours();

        Self {
            total_profit: ledger.iter().map(|r| r.net_revenue).sum(),
            average_charging_price: mean_price(ledger.iter().filter(|r| r.charging_power_mw > 0.0)),
            average_discharging_price: mean_price(
                ledger.iter().filter(|r| r.discharging_power_mw > 0.0),
            ),
            annual_charging_hours,
            annual_discharging_hours,
            charging_capex_utilisation: ratio(annual_consumed_mwh, max_consumed_mwh),
            discharging_capex_utilisation: ratio(annual_generated_mwh, max_generated_mwh),
            electrolyser_replacements: (lifetime_hours / interval).floor() as u32,
        }
    }
}

fn mean_price<'a>(records: impl Iterator<Item = &'a ResultRecord>) -> f64 {
    let (sum, count) = records.fold((0.0, 0usize), |(sum, n), r| (sum + r.price, n + 1));
    ratio(sum, count as f64)
}

/// Operating hours within one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyOperation {
    pub month: u32,
    pub charging_hours: f64,
    pub discharging_hours: f64,
    pub idle_hours: f64,
}

/// Calendar quarter, starting with January to March as winter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn of_month(month: u32) -> Self {
        match month {
            1..=3 => Season::Winter,
            4..=6 => Season::Spring,
            7..=9 => Season::Summer,
            _ => Season::Fall,
        }
    }
}

/// Mean dispatch at one hour of day within one season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalHour {
    pub season: Season,
    pub hour: u32,
    pub avg_charging_power_mw: f64,
    pub avg_discharging_power_mw: f64,
    /// Share of steps with the charging flag set.
    pub charging_frequency: f64,
    pub discharging_frequency: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct HourTally {
    steps: usize,
    charging_mw: f64,
    discharging_mw: f64,
    charging_steps: usize,
    discharging_steps: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBasedMetrics {
    pub monthly: Vec<MonthlyOperation>,
    /// Only season/hour pairs present in the ledger are listed.
    pub hourly_by_season: Vec<SeasonalHour>,
    /// Steps where charging starts after a non-charging step.
    pub charging_cycles: usize,
    pub discharging_cycles: usize,
}

impl TimeBasedMetrics {
    pub fn calculate(results: &OptimizationResults) -> Self {
        let dt = results.timestep_hours;
        let mut months: BTreeMap<u32, MonthlyOperation> = BTreeMap::new();
        for record in results.ledger() {
            let month = record.time.month();
            let entry = months.entry(month).or_insert(MonthlyOperation {
                month,
                charging_hours: 0.0,
                discharging_hours: 0.0,
                idle_hours: 0.0,
            });
            if record.charging() {
                entry.charging_hours += dt;
            }
            if record.discharging() {
                entry.discharging_hours += dt;
            }
            if record.idle() {
                entry.idle_hours += dt;
            }
        }

        Self {
            monthly: months.into_values().collect(),
            hourly_by_season: hourly_by_season(results.ledger()),
            charging_cycles: starts(results.ledger(), ResultRecord::charging),
            discharging_cycles: starts(results.ledger(), ResultRecord::discharging),
        }
    }

    pub fn total_charging_hours(&self) -> f64 {
        self.monthly.iter().map(|m| m.charging_hours).sum()
    }

    pub fn total_discharging_hours(&self) -> f64 {
        self.monthly.iter().map(|m| m.discharging_hours).sum()
    }
}

fn hourly_by_season(ledger: &[ResultRecord]) -> Vec<SeasonalHour> {
    let mut tallies: BTreeMap<(Season, u32), HourTally> = BTreeMap::new();
    for record in ledger {
        let key = (Season::of_month(record.time.month()), record.time.hour());
        let tally = tallies.entry(key).or_default();
        tally.steps += 1;
        tally.charging_mw += record.charging_power_mw;
        tally.discharging_mw += record.discharging_power_mw;
        tally.charging_steps += usize::from(record.charging());
        tally.discharging_steps += usize::from(record.discharging());
    }

    tallies
        .into_iter()
        .map(|((season, hour), t)| {
            let steps = t.steps as f64;
            SeasonalHour {
                season,
                hour,
                avg_charging_power_mw: ratio(t.charging_mw, steps),
                avg_discharging_power_mw: ratio(t.discharging_mw, steps),
                charging_frequency: ratio(t.charging_steps as f64, steps),
                discharging_frequency: ratio(t.discharging_steps as f64, steps),
            }
        })
        .collect()
}

/// 0 → 1 transitions of a flag, counting an active first step as a start.
fn starts(ledger: &[ResultRecord], active: fn(&ResultRecord) -> bool) -> usize {
    let mut previous = false;
    ledger
        .iter()
        .filter(|record| {
            let now = active(record);
            let started = now && !previous;
            previous = now;
            started
        })
        .count()
}

const UTILISATION_BAND_EDGES: [f64; 5] = [0.2, 0.4, 0.6, 0.8, 1.0];
const UTILISATION_BAND_LABELS: [&str; 5] = ["0-0.2", "0.2-0.4", "0.4-0.6", "0.6-0.8", "0.8-1.0"];

/// Level over capacity within one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyUtilisation {
    pub month: u32,
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
}

/// Time spent with utilisation inside one band. Bands are right-closed; the
/// first also takes an empty tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilisationBand {
    pub label: String,
    pub hours: f64,
    pub percentage_time: f64,
}

/// Inventory relative to the optimal capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageUtilisation {
    pub average: f64,
    pub maximum: f64,
    pub max_level_tonnes: f64,
    pub monthly: Vec<MonthlyUtilisation>,
    pub storage_duration: Vec<UtilisationBand>,
}

impl StorageUtilisation {
    pub fn calculate(results: &OptimizationResults) -> Self {
        let capacity = results.optimal_design.optimal_capacity_tonnes;
        let ledger = results.ledger();
        let dt = results.timestep_hours;
        let utilisation = |r: &ResultRecord| ratio(r.nh3_level_tonnes, capacity);

        let max_level_tonnes = ledger
            .iter()
            .map(|r| r.nh3_level_tonnes)
            .fold(0.0, f64::max);
        let mean_level = ratio(
            ledger.iter().map(|r| r.nh3_level_tonnes).sum(),
            ledger.len() as f64,
        );

        let mut months: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for record in ledger {
            months.entry(record.time.month()).or_default().push(utilisation(record));
        }
        let monthly = months
            .into_iter()
            .map(|(month, values)| MonthlyUtilisation {
                month,
                average: ratio(values.iter().sum(), values.len() as f64),
                maximum: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                minimum: values.iter().copied().fold(f64::INFINITY, f64::min),
            })
            .collect();

        let mut counts = [0usize; UTILISATION_BAND_EDGES.len()];
        for record in ledger {
            let u = utilisation(record);
            if let Some(index) = UTILISATION_BAND_EDGES.iter().position(|&edge| u <= edge) {
                counts[index] += 1;
            }
        }
        let storage_duration = UTILISATION_BAND_LABELS
            .iter()
            .zip(counts)
            .map(|(label, count)| UtilisationBand {
                label: (*label).to_string(),
                hours: count as f64 * dt,
                percentage_time: 100.0 * ratio(count as f64, ledger.len() as f64),
            })
            .collect();

        Self {
            average: ratio(mean_level, capacity),
            maximum: ratio(max_level_tonnes, capacity),
            max_level_tonnes,
            monthly,
            storage_duration,
        }
    }
}

const PRICE_BIN_EDGES: [f64; 7] = [-50.0, -10.0, 0.0, 50.0, 100.0, 150.0, 200.0];
const PRICE_BIN_LABELS: [&str; 8] = [
    "<-50",
    "-50 to -10",
    "-10 to 0",
    "0 to 50",
    "50 to 100",
    "100 to 150",
    "150 to 200",
    ">200",
];

/// How the battery behaves in one price band. Bands are right-closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBinStats {
    pub label: String,
    pub hours: f64,
    pub charging_hours: f64,
    pub discharging_hours: f64,
}

impl PriceBinStats {
    pub fn calculate(results: &OptimizationResults) -> Vec<Self> {
        let dt = results.timestep_hours;
        let mut bins: Vec<Self> = PRICE_BIN_LABELS
            .iter()
            .map(|label| Self {
                label: (*label).to_string(),
                hours: 0.0,
                charging_hours: 0.0,
                discharging_hours: 0.0,
            })
            .collect();

        for record in results.ledger() {
            let index = PRICE_BIN_EDGES
                .iter()
                .position(|&edge| record.price <= edge)
                .unwrap_or(PRICE_BIN_EDGES.len());
            let bin = &mut bins[index];
            bin.hours += dt;
            if record.charging() {
                bin.charging_hours += dt;
            }
            if record.discharging() {
                bin.discharging_hours += dt;
            }
        }
        bins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::A2pTechnology;
    use crate::economics::fixtures::results_from;
    use crate::process_units::CostBasis;
    use approx::assert_relative_eq;

    fn battery() -> AmmoniaBattery {
        AmmoniaBattery::new(
            "ops",
            10.0,
            1_000.0,
            20.0,
            A2pTechnology::DirectCombustion,
            CostBasis::default(),
        )
        .unwrap()
    }

    #[test]
    fn summary_annualises_hours_and_energy() {
        let results = results_from(
            &[(10.0, 0.0, 5.0), (10.0, 0.0, 15.0), (0.0, 20.0, 90.0), (0.0, 0.0, 40.0)],
            100.0,
        );
        let summary =
            OperationalSummary::calculate(&results, &battery(), &EconomicsConfig::default());
        let scale = 8_784.0 / 4.0;
        assert_relative_eq!(summary.annual_charging_hours, 2.0 * scale, epsilon = 1e-9);
        assert_relative_eq!(summary.annual_discharging_hours, 1.0 * scale, epsilon = 1e-9);
        assert_relative_eq!(summary.charging_capex_utilisation, 0.5, epsilon = 1e-9);
        assert_relative_eq!(summary.discharging_capex_utilisation, 0.25, epsilon = 1e-9);
        assert_relative_eq!(summary.average_charging_price, 10.0);
        assert_relative_eq!(summary.average_discharging_price, 90.0);
        // 4392 h/year over 25 years every 80 000 h.
        assert_eq!(summary.electrolyser_replacements, 1);
    }

    #[test]
    fn idle_ledger_has_zero_averages() {
        let results = results_from(&[(0.0, 0.0, 5.0)], 0.0);
        let summary =
            OperationalSummary::calculate(&results, &battery(), &EconomicsConfig::default());
        assert_eq!(summary.average_charging_price, 0.0);
        assert_eq!(summary.electrolyser_replacements, 0);
    }

    #[test]
    fn counts_cycle_starts() {
        let results = results_from(
            &[
                (1.0, 0.0, 1.0),
                (1.0, 0.0, 1.0),
                (0.0, 1.0, 1.0),
                (1.0, 0.0, 1.0),
                (0.0, 0.0, 1.0),
                (0.0, 1.0, 1.0),
            ],
            10.0,
        );
        let metrics = TimeBasedMetrics::calculate(&results);
        assert_eq!(metrics.charging_cycles, 2);
        assert_eq!(metrics.discharging_cycles, 2);
        assert_eq!(metrics.monthly.len(), 1);
        let january = metrics.monthly[0];
        assert_eq!(january.month, 1);
        assert_relative_eq!(january.charging_hours, 3.0);
        assert_relative_eq!(january.discharging_hours, 2.0);
        assert_relative_eq!(january.idle_hours, 1.0);
        assert_relative_eq!(metrics.total_charging_hours(), 3.0);
    }

    #[test]
    fn utilisation_is_zero_without_capacity() {
        let results = results_from(&[(0.0, 0.0, 1.0)], 0.0);
        let utilisation = StorageUtilisation::calculate(&results);
        assert_eq!(utilisation.average, 0.0);
        assert_eq!(utilisation.maximum, 0.0);
        assert_eq!(utilisation.monthly[0].maximum, 0.0);
        assert_relative_eq!(utilisation.storage_duration[0].percentage_time, 100.0);
    }

    #[test]
    fn utilisation_relative_to_capacity() {
        // The fixture holds every level at half the capacity.
        let results = results_from(&[(1.0, 0.0, 1.0), (0.0, 1.0, 1.0)], 80.0);
        let utilisation = StorageUtilisation::calculate(&results);
        assert_relative_eq!(utilisation.average, 0.5);
        assert_relative_eq!(utilisation.maximum, 0.5);
        assert_relative_eq!(utilisation.max_level_tonnes, 40.0);
    }

    #[test]
    fn groups_dispatch_by_season_and_hour() {
        let mut results = results_from(&[(10.0, 0.0, 1.0), (0.0, 4.0, 1.0), (0.0, 0.0, 1.0)], 10.0);
        // Same hour of day on the next day, still in January.
        let mut next_day = results.operational_results[0].clone();
        next_day.time += chrono::Duration::days(1);
        next_day.charging_power_mw = 0.0;
        next_day.is_charging = 0;
        results.operational_results.push(next_day);

        let hourly = TimeBasedMetrics::calculate(&results).hourly_by_season;
        assert_eq!(hourly.len(), 3);
        assert!(hourly.iter().all(|h| h.season == Season::Winter));
        let midnight = hourly[0];
        assert_eq!(midnight.hour, 0);
        assert_relative_eq!(midnight.avg_charging_power_mw, 5.0);
        assert_relative_eq!(midnight.charging_frequency, 0.5);
        assert_relative_eq!(hourly[1].avg_discharging_power_mw, 4.0);
        assert_relative_eq!(hourly[1].discharging_frequency, 1.0);
    }

    #[test]
    fn seasons_follow_calendar_quarters() {
        assert_eq!(Season::of_month(3), Season::Winter);
        assert_eq!(Season::of_month(4), Season::Spring);
        assert_eq!(Season::of_month(9), Season::Summer);
        assert_eq!(Season::of_month(12), Season::Fall);
        assert_eq!(Season::Fall.to_string(), "fall");
    }

    #[test]
    fn monthly_utilisation_and_bands() {
        let mut results = results_from(&[(0.0, 0.0, 1.0); 4], 100.0);
        for (record, level) in results.operational_results.iter_mut().zip([0.0, 10.0, 50.0, 100.0]) {
            record.nh3_level_tonnes = level;
        }
        let utilisation = StorageUtilisation::calculate(&results);

        let january = utilisation.monthly[0];
        assert_eq!(january.month, 1);
        assert_relative_eq!(january.average, 0.4, epsilon = 1e-12);
        assert_relative_eq!(january.maximum, 1.0);
        assert_relative_eq!(january.minimum, 0.0);

        let bands = &utilisation.storage_duration;
        assert_eq!(bands.len(), 5);
        assert_relative_eq!(bands[0].hours, 2.0);
        assert_relative_eq!(bands[0].percentage_time, 50.0);
        assert_relative_eq!(bands[2].hours, 1.0);
        assert_relative_eq!(bands[4].hours, 1.0);
        assert_eq!(bands[4].label, "0.8-1.0");
    }

    #[test]
    fn prices_fall_into_right_closed_bins() {
        let results = results_from(
            &[(1.0, 0.0, -60.0), (1.0, 0.0, 0.0), (0.0, 1.0, 50.0), (0.0, 1.0, 250.0)],
            10.0,
        );
        let bins = PriceBinStats::calculate(&results);
        assert_eq!(bins.len(), 8);
        assert_relative_eq!(bins[0].charging_hours, 1.0);
        assert_relative_eq!(bins[2].charging_hours, 1.0);
        assert_relative_eq!(bins[3].discharging_hours, 1.0);
        assert_relative_eq!(bins[7].hours, 1.0);
        assert_eq!(bins[7].label, ">200");
    }
}
