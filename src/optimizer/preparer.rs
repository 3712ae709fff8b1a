use chrono::{Duration, NaiveDateTime};
use itertools::Itertools;
use std::ops::Range;
use tracing::{debug, warn};

use crate::domain::{SeriesPoint, TimeSeries};
use crate::error::{EngineError, EngineResult};

const INTERVAL_TOLERANCE_HOURS: f64 = 1e-9;

/// A series sampled at the model timestep, with its integer horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSeries {
    series: TimeSeries,
    timestep_hours: f64,
}

impl PreparedSeries {
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn timestep_hours(&self) -> f64 {
        self.timestep_hours
    }

    /// Timestep indices `0..T`; timestamps only label results.
    pub fn horizon(&self) -> Range<usize> {
        0..self.series.len()
    }

    pub fn period_hours(&self) -> f64 {
        self.series.len() as f64 * self.timestep_hours
    }
}

/// Brings raw input to the configured model timestep.
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesPreparer {
    time_interval_hours: f64,
}

impl TimeSeriesPreparer {
    pub fn new(time_interval_hours: f64) -> EngineResult<Self> {
        let seconds = (time_interval_hours * 3_600.0).round();
        if !time_interval_hours.is_finite() || seconds < 1.0 {
            return Err(EngineError::invalid(
                "time_interval_hours",
                format!("must be a positive duration, got {time_interval_hours}"),
            ));
        }
        Ok(Self { time_interval_hours })
    }

    pub fn time_interval_hours(&self) -> f64 {
        self.time_interval_hours
    }

    /// Pass the series through when it already has the target interval,
    /// otherwise average every numeric column over target-sized bins.
    pub fn prepare(&self, series: &TimeSeries) -> EngineResult<PreparedSeries> {
        if series.is_empty() {
            return Err(EngineError::EmptySeries);
        }

        let series = match series.interval_hours() {
            Some(source) if (source - self.time_interval_hours).abs() > INTERVAL_TOLERANCE_HOURS => {
                if source > self.time_interval_hours {
                    return Err(EngineError::Upsampling {
                        source_hours: source,
                        target_hours: self.time_interval_hours,
                    });
                }
                warn!(
                    source_hours = source,
                    target_hours = self.time_interval_hours,
                    "resampling input series"
                );
                self.resample(series)?
            }
            _ => series.clone(),
        };

        debug!(timesteps = series.len(), "prepared horizon");
        Ok(PreparedSeries {
            series,
            timestep_hours: self.time_interval_hours,
        })
    }

    fn bin_start(&self, timestamp: NaiveDateTime) -> NaiveDateTime {
        let width = self.bin_seconds();
        let offset = timestamp.and_utc().timestamp().rem_euclid(width);
        timestamp - Duration::seconds(offset)
    }

    fn bin_seconds(&self) -> i64 {
        (self.time_interval_hours * 3_600.0).round() as i64
    }

    fn resample(&self, series: &TimeSeries) -> EngineResult<TimeSeries> {
        let bins = series.points().iter().chunk_by(|p| self.bin_start(p.timestamp));
        let mut points = Vec::new();
        for (start, group) in &bins {
            points.push(mean_point(start, group));
        }
        TimeSeries::new(points)
    }
}

fn mean_point<'a>(timestamp: NaiveDateTime, group: impl Iterator<Item = &'a SeriesPoint>) -> SeriesPoint {
    let mut sum = SeriesPoint {
        timestamp,
        price: 0.0,
        demand: 0.0,
        wind: 0.0,
        curtailment: 0.0,
        carbon_based_fuels: 0.0,
    };
    let mut count = 0usize;
    for p in group {
        sum.price += p.price;
        sum.demand += p.demand;
        sum.wind += p.wind;
        sum.curtailment += p.curtailment;
        sum.carbon_based_fuels += p.carbon_based_fuels;
        count += 1;
    }
    let n = count.max(1) as f64;
    SeriesPoint {
        timestamp,
        price: sum.price / n,
        demand: sum.demand / n,
        wind: sum.wind / n,
        curtailment: sum.curtailment / n,
        carbon_based_fuels: sum.carbon_based_fuels / n,
    }
}
