use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Column names of the input series, in file order.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "DATETIME",
    "PRICE",
    "DEMAND",
    "WIND",
    "CURTAILMENT",
    "CARBON_BASED_FUELS",
];

/// One row of the exogenous input series.
///
/// Power values are in MW, price in currency/MWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub demand: f64,
    pub wind: f64,
    pub curtailment: f64,
    pub carbon_based_fuels: f64,
}

impl SeriesPoint {
    fn values(&self) -> [(&'static str, f64); 5] {
        [
            ("PRICE", self.price),
            ("DEMAND", self.demand),
            ("WIND", self.wind),
            ("CURTAILMENT", self.curtailment),
            ("CARBON_BASED_FUELS", self.carbon_based_fuels),
        ]
    }
}

/// Ordered, fixed-interval exogenous series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SeriesPoint>", into = "Vec<SeriesPoint>")]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

impl TryFrom<Vec<SeriesPoint>> for TimeSeries {
    type Error = EngineError;

    fn try_from(points: Vec<SeriesPoint>) -> EngineResult<Self> {
        Self::new(points)
    }
}

impl From<TimeSeries> for Vec<SeriesPoint> {
    fn from(series: TimeSeries) -> Self {
        series.points
    }
}

impl TimeSeries {
    /// Build a series and check ordering, spacing and value sanity.
    pub fn new(points: Vec<SeriesPoint>) -> EngineResult<Self> {
        let series = Self { points };
        series.validate()?;
        Ok(series)
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SeriesPoint> {
        self.points.get(index)
    }

    /// Sampling interval taken from the first two rows.
    pub fn interval(&self) -> Option<Duration> {
        match self.points.as_slice() {
            [first, second, ..] => Some(second.timestamp - first.timestamp),
            _ => None,
        }
    }

    pub fn interval_hours(&self) -> Option<f64> {
        self.interval()
            .map(|d| d.num_seconds() as f64 / 3600.0)
    }

    /// Keep at most the first `len` rows.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            points: self.points.iter().take(len).copied().collect(),
        }
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.price)
    }

    fn validate(&self) -> EngineResult<()> {
        if self.points.is_empty() {
            return Err(EngineError::EmptySeries);
        }

        for point in &self.points {
            for (name, value) in point.values() {
                if !value.is_finite() {
                    return Err(EngineError::invalid(name, format!("non-finite value at {}", point.timestamp)));
                }
            }
            if point.curtailment < 0.0 {
                return Err(EngineError::invalid(
                    "CURTAILMENT",
                    format!("negative value {} at {}", point.curtailment, point.timestamp),
                ));
            }
        }

        let Some(expected) = self.interval() else {
            return Ok(());
        };

        for (row, pair) in self.points.windows(2).enumerate() {
            let step = pair[1].timestamp - pair[0].timestamp;
            if step <= Duration::zero() {
                return Err(EngineError::NonMonotonicTimestamps { row: row + 1 });
            }
            if step != expected {
                return Err(EngineError::IrregularInterval {
                    row: row + 1,
                    expected_minutes: expected.num_minutes(),
                    found_minutes: step.num_minutes(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    pub fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    /// Series with the given prices at `step_minutes` spacing and flat other columns.
    pub fn series_with_prices(prices: &[f64], step_minutes: i64) -> TimeSeries {
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| SeriesPoint {
                timestamp: start() + Duration::minutes(step_minutes * i as i64),
                price,
                demand: 30_000.0,
                wind: 8_000.0,
                curtailment: if i % 2 == 0 { 50.0 } else { 0.0 },
                carbon_based_fuels: 12_000.0,
            })
            .collect();
        TimeSeries::new(points).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn detects_interval_from_first_rows() {
        let series = series_with_prices(&[10.0, 20.0, 30.0], 30);
        assert_eq!(series.interval(), Some(Duration::minutes(30)));
        assert_eq!(series.interval_hours(), Some(0.5));
    }

    #[test]
    fn rejects_empty_series() {
        assert!(matches!(TimeSeries::new(vec![]), Err(EngineError::EmptySeries)));
    }

    #[test]
    fn rejects_non_increasing_timestamps() {
        let mut points = series_with_prices(&[1.0, 2.0, 3.0], 60).points().to_vec();
        points[2].timestamp = points[1].timestamp;
        assert!(matches!(
            TimeSeries::new(points),
            Err(EngineError::NonMonotonicTimestamps { row: 2 })
        ));
    }

    #[test]
    fn rejects_irregular_spacing() {
        let mut points = series_with_prices(&[1.0, 2.0, 3.0], 60).points().to_vec();
        points[2].timestamp += Duration::minutes(30);
        assert!(matches!(
            TimeSeries::new(points),
            Err(EngineError::IrregularInterval { row: 2, .. })
        ));
    }

    #[test]
    fn rejects_negative_curtailment() {
        let mut points = series_with_prices(&[1.0, 2.0], 60).points().to_vec();
        points[0].curtailment = -1.0;
        assert!(TimeSeries::new(points).is_err());
    }

    #[test]
    fn deserialising_runs_the_same_checks() {
        let series = series_with_prices(&[1.0, 2.0, 3.0], 60);
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(serde_json::from_str::<TimeSeries>(&json).unwrap(), series);

        let mut points = series.points().to_vec();
        points.swap(0, 2);
        let shuffled = serde_json::to_string(&points).unwrap();
        assert!(serde_json::from_str::<TimeSeries>(&shuffled).is_err());
    }

    #[test]
    fn single_row_has_no_interval() {
        let series = series_with_prices(&[5.0], 60);
        assert_eq!(series.interval(), None);
        assert_eq!(series.truncated(10).len(), 1);
    }
}
