use crate::error::{EngineError, EngineResult};

/// Chemical Engineering Plant Cost Index, annual averages.
const CEPCI: [(i32, f64); 24] = [
    (2001, 394.3),
    (2002, 395.6),
    (2003, 402.0),
    (2004, 444.2),
    (2005, 468.2),
    (2006, 499.6),
    (2007, 525.4),
    (2008, 575.4),
    (2009, 521.9),
    (2010, 550.8),
    (2011, 585.7),
    (2012, 584.6),
    (2013, 567.3),
    (2014, 576.1),
    (2015, 556.8),
    (2016, 541.7),
    (2017, 567.5),
    (2018, 603.1),
    (2019, 607.5),
    (2020, 596.2),
    (2021, 708.8),
    (2022, 816.0),
    (2023, 797.9),
    (2024, 799.1),
];

pub fn cepci_index(year: i32) -> EngineResult<f64> {
    CEPCI
        .iter()
        .find(|(y, _)| *y == year)
        .map(|(_, index)| *index)
        .ok_or(EngineError::UnsupportedCostYear(year))
}

/// Scale a cost from `base_year` to `target_year` by the index ratio.
pub fn adjust_cost(base_cost: f64, base_year: i32, target_year: i32) -> EngineResult<f64> {
    let base = cepci_index(base_year)?;
    let target = cepci_index(target_year)?;
    Ok(base_cost * target / base)
}
