use tracing::{info, warn};

use super::model::{BoundModel, FormulatedModel, StaticParameters};
use super::preparer::TimeSeriesPreparer;
use super::results::ResultMaterializer;
use super::solver::{GoodLpSolver, MilpSolver, SolveOutcome};
use crate::config::{SolverConfig, SystemConfig};
use crate::domain::{OptimizationResults, TimeSeries};
use crate::error::EngineResult;
use crate::process_units::{AmmoniaBattery, CostBasis};

/// Sizes and dispatches one ammonia battery against a price series.
///
/// prepare → bind → build → solve → materialize. A solve that ends without a
/// usable solution yields `Ok(None)` and no ledger.
pub struct StorageOptimizer<S = GoodLpSolver> {
    params: StaticParameters,
    preparer: TimeSeriesPreparer,
    solver: S,
    battery: Option<AmmoniaBattery>,
}

impl StorageOptimizer<GoodLpSolver> {
    /// Reference battery costed at the storage upper bound.
    pub fn new(system: &SystemConfig, solver: &SolverConfig, basis: CostBasis) -> EngineResult<Self> {
        let battery = AmmoniaBattery::new(
            "reference",
            system.p2a_capacity_mw,
            system.max_storage_capacity_tonnes,
            system.a2p_capacity_mw,
            system.a2p_technology,
            basis,
        )?;
        battery.log_summary();

        let params = StaticParameters::from_battery(
            &battery,
            system.max_storage_capacity_tonnes,
            system.min_charging_threshold,
            system.min_discharging_threshold,
        );
        let mut optimizer = Self::from_parameters(
            params,
            system.time_interval_hours,
            GoodLpSolver::from_config(solver),
        )?;
        optimizer.battery = Some(battery);
        Ok(optimizer)
    }
}

impl<S: MilpSolver> StorageOptimizer<S> {
    pub fn from_parameters(
        params: StaticParameters,
        time_interval_hours: f64,
        solver: S,
    ) -> EngineResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            preparer: TimeSeriesPreparer::new(time_interval_hours)?,
            solver,
            battery: None,
        })
    }

    /// Swap the solver backend, keeping parameters and battery.
    pub fn with_solver<T: MilpSolver>(self, solver: T) -> StorageOptimizer<T> {
        StorageOptimizer {
            params: self.params,
            preparer: self.preparer,
            solver,
            battery: self.battery,
        }
    }

    pub fn battery(&self) -> Option<&AmmoniaBattery> {
        self.battery.as_ref()
    }

    pub fn parameters(&self) -> &StaticParameters {
        &self.params
    }

    pub fn optimize(&self, series: &TimeSeries) -> EngineResult<Option<OptimizationResults>> {
        let prepared = self.preparer.prepare(series)?;
        let bound = BoundModel::bind(self.params, &prepared)?;
        info!(
            timesteps = bound.horizon_len(),
            timestep_hours = bound.timestep_hours,
            "optimizing storage design and dispatch"
        );

        let model = FormulatedModel::build(&bound);
        match self.solver.solve(model) {
            SolveOutcome::Solved { values, .. } => {
                Ok(Some(ResultMaterializer::new(&bound).materialize(&values)))
            }
            SolveOutcome::Failed(status) => {
                warn!(%status, "optimization failed; no results produced");
                Ok(None)
            }
        }
    }
}
