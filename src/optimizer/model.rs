//! Storage sizing and dispatch MILP.
//!
//! Decision variables:
//! - `capacity`: storage capacity (t), bounded by `max_storage_capacity_tonnes`
//! - `initial_level`: inventory at the start and, by cyclic closure, the end (t)
//! - `charging[t]`, `discharging[t]`: P2A / A2P power (MW)
//! - `level[t]`: NH3 inventory after timestep `t` (t)
//! - `is_charging[t]`, `is_discharging[t]`: binary activity flags
//!
//! The objective is the operating margin only; capital costs are settled
//! after the solve.

use good_lp::{
    constraint, variable, Constraint, Expression, ProblemVariables, Solution, Variable,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::PreparedSeries;
use crate::domain::TimeSeries;
use crate::error::{EngineError, EngineResult};
use crate::process_units::{AmmoniaBattery, LHV_NH3_MJ_PER_KG};

/// Horizons beyond this many binary pairs are slow for general MILP solvers.
const LARGE_HORIZON_TIMESTEPS: usize = 20_000;

/// Fixed physical scalars supplied by the parameter source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticParameters {
    pub max_charging_power_mw: f64,
    pub max_discharging_power_mw: f64,
    pub charging_efficiency: f64,
    pub discharging_efficiency: f64,
    /// Minimum charging power as a fraction of the maximum while charging.
    pub min_charging_threshold: f64,
    pub min_discharging_threshold: f64,
    pub lhv_mj_per_kg: f64,
    pub max_storage_capacity_tonnes: f64,
}

impl StaticParameters {
    pub fn from_battery(
        battery: &AmmoniaBattery,
        max_storage_capacity_tonnes: f64,
        min_charging_threshold: f64,
        min_discharging_threshold: f64,
    ) -> Self {
        Self {
            max_charging_power_mw: battery.p2a.capacity_mw,
            max_discharging_power_mw: battery.a2p.capacity_mw,
            charging_efficiency: battery.charging_efficiency(),
            discharging_efficiency: battery.discharging_efficiency(),
            min_charging_threshold,
            min_discharging_threshold,
            lhv_mj_per_kg: LHV_NH3_MJ_PER_KG,
            max_storage_capacity_tonnes,
        }
    }

    /// Tonnes of NH3 per MWh of chemical energy.
    pub fn conversion_factor(&self) -> f64 {
        3_600.0 / (self.lhv_mj_per_kg * 1_000.0)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let efficiency_ok = |e: f64| e > 0.0 && e <= 1.0;
        if !efficiency_ok(self.charging_efficiency) {
            return Err(EngineError::invalid(
                "charging_efficiency",
                format!("must be in (0, 1], got {}", self.charging_efficiency),
            ));
        }
        if !efficiency_ok(self.discharging_efficiency) {
            return Err(EngineError::invalid(
                "discharging_efficiency",
                format!("must be in (0, 1], got {}", self.discharging_efficiency),
            ));
        }
        if !(self.max_charging_power_mw > 0.0) {
            return Err(EngineError::invalid(
                "max_charging_power_mw",
                format!("must be positive, got {}", self.max_charging_power_mw),
            ));
        }
        if !(self.max_discharging_power_mw > 0.0) {
            return Err(EngineError::invalid(
                "max_discharging_power_mw",
                format!("must be positive, got {}", self.max_discharging_power_mw),
            ));
        }
        for (name, value) in [
            ("min_charging_threshold", self.min_charging_threshold),
            ("min_discharging_threshold", self.min_discharging_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::invalid(name, format!("must be in [0, 1], got {value}")));
            }
        }
        if !(self.lhv_mj_per_kg > 0.0) {
            return Err(EngineError::invalid(
                "lhv_mj_per_kg",
                format!("must be positive, got {}", self.lhv_mj_per_kg),
            ));
        }
        if !(self.max_storage_capacity_tonnes >= 0.0) {
            return Err(EngineError::invalid(
                "max_storage_capacity_tonnes",
                format!("must be non-negative, got {}", self.max_storage_capacity_tonnes),
            ));
        }
        Ok(())
    }
}

/// Prepared series merged with every scalar the formulation reads.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundModel {
    pub params: StaticParameters,
    pub series: TimeSeries,
    pub timestep_hours: f64,
    pub conversion_factor: f64,
}

impl BoundModel {
    /// Data binder: fails on invalid scalars or an empty horizon.
    pub fn bind(params: StaticParameters, prepared: &PreparedSeries) -> EngineResult<Self> {
        params.validate()?;
        if prepared.series().is_empty() {
            return Err(EngineError::EmptySeries);
        }
        Ok(Self {
            params,
            series: prepared.series().clone(),
            timestep_hours: prepared.timestep_hours(),
            conversion_factor: params.conversion_factor(),
        })
    }

    pub fn horizon_len(&self) -> usize {
        self.series.len()
    }

    pub fn period_hours(&self) -> f64 {
        self.horizon_len() as f64 * self.timestep_hours
    }

    /// Tonnes added to storage by charging at `power_mw` for one timestep.
    pub fn charge_in(&self, power_mw: f64) -> f64 {
        power_mw * self.params.charging_efficiency * self.timestep_hours * self.conversion_factor
    }

    /// Tonnes drawn from storage by discharging at `power_mw` for one timestep.
    pub fn discharge_out(&self, power_mw: f64) -> f64 {
        power_mw * (1.0 / self.params.discharging_efficiency)
            * self.timestep_hours
            * self.conversion_factor
    }
}

/// Handles to the solver variables of one formulation.
#[derive(Debug, Clone)]
pub struct ModelVariables {
    pub capacity: Variable,
    pub initial_level: Variable,
    pub charging: Vec<Variable>,
    pub discharging: Vec<Variable>,
    pub level: Vec<Variable>,
    pub is_charging: Vec<Variable>,
    pub is_discharging: Vec<Variable>,
}

impl ModelVariables {
    /// Copies variable values and evaluates `objective` on the solution.
    pub fn read<S: Solution>(&self, solution: &S, objective: Expression) -> SolvedValues {
        let values =
            |vars: &[Variable]| -> Vec<f64> { vars.iter().map(|&v| solution.value(v)).collect() };
        SolvedValues {
            objective: solution.eval(objective),
            capacity: solution.value(self.capacity),
            initial_level: solution.value(self.initial_level),
            charging: values(&self.charging),
            discharging: values(&self.discharging),
            level: values(&self.level),
            is_charging: values(&self.is_charging),
            is_discharging: values(&self.is_discharging),
        }
    }
}

/// Plain variable values copied out of a solver solution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolvedValues {
    /// Objective expression evaluated by the backend's solution.
    pub objective: f64,
    pub capacity: f64,
    pub initial_level: f64,
    pub charging: Vec<f64>,
    pub discharging: Vec<f64>,
    pub level: Vec<f64>,
    pub is_charging: Vec<f64>,
    pub is_discharging: Vec<f64>,
}

/// A concrete MILP ready to hand to a solver.
pub struct FormulatedModel {
    pub problem: ProblemVariables,
    pub objective: Expression,
    pub constraints: Vec<Constraint>,
    pub variables: ModelVariables,
}

impl std::fmt::Debug for FormulatedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulatedModel")
            .field("timesteps", &self.variables.level.len())
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

impl FormulatedModel {
    /// Model builder. Constraints are emitted in horizon order, threading the
    /// previous inventory expression through the mass balance.
    pub fn build(bound: &BoundModel) -> Self {
        let n = bound.horizon_len();
        let p = &bound.params;
        if n > LARGE_HORIZON_TIMESTEPS {
            warn!(
                timesteps = n,
                "large horizon with binary flags; solve time may be long"
            );
        }

        let mut problem = ProblemVariables::new();
        let capacity = problem.add(variable().min(0.0).max(p.max_storage_capacity_tonnes));
        let initial_level = problem.add(variable().min(0.0));
        let charging = problem.add_vector(variable().min(0.0).max(p.max_charging_power_mw), n);
        let discharging =
            problem.add_vector(variable().min(0.0).max(p.max_discharging_power_mw), n);
        let level = problem.add_vector(variable().min(0.0), n);
        let is_charging = problem.add_vector(variable().binary(), n);
        let is_discharging = problem.add_vector(variable().binary(), n);

        let dt = bound.timestep_hours;
        let objective = bound
            .series
            .points()
            .iter()
            .enumerate()
            .map(|(t, point)| point.price * dt * (discharging[t] - charging[t]))
            .sum::<Expression>();

        let charge_coefficient = bound.charge_in(1.0);
        let discharge_coefficient = bound.discharge_out(1.0);
        let min_charge = p.min_charging_threshold * p.max_charging_power_mw;
        let min_discharge = p.min_discharging_threshold * p.max_discharging_power_mw;

        let mut constraints = Vec::with_capacity(7 * n + 2);
        constraints.push(constraint!(initial_level <= capacity));

        let mut previous: Expression = initial_level.into();
        for t in 0..n {
            constraints.push(constraint!(level[t] <= capacity));

            let inflow = charging[t] * charge_coefficient;
            let outflow = discharging[t] * discharge_coefficient;
            constraints.push(constraint!(level[t] == previous + inflow - outflow));
            previous = level[t].into();

            constraints.push(constraint!(charging[t] >= is_charging[t] * min_charge));
            constraints.push(constraint!(
                charging[t] <= is_charging[t] * p.max_charging_power_mw
            ));
            constraints.push(constraint!(discharging[t] >= is_discharging[t] * min_discharge));
            constraints.push(constraint!(
                discharging[t] <= is_discharging[t] * p.max_discharging_power_mw
            ));
            constraints.push(constraint!(is_charging[t] + is_discharging[t] <= 1.0));
        }

        if let Some(&last) = level.last() {
            constraints.push(constraint!(last == initial_level));
        }

        debug!(
            timesteps = n,
            constraints = constraints.len(),
            "formulated storage model"
        );

        Self {
            problem,
            objective,
            constraints,
            variables: ModelVariables {
                capacity,
                initial_level,
                charging,
                discharging,
                level,
                is_charging,
                is_discharging,
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::domain::series::fixtures::series_with_prices;
    use crate::optimizer::TimeSeriesPreparer;
    use approx::assert_relative_eq;

    #[test]
    fn conversion_factor_from_heating_value() {
        assert_relative_eq!(unit_params().conversion_factor(), 3_600.0 / 18_600.0);
    }

    #[test]
    fn efficiency_multiplies_on_charge_and_divides_on_discharge() {
        let mut params = unit_params();
        params.charging_efficiency = 0.5;
        params.discharging_efficiency = 0.5;
        let prepared = TimeSeriesPreparer::new(1.0)
            .unwrap()
            .prepare(&series_with_prices(&[1.0, 2.0], 60))
            .unwrap();
        let bound = BoundModel::bind(params, &prepared).unwrap();
        let cf = params.conversion_factor();
        assert_relative_eq!(bound.charge_in(10.0), 10.0 * 0.5 * cf);
        assert_relative_eq!(bound.discharge_out(10.0), 10.0 / 0.5 * cf);
    }

    #[test]
    fn binder_rejects_invalid_efficiency() {
        let mut params = unit_params();
        params.discharging_efficiency = 0.0;
        let prepared = TimeSeriesPreparer::new(1.0)
            .unwrap()
            .prepare(&series_with_prices(&[1.0], 60))
            .unwrap();
        assert!(matches!(
            BoundModel::bind(params, &prepared),
            Err(EngineError::InvalidParameter { name: "discharging_efficiency", .. })
        ));
    }

    #[test]
    fn builder_emits_every_constraint_family() {
        let model = FormulatedModel::build(&bound(&[10.0, 20.0, 30.0]));
        // 1 initial-level bound, 7 per timestep, 1 cyclic closure.
        assert_eq!(model.constraints.len(), 1 + 7 * 3 + 1);
        assert_eq!(model.variables.level.len(), 3);
        assert_eq!(model.variables.is_discharging.len(), 3);
    }

    #[test]
    fn period_hours_follow_timestep() {
        assert_relative_eq!(bound(&[1.0, 2.0, 3.0, 4.0]).period_hours(), 4.0);
    }
}
