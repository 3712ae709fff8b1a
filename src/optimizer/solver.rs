//! Solver adapter.
//!
//! Hands a [`FormulatedModel`] to a good_lp backend and reports how the search
//! terminated. Only `Optimal`/`Feasible` carry variable values; every other
//! outcome is terminal for the invocation.

use good_lp::{Expression, ResolutionError, SolverModel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::model::{FormulatedModel, ModelVariables, SolvedValues};
use crate::config::SolverConfig;

/// Termination status of one MILP solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Proven optimal, or gap-free backend.
    Optimal,
    /// Solved within a non-zero relative gap. The backend may have reached
    /// the optimum, but optimality is not certified to the caller.
    Feasible,
    Infeasible,
    Unbounded,
    Error(String),
}

impl SolveStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }

    /// Success status of a gap-aware backend that stopped at `mipgap`.
    pub fn within_gap(mipgap: f64) -> Self {
        if mipgap > 0.0 {
            SolveStatus::Feasible
        } else {
            SolveStatus::Optimal
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Feasible => write!(f, "feasible"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::Unbounded => write!(f, "unbounded"),
            SolveStatus::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

impl From<ResolutionError> for SolveStatus {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => SolveStatus::Infeasible,
            ResolutionError::Unbounded => SolveStatus::Unbounded,
            other => SolveStatus::Error(other.to_string()),
        }
    }
}

/// Result of a solve: values on success, the failing status otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Solved {
        status: SolveStatus,
        values: SolvedValues,
    },
    Failed(SolveStatus),
}

impl SolveOutcome {
    pub fn status(&self) -> &SolveStatus {
        match self {
            SolveOutcome::Solved { status, .. } => status,
            SolveOutcome::Failed(status) => status,
        }
    }

    /// Values of a successful solve; `None` for any failure.
    pub fn into_values(self) -> Option<SolvedValues> {
        match self {
            SolveOutcome::Solved { values, .. } => Some(values),
            SolveOutcome::Failed(_) => None,
        }
    }
}

/// Seam between the engine and the MILP backend.
#[cfg_attr(test, mockall::automock)]
pub trait MilpSolver {
    fn solve(&self, model: FormulatedModel) -> SolveOutcome;
}

/// good_lp-backed solver. `microlp` unless a native backend feature is enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodLpSolver {
    mipgap: f64,
    log_output: bool,
}

impl Default for GoodLpSolver {
    fn default() -> Self {
        Self::from_config(&SolverConfig::default())
    }
}

impl GoodLpSolver {
    pub fn new(mipgap: f64, log_output: bool) -> Self {
        Self { mipgap, log_output }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new(config.mipgap, config.log_output)
    }

    pub fn mipgap(&self) -> f64 {
        self.mipgap
    }

    pub fn backend_name() -> &'static str {
        if cfg!(feature = "solver-highs") {
            "highs"
        } else if cfg!(feature = "solver-cbc") {
            "cbc"
        } else {
            "microlp"
        }
    }

    #[cfg(feature = "solver-highs")]
    fn dispatch(&self, model: FormulatedModel) -> SolveOutcome {
        use good_lp::solvers::WithMipGap;

        let FormulatedModel {
            problem,
            objective,
            constraints,
            variables,
        } = model;
        let backend = problem
            .maximise(objective.clone())
            .using(good_lp::highs)
            .set_verbose(self.log_output);
        match backend.with_mip_gap(self.mipgap as f32) {
            Ok(backend) => {
                let success = SolveStatus::within_gap(self.mipgap);
                run(backend, constraints, &variables, objective, success)
            }
            Err(msg) => SolveOutcome::Failed(SolveStatus::Error(msg)),
        }
    }

    #[cfg(all(feature = "solver-cbc", not(feature = "solver-highs")))]
    fn dispatch(&self, model: FormulatedModel) -> SolveOutcome {
        use good_lp::solvers::WithMipGap;

        let FormulatedModel {
            problem,
            objective,
            constraints,
            variables,
        } = model;
        let mut backend = problem.maximise(objective.clone()).using(good_lp::coin_cbc);
        if !self.log_output {
            backend.set_parameter("log", "0");
        }
        match backend.with_mip_gap(self.mipgap as f32) {
            Ok(backend) => {
                let success = SolveStatus::within_gap(self.mipgap);
                run(backend, constraints, &variables, objective, success)
            }
            Err(msg) => SolveOutcome::Failed(SolveStatus::Error(msg)),
        }
    }

    #[cfg(not(any(feature = "solver-highs", feature = "solver-cbc")))]
    fn dispatch(&self, model: FormulatedModel) -> SolveOutcome {
        if self.mipgap > 0.0 {
            debug!(
                mipgap = self.mipgap,
                "microlp solves to optimality; relative gap not applied"
            );
        }
        let FormulatedModel {
            problem,
            objective,
            constraints,
            variables,
        } = model;
        let backend = problem.maximise(objective.clone()).using(good_lp::microlp);
        run(backend, constraints, &variables, objective, SolveStatus::Optimal)
    }
}

impl MilpSolver for GoodLpSolver {
    fn solve(&self, model: FormulatedModel) -> SolveOutcome {
        let timesteps = model.variables.level.len();
        let started = Instant::now();
        info!(
            backend = Self::backend_name(),
            timesteps,
            constraints = model.constraints.len(),
            mipgap = self.mipgap,
            "solving storage model"
        );

        let outcome = self.dispatch(model);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome.status() {
            status if status.is_success() => {
                info!(%status, elapsed_ms, "solver finished");
            }
            status => {
                warn!(%status, elapsed_ms, "solver did not reach a usable solution");
            }
        }
        outcome
    }
}

fn run<M>(
    backend: M,
    constraints: Vec<good_lp::Constraint>,
    variables: &ModelVariables,
    objective: Expression,
    success: SolveStatus,
) -> SolveOutcome
where
    M: SolverModel<Error = ResolutionError>,
{
    let backend = constraints.into_iter().fold(backend, |m, c| m.with(c));
    match backend.solve() {
        Ok(solution) => SolveOutcome::Solved {
            status: success,
            values: variables.read(&solution, objective),
        },
        Err(err) => SolveOutcome::Failed(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::model::fixtures::bound;
    use approx::assert_relative_eq;

    #[test]
    fn resolution_errors_map_to_status() {
        assert_eq!(SolveStatus::from(ResolutionError::Infeasible), SolveStatus::Infeasible);
        assert_eq!(SolveStatus::from(ResolutionError::Unbounded), SolveStatus::Unbounded);
        assert!(matches!(
            SolveStatus::from(ResolutionError::Str("boom".into())),
            SolveStatus::Error(_)
        ));
    }

    #[test]
    fn only_optimal_and_feasible_succeed() {
        assert!(SolveStatus::Optimal.is_success());
        assert!(SolveStatus::Feasible.is_success());
        assert!(!SolveStatus::Infeasible.is_success());
        assert!(!SolveStatus::Error("x".into()).is_success());
    }

    #[test]
    fn gap_tolerance_downgrades_to_feasible() {
        assert_eq!(SolveStatus::within_gap(0.0), SolveStatus::Optimal);
        assert_eq!(SolveStatus::within_gap(0.01), SolveStatus::Feasible);
    }

    #[test]
    fn failed_outcome_has_no_values() {
        assert!(SolveOutcome::Failed(SolveStatus::Infeasible).into_values().is_none());
    }

    #[test]
    fn solves_a_two_step_arbitrage() {
        let model = FormulatedModel::build(&bound(&[0.0, 100.0]));
        let outcome = GoodLpSolver::default().solve(model);
        assert!(outcome.status().is_success());
        let values = outcome.into_values().unwrap();
        assert_relative_eq!(values.charging[0], 10.0, epsilon = 1e-6);
        assert_relative_eq!(values.discharging[1], 10.0, epsilon = 1e-6);
        assert_relative_eq!(values.level[1], values.initial_level, epsilon = 1e-6);
    }

    #[test]
    fn objective_is_evaluated_by_the_backend() {
        let mut model = FormulatedModel::build(&bound(&[0.0, 100.0]));
        // A constant offset leaves the argmax alone but shows up in the value.
        model.objective = model.objective + 12_345.0;
        let values = GoodLpSolver::default().solve(model).into_values().unwrap();
        assert_relative_eq!(values.objective, 13_345.0, epsilon = 1e-6);
    }
}
