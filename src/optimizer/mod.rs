pub mod engine;
pub mod model;
pub mod preparer;
pub mod results;
pub mod solver;

pub use engine::StorageOptimizer;
pub use model::{BoundModel, FormulatedModel, ModelVariables, SolvedValues, StaticParameters};
pub use preparer::{PreparedSeries, TimeSeriesPreparer};
pub use results::{replay_inventory, ResultMaterializer};
pub use solver::{GoodLpSolver, MilpSolver, SolveOutcome, SolveStatus};
