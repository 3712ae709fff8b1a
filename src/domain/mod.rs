pub mod ledger;
pub mod series;
pub mod technology;

pub use ledger::*;
pub use series::*;
pub use technology::*;
