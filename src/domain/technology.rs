use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{EngineError, EngineResult};

/// Ammonia-to-power conversion route.
///
/// Each variant carries its own conversion efficiency, cracking share and
/// electrolyser stack replacement interval; the cost model in
/// [`crate::process_units::equipment::PowerBlock`] dispatches on it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum A2pTechnology {
    /// Ammonia burnt directly in a gas turbine.
    DirectCombustion,
    /// Partially cracked ammonia co-fired with the produced hydrogen.
    BlendCombustion,
    /// All ammonia cracked, hydrogen burnt.
    H2Combustion,
}

impl A2pTechnology {
    /// Parse a configuration name, failing with a descriptive error.
    pub fn from_name(name: &str) -> EngineResult<Self> {
        Self::from_str(name).map_err(|_| EngineError::UnsupportedTechnology(name.to_string()))
    }

    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Electrical efficiency of the power block (LHV basis).
    pub fn efficiency(self) -> f64 {
        match self {
            Self::DirectCombustion => 0.60,
            Self::BlendCombustion => 0.574,
            Self::H2Combustion => 0.525,
        }
    }

    /// Fraction of the ammonia feed routed through the cracker.
    pub fn cracked_fraction(self) -> f64 {
        match self {
            Self::DirectCombustion => 0.0,
            Self::BlendCombustion => 0.224,
            Self::H2Combustion => 1.0,
        }
    }

    /// Operating hours between electrolyser stack replacements.
    pub fn stack_replacement_hours(self) -> f64 {
        match self {
            Self::H2Combustion => 60_000.0,
            Self::DirectCombustion | Self::BlendCombustion => 80_000.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::DirectCombustion => "Direct NH3 Combustion",
            Self::BlendCombustion => "Blend Combustion",
            Self::H2Combustion => "H2 Combustion",
        }
    }
}
