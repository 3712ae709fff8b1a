use serde::{Deserialize, Serialize};
use std::fmt;

use super::ratio;
use crate::domain::{OptimizationResults, ResultRecord};

/// How the battery behaves while wind is being curtailed.
///
/// A step counts as curtailed when `Curtailment > 0`. Battery state is read
/// from the dispatched power rather than the flags. Percentages are 0–100,
/// ratios 0–1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CurtailmentInteraction {
    pub total_hours: f64,
    pub curtailment_hours: f64,
    pub charging_during_curtailment_hours: f64,
    pub discharging_during_curtailment_hours: f64,
    pub idle_during_curtailment_hours: f64,
    pub pct_curtailment_periods_charging: f64,
    pub pct_curtailment_periods_discharging: f64,
    pub pct_curtailment_periods_idle: f64,

    pub total_curtailment_energy_mwh: f64,
    pub curtailment_during_charging_mwh: f64,
    pub curtailment_during_discharging_mwh: f64,
    pub curtailment_during_idle_mwh: f64,
    pub pct_curtailment_energy_during_charging: f64,
    pub pct_curtailment_energy_during_discharging: f64,

    pub battery_charging_energy_during_curtailment_mwh: f64,
    pub battery_discharging_energy_during_curtailment_mwh: f64,
    /// Battery charging energy over the curtailed energy it overlapped with.
    pub curtailment_capture_efficiency_pct: f64,
    pub curtailment_capture_ratio: f64,
    pub excess_energy_contribution_ratio: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    periods: usize,
    curtailment_mwh: f64,
    battery_mwh: f64,
}

impl Tally {
    fn add(&mut self, curtailment_mwh: f64, battery_mwh: f64) {
        self.periods += 1;
        self.curtailment_mwh += curtailment_mwh;
        self.battery_mwh += battery_mwh;
    }
}

impl CurtailmentInteraction {
    pub fn calculate(results: &OptimizationResults) -> Self {
        let dt = results.timestep_hours;
        let ledger = results.ledger();

        let mut curtailed = Tally::default();
        let mut charging = Tally::default();
        let mut discharging = Tally::default();
        let mut idle = Tally::default();

        for record in ledger.iter().filter(|r| r.curtailment > 0.0) {
            let curtailment_mwh = record.curtailment * dt;
            curtailed.add(curtailment_mwh, 0.0);
            match state(record) {
                BatteryState::Charging => charging.add(curtailment_mwh, record.charging_power_mw * dt),
                BatteryState::Discharging => {
                    discharging.add(curtailment_mwh, record.discharging_power_mw * dt)
                }
                BatteryState::Idle => idle.add(curtailment_mwh, 0.0),
                BatteryState::Both => {
                    charging.add(curtailment_mwh, record.charging_power_mw * dt);
                    discharging.add(curtailment_mwh, record.discharging_power_mw * dt);
                }
            }
        }

        let hours = |t: &Tally| t.periods as f64 * dt;
        let periods = curtailed.periods as f64;
        let total_energy = curtailed.curtailment_mwh;

        Self {
            total_hours: ledger.len() as f64 * dt,
            curtailment_hours: hours(&curtailed),
            charging_during_curtailment_hours: hours(&charging),
            discharging_during_curtailment_hours: hours(&discharging),
            idle_during_curtailment_hours: hours(&idle),
            pct_curtailment_periods_charging: 100.0 * ratio(charging.periods as f64, periods),
            pct_curtailment_periods_discharging: 100.0 * ratio(discharging.periods as f64, periods),
            pct_curtailment_periods_idle: 100.0 * ratio(idle.periods as f64, periods),

            total_curtailment_energy_mwh: total_energy,
            curtailment_during_charging_mwh: charging.curtailment_mwh,
            curtailment_during_discharging_mwh: discharging.curtailment_mwh,
            curtailment_during_idle_mwh: idle.curtailment_mwh,
            pct_curtailment_energy_during_charging: 100.0
                * ratio(charging.curtailment_mwh, total_energy),
            pct_curtailment_energy_during_discharging: 100.0
                * ratio(discharging.curtailment_mwh, total_energy),

            battery_charging_energy_during_curtailment_mwh: charging.battery_mwh,
            battery_discharging_energy_during_curtailment_mwh: discharging.battery_mwh,
            curtailment_capture_efficiency_pct: 100.0
                * ratio(charging.battery_mwh, charging.curtailment_mwh),
            curtailment_capture_ratio: ratio(charging.battery_mwh, total_energy),
            excess_energy_contribution_ratio: ratio(discharging.battery_mwh, total_energy),
        }
    }
}

/// How much curtailed energy the battery absorbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureLevel {
    High,
    Moderate,
    Low,
}

/// How often the battery adds generation on top of curtailed wind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcessGeneration {
    Significant,
    Moderate,
    Minimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurtailmentInterpretation {
    pub capture: CaptureLevel,
    pub excess: ExcessGeneration,
}

impl CurtailmentInterpretation {
    /// Capture above 10 % is high and above 5 % moderate; excess above 5 % is
    /// significant and above 1 % moderate. Bounds are exclusive.
    pub fn from_ratios(capture_ratio: f64, excess_ratio: f64) -> Self {
        let capture_pct = capture_ratio * 100.0;
        let excess_pct = excess_ratio * 100.0;
        let capture = if capture_pct > 10.0 {
            CaptureLevel::High
        } else if capture_pct > 5.0 {
            CaptureLevel::Moderate
        } else {
            CaptureLevel::Low
        };
        let excess = if excess_pct > 5.0 {
            ExcessGeneration::Significant
        } else if excess_pct > 1.0 {
            ExcessGeneration::Moderate
        } else {
            ExcessGeneration::Minimal
        };
        Self { capture, excess }
    }
}

impl fmt::Display for CaptureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureLevel::High => write!(
                f,
                "HIGH CURTAILMENT CAPTURE: The battery effectively captures significant curtailed energy."
            ),
            CaptureLevel::Moderate => write!(
                f,
                "MODERATE CURTAILMENT CAPTURE: The battery captures some curtailed energy."
            ),
            CaptureLevel::Low => write!(
                f,
                "LOW CURTAILMENT CAPTURE: The battery captures minimal curtailed energy."
            ),
        }
    }
}

impl fmt::Display for ExcessGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExcessGeneration::Significant => write!(
                f,
                "SIGNIFICANT EXCESS ENERGY GENERATION: The battery discharges frequently during curtailment periods."
            ),
            ExcessGeneration::Moderate => write!(
                f,
                "MODERATE EXCESS ENERGY GENERATION: Some battery discharging occurs during curtailment."
            ),
            ExcessGeneration::Minimal => write!(
                f,
                "MINIMAL EXCESS ENERGY GENERATION: The battery rarely discharges during curtailment."
            ),
        }
    }
}

impl CurtailmentInteraction {
    pub fn interpretation(&self) -> CurtailmentInterpretation {
        CurtailmentInterpretation::from_ratios(
            self.curtailment_capture_ratio,
            self.excess_energy_contribution_ratio,
        )
    }
}

/// Plain-text curtailment section for the scenario summary.
impl fmt::Display for CurtailmentInteraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let curtailment_pct = 100.0 * ratio(self.curtailment_hours, self.total_hours);
        let interpretation = self.interpretation();

        writeln!(f, "CURTAILMENT INTERACTION ANALYSIS")?;
        writeln!(f, "{}", "-".repeat(50))?;
        writeln!(f)?;
        writeln!(f, "TIME-BASED ANALYSIS:")?;
        writeln!(f, "  Total simulation period:           {:.0} hours", self.total_hours)?;
        writeln!(
            f,
            "  Hours with curtailment:            {:.0} hours ({curtailment_pct:.1}% of total time)",
            self.curtailment_hours
        )?;
        writeln!(f, "  Battery behaviour during curtailment periods:")?;
        writeln!(
            f,
            "  - Charging:                        {:.0} hours ({:.1}% of curtailment periods)",
            self.charging_during_curtailment_hours, self.pct_curtailment_periods_charging
        )?;
        writeln!(
            f,
            "  - Discharging:                     {:.0} hours ({:.1}% of curtailment periods)",
            self.discharging_during_curtailment_hours, self.pct_curtailment_periods_discharging
        )?;
        writeln!(
            f,
            "  - Idle:                            {:.0} hours ({:.1}% of curtailment periods)",
            self.idle_during_curtailment_hours, self.pct_curtailment_periods_idle
        )?;
        writeln!(f)?;
        writeln!(f, "ENERGY-BASED ANALYSIS:")?;
        writeln!(f, "  Total curtailed energy:            {:.0} MWh", self.total_curtailment_energy_mwh)?;
        writeln!(
            f,
            "  - During battery charging:         {:.0} MWh ({:.1}% of total curtailment)",
            self.curtailment_during_charging_mwh, self.pct_curtailment_energy_during_charging
        )?;
        writeln!(
            f,
            "  - During battery discharging:      {:.0} MWh ({:.1}% of total curtailment)",
            self.curtailment_during_discharging_mwh, self.pct_curtailment_energy_during_discharging
        )?;
        writeln!(f, "  - During battery idle:             {:.0} MWh", self.curtailment_during_idle_mwh)?;
        writeln!(f)?;
        writeln!(f, "CURTAILMENT CAPTURE ANALYSIS:")?;
        writeln!(
            f,
            "  Battery charging during curtailment: {:.0} MWh",
            self.battery_charging_energy_during_curtailment_mwh
        )?;
        writeln!(
            f,
            "  Curtailment capture efficiency:    {:.1}%",
            self.curtailment_capture_efficiency_pct
        )?;
        writeln!(
            f,
            "  Overall curtailment capture ratio: {:.1}%",
            self.curtailment_capture_ratio * 100.0
        )?;
        writeln!(
            f,
            "  Battery discharging during curtailment: {:.0} MWh",
            self.battery_discharging_energy_during_curtailment_mwh
        )?;
        writeln!(
            f,
            "  Additional excess energy created:  {:.1}% of total curtailment",
            self.excess_energy_contribution_ratio * 100.0
        )?;
        writeln!(f)?;
        writeln!(f, "INTERPRETATION:")?;
        writeln!(f, "{}", interpretation.capture)?;
        writeln!(f, "{}", interpretation.excess)
    }
}

enum BatteryState {
    Charging,
    Discharging,
    Idle,
    /// Only reachable with hand-built ledgers; exclusivity rules it out after a solve.
    Both,
}

fn state(record: &ResultRecord) -> BatteryState {
    match (record.charging_power_mw > 0.0, record.discharging_power_mw > 0.0) {
        (true, false) => BatteryState::Charging,
        (false, true) => BatteryState::Discharging,
        (false, false) => BatteryState::Idle,
        (true, true) => BatteryState::Both,
    }
}
