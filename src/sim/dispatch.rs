//! Hourly battery dispatch decisions.

use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::battery::BatteryState;
use super::calendar::{TimeWindow, any_contains, find_overlap};
use super::types::{TouPeriod, TouSlot};

/// Battery operating strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Charge from any solar surplus, discharge into any deficit.
    #[default]
    SelfConsumption,
    /// Charge inside charge windows, discharge inside discharge windows.
    TouArbitrage,
    /// Discharge in peak hours, recharge from surplus or off-peak grid.
    PeakShaving,
}

impl Strategy {
    pub const ALL: [Self; 3] = [Self::SelfConsumption, Self::TouArbitrage, Self::PeakShaving];

    pub const fn label(self) -> &'static str {
        match self {
            Self::SelfConsumption => "self-consumption",
            Self::TouArbitrage => "tou-arbitrage",
            Self::PeakShaving => "peak-shaving",
        }
    }
}

/// Energy source the battery may be charged from.
#[derive(Debug, Hash, Serialize, Deserialize, EnumSetType)]
#[serde(rename_all = "snake_case")]
#[enumset(serialize_repr = "list")]
pub enum ChargeSource {
    Solar,
    Grid,
}

/// Dispatch policy for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchConfig {
    strategy: Strategy,
    charge_windows: Vec<TimeWindow>,
    discharge_windows: Vec<TimeWindow>,
    charge_sources: EnumSet<ChargeSource>,
    peak_shaving_threshold_kw: f64,
}

impl DispatchConfig {
    /// # Errors
    ///
    /// Returns a `ConfigError` if a charge window overlaps a discharge window
    /// or the peak-shaving threshold is negative.
    pub fn new(
        strategy: Strategy,
        charge_windows: Vec<TimeWindow>,
        discharge_windows: Vec<TimeWindow>,
        charge_sources: EnumSet<ChargeSource>,
        peak_shaving_threshold_kw: f64,
    ) -> Result<Self, ConfigError> {
        if let Some((c, d)) = find_overlap(&charge_windows, &discharge_windows) {
            return Err(ConfigError::new(
                "discharge_windows",
                format!(
                    "[{}, {}) overlaps charge window [{}, {})",
                    d.start_hour(),
                    d.end_hour(),
                    c.start_hour(),
                    c.end_hour()
                ),
            ));
        }
        if !peak_shaving_threshold_kw.is_finite() || peak_shaving_threshold_kw < 0.0 {
            return Err(ConfigError::new(
                "peak_shaving_threshold_kw",
                format!("must be >= 0 (got {peak_shaving_threshold_kw})"),
            ));
        }
        Ok(Self {
            strategy,
            charge_windows,
            discharge_windows,
            charge_sources,
            peak_shaving_threshold_kw,
        })
    }

    /// Self-consumption with no windows.
    pub fn self_consumption() -> Self {
        Self {
            strategy: Strategy::SelfConsumption,
            charge_windows: Vec::new(),
            discharge_windows: Vec::new(),
            charge_sources: EnumSet::all(),
            peak_shaving_threshold_kw: 0.0,
        }
    }

    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Same windows and sources under another strategy.
    #[must_use]
    pub fn with_strategy(&self, strategy: Strategy) -> Self {
        Self {
            strategy,
            ..self.clone()
        }
    }

    pub fn charge_windows(&self) -> &[TimeWindow] {
        &self.charge_windows
    }

    pub fn discharge_windows(&self) -> &[TimeWindow] {
        &self.discharge_windows
    }

    pub const fn charge_sources(&self) -> EnumSet<ChargeSource> {
        self.charge_sources
    }

    pub const fn peak_shaving_threshold_kw(&self) -> f64 {
        self.peak_shaving_threshold_kw
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::self_consumption()
    }
}

/// Inputs for one hour's dispatch decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourContext {
    pub index: usize,
    pub hour_of_day: usize,
    pub load_kw: f64,
    pub solar_kw: f64,
    pub slot: TouSlot,
}

impl HourContext {
    /// Load minus solar (positive = deficit).
    pub fn net_kw(&self) -> f64 {
        self.load_kw - self.solar_kw
    }

    pub fn surplus_kw(&self) -> f64 {
        (-self.net_kw()).max(0.0)
    }

    pub fn deficit_kw(&self) -> f64 {
        self.net_kw().max(0.0)
    }
}

/// Battery powers for one hour. At most one of the two is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Decision {
    pub charge_kw: f64,
    pub discharge_kw: f64,
}

impl Decision {
    pub const fn idle() -> Self {
        Self {
            charge_kw: 0.0,
            discharge_kw: 0.0,
        }
    }

    pub fn charge(kw: f64) -> Self {
        Self {
            charge_kw: kw.max(0.0),
            discharge_kw: 0.0,
        }
    }

    pub fn discharge(kw: f64) -> Self {
        Self {
            charge_kw: 0.0,
            discharge_kw: kw.max(0.0),
        }
    }
}

/// Decides charge and discharge for one hour under the configured strategy.
///
/// Charge is clamped to `min(power rating, headroom, available source)` and
/// discharge to `min(power rating, energy above min SoC, deficit)`, so the
/// result can always be applied to `battery` without leaving its SoC band.
/// A disabled battery always idles.
pub fn decide(ctx: &HourContext, battery: &BatteryState, config: &DispatchConfig) -> Decision {
    if battery.is_disabled() {
        return Decision::idle();
    }
    let surplus = ctx.surplus_kw();
    let deficit = ctx.deficit_kw();
    let charge_limit = battery.max_charge_kw();
    let discharge_limit = battery.max_discharge_kw();
    let sources = config.charge_sources;

    match config.strategy {
        Strategy::SelfConsumption => {
            if surplus > 0.0 {
                Decision::charge(charge_limit.min(surplus))
            } else if deficit > 0.0 {
                Decision::discharge(discharge_limit.min(deficit))
            } else {
                Decision::idle()
            }
        }
        Strategy::TouArbitrage => {
            if any_contains(&config.charge_windows, ctx.hour_of_day) {
                let from_solar = if sources.contains(ChargeSource::Solar) {
                    surplus.min(charge_limit)
                } else {
                    0.0
                };
                let from_grid = if sources.contains(ChargeSource::Grid) {
                    charge_limit - from_solar
                } else {
                    0.0
                };
                Decision::charge(from_solar + from_grid)
            } else if any_contains(&config.discharge_windows, ctx.hour_of_day) {
                Decision::discharge(discharge_limit.min(deficit))
            } else {
                Decision::idle()
            }
        }
        Strategy::PeakShaving => {
            let above_threshold = (deficit - config.peak_shaving_threshold_kw).max(0.0);
            if ctx.slot.period == TouPeriod::Peak && above_threshold > 0.0 {
                Decision::discharge(discharge_limit.min(above_threshold))
            } else if surplus > 0.0 && sources.contains(ChargeSource::Solar) {
                Decision::charge(charge_limit.min(surplus))
            } else if ctx.slot.period == TouPeriod::OffPeak && sources.contains(ChargeSource::Grid)
            {
                Decision::charge(charge_limit)
            } else {
                Decision::idle()
            }
        }
    }
}
