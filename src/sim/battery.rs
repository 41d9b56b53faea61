use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SimulationError};

use super::dispatch::Decision;

/// Slack for floating-point drift when checking SoC bounds (kWh).
const SOC_TOLERANCE_KWH: f64 = 1e-9;

/// Battery sizing and operating limits as configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryParams {
    /// Nameplate DC capacity in kWh. Zero disables the battery.
    pub capacity_kwh: f64,
    /// Maximum charge power in kW.
    pub charge_power_kw: f64,
    /// Maximum discharge power in kW.
    pub discharge_power_kw: f64,
    /// Lowest allowed state of charge (fraction of capacity).
    pub min_soc: f64,
    /// Highest allowed state of charge (fraction of capacity).
    pub max_soc: f64,
    /// State of charge at hour 0 (fraction of capacity).
    pub initial_soc: f64,
    /// One-way charging efficiency in (0, 1].
    pub charge_efficiency: f64,
    /// One-way discharging efficiency in (0, 1].
    pub discharge_efficiency: f64,
}

impl Default for BatteryParams {
    fn default() -> Self {
        Self {
            capacity_kwh: 0.0,
            charge_power_kw: 0.0,
            discharge_power_kw: 0.0,
            min_soc: 0.1,
            max_soc: 0.95,
            initial_soc: 0.1,
            charge_efficiency: 1.0,
            discharge_efficiency: 1.0,
        }
    }
}

impl BatteryParams {
    /// Returns every violated constraint, field names relative to the section.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut non_negative = |field: &str, value: f64| {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError::new(field, format!("must be >= 0 (got {value})")));
            }
        };
        non_negative("capacity_kwh", self.capacity_kwh);
        non_negative("charge_power_kw", self.charge_power_kw);
        non_negative("discharge_power_kw", self.discharge_power_kw);

        for (field, value) in [
            ("min_soc", self.min_soc),
            ("max_soc", self.max_soc),
            ("initial_soc", self.initial_soc),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError::new(field, format!("must be in [0, 1] (got {value})")));
            }
        }
        if self.min_soc >= self.max_soc {
            errors.push(ConfigError::new(
                "min_soc",
                format!("must be < max_soc ({} >= {})", self.min_soc, self.max_soc),
            ));
        }
        if self.initial_soc < self.min_soc || self.initial_soc > self.max_soc {
            errors.push(ConfigError::new(
                "initial_soc",
                format!(
                    "must lie in [min_soc, max_soc] = [{}, {}] (got {})",
                    self.min_soc, self.max_soc, self.initial_soc
                ),
            ));
        }
        for (field, value) in [
            ("charge_efficiency", self.charge_efficiency),
            ("discharge_efficiency", self.discharge_efficiency),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                errors.push(ConfigError::new(field, format!("must be in (0, 1] (got {value})")));
            }
        }
        errors
    }
}

/// Battery state threaded through the hourly dispatch loop.
///
/// Only `soc_kwh` changes during a run. It always stays within
/// `[min_soc x capacity, max_soc x capacity]`; [`BatteryState::apply`] rejects
/// any decision that would leave that band.
///
/// # Power convention
///
/// Charge and discharge are AC-side powers, both positive. With efficiencies
/// below 1.0 the stored energy changes by `charge x eta_c - discharge / eta_d`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryState {
    capacity_kwh: f64,
    charge_power_kw: f64,
    discharge_power_kw: f64,
    min_soc: f64,
    max_soc: f64,
    charge_efficiency: f64,
    discharge_efficiency: f64,
    soc_kwh: f64,
}

impl BatteryState {
    /// Creates the initial battery state.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint of [`BatteryParams::validate`].
    pub fn new(params: &BatteryParams) -> Result<Self, ConfigError> {
        if let Some(error) = params.validate().into_iter().next() {
            return Err(error);
        }
        Ok(Self {
            capacity_kwh: params.capacity_kwh,
            charge_power_kw: params.charge_power_kw,
            discharge_power_kw: params.discharge_power_kw,
            min_soc: params.min_soc,
            max_soc: params.max_soc,
            charge_efficiency: params.charge_efficiency,
            discharge_efficiency: params.discharge_efficiency,
            soc_kwh: params.initial_soc * params.capacity_kwh,
        })
    }

    /// A site without storage.
    pub const fn none() -> Self {
        Self {
            capacity_kwh: 0.0,
            charge_power_kw: 0.0,
            discharge_power_kw: 0.0,
            min_soc: 0.0,
            max_soc: 1.0,
            charge_efficiency: 1.0,
            discharge_efficiency: 1.0,
            soc_kwh: 0.0,
        }
    }

    pub const fn capacity_kwh(&self) -> f64 {
        self.capacity_kwh
    }

    pub const fn soc_kwh(&self) -> f64 {
        self.soc_kwh
    }

    pub fn min_kwh(&self) -> f64 {
        self.min_soc * self.capacity_kwh
    }

    pub fn max_kwh(&self) -> f64 {
        self.max_soc * self.capacity_kwh
    }

    /// Energy between the SoC limits.
    pub fn usable_kwh(&self) -> f64 {
        self.capacity_kwh * (self.max_soc - self.min_soc)
    }

    /// State of charge as a fraction of capacity (0 for a disabled battery).
    pub fn soc_fraction(&self) -> f64 {
        if self.capacity_kwh > 0.0 {
            self.soc_kwh / self.capacity_kwh
        } else {
            0.0
        }
    }

    /// True when capacity or both power ratings are zero.
    pub fn is_disabled(&self) -> bool {
        self.capacity_kwh <= 0.0 || (self.charge_power_kw <= 0.0 && self.discharge_power_kw <= 0.0)
    }

    /// AC energy the battery can still absorb this hour.
    pub fn headroom_kwh(&self) -> f64 {
        ((self.max_kwh() - self.soc_kwh) / self.charge_efficiency).max(0.0)
    }

    /// AC energy the battery can deliver before reaching `min_soc`.
    pub fn available_kwh(&self) -> f64 {
        ((self.soc_kwh - self.min_kwh()) * self.discharge_efficiency).max(0.0)
    }

    /// Charge limit for the coming hour: power rating capped by headroom.
    pub fn max_charge_kw(&self) -> f64 {
        self.charge_power_kw.min(self.headroom_kwh())
    }

    /// Discharge limit for the coming hour: power rating capped by stored energy.
    pub fn max_discharge_kw(&self) -> f64 {
        self.discharge_power_kw.min(self.available_kwh())
    }

    /// Applies one hour of dispatch.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::SocOutOfBounds` if the decision would leave the
    /// SoC band. Debug builds panic instead.
    pub fn apply(&mut self, hour: usize, decision: &Decision) -> Result<(), SimulationError> {
        let next = self.soc_kwh + decision.charge_kw * self.charge_efficiency
            - decision.discharge_kw / self.discharge_efficiency;
        let (min_kwh, max_kwh) = (self.min_kwh(), self.max_kwh());
        let in_bounds =
            next >= min_kwh - SOC_TOLERANCE_KWH && next <= max_kwh + SOC_TOLERANCE_KWH;
        debug_assert!(
            in_bounds,
            "hour {hour}: soc {next} kWh outside [{min_kwh}, {max_kwh}]"
        );
        if !in_bounds {
            return Err(SimulationError::SocOutOfBounds {
                hour,
                soc_kwh: next,
                min_kwh,
                max_kwh,
            });
        }
        // Within tolerance: absorb the rounding residue.
        self.soc_kwh = next.clamp(min_kwh, max_kwh);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn params() -> BatteryParams {
        BatteryParams {
            capacity_kwh: 100.0,
            charge_power_kw: 50.0,
            discharge_power_kw: 50.0,
            min_soc: 0.1,
            max_soc: 0.95,
            initial_soc: 0.2,
            ..BatteryParams::default()
        }
    }

    #[test]
    fn new_battery_derives_limits() {
        let b = BatteryState::new(&params()).unwrap();
        assert_relative_eq!(b.soc_kwh(), 20.0);
        assert_relative_eq!(b.usable_kwh(), 85.0);
        assert_relative_eq!(b.headroom_kwh(), 75.0);
        assert_relative_eq!(b.available_kwh(), 10.0);
        assert_relative_eq!(b.max_charge_kw(), 50.0);
        assert_relative_eq!(b.max_discharge_kw(), 10.0);
        assert!(!b.is_disabled());
    }

    #[test]
    fn min_soc_not_below_max_is_rejected() {
        let p = BatteryParams {
            min_soc: 0.9,
            max_soc: 0.5,
            initial_soc: 0.6,
            ..params()
        };
        let err = BatteryState::new(&p).unwrap_err();
        assert_eq!(err.field, "min_soc");
    }

    #[test]
    fn negative_capacity_is_rejected() {
        let p = BatteryParams {
            capacity_kwh: -1.0,
            ..params()
        };
        assert!(BatteryState::new(&p).is_err_and(|e| e.field == "capacity_kwh"));
    }

    #[test]
    fn validate_collects_every_problem() {
        let p = BatteryParams {
            capacity_kwh: -1.0,
            charge_efficiency: 0.0,
            initial_soc: 2.0,
            ..params()
        };
        let fields: Vec<_> = p.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"capacity_kwh".to_string()));
        assert!(fields.contains(&"charge_efficiency".to_string()));
        assert!(fields.contains(&"initial_soc".to_string()));
    }

    #[test]
    fn zero_power_battery_is_disabled() {
        let p = BatteryParams {
            charge_power_kw: 0.0,
            discharge_power_kw: 0.0,
            ..params()
        };
        assert!(BatteryState::new(&p).unwrap().is_disabled());
        assert!(BatteryState::none().is_disabled());
        assert_eq!(BatteryState::none().soc_fraction(), 0.0);
    }

    #[test]
    fn apply_moves_soc_exactly_with_unit_efficiency() {
        let mut b = BatteryState::new(&params()).unwrap();
        b.apply(0, &Decision::charge(40.0)).unwrap();
        assert_relative_eq!(b.soc_kwh(), 60.0);
        b.apply(1, &Decision::discharge(40.0)).unwrap();
        assert_relative_eq!(b.soc_kwh(), 20.0);
        assert_relative_eq!(b.soc_fraction(), 0.2);
    }

    #[test]
    fn efficiency_losses_apply_each_way() {
        let p = BatteryParams {
            charge_efficiency: 0.9,
            discharge_efficiency: 0.8,
            initial_soc: 0.5,
            ..params()
        };
        let mut b = BatteryState::new(&p).unwrap();
        b.apply(0, &Decision::charge(10.0)).unwrap();
        assert_relative_eq!(b.soc_kwh(), 59.0);
        b.apply(1, &Decision::discharge(8.0)).unwrap();
        assert_relative_eq!(b.soc_kwh(), 49.0);
        // 39 kWh above the floor, 80 % of it reaches the AC side.
        assert_relative_eq!(b.available_kwh(), 31.2, epsilon = 1e-9);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn overdischarge_fails_loudly_in_debug() {
        let mut b = BatteryState::new(&params()).unwrap();
        let _ = b.apply(0, &Decision::discharge(15.0));
    }
}
