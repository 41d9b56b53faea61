//! Site power balance at the grid connection.

use crate::error::SimulationError;

use super::types::HourRecord;

/// Energy-balance slack per hour (kWh).
pub const BALANCE_TOLERANCE_KW: f64 = 1e-6;

/// Splits the post-battery site balance into grid import and export.
///
/// The balance is `load - solar + charge - discharge`. A positive balance is
/// drawn from the grid, a negative one is fed into it.
///
/// # Returns
///
/// `(grid_import_kw, grid_export_kw)`, both non-negative, at most one non-zero.
pub fn grid_exchange(load_kw: f64, solar_kw: f64, charge_kw: f64, discharge_kw: f64) -> (f64, f64) {
    let balance = load_kw - solar_kw + charge_kw - discharge_kw;
    (balance.max(0.0), (-balance).max(0.0))
}

/// Sources minus sinks for one hour. Zero for a consistent record.
pub fn residual_kw(r: &HourRecord) -> f64 {
    (r.solar_kw + r.battery_discharge_kw + r.grid_import_kw)
        - (r.load_kw + r.battery_charge_kw + r.grid_export_kw)
}

/// Checks the energy balance of one record.
///
/// # Errors
///
/// Returns `SimulationError::EnergyImbalance` when the residual exceeds the
/// tolerance. Debug builds panic instead.
pub fn check(r: &HourRecord) -> Result<(), SimulationError> {
    let residual = residual_kw(r);
    let balanced = residual.abs() <= BALANCE_TOLERANCE_KW;
    debug_assert!(balanced, "hour {}: energy balance residual {residual}", r.index);
    if balanced {
        Ok(())
    } else {
        Err(SimulationError::EnergyImbalance {
            hour: r.index,
            residual_kw: residual,
        })
    }
}
