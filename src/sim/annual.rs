//! Aggregate results of one simulation run.

use std::fmt;

use serde::Serialize;

use super::types::HourRecord;

/// Totals and KPIs derived from a complete run, plus the hourly records.
///
/// Computed post-hoc from the records so reported totals always agree with the
/// hourly data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualResult {
    /// Site consumption (kWh).
    pub total_load_kwh: f64,
    /// Solar AC generation (kWh).
    pub total_solar_kwh: f64,
    /// Energy bought from the grid (kWh).
    pub total_grid_import_kwh: f64,
    /// Energy fed into the grid (kWh).
    pub total_grid_export_kwh: f64,
    pub total_charge_kwh: f64,
    pub total_discharge_kwh: f64,
    /// Charge plus discharge (kWh).
    pub battery_throughput_kwh: f64,
    /// Highest hourly load (kW).
    pub peak_load_kw: f64,
    /// Highest hourly grid import after solar and battery (kW).
    pub peak_grid_import_kw: f64,
    /// Share of load not met by grid import (%).
    pub self_consumption_pct: f64,
    /// Share of solar generation used on site (%).
    pub solar_utilisation_pct: f64,
    /// Equivalent full cycles over the usable band.
    pub battery_cycles: f64,
    pub final_soc_kwh: f64,
    hours: Vec<HourRecord>,
}

impl AnnualResult {
    /// Aggregates hourly records.
    ///
    /// # Arguments
    ///
    /// * `hours` - Records in hour order
    /// * `usable_kwh` - Battery usable capacity, for the cycle count
    /// * `final_soc_kwh` - Battery energy after the last hour
    pub fn from_hours(hours: Vec<HourRecord>, usable_kwh: f64, final_soc_kwh: f64) -> Self {
        let mut load = 0.0;
        let mut solar = 0.0;
        let mut import = 0.0;
        let mut export = 0.0;
        let mut charge = 0.0;
        let mut discharge = 0.0;
        let mut peak_load = 0.0_f64;
        let mut peak_import = 0.0_f64;

        for r in &hours {
            load += r.load_kw;
            solar += r.solar_kw;
            import += r.grid_import_kw;
            export += r.grid_export_kw;
            charge += r.battery_charge_kw;
            discharge += r.battery_discharge_kw;
            peak_load = peak_load.max(r.load_kw);
            peak_import = peak_import.max(r.grid_import_kw);
        }

        let throughput = charge + discharge;
        let self_consumption_pct = if load > 0.0 {
            ((load - import) / load * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let solar_utilisation_pct = if solar > 0.0 {
            ((solar - export) / solar * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let battery_cycles = if usable_kwh > 0.0 {
            throughput / (2.0 * usable_kwh)
        } else {
            0.0
        };

        Self {
            total_load_kwh: load,
            total_solar_kwh: solar,
            total_grid_import_kwh: import,
            total_grid_export_kwh: export,
            total_charge_kwh: charge,
            total_discharge_kwh: discharge,
            battery_throughput_kwh: throughput,
            peak_load_kw: peak_load,
            peak_grid_import_kw: peak_import,
            self_consumption_pct,
            solar_utilisation_pct,
            battery_cycles,
            final_soc_kwh,
            hours,
        }
    }

    /// Hourly records in hour order.
    pub fn hours(&self) -> &[HourRecord] {
        &self.hours
    }
}

impl fmt::Display for AnnualResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Energy ({} h) ---", self.hours.len())?;
        writeln!(f, "Load:                {:>12.1} kWh", self.total_load_kwh)?;
        writeln!(f, "Solar:               {:>12.1} kWh", self.total_solar_kwh)?;
        writeln!(f, "Grid import:         {:>12.1} kWh", self.total_grid_import_kwh)?;
        writeln!(f, "Grid export:         {:>12.1} kWh", self.total_grid_export_kwh)?;
        writeln!(
            f,
            "Battery throughput:  {:>12.1} kWh ({:.1} cycles)",
            self.battery_throughput_kwh, self.battery_cycles
        )?;
        writeln!(f, "Peak load:           {:>12.2} kW", self.peak_load_kw)?;
        writeln!(f, "Peak grid import:    {:>12.2} kW", self.peak_grid_import_kw)?;
        writeln!(f, "Self-consumption:    {:>12.1} %", self.self_consumption_pct)?;
        write!(f, "Solar utilisation:   {:>12.1} %", self.solar_utilisation_pct)
    }
}
