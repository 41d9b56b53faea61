//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::finance::projection::{FinancialSummary, SystemSize};
use crate::scenario::ScenarioOutcome;
use crate::sim::annual::AnnualResult;
use crate::sim::dispatch::Strategy;
use crate::tariff::billing::AnnualBill;

/// Headline view of a scenario: everything except the hourly and yearly
/// tables.
#[derive(Debug, Serialize)]
pub struct SummaryResponse<'a> {
    pub label: &'a str,
    pub strategy: Strategy,
    pub size: SystemSize,
    pub annual: AnnualTotals,
    pub baseline_bill: &'a AnnualBill,
    pub system_bill: &'a AnnualBill,
    pub financials: &'a FinancialSummary,
}

impl<'a> From<&'a ScenarioOutcome> for SummaryResponse<'a> {
    fn from(o: &'a ScenarioOutcome) -> Self {
        Self {
            label: &o.label,
            strategy: o.strategy,
            size: o.size,
            annual: AnnualTotals::from(&o.annual),
            baseline_bill: &o.baseline_bill,
            system_bill: &o.system_bill,
            financials: &o.summary,
        }
    }
}

/// Annual totals and KPIs without the hourly records, which `/hours` serves.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnnualTotals {
    pub total_load_kwh: f64,
    pub total_solar_kwh: f64,
    pub total_grid_import_kwh: f64,
    pub total_grid_export_kwh: f64,
    pub total_charge_kwh: f64,
    pub total_discharge_kwh: f64,
    pub battery_throughput_kwh: f64,
    pub peak_load_kw: f64,
    pub peak_grid_import_kw: f64,
    pub self_consumption_pct: f64,
    pub solar_utilisation_pct: f64,
    pub battery_cycles: f64,
    pub final_soc_kwh: f64,
}

impl From<&AnnualResult> for AnnualTotals {
    fn from(a: &AnnualResult) -> Self {
        Self {
            total_load_kwh: a.total_load_kwh,
            total_solar_kwh: a.total_solar_kwh,
            total_grid_import_kwh: a.total_grid_import_kwh,
            total_grid_export_kwh: a.total_grid_export_kwh,
            total_charge_kwh: a.total_charge_kwh,
            total_discharge_kwh: a.total_discharge_kwh,
            battery_throughput_kwh: a.battery_throughput_kwh,
            peak_load_kw: a.peak_load_kw,
            peak_grid_import_kw: a.peak_grid_import_kw,
            self_consumption_pct: a.self_consumption_pct,
            solar_utilisation_pct: a.solar_utilisation_pct,
            battery_cycles: a.battery_cycles,
            final_soc_kwh: a.final_soc_kwh,
        }
    }
}

/// Optional range query parameters for the hours endpoint.
#[derive(Debug, Deserialize)]
pub struct HoursQuery {
    /// First hour index (inclusive).
    pub from: Option<usize>,
    /// Last hour index (inclusive).
    pub to: Option<usize>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
