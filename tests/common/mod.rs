//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use pv_bess_sim::finance::projection::FinanceParams;
use pv_bess_sim::profiles::solar::{SimplifiedModel, clear_sky_day};
use pv_bess_sim::scenario::Scenario;
use pv_bess_sim::sim::battery::{BatteryParams, BatteryState};
use pv_bess_sim::sim::calendar::TouCalendar;
use pv_bess_sim::sim::dispatch::DispatchConfig;
use pv_bess_sim::sim::types::HourRecord;
use pv_bess_sim::tariff::structure::TariffStructure;

/// Floating-point slack for per-hour balance checks (kW).
pub const BALANCE_TOLERANCE: f64 = 1e-6;

/// 100 kWh battery, 10-95 % band, 50 kW both ways, lossless, starting at
/// 20 kWh.
pub fn battery_100kwh() -> BatteryParams {
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

pub fn battery_state(params: &BatteryParams) -> BatteryState {
    BatteryState::new(params).unwrap()
}

/// Flat site load with a clear-sky solar day, self-consumption dispatch and
/// the default tariff.
pub fn flat_site(load_kw: f64, solar_ac_kw: f64, battery: BatteryParams) -> Scenario {
    Scenario {
        label: "flat".to_string(),
        calendar: TouCalendar::default(),
        load_kw: vec![load_kw; 24],
        irradiance: clear_sky_day(6.0, 18.0),
        solar: Arc::new(SimplifiedModel {
            ac_capacity_kw: solar_ac_kw,
            ..SimplifiedModel::default()
        }),
        battery,
        dispatch: DispatchConfig::self_consumption(),
        tariff: TariffStructure::default(),
        finance: FinanceParams::default(),
    }
}

/// Load minus solar plus charge minus discharge must equal import minus
/// export.
pub fn assert_balanced(hours: &[HourRecord]) {
    for h in hours {
        let lhs = h.load_kw - h.solar_kw + h.battery_charge_kw - h.battery_discharge_kw;
        let rhs = h.grid_import_kw - h.grid_export_kw;
        assert!(
            (lhs - rhs).abs() < BALANCE_TOLERANCE,
            "hour {}: {lhs} != {rhs}",
            h.index
        );
        assert!(h.grid_import_kw >= 0.0 && h.grid_export_kw >= 0.0);
        assert!(
            h.battery_charge_kw == 0.0 || h.battery_discharge_kw == 0.0,
            "hour {} charges and discharges",
            h.index
        );
    }
}

/// Every hour's state of charge stays within the configured band. A site
/// without storage reports zero throughout.
pub fn assert_soc_within(hours: &[HourRecord], params: &BatteryParams) {
    if params.capacity_kwh == 0.0 {
        assert!(hours.iter().all(|h| h.soc_fraction == 0.0));
        return;
    }
    for h in hours {
        assert!(
            h.soc_fraction >= params.min_soc - 1e-9 && h.soc_fraction <= params.max_soc + 1e-9,
            "hour {}: soc {} outside [{}, {}]",
            h.index,
            h.soc_fraction,
            params.min_soc,
            params.max_soc
        );
    }
}
