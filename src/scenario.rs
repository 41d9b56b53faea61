//! One configured site wired through the full pipeline.
//!
//! Load and solar feed the dispatch engine, whose grid exchange is billed and
//! then projected over the project life. Independent scenarios run on scoped
//! threads.

use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::finance::projection::{
    FinanceParams, FinancialProjector, FinancialSummary, SystemSize, YearlyProjection,
};
use crate::profiles::horizon::{Horizon, fit_to_horizon};
use crate::profiles::solar::{Generation, SolarModel};
use crate::sim::annual::AnnualResult;
use crate::sim::battery::{BatteryParams, BatteryState};
use crate::sim::calendar::TouCalendar;
use crate::sim::dispatch::{DispatchConfig, Strategy};
use crate::sim::engine::Engine;
use crate::sim::types::{DAYS_PER_YEAR, HOURS_PER_DAY};
use crate::tariff::billing::{AnnualBill, GridAccountant, annual_savings};
use crate::tariff::structure::TariffStructure;

/// A site ready to simulate.
///
/// Profiles hold 24 values (tiled across the year), 8,760 values, or nothing
/// (all zeros).
#[derive(Debug, Clone)]
pub struct Scenario {
    pub label: String,
    pub calendar: TouCalendar,
    pub load_kw: Vec<f64>,
    /// Normalized irradiance shape handed to the solar model.
    pub irradiance: Vec<f64>,
    pub solar: Arc<dyn SolarModel>,
    pub battery: BatteryParams,
    pub dispatch: DispatchConfig,
    pub tariff: TariffStructure,
    pub finance: FinanceParams,
}

/// Everything one scenario run produces.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub label: String,
    pub strategy: Strategy,
    pub size: SystemSize,
    pub generation: Generation,
    pub annual: AnnualResult,
    pub baseline_bill: AnnualBill,
    pub system_bill: AnnualBill,
    pub summary: FinancialSummary,
    pub projection: Vec<YearlyProjection>,
}

impl Scenario {
    /// Installed PV and battery sizes that set the capital cost.
    pub fn size(&self) -> SystemSize {
        SystemSize {
            pv_kwp: self.solar.dc_capacity_kwp(),
            battery_kwh: self.battery.capacity_kwh,
        }
    }

    /// The same site without storage.
    #[must_use]
    pub fn without_battery(&self) -> Self {
        Self {
            label: format!("{} (no battery)", self.label),
            battery: BatteryParams::default(),
            ..self.clone()
        }
    }

    /// The same site under another dispatch strategy.
    #[must_use]
    pub fn with_dispatch(&self, strategy: Strategy) -> Self {
        Self {
            label: format!("{} ({})", self.label, strategy.label()),
            dispatch: self.dispatch.with_strategy(strategy),
            ..self.clone()
        }
    }

    fn annual_profiles(&self) -> Result<(Vec<f64>, Generation)> {
        let load = fit_to_horizon(&self.load_kw, Horizon::Year, "load")?;
        let generation = self.solar.generate(&self.irradiance, Horizon::Year)?;
        Ok((load, generation))
    }

    fn initial_battery(&self) -> Result<BatteryState> {
        let battery = BatteryState::new(&self.battery).map_err(|e| e.within("battery"))?;
        if battery.is_disabled() && self.battery.capacity_kwh > 0.0 {
            warn!(
                scenario = %self.label,
                "battery has capacity but no power rating, running without storage"
            );
        }
        Ok(battery)
    }

    /// Runs the full year, bills it and projects the cash flows.
    ///
    /// # Errors
    ///
    /// Returns an error if a profile is unusable, the battery parameters are
    /// invalid, or the run breaks an energy invariant.
    pub fn run(&self) -> Result<ScenarioOutcome> {
        info!(
            scenario = %self.label,
            strategy = self.dispatch.strategy().label(),
            solar_model = self.solar.name(),
            "running scenario"
        );
        let (load, generation) = self.annual_profiles()?;
        let battery = self.initial_battery()?;

        let engine = Engine::new(&self.calendar, &self.dispatch);
        let annual = engine.run(&load, &generation.ac_kw, battery)?;
        debug!(
            scenario = %self.label,
            import_kwh = annual.total_grid_import_kwh,
            export_kwh = annual.total_grid_export_kwh,
            "dispatch complete"
        );

        let accountant = GridAccountant::new(&self.tariff, &self.calendar);
        let baseline_bill = accountant.baseline_bill(&load);
        let system_bill = accountant.bill(annual.hours());
        let savings = annual_savings(&baseline_bill, &system_bill);

        let size = self.size();
        let system_cost = self.finance.system_cost(&size);
        let projector = FinancialProjector::new(&self.finance);
        let projection = projector.project(system_cost, savings, generation.total_ac_kwh());
        let summary = projector.summarize(system_cost, savings, &projection);
        info!(
            scenario = %self.label,
            savings,
            npv = summary.npv,
            "scenario complete"
        );

        Ok(ScenarioOutcome {
            label: self.label.clone(),
            strategy: self.dispatch.strategy(),
            size,
            generation,
            annual,
            baseline_bill,
            system_bill,
            summary,
            projection,
        })
    }

    /// Simulates one day of the reference year (0-based), starting from the
    /// configured initial state of charge.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a day past the end of the year, otherwise the
    /// same errors as [`Scenario::run`].
    pub fn representative_day(&self, day: usize) -> Result<AnnualResult> {
        if day >= DAYS_PER_YEAR {
            return Err(ConfigError::new(
                "day",
                format!("must be < {DAYS_PER_YEAR} (got {day})"),
            )
            .into());
        }
        let (load, generation) = self.annual_profiles()?;
        let battery = self.initial_battery()?;
        let engine = Engine::new(&self.calendar, &self.dispatch);
        Ok(engine.run_window(
            day * HOURS_PER_DAY,
            HOURS_PER_DAY,
            &load,
            &generation.ac_kw,
            battery,
        )?)
    }
}

/// Runs independent scenarios concurrently, one thread each.
///
/// Results come back in input order.
pub fn compare(scenarios: &[Scenario]) -> Vec<Result<ScenarioOutcome>> {
    thread::scope(|scope| {
        let handles: Vec<_> = scenarios
            .iter()
            .map(|scenario| scope.spawn(move || scenario.run()))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
            })
            .collect()
    })
}

/// The scenario under every dispatch strategy, plus the same site without a
/// battery.
pub fn strategy_variants(scenario: &Scenario) -> Vec<Scenario> {
    let mut variants: Vec<Scenario> = Strategy::ALL
        .iter()
        .map(|&strategy| scenario.with_dispatch(strategy))
        .collect();
    variants.push(scenario.without_battery());
    variants
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::profiles::solar::{SimplifiedModel, clear_sky_day};
    use crate::sim::types::HOURS_PER_YEAR;

    fn site() -> Scenario {
        Scenario {
            label: "test".into(),
            calendar: TouCalendar::default(),
            load_kw: vec![10.0; HOURS_PER_DAY],
            irradiance: clear_sky_day(6.0, 18.0),
            solar: Arc::new(SimplifiedModel {
                ac_capacity_kw: 20.0,
                ..SimplifiedModel::default()
            }),
            battery: BatteryParams {
                capacity_kwh: 40.0,
                charge_power_kw: 10.0,
                discharge_power_kw: 10.0,
                ..BatteryParams::default()
            },
            dispatch: DispatchConfig::self_consumption(),
            tariff: TariffStructure::default(),
            finance: FinanceParams::default(),
        }
    }

    #[test]
    fn run_covers_full_year_with_twelve_bills() {
        let outcome = site().run().unwrap();
        assert_eq!(outcome.annual.hours().len(), HOURS_PER_YEAR);
        assert_eq!(outcome.system_bill.months.len(), 12);
        assert_eq!(outcome.projection.len(), 25);
        assert!(outcome.summary.annual_savings > 0.0);
    }

    #[test]
    fn without_battery_only_drops_storage() {
        let base = site();
        let bare = base.without_battery();
        assert_eq!(bare.battery.capacity_kwh, 0.0);
        assert_eq!(bare.size().pv_kwp, base.size().pv_kwp);
        let outcome = bare.run().unwrap();
        assert_eq!(outcome.annual.total_charge_kwh, 0.0);
    }

    #[test]
    fn compare_keeps_input_order() {
        let base = site();
        let variants = strategy_variants(&base);
        let outcomes = compare(&variants);
        assert_eq!(outcomes.len(), 4);
        for (variant, outcome) in variants.iter().zip(&outcomes) {
            assert_eq!(&outcome.as_ref().unwrap().label, &variant.label);
        }
    }

    #[test]
    fn representative_day_runs_24_hours_from_that_day() {
        let day = site().representative_day(180).unwrap();
        assert_eq!(day.hours().len(), 24);
        assert_eq!(day.hours()[0].index, 180 * 24);
        assert_relative_eq!(day.total_load_kwh, 240.0);
        assert!(site().representative_day(365).is_err());
    }

    #[test]
    fn invalid_battery_is_reported_with_section() {
        let mut scenario = site();
        scenario.battery.min_soc = 0.99;
        let err = scenario.run().unwrap_err();
        assert!(err.to_string().contains("battery."), "{err}");
    }
}
