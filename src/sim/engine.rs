//! Hourly dispatch loop over load, solar and the tariff calendar.

use std::ops::Range;

use tracing::{debug, warn};

use crate::error::SimulationError;
use crate::profiles::horizon::{Horizon, fit_to_horizon};

use super::annual::AnnualResult;
use super::battery::BatteryState;
use super::calendar::TouCalendar;
use super::dispatch::{DispatchConfig, HourContext, decide};
use super::power_balance::{check, grid_exchange};
use super::types::{HOURS_PER_DAY, HourRecord};

/// Simulation engine for one calendar and dispatch policy.
///
/// The engine holds no run state. Each run takes its own [`BatteryState`] and
/// threads it through the hours in order, so independent runs may share one
/// engine across threads.
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    calendar: &'a TouCalendar,
    dispatch: &'a DispatchConfig,
}

impl<'a> Engine<'a> {
    pub const fn new(calendar: &'a TouCalendar, dispatch: &'a DispatchConfig) -> Self {
        Self { calendar, dispatch }
    }

    /// Simulates one hour and advances the battery.
    ///
    /// # Arguments
    ///
    /// * `index` - Hour index within the reference year
    /// * `load_kw` - Site load for the hour
    /// * `solar_kw` - Solar AC output for the hour
    /// * `battery` - Battery state, updated in place
    ///
    /// # Errors
    ///
    /// Returns a `SimulationError` if the hour breaks the SoC band or the
    /// energy balance.
    pub fn step(
        &self,
        index: usize,
        load_kw: f64,
        solar_kw: f64,
        battery: &mut BatteryState,
    ) -> Result<HourRecord, SimulationError> {
        let slot = self.calendar.classify(index);
        let ctx = HourContext {
            index,
            hour_of_day: index % HOURS_PER_DAY,
            load_kw,
            solar_kw,
            slot,
        };

        let decision = decide(&ctx, battery, self.dispatch);
        battery.apply(index, &decision)?;

        let (grid_import_kw, grid_export_kw) =
            grid_exchange(load_kw, solar_kw, decision.charge_kw, decision.discharge_kw);

        let record = HourRecord {
            index,
            load_kw,
            solar_kw,
            battery_charge_kw: decision.charge_kw,
            battery_discharge_kw: decision.discharge_kw,
            soc_fraction: battery.soc_fraction(),
            grid_import_kw,
            grid_export_kw,
            season: slot.season,
            day_type: slot.day_type,
            tou_period: slot.period,
        };
        check(&record)?;
        Ok(record)
    }

    /// Runs the dispatch loop over whole profiles.
    ///
    /// Profiles of 24 values run one representative day (hours 0..24 of the
    /// reference year). If either profile holds 8,760 values the full year runs
    /// and a 24-value partner is tiled. An empty profile counts as all zeros.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::Profile` for unusable profiles, or an
    /// invariant violation from [`Engine::step`].
    pub fn run(
        &self,
        load_kw: &[f64],
        solar_kw: &[f64],
        battery: BatteryState,
    ) -> Result<AnnualResult, SimulationError> {
        let horizon = Horizon::covering(&[load_kw.len(), solar_kw.len()]);
        let load = fit_to_horizon(load_kw, horizon, "load")?;
        let solar = fit_to_horizon(solar_kw, horizon, "solar")?;
        if load_kw.is_empty() {
            warn!("empty load profile, simulating zero load");
        }
        self.simulate(0..horizon.hours(), &load, &solar, battery)
    }

    /// Runs a contiguous block of hours starting at `start_index`.
    ///
    /// Profiles are fitted to the full year first, so a day-long profile
    /// repeats. Hours past the end of the year wrap.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::run`].
    pub fn run_window(
        &self,
        start_index: usize,
        hours: usize,
        load_kw: &[f64],
        solar_kw: &[f64],
        battery: BatteryState,
    ) -> Result<AnnualResult, SimulationError> {
        let load = fit_to_horizon(load_kw, Horizon::Year, "load")?;
        let solar = fit_to_horizon(solar_kw, Horizon::Year, "solar")?;
        self.simulate(start_index..start_index + hours, &load, &solar, battery)
    }

    fn simulate(
        &self,
        range: Range<usize>,
        load: &[f64],
        solar: &[f64],
        battery: BatteryState,
    ) -> Result<AnnualResult, SimulationError> {
        debug!(
            start = range.start,
            hours = range.len(),
            strategy = self.dispatch.strategy().label(),
            battery_disabled = battery.is_disabled(),
            "simulating"
        );
        let len = load.len();
        let init = (Vec::with_capacity(range.len()), battery);
        let (hours, battery) =
            range
                .into_iter()
                .try_fold(init, |(mut hours, mut battery), index| {
                    let i = index % len;
                    hours.push(self.step(index, load[i], solar[i], &mut battery)?);
                    Ok::<_, SimulationError>((hours, battery))
                })?;
        Ok(AnnualResult::from_hours(
            hours,
            battery.usable_kwh(),
            battery.soc_kwh(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::sim::battery::BatteryParams;
    use crate::sim::types::HOURS_PER_YEAR;

    fn battery() -> BatteryState {
        BatteryState::new(&BatteryParams {
            capacity_kwh: 100.0,
            charge_power_kw: 50.0,
            discharge_power_kw: 50.0,
            min_soc: 0.1,
            max_soc: 0.95,
            initial_soc: 0.2,
            ..BatteryParams::default()
        })
        .unwrap()
    }

    #[test]
    fn flat_load_without_solar_imports_everything() {
        let calendar = TouCalendar::default();
        let dispatch = DispatchConfig::default();
        let engine = Engine::new(&calendar, &dispatch);
        let r = engine
            .run(&vec![10.0; HOURS_PER_YEAR], &[], BatteryState::none())
            .unwrap();
        assert_relative_eq!(r.total_grid_import_kwh, 87_600.0, epsilon = 1e-6);
        assert_eq!(r.self_consumption_pct, 0.0);
        assert_eq!(r.hours().len(), HOURS_PER_YEAR);
    }

    #[test]
    fn day_profiles_run_one_day() {
        let calendar = TouCalendar::default();
        let dispatch = DispatchConfig::default();
        let engine = Engine::new(&calendar, &dispatch);
        let r = engine.run(&[10.0; 24], &[15.0; 24], BatteryState::none()).unwrap();
        assert_eq!(r.hours().len(), 24);
        assert!(r.hours().iter().all(|h| h.grid_export_kw == 5.0));
        assert_relative_eq!(r.self_consumption_pct, 100.0);
    }

    #[test]
    fn surplus_then_deficit_cycles_battery() {
        let calendar = TouCalendar::default();
        let dispatch = DispatchConfig::default();
        let engine = Engine::new(&calendar, &dispatch);
        let mut b = battery();

        let h0 = engine.step(0, 10.0, 50.0, &mut b).unwrap();
        assert_relative_eq!(h0.battery_charge_kw, 40.0);
        assert_relative_eq!(b.soc_kwh(), 60.0);
        let h1 = engine.step(1, 50.0, 10.0, &mut b).unwrap();
        assert_relative_eq!(h1.battery_discharge_kw, 40.0);
        assert_relative_eq!(b.soc_kwh(), 20.0);
        assert_eq!(h0.grid_import_kw + h1.grid_import_kw, 0.0);
    }

    #[test]
    fn window_wraps_past_year_end() {
        let calendar = TouCalendar::default();
        let dispatch = DispatchConfig::default();
        let engine = Engine::new(&calendar, &dispatch);
        let r = engine
            .run_window(HOURS_PER_YEAR - 12, 24, &[1.0; 24], &[], BatteryState::none())
            .unwrap();
        assert_eq!(r.hours().len(), 24);
        assert_eq!(r.hours()[23].index, HOURS_PER_YEAR + 11);
        assert_relative_eq!(r.total_grid_import_kwh, 24.0);
    }

    #[test]
    fn bad_profile_rejects_run() {
        let calendar = TouCalendar::default();
        let dispatch = DispatchConfig::default();
        let engine = Engine::new(&calendar, &dispatch);
        let err = engine.run(&[1.0; 30], &[], BatteryState::none()).unwrap_err();
        assert!(matches!(err, SimulationError::Profile(_)));
    }
}
