//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use enumset::EnumSet;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, ConfigErrors, Error, Result};
use crate::finance::projection::FinanceParams;
use crate::io::profile::read_profile_csv;
use crate::profiles::load::{Tenant, synthesize};
use crate::profiles::solar::{LossChainModel, SimplifiedModel, SolarModel, clear_sky_day};
use crate::scenario::Scenario;
use crate::sim::battery::BatteryParams;
use crate::sim::calendar::{DayRules, SeasonRules, TimeWindow, TouCalendar};
use crate::sim::dispatch::{ChargeSource, DispatchConfig, Strategy};
use crate::sim::types::{DayType, Season, TouPeriod, TouSlot};
use crate::tariff::structure::{RateTable, TariffStructure};

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub solar: SolarConfig,
    #[serde(default)]
    pub battery: BatteryParams,
    #[serde(default)]
    pub dispatch: DispatchSection,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub tariff: TariffConfig,
    #[serde(default)]
    pub finance: FinanceParams,
    /// Directory that relative CSV paths resolve against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Illustrative office building: low overnight base, working-day plateau.
const OFFICE_LOAD_KW: [f64; 24] = [
    35.0, 34.0, 33.0, 33.0, 34.0, 40.0, 60.0, 90.0, 115.0, 120.0, 122.0, 124.0, 123.0, 122.0,
    120.0, 118.0, 110.0, 95.0, 75.0, 60.0, 50.0, 45.0, 40.0, 37.0,
];

/// Site identity and load source.
///
/// The load comes from `load_csv` if set, else from `tenants` if any are
/// listed, else from `load_kw`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub label: String,
    /// Hourly load (kW), 24 or 8,760 values.
    pub load_kw: Vec<f64>,
    pub load_csv: Option<PathBuf>,
    pub tenants: Vec<Tenant>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            label: "baseline".to_string(),
            load_kw: OFFICE_LOAD_KW.to_vec(),
            load_csv: None,
            tenants: Vec::new(),
        }
    }
}

/// Which solar model runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolarModelKind {
    #[default]
    Simplified,
    LossChain,
}

/// Solar model parameters and irradiance shape.
///
/// With no `irradiance` and no `irradiance_csv`, a clear-sky day between
/// `sunrise_hour` and `sunset_hour` is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    pub model: SolarModelKind,
    pub simplified: SimplifiedModel,
    pub loss_chain: LossChainModel,
    /// Normalized irradiance shape, 24 or 8,760 values.
    pub irradiance: Vec<f64>,
    pub irradiance_csv: Option<PathBuf>,
    pub sunrise_hour: f64,
    pub sunset_hour: f64,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            model: SolarModelKind::Simplified,
            simplified: SimplifiedModel {
                ac_capacity_kw: 100.0,
                ..SimplifiedModel::default()
            },
            loss_chain: LossChainModel {
                ac_capacity_kw: 100.0,
                dc_capacity_kwp: 120.0,
                ..LossChainModel::default()
            },
            irradiance: Vec::new(),
            irradiance_csv: None,
            sunrise_hour: 6.0,
            sunset_hour: 18.0,
        }
    }
}

/// An hour window written as `[start, end]`.
pub type WindowSpec = [u8; 2];

fn build_windows(specs: &[WindowSpec], field: &str) -> Result<Vec<TimeWindow>, ConfigError> {
    specs
        .iter()
        .enumerate()
        .map(|(i, [start, end])| {
            TimeWindow::new(*start, *end)
                .map_err(|e| ConfigError::new(format!("{field}.{i}"), e.message))
        })
        .collect()
}

/// Dispatch policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchSection {
    pub strategy: Strategy,
    pub charge_windows: Vec<WindowSpec>,
    pub discharge_windows: Vec<WindowSpec>,
    /// Sources the battery may charge from: `solar`, `grid`.
    pub charge_sources: EnumSet<ChargeSource>,
    pub peak_shaving_threshold_kw: f64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            strategy: Strategy::SelfConsumption,
            charge_windows: Vec::new(),
            discharge_windows: Vec::new(),
            charge_sources: EnumSet::all(),
            peak_shaving_threshold_kw: 0.0,
        }
    }
}

impl DispatchSection {
    fn build(&self) -> Result<DispatchConfig, ConfigError> {
        DispatchConfig::new(
            self.strategy,
            build_windows(&self.charge_windows, "charge_windows")?,
            build_windows(&self.discharge_windows, "discharge_windows")?,
            self.charge_sources,
            self.peak_shaving_threshold_kw,
        )
    }
}

/// Period windows for one day type.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DayConfig {
    pub peak: Vec<WindowSpec>,
    pub off_peak: Vec<WindowSpec>,
    /// Period of every hour outside the windows.
    pub otherwise: TouPeriod,
}

impl Default for DayConfig {
    fn default() -> Self {
        Self {
            peak: Vec::new(),
            off_peak: Vec::new(),
            otherwise: TouPeriod::OffPeak,
        }
    }
}

impl DayConfig {
    fn build(&self) -> Result<DayRules, ConfigError> {
        DayRules::new(
            build_windows(&self.peak, "peak")?,
            build_windows(&self.off_peak, "off_peak")?,
            self.otherwise,
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeasonConfig {
    pub weekday: DayConfig,
    pub saturday: DayConfig,
    pub sunday: DayConfig,
}

impl SeasonConfig {
    fn build(&self) -> Result<SeasonRules, ConfigError> {
        Ok(SeasonRules {
            weekday: self.weekday.build().map_err(|e| e.within("weekday"))?,
            saturday: self.saturday.build().map_err(|e| e.within("saturday"))?,
            sunday: self.sunday.build().map_err(|e| e.within("sunday"))?,
        })
    }
}

/// Reference year, seasons, holidays and TOU windows.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalendarConfig {
    pub reference_year: i32,
    pub high_season_months: Vec<u32>,
    /// Billed as Sundays.
    pub holidays: Vec<NaiveDate>,
    pub high: SeasonConfig,
    pub low: SeasonConfig,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            reference_year: 2023,
            high_season_months: vec![6, 7, 8],
            holidays: Vec::new(),
            high: SeasonConfig {
                weekday: DayConfig {
                    peak: vec![[7, 10], [18, 20]],
                    off_peak: vec![[22, 24], [0, 6]],
                    otherwise: TouPeriod::Standard,
                },
                ..SeasonConfig::default()
            },
            low: SeasonConfig::default(),
        }
    }
}

impl CalendarConfig {
    fn build(&self) -> Result<TouCalendar, ConfigError> {
        TouCalendar::new(
            self.reference_year,
            &self.high_season_months,
            &self.holidays,
            self.high.build().map_err(|e| e.within("high"))?,
            self.low.build().map_err(|e| e.within("low"))?,
        )
    }
}

/// One energy rate. Without `day_type` it applies to every day type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateEntry {
    pub season: Season,
    #[serde(default)]
    pub day_type: Option<DayType>,
    pub period: TouPeriod,
    pub rate: f64,
}

impl RateEntry {
    const fn season_period(season: Season, period: TouPeriod, rate: f64) -> Self {
        Self {
            season,
            day_type: None,
            period,
            rate,
        }
    }
}

/// Tariff charges and energy rates.
///
/// Later `rates` entries override earlier ones for the same bucket.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    pub fixed_monthly_charge: f64,
    pub demand_charge_per_kva: f64,
    pub network_access_charge_per_kva: f64,
    pub power_factor: f64,
    pub export_rate: f64,
    /// Rate for buckets no entry covers.
    pub fallback_rate: f64,
    pub rates: Vec<RateEntry>,
}

impl Default for TariffConfig {
    fn default() -> Self {
        use Season::{High, Low};
        use TouPeriod::{OffPeak, Peak, Standard};
        let tariff = TariffStructure::default();
        let table = &tariff.energy_rates;
        let rates = [High, Low]
            .into_iter()
            .flat_map(|season| {
                [Peak, Standard, OffPeak].into_iter().map(move |period| {
                    let rate = table.rate(TouSlot::new(season, DayType::Weekday, period));
                    RateEntry::season_period(season, period, rate)
                })
            })
            .collect();
        Self {
            fixed_monthly_charge: tariff.fixed_monthly_charge,
            demand_charge_per_kva: tariff.demand_charge_per_kva,
            network_access_charge_per_kva: tariff.network_access_charge_per_kva,
            power_factor: tariff.power_factor,
            export_rate: tariff.export_rate,
            fallback_rate: tariff.energy_rates.fallback(),
            rates,
        }
    }
}

impl TariffConfig {
    pub fn build(&self) -> TariffStructure {
        let energy_rates =
            self.rates
                .iter()
                .fold(RateTable::new(self.fallback_rate), |table, entry| {
                    match entry.day_type {
                        Some(day_type) => table.with_rate(
                            TouSlot::new(entry.season, day_type, entry.period),
                            entry.rate,
                        ),
                        None => table.with_season_period(entry.season, entry.period, entry.rate),
                    }
                });
        TariffStructure {
            fixed_monthly_charge: self.fixed_monthly_charge,
            demand_charge_per_kva: self.demand_charge_per_kva,
            network_access_charge_per_kva: self.network_access_charge_per_kva,
            power_factor: self.power_factor,
            export_rate: self.export_rate,
            energy_rates,
        }
    }
}

fn within_all(errors: Vec<ConfigError>, section: &str) -> impl Iterator<Item = ConfigError> + '_ {
    errors.into_iter().map(move |e| e.within(section))
}

impl ScenarioConfig {
    /// Returns the baseline scenario: 100 kW solar, 200 kWh battery,
    /// self-consumption dispatch.
    pub fn baseline() -> Self {
        Self {
            battery: BatteryParams {
                capacity_kwh: 200.0,
                charge_power_kw: 50.0,
                discharge_power_kw: 50.0,
                ..BatteryParams::default()
            },
            ..Self::default()
        }
    }

    /// Returns the solar-only preset: the baseline site without storage.
    pub fn solar_only() -> Self {
        Self {
            site: SiteConfig {
                label: "solar_only".to_string(),
                ..SiteConfig::default()
            },
            battery: BatteryParams::default(),
            ..Self::baseline()
        }
    }

    /// Returns the TOU-arbitrage preset: charge off-peak from any source,
    /// discharge into the high-season weekday peaks.
    pub fn tou_arbitrage() -> Self {
        let base = Self::baseline();
        Self {
            site: SiteConfig {
                label: "tou_arbitrage".to_string(),
                ..SiteConfig::default()
            },
            dispatch: DispatchSection {
                strategy: Strategy::TouArbitrage,
                charge_windows: vec![[0, 6], [10, 16]],
                discharge_windows: vec![[7, 10], [18, 20]],
                ..DispatchSection::default()
            },
            ..base
        }
    }

    /// Returns the peak-shaving preset: larger battery holding grid import
    /// to 80 kW in peak hours, recharged from solar or off-peak grid.
    pub fn peak_shaving() -> Self {
        let base = Self::baseline();
        Self {
            site: SiteConfig {
                label: "peak_shaving".to_string(),
                ..SiteConfig::default()
            },
            battery: BatteryParams {
                capacity_kwh: 300.0,
                charge_power_kw: 60.0,
                discharge_power_kw: 60.0,
                ..base.battery.clone()
            },
            dispatch: DispatchSection {
                strategy: Strategy::PeakShaving,
                peak_shaving_threshold_kw: 80.0,
                ..DispatchSection::default()
            },
            ..base
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "solar_only", "tou_arbitrage", "peak_shaving"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "solar_only" => Ok(Self::solar_only()),
            "tou_arbitrage" => Ok(Self::tou_arbitrage()),
            "peak_shaving" => Ok(Self::peak_shaving()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file. Relative CSV paths inside it
    /// resolve against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::Read` if the file cannot be read, or `Error::Toml` if
    /// the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `Error::Toml` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid. Profile files
    /// are not read here.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.site.label.trim().is_empty() {
            errors.push(ConfigError::new("site.label", "must not be empty"));
        }

        let sol = &self.solar;
        match sol.model {
            SolarModelKind::Simplified => {
                errors.extend(within_all(sol.simplified.validate(), "solar.simplified"));
            }
            SolarModelKind::LossChain => {
                errors.extend(within_all(sol.loss_chain.validate(), "solar.loss_chain"));
            }
        }
        if sol.irradiance.is_empty() && sol.irradiance_csv.is_none() {
            if !(0.0..=24.0).contains(&sol.sunrise_hour) || !(0.0..=24.0).contains(&sol.sunset_hour)
            {
                errors.push(ConfigError::new("solar.sunrise_hour", "hours must lie in [0, 24]"));
            } else if sol.sunrise_hour >= sol.sunset_hour {
                errors.push(ConfigError::new(
                    "solar.sunrise_hour",
                    "must be < solar.sunset_hour",
                ));
            }
        }

        errors.extend(within_all(self.battery.validate(), "battery"));
        if let Err(e) = self.dispatch.build() {
            errors.push(e.within("dispatch"));
        }
        if let Err(e) = self.calendar.build() {
            errors.push(e.within("calendar"));
        }
        errors.extend(within_all(self.tariff.build().validate(), "tariff"));
        errors.extend(within_all(self.finance.validate(), "finance"));
        errors
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn load_profile(&self) -> Result<Vec<f64>> {
        if let Some(path) = &self.site.load_csv {
            return read_profile_csv(&self.resolve(path));
        }
        if !self.site.tenants.is_empty() {
            debug!(tenants = self.site.tenants.len(), "synthesizing site load");
            return Ok(synthesize(&self.site.tenants)?);
        }
        Ok(self.site.load_kw.clone())
    }

    fn irradiance(&self) -> Result<Vec<f64>> {
        let sol = &self.solar;
        if let Some(path) = &sol.irradiance_csv {
            return read_profile_csv(&self.resolve(path));
        }
        if !sol.irradiance.is_empty() {
            return Ok(sol.irradiance.clone());
        }
        Ok(clear_sky_day(sol.sunrise_hour, sol.sunset_hour))
    }

    /// Validates the configuration, reads profile files and assembles a
    /// runnable [`Scenario`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Invalid` with every validation failure, or the error
    /// from reading a profile.
    pub fn build(&self) -> Result<Scenario> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(ConfigErrors(errors).into());
        }

        let solar: Arc<dyn SolarModel> = match self.solar.model {
            SolarModelKind::Simplified => Arc::new(self.solar.simplified.clone()),
            SolarModelKind::LossChain => Arc::new(self.solar.loss_chain.clone()),
        };
        Ok(Scenario {
            label: self.site.label.clone(),
            calendar: self.calendar.build().map_err(|e| e.within("calendar"))?,
            load_kw: self.load_profile()?,
            irradiance: self.irradiance()?,
            solar,
            battery: self.battery.clone(),
            dispatch: self.dispatch.build().map_err(|e| e.within("dispatch"))?,
            tariff: self.tariff.build(),
            finance: self.finance.clone(),
        })
    }
}
