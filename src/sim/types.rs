//! Core simulation types: tariff buckets and the per-hour record.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hours in one simulated day.
pub const HOURS_PER_DAY: usize = 24;
/// Days in the (non-leap) reference year.
pub const DAYS_PER_YEAR: usize = 365;
/// Hours in the reference year.
pub const HOURS_PER_YEAR: usize = HOURS_PER_DAY * DAYS_PER_YEAR;

/// Tariff season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    High,
    Low,
}

/// Tariff day type. Public holidays are billed as Sundays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Weekday,
    Saturday,
    Sunday,
}

/// Time-of-use period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TouPeriod {
    Peak,
    Standard,
    OffPeak,
}

impl Season {
    pub const ALL: [Self; 2] = [Self::High, Self::Low];

    /// Name used in configuration files and exports.
    pub const fn key(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
        }
    }
}

impl DayType {
    pub const ALL: [Self; 3] = [Self::Weekday, Self::Saturday, Self::Sunday];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Weekday => "weekday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }
}

impl TouPeriod {
    pub const ALL: [Self; 3] = [Self::Peak, Self::Standard, Self::OffPeak];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Peak => "peak",
            Self::Standard => "standard",
            Self::OffPeak => "off-peak",
        }
    }
}

/// The `(season, day_type, tou_period)` bucket an hour belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TouSlot {
    pub season: Season,
    pub day_type: DayType,
    pub period: TouPeriod,
}

impl TouSlot {
    pub const fn new(season: Season, day_type: DayType, period: TouPeriod) -> Self {
        Self {
            season,
            day_type,
            period,
        }
    }

    /// Every bucket of the tariff grid, 18 in total.
    pub fn all() -> impl Iterator<Item = Self> {
        Season::ALL.into_iter().flat_map(|season| {
            DayType::ALL.into_iter().flat_map(move |day_type| {
                TouPeriod::ALL
                    .into_iter()
                    .map(move |period| Self::new(season, day_type, period))
            })
        })
    }
}

/// Complete record of one simulated hour.
///
/// All power values are hourly averages in kW, so they double as kWh for the
/// hour. Records are produced once by the engine and never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourRecord {
    /// Hour index within the reference year.
    pub index: usize,
    /// Site load (kW, positive).
    pub load_kw: f64,
    /// Solar AC output (kW, positive).
    pub solar_kw: f64,
    /// Power flowing into the battery (kW, positive).
    pub battery_charge_kw: f64,
    /// Power delivered by the battery (kW, positive).
    pub battery_discharge_kw: f64,
    /// Battery state of charge after this hour (0.0 to 1.0 of capacity).
    pub soc_fraction: f64,
    /// Energy bought from the grid (kW, positive).
    pub grid_import_kw: f64,
    /// Energy fed into the grid (kW, positive).
    pub grid_export_kw: f64,
    pub season: Season,
    pub day_type: DayType,
    pub tou_period: TouPeriod,
}

impl HourRecord {
    /// Tariff bucket of this hour.
    pub const fn slot(&self) -> TouSlot {
        TouSlot::new(self.season, self.day_type, self.tou_period)
    }

    /// Load minus solar before the battery acts (positive = deficit).
    pub fn net_load_kw(&self) -> f64 {
        self.load_kw - self.solar_kw
    }

    /// Hour of day (0..24).
    pub const fn hour_of_day(&self) -> usize {
        self.index % HOURS_PER_DAY
    }
}

impl fmt::Display for HourRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "h={:>4} | load={:>8.2} kW  solar={:>8.2} kW | bat +{:.2}/-{:.2} kW \
             (SoC={:.1}%) | grid in={:.2} out={:.2} kW | {}/{}/{}",
            self.index,
            self.load_kw,
            self.solar_kw,
            self.battery_charge_kw,
            self.battery_discharge_kw,
            self.soc_fraction * 100.0,
            self.grid_import_kw,
            self.grid_export_kw,
            self.season.key(),
            self.day_type.key(),
            self.tou_period.key(),
        )
    }
}
