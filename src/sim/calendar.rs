//! Time-of-use and season classification over the reference year.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;

use crate::error::ConfigError;

use super::types::{DayType, HOURS_PER_DAY, HOURS_PER_YEAR, Season, TouPeriod, TouSlot};

/// Half-open hour-of-day window `[start_hour, end_hour)`.
///
/// Windows never wrap midnight. A late-evening to early-morning window must be
/// given as two windows, see [`TimeWindow::split_midnight`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start_hour: u8,
    end_hour: u8,
}

impl TimeWindow {
    /// Creates a window.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if either bound exceeds 24 or if
    /// `end_hour < start_hour`.
    pub fn new(start_hour: u8, end_hour: u8) -> Result<Self, ConfigError> {
        if start_hour > 24 || end_hour > 24 {
            return Err(ConfigError::new(
                "window",
                format!("[{start_hour}, {end_hour}) is outside 0..=24"),
            ));
        }
        if end_hour < start_hour {
            return Err(ConfigError::new(
                "window",
                format!(
                    "[{start_hour}, {end_hour}) wraps midnight; split it into \
                     [{start_hour}, 24) and [0, {end_hour})"
                ),
            ));
        }
        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    /// Splits a possibly wrapping `start..end` range into explicit windows.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if either bound exceeds 24.
    pub fn split_midnight(start_hour: u8, end_hour: u8) -> Result<Vec<Self>, ConfigError> {
        if end_hour >= start_hour {
            return Ok(vec![Self::new(start_hour, end_hour)?]);
        }
        let windows = [Self::new(start_hour, 24)?, Self::new(0, end_hour)?];
        Ok(windows.into_iter().filter(|w| !w.is_empty()).collect())
    }

    pub const fn start_hour(&self) -> u8 {
        self.start_hour
    }

    pub const fn end_hour(&self) -> u8 {
        self.end_hour
    }

    pub const fn is_empty(&self) -> bool {
        self.start_hour == self.end_hour
    }

    /// Returns `true` when `hour_of_day` falls within the window.
    pub const fn contains(&self, hour_of_day: usize) -> bool {
        hour_of_day >= self.start_hour as usize && hour_of_day < self.end_hour as usize
    }

    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start_hour < other.end_hour && other.start_hour < self.end_hour
    }
}

/// Returns `true` when any of `windows` contains `hour_of_day`.
pub fn any_contains(windows: &[TimeWindow], hour_of_day: usize) -> bool {
    windows.iter().any(|w| w.contains(hour_of_day))
}

pub(crate) fn find_overlap<'a>(
    a: &'a [TimeWindow],
    b: &'a [TimeWindow],
) -> Option<(&'a TimeWindow, &'a TimeWindow)> {
    a.iter()
        .flat_map(|x| b.iter().map(move |y| (x, y)))
        .find(|(x, y)| x.overlaps(y))
}

/// Period rules for one day type: peak windows, off-peak windows, and the
/// period for every other hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayRules {
    peak: Vec<TimeWindow>,
    off_peak: Vec<TimeWindow>,
    otherwise: TouPeriod,
}

impl DayRules {
    /// # Errors
    ///
    /// Returns a `ConfigError` if a peak window overlaps an off-peak window.
    pub fn new(
        peak: Vec<TimeWindow>,
        off_peak: Vec<TimeWindow>,
        otherwise: TouPeriod,
    ) -> Result<Self, ConfigError> {
        if let Some((p, o)) = find_overlap(&peak, &off_peak) {
            return Err(ConfigError::new(
                "off_peak",
                format!(
                    "window [{}, {}) overlaps peak window [{}, {})",
                    o.start_hour, o.end_hour, p.start_hour, p.end_hour
                ),
            ));
        }
        Ok(Self {
            peak,
            off_peak,
            otherwise,
        })
    }

    /// Every hour in the same period.
    pub const fn flat(period: TouPeriod) -> Self {
        Self {
            peak: Vec::new(),
            off_peak: Vec::new(),
            otherwise: period,
        }
    }

    pub fn period_at(&self, hour_of_day: usize) -> TouPeriod {
        if any_contains(&self.peak, hour_of_day) {
            TouPeriod::Peak
        } else if any_contains(&self.off_peak, hour_of_day) {
            TouPeriod::OffPeak
        } else {
            self.otherwise
        }
    }
}

/// Day rules for one season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonRules {
    pub weekday: DayRules,
    pub saturday: DayRules,
    pub sunday: DayRules,
}

impl SeasonRules {
    fn for_day(&self, day_type: DayType) -> &DayRules {
        match day_type {
            DayType::Weekday => &self.weekday,
            DayType::Saturday => &self.saturday,
            DayType::Sunday => &self.sunday,
        }
    }

    /// Weekend and weekday hours all billed off-peak.
    pub const fn all_off_peak() -> Self {
        Self {
            weekday: DayRules::flat(TouPeriod::OffPeak),
            saturday: DayRules::flat(TouPeriod::OffPeak),
            sunday: DayRules::flat(TouPeriod::OffPeak),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct DayInfo {
    month: u32,
    season: Season,
    day_type: DayType,
}

/// Month, season and day type for each day of the year starting at
/// `first_day`. Holidays count as Sundays.
fn day_table(
    first_day: NaiveDate,
    high_season_months: &[u32],
    holidays: &[NaiveDate],
) -> Vec<DayInfo> {
    first_day
        .iter_days()
        .take_while(|d| d.year() == first_day.year())
        .map(|date| {
            let season = if high_season_months.contains(&date.month()) {
                Season::High
            } else {
                Season::Low
            };
            let day_type = if holidays.contains(&date) {
                DayType::Sunday
            } else {
                match date.weekday() {
                    Weekday::Sat => DayType::Saturday,
                    Weekday::Sun => DayType::Sunday,
                    _ => DayType::Weekday,
                }
            };
            DayInfo {
                month: date.month(),
                season,
                day_type,
            }
        })
        .collect()
}

/// First day of the default reference year, a Sunday.
const DEFAULT_FIRST_DAY: NaiveDate = match NaiveDate::from_ymd_opt(2023, 1, 1) {
    Some(date) => date,
    None => panic!("2023-01-01 is a valid date"),
};

/// Maps every hour of a fixed reference year to its tariff bucket.
///
/// The reference year, high-season months, holidays and period windows are
/// settings, so the classifier carries no hardcoded calendar.
///
/// # Examples
///
/// ```
/// use pv_bess_sim::sim::calendar::TouCalendar;
/// use pv_bess_sim::sim::types::{DayType, TouPeriod};
///
/// let calendar = TouCalendar::default(); // 2023, Jan 1 is a Sunday
/// let slot = calendar.classify(12);
/// assert_eq!(slot.day_type, DayType::Sunday);
/// assert_eq!(slot.period, TouPeriod::OffPeak);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TouCalendar {
    reference_year: i32,
    high_season: SeasonRules,
    low_season: SeasonRules,
    days: Vec<DayInfo>,
}

impl TouCalendar {
    /// Builds the classifier for a reference year.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the year is a leap year or out of range, a
    /// month is outside 1..=12, or a holiday lies outside the reference year.
    pub fn new(
        reference_year: i32,
        high_season_months: &[u32],
        holidays: &[NaiveDate],
        high_season: SeasonRules,
        low_season: SeasonRules,
    ) -> Result<Self, ConfigError> {
        let first_day = NaiveDate::from_ymd_opt(reference_year, 1, 1).ok_or_else(|| {
            ConfigError::new("reference_year", format!("{reference_year} is out of range"))
        })?;
        if first_day.leap_year() {
            return Err(ConfigError::new(
                "reference_year",
                format!("{reference_year} is a leap year; the engine simulates 8760 hours"),
            ));
        }
        if let Some(month) = high_season_months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(ConfigError::new(
                "high_season_months",
                format!("month {month} is outside 1..=12"),
            ));
        }
        if let Some(day) = holidays.iter().find(|d| d.year() != reference_year) {
            return Err(ConfigError::new(
                "holidays",
                format!("{day} is outside reference year {reference_year}"),
            ));
        }

        Ok(Self {
            reference_year,
            high_season,
            low_season,
            days: day_table(first_day, high_season_months, holidays),
        })
    }

    pub const fn reference_year(&self) -> i32 {
        self.reference_year
    }

    fn day(&self, hour_index: usize) -> &DayInfo {
        // `days` always holds 365 entries; indices past the year wrap.
        &self.days[(hour_index % HOURS_PER_YEAR) / HOURS_PER_DAY]
    }

    /// Classifies one hour of the reference year.
    ///
    /// Total over `usize`: indices past hour 8759 wrap into the next year.
    pub fn classify(&self, hour_index: usize) -> TouSlot {
        let day = self.day(hour_index);
        let rules = match day.season {
            Season::High => &self.high_season,
            Season::Low => &self.low_season,
        };
        let period = rules
            .for_day(day.day_type)
            .period_at(hour_index % HOURS_PER_DAY);
        TouSlot::new(day.season, day.day_type, period)
    }

    /// Calendar month (1..=12) of an hour.
    pub fn month_of(&self, hour_index: usize) -> u32 {
        self.day(hour_index).month
    }

    /// Calendar date of an hour.
    pub fn date_of(&self, hour_index: usize) -> Option<NaiveDate> {
        let day = (hour_index % HOURS_PER_YEAR) / HOURS_PER_DAY;
        NaiveDate::from_ymd_opt(self.reference_year, 1, 1)?.checked_add_days(Days::new(day as u64))
    }
}

impl Default for TouCalendar {
    /// Reference year 2023, high season June to August, weekday peaks 07-10
    /// and 18-20, off-peak 22-06, weekends and low season off-peak.
    fn default() -> Self {
        let window = |start, end| TimeWindow {
            start_hour: start,
            end_hour: end,
        };
        let high_season = SeasonRules {
            weekday: DayRules {
                peak: vec![window(7, 10), window(18, 20)],
                off_peak: vec![window(22, 24), window(0, 6)],
                otherwise: TouPeriod::Standard,
            },
            saturday: DayRules::flat(TouPeriod::OffPeak),
            sunday: DayRules::flat(TouPeriod::OffPeak),
        };
        Self {
            reference_year: DEFAULT_FIRST_DAY.year(),
            high_season,
            low_season: SeasonRules::all_off_peak(),
            days: day_table(DEFAULT_FIRST_DAY, &[6, 7, 8], &[]),
        }
    }
}
