//! Tariff definition: fixed, demand, network and energy charges.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::sim::types::{DayType, Season, TouPeriod, TouSlot};

/// Energy rates per tariff bucket, with a fallback for unlisted buckets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RateTable {
    rates: HashMap<TouSlot, f64>,
    fallback: f64,
}

impl RateTable {
    pub fn new(fallback: f64) -> Self {
        Self {
            rates: HashMap::new(),
            fallback,
        }
    }

    /// Sets the rate for one bucket.
    #[must_use]
    pub fn with_rate(mut self, slot: TouSlot, rate: f64) -> Self {
        self.rates.insert(slot, rate);
        self
    }

    /// Sets the rate for one period in every day type of a season.
    #[must_use]
    pub fn with_season_period(mut self, season: Season, period: TouPeriod, rate: f64) -> Self {
        for day_type in DayType::ALL {
            self.rates.insert(TouSlot::new(season, day_type, period), rate);
        }
        self
    }

    /// Energy rate (currency per kWh) for a bucket.
    pub fn rate(&self, slot: TouSlot) -> f64 {
        self.rates.get(&slot).copied().unwrap_or(self.fallback)
    }

    pub const fn fallback(&self) -> f64 {
        self.fallback
    }

    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !self.fallback.is_finite() || self.fallback < 0.0 {
            errors.push(ConfigError::new(
                "fallback_rate",
                format!("must be >= 0 (got {})", self.fallback),
            ));
        }
        let mut bad: Vec<_> = self
            .rates
            .iter()
            .filter(|(_, r)| !r.is_finite() || **r < 0.0)
            .collect();
        bad.sort_by_key(|(slot, _)| **slot);
        for (slot, rate) in bad {
            errors.push(ConfigError::new(
                format!(
                    "rates.{}.{}.{}",
                    slot.season.key(),
                    slot.day_type.key(),
                    slot.period.key()
                ),
                format!("must be >= 0 (got {rate})"),
            ));
        }
        errors
    }
}

/// Complete tariff for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct TariffStructure {
    /// Charged every billing month.
    pub fixed_monthly_charge: f64,
    /// Per kVA of the month's peak grid import.
    pub demand_charge_per_kva: f64,
    /// Per kVA of the year's peak grid import, charged monthly.
    pub network_access_charge_per_kva: f64,
    /// Converts kW to kVA for demand charges.
    pub power_factor: f64,
    /// Credit per exported kWh.
    pub export_rate: f64,
    pub energy_rates: RateTable,
}

impl Default for TariffStructure {
    /// Illustrative commercial TOU tariff.
    fn default() -> Self {
        let energy_rates = RateTable::new(1.20)
            .with_season_period(Season::High, TouPeriod::Peak, 4.50)
            .with_season_period(Season::High, TouPeriod::Standard, 1.45)
            .with_season_period(Season::High, TouPeriod::OffPeak, 0.85)
            .with_season_period(Season::Low, TouPeriod::Peak, 1.55)
            .with_season_period(Season::Low, TouPeriod::Standard, 1.10)
            .with_season_period(Season::Low, TouPeriod::OffPeak, 0.80);
        Self {
            fixed_monthly_charge: 850.0,
            demand_charge_per_kva: 60.0,
            network_access_charge_per_kva: 25.0,
            power_factor: 1.0,
            export_rate: 0.0,
            energy_rates,
        }
    }
}

impl TariffStructure {
    /// Returns every violated constraint.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("fixed_monthly_charge", self.fixed_monthly_charge),
            ("demand_charge_per_kva", self.demand_charge_per_kva),
            ("network_access_charge_per_kva", self.network_access_charge_per_kva),
            ("export_rate", self.export_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError::new(field, format!("must be >= 0 (got {value})")));
            }
        }
        if !(self.power_factor > 0.0 && self.power_factor <= 1.0) {
            errors.push(ConfigError::new(
                "power_factor",
                format!("must be in (0, 1] (got {})", self.power_factor),
            ));
        }
        errors.extend(self.energy_rates.validate());
        errors
    }

    /// Apparent power for a real power reading.
    pub fn kva(&self, kw: f64) -> f64 {
        kw / self.power_factor
    }
}
