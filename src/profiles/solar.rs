//! Solar PV generation models.
//!
//! Both models turn a normalized irradiance shape into hourly AC output. The
//! shape only sets the timing; system parameters set the energy.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ProfileError};
use crate::sim::types::{DAYS_PER_YEAR, HOURS_PER_DAY};

use super::horizon::{Horizon, fit_to_horizon};

/// Hourly output of a solar model plus loss bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    /// AC output per hour (kW).
    pub ac_kw: Vec<f64>,
    /// DC energy before clipping and derate (kWh).
    pub dc_kwh: f64,
    /// Energy lost to inverter clipping (kWh).
    pub clipped_kwh: f64,
    /// Energy removed by the overall derate (kWh).
    pub derate_loss_kwh: f64,
    /// Loss waterfall of the detailed model.
    pub report: Option<LossChainReport>,
}

impl Generation {
    fn zeros(horizon: Horizon) -> Self {
        Self {
            ac_kw: vec![0.0; horizon.hours()],
            dc_kwh: 0.0,
            clipped_kwh: 0.0,
            derate_loss_kwh: 0.0,
            report: None,
        }
    }

    pub fn total_ac_kwh(&self) -> f64 {
        self.ac_kw.iter().sum()
    }
}

/// A solar generation model.
///
/// Implementations return exactly `horizon.hours()` non-negative values. A zero
/// or empty shape yields all zeros rather than an error.
pub trait SolarModel: fmt::Debug + Send + Sync {
    /// Short model name for logs and reports.
    fn name(&self) -> &'static str;

    /// Installed DC capacity (kWp).
    fn dc_capacity_kwp(&self) -> f64;

    /// Computes hourly AC output for a normalized irradiance shape.
    ///
    /// # Errors
    ///
    /// Returns a `ProfileError` if the shape has the wrong length or holds
    /// negative or non-finite values.
    fn generate(&self, shape: &[f64], horizon: Horizon) -> Result<Generation, ProfileError>;
}

/// Half-sine clear-sky shape for one day, peak 1.0 at solar noon.
///
/// Each hour is sampled at its midpoint. Hours outside `(sunrise, sunset)` are
/// zero, as is the whole day when `sunset <= sunrise`.
pub fn clear_sky_day(sunrise_hour: f64, sunset_hour: f64) -> Vec<f64> {
    let span = sunset_hour - sunrise_hour;
    (0..HOURS_PER_DAY)
        .map(|h| {
            let t = h as f64 + 0.5;
            if span <= 0.0 || t <= sunrise_hour || t >= sunset_hour {
                0.0
            } else {
                (PI * (t - sunrise_hour) / span).sin()
            }
        })
        .collect()
}

/// PVWatts-style model: peak-normalized shape, inverter clipping, one derate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimplifiedModel {
    /// Inverter AC rating (kW).
    pub ac_capacity_kw: f64,
    /// Array DC rating over inverter AC rating.
    pub dc_ac_ratio: f64,
    /// Overall derate applied after clipping (0-100 %).
    pub derate_pct: f64,
}

impl Default for SimplifiedModel {
    fn default() -> Self {
        Self {
            ac_capacity_kw: 0.0,
            dc_ac_ratio: 1.2,
            derate_pct: 14.0,
        }
    }
}

impl SimplifiedModel {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if !self.ac_capacity_kw.is_finite() || self.ac_capacity_kw < 0.0 {
            errors.push(ConfigError::new(
                "ac_capacity_kw",
                format!("must be >= 0 (got {})", self.ac_capacity_kw),
            ));
        }
        if !self.dc_ac_ratio.is_finite() || self.dc_ac_ratio <= 0.0 {
            errors.push(ConfigError::new(
                "dc_ac_ratio",
                format!("must be > 0 (got {})", self.dc_ac_ratio),
            ));
        }
        if !(0.0..=100.0).contains(&self.derate_pct) {
            errors.push(ConfigError::new(
                "derate_pct",
                format!("must be in [0, 100] (got {})", self.derate_pct),
            ));
        }
        errors
    }
}

impl SolarModel for SimplifiedModel {
    fn name(&self) -> &'static str {
        "simplified"
    }

    fn dc_capacity_kwp(&self) -> f64 {
        self.ac_capacity_kw * self.dc_ac_ratio
    }

    fn generate(&self, shape: &[f64], horizon: Horizon) -> Result<Generation, ProfileError> {
        let shape = fit_to_horizon(shape, horizon, "irradiance")?;
        let peak = shape.iter().copied().fold(0.0, f64::max);
        if peak <= 0.0 {
            warn!(model = self.name(), "irradiance shape is all zero");
            return Ok(Generation::zeros(horizon));
        }

        let dc_kw = self.dc_capacity_kwp();
        let keep = 1.0 - self.derate_pct / 100.0;
        let mut generation = Generation::zeros(horizon);
        for (out, s) in generation.ac_kw.iter_mut().zip(&shape) {
            let dc = s / peak * dc_kw;
            let ac = dc.min(self.ac_capacity_kw);
            generation.dc_kwh += dc;
            generation.clipped_kwh += dc - ac;
            generation.derate_loss_kwh += ac * (1.0 - keep);
            *out = ac * keep;
        }
        Ok(generation)
    }
}

/// Loss categories of the detailed model, in the order they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossCategory {
    Soiling,
    Shading,
    Temperature,
    Mismatch,
    DcWiring,
    InverterEfficiency,
    AcWiring,
    Transformer,
    Availability,
    AuxiliaryConsumption,
}

impl LossCategory {
    pub const ALL: [Self; 10] = [
        Self::Soiling,
        Self::Shading,
        Self::Temperature,
        Self::Mismatch,
        Self::DcWiring,
        Self::InverterEfficiency,
        Self::AcWiring,
        Self::Transformer,
        Self::Availability,
        Self::AuxiliaryConsumption,
    ];

    /// Field name in configuration files.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Soiling => "soiling",
            Self::Shading => "shading",
            Self::Temperature => "temperature",
            Self::Mismatch => "mismatch",
            Self::DcWiring => "dc_wiring",
            Self::InverterEfficiency => "inverter_efficiency",
            Self::AcWiring => "ac_wiring",
            Self::Transformer => "transformer",
            Self::Availability => "availability",
            Self::AuxiliaryConsumption => "auxiliary_consumption",
        }
    }
}

/// Loss percentages (0-100) per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LossChain {
    pub soiling: f64,
    pub shading: f64,
    pub temperature: f64,
    pub mismatch: f64,
    pub dc_wiring: f64,
    pub inverter_efficiency: f64,
    pub ac_wiring: f64,
    pub transformer: f64,
    pub availability: f64,
    pub auxiliary_consumption: f64,
}

impl Default for LossChain {
    fn default() -> Self {
        Self {
            soiling: 2.0,
            shading: 1.0,
            temperature: 6.0,
            mismatch: 1.0,
            dc_wiring: 1.5,
            inverter_efficiency: 2.5,
            ac_wiring: 0.5,
            transformer: 1.0,
            availability: 1.0,
            auxiliary_consumption: 0.3,
        }
    }
}

impl LossChain {
    /// A chain with every loss at zero.
    pub fn lossless() -> Self {
        Self {
            soiling: 0.0,
            shading: 0.0,
            temperature: 0.0,
            mismatch: 0.0,
            dc_wiring: 0.0,
            inverter_efficiency: 0.0,
            ac_wiring: 0.0,
            transformer: 0.0,
            availability: 0.0,
            auxiliary_consumption: 0.0,
        }
    }

    pub fn pct(&self, category: LossCategory) -> f64 {
        match category {
            LossCategory::Soiling => self.soiling,
            LossCategory::Shading => self.shading,
            LossCategory::Temperature => self.temperature,
            LossCategory::Mismatch => self.mismatch,
            LossCategory::DcWiring => self.dc_wiring,
            LossCategory::InverterEfficiency => self.inverter_efficiency,
            LossCategory::AcWiring => self.ac_wiring,
            LossCategory::Transformer => self.transformer,
            LossCategory::Availability => self.availability,
            LossCategory::AuxiliaryConsumption => self.auxiliary_consumption,
        }
    }

    /// `(category, percent)` pairs in application order.
    pub fn iter(&self) -> impl Iterator<Item = (LossCategory, f64)> + '_ {
        LossCategory::ALL.into_iter().map(|c| (c, self.pct(c)))
    }

    /// Fraction of energy left after every loss.
    pub fn retained_fraction(&self) -> f64 {
        self.iter().map(|(_, pct)| 1.0 - pct / 100.0).product()
    }
}

/// One bar of the loss waterfall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossStep {
    pub category: LossCategory,
    pub loss_pct: f64,
    pub lost_kwh: f64,
    /// Energy remaining after this category (kWh).
    pub remaining_kwh: f64,
}

/// Annual energy account of the detailed model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossChainReport {
    pub ghi_annual_kwh_m2: f64,
    pub collector_area_m2: f64,
    /// Module output at STC efficiency before any loss (kWh).
    pub gross_kwh: f64,
    pub steps: Vec<LossStep>,
    pub annual_kwh: f64,
    /// kWh per kWp per year.
    pub specific_yield: f64,
    /// Annual output over `GHI x AC capacity` (%).
    pub performance_ratio_pct: f64,
}

/// Detailed model: annual energy from GHI and module area through an ordered
/// multiplicative loss chain, spread over the hours by the irradiance shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LossChainModel {
    pub ac_capacity_kw: f64,
    pub dc_capacity_kwp: f64,
    /// Defaults to `dc_capacity_kwp / module_efficiency` (1 kW/m2 at STC).
    pub collector_area_m2: Option<f64>,
    /// Module efficiency at STC (fraction).
    pub module_efficiency: f64,
    /// Annual GHI (kWh/m2). Defaults to the total of the shape.
    pub ghi_annual_kwh_m2: Option<f64>,
    pub losses: LossChain,
}

impl Default for LossChainModel {
    fn default() -> Self {
        Self {
            ac_capacity_kw: 0.0,
            dc_capacity_kwp: 0.0,
            collector_area_m2: None,
            module_efficiency: 0.2,
            ghi_annual_kwh_m2: None,
            losses: LossChain::default(),
        }
    }
}

impl LossChainModel {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("ac_capacity_kw", Some(self.ac_capacity_kw)),
            ("dc_capacity_kwp", Some(self.dc_capacity_kwp)),
            ("collector_area_m2", self.collector_area_m2),
            ("ghi_annual_kwh_m2", self.ghi_annual_kwh_m2),
        ] {
            if let Some(v) = value.filter(|v| !v.is_finite() || *v < 0.0) {
                errors.push(ConfigError::new(field, format!("must be >= 0 (got {v})")));
            }
        }
        if !(self.module_efficiency > 0.0 && self.module_efficiency <= 1.0) {
            errors.push(ConfigError::new(
                "module_efficiency",
                format!("must be in (0, 1] (got {})", self.module_efficiency),
            ));
        }
        for (category, pct) in self.losses.iter() {
            if !(0.0..=100.0).contains(&pct) {
                errors.push(ConfigError::new(
                    format!("losses.{}", category.key()),
                    format!("must be in [0, 100] (got {pct})"),
                ));
            }
        }
        errors
    }

    pub fn collector_area_m2(&self) -> f64 {
        self.collector_area_m2
            .unwrap_or(self.dc_capacity_kwp / self.module_efficiency)
    }

    /// Annual energy account for a given annual GHI.
    pub fn report(&self, ghi_annual_kwh_m2: f64) -> LossChainReport {
        let area = self.collector_area_m2();
        let gross = ghi_annual_kwh_m2 * area * self.module_efficiency;
        let mut remaining = gross;
        let steps = self
            .losses
            .iter()
            .map(|(category, loss_pct)| {
                let lost = remaining * loss_pct / 100.0;
                remaining -= lost;
                LossStep {
                    category,
                    loss_pct,
                    lost_kwh: lost,
                    remaining_kwh: remaining,
                }
            })
            .collect();
        let specific_yield = if self.dc_capacity_kwp > 0.0 {
            remaining / self.dc_capacity_kwp
        } else {
            0.0
        };
        let reference = ghi_annual_kwh_m2 * self.ac_capacity_kw;
        let performance_ratio_pct = if reference > 0.0 {
            remaining / reference * 100.0
        } else {
            0.0
        };
        LossChainReport {
            ghi_annual_kwh_m2,
            collector_area_m2: area,
            gross_kwh: gross,
            steps,
            annual_kwh: remaining,
            specific_yield,
            performance_ratio_pct,
        }
    }
}

impl SolarModel for LossChainModel {
    fn name(&self) -> &'static str {
        "loss-chain"
    }

    fn dc_capacity_kwp(&self) -> f64 {
        self.dc_capacity_kwp
    }

    fn generate(&self, shape: &[f64], horizon: Horizon) -> Result<Generation, ProfileError> {
        let shape = fit_to_horizon(shape, horizon, "irradiance")?;
        let shape_total: f64 = shape.iter().sum();
        let ghi_annual = self.ghi_annual_kwh_m2.unwrap_or(match horizon {
            Horizon::Day => shape_total * DAYS_PER_YEAR as f64,
            Horizon::Year => shape_total,
        });
        if shape_total <= 0.0 || ghi_annual <= 0.0 {
            warn!(model = self.name(), "no irradiance, generation is zero");
            return Ok(Generation::zeros(horizon));
        }

        let report = self.report(ghi_annual);
        let days = match horizon {
            Horizon::Day => DAYS_PER_YEAR as f64,
            Horizon::Year => 1.0,
        };
        let horizon_kwh = report.annual_kwh / days;
        let ac_kw = shape.iter().map(|s| s / shape_total * horizon_kwh).collect();
        let dc_kwh = report.gross_kwh / days;
        Ok(Generation {
            ac_kw,
            dc_kwh,
            clipped_kwh: 0.0,
            derate_loss_kwh: 0.0,
            report: Some(report),
        })
    }
}
