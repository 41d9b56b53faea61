//! Multi-year cash-flow projection and financial summary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::metrics::{irr, lcoe, mirr, npv, payback_years, roi_pct};
use super::root::NewtonRaphson;

/// A component replacement in a given project year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Replacement {
    /// Project year, 1-based.
    pub year: u32,
    /// Cost in year-1 money, escalated at O&M inflation.
    pub cost: f64,
    #[serde(default)]
    pub label: String,
}

/// Cost and escalation parameters.
///
/// Rates are fractions (0.10 = 10 %). Escalation, degradation and cost shares
/// are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinanceParams {
    pub cost_per_kwp: f64,
    pub cost_per_kwh: f64,
    pub installation_cost: f64,
    /// Annual O&M as a share of capital (%).
    pub om_pct: f64,
    /// Annual insurance as a share of capital (%).
    pub insurance_pct: f64,
    pub replacements: Vec<Replacement>,
    pub discount_rate: f64,
    pub finance_rate: f64,
    pub reinvestment_rate: f64,
    pub lcoe_discount_rate: f64,
    pub tariff_escalation_pct: f64,
    pub om_escalation_pct: f64,
    /// Module output lost per year (%).
    pub degradation_pct: f64,
    pub project_years: u32,
}

impl Default for FinanceParams {
    fn default() -> Self {
        Self {
            cost_per_kwp: 11_500.0,
            cost_per_kwh: 6_500.0,
            installation_cost: 45_000.0,
            om_pct: 1.0,
            insurance_pct: 0.5,
            replacements: Vec::new(),
            discount_rate: 0.10,
            finance_rate: 0.11,
            reinvestment_rate: 0.08,
            lcoe_discount_rate: 0.08,
            tariff_escalation_pct: 8.0,
            om_escalation_pct: 6.0,
            degradation_pct: 0.5,
            project_years: 25,
        }
    }
}

impl FinanceParams {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("cost_per_kwp", self.cost_per_kwp),
            ("cost_per_kwh", self.cost_per_kwh),
            ("installation_cost", self.installation_cost),
            ("om_pct", self.om_pct),
            ("insurance_pct", self.insurance_pct),
            ("om_escalation_pct", self.om_escalation_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError::new(field, format!("must be >= 0 (got {value})")));
            }
        }
        for (field, value) in [
            ("discount_rate", self.discount_rate),
            ("finance_rate", self.finance_rate),
            ("reinvestment_rate", self.reinvestment_rate),
            ("lcoe_discount_rate", self.lcoe_discount_rate),
        ] {
            if !value.is_finite() || value <= -1.0 {
                errors.push(ConfigError::new(field, format!("must be > -1 (got {value})")));
            }
        }
        if !self.tariff_escalation_pct.is_finite() || self.tariff_escalation_pct <= -100.0 {
            errors.push(ConfigError::new(
                "tariff_escalation_pct",
                format!("must be > -100 (got {})", self.tariff_escalation_pct),
            ));
        }
        if !(0.0..100.0).contains(&self.degradation_pct) {
            errors.push(ConfigError::new(
                "degradation_pct",
                format!("must be in [0, 100) (got {})", self.degradation_pct),
            ));
        }
        if self.project_years == 0 {
            errors.push(ConfigError::new("project_years", "must be at least 1"));
        }
        for (i, r) in self.replacements.iter().enumerate() {
            if r.year == 0 || r.year > self.project_years {
                errors.push(ConfigError::new(
                    format!("replacements.{i}.year"),
                    format!("must be in 1..={} (got {})", self.project_years, r.year),
                ));
            }
            if !r.cost.is_finite() || r.cost < 0.0 {
                errors.push(ConfigError::new(
                    format!("replacements.{i}.cost"),
                    format!("must be >= 0 (got {})", r.cost),
                ));
            }
        }
        errors
    }

    /// Year-1 capital: PV and battery hardware plus installation.
    pub fn system_cost(&self, size: &SystemSize) -> f64 {
        size.pv_kwp * self.cost_per_kwp
            + size.battery_kwh * self.cost_per_kwh
            + self.installation_cost
    }
}

/// Installed capacities that drive capital cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SystemSize {
    pub pv_kwp: f64,
    pub battery_kwh: f64,
}

/// One row of the cash-flow table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyProjection {
    pub year: u32,
    /// Solar generation after degradation (kWh).
    pub energy_yield_kwh: f64,
    /// Bill savings after degradation and tariff escalation.
    pub energy_income: f64,
    pub om_cost: f64,
    pub insurance_cost: f64,
    pub replacement_cost: f64,
    pub net_cash_flow: f64,
    /// Running total starting from `-system_cost`.
    pub cumulative_cash_flow: f64,
}

/// Headline financial metrics. Missing values are undefined, not zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub system_cost: f64,
    /// Year-1 bill savings.
    pub annual_savings: f64,
    /// `None` when payback lies beyond the project life.
    pub payback_years: Option<f64>,
    pub roi_pct: f64,
    pub npv: f64,
    pub irr: Option<f64>,
    pub mirr: Option<f64>,
    /// Currency per kWh.
    pub lcoe: Option<f64>,
}

fn pct_or(value: Option<f64>, missing: &str) -> String {
    value.map_or_else(|| missing.to_string(), |v| format!("{:.2} %", v * 100.0))
}

impl fmt::Display for FinancialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Financials ---")?;
        writeln!(f, "System cost:     {:>14.2}", self.system_cost)?;
        writeln!(f, "Annual savings:  {:>14.2}", self.annual_savings)?;
        match self.payback_years {
            Some(years) => writeln!(f, "Payback:         {years:>14.2} years")?,
            None => writeln!(f, "Payback:         beyond project life")?,
        }
        writeln!(f, "ROI:             {:>14.1} %", self.roi_pct)?;
        writeln!(f, "NPV:             {:>14.2}", self.npv)?;
        writeln!(f, "IRR:             {:>14}", pct_or(self.irr, "undefined"))?;
        writeln!(f, "MIRR:            {:>14}", pct_or(self.mirr, "undefined"))?;
        match self.lcoe {
            Some(lcoe) => write!(f, "LCOE:            {lcoe:>14.4} per kWh"),
            None => write!(f, "LCOE:            undefined"),
        }
    }
}

/// Extends one simulated year into the project-life cash-flow table.
#[derive(Debug, Clone)]
pub struct FinancialProjector<'a> {
    params: &'a FinanceParams,
    solver: NewtonRaphson,
}

impl<'a> FinancialProjector<'a> {
    pub fn new(params: &'a FinanceParams) -> Self {
        Self {
            params,
            solver: NewtonRaphson::new(),
        }
    }

    /// Uses a custom root finder for IRR.
    #[must_use]
    pub fn with_solver(mut self, solver: NewtonRaphson) -> Self {
        self.solver = solver;
        self
    }

    /// Builds the yearly table.
    ///
    /// # Arguments
    ///
    /// * `system_cost` - Year-0 capital
    /// * `annual_savings` - Year-1 bill savings
    /// * `annual_yield_kwh` - Year-1 solar generation
    pub fn project(
        &self,
        system_cost: f64,
        annual_savings: f64,
        annual_yield_kwh: f64,
    ) -> Vec<YearlyProjection> {
        let p = self.params;
        let keep = 1.0 - p.degradation_pct / 100.0;
        let tariff_growth = 1.0 + p.tariff_escalation_pct / 100.0;
        let om_growth = 1.0 + p.om_escalation_pct / 100.0;
        let om_base = system_cost * p.om_pct / 100.0;
        let insurance_base = system_cost * p.insurance_pct / 100.0;

        let mut cumulative = -system_cost;
        (1..=p.project_years)
            .map(|year| {
                let age = (year - 1) as i32;
                let degradation = keep.powi(age);
                let om_factor = om_growth.powi(age);
                let replacement_cost = p
                    .replacements
                    .iter()
                    .filter(|r| r.year == year)
                    .map(|r| r.cost * om_factor)
                    .sum::<f64>();
                let energy_income = annual_savings * degradation * tariff_growth.powi(age);
                let om_cost = om_base * om_factor;
                let insurance_cost = insurance_base * om_factor;
                let net_cash_flow = energy_income - om_cost - insurance_cost - replacement_cost;
                cumulative += net_cash_flow;
                YearlyProjection {
                    year,
                    energy_yield_kwh: annual_yield_kwh * degradation,
                    energy_income,
                    om_cost,
                    insurance_cost,
                    replacement_cost,
                    net_cash_flow,
                    cumulative_cash_flow: cumulative,
                }
            })
            .collect()
    }

    /// Derives the headline metrics from a table built by [`Self::project`].
    pub fn summarize(
        &self,
        system_cost: f64,
        annual_savings: f64,
        projection: &[YearlyProjection],
    ) -> FinancialSummary {
        let p = self.params;
        let flows: Vec<f64> = projection.iter().map(|y| y.net_cash_flow).collect();
        let costs: Vec<f64> = projection
            .iter()
            .map(|y| y.om_cost + y.insurance_cost + y.replacement_cost)
            .collect();
        let energy: Vec<f64> = projection.iter().map(|y| y.energy_yield_kwh).collect();

        FinancialSummary {
            system_cost,
            annual_savings,
            payback_years: payback_years(system_cost, &flows),
            roi_pct: roi_pct(system_cost, &flows),
            npv: npv(p.discount_rate, system_cost, &flows),
            irr: irr(system_cost, &flows, &self.solver),
            mirr: mirr(system_cost, &flows, p.finance_rate, p.reinvestment_rate),
            lcoe: lcoe(system_cost, &costs, &energy, p.lcoe_discount_rate),
        }
    }
}
