//! Monthly bills from hourly grid exchange.

use std::fmt;

use serde::Serialize;

use crate::sim::calendar::TouCalendar;
use crate::sim::types::HourRecord;

use super::structure::TariffStructure;

/// One billing month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBill {
    /// Calendar month, 1..=12.
    pub month: u32,
    pub import_kwh: f64,
    pub export_kwh: f64,
    /// Highest hourly grid import of the month (kW).
    pub peak_import_kw: f64,
    pub peak_kva: f64,
    pub fixed_charge: f64,
    pub demand_charge: f64,
    pub network_charge: f64,
    pub energy_charge: f64,
    pub export_credit: f64,
    /// Charges minus export credit.
    pub total: f64,
}

/// Twelve monthly bills and their totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualBill {
    pub months: Vec<MonthlyBill>,
    /// Highest import of the year in kVA, the utilised capacity.
    pub annual_peak_kva: f64,
    pub energy_charge: f64,
    pub demand_charge: f64,
    pub network_charge: f64,
    pub fixed_charge: f64,
    pub export_credit: f64,
    pub total: f64,
}

impl fmt::Display for AnnualBill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Energy:       {:>14.2}", self.energy_charge)?;
        writeln!(f, "Demand:       {:>14.2}", self.demand_charge)?;
        writeln!(f, "Network:      {:>14.2}", self.network_charge)?;
        writeln!(f, "Fixed:        {:>14.2}", self.fixed_charge)?;
        writeln!(f, "Export credit:{:>14.2}", -self.export_credit)?;
        write!(f, "Total:        {:>14.2}", self.total)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct MonthTally {
    import_kwh: f64,
    export_kwh: f64,
    peak_import_kw: f64,
    energy_charge: f64,
}

/// Prices hourly grid exchange under one tariff and calendar.
#[derive(Debug, Clone, Copy)]
pub struct GridAccountant<'a> {
    tariff: &'a TariffStructure,
    calendar: &'a TouCalendar,
}

impl<'a> GridAccountant<'a> {
    pub const fn new(tariff: &'a TariffStructure, calendar: &'a TouCalendar) -> Self {
        Self { tariff, calendar }
    }

    /// Bills the post-battery grid exchange of a run.
    pub fn bill(&self, hours: &[HourRecord]) -> AnnualBill {
        self.bill_flows(
            hours
                .iter()
                .map(|h| (h.index, h.grid_import_kw, h.grid_export_kw)),
        )
    }

    /// Bills the bare load, as if the site had no solar and no battery.
    pub fn baseline_bill(&self, load_kw: &[f64]) -> AnnualBill {
        self.bill_flows(load_kw.iter().enumerate().map(|(i, &kw)| (i, kw, 0.0)))
    }

    fn bill_flows(&self, flows: impl Iterator<Item = (usize, f64, f64)>) -> AnnualBill {
        let mut tally = [MonthTally::default(); 12];
        for (index, import_kw, export_kw) in flows {
            let month = &mut tally[(self.calendar.month_of(index) - 1) as usize];
            let rate = self.tariff.energy_rates.rate(self.calendar.classify(index));
            month.import_kwh += import_kw;
            month.export_kwh += export_kw;
            month.peak_import_kw = month.peak_import_kw.max(import_kw);
            month.energy_charge += import_kw * rate;
        }

        let annual_peak_kw = tally.iter().map(|m| m.peak_import_kw).fold(0.0, f64::max);
        let annual_peak_kva = self.tariff.kva(annual_peak_kw);
        let network_charge = annual_peak_kva * self.tariff.network_access_charge_per_kva;

        let months: Vec<MonthlyBill> = tally
            .iter()
            .zip(1..)
            .map(|(m, month)| {
                let peak_kva = self.tariff.kva(m.peak_import_kw);
                let demand_charge = peak_kva * self.tariff.demand_charge_per_kva;
                let export_credit = m.export_kwh * self.tariff.export_rate;
                let fixed_charge = self.tariff.fixed_monthly_charge;
                MonthlyBill {
                    month,
                    import_kwh: m.import_kwh,
                    export_kwh: m.export_kwh,
                    peak_import_kw: m.peak_import_kw,
                    peak_kva,
                    fixed_charge,
                    demand_charge,
                    network_charge,
                    energy_charge: m.energy_charge,
                    export_credit,
                    total: fixed_charge + demand_charge + network_charge + m.energy_charge
                        - export_credit,
                }
            })
            .collect();

        let sum = |f: fn(&MonthlyBill) -> f64| months.iter().map(f).sum::<f64>();
        AnnualBill {
            annual_peak_kva,
            energy_charge: sum(|m| m.energy_charge),
            demand_charge: sum(|m| m.demand_charge),
            network_charge: sum(|m| m.network_charge),
            fixed_charge: sum(|m| m.fixed_charge),
            export_credit: sum(|m| m.export_credit),
            total: sum(|m| m.total),
            months,
        }
    }
}

/// Baseline bill total minus system bill total.
pub fn annual_savings(baseline: &AnnualBill, system: &AnnualBill) -> f64 {
    baseline.total - system.total
}
