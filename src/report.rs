use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use pv_bess_sim::scenario::ScenarioOutcome;
use pv_bess_sim::sim::types::{HourRecord, TouPeriod};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table
}

fn number(value: f64, decimals: usize) -> Cell {
    Cell::new(format!("{value:.decimals$}")).set_alignment(CellAlignment::Right)
}

fn optional(value: Option<f64>, decimals: usize, suffix: &str) -> Cell {
    match value {
        Some(v) => Cell::new(format!("{v:.decimals$}{suffix}")).set_alignment(CellAlignment::Right),
        None => Cell::new("n/a").set_alignment(CellAlignment::Right).add_attribute(Attribute::Dim),
    }
}

/// One row per outcome, ranked as given.
pub fn build_comparison_table(outcomes: &[ScenarioOutcome]) -> Table {
    let best_npv = outcomes.iter().map(|o| o.summary.npv).fold(f64::NEG_INFINITY, f64::max);

    let mut table = new_table();
    table.set_header(vec![
        "Scenario",
        "Import kWh",
        "Export kWh",
        "Self-cons. %",
        "Peak import kW",
        "Bill",
        "Savings",
        "Payback y",
        "NPV",
        "IRR",
    ]);
    for outcome in outcomes {
        let annual = &outcome.annual;
        let summary = &outcome.summary;
        table.add_row(vec![
            Cell::new(&outcome.label),
            number(annual.total_grid_import_kwh, 0),
            number(annual.total_grid_export_kwh, 0),
            number(annual.self_consumption_pct, 1),
            number(annual.peak_grid_import_kw, 1),
            number(outcome.system_bill.total, 0),
            number(summary.annual_savings, 0).fg(if summary.annual_savings > 0.0 {
                Color::Green
            } else {
                Color::Red
            }),
            optional(summary.payback_years, 1, ""),
            number(summary.npv, 0).fg(if summary.npv >= best_npv {
                Color::Green
            } else {
                Color::Reset
            }),
            optional(summary.irr.map(|r| r * 100.0), 1, " %"),
        ]);
    }
    table
}

/// The hourly dispatch of one day.
pub fn build_day_table(hours: &[HourRecord]) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Hour", "Period", "Load", "Solar", "Charge", "Discharge", "SoC %", "Import", "Export",
    ]);
    for h in hours {
        table.add_row(vec![
            Cell::new(format!("{:02}:00", h.index % 24)),
            Cell::new(h.tou_period.key()).fg(match h.tou_period {
                TouPeriod::Peak => Color::Red,
                TouPeriod::Standard => Color::DarkYellow,
                TouPeriod::OffPeak => Color::Green,
            }),
            number(h.load_kw, 1),
            number(h.solar_kw, 1),
            number(h.battery_charge_kw, 1),
            number(h.battery_discharge_kw, 1),
            number(h.soc_fraction * 100.0, 0),
            number(h.grid_import_kw, 1),
            number(h.grid_export_kw, 1).add_attribute(Attribute::Dim),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use pv_bess_sim::config::ScenarioConfig;

    use super::*;

    #[test]
    fn day_table_has_24_rows() {
        let scenario = ScenarioConfig::baseline().build().unwrap();
        let day = scenario.representative_day(10).unwrap();
        let table = build_day_table(day.hours());
        assert_eq!(table.row_count(), 24);
        let rendered = table.to_string();
        assert!(rendered.contains("00:00"));
        assert!(rendered.contains("23:00"));
    }

    #[test]
    fn comparison_lists_every_outcome() {
        let outcomes: Vec<_> = ["baseline", "solar_only"]
            .iter()
            .map(|name| ScenarioConfig::from_preset(name).unwrap().build().unwrap().run().unwrap())
            .collect();
        let table = build_comparison_table(&outcomes);
        assert_eq!(table.row_count(), 2);
        let rendered = table.to_string();
        for outcome in &outcomes {
            assert!(rendered.contains(&outcome.label));
        }
    }
}
