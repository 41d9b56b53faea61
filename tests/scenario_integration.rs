//! Integration tests for presets, scenario comparison and file exports.

mod common;

use std::fs;

use pv_bess_sim::config::ScenarioConfig;
use pv_bess_sim::io::export::{HOURS_HEADER, export_hours_csv, export_projection_csv};
use pv_bess_sim::io::snapshot::{export_snapshot, flatten};
use pv_bess_sim::scenario::{ScenarioOutcome, compare, strategy_variants};
use pv_bess_sim::sim::dispatch::Strategy;
use pv_bess_sim::sim::types::{HOURS_PER_DAY, HOURS_PER_YEAR, TouPeriod};

fn peak_period_import(outcome: &ScenarioOutcome) -> f64 {
    outcome
        .annual
        .hours()
        .iter()
        .filter(|h| h.tou_period == TouPeriod::Peak)
        .map(|h| h.grid_import_kw)
        .fold(0.0, f64::max)
}

#[test]
fn every_preset_runs_a_balanced_year() {
    for name in ScenarioConfig::PRESETS {
        let config = ScenarioConfig::from_preset(name).unwrap();
        assert!(config.validate().is_empty(), "{name} invalid");
        let outcome = config.build().unwrap().run().unwrap();
        assert_eq!(outcome.annual.hours().len(), HOURS_PER_YEAR, "{name}");
        common::assert_balanced(outcome.annual.hours());
        common::assert_soc_within(outcome.annual.hours(), &config.battery);
        assert!(outcome.summary.system_cost > 0.0);
    }
}

#[test]
fn unknown_preset_lists_alternatives() {
    let err = ScenarioConfig::from_preset("nope").unwrap_err();
    assert_eq!(err.field, "preset");
    assert!(err.message.contains("peak_shaving"));
}

#[test]
fn compare_keeps_input_order() {
    let scenario = ScenarioConfig::baseline().build().unwrap();
    let variants = strategy_variants(&scenario);
    assert_eq!(variants.len(), Strategy::ALL.len() + 1);

    let outcomes = compare(&variants);
    assert_eq!(outcomes.len(), variants.len());
    for (variant, outcome) in variants.iter().zip(&outcomes) {
        let outcome = outcome.as_ref().unwrap();
        assert_eq!(outcome.label, variant.label);
        assert_eq!(outcome.strategy, variant.dispatch.strategy());
    }

    let sequential = variants[0].run().unwrap();
    assert_eq!(outcomes[0].as_ref().unwrap().annual, sequential.annual);
}

#[test]
fn no_battery_variant_never_cycles() {
    let scenario = ScenarioConfig::baseline().build().unwrap();
    let outcome = scenario.without_battery().run().unwrap();
    assert_eq!(outcome.size.battery_kwh, 0.0);
    assert_eq!(outcome.annual.battery_throughput_kwh, 0.0);
    assert!(
        outcome
            .annual
            .hours()
            .iter()
            .all(|h| h.battery_charge_kw == 0.0 && h.battery_discharge_kw == 0.0)
    );
}

#[test]
fn peak_shaving_lowers_peak_period_import() {
    let scenario = ScenarioConfig::peak_shaving().build().unwrap();
    let shaved = scenario.run().unwrap();
    let bare = scenario.without_battery().run().unwrap();
    assert!(peak_period_import(&shaved) <= peak_period_import(&bare) + 1e-9);
}

#[test]
fn representative_day_covers_24_hours() {
    let scenario = ScenarioConfig::baseline().build().unwrap();
    let day = scenario.representative_day(180).unwrap();
    assert_eq!(day.hours().len(), HOURS_PER_DAY);
    assert_eq!(day.hours()[0].index, 180 * HOURS_PER_DAY);
    common::assert_balanced(day.hours());

    assert!(scenario.representative_day(365).is_err());
}

#[test]
fn exports_write_expected_files() {
    let outcome = ScenarioConfig::baseline().build().unwrap().run().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let hours_path = dir.path().join("hours.csv");
    export_hours_csv(outcome.annual.hours(), &hours_path).unwrap();
    let hours = fs::read_to_string(&hours_path).unwrap();
    let mut lines = hours.lines();
    assert_eq!(lines.next(), Some(HOURS_HEADER));
    assert_eq!(lines.count(), HOURS_PER_YEAR);

    let projection_path = dir.path().join("projection.csv");
    export_projection_csv(&outcome.projection, &projection_path).unwrap();
    let projection = fs::read_to_string(&projection_path).unwrap();
    assert_eq!(
        projection.lines().count(),
        outcome.projection.len() + 1
    );

    let snapshot_path = dir.path().join("snapshot.json");
    export_snapshot(&flatten(&outcome).unwrap(), &snapshot_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert_eq!(json["label"], "baseline");
    assert!(json.get("summary.npv").is_some());
}

#[test]
fn snapshot_carries_every_hour() {
    let outcome = ScenarioConfig::baseline().build().unwrap().run().unwrap();
    let snapshot = flatten(&outcome).unwrap();
    let last = HOURS_PER_YEAR - 1;
    let record = &outcome.annual.hours()[last];

    assert_eq!(
        snapshot[&format!("annual.hours.{last}.grid_import_kw")],
        serde_json::json!(record.grid_import_kw)
    );
    assert_eq!(
        snapshot[&format!("annual.hours.{last}.index")],
        serde_json::json!(last)
    );
    assert!(!snapshot.contains_key(&format!("annual.hours.{HOURS_PER_YEAR}.index")));
    assert_eq!(
        snapshot[&format!("generation.ac_kw.{last}")],
        serde_json::json!(outcome.generation.ac_kw[last])
    );
    assert!(snapshot.values().all(|v| !v.is_object() && !v.is_array()));
}
