//! Integration tests for the multi-year financial projection.

mod common;

use approx::assert_relative_eq;
use pv_bess_sim::finance::metrics::npv;
use pv_bess_sim::finance::projection::{FinanceParams, FinancialProjector, Replacement};
use pv_bess_sim::finance::root::NewtonRaphson;

/// No running costs, no escalation, no degradation.
fn flat_params() -> FinanceParams {
    FinanceParams {
        om_pct: 0.0,
        insurance_pct: 0.0,
        tariff_escalation_pct: 0.0,
        om_escalation_pct: 0.0,
        degradation_pct: 0.0,
        ..FinanceParams::default()
    }
}

#[test]
fn flat_savings_pay_back_in_cost_over_savings() {
    let params = flat_params();
    let projector = FinancialProjector::new(&params);
    let projection = projector.project(100_000.0, 25_000.0, 150_000.0);
    let summary = projector.summarize(100_000.0, 25_000.0, &projection);

    assert_eq!(projection.len(), 25);
    assert_relative_eq!(summary.payback_years.unwrap(), 4.0, epsilon = 1e-9);
    assert_relative_eq!(
        projection.last().unwrap().cumulative_cash_flow,
        25.0 * 25_000.0 - 100_000.0,
        epsilon = 1e-6
    );
    assert_relative_eq!(summary.roi_pct, 525.0, epsilon = 1e-9);
}

#[test]
fn npv_at_irr_is_zero() {
    let params = FinanceParams::default();
    let projector = FinancialProjector::new(&params);
    let projection = projector.project(2_500_000.0, 400_000.0, 160_000.0);
    let summary = projector.summarize(2_500_000.0, 400_000.0, &projection);

    let irr = summary.irr.unwrap();
    let flows: Vec<f64> = projection.iter().map(|y| y.net_cash_flow).collect();
    assert!(npv(irr, 2_500_000.0, &flows).abs() < 1e-2);
    assert!(summary.mirr.unwrap() < irr);
}

#[test]
fn tighter_solver_still_finds_irr() {
    let params = flat_params();
    let solver = NewtonRaphson::new()
        .with_initial_guess(0.05)
        .with_tolerance(1e-12)
        .with_max_iterations(200);
    let projector = FinancialProjector::new(&params).with_solver(solver);
    let projection = projector.project(100_000.0, 25_000.0, 0.0);
    let summary = projector.summarize(100_000.0, 25_000.0, &projection);
    let flows: Vec<f64> = projection.iter().map(|y| y.net_cash_flow).collect();
    assert!(npv(summary.irr.unwrap(), 100_000.0, &flows).abs() < 1e-3);
    // No generation, no levelized cost.
    assert!(summary.lcoe.is_none());
}

#[test]
fn savings_that_never_cover_costs_have_no_payback() {
    let params = FinanceParams {
        project_years: 10,
        ..flat_params()
    };
    let projector = FinancialProjector::new(&params);
    let projection = projector.project(100_000.0, 5_000.0, 10_000.0);
    let summary = projector.summarize(100_000.0, 5_000.0, &projection);
    assert!(summary.payback_years.is_none());
    assert!(summary.npv < 0.0);
    assert!(summary.irr.is_none_or(|r| r < 0.0));
}

#[test]
fn replacement_lands_in_its_year() {
    let params = FinanceParams {
        replacements: vec![Replacement {
            year: 12,
            cost: 40_000.0,
            label: "inverter".to_string(),
        }],
        ..flat_params()
    };
    let projector = FinancialProjector::new(&params);
    let projection = projector.project(100_000.0, 25_000.0, 0.0);
    for row in &projection {
        let expected = if row.year == 12 { 40_000.0 } else { 0.0 };
        assert_relative_eq!(row.replacement_cost, expected);
    }
    assert_relative_eq!(projection[11].net_cash_flow, -15_000.0);
}

#[test]
fn scenario_projection_uses_system_cost() {
    let scenario = common::flat_site(40.0, 60.0, common::battery_100kwh());
    let outcome = scenario.run().unwrap();
    let expected_cost = scenario.finance.system_cost(&outcome.size);
    assert_relative_eq!(outcome.summary.system_cost, expected_cost);
    assert_eq!(
        outcome.projection.len(),
        scenario.finance.project_years as usize
    );
    assert_relative_eq!(
        outcome.projection[0].energy_yield_kwh,
        outcome.generation.total_ac_kwh(),
        epsilon = 1e-6
    );
}
