//! Discounted cash-flow metrics.
//!
//! Flows are indexed by project year: `flows[0]` is year 1. The initial cost
//! is paid at year 0.

use super::root::NewtonRaphson;

fn discount(rate: f64, year: usize) -> f64 {
    (1.0 + rate).powi(year as i32)
}

/// Net present value: `-initial_cost + sum(flow_t / (1 + rate)^t)`.
pub fn npv(rate: f64, initial_cost: f64, flows: &[f64]) -> f64 {
    flows
        .iter()
        .zip(1..)
        .map(|(flow, t)| flow / discount(rate, t))
        .sum::<f64>()
        - initial_cost
}

/// Derivative of [`npv`] with respect to the rate.
fn npv_slope(rate: f64, flows: &[f64]) -> f64 {
    flows
        .iter()
        .zip(1..)
        .map(|(flow, t)| -(t as f64) * flow / discount(rate, t + 1))
        .sum()
}

/// Internal rate of return, the rate at which [`npv`] is zero.
///
/// Returns `None` when the flows never change sign or the solver does not
/// converge to a rate above -100 %.
pub fn irr(initial_cost: f64, flows: &[f64], solver: &NewtonRaphson) -> Option<f64> {
    let has_outflow = initial_cost > 0.0 || flows.iter().any(|&f| f < 0.0);
    let has_inflow = initial_cost < 0.0 || flows.iter().any(|&f| f > 0.0);
    if !(has_outflow && has_inflow) {
        return None;
    }
    solver
        .solve(|r| npv(r, initial_cost, flows), |r| npv_slope(r, flows))
        .ok()
        .map(|root| root.value)
        .filter(|&r| r > -1.0)
}

/// Modified IRR: `(FV(inflows at reinvestment rate) / PV(outflows at finance
/// rate))^(1/N) - 1`.
///
/// Returns `None` when there are no inflows, no outflows, or no years.
pub fn mirr(
    initial_cost: f64,
    flows: &[f64],
    finance_rate: f64,
    reinvestment_rate: f64,
) -> Option<f64> {
    let n = flows.len();
    if n == 0 {
        return None;
    }
    let all = std::iter::once(-initial_cost).chain(flows.iter().copied());
    let (pv_out, fv_in) = all
        .enumerate()
        .fold((0.0, 0.0), |(pv_out, fv_in), (t, flow)| {
            if flow < 0.0 {
                (pv_out - flow / discount(finance_rate, t), fv_in)
            } else {
                (pv_out, fv_in + flow * discount(reinvestment_rate, n - t))
            }
        });
    if pv_out <= 0.0 || fv_in <= 0.0 {
        return None;
    }
    Some((fv_in / pv_out).powf(1.0 / n as f64) - 1.0)
}

/// Levelized cost of energy: discounted lifetime cost over discounted
/// lifetime energy, both at `rate`.
///
/// `costs` and `energy_kwh` are per project year. Returns `None` when no
/// energy is produced.
pub fn lcoe(capital: f64, costs: &[f64], energy_kwh: &[f64], rate: f64) -> Option<f64> {
    let discounted = |values: &[f64]| -> f64 {
        values
            .iter()
            .zip(1..)
            .map(|(v, t)| v / discount(rate, t))
            .sum()
    };
    let energy = discounted(energy_kwh);
    (energy > 0.0).then(|| (capital + discounted(costs)) / energy)
}

/// Years until cumulative cash flow first reaches zero, linearly
/// interpolated within that year.
///
/// Zero or negative cost pays back immediately. `None` means beyond the
/// project life.
pub fn payback_years(initial_cost: f64, flows: &[f64]) -> Option<f64> {
    if initial_cost <= 0.0 {
        return Some(0.0);
    }
    let mut cumulative = -initial_cost;
    for (year, &flow) in flows.iter().enumerate() {
        let before = cumulative;
        cumulative += flow;
        if cumulative >= 0.0 {
            return Some(year as f64 + -before / flow);
        }
    }
    None
}

/// Return on investment over the project life (%).
pub fn roi_pct(initial_cost: f64, flows: &[f64]) -> f64 {
    if initial_cost <= 0.0 {
        return 0.0;
    }
    (flows.iter().sum::<f64>() - initial_cost) / initial_cost * 100.0
}
