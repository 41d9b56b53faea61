//! Site load curve synthesized from per-tenant sources.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProfileError;
use crate::sim::types::{DAYS_PER_YEAR, HOURS_PER_DAY};

use super::horizon::{Horizon, check_values, fit_to_horizon};

/// Shape data carried by one meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum MeterShape {
    /// 24 hourly shares of the day's energy (any positive total).
    DailyPercent { percent: Vec<f64>, daily_kwh: f64 },
    /// Measured kW, 24 or 8,760 values.
    Hourly { kw: Vec<f64> },
}

/// One measured source assigned to a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeterSource {
    pub name: String,
    pub shape: MeterShape,
    /// Floor area the measurement was taken over.
    #[serde(default)]
    pub floor_area_m2: Option<f64>,
    /// Relative weight when a tenant has several meters.
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Default shape and consumption rate for a tenant category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryProfile {
    pub name: String,
    /// 24 hourly shares of the day's energy. Empty means flat.
    #[serde(default)]
    pub percent: Vec<f64>,
    /// Monthly consumption per floor area (kWh/m2).
    pub monthly_kwh_per_m2: f64,
}

/// A tenant of the site.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tenant {
    pub name: String,
    #[serde(default)]
    pub floor_area_m2: Option<f64>,
    #[serde(default)]
    pub meters: Vec<MeterSource>,
    #[serde(default)]
    pub category: Option<CategoryProfile>,
    /// Daily energy override (kWh) for category and flat profiles.
    #[serde(default)]
    pub daily_kwh: Option<f64>,
}

/// `tenant_area / source_area`, or 1 when either area is unknown or zero.
pub fn area_ratio(tenant_area: Option<f64>, source_area: Option<f64>) -> f64 {
    match (tenant_area, source_area) {
        (Some(t), Some(s)) if t > 0.0 && s > 0.0 => t / s,
        _ => 1.0,
    }
}

/// Turns a percentage-of-day curve into 24 kW values for `daily_kwh`.
///
/// The curve is normalized by its own sum. An empty or all-zero curve yields
/// `None`.
fn percent_to_kw(
    percent: &[f64],
    daily_kwh: f64,
    profile: &str,
) -> Result<Option<Vec<f64>>, ProfileError> {
    if percent.is_empty() {
        return Ok(None);
    }
    check_values(percent, profile)?;
    if percent.len() != HOURS_PER_DAY {
        return Err(ProfileError::Length {
            profile: profile.to_string(),
            len: percent.len(),
            expected: HOURS_PER_DAY,
        });
    }
    let total: f64 = percent.iter().sum();
    if total <= 0.0 {
        return Ok(None);
    }
    Ok(Some(percent.iter().map(|p| p / total * daily_kwh).collect()))
}

fn meter_curve(tenant: &Tenant, meter: &MeterSource) -> Result<Option<Vec<f64>>, ProfileError> {
    let profile = format!("{}/{}", tenant.name, meter.name);
    let ratio = area_ratio(tenant.floor_area_m2, meter.floor_area_m2);
    let curve = match &meter.shape {
        MeterShape::DailyPercent { percent, daily_kwh } => {
            percent_to_kw(percent, *daily_kwh, &profile)?
        }
        MeterShape::Hourly { kw } if kw.is_empty() => None,
        MeterShape::Hourly { kw } => {
            let horizon = Horizon::covering(&[kw.len()]);
            Some(fit_to_horizon(kw, horizon, &profile)?)
        }
    };
    Ok(curve.map(|c| c.into_iter().map(|v| v * ratio).collect()))
}

/// Checks a meter weight. A missing weight counts as 1.
fn meter_weight(weight: Option<f64>, profile: &str) -> Result<f64, ProfileError> {
    match weight {
        None => Ok(1.0),
        Some(w) if w.is_finite() && w >= 0.0 => Ok(w),
        Some(value) => Err(ProfileError::Weight {
            profile: profile.to_string(),
            value,
        }),
    }
}

/// Weighted mean of meter curves with weights normalized by their total.
///
/// # Errors
///
/// Returns `ProfileError::Weight` for a negative or non-finite weight and
/// `ProfileError::WeightTotal` when the weights do not sum to a positive
/// value.
fn weighted_mean(
    curves: &[(Vec<f64>, Option<f64>)],
    profile: &str,
) -> Result<Vec<f64>, ProfileError> {
    let horizon = Horizon::covering(&curves.iter().map(|(c, _)| c.len()).collect::<Vec<_>>());
    let weights = curves
        .iter()
        .map(|(_, w)| meter_weight(*w, profile))
        .collect::<Result<Vec<_>, _>>()?;
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(ProfileError::WeightTotal {
            profile: profile.to_string(),
            total,
        });
    }

    let mut out = vec![0.0; horizon.hours()];
    for ((curve, _), weight) in curves.iter().zip(weights) {
        let fitted = fit_to_horizon(curve, horizon, profile)?;
        let share = weight / total;
        out.iter_mut().zip(fitted).for_each(|(o, v)| *o += v * share);
    }
    Ok(out)
}

/// Daily energy for a tenant without usable meter data.
fn fallback_daily_kwh(tenant: &Tenant) -> f64 {
    if let Some(daily) = tenant.daily_kwh {
        return daily;
    }
    match (&tenant.category, tenant.floor_area_m2) {
        (Some(cat), Some(area)) => cat.monthly_kwh_per_m2 * area * 12.0 / DAYS_PER_YEAR as f64,
        _ => 0.0,
    }
}

/// Hourly kW curve (24 or 8,760 values) for one tenant.
///
/// # Errors
///
/// Returns a `ProfileError` for malformed shape data or an invalid meter
/// weight. Missing shape data is not an error: the tenant falls back to a
/// flat profile.
pub fn tenant_curve(tenant: &Tenant) -> Result<Vec<f64>, ProfileError> {
    let mut curves = Vec::with_capacity(tenant.meters.len());
    for meter in &tenant.meters {
        meter_weight(meter.weight, &format!("{}/{}", tenant.name, meter.name))?;
        if let Some(curve) = meter_curve(tenant, meter)? {
            curves.push((curve, meter.weight));
        }
    }
    if !curves.is_empty() {
        return weighted_mean(&curves, &tenant.name);
    }

    let daily_kwh = fallback_daily_kwh(tenant);
    if let Some(category) = &tenant.category {
        let profile = format!("{}/{}", tenant.name, category.name);
        if let Some(curve) = percent_to_kw(&category.percent, daily_kwh, &profile)? {
            return Ok(curve);
        }
    }
    debug!(tenant = %tenant.name, daily_kwh, "no shape data, using flat profile");
    Ok(vec![daily_kwh / HOURS_PER_DAY as f64; HOURS_PER_DAY])
}

/// Sums all tenant curves into one site load curve.
///
/// The result is 8,760 values long if any tenant provides a full-year series,
/// otherwise 24. No tenants yields an empty curve.
///
/// # Errors
///
/// Returns the first tenant's `ProfileError`.
pub fn synthesize(tenants: &[Tenant]) -> Result<Vec<f64>, ProfileError> {
    let curves = tenants
        .iter()
        .map(tenant_curve)
        .collect::<Result<Vec<_>, _>>()?;
    if curves.is_empty() {
        return Ok(Vec::new());
    }
    let horizon = Horizon::covering(&curves.iter().map(Vec::len).collect::<Vec<_>>());
    let mut site = vec![0.0; horizon.hours()];
    for (tenant, curve) in tenants.iter().zip(curves) {
        let fitted = fit_to_horizon(&curve, horizon, &tenant.name)?;
        site.iter_mut().zip(fitted).for_each(|(s, v)| *s += v);
    }
    Ok(site)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::sim::types::HOURS_PER_YEAR;

    fn percent_meter(
        name: &str,
        peak_hour: usize,
        daily_kwh: f64,
        area: Option<f64>,
    ) -> MeterSource {
        let mut percent = vec![0.0; 24];
        percent[peak_hour] = 100.0;
        MeterSource {
            name: name.into(),
            shape: MeterShape::DailyPercent { percent, daily_kwh },
            floor_area_m2: area,
            weight: None,
        }
    }

    #[test]
    fn area_ratio_defaults_to_one() {
        assert_eq!(area_ratio(Some(200.0), Some(100.0)), 2.0);
        assert_eq!(area_ratio(None, Some(100.0)), 1.0);
        assert_eq!(area_ratio(Some(200.0), Some(0.0)), 1.0);
    }

    #[test]
    fn percent_curve_scaled_by_area() {
        let tenant = Tenant {
            name: "shop".into(),
            floor_area_m2: Some(500.0),
            meters: vec![percent_meter("m1", 10, 48.0, Some(250.0))],
            ..Tenant::default()
        };
        let curve = tenant_curve(&tenant).unwrap();
        assert_eq!(curve.len(), 24);
        assert_relative_eq!(curve[10], 96.0);
        assert_relative_eq!(curve.iter().sum::<f64>(), 96.0);
    }

    #[test]
    fn percent_curves_summing_to_one_or_hundred_agree() {
        let hundred = percent_to_kw(&[100.0 / 24.0; 24], 24.0, "a").unwrap().unwrap();
        let one = percent_to_kw(&[1.0 / 24.0; 24], 24.0, "b").unwrap().unwrap();
        for (a, b) in hundred.iter().zip(&one) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn meters_are_averaged_with_normalized_weights() {
        let mut a = percent_meter("a", 0, 30.0, None);
        let mut b = percent_meter("b", 0, 60.0, None);
        a.weight = Some(1.0);
        b.weight = Some(2.0);
        let tenant = Tenant {
            name: "t".into(),
            meters: vec![a.clone(), b.clone()],
            ..Tenant::default()
        };
        // (30 x 1 + 60 x 2) / 3
        assert_relative_eq!(tenant_curve(&tenant).unwrap()[0], 50.0);

        a.weight = None;
        b.weight = None;
        let equal = Tenant {
            meters: vec![a, b],
            ..tenant
        };
        assert_relative_eq!(tenant_curve(&equal).unwrap()[0], 45.0);
    }

    #[test]
    fn negative_meter_weight_is_rejected() {
        let mut a = percent_meter("a", 0, 10.0, None);
        let mut b = percent_meter("b", 0, 30.0, None);
        a.weight = Some(-5.0);
        b.weight = Some(1.0);
        let tenant = Tenant {
            name: "t".into(),
            meters: vec![a, b.clone()],
            ..Tenant::default()
        };
        let err = tenant_curve(&tenant).unwrap_err();
        assert_eq!(
            err,
            ProfileError::Weight {
                profile: "t/a".into(),
                value: -5.0
            }
        );

        let mut nan = percent_meter("n", 0, 10.0, None);
        nan.weight = Some(f64::NAN);
        let tenant = Tenant {
            meters: vec![nan, b],
            ..tenant
        };
        assert!(matches!(
            tenant_curve(&tenant),
            Err(ProfileError::Weight { .. })
        ));
    }

    #[test]
    fn zero_weight_total_is_rejected() {
        let mut a = percent_meter("a", 0, 10.0, None);
        let mut b = percent_meter("b", 0, 30.0, None);
        a.weight = Some(0.0);
        b.weight = Some(0.0);
        let tenant = Tenant {
            name: "t".into(),
            meters: vec![a, b],
            ..Tenant::default()
        };
        assert!(matches!(
            synthesize(&[tenant]),
            Err(ProfileError::WeightTotal { total, .. }) if total == 0.0
        ));
    }

    #[test]
    fn zero_weight_meter_is_ignored() {
        let mut a = percent_meter("a", 0, 10.0, None);
        let b = percent_meter("b", 0, 30.0, None);
        a.weight = Some(0.0);
        let tenant = Tenant {
            name: "t".into(),
            meters: vec![a, b],
            ..Tenant::default()
        };
        assert_relative_eq!(tenant_curve(&tenant).unwrap()[0], 30.0);
    }

    #[test]
    fn tenant_without_shape_data_is_flat() {
        let tenant = Tenant {
            name: "empty".into(),
            daily_kwh: Some(48.0),
            ..Tenant::default()
        };
        let curve = tenant_curve(&tenant).unwrap();
        assert!(curve.iter().all(|&v| v == 2.0));

        let nothing = Tenant {
            name: "nothing".into(),
            ..Tenant::default()
        };
        assert_eq!(tenant_curve(&nothing).unwrap(), vec![0.0; 24]);
    }

    #[test]
    fn category_rate_sets_daily_energy() {
        let tenant = Tenant {
            name: "office".into(),
            floor_area_m2: Some(365.0),
            category: Some(CategoryProfile {
                name: "office".into(),
                percent: Vec::new(),
                monthly_kwh_per_m2: 2.0,
            }),
            ..Tenant::default()
        };
        // 2 x 365 x 12 / 365 = 24 kWh/day
        let curve = tenant_curve(&tenant).unwrap();
        assert_relative_eq!(curve.iter().sum::<f64>(), 24.0, epsilon = 1e-9);
    }

    #[test]
    fn yearly_meter_makes_site_curve_yearly() {
        let yearly = Tenant {
            name: "big".into(),
            meters: vec![MeterSource {
                name: "ami".into(),
                shape: MeterShape::Hourly {
                    kw: vec![1.0; HOURS_PER_YEAR],
                },
                floor_area_m2: None,
                weight: None,
            }],
            ..Tenant::default()
        };
        let daily = Tenant {
            name: "small".into(),
            daily_kwh: Some(24.0),
            ..Tenant::default()
        };
        let site = synthesize(&[yearly, daily]).unwrap();
        assert_eq!(site.len(), HOURS_PER_YEAR);
        assert!(site.iter().all(|&v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn malformed_percent_curve_is_rejected() {
        let tenant = Tenant {
            name: "bad".into(),
            meters: vec![MeterSource {
                name: "m".into(),
                shape: MeterShape::DailyPercent {
                    percent: vec![1.0; 12],
                    daily_kwh: 10.0,
                },
                floor_area_m2: None,
                weight: None,
            }],
            ..Tenant::default()
        };
        assert!(matches!(synthesize(&[tenant]), Err(ProfileError::Length { .. })));
    }

    #[test]
    fn no_tenants_gives_empty_curve() {
        assert!(synthesize(&[]).unwrap().is_empty());
    }
}
