//! Profile lengths: one representative day or the full reference year.

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::sim::types::{HOURS_PER_DAY, HOURS_PER_YEAR};

/// Length of an hourly profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    Day,
    #[default]
    Year,
}

impl Horizon {
    pub const fn hours(self) -> usize {
        match self {
            Self::Day => HOURS_PER_DAY,
            Self::Year => HOURS_PER_YEAR,
        }
    }

    /// The shortest horizon that holds every profile length given.
    pub fn covering(lengths: &[usize]) -> Self {
        if lengths.iter().any(|&len| len > HOURS_PER_DAY) {
            Self::Year
        } else {
            Self::Day
        }
    }
}

/// Repeats a 24-value curve across the reference year.
pub fn tile_day(day: &[f64]) -> Vec<f64> {
    day.iter().copied().cycle().take(HOURS_PER_YEAR).collect()
}

/// Checks that every value is finite and non-negative.
///
/// # Errors
///
/// Returns the first offending index as a `ProfileError`.
pub fn check_values(values: &[f64], profile: &str) -> Result<(), ProfileError> {
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(ProfileError::NonFinite {
                profile: profile.to_string(),
                index,
            });
        }
        if value < 0.0 {
            return Err(ProfileError::Negative {
                profile: profile.to_string(),
                index,
                value,
            });
        }
    }
    Ok(())
}

/// Brings a profile to the requested horizon.
///
/// An empty profile becomes all zeros and a 24-value profile is tiled to fill
/// a year.
///
/// # Errors
///
/// Returns a `ProfileError` for any other length or for negative or non-finite
/// values.
pub fn fit_to_horizon(
    values: &[f64],
    horizon: Horizon,
    profile: &str,
) -> Result<Vec<f64>, ProfileError> {
    check_values(values, profile)?;
    let expected = horizon.hours();
    match values.len() {
        0 => Ok(vec![0.0; expected]),
        len if len == expected => Ok(values.to_vec()),
        HOURS_PER_DAY if horizon == Horizon::Year => Ok(tile_day(values)),
        len => Err(ProfileError::Length {
            profile: profile.to_string(),
            len,
            expected,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covering_picks_year_for_long_profiles() {
        assert_eq!(Horizon::covering(&[24, 0]), Horizon::Day);
        assert_eq!(Horizon::covering(&[24, 8760]), Horizon::Year);
        assert_eq!(Horizon::covering(&[]), Horizon::Day);
    }

    #[test]
    fn empty_profile_becomes_zeros() {
        let v = fit_to_horizon(&[], Horizon::Day, "solar").unwrap();
        assert_eq!(v, vec![0.0; 24]);
    }

    #[test]
    fn day_profile_is_tiled_to_year() {
        let day: Vec<f64> = (0..24).map(f64::from).collect();
        let year = fit_to_horizon(&day, Horizon::Year, "load").unwrap();
        assert_eq!(year.len(), HOURS_PER_YEAR);
        assert_eq!(year[24 * 100 + 13], 13.0);
    }

    #[test]
    fn year_profile_cannot_shrink_to_day() {
        let err = fit_to_horizon(&vec![1.0; HOURS_PER_YEAR], Horizon::Day, "load").unwrap_err();
        assert!(matches!(err, ProfileError::Length { expected: 24, .. }));
    }

    #[test]
    fn odd_length_rejected() {
        let err = fit_to_horizon(&[1.0; 48], Horizon::Year, "load").unwrap_err();
        assert_eq!(
            err.to_string(),
            "load: expected 8760 values, got 48"
        );
    }

    #[test]
    fn negative_and_nan_rejected() {
        assert!(matches!(
            fit_to_horizon(&[1.0, -2.0], Horizon::Day, "x"),
            Err(ProfileError::Negative { index: 1, .. })
        ));
        assert!(matches!(
            fit_to_horizon(&[f64::NAN], Horizon::Day, "x"),
            Err(ProfileError::NonFinite { index: 0, .. })
        ));
    }
}
