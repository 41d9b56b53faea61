//! Annual hourly simulation of a grid-connected PV and battery system.
//!
//! A [`scenario::Scenario`] wires a site load, a solar model, a battery and a
//! dispatch strategy through 8,760 hourly steps, bills the resulting grid
//! exchange against a time-of-use tariff and projects the savings over the
//! project life.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod error;
pub mod finance;
pub mod io;
pub mod profiles;
pub mod scenario;
/// Hourly dispatch engine, battery model and tariff calendar.
pub mod sim;
pub mod tariff;
