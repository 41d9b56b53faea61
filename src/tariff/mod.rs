//! Grid and tariff accounting.

pub mod billing;
pub mod structure;
