//! Hourly input profiles: site load and solar generation.

pub mod horizon;
pub mod load;
pub mod solar;
