//! Financial projection: cash flows, NPV, IRR, MIRR, LCOE and payback.

pub mod metrics;
pub mod projection;
pub mod root;
