pub mod annual;
pub mod battery;
/// Tariff season, day-type and period classification.
pub mod calendar;
/// Strategy selection and per-hour charge/discharge decisions.
pub mod dispatch;
pub mod engine;
pub mod power_balance;
pub mod types;
