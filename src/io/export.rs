//! CSV export of hourly records and the cash-flow projection.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::finance::projection::YearlyProjection;
use crate::sim::types::HourRecord;

/// Column header of the hourly export.
pub const HOURS_HEADER: &str = "hour,load_kw,solar_kw,battery_charge_kw,\
                                battery_discharge_kw,soc_fraction,grid_import_kw,\
                                grid_export_kw,season,day_type,tou_period";

/// Column header of the projection export.
pub const PROJECTION_HEADER: &str = "year,energy_yield_kwh,energy_income,om_cost,\
                                     insurance_cost,replacement_cost,net_cash_flow,\
                                     cumulative_cash_flow";

fn header(columns: &str) -> impl Iterator<Item = &str> {
    columns.split(',').map(str::trim)
}

/// Exports hourly records to a CSV file at the given path.
///
/// # Arguments
///
/// * `hours` - Records of a completed run
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_hours_csv(hours: &[HourRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_hours_csv(hours, io::BufWriter::new(file))
}

/// Writes hourly records as CSV to any writer.
///
/// One header row, then one row per hour in run order. Identical input
/// produces identical bytes.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_hours_csv(hours: &[HourRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(HOURS_HEADER))?;
    for h in hours {
        wtr.write_record(&[
            h.index.to_string(),
            format!("{:.4}", h.load_kw),
            format!("{:.4}", h.solar_kw),
            format!("{:.4}", h.battery_charge_kw),
            format!("{:.4}", h.battery_discharge_kw),
            format!("{:.4}", h.soc_fraction),
            format!("{:.4}", h.grid_import_kw),
            format!("{:.4}", h.grid_export_kw),
            h.season.key().to_string(),
            h.day_type.key().to_string(),
            h.tou_period.key().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Exports the yearly cash-flow table to a CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_projection_csv(projection: &[YearlyProjection], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_projection_csv(projection, io::BufWriter::new(file))
}

/// Writes the yearly cash-flow table as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_projection_csv(projection: &[YearlyProjection], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header(PROJECTION_HEADER))?;
    for y in projection {
        wtr.write_record(&[
            y.year.to_string(),
            format!("{:.2}", y.energy_yield_kwh),
            format!("{:.2}", y.energy_income),
            format!("{:.2}", y.om_cost),
            format!("{:.2}", y.insurance_cost),
            format!("{:.2}", y.replacement_cost),
            format!("{:.2}", y.net_cash_flow),
            format!("{:.2}", y.cumulative_cash_flow),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
