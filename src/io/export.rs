//! CSV export of per-step energy flows.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepRecord;

/// Column header of the flow export.
const HEADER: &str = "step,hour,load_kwh,pv_kwh,import_kwh,export_kwh,soc_kwh";

/// Writes flow records to a CSV file at `path`.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_flows_csv(records: &[StepRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_flows_csv(records, io::BufWriter::new(file))
}

/// Writes flow records as CSV to any writer.
///
/// One header row, then one row per step. Output is deterministic for
/// identical records.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_flows_csv(records: &[StepRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(','))?;

    for r in records {
        wtr.write_record(&[
            r.step.to_string(),
            format!("{:.2}", r.hour),
            format!("{:.4}", r.load_kwh),
            format!("{:.4}", r.pv_kwh),
            format!("{:.4}", r.import_kwh),
            format!("{:.4}", r.export_kwh),
            format!("{:.4}", r.soc_kwh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
