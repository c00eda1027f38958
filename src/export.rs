//! Flat CSV export of per-shot batch results.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Column order of the exported CSV.
pub const CSV_HEADER: &str = "x0,y0,vx,vy,v_true,theta_true,tof_v_est,friend_v_est,ratio";

/// One row of the batch results CSV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotRow {
    /// Initial x.
    pub x0: f64,
    /// Initial y.
    pub y0: f64,
    /// Velocity along x.
    pub vx: f64,
    /// Lateral velocity.
    pub vy: f64,
    /// True speed.
    pub v_true: f64,
    /// True heading, radians.
    pub theta_true: f64,
    /// Time-of-flight estimate; NaN on failure.
    pub tof_v_est: f64,
    /// Friend estimate; NaN on failure.
    pub friend_v_est: f64,
    /// Block-duration ratio from the friend estimator; NaN if it failed early.
    pub ratio: f64,
}

impl ShotRow {
    fn fields(&self) -> [f64; 9] {
        [
            self.x0,
            self.y0,
            self.vx,
            self.vy,
            self.v_true,
            self.theta_true,
            self.tof_v_est,
            self.friend_v_est,
            self.ratio,
        ]
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        value.to_string()
    }
}

fn write_rows(out: &mut impl Write, rows: &[ShotRow]) -> std::io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for row in rows {
        let line: Vec<String> = row.fields().into_iter().map(format_value).collect();
        writeln!(out, "{}", line.join(","))?;
    }
    out.flush()
}

/// Write batch rows to a CSV file, header first.
pub fn write_results_csv(path: &Path, rows: &[ShotRow]) -> Result<(), ExportError> {
    let to_export_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_export_error)?;
    write_rows(&mut BufWriter::new(file), rows).map_err(to_export_error)
}
