//! Tabular data loading
//!
//! Position and ranging recordings are comma separated tables with a header
//! row. Column names are matched literally, as written by the collection
//! tooling:
//!
//! | table    | columns                                   |
//! |----------|-------------------------------------------|
//! | position | `TagID`, `Time [s]`, `x [m]`, `y[m]`      |
//! | ranging  | `Time [s]`, `Distance [m]`, `ContactID`   |
//!
//! Extra columns are ignored. A missing file is reported as `FileNotFound`,
//! a missing column or an unparsable value as `Schema`.

use crate::error::AnalysisError;
use crate::types::{ContactRecord, PositionSample, PositionSeries, RangingSample, RangingSeries};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

pub const COLUMN_TAG_ID: &str = "TagID";
pub const COLUMN_TIME: &str = "Time [s]";
pub const COLUMN_X: &str = "x [m]";
pub const COLUMN_Y: &str = "y[m]";
pub const COLUMN_DISTANCE: &str = "Distance [m]";
pub const COLUMN_CONTACT_ID: &str = "ContactID";

const POSITION_COLUMNS: [&str; 4] = [COLUMN_TAG_ID, COLUMN_TIME, COLUMN_X, COLUMN_Y];
const RANGING_COLUMNS: [&str; 3] = [COLUMN_TIME, COLUMN_DISTANCE, COLUMN_CONTACT_ID];
const CONTACT_COLUMNS: [&str; 4] = [COLUMN_TIME, COLUMN_DISTANCE, COLUMN_X, COLUMN_Y];

#[derive(Debug, Deserialize)]
struct PositionRow {
    #[serde(rename = "TagID")]
    tag_id: String,
    #[serde(rename = "Time [s]")]
    time: f64,
    #[serde(rename = "x [m]")]
    x: f64,
    #[serde(rename = "y[m]")]
    y: f64,
}

#[derive(Debug, Deserialize)]
struct RangingRow {
    #[serde(rename = "Time [s]")]
    time: f64,
    #[serde(rename = "Distance [m]")]
    distance: f64,
    #[serde(rename = "ContactID")]
    contact_id: String,
}

#[derive(Debug, Serialize)]
struct ContactRow {
    #[serde(rename = "Time [s]")]
    time: f64,
    #[serde(rename = "Distance [m]")]
    distance: f64,
    #[serde(rename = "x [m]")]
    x: Option<f64>,
    #[serde(rename = "y[m]")]
    y: Option<f64>,
}

/// Load a position table from disk
pub fn load_position_table(path: &Path) -> Result<PositionSeries, AnalysisError> {
    let series = load_position_table_from_reader(open(path)?)?;
    debug!(path = %path.display(), records = series.len(), "Loaded position table");
    Ok(series)
}

/// Load a ranging table from disk
pub fn load_ranging_table(path: &Path) -> Result<RangingSeries, AnalysisError> {
    let series = load_ranging_table_from_reader(open(path)?)?;
    debug!(path = %path.display(), records = series.len(), "Loaded ranging table");
    Ok(series)
}

/// Parse a position table
pub fn load_position_table_from_reader<R: Read>(
    reader: R,
) -> Result<PositionSeries, AnalysisError> {
    let mut csv_reader = csv_reader(reader);
    require_columns(&mut csv_reader, &POSITION_COLUMNS, "position")?;

    let mut samples = Vec::new();
    for (row_index, row) in csv_reader.deserialize::<PositionRow>().enumerate() {
        let row = row.map_err(|e| schema_error("position", row_index, e))?;
        samples.push(PositionSample::new(row.tag_id, row.time, row.x, row.y));
    }

    Ok(PositionSeries::new(samples))
}

/// Parse a ranging table
pub fn load_ranging_table_from_reader<R: Read>(reader: R) -> Result<RangingSeries, AnalysisError> {
    let mut csv_reader = csv_reader(reader);
    require_columns(&mut csv_reader, &RANGING_COLUMNS, "ranging")?;

    let mut samples = Vec::new();
    for (row_index, row) in csv_reader.deserialize::<RangingRow>().enumerate() {
        let row = row.map_err(|e| schema_error("ranging", row_index, e))?;
        if row.distance < 0.0 {
            return Err(AnalysisError::Schema(format!(
                "ranging table row {}: negative distance {}",
                row_index + 1,
                row.distance
            )));
        }
        samples.push(RangingSample::new(row.time, row.distance, row.contact_id));
    }

    Ok(RangingSeries::new(samples))
}

/// Export contact records for plotting
pub fn write_contact_records(path: &Path, records: &[ContactRecord]) -> Result<(), AnalysisError> {
    let file = File::create(path)?;
    write_contact_records_to(file, records)
}

/// Write contact records as a table with the position column names
pub fn write_contact_records_to<W: Write>(
    writer: W,
    records: &[ContactRecord],
) -> Result<(), AnalysisError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer
        .write_record(CONTACT_COLUMNS)
        .map_err(csv_to_analysis_error)?;
    for record in records {
        csv_writer
            .serialize(ContactRow {
                time: record.time,
                distance: record.distance,
                x: record.x,
                y: record.y,
            })
            .map_err(csv_to_analysis_error)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn open(path: &Path) -> Result<File, AnalysisError> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AnalysisError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => AnalysisError::Io(e),
    })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::Fields)
        .from_reader(reader)
}

fn require_columns<R: Read>(
    reader: &mut csv::Reader<R>,
    columns: &[&str],
    table: &str,
) -> Result<(), AnalysisError> {
    let headers = reader.headers().map_err(csv_to_analysis_error)?;
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AnalysisError::Schema(format!(
            "{table} table is missing column(s): {}",
            missing.join(", ")
        )))
    }
}

fn schema_error(table: &str, row_index: usize, error: csv::Error) -> AnalysisError {
    match csv_to_analysis_error(error) {
        AnalysisError::Schema(message) => {
            AnalysisError::Schema(format!("{table} table row {}: {message}", row_index + 1))
        }
        other => other,
    }
}

fn csv_to_analysis_error(error: csv::Error) -> AnalysisError {
    if error.is_io_error() {
        match error.into_kind() {
            csv::ErrorKind::Io(io) => AnalysisError::Io(io),
            other => AnalysisError::Schema(format!("{other:?}")),
        }
    } else {
        AnalysisError::Schema(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const POSITIONS: &str = "\
TagID,Time [s],x [m],y[m]
A,0.0,1.0,2.0
B,0.0,3.0,4.0
A,0.1,1.1,2.1
B,0.1,3.1,4.1
";

    const RANGING: &str = "\
Time [s],Distance [m],ContactID
0.0,2.5,B
0.1,1.2,B
";

    #[test]
    fn test_load_positions() {
        let series = load_position_table_from_reader(POSITIONS.as_bytes()).unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.samples[3], PositionSample::new("B", 0.1, 3.1, 4.1));
    }

    #[test]
    fn test_load_ranging() {
        let series = load_ranging_table_from_reader(RANGING.as_bytes()).unwrap();
        assert_eq!(
            series.samples,
            vec![
                RangingSample::new(0.0, 2.5, "B"),
                RangingSample::new(0.1, 1.2, "B"),
            ]
        );
    }

    #[test]
    fn test_column_order_and_extra_columns() {
        let data = "ContactID,RSSI,Distance [m],Time [s]\nA,-70,0.8,0.0\n";
        let series = load_ranging_table_from_reader(data.as_bytes()).unwrap();
        assert_eq!(series.samples, vec![RangingSample::new(0.0, 0.8, "A")]);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        // `y [m]` instead of `y[m]`
        let data = "TagID,Time [s],x [m],y [m]\nA,0.0,1.0,2.0\n";
        match load_position_table_from_reader(data.as_bytes()) {
            Err(AnalysisError::Schema(message)) => assert!(message.contains("y[m]")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_header_names_are_not_trimmed() {
        let data = " TagID,Time [s],x [m],y[m]\nA, 0.0 , 1.0,2.0\n";
        match load_position_table_from_reader(data.as_bytes()) {
            Err(AnalysisError::Schema(message)) => assert!(message.contains("TagID")),
            other => panic!("expected schema error, got {other:?}"),
        }

        // Padding around values is still accepted
        let data = "TagID,Time [s],x [m],y[m]\nA, 0.0 , 1.0,2.0\n";
        let series = load_position_table_from_reader(data.as_bytes()).unwrap();
        assert_eq!(series.samples, vec![PositionSample::new("A", 0.0, 1.0, 2.0)]);
    }

    #[test]
    fn test_unparsable_value_is_schema_error() {
        let data = "Time [s],Distance [m],ContactID\n0.0,far,B\n";
        match load_ranging_table_from_reader(data.as_bytes()) {
            Err(AnalysisError::Schema(message)) => assert!(message.contains("row 1")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_distance_rejected() {
        let data = "Time [s],Distance [m],ContactID\n0.0,-1.0,B\n";
        assert!(matches!(
            load_ranging_table_from_reader(data.as_bytes()),
            Err(AnalysisError::Schema(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/nonexistent/positions.csv");
        assert!(matches!(
            load_position_table(path),
            Err(AnalysisError::FileNotFound { .. })
        ));
        assert!(matches!(
            load_ranging_table(path),
            Err(AnalysisError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_write_contact_records() {
        let records = vec![
            ContactRecord {
                time: 0.1,
                distance: 1.2,
                x: Some(1.1),
                y: Some(2.1),
            },
            ContactRecord {
                time: 0.2,
                distance: 0.9,
                x: None,
                y: None,
            },
        ];

        let mut buffer = Vec::new();
        write_contact_records_to(&mut buffer, &records).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "Time [s],Distance [m],x [m],y[m]\n0.1,1.2,1.1,2.1\n0.2,0.9,,\n"
        );
    }

    #[test]
    fn test_write_no_records_keeps_header() {
        let mut buffer = Vec::new();
        write_contact_records_to(&mut buffer, &[]).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "Time [s],Distance [m],x [m],y[m]\n"
        );
    }
}
