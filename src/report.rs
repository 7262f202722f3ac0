//! Result sink: CSV materialization of the result table.
//!
//! External-collaborator surface only. The engine guarantees the table's
//! structure (one row per completed test case, one column per declared
//! output, values already unit-converted); this module just writes it out
//! once at end of run. Accuracy comparison against a reference model
//! happens offline, outside the harness.

use std::io::Write;
use std::path::Path;

use crate::engine::ResultTable;
use crate::error::Result;

/// Write the result table as CSV to `path`.
pub fn write_results(path: &Path, table: &ResultTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    write_results_to(file, table)
}

/// Write the result table as CSV to any writer.
///
/// Columns: `run_id`, then the declared output names in declaration order.
pub fn write_results_to<W: Write>(writer: W, table: &ResultTable) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push("run_id".to_string());
    header.extend(table.columns.iter().cloned());
    csv.write_record(&header)?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.run_id.to_string());
        record.extend(row.values.iter().map(|v| v.to_string()));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ResultRow;

    fn table() -> ResultTable {
        ResultTable {
            columns: vec!["P4_class".into(), "output_s101".into()],
            rows: vec![
                ResultRow {
                    ordinal: 0,
                    run_id: 0,
                    values: vec![1.0, -0.5],
                },
                ResultRow {
                    ordinal: 1,
                    run_id: 1,
                    values: vec![8.0, 1234.5],
                },
            ],
        }
    }

    #[test]
    fn test_csv_shape_and_column_order() {
        let mut buf = Vec::new();
        write_results_to(&mut buf, &table()).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "run_id,P4_class,output_s101");
        assert_eq!(lines[1], "0,1,-0.5");
        assert_eq!(lines[2], "1,8,1234.5");
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let mut buf = Vec::new();
        let empty = ResultTable {
            columns: vec!["x".into()],
            rows: vec![],
        };
        write_results_to(&mut buf, &empty).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.trim_end(), "run_id,x");
    }
}
