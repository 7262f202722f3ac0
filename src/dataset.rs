//! Dataset loading.
//!
//! The input dataset is a headed CSV; row order defines the `run_id`
//! sequence (0-based ordinal, truncated to the 16-bit wire field). Only the
//! columns referenced by feature bindings are kept. A missing column or a
//! value that is not an unsigned integer is fatal for the run and names the
//! offending row: a silently-defaulted stimulus would corrupt the test.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use crate::config::FeatureBinding;
use crate::error::{AnnwireError, Result};

/// One row of the input dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// 0-based dataset row ordinal.
    pub ordinal: usize,
    /// Wire correlation identifier (`ordinal` truncated to 16 bits).
    pub run_id: u16,
    /// Referenced column values, keyed by column identifier.
    pub values: HashMap<String, u64>,
}

impl TestCase {
    /// Look up a referenced column value.
    pub fn value(&self, column: &str) -> Option<u64> {
        self.values.get(column).copied()
    }
}

/// The set of dataset columns referenced by the feature bindings.
fn referenced_columns(features: &[FeatureBinding]) -> BTreeSet<String> {
    features
        .iter()
        .flat_map(|f| f.columns.iter().cloned())
        .collect()
}

/// Load test cases from a CSV file.
pub fn load_dataset(
    path: &Path,
    features: &[FeatureBinding],
    limit: Option<usize>,
) -> Result<Vec<TestCase>> {
    let file = std::fs::File::open(path)?;
    read_dataset(file, features, limit)
}

/// Load test cases from any reader producing headed CSV.
pub fn read_dataset<R: Read>(
    reader: R,
    features: &[FeatureBinding],
    limit: Option<usize>,
) -> Result<Vec<TestCase>> {
    let columns = referenced_columns(features);
    let mut csv = csv::Reader::from_reader(reader);

    // Map referenced column names to header positions once, failing fast on
    // a dataset that cannot satisfy the bindings at all.
    let headers = csv.headers()?.clone();
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(columns.len());
    for column in &columns {
        let idx = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| AnnwireError::MalformedRow {
                row: 0,
                reason: format!("dataset has no column '{}'", column),
            })?;
        positions.insert(column.clone(), idx);
    }

    let mut cases = Vec::new();
    for (ordinal, record) in csv.records().enumerate() {
        if let Some(limit) = limit {
            if ordinal >= limit {
                break;
            }
        }

        let record = record?;
        let mut values = HashMap::with_capacity(columns.len());
        for (column, &idx) in &positions {
            let raw = record.get(idx).ok_or_else(|| AnnwireError::MalformedRow {
                row: ordinal,
                reason: format!("missing column '{}'", column),
            })?;
            let value: u64 =
                raw.trim()
                    .parse()
                    .map_err(|_| AnnwireError::MalformedRow {
                        row: ordinal,
                        reason: format!("column '{}' value '{}' is not an unsigned integer", column, raw),
                    })?;
            values.insert(column.clone(), value);
        }

        cases.push(TestCase {
            ordinal,
            run_id: (ordinal & 0xFFFF) as u16,
            values,
        });
    }

    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn features(columns: &[&str]) -> Vec<FeatureBinding> {
        vec![FeatureBinding {
            name: "a".into(),
            iface: "s1-eth1".into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }]
    }

    #[test]
    fn test_load_rows_in_order() {
        let csv = "82,83,real_classes\n190,338,1\n191,72,8\n";
        let cases = read_dataset(Cursor::new(csv), &features(&["82", "83"]), None).unwrap();

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].ordinal, 0);
        assert_eq!(cases[0].run_id, 0);
        assert_eq!(cases[0].value("82"), Some(190));
        assert_eq!(cases[0].value("83"), Some(338));
        assert_eq!(cases[1].run_id, 1);
        assert_eq!(cases[1].value("83"), Some(72));
        // Unreferenced columns are not kept.
        assert_eq!(cases[0].value("real_classes"), None);
    }

    #[test]
    fn test_limit_caps_rows() {
        let csv = "82\n1\n2\n3\n4\n";
        let cases = read_dataset(Cursor::new(csv), &features(&["82"]), Some(2)).unwrap();
        assert_eq!(cases.len(), 2);
    }

    #[test]
    fn test_missing_header_is_fatal() {
        let csv = "83\n1\n";
        let err = read_dataset(Cursor::new(csv), &features(&["82"]), None).unwrap_err();
        assert!(err.to_string().contains("no column '82'"));
    }

    #[test]
    fn test_non_integer_value_is_fatal_and_names_the_row() {
        let csv = "82\n5\nabc\n";
        let err = read_dataset(Cursor::new(csv), &features(&["82"]), None).unwrap_err();
        match err {
            AnnwireError::MalformedRow { row, reason } => {
                assert_eq!(row, 1);
                assert!(reason.contains("abc"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_values_parse_with_surrounding_whitespace() {
        let csv = "82\n 42 \n";
        let cases = read_dataset(Cursor::new(csv), &features(&["82"]), None).unwrap();
        assert_eq!(cases[0].value("82"), Some(42));
    }

    #[test]
    fn test_empty_dataset() {
        let csv = "82,83\n";
        let cases = read_dataset(Cursor::new(csv), &features(&["82", "83"]), None).unwrap();
        assert!(cases.is_empty());
    }
}
