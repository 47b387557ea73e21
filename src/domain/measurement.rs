use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// One observed queue depth at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    pub value: i64,
}

impl Measurement {
    pub fn new(timestamp: i64, value: i64) -> Self {
        Self { timestamp, value }
    }

    /// Measurement stamped with the current wall-clock time.
    pub fn now(value: i64) -> Self {
        Self::new(chrono::Utc::now().timestamp(), value)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.timestamp, self.value)
    }
}

/// Ordered time series delivered in a single report.
///
/// Insertion order is preserved as-is; the remote service interprets the
/// lines as a time series, so entries are never sorted or deduplicated here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportBatch {
    measurements: Vec<Measurement>,
}

impl ReportBatch {
    pub fn new(measurements: Vec<Measurement>) -> Self {
        Self { measurements }
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Newline-delimited `timestamp,value` lines, each terminated by `\n`.
    pub fn to_csv(&self) -> String {
        // "1700000000,12\n" is ~14 bytes
        let mut csv = String::with_capacity(self.measurements.len() * 16);
        for measurement in &self.measurements {
            // Writing into a String cannot fail
            let _ = writeln!(csv, "{measurement}");
        }
        csv
    }
}

impl From<Vec<Measurement>> for ReportBatch {
    fn from(measurements: Vec<Measurement>) -> Self {
        Self::new(measurements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_keeps_insertion_order() {
        let batch = ReportBatch::new(vec![
            Measurement::new(1_700_000_010, 33),
            Measurement::new(1_700_000_000, 11),
            Measurement::new(1_700_000_010, 33),
        ]);

        assert_eq!(
            batch.to_csv(),
            "1700000010,33\n1700000000,11\n1700000010,33\n"
        );
    }

    #[test]
    fn test_empty_batch_serializes_to_empty_body() {
        let batch = ReportBatch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.to_csv(), "");
    }

    #[test]
    fn test_negative_values_are_written_verbatim() {
        let batch: ReportBatch = vec![Measurement::new(5, -1)].into();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.to_csv(), "5,-1\n");
    }

    #[test]
    fn test_now_uses_current_time() {
        let before = chrono::Utc::now().timestamp();
        let measurement = Measurement::now(7);
        let after = chrono::Utc::now().timestamp();

        assert_eq!(measurement.value, 7);
        assert!(measurement.timestamp >= before && measurement.timestamp <= after);
    }
}
