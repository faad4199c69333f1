//! GyroRecord - Sample Aggregator output
//!
//! Averaged, timestamped gyro measurement.

use serde::{Deserialize, Serialize};

/// Published gyro record
///
/// Field layout is the published wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GyroRecord {
    /// Host timestamp of the aggregated window (microseconds since epoch)
    pub utime: i64,

    /// Average angular rate (rad/s)
    pub rads: f64,

    /// Number of samples averaged
    pub nsamples: i32,

    /// Raw samples in arrival order
    pub samples: Vec<i32>,
}

impl GyroRecord {
    /// Mean of the raw samples in LSB units
    pub fn average_lsb(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: i64 = self.samples.iter().map(|&s| i64::from(s)).sum();
        sum as f64 / self.samples.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_field_names() {
        let record = GyroRecord {
            utime: 1_700_000_000_000_000,
            rads: 0.5,
            nsamples: 2,
            samples: vec![3, -1],
        };
        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(obj["utime"], 1_700_000_000_000_000_i64);
        assert_eq!(obj["nsamples"], 2);
        assert_eq!(obj["samples"], serde_json::json!([3, -1]));
        assert_eq!(record.average_lsb(), 1.0);
    }
}
