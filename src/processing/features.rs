use crate::domain::model::{FeatureRow, SensorReading};
use crate::domain::timestamp::seconds_between;

/// Deltas against the previous reading. The first reading gets zeros, and a
/// zero time gap divides by one so duplicate timestamps do not blow up.
pub fn derive_features(readings: &[SensorReading]) -> Vec<FeatureRow> {
    let mut rows = Vec::with_capacity(readings.len());
    let mut previous: Option<&SensorReading> = None;

    for reading in readings {
        let (time_diff, moisture_diff) = match previous {
            Some(prev) => (
                seconds_between(&prev.timestamp, &reading.timestamp),
                reading.soil_moisture - prev.soil_moisture,
            ),
            None => (0.0, 0.0),
        };
        let divisor = if time_diff == 0.0 { 1.0 } else { time_diff };

        rows.push(FeatureRow {
            timestamp: reading.timestamp,
            soil_moisture: reading.soil_moisture,
            time_diff,
            moisture_diff,
            moisture_rate: moisture_diff / divisor,
        });
        previous = Some(reading);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::test_support::reading;

    #[test]
    fn test_first_row_is_zeroed() {
        let rows = derive_features(&[reading(0, 80.0, 50.0), reading(60, 74.0, 50.0)]);

        assert_eq!(rows[0].time_diff, 0.0);
        assert_eq!(rows[0].moisture_rate, 0.0);
        assert_eq!(rows[1].time_diff, 60.0);
        assert_eq!(rows[1].moisture_diff, -6.0);
        assert_eq!(rows[1].moisture_rate, -0.1);
    }

    #[test]
    fn test_duplicate_timestamp_divides_by_one() {
        let rows = derive_features(&[reading(0, 80.0, 50.0), reading(0, 77.0, 50.0)]);
        assert_eq!(rows[1].moisture_rate, -3.0);
    }
}
