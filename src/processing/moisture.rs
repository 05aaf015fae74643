use crate::domain::model::{MoistureCycle, PreprocessSettings, SensorReading};
use crate::domain::timestamp::{format_timestamp, seconds_between};
use statrs::statistics::Statistics;

/// Labels moisture cycles in a single pass over readings sorted by time.
///
/// A cycle opens on the first reading below `moisture_start_below` and closes
/// on the next reading at or above `moisture_end_at_or_above`. A cycle still
/// open when the series ends is dropped.
pub fn label_moisture_cycles(
    readings: &[SensorReading],
    settings: &PreprocessSettings,
) -> Vec<MoistureCycle> {
    let mut cycles = Vec::new();
    let mut open: Option<usize> = None;

    for (idx, reading) in readings.iter().enumerate() {
        match open {
            None if reading.soil_moisture < settings.moisture_start_below => {
                open = Some(idx);
            }
            Some(start) if reading.soil_moisture >= settings.moisture_end_at_or_above => {
                cycles.push(close_cycle(readings, start, idx));
                open = None;
            }
            _ => {}
        }
    }

    if let Some(start) = open {
        tracing::debug!(
            "Dropping moisture cycle opened at {} with no recovery reading",
            format_timestamp(&readings[start].timestamp)
        );
    }

    cycles
}

fn close_cycle(readings: &[SensorReading], start: usize, end: usize) -> MoistureCycle {
    let start_time = readings[start].timestamp;
    let end_time = readings[end].timestamp;

    // 同一時間戳記有多筆時取第一筆
    let first = readings.partition_point(|r| r.timestamp < start_time);
    let last = readings.partition_point(|r| r.timestamp <= end_time);
    let anchor = &readings[first];

    MoistureCycle {
        start_time,
        end_time,
        duration: seconds_between(&start_time, &end_time),
        start_temp: anchor.temperature,
        start_humidity: anchor.humidity,
        avg_light: readings[first..last]
            .iter()
            .map(|r| r.light_intensity)
            .mean(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::test_support::{reading, with_climate};

    #[test]
    fn test_cycle_opens_below_start_and_closes_at_end_threshold() {
        let readings = vec![
            reading(0, 80.0, 50.0),
            with_climate(reading(600, 65.0, 50.0), 24.0, 60.0, 1000.0),
            with_climate(reading(1200, 35.0, 50.0), 25.0, 55.0, 2000.0),
            with_climate(reading(1800, 45.0, 50.0), 26.0, 50.0, 3000.0),
            reading(2400, 90.0, 50.0),
        ];

        let cycles = label_moisture_cycles(&readings, &PreprocessSettings::default());

        assert_eq!(cycles.len(), 1);
        let cycle = &cycles[0];
        assert_eq!(cycle.start_time, readings[1].timestamp);
        assert_eq!(cycle.end_time, readings[3].timestamp);
        assert_eq!(cycle.duration, 1200.0);
        assert_eq!(cycle.start_temp, 24.0);
        assert_eq!(cycle.start_humidity, 60.0);
        assert_eq!(cycle.avg_light, 2000.0);
    }

    #[test]
    fn test_cycle_closes_on_first_reading_after_open() {
        // 65 opens, 50 is already >= 40 and closes it on the very next row.
        let readings = vec![
            reading(0, 65.0, 50.0),
            reading(300, 50.0, 50.0),
            reading(600, 60.0, 50.0),
            reading(900, 45.0, 50.0),
        ];

        let cycles = label_moisture_cycles(&readings, &PreprocessSettings::default());

        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].duration, 300.0);
        assert_eq!(cycles[1].duration, 300.0);
    }

    #[test]
    fn test_unclosed_cycle_is_dropped() {
        let readings = vec![
            reading(0, 80.0, 50.0),
            reading(600, 60.0, 50.0),
            reading(1200, 30.0, 50.0),
            reading(1800, 20.0, 50.0),
        ];

        let cycles = label_moisture_cycles(&readings, &PreprocessSettings::default());
        // 60 opens, 30 is below 40 so nothing closes, 20 likewise.
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_duplicate_start_timestamp_uses_first_reading() {
        let readings = vec![
            with_climate(reading(0, 80.0, 50.0), 18.0, 70.0, 100.0),
            with_climate(reading(0, 60.0, 50.0), 30.0, 40.0, 300.0),
            with_climate(reading(600, 50.0, 50.0), 31.0, 41.0, 500.0),
        ];

        let cycles = label_moisture_cycles(&readings, &PreprocessSettings::default());

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].start_temp, 18.0);
        assert_eq!(cycles[0].start_humidity, 70.0);
        assert_eq!(cycles[0].avg_light, 300.0);
    }

    #[test]
    fn test_custom_thresholds() {
        let settings = PreprocessSettings {
            moisture_start_below: 50.0,
            moisture_end_at_or_above: 55.0,
            ..PreprocessSettings::default()
        };
        let readings = vec![
            reading(0, 60.0, 50.0),
            reading(60, 45.0, 50.0),
            reading(120, 50.0, 50.0),
            reading(180, 58.0, 50.0),
        ];

        let cycles = label_moisture_cycles(&readings, &settings);

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].duration, 120.0);
    }
}
