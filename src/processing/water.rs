use crate::domain::model::{PreprocessSettings, SensorReading, WaterCycle};
use crate::domain::timestamp::seconds_between;
use statrs::statistics::Statistics;

/// Groups low-reservoir readings into depletion cycles.
///
/// Only readings at or below `low_water_level` take part. Walking those in
/// time order, a reading whose level is lower than the previous one starts a
/// new group.
pub fn group_water_cycles(
    readings: &[SensorReading],
    settings: &PreprocessSettings,
) -> Vec<WaterCycle> {
    let mut groups: Vec<Vec<&SensorReading>> = Vec::new();
    let mut previous_level: Option<f64> = None;

    for reading in readings
        .iter()
        .filter(|r| r.water_level <= settings.low_water_level)
    {
        let starts_group = match previous_level {
            Some(prev) => reading.water_level < prev,
            None => true,
        };
        match groups.last_mut() {
            Some(group) if !starts_group => group.push(reading),
            _ => groups.push(vec![reading]),
        }
        previous_level = Some(reading.water_level);
    }

    groups.iter().filter_map(|group| summarize(group)).collect()
}

fn summarize(group: &[&SensorReading]) -> Option<WaterCycle> {
    let first = group.first()?;
    let last = group.last()?;

    Some(WaterCycle {
        start_time: first.timestamp,
        end_time: last.timestamp,
        start_level: first.water_level,
        end_level: last.water_level,
        avg_temp: group.iter().map(|r| r.temperature).mean(),
        avg_humidity: group.iter().map(|r| r.humidity).mean(),
        avg_light: group.iter().map(|r| r.light_intensity).mean(),
        duration: seconds_between(&first.timestamp, &last.timestamp),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::test_support::{reading, with_climate};

    #[test]
    fn test_readings_above_threshold_are_ignored() {
        let readings = vec![reading(0, 50.0, 80.0), reading(60, 50.0, 31.0)];
        assert!(group_water_cycles(&readings, &PreprocessSettings::default()).is_empty());
    }

    #[test]
    fn test_level_drop_starts_new_group() {
        let readings = vec![
            with_climate(reading(0, 50.0, 25.0), 20.0, 50.0, 100.0),
            with_climate(reading(600, 50.0, 25.0), 22.0, 60.0, 300.0),
            with_climate(reading(1200, 50.0, 28.0), 24.0, 70.0, 500.0),
            reading(1800, 50.0, 90.0),
            with_climate(reading(2400, 50.0, 20.0), 30.0, 40.0, 1000.0),
            with_climate(reading(3000, 50.0, 20.0), 32.0, 42.0, 1200.0),
        ];

        let cycles = group_water_cycles(&readings, &PreprocessSettings::default());

        assert_eq!(cycles.len(), 2);

        let first = &cycles[0];
        assert_eq!(first.start_level, 25.0);
        assert_eq!(first.end_level, 28.0);
        assert_eq!(first.duration, 1200.0);
        assert_eq!(first.avg_temp, 22.0);
        assert_eq!(first.avg_humidity, 60.0);
        assert_eq!(first.avg_light, 300.0);

        let second = &cycles[1];
        assert_eq!(second.start_time, readings[4].timestamp);
        assert_eq!(second.end_time, readings[5].timestamp);
        assert_eq!(second.duration, 600.0);
        assert_eq!(second.avg_temp, 31.0);
    }

    #[test]
    fn test_single_reading_group_has_zero_duration() {
        let readings = vec![reading(0, 50.0, 10.0)];
        let cycles = group_water_cycles(&readings, &PreprocessSettings::default());

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].duration, 0.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let readings = vec![reading(0, 50.0, 30.0), reading(60, 50.0, 30.0)];
        let cycles = group_water_cycles(&readings, &PreprocessSettings::default());

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].duration, 60.0);
    }
}
