use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;

use crate::analyzers::types::{DailyDistance, DayWindow};
use crate::model::Trip;

/// Returns the UTC bounds of the civil day containing `instant` in `timezone`.
///
/// Both ends come from calendar arithmetic in the zone itself, so a DST day is
/// 23 or 25 hours long rather than a fixed 24.
pub fn window_for_today(timezone: Tz, instant: DateTime<Utc>) -> DayWindow {
    let day = instant.with_timezone(&timezone).date_naive();
    let from = start_of_day(timezone, day);
    let next = day
        .succ_opt()
        .map(|next_day| start_of_day(timezone, next_day))
        .unwrap_or(from + Duration::days(1));

    DayWindow {
        timezone,
        day,
        from,
        to: next - Duration::milliseconds(1),
    }
}

/// First instant of `day` in `timezone`.
///
/// A few zones skip midnight on DST days, so the first local minute that
/// exists is used. Ambiguous midnights resolve to the earlier instant.
fn start_of_day(timezone: Tz, day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    (0..24 * 60)
        .find_map(|minute| {
            timezone
                .from_local_datetime(&(midnight + Duration::minutes(minute)))
                .earliest()
        })
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Sums trip distance per device for `window`.
///
/// Trips without a device are skipped. Units are passed through untouched.
pub fn aggregate(trips: &[Trip], window: &DayWindow) -> DailyDistance {
    let mut totals: HashMap<String, f64> = HashMap::new();

    for trip in trips {
        let Some(device_id) = trip.device_id.as_deref().filter(|id| !id.is_empty()) else {
            continue;
        };
        *totals.entry(device_id.to_string()).or_default() += trip.distance;
    }

    DailyDistance {
        timezone: window.timezone,
        day: window.day,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_plain_day_in_utc() {
        let window = window_for_today(Tz::UTC, utc("2024-06-15T18:30:00Z"));
        assert_eq!(window.day, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(window.from, utc("2024-06-15T00:00:00Z"));
        assert_eq!(window.to, utc("2024-06-15T23:59:59.999Z"));
        assert_eq!(window.length(), Duration::hours(24));
    }

    #[test]
    fn test_spring_forward_day_is_23_hours() {
        let window = window_for_today(Tz::America__New_York, utc("2024-03-10T12:00:00Z"));
        assert_eq!(window.day, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(window.from, utc("2024-03-10T05:00:00Z"));
        assert_eq!(window.to, utc("2024-03-11T03:59:59.999Z"));
        assert_eq!(window.length(), Duration::hours(23));
    }

    #[test]
    fn test_fall_back_day_is_25_hours() {
        let window = window_for_today(Tz::America__New_York, utc("2024-11-03T15:00:00Z"));
        assert_eq!(window.from, utc("2024-11-03T04:00:00Z"));
        assert_eq!(window.length(), Duration::hours(25));
    }

    #[test]
    fn test_local_day_differs_from_utc_day() {
        // 02:00 UTC on the 16th is still the evening of the 15th in Toronto.
        let window = window_for_today(Tz::America__Toronto, utc("2024-06-16T02:00:00Z"));
        assert_eq!(window.day, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert!(window.contains(utc("2024-06-16T02:00:00Z")));
        assert_eq!(window.from, utc("2024-06-15T04:00:00Z"));
    }

    #[test]
    fn test_zone_that_skips_midnight() {
        // Santiago springs forward at 00:00 local, so the day starts at 01:00 -03.
        let window = window_for_today(Tz::America__Santiago, utc("2023-09-03T15:00:00Z"));
        assert_eq!(window.from, utc("2023-09-03T04:00:00Z"));
        assert_eq!(window.length(), Duration::hours(23));
    }

    #[test]
    fn test_aggregate_groups_and_skips_orphans() {
        let window = window_for_today(Tz::UTC, utc("2024-06-15T12:00:00Z"));
        let trips = vec![
            Trip::new("b1", 4.5),
            Trip::new("b2", 1.0),
            Trip::new("b1", 3.0),
            Trip { device_id: None, distance: 100.0 },
            Trip { device_id: Some(String::new()), distance: 50.0 },
        ];

        let daily = aggregate(&trips, &window);
        assert_eq!(daily.totals.len(), 2);
        assert_eq!(daily.distance_for("b1"), Some(7.5));
        assert_eq!(daily.distance_for("b2"), Some(1.0));
        assert_eq!(daily.distance_for("b3"), None);
        assert!(daily.is_for(&window));
    }
}
