//! Time slot generation for a service on a given day.
//!
//! Pure calculation over already-loaded data: working hours, booking rules
//! and the appointments occupying that day. Times are UTC.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::entities::BusinessSettings;
use crate::domain::value_objects::{DaySchedule, WorkingHours};

pub const BREAK_REASON: &str = "Horario de descanso";
pub const BUSY_REASON: &str = "Ocupado";

/// Booking rules that shape the slot grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRules {
    pub slot_duration: i32,
    pub buffer_minutes: i32,
    pub max_advance_days: i32,
    pub min_advance_minutes: i32,
}

impl Default for SlotRules {
    /// Rules for a business that never saved settings.
    fn default() -> Self {
        Self {
            slot_duration: 30,
            buffer_minutes: 0,
            max_advance_days: 90,
            min_advance_minutes: 60,
        }
    }
}

impl From<&BusinessSettings> for SlotRules {
    fn from(settings: &BusinessSettings) -> Self {
        Self {
            slot_duration: settings.slot_duration,
            buffer_minutes: settings.buffer_time,
            max_advance_days: settings.max_advance_booking_days,
            min_advance_minutes: settings.min_advance_booking_minutes,
        }
    }
}

impl SlotRules {
    /// Whether `date` lies inside the bookable window seen from `now`.
    pub fn accepts_date(&self, date: NaiveDate, now: DateTime<Utc>) -> bool {
        let earliest = (now + Duration::minutes(self.min_advance_minutes as i64)).date_naive();
        let latest = (now + Duration::days(self.max_advance_days as i64)).date_naive();
        date >= earliest && date <= latest
    }
}

/// An occupied `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Busy {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Everything one slot calculation looks at.
#[derive(Debug, Clone)]
pub struct SlotQuery<'a> {
    pub date: NaiveDate,
    pub service_duration: i32,
    pub rules: SlotRules,
    /// `None` falls back to the standard week
    pub hours: Option<&'a WorkingHours>,
    pub busy: &'a [Busy],
    pub now: DateTime<Utc>,
}

/// Produce the slot grid for the query.
///
/// Slots step by service duration plus buffer from opening time and must end
/// by closing time. Slots already started are left out; slots starting in the
/// break or overlapping a busy interval are kept but flagged unavailable.
pub fn generate_slots(query: &SlotQuery<'_>) -> Vec<TimeSlot> {
    if !query.rules.accepts_date(query.date, query.now) {
        return Vec::new();
    }

    let standard = WorkingHours::standard_week();
    let hours = query.hours.unwrap_or(&standard);
    let day: &DaySchedule = hours.day(chrono::Datelike::weekday(&query.date));
    let Some((open, close)) = day.bounds() else {
        return Vec::new();
    };

    let duration_minutes = if query.service_duration > 0 {
        query.service_duration
    } else {
        query.rules.slot_duration
    };
    if duration_minutes <= 0 {
        return Vec::new();
    }
    let duration = Duration::minutes(duration_minutes as i64);
    let step = Duration::minutes((duration_minutes + query.rules.buffer_minutes.max(0)) as i64);

    let mut start = query.date.and_time(open).and_utc();
    let day_end = query.date.and_time(close).and_utc();
    let mut slots = Vec::new();

    while start + duration <= day_end {
        let end = start + duration;
        if start < query.now {
            start += step;
            continue;
        }

        let in_break = day.is_break(start.time());
        let busy = query.busy.iter().any(|b| start < b.end && end > b.start);
        let reason = if in_break {
            Some(BREAK_REASON.to_string())
        } else if busy {
            Some(BUSY_REASON.to_string())
        } else {
            None
        };

        slots.push(TimeSlot {
            start_time: start,
            end_time: end,
            is_available: reason.is_none(),
            reason,
        });
        start += step;
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};
    use pretty_assertions::assert_eq;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// Monday 2030-05-06
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 5, 6).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
        date.and_time(t(h, m)).and_utc()
    }

    fn week_before() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 4, 29, 8, 0, 0).unwrap()
    }

    fn query<'a>(hours: Option<&'a WorkingHours>, busy: &'a [Busy]) -> SlotQuery<'a> {
        SlotQuery {
            date: monday(),
            service_duration: 60,
            rules: SlotRules::default(),
            hours,
            busy,
            now: week_before(),
        }
    }

    // ==========================================================================
    // Grid Tests
    // ==========================================================================

    #[test]
    fn test_standard_week_grid() {
        let slots = generate_slots(&query(None, &[]));
        assert_eq!(slots.len(), 9);
        assert_eq!(slots[0].start_time, at(monday(), 9, 0));
        assert_eq!(slots[8].end_time, at(monday(), 18, 0));
        assert!(slots.iter().all(|s| s.is_available && s.reason.is_none()));
    }

    #[test]
    fn test_buffer_widens_step() {
        let mut q = query(None, &[]);
        q.rules.buffer_minutes = 15;
        let slots = generate_slots(&q);
        assert_eq!(slots[1].start_time, at(monday(), 10, 15));
        assert!(slots.iter().all(|s| s.end_time <= at(monday(), 18, 0)));
        assert_eq!(slots.len(), 7);
    }

    #[test]
    fn test_zero_duration_falls_back_to_slot_duration() {
        let mut q = query(None, &[]);
        q.service_duration = 0;
        let slots = generate_slots(&q);
        assert_eq!(slots.len(), 18);
        assert_eq!(slots[0].end_time, at(monday(), 9, 30));
    }

    #[test]
    fn test_closed_day_is_empty() {
        let mut q = query(None, &[]);
        q.date = NaiveDate::from_ymd_opt(2030, 5, 5).unwrap(); // Sunday
        assert!(generate_slots(&q).is_empty());
    }

    #[test]
    fn test_custom_hours_with_break() {
        let mut hours = WorkingHours::default();
        hours.monday = DaySchedule::open(t(8, 0), t(12, 0)).with_break(t(10, 0), t(11, 0));
        let slots = generate_slots(&query(Some(&hours), &[]));

        let reasons: Vec<Option<&str>> = slots.iter().map(|s| s.reason.as_deref()).collect();
        assert_eq!(reasons, vec![None, None, Some(BREAK_REASON), None]);
        assert!(!slots[2].is_available);
    }

    #[test]
    fn test_busy_interval_marks_overlapping_slots() {
        let busy = [Busy {
            start: at(monday(), 10, 30),
            end: at(monday(), 11, 30),
        }];
        let slots = generate_slots(&query(None, &busy));

        assert_eq!(slots[0].reason, None);
        assert_eq!(slots[1].reason.as_deref(), Some(BUSY_REASON));
        assert_eq!(slots[2].reason.as_deref(), Some(BUSY_REASON));
        assert_eq!(slots[3].reason, None);
    }

    #[test]
    fn test_break_wins_over_busy() {
        let mut hours = WorkingHours::standard_week();
        hours.monday = hours.monday.clone().with_break(t(9, 0), t(10, 0));
        let busy = [Busy {
            start: at(monday(), 9, 0),
            end: at(monday(), 10, 0),
        }];
        let slots = generate_slots(&query(Some(&hours), &busy));
        assert_eq!(slots[0].reason.as_deref(), Some(BREAK_REASON));
    }

    // ==========================================================================
    // Booking Window Tests
    // ==========================================================================

    #[test]
    fn test_started_slots_are_skipped() {
        let mut q = query(None, &[]);
        q.rules.min_advance_minutes = 0;
        q.now = at(monday(), 12, 30);
        let slots = generate_slots(&q);
        assert_eq!(slots.first().map(|s| s.start_time), Some(at(monday(), 13, 0)));
        assert_eq!(slots.len(), 5);
    }

    #[test]
    fn test_date_before_min_advance_is_empty() {
        let mut q = query(None, &[]);
        q.now = at(monday(), 23, 30);
        q.date = monday();
        assert!(generate_slots(&q).is_empty());
    }

    #[test]
    fn test_date_beyond_max_advance_is_empty() {
        let mut q = query(None, &[]);
        q.rules.max_advance_days = 3;
        assert!(generate_slots(&q).is_empty());
    }

    #[test]
    fn test_rules_from_settings() {
        let settings = BusinessSettings::defaults_for(uuid::Uuid::now_v7());
        let rules = SlotRules::from(&settings);
        assert_eq!(rules.buffer_minutes, 15);
        assert_eq!(rules.max_advance_days, 90);
    }

    #[test]
    fn test_slot_serialization() {
        let slots = generate_slots(&query(None, &[]));
        let json = serde_json::to_value(&slots[0]).unwrap();
        assert_eq!(json["isAvailable"], true);
        assert!(json.get("reason").is_none());
        assert!(json.get("startTime").is_some());
    }
}
