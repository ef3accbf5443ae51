//! Weekly schedules of businesses and employees.
//!
//! Maps to the `business_schedules` and `employee_schedules` tables, both
//! keyed by their owner id with the working days kept as JSONB.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::working_hours::hhmm;
use crate::domain::value_objects::{DaySchedule, WorkingHours};
use crate::shared::error::AppError;

pub const DEFAULT_APPOINTMENT_DURATION: i32 = 30;

/// Which kind of owner a schedule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleScope {
    Business,
    Employee,
}

impl ScheduleScope {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Business => "business_schedules",
            Self::Employee => "employee_schedules",
        }
    }

    pub fn owner_column(&self) -> &'static str {
        match self {
            Self::Business => "business_id",
            Self::Employee => "employee_id",
        }
    }

    /// 404 message when no schedule exists for the owner.
    pub fn missing_message(&self) -> &'static str {
        match self {
            Self::Business => "No existe horario para el negocio",
            Self::Employee => "No existe horario para el empleado",
        }
    }
}

/// A `[start, end)` range of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    #[serde(with = "required_hhmm")]
    pub start: NaiveTime,
    #[serde(with = "required_hhmm")]
    pub end: NaiveTime,
}

impl TimeBlock {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDay {
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u8,
    pub is_open: bool,
    #[serde(default)]
    pub time_blocks: Vec<TimeBlock>,
    #[serde(default)]
    pub breaks: Vec<TimeBlock>,
}

impl WorkingDay {
    pub fn weekday(&self) -> Option<Weekday> {
        match self.day_of_week {
            0 => Some(Weekday::Mon),
            1 => Some(Weekday::Tue),
            2 => Some(Weekday::Wed),
            3 => Some(Weekday::Thu),
            4 => Some(Weekday::Fri),
            5 => Some(Weekday::Sat),
            6 => Some(Weekday::Sun),
            _ => None,
        }
    }

    fn to_day_schedule(&self) -> DaySchedule {
        let Some(hours) = self.time_blocks.first().filter(|_| self.is_open) else {
            return DaySchedule::closed();
        };
        let day = DaySchedule::open(hours.start, hours.end);
        match self.breaks.first() {
            Some(b) => day.with_break(b.start, b.end),
            None => day,
        }
    }
}

/// Weekly schedule of a business or an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub owner_id: Uuid,
    pub appointment_duration: i32,
    pub working_days: Vec<WorkingDay>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    pub fn new(owner_id: Uuid, appointment_duration: Option<i32>, working_days: Vec<WorkingDay>) -> Self {
        let now = Utc::now();
        Self {
            owner_id,
            appointment_duration: appointment_duration.unwrap_or(DEFAULT_APPOINTMENT_DURATION),
            working_days,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check day numbering and block ordering; the error is user-facing.
    pub fn check_rules(&self) -> Result<(), String> {
        if self.appointment_duration <= 0 {
            return Err("La duración de la cita debe ser mayor a 0".into());
        }
        let mut seen = [false; 7];
        for day in &self.working_days {
            let index = day.day_of_week as usize;
            if index > 6 {
                return Err(format!("Día de la semana inválido: {}", day.day_of_week));
            }
            if seen[index] {
                return Err(format!("Día de la semana duplicado: {}", day.day_of_week));
            }
            seen[index] = true;
            if day
                .time_blocks
                .iter()
                .chain(day.breaks.iter())
                .any(|block| !block.is_valid())
            {
                return Err("La hora de inicio debe ser anterior a la hora de fin".into());
            }
        }
        Ok(())
    }

    /// Collapse to the single-window-per-day shape used for availability.
    pub fn to_working_hours(&self) -> WorkingHours {
        let mut hours = WorkingHours::default();
        for day in &self.working_days {
            if let Some(weekday) = day.weekday() {
                *hours.day_mut(weekday) = day.to_day_schedule();
            }
        }
        hours
    }

    /// Expand working hours into schedule days, one per weekday.
    pub fn from_working_hours(owner_id: Uuid, hours: &WorkingHours, appointment_duration: i32) -> Self {
        let weekdays = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        let working_days = weekdays
            .iter()
            .map(|&weekday| {
                let day = hours.day(weekday);
                WorkingDay {
                    day_of_week: weekday.num_days_from_monday() as u8,
                    is_open: day.bounds().is_some(),
                    time_blocks: day
                        .bounds()
                        .map(|(open, close)| vec![TimeBlock::new(open, close)])
                        .unwrap_or_default(),
                    breaks: day
                        .break_window()
                        .map(|(start, end)| vec![TimeBlock::new(start, end)])
                        .unwrap_or_default(),
                }
            })
            .collect();
        Self::new(owner_id, Some(appointment_duration), working_days)
    }
}

/// Serde for mandatory `HH:mm` fields, reusing the optional-time parser.
mod required_hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::hhmm::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}', expected HH:mm", raw)))
    }
}

/// Storage of schedules for one [`ScheduleScope`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn find(&self, owner_id: Uuid) -> Result<Option<Schedule>, AppError>;

    /// Insert; a schedule already stored for the owner is a conflict.
    async fn create(&self, schedule: &Schedule) -> Result<Schedule, AppError>;

    /// Replace; a missing schedule is not found.
    async fn update(&self, schedule: &Schedule) -> Result<Schedule, AppError>;

    /// Remove if present.
    async fn delete(&self, owner_id: Uuid) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn open_day(day_of_week: u8) -> WorkingDay {
        WorkingDay {
            day_of_week,
            is_open: true,
            time_blocks: vec![TimeBlock::new(t(9, 0), t(17, 0))],
            breaks: vec![TimeBlock::new(t(13, 0), t(14, 0))],
        }
    }

    #[test]
    fn test_default_duration() {
        let schedule = Schedule::new(Uuid::now_v7(), None, vec![]);
        assert_eq!(schedule.appointment_duration, 30);
    }

    #[test]
    fn test_rules_accept_valid_week() {
        let schedule = Schedule::new(Uuid::now_v7(), Some(45), (0..7).map(open_day).collect());
        assert!(schedule.check_rules().is_ok());
    }

    #[test]
    fn test_rules_reject_duplicate_day() {
        let schedule = Schedule::new(Uuid::now_v7(), None, vec![open_day(1), open_day(1)]);
        assert!(schedule.check_rules().unwrap_err().contains("duplicado"));
    }

    #[test]
    fn test_rules_reject_out_of_range_day() {
        let schedule = Schedule::new(Uuid::now_v7(), None, vec![open_day(7)]);
        assert!(schedule.check_rules().is_err());
    }

    #[test]
    fn test_rules_reject_inverted_block() {
        let mut day = open_day(0);
        day.breaks = vec![TimeBlock::new(t(14, 0), t(13, 0))];
        let schedule = Schedule::new(Uuid::now_v7(), None, vec![day]);
        assert!(schedule.check_rules().is_err());
    }

    #[test]
    fn test_to_working_hours_uses_first_block_and_break() {
        let mut monday = open_day(0);
        monday.time_blocks.push(TimeBlock::new(t(18, 0), t(20, 0)));
        let schedule = Schedule::new(Uuid::now_v7(), None, vec![monday]);

        let hours = schedule.to_working_hours();
        assert_eq!(hours.monday.bounds(), Some((t(9, 0), t(17, 0))));
        assert_eq!(hours.monday.break_window(), Some((t(13, 0), t(14, 0))));
        assert_eq!(hours.tuesday.bounds(), None);
    }

    #[test]
    fn test_open_day_without_blocks_is_closed() {
        let mut day = open_day(2);
        day.time_blocks.clear();
        let schedule = Schedule::new(Uuid::now_v7(), None, vec![day]);
        assert_eq!(schedule.to_working_hours().wednesday, DaySchedule::closed());
    }

    #[test]
    fn test_working_hours_roundtrip() {
        let hours = WorkingHours::standard_week();
        let schedule = Schedule::from_working_hours(Uuid::now_v7(), &hours, 30);
        assert_eq!(schedule.working_days.len(), 7);
        assert_eq!(schedule.to_working_hours(), hours);
    }

    #[test]
    fn test_working_day_json_shape() {
        let json = r#"{"dayOfWeek": 4, "isOpen": true,
                       "timeBlocks": [{"start": "08:30", "end": "12:00"}]}"#;
        let day: WorkingDay = serde_json::from_str(json).unwrap();
        assert_eq!(day.weekday(), Some(Weekday::Fri));
        assert_eq!(day.time_blocks[0].start, t(8, 30));
        assert!(day.breaks.is_empty());
    }

    #[test]
    fn test_scope_messages() {
        assert_eq!(ScheduleScope::Business.table(), "business_schedules");
        assert_eq!(ScheduleScope::Employee.owner_column(), "employee_id");
        assert!(ScheduleScope::Employee.missing_message().ends_with("empleado"));
    }
}
