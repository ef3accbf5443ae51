//! Weekly working hours.
//!
//! The JSON shape is shared by business settings and the availability
//! calculation: one entry per weekday with opening, closing and an optional
//! break, times written as `HH:mm`. Stored documents written by older
//! clients use PascalCase keys, so both spellings are accepted on input.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Opening hours of a single weekday.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    #[serde(alias = "IsOpen")]
    pub is_open: bool,

    #[serde(alias = "OpenTime", default, with = "hhmm")]
    pub open_time: Option<NaiveTime>,

    #[serde(alias = "CloseTime", default, with = "hhmm")]
    pub close_time: Option<NaiveTime>,

    #[serde(alias = "BreakStartTime", default, with = "hhmm")]
    pub break_start_time: Option<NaiveTime>,

    #[serde(alias = "BreakEndTime", default, with = "hhmm")]
    pub break_end_time: Option<NaiveTime>,
}

impl DaySchedule {
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn open(open: NaiveTime, close: NaiveTime) -> Self {
        Self {
            is_open: true,
            open_time: Some(open),
            close_time: Some(close),
            break_start_time: None,
            break_end_time: None,
        }
    }

    pub fn with_break(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.break_start_time = Some(start);
        self.break_end_time = Some(end);
        self
    }

    /// Opening and closing time when the day is open and both are set.
    pub fn bounds(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.is_open, self.open_time, self.close_time) {
            (true, Some(open), Some(close)) if open < close => Some((open, close)),
            _ => None,
        }
    }

    /// Break window when both ends are set.
    pub fn break_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        match (self.break_start_time, self.break_end_time) {
            (Some(start), Some(end)) if start < end => Some((start, end)),
            _ => None,
        }
    }

    /// Whether `time` falls inside the break, start inclusive and end exclusive.
    pub fn is_break(&self, time: NaiveTime) -> bool {
        self.break_window()
            .map_or(false, |(start, end)| time >= start && time < end)
    }
}

/// A full week of opening hours.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    #[serde(alias = "Monday", default)]
    pub monday: DaySchedule,
    #[serde(alias = "Tuesday", default)]
    pub tuesday: DaySchedule,
    #[serde(alias = "Wednesday", default)]
    pub wednesday: DaySchedule,
    #[serde(alias = "Thursday", default)]
    pub thursday: DaySchedule,
    #[serde(alias = "Friday", default)]
    pub friday: DaySchedule,
    #[serde(alias = "Saturday", default)]
    pub saturday: DaySchedule,
    #[serde(alias = "Sunday", default)]
    pub sunday: DaySchedule,
}

impl WorkingHours {
    /// Monday to Friday 09:00-18:00, weekends closed.
    pub fn standard_week() -> Self {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default();
        let six = NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default();
        let weekday = DaySchedule::open(nine, six);
        Self {
            monday: weekday.clone(),
            tuesday: weekday.clone(),
            wednesday: weekday.clone(),
            thursday: weekday.clone(),
            friday: weekday,
            saturday: DaySchedule::closed(),
            sunday: DaySchedule::closed(),
        }
    }

    /// Parse the JSON document stored in business settings.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        // Plain structs of strings and bools always serialize
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn day(&self, weekday: Weekday) -> &DaySchedule {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    pub fn day_mut(&mut self, weekday: Weekday) -> &mut DaySchedule {
        match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }
}

/// Serde helpers for optional `HH:mm` times.
///
/// Input also accepts `HH:mm:ss` and treats empty strings as absent.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(value: &str) -> Option<NaiveTime> {
        let value = value.trim();
        NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}', expected HH:mm", s))),
        }
    }
}
