//! Weekly schedule records.
//!
//! One record per weekday, stored under the lowercase day name:
//!
//! ```json
//! {"day":"monday","from":"09:00","to":"17:00","is_manually_decaffeinated":false,"is_running":false}
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::CoffeeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    /// Store key and serialized form.
    pub fn key(&self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        }
    }
}

impl From<Weekday> for Day {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Day::Monday,
            Weekday::Tue => Day::Tuesday,
            Weekday::Wed => Day::Wednesday,
            Weekday::Thu => Day::Thursday,
            Weekday::Fri => Day::Friday,
            Weekday::Sat => Day::Saturday,
            Weekday::Sun => Day::Sunday,
        }
    }
}

impl FromStr for Day {
    type Err = CoffeeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Day::ALL
            .into_iter()
            .find(|day| day.key() == lowered || day.key()[..3] == *lowered)
            .ok_or_else(|| CoffeeError::InvalidDay(s.to_string()))
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Hour and minute, with no date attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, CoffeeError> {
        if hour > 23 || minute > 59 {
            return Err(CoffeeError::InvalidTime(format!("{}:{:02}", hour, minute)));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        u32::from(self.hour) * 60 + u32::from(self.minute)
    }

    /// Truncates a wall-clock time to hour and minute.
    pub fn from_time<T: Timelike>(time: &T) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    pub fn to_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = CoffeeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoffeeError::InvalidTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;
        TimeOfDay::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = CoffeeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> String {
        time.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub day: Day,
    pub from: TimeOfDay,
    pub to: TimeOfDay,
    #[serde(default)]
    pub is_manually_decaffeinated: bool,
    #[serde(default)]
    pub is_running: bool,
}

impl Schedule {
    /// A fresh, idle schedule. `from` must be earlier than `to`.
    pub fn new(day: Day, from: TimeOfDay, to: TimeOfDay) -> Result<Self, CoffeeError> {
        if from >= to {
            return Err(CoffeeError::InvalidSchedule {
                day: day.to_string(),
                reason: format!("start {} must be before end {}", from, to),
            });
        }
        Ok(Self {
            day,
            from,
            to,
            is_manually_decaffeinated: false,
            is_running: false,
        })
    }

    /// Whether `time` falls in `[from, to)`. Empty for `from >= to`.
    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.from <= time && time < self.to
    }

    /// Window length in seconds, never negative.
    pub fn duration_secs(&self) -> u64 {
        u64::from(
            self.to
                .minutes_since_midnight()
                .saturating_sub(self.from.minutes_since_midnight()),
        ) * 60
    }
}
