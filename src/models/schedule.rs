use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// Weekdays & Busy Windows
// ============================================================================

/// School days covered by a weekly plan, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchoolDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl SchoolDay {
    pub const ALL: [SchoolDay; 5] = [
        SchoolDay::Monday,
        SchoolDay::Tuesday,
        SchoolDay::Wednesday,
        SchoolDay::Thursday,
        SchoolDay::Friday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SchoolDay::Monday => "Monday",
            SchoolDay::Tuesday => "Tuesday",
            SchoolDay::Wednesday => "Wednesday",
            SchoolDay::Thursday => "Thursday",
            SchoolDay::Friday => "Friday",
        }
    }
}

impl fmt::Display for SchoolDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time range during which the student is busy on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl BusyWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, String> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.start > self.end {
            return Err(format!(
                "busy window ends ({}) before it starts ({})",
                format_time(self.end),
                format_time(self.start)
            ));
        }
        Ok(())
    }
}

/// One optional busy window per school day.
///
/// Accepts `{"monday": {...}, "Tuesday": null}`; missing days are free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtracurricularSchedule {
    #[serde(default, alias = "Monday")]
    pub monday: Option<BusyWindow>,
    #[serde(default, alias = "Tuesday")]
    pub tuesday: Option<BusyWindow>,
    #[serde(default, alias = "Wednesday")]
    pub wednesday: Option<BusyWindow>,
    #[serde(default, alias = "Thursday")]
    pub thursday: Option<BusyWindow>,
    #[serde(default, alias = "Friday")]
    pub friday: Option<BusyWindow>,
}

impl ExtracurricularSchedule {
    pub fn get(&self, day: SchoolDay) -> Option<&BusyWindow> {
        match day {
            SchoolDay::Monday => self.monday.as_ref(),
            SchoolDay::Tuesday => self.tuesday.as_ref(),
            SchoolDay::Wednesday => self.wednesday.as_ref(),
            SchoolDay::Thursday => self.thursday.as_ref(),
            SchoolDay::Friday => self.friday.as_ref(),
        }
    }

    pub fn set(&mut self, day: SchoolDay, window: Option<BusyWindow>) {
        let slot = match day {
            SchoolDay::Monday => &mut self.monday,
            SchoolDay::Tuesday => &mut self.tuesday,
            SchoolDay::Wednesday => &mut self.wednesday,
            SchoolDay::Thursday => &mut self.thursday,
            SchoolDay::Friday => &mut self.friday,
        };
        *slot = window;
    }

    /// Every school day in order, including free ones.
    pub fn days(&self) -> impl Iterator<Item = (SchoolDay, Option<&BusyWindow>)> + '_ {
        SchoolDay::ALL.into_iter().map(move |day| (day, self.get(day)))
    }

    pub fn validate(&self) -> Result<(), String> {
        for (day, window) in self.days() {
            if let Some(w) = window {
                w.validate().map_err(|e| format!("{}: {}", day, e))?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// School Hours
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolHours {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl SchoolHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, String> {
        if start >= end {
            return Err(format!(
                "school must end after it starts (got {} to {})",
                format_time(start),
                format_time(end)
            ));
        }
        Ok(Self { start, end })
    }
}

impl Default for SchoolHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(15, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Render a time of day the way it appears in prompts (`16:00`).
pub fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

/// Serde adapter for `HH:MM` times (seconds accepted on input).
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_time(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid time of day: {}", raw)))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{de, Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(d)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::super::parse_time(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid time of day: {}", raw))),
            }
        }
    }
}
