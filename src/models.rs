use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Weekday};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar day, keyed in the store as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for DateKey {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDateKey(pub String);

impl fmt::Display for InvalidDateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid date '{}', expected YYYY-MM-DD", self.0)
    }
}

impl std::error::Error for InvalidDateKey {}

impl FromStr for DateKey {
    type Err = InvalidDateKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `%Y` alone would also accept years without zero padding; require the canonical width.
        if s.len() != 10 {
            return Err(InvalidDateKey(s.to_string()));
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Self)
            .map_err(|_| InvalidDateKey(s.to_string()))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DateKeyVisitor;

        impl Visitor<'_> for DateKeyVisitor {
            type Value = DateKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a YYYY-MM-DD date string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<DateKey, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(DateKeyVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub task: String,
}

impl Task {
    pub fn new(id: u64, task: impl Into<String>) -> Self {
        Self {
            id: TaskId(id),
            task: task.into(),
        }
    }
}

/// Persisted shape of the task blob: `{ "YYYY-MM-DD": [{ "id", "task" }, ...] }`.
pub type TaskMap = BTreeMap<DateKey, Vec<Task>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }

    /// Regions that conventionally print Sunday in the first calendar column.
    pub fn for_locale(locale: Option<&str>) -> Self {
        let region = locale
            .and_then(|tag| tag.split(['-', '_', '.']).nth(1))
            .map(|region| region.to_ascii_uppercase());
        match region.as_deref() {
            Some("US" | "CA" | "JP" | "BR" | "MX" | "IL" | "PH" | "KR" | "TW" | "IN") => {
                WeekStart::Sunday
            }
            _ => WeekStart::Monday,
        }
    }
}

impl Default for WeekStart {
    fn default() -> Self {
        WeekStart::for_locale(sys_locale::get_locale().as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default)]
    pub week_start: WeekStart,
    #[serde(default = "default_seed_example_tasks")]
    pub seed_example_tasks: bool,
    #[serde(default = "default_tasks_key")]
    pub tasks_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            week_start: WeekStart::default(),
            seed_example_tasks: default_seed_example_tasks(),
            tasks_key: default_tasks_key(),
        }
    }
}

fn default_seed_example_tasks() -> bool {
    true
}

pub fn default_tasks_key() -> String {
    "tasks".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}
