use crate::pattern::PatternKind;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedFilename {
    pub kind: PatternKind,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub sequence: Option<String>,
    pub extension: String,
    pub original_name: String,
}

impl ParsedFilename {
    /// Combines the extracted date with its own time, or `default_time` when the
    /// format carries no time component.
    pub fn timestamp(&self, default_time: NaiveTime) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(default_time))
    }
}
