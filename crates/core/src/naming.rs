use crate::pattern::{parse_file_name, PatternKind, RenameError};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_SEQUENCE: &str = "0000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NameLayout {
    /// `YYYYMMDD_HHMMSS.ext`
    #[default]
    Flat,
    /// `YYYY/MM/YYYYMMDDTHHMMSS_SOURCE_SEQ.ext`
    Archive { source_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOptions {
    pub default_time: NaiveTime,
    pub layout: NameLayout,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            default_time: NaiveTime::MIN,
            layout: NameLayout::Flat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardizedName {
    pub kind: PatternKind,
    pub timestamp: NaiveDateTime,
    pub sequence: String,
    pub extension: String,
}

impl StandardizedName {
    pub fn flat_name(&self) -> String {
        format!(
            "{}.{}",
            self.timestamp.format("%Y%m%d_%H%M%S"),
            self.extension
        )
    }

    pub fn archive_name(&self, source_id: &str) -> String {
        format!(
            "{}{}_{}_{}.{}",
            self.timestamp.format("%Y/%m/"),
            self.timestamp.format("%Y%m%dT%H%M%S"),
            source_id,
            self.sequence,
            self.extension
        )
    }

    /// Relative name for `layout`. Archive names contain `/` separators for the
    /// year and month directories.
    pub fn render(&self, layout: &NameLayout) -> String {
        match layout {
            NameLayout::Flat => self.flat_name(),
            NameLayout::Archive { source_id } => self.archive_name(source_id),
        }
    }
}

impl fmt::Display for StandardizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flat_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenameResult {
    Renamed { from: String, to: String },
    Unchanged { name: String },
    NoMatch { reason: RenameError },
}

pub fn standardize_file_name(
    file_name: &str,
    options: &RenameOptions,
) -> Result<StandardizedName, RenameError> {
    let parsed = parse_file_name(file_name)?;
    Ok(StandardizedName {
        kind: parsed.kind,
        timestamp: parsed.timestamp(options.default_time),
        sequence: parsed
            .sequence
            .unwrap_or_else(|| DEFAULT_SEQUENCE.to_string()),
        extension: parsed.extension,
    })
}

pub fn rename(file_name: &str, options: &RenameOptions) -> RenameResult {
    match standardize_file_name(file_name, options) {
        Ok(name) => {
            let target = name.render(&options.layout);
            if target == file_name {
                RenameResult::Unchanged { name: target }
            } else {
                RenameResult::Renamed {
                    from: file_name.to_string(),
                    to: target,
                }
            }
        }
        Err(reason) => RenameResult::NoMatch { reason },
    }
}
