use crate::parsed::ParsedFilename;
use chrono::{NaiveDate, NaiveTime};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Known source formats, in the order they are tried.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// `YYYYMMDD_HHMMSS.ext`, which is also the standardized form.
    Android,
    /// `IMG-YYYYMMDD-WAxxxx.ext`
    WhatsAppImage,
    /// `VID-YYYYMMDD-WAxxxx.ext`
    WhatsAppVideo,
}

pub const PATTERN_ORDER: [PatternKind; 3] = [
    PatternKind::Android,
    PatternKind::WhatsAppImage,
    PatternKind::WhatsAppVideo,
];

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenameError {
    #[error("file name does not match any known format: {0}")]
    UnrecognizedFormat(String),
    #[error("invalid timestamp {value} in {file_name}")]
    InvalidTimestamp { file_name: String, value: String },
}

static ANDROID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<date>[0-9]{8})_(?P<time>[0-9]{6})\.(?P<ext>(?i:jpe?g|mp4))$")
        .expect("Invalid regex")
});

static WHATSAPP_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^IMG-(?P<date>[0-9]{8})-WA(?P<seq>[0-9]{4})\.(?P<ext>(?i:jpe?g))$")
        .expect("Invalid regex")
});

static WHATSAPP_VIDEO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^VID-(?P<date>[0-9]{8})-WA(?P<seq>[0-9]{4})\.(?P<ext>(?i:mp4|3gp))$")
        .expect("Invalid regex")
});

impl PatternKind {
    pub fn label(self) -> &'static str {
        match self {
            PatternKind::Android => "android",
            PatternKind::WhatsAppImage => "whatsapp-image",
            PatternKind::WhatsAppVideo => "whatsapp-video",
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            PatternKind::Android => &ANDROID,
            PatternKind::WhatsAppImage => &WHATSAPP_IMAGE,
            PatternKind::WhatsAppVideo => &WHATSAPP_VIDEO,
        }
    }

    pub fn matches(self, file_name: &str) -> bool {
        self.regex().is_match(file_name)
    }

    /// Parses `file_name` against this pattern only.
    ///
    /// `None` when the name does not have this pattern's shape. A name with the
    /// right shape but an impossible date or time is an `InvalidTimestamp` error.
    pub fn parse(self, file_name: &str) -> Option<Result<ParsedFilename, RenameError>> {
        let caps = self.regex().captures(file_name)?;
        Some(build_parsed(self, file_name, &caps))
    }
}

pub fn identify_pattern(file_name: &str) -> Option<PatternKind> {
    PATTERN_ORDER
        .into_iter()
        .find(|kind| kind.matches(file_name))
}

pub fn parse_file_name(file_name: &str) -> Result<ParsedFilename, RenameError> {
    PATTERN_ORDER
        .into_iter()
        .find_map(|kind| kind.parse(file_name))
        .unwrap_or_else(|| Err(RenameError::UnrecognizedFormat(file_name.to_string())))
}

fn build_parsed(
    kind: PatternKind,
    file_name: &str,
    caps: &Captures<'_>,
) -> Result<ParsedFilename, RenameError> {
    let date_raw = &caps["date"];
    let date = NaiveDate::parse_from_str(date_raw, "%Y%m%d")
        .map_err(|_| invalid_timestamp(file_name, date_raw))?;

    let time = match caps.name("time") {
        Some(raw) => Some(
            NaiveTime::parse_from_str(raw.as_str(), "%H%M%S")
                .map_err(|_| invalid_timestamp(file_name, raw.as_str()))?,
        ),
        None => None,
    };

    Ok(ParsedFilename {
        kind,
        date,
        time,
        sequence: caps.name("seq").map(|m| m.as_str().to_string()),
        extension: caps["ext"].to_string(),
        original_name: file_name.to_string(),
    })
}

fn invalid_timestamp(file_name: &str, value: &str) -> RenameError {
    RenameError::InvalidTimestamp {
        file_name: file_name.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_each_known_format() {
        assert_eq!(
            identify_pattern("20240724_182842.jpg"),
            Some(PatternKind::Android)
        );
        assert_eq!(
            identify_pattern("20240721_121233.mp4"),
            Some(PatternKind::Android)
        );
        assert_eq!(
            identify_pattern("IMG-20240721-WA0007.jpg"),
            Some(PatternKind::WhatsAppImage)
        );
        assert_eq!(
            identify_pattern("VID-20240721-WA0007.mp4"),
            Some(PatternKind::WhatsAppVideo)
        );
    }

    #[test]
    fn extension_case_is_ignored_for_recognition() {
        assert_eq!(
            identify_pattern("20240724_182842.JPG"),
            Some(PatternKind::Android)
        );
        assert_eq!(
            identify_pattern("VID-20240721-WA0000.MP4"),
            Some(PatternKind::WhatsAppVideo)
        );
    }

    #[test]
    fn rejects_unknown_and_partial_names() {
        assert_eq!(identify_pattern("document.pdf"), None);
        assert_eq!(identify_pattern("IMG-20240721.jpg"), None);
        assert_eq!(identify_pattern("IMG-20240721-WA0007.mp4"), None);
        assert_eq!(identify_pattern("x20240724_182842.jpg"), None);
        assert_eq!(identify_pattern("20240724_182842.jpg.bak"), None);
    }

    #[test]
    fn parse_extracts_date_time_and_sequence() {
        let parsed = parse_file_name("20240724_182842.jpg").expect("android parses");
        assert_eq!(parsed.kind, PatternKind::Android);
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 7, 24).expect("date"));
        assert_eq!(parsed.time, NaiveTime::from_hms_opt(18, 28, 42));
        assert_eq!(parsed.sequence, None);
        assert_eq!(parsed.extension, "jpg");

        let parsed = parse_file_name("IMG-20240721-WA0007.JPEG").expect("whatsapp parses");
        assert_eq!(parsed.kind, PatternKind::WhatsAppImage);
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 7, 21).expect("date"));
        assert_eq!(parsed.time, None);
        assert_eq!(parsed.sequence.as_deref(), Some("0007"));
        assert_eq!(parsed.extension, "JPEG");
        assert_eq!(parsed.original_name, "IMG-20240721-WA0007.JPEG");
    }

    #[test]
    fn unknown_name_is_unrecognized() {
        let err = parse_file_name("document.pdf").expect_err("pdf is not media");
        assert_eq!(err, RenameError::UnrecognizedFormat("document.pdf".to_string()));
    }

    #[test]
    fn non_ascii_digits_are_unrecognized() {
        for name in [
            "٢٠٢٤٠٧٢١_١٢٠٠٠٠.jpg",
            "IMG-２０２４０７２１-WA0007.jpg",
            "VID-20240721-WA０００１.mp4",
        ] {
            assert_eq!(identify_pattern(name), None);
            assert_eq!(
                parse_file_name(name),
                Err(RenameError::UnrecognizedFormat(name.to_string()))
            );
        }
    }

    #[test]
    fn impossible_dates_are_reported_distinctly() {
        let err = parse_file_name("20241301_120000.jpg").expect_err("month 13");
        assert_eq!(
            err,
            RenameError::InvalidTimestamp {
                file_name: "20241301_120000.jpg".to_string(),
                value: "20241301".to_string(),
            }
        );

        let err = parse_file_name("20240721_256000.jpg").expect_err("hour 25");
        assert!(matches!(err, RenameError::InvalidTimestamp { value, .. } if value == "256000"));

        let err = parse_file_name("VID-20230230-WA0001.mp4").expect_err("feb 30");
        assert!(matches!(err, RenameError::InvalidTimestamp { .. }));
    }
}
