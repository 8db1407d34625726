//! Anchor records and the expiration rewrite applied to them.

use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat};
use serde::Deserialize;

use crate::error::ExpireTimeError;

/// A cloud anchor as returned by the management API.
///
/// Only the fields this tool touches are kept; the API sends more.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    /// Resource name, `anchors/{id}`.
    pub name: String,
    pub expire_time: String,
}

impl Anchor {
    /// Short id used in the patch URL: everything after the last `/`.
    pub fn id(&self) -> &str {
        match self.name.rsplit_once('/') {
            Some((_, id)) => id,
            None => &self.name,
        }
    }

    pub fn refreshed_expire_time(&self, year: i32) -> Result<Option<String>, ExpireTimeError> {
        refreshed_expire_time(&self.expire_time, year)
    }
}

/// Moves an RFC 3339 timestamp into `year`, keeping everything else.
///
/// Returns `Ok(None)` when the timestamp is already in `year`. The
/// fractional-second precision, the offset notation (`Z` or `+hh:mm`) and
/// the case of the `T`/`Z` letters of the input are reproduced in the output.
pub fn refreshed_expire_time(value: &str, year: i32) -> Result<Option<String>, ExpireTimeError> {
    let parsed = DateTime::parse_from_rfc3339(value).map_err(|e| ExpireTimeError::Parse {
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    if parsed.year() == year {
        return Ok(None);
    }

    let moved: DateTime<FixedOffset> =
        parsed.with_year(year).ok_or_else(|| ExpireTimeError::NoSuchDate {
            value: value.to_string(),
            year,
        })?;

    let use_z = value.ends_with('Z') || value.ends_with('z');
    let formatted = moved.to_rfc3339_opts(seconds_format(value), use_z);
    Ok(Some(match_letter_case(formatted, value)))
}

/// Copies the input's date/time separator and lowercase `z` onto `formatted`.
fn match_letter_case(mut formatted: String, value: &str) -> String {
    // both strings start with a fixed-width `YYYY-MM-DD` date
    if formatted.get(10..11) == Some("T") {
        if let Some(sep) = value.get(10..11).filter(|sep| *sep != "T") {
            formatted.replace_range(10..11, sep);
        }
    }
    if value.ends_with('z') && formatted.ends_with('Z') {
        formatted.pop();
        formatted.push('z');
    }
    formatted
}

/// Picks the serialization precision matching the input's fraction digits.
fn seconds_format(value: &str) -> SecondsFormat {
    let time = match value.find(['T', 't', ' ']) {
        Some(pos) => &value[pos..],
        None => value,
    };
    let digits = match time.find('.') {
        Some(dot) => time[dot + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .count(),
        None => 0,
    };

    match digits {
        0 => SecondsFormat::Secs,
        3 => SecondsFormat::Millis,
        6 => SecondsFormat::Micros,
        9 => SecondsFormat::Nanos,
        _ => SecondsFormat::AutoSi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn anchor(name: &str, expire_time: &str) -> Anchor {
        Anchor {
            name: name.to_string(),
            expire_time: expire_time.to_string(),
        }
    }

    #[test]
    fn id_is_text_after_last_slash() {
        assert_eq!(anchor("anchors/abc123", "").id(), "abc123");
        assert_eq!(anchor("projects/p/anchors/ua-9", "").id(), "ua-9");
        assert_eq!(anchor("abc123", "").id(), "abc123");
    }

    #[rstest]
    #[case("2024-05-01T00:00:00Z", "2030-05-01T00:00:00Z")]
    #[case("2025-12-31T23:59:59.123Z", "2030-12-31T23:59:59.123Z")]
    #[case("2023-01-15T08:30:00.123456Z", "2030-01-15T08:30:00.123456Z")]
    #[case("2022-07-04T12:00:00.987654321Z", "2030-07-04T12:00:00.987654321Z")]
    #[case("2024-03-10T17:45:00+05:30", "2030-03-10T17:45:00+05:30")]
    #[case("2024-03-10T17:45:00+00:00", "2030-03-10T17:45:00+00:00")]
    #[case("2031-06-01T00:00:00Z", "2030-06-01T00:00:00Z")]
    #[case("2024-05-01t00:00:00z", "2030-05-01t00:00:00z")]
    #[case("2024-05-01t00:00:00.250Z", "2030-05-01t00:00:00.250Z")]
    fn moves_year_and_keeps_suffix(#[case] old: &str, #[case] expected: &str) {
        let new = refreshed_expire_time(old, 2030).unwrap().unwrap();
        assert_eq!(new, expected);
        assert_eq!(&new[..4], "2030");
        assert_eq!(&new[4..], &old[4..]);
    }

    #[test]
    fn already_in_target_year_is_left_alone() {
        assert_eq!(refreshed_expire_time("2030-05-01T00:00:00Z", 2030), Ok(None));
        assert_eq!(
            anchor("anchors/a", "2030-01-01T00:00:00.5Z").refreshed_expire_time(2030),
            Ok(None)
        );
    }

    #[test]
    fn odd_fraction_width_still_round_trips_the_instant() {
        let new = refreshed_expire_time("2024-05-01T00:00:00.5Z", 2030)
            .unwrap()
            .unwrap();
        let parsed = DateTime::parse_from_rfc3339(&new).unwrap();
        assert_eq!(parsed.year(), 2030);
        assert_eq!(parsed.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn leap_day_has_no_2030_counterpart() {
        let err = refreshed_expire_time("2024-02-29T10:00:00Z", 2030).unwrap_err();
        assert!(matches!(err, ExpireTimeError::NoSuchDate { year: 2030, .. }));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = refreshed_expire_time("not a timestamp", 2030).unwrap_err();
        assert!(matches!(err, ExpireTimeError::Parse { .. }));
    }

    #[test]
    fn deserializes_api_shape() {
        let json = r#"{
            "name": "anchors/ua-1",
            "createTime": "2023-01-01T00:00:00Z",
            "expireTime": "2024-01-01T00:00:00Z",
            "lastLocalizeTime": "2023-06-01T00:00:00Z"
        }"#;
        let parsed: Anchor = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, anchor("anchors/ua-1", "2024-01-01T00:00:00Z"));
    }
}
