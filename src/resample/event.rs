//! Play events and their string-record ingestion.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Layout of listening-history export files, e.g. `31 Jan 2024, 18:05`.
pub const EXPORT_FORMAT: &str = "%d %b %Y, %H:%M";

/// Layout of timestamps returned by the scrobbling API, e.g.
/// `2024-01-31 18:05:00`.
pub const API_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats tried by default, in order.
pub const DEFAULT_FORMATS: [&str; 2] = [EXPORT_FORMAT, API_FORMAT];

/// One play of one track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub artist: String,
    pub album: String,
    pub track: String,
    /// When the play happened, in UTC.
    pub played_at: DateTime<Utc>,
}

impl Event {
    pub fn new(
        artist: impl Into<String>,
        album: impl Into<String>,
        track: impl Into<String>,
        played_at: DateTime<Utc>,
    ) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
            track: track.into(),
            played_at,
        }
    }

    /// Build an event from a string record keyed by column name.
    pub fn parse(
        record: &HashMap<String, String>,
        columns: &EventColumns,
        formats: &[&str],
    ) -> Result<Self> {
        let field = |name: &str| {
            record
                .get(name)
                .ok_or_else(|| ForecastError::malformed(format!("record has no '{name}' column")))
        };
        let raw_time = field(&columns.time)?;
        Ok(Self {
            artist: field(&columns.artist)?.clone(),
            album: field(&columns.album)?.clone(),
            track: field(&columns.track)?.clone(),
            played_at: parse_timestamp(raw_time, formats)?,
        })
    }

    /// Hour of day (0-23, UTC) of the play.
    pub fn hour_played(&self) -> u32 {
        self.played_at.hour()
    }
}

/// Column names of a string record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventColumns {
    pub time: String,
    pub artist: String,
    pub album: String,
    pub track: String,
}

impl Default for EventColumns {
    fn default() -> Self {
        Self {
            time: "date_played".into(),
            artist: "artist".into(),
            album: "album".into(),
            track: "track".into(),
        }
    }
}

impl EventColumns {
    /// Columns of a listening-history export file.
    pub fn export() -> Self {
        Self {
            time: "utc_time".into(),
            ..Self::default()
        }
    }

    /// Columns of records fetched from the scrobbling API.
    pub fn api() -> Self {
        Self {
            time: "date".into(),
            track: "name".into(),
            ..Self::default()
        }
    }
}

/// Parse a UTC timestamp trying each format in turn, then unix seconds.
pub fn parse_timestamp(raw: &str, formats: &[&str]) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Some(parsed) = formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Ok(parsed.and_utc());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .ok_or_else(|| ForecastError::malformed(format!("unparseable timestamp '{raw}'")))
}

/// Parse every record; the first bad record fails the batch.
pub fn parse_events(
    records: &[HashMap<String, String>],
    columns: &EventColumns,
    formats: &[&str],
) -> Result<Vec<Event>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            Event::parse(record, columns, formats).map_err(|err| match err {
                ForecastError::MalformedSeries(msg) => {
                    ForecastError::malformed(format!("record {i}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}

/// Plays per hour of day.
pub fn plays_by_hour(events: &[Event]) -> [usize; 24] {
    let mut counts = [0; 24];
    for event in events {
        counts[event.hour_played() as usize] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_both_layouts_and_unix_seconds() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 31, 18, 5, 0).unwrap();
        assert_eq!(parse_timestamp("31 Jan 2024, 18:05", &DEFAULT_FORMATS).unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-31 18:05:00", &DEFAULT_FORMATS).unwrap(), expected);
        assert_eq!(
            parse_timestamp(&expected.timestamp().to_string(), &DEFAULT_FORMATS).unwrap(),
            expected
        );
        assert!(matches!(
            parse_timestamp("yesterday", &DEFAULT_FORMATS),
            Err(ForecastError::MalformedSeries(_))
        ));
    }

    #[test]
    fn parses_export_and_api_records() {
        let export = record(&[
            ("utc_time", "01 Feb 2024, 07:30"),
            ("artist", "Low"),
            ("album", "HEY WHAT"),
            ("track", "White Horses"),
        ]);
        let event = Event::parse(&export, &EventColumns::export(), &DEFAULT_FORMATS).unwrap();
        assert_eq!(event.track, "White Horses");
        assert_eq!(event.hour_played(), 7);

        let api = record(&[
            ("date", "2024-02-01 07:30:00"),
            ("artist", "Low"),
            ("album", "HEY WHAT"),
            ("name", "White Horses"),
        ]);
        assert_eq!(
            Event::parse(&api, &EventColumns::api(), &DEFAULT_FORMATS).unwrap(),
            event
        );
    }

    #[test]
    fn missing_or_bad_time_column_is_malformed() {
        let no_time = record(&[("artist", "a"), ("album", "b"), ("track", "c")]);
        let bad_time = record(&[
            ("date_played", "not a date"),
            ("artist", "a"),
            ("album", "b"),
            ("track", "c"),
        ]);
        let ok = record(&[
            ("date_played", "2024-01-01 00:00:00"),
            ("artist", "a"),
            ("album", "b"),
            ("track", "c"),
        ]);

        let columns = EventColumns::default();
        let err = parse_events(&[ok.clone(), no_time], &columns, &DEFAULT_FORMATS).unwrap_err();
        assert_eq!(
            err,
            ForecastError::MalformedSeries("record 1: record has no 'date_played' column".into())
        );
        assert!(parse_events(&[bad_time], &columns, &DEFAULT_FORMATS).is_err());
        assert_eq!(parse_events(&[ok], &columns, &DEFAULT_FORMATS).unwrap().len(), 1);
    }

    #[test]
    fn hourly_profile_counts_plays() {
        let at = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
        let events = vec![
            Event::new("a", "x", "1", at(9)),
            Event::new("a", "x", "2", at(9)),
            Event::new("b", "y", "3", at(23)),
        ];
        let counts = plays_by_hour(&events);
        assert_eq!(counts[9], 2);
        assert_eq!(counts[23], 1);
        assert_eq!(counts.iter().sum::<usize>(), 3);
    }
}
