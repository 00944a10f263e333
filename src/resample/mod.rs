//! Aggregation of play events into fixed-frequency listening series.
//!
//! Buckets are laid out from midnight UTC of the day of the earliest play.
//! Each bucket reports the number of distinct artists, distinct albums and
//! total plays that fall in it. Every bucket between the first and the last
//! play is present; buckets without plays report zeros.

mod event;

pub use event::{
    parse_events, parse_timestamp, plays_by_hour, Event, EventColumns, API_FORMAT,
    DEFAULT_FORMATS, EXPORT_FORMAT,
};

use crate::core::{Frequency, TimeSeries, TimeSeriesBuilder};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// A column of a resampled listening series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListeningMetric {
    /// Distinct artists per bucket.
    Artist,
    /// Distinct albums per bucket.
    Album,
    /// Plays per bucket.
    #[default]
    Track,
}

impl ListeningMetric {
    pub const ALL: [ListeningMetric; 3] = [Self::Artist, Self::Album, Self::Track];

    /// Column label in the resampled series.
    pub fn label(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Track => "track",
        }
    }

    /// Extract this metric as a univariate series.
    pub fn select(self, series: &TimeSeries) -> Result<TimeSeries> {
        series.column(self.label())
    }
}

/// Settings for [`Resampler`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub frequency: Frequency,
}

impl ResampleConfig {
    pub fn new(frequency: Frequency) -> Self {
        Self { frequency }
    }
}

/// Resamples events at a configured frequency.
#[derive(Debug, Clone, Default)]
pub struct Resampler {
    config: ResampleConfig,
}

impl Resampler {
    pub fn new(config: ResampleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResampleConfig {
        &self.config
    }

    pub fn resample(&self, events: &[Event]) -> Result<TimeSeries> {
        resample(events, self.config.frequency)
    }
}

#[derive(Default)]
struct Bucket<'a> {
    artists: HashSet<&'a str>,
    albums: HashSet<&'a str>,
    plays: usize,
}

/// Aggregate `events` into `artist`, `album` and `track` columns at
/// `frequency`. Events need not be sorted.
pub fn resample(events: &[Event], frequency: Frequency) -> Result<TimeSeries> {
    let first = events
        .iter()
        .map(|e| e.played_at)
        .min()
        .ok_or_else(|| ForecastError::malformed("no events to resample"))?;
    let origin = midnight(first);

    let indices: Vec<i64> = events
        .iter()
        .map(|e| frequency.bucket_index(origin, e.played_at))
        .collect();
    let lo = indices.iter().copied().min().unwrap_or(0);
    let hi = indices.iter().copied().max().unwrap_or(0);
    let n_buckets = usize::try_from(hi - lo + 1)
        .map_err(|_| ForecastError::ComputationError("bucket range overflow".into()))?;

    let mut buckets: Vec<Bucket<'_>> = (0..n_buckets).map(|_| Bucket::default()).collect();
    for (event, k) in events.iter().zip(&indices) {
        let bucket = &mut buckets[(k - lo) as usize];
        bucket.artists.insert(&event.artist);
        bucket.albums.insert(&event.album);
        bucket.plays += 1;
    }

    let start = frequency.advance(origin, lo)?;
    let timestamps = (0..n_buckets as i64)
        .map(|i| frequency.advance(start, i))
        .collect::<Result<Vec<_>>>()?;
    let column =
        |f: fn(&Bucket<'_>) -> usize| -> Vec<f64> { buckets.iter().map(|b| f(b) as f64).collect() };

    debug!(
        events = events.len(),
        buckets = n_buckets,
        frequency = %frequency,
        start = %start,
        "resampled listening events"
    );

    TimeSeriesBuilder::new()
        .timestamps(timestamps)
        .column(ListeningMetric::Artist.label(), column(|b| b.artists.len()))
        .column(ListeningMetric::Album.label(), column(|b| b.albums.len()))
        .column(ListeningMetric::Track.label(), column(|b| b.plays))
        .frequency(frequency)
        .build()
}

fn midnight(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, m, 0).unwrap()
    }

    #[test]
    fn daily_counts_distinct_artists_albums_and_plays() {
        let events = vec![
            Event::new("A", "A1", "t1", at(1, 9, 0)),
            Event::new("A", "A1", "t2", at(1, 10, 0)),
            Event::new("B", "B1", "t3", at(1, 23, 59)),
            Event::new("A", "A2", "t4", at(2, 0, 0)),
        ];
        let series = resample(&events, Frequency::daily()).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.start(), Some(at(1, 0, 0)));
        assert_eq!(series.values_by_label("artist").unwrap(), &[2.0, 1.0]);
        assert_eq!(series.values_by_label("album").unwrap(), &[2.0, 1.0]);
        assert_eq!(series.values_by_label("track").unwrap(), &[3.0, 1.0]);
        assert_eq!(series.frequency(), Some(Frequency::daily()));
    }

    #[test]
    fn empty_days_are_zero_filled() {
        let events = vec![
            Event::new("A", "A1", "t1", at(1, 12, 0)),
            Event::new("B", "B1", "t2", at(3, 12, 0)),
        ];
        let series = resample(&events, Frequency::daily()).unwrap();
        assert_eq!(series.timestamps(), &[at(1, 0, 0), at(2, 0, 0), at(3, 0, 0)]);
        assert_eq!(series.values_by_label("track").unwrap(), &[1.0, 0.0, 1.0]);
        assert_eq!(series.values_by_label("artist").unwrap(), &[1.0, 0.0, 1.0]);
    }

    #[test]
    fn sub_daily_buckets_start_at_first_occupied_slot() {
        let events = vec![
            Event::new("A", "A1", "t1", at(1, 13, 10)),
            Event::new("A", "A1", "t2", at(1, 19, 0)),
            Event::new("A", "A1", "t3", at(1, 13, 50)),
        ];
        let six_hours = Frequency::hours(6).unwrap();
        let series = resample(&events, six_hours).unwrap();
        assert_eq!(series.timestamps(), &[at(1, 12, 0), at(1, 18, 0)]);
        assert_eq!(series.values_by_label("track").unwrap(), &[2.0, 1.0]);
    }

    #[test]
    fn unsorted_input_and_weekly_buckets() {
        let events = vec![
            Event::new("A", "A1", "t1", at(20, 8, 0)),
            Event::new("B", "B1", "t2", at(4, 8, 0)),
        ];
        let series = Resampler::new(ResampleConfig::new(Frequency::weekly()))
            .resample(&events)
            .unwrap();
        assert_eq!(series.timestamps(), &[at(4, 0, 0), at(11, 0, 0), at(18, 0, 0)]);
        assert_eq!(series.values_by_label("track").unwrap(), &[1.0, 0.0, 1.0]);
    }

    #[test]
    fn no_events_is_malformed() {
        assert!(matches!(
            resample(&[], Frequency::daily()),
            Err(ForecastError::MalformedSeries(_))
        ));
    }

    #[test]
    fn metric_selects_a_column() {
        let events = vec![Event::new("A", "A1", "t1", at(1, 12, 0))];
        let series = resample(&events, Frequency::daily()).unwrap();
        for metric in ListeningMetric::ALL {
            let column = metric.select(&series).unwrap();
            assert_eq!(column.primary_values(), &[1.0]);
        }
        assert_eq!(ListeningMetric::default(), ListeningMetric::Track);
    }

    #[test]
    fn config_deserializes_frequency_alias() {
        let config: ResampleConfig = serde_json::from_str(r#"{"frequency": "7D"}"#).unwrap();
        assert_eq!(config.frequency, Frequency::weekly());
        let default: ResampleConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(default.frequency, Frequency::daily());
    }
}
