//! End-to-end tests: play events through resampling into forecasts.

use chrono::{DateTime, Duration, TimeZone, Utc};
use scrobble_forecast::analysis::{adf_test, Detrend, Periodogram, DEFAULT_MAX_LAG};
use scrobble_forecast::core::{Frequency, Horizon, TimeSeries};
use scrobble_forecast::models::arima::{OrderSearch, OrderSearchConfig};
use scrobble_forecast::models::{Forecaster, ForecasterConfig, TwoStageForecaster};
use scrobble_forecast::regression::ForestConfig;
use scrobble_forecast::resample::{
    parse_events, resample, Event, EventColumns, ListeningMetric, DEFAULT_FORMATS,
};
use scrobble_forecast::ForecastError;
use std::collections::HashMap;

fn day(d: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(d - 1)
}

fn daily(values: Vec<f64>) -> TimeSeries {
    TimeSeries::regular(day(1), Frequency::daily(), values).unwrap()
}

/// Two years of daily plays with a weekly rhythm and a slow climb.
fn listening_history() -> Vec<Event> {
    let mut events = Vec::new();
    for d in 0..730i64 {
        let plays = 10 + d / 60 + if d % 7 >= 5 { 8 } else { 0 };
        for k in 0..plays {
            events.push(Event::new(
                format!("artist {}", k % 4),
                format!("album {}", k % 6),
                format!("track {k}"),
                day(d + 1) + Duration::minutes(30 * k),
            ));
        }
    }
    events
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn one_step_forecast_follows_last_bucket() {
    init_tracing();
    let events = vec![
        Event::new("a", "x", "1", day(1) + Duration::hours(8)),
        Event::new("a", "x", "2", day(1) + Duration::hours(9)),
        Event::new("b", "y", "3", day(2) + Duration::hours(20)),
        Event::new("b", "y", "4", day(4) + Duration::hours(1)),
    ];
    let series = resample(&events, Frequency::daily()).unwrap();
    let plays = ListeningMetric::Track.select(&series).unwrap();
    assert_eq!(plays.primary_values(), &[2.0, 1.0, 0.0, 1.0]);

    let mut model = TwoStageForecaster::default();
    model.fit(&plays).unwrap();
    let forecast = model.predict(1).unwrap();
    assert_eq!(forecast.timestamps(), &[day(5)]);
    assert!(forecast.values()[0].is_finite());
}

#[test]
fn empty_day_inside_range_is_counted_as_zero() {
    let events = vec![
        Event::new("a", "x", "1", day(1) + Duration::hours(12)),
        Event::new("a", "x", "2", day(3) + Duration::hours(12)),
    ];
    let series = resample(&events, Frequency::daily()).unwrap();
    assert_eq!(series.timestamps(), &[day(1), day(2), day(3)]);
    for metric in ListeningMetric::ALL {
        assert_eq!(series.values_by_label(metric.label()).unwrap()[1], 0.0);
    }
}

#[test]
fn short_series_forecast_is_repeatable() {
    let series = daily(vec![10.0, 12.0, 9.0, 11.0]);

    let mut model = TwoStageForecaster::default();
    model.fit(&series).unwrap();
    let first = model.predict(2).unwrap();
    assert_eq!(first.timestamps(), &[day(5), day(6)]);

    model.fit(&series).unwrap();
    assert_eq!(model.predict(2).unwrap(), first);

    let mut fresh = TwoStageForecaster::default();
    fresh.fit(&series).unwrap();
    assert_eq!(fresh.predict(2).unwrap(), first);
}

#[test]
fn shorter_horizon_is_a_prefix() {
    let events = listening_history();
    let series = resample(&events, Frequency::daily()).unwrap();
    let plays = ListeningMetric::Track.select(&series).unwrap();

    let mut model = TwoStageForecaster::new(
        ForecasterConfig::default().with_forest(ForestConfig::default().with_n_estimators(10)),
    );
    model.fit(&plays).unwrap();
    let week = model.predict(7).unwrap();
    let month = model.predict(30).unwrap();
    assert_eq!(week.values(), &month.values()[..7]);
    assert_eq!(week.timestamps()[0], plays.end().unwrap() + Duration::days(1));

    // the trend stage follows the climb
    let parts = model.predict_components(30).unwrap();
    assert!(parts.trend[29] > plays.primary_values()[0]);
}

#[test]
fn horizon_and_fit_guards() {
    let model = TwoStageForecaster::default();
    assert_eq!(model.predict(3), Err(ForecastError::UnfittedModel));
    assert_eq!(Horizon::try_from(-3i64), Err(ForecastError::InvalidHorizon(-3)));
    assert_eq!(Horizon::try_from(0i64), Err(ForecastError::InvalidHorizon(0)));

    let mut model = TwoStageForecaster::default();
    let err = model.fit(&daily(vec![1.0, f64::NAN, 3.0])).unwrap_err();
    assert!(matches!(err, ForecastError::MalformedSeries(_)));
    assert!(!model.is_fitted());

    model.fit(&daily(vec![1.0, 2.0, 3.0])).unwrap();
    assert_eq!(model.predict(0), Err(ForecastError::InvalidHorizon(0)));
    let kept = model.predict(2).unwrap();
    assert!(model.fit(&daily(vec![f64::INFINITY])).is_err());
    assert_eq!(model.predict(2).unwrap(), kept);
}

#[test]
fn parsed_export_records_flow_into_a_forecast() {
    let rows = [
        ("01 Mar 2024, 08:15", "Low", "Double Negative", "Quorum"),
        ("01 Mar 2024, 21:40", "Low", "Double Negative", "Dancing and Blood"),
        ("02 Mar 2024, 09:05", "Grouper", "Ruins", "Clearing"),
        ("04 Mar 2024, 23:59", "Low", "HEY WHAT", "White Horses"),
        ("05 Mar 2024, 00:00", "Grouper", "Ruins", "Labyrinth"),
    ];
    let records: Vec<HashMap<String, String>> = rows
        .iter()
        .map(|(time, artist, album, track)| {
            HashMap::from([
                ("utc_time".to_string(), time.to_string()),
                ("artist".to_string(), artist.to_string()),
                ("album".to_string(), album.to_string()),
                ("track".to_string(), track.to_string()),
            ])
        })
        .collect();

    let events = parse_events(&records, &EventColumns::export(), &DEFAULT_FORMATS).unwrap();
    let series = resample(&events, Frequency::daily()).unwrap();
    assert_eq!(series.len(), 5);
    assert_eq!(series.values_by_label("track").unwrap(), &[2.0, 1.0, 0.0, 1.0, 1.0]);
    assert_eq!(series.values_by_label("album").unwrap(), &[1.0, 1.0, 0.0, 1.0, 1.0]);

    let albums = ListeningMetric::Album.select(&series).unwrap();
    let mut model = TwoStageForecaster::default();
    model.fit(&albums).unwrap();
    let forecast = model.forecast().unwrap();
    assert_eq!(forecast.horizon(), 4);
    assert_eq!(
        forecast.timestamps()[0],
        Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap()
    );
}

#[test]
fn order_search_selects_a_model_for_listening_counts() {
    let events = listening_history();
    let series = resample(&events, Frequency::daily()).unwrap();
    let plays = ListeningMetric::Track.select(&series).unwrap();
    let recent = plays.slice(plays.len() - 120, plays.len()).unwrap();

    let mut search =
        OrderSearch::new(OrderSearchConfig::default().with_ranges(0..=2, 0..=1, 1..=2));
    search.fit(&recent).unwrap();

    let order = search.selected_order().unwrap();
    let best = search.best_aic().unwrap();
    assert!(search.scores().iter().all(|(_, aic)| !aic.is_finite() || *aic >= best));
    assert!(search.scores().iter().any(|(o, aic)| *o == order && *aic == best));

    let forecast = search.predict(7).unwrap();
    assert_eq!(forecast.horizon(), 7);
    assert_eq!(forecast.timestamps()[0], recent.end().unwrap() + Duration::days(1));
}

#[test]
fn analysis_helpers_find_the_weekly_rhythm() {
    let events = listening_history();
    let series = resample(&events, Frequency::daily()).unwrap();
    let plays = series.values_by_label("track").unwrap();

    let spectrum = Periodogram::annual(plays, Detrend::Linear).unwrap();
    let (freq, _) = spectrum.peaks(1)[0];
    assert!((freq - 365.0 / 7.0).abs() < 1.0, "peak at {freq}");

    let result = adf_test(plays, DEFAULT_MAX_LAG).unwrap();
    assert_eq!(result.lags, DEFAULT_MAX_LAG);
    assert!(result.statistic.is_finite());
    assert!((0.0..=1.0).contains(&result.p_value));
}
