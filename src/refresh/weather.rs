use crate::{
    config::WeatherConfig,
    fetch::{self, HttpGet},
    refresh::{self, Refresh},
    state::Dashboard,
};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use log::{info, warn};
use serde::Deserialize;
use std::{fmt::Display, sync::Mutex, time::Duration};

/// Gotta know weather or not it's gonna rain
#[derive(Debug)]
pub struct Weather<H> {
    http: H,
    forecast_url: String,
    today_url: String,
    /// Only this many forecast periods fit in a chart
    max_bars: usize,
}

impl<H: HttpGet> Weather<H> {
    pub fn new(http: H, config: &WeatherConfig, max_bars: usize) -> Self {
        Self {
            http,
            forecast_url: config.forecast_url(),
            today_url: config.today_url(),
            max_bars,
        }
    }

    fn fetch_forecast<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> anyhow::Result<ForecastSeries>
    where
        Tz::Offset: Display,
    {
        let forecast: ForecastResponse =
            fetch::get_json(&self.http, &self.forecast_url)?;
        Ok(ForecastSeries::build(&forecast.list, now, self.max_bars))
    }

    fn fetch_today<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> anyhow::Result<Vec<String>>
    where
        Tz::Offset: Display,
    {
        let today: TodayResponse =
            fetch::get_json(&self.http, &self.today_url)?;
        Ok(today_lines(now, &today.sys))
    }

    /// Fetch everything and write it into the dashboard. Forecast and today
    /// are independent; either can fail without blocking the other.
    fn update<Tz: TimeZone>(
        &self,
        dashboard: &Mutex<Dashboard>,
        now: &DateTime<Tz>,
    ) -> anyhow::Result<()>
    where
        Tz::Offset: Display,
    {
        match self.fetch_forecast(now) {
            Ok(forecast) => {
                info!("Loaded forecast with {} periods", forecast.len());
                refresh::lock(dashboard)?.forecast = forecast;
            }
            Err(err) => warn!("Error fetching forecast: {err:?}"),
        }

        match self.fetch_today(now) {
            Ok(lines) => refresh::lock(dashboard)?.today.set_lines(lines, false),
            Err(err) => warn!("Error fetching sunrise/sunset: {err:?}"),
        }
        Ok(())
    }
}

impl<H: HttpGet + 'static> Refresh for Weather<H> {
    const INTERVAL: Duration = Duration::from_secs(10 * 60);

    fn name(&self) -> &'static str {
        "weather"
    }

    fn on_tick(&mut self, dashboard: &Mutex<Dashboard>) -> anyhow::Result<()> {
        self.update(dashboard, &Local::now())
    }
}

/// Four parallel series, one per chart, and a label per bar. Everything is
/// pushed through [ForecastSeries::push], so all five vectors always have the
/// same length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForecastSeries {
    pub temperature: Vec<i64>,
    pub cloud: Vec<i64>,
    pub rain: Vec<i64>,
    pub wind: Vec<i64>,
    pub labels: Vec<BarLabel>,
}

impl ForecastSeries {
    /// Build chart data from the first `max_bars` forecast points, labeled
    /// relative to `now`'s calendar day
    fn build<Tz: TimeZone>(
        points: &[ForecastPoint],
        now: &DateTime<Tz>,
        max_bars: usize,
    ) -> Self
    where
        Tz::Offset: Display,
    {
        let today = now.date_naive();
        let mut series = Self::default();
        for point in points.iter().take(max_bars) {
            let time = point.dt.with_timezone(&now.timezone());
            let label = BarLabel {
                day: DayBucket::new(today, time.date_naive()),
                hour: time.format("%Hh").to_string(),
            };
            series.push(point, label);
        }
        series
    }

    fn push(&mut self, point: &ForecastPoint, label: BarLabel) {
        // Truncating casts are intentional, the charts are integer-only
        self.temperature.push(point.main.temp as i64);
        self.cloud.push(point.clouds.all);
        self.rain.push(rain_value(point.rain.three_hours));
        self.wind.push(point.wind.speed as i64);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

/// Rain is charted in tenths of a millimeter
fn rain_value(millimeters: f64) -> i64 {
    (millimeters * 10.0).round_ties_even() as i64
}

/// Label for one forecast bar: which day it's in, and the hour
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarLabel {
    pub day: DayBucket,
    pub hour: String,
}

impl Display for BarLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.day.prefix(), self.hour)
    }
}

/// Which day a forecast point falls in, relative to today
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DayBucket {
    Today,
    Tomorrow,
    DayAfter,
    Other,
}

impl DayBucket {
    /// Compare calendar dates rather than day-of-month numbers, so month
    /// boundaries don't break tomorrow
    pub fn new(today: NaiveDate, day: NaiveDate) -> Self {
        match (day - today).num_days() {
            0 => Self::Today,
            1 => Self::Tomorrow,
            2 => Self::DayAfter,
            _ => Self::Other,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::DayAfter => "day after",
            Self::Other => "other",
        }
    }
}

/// Lines for the "today" panel: date, sunrise, sunset
fn today_lines<Tz: TimeZone>(now: &DateTime<Tz>, sun: &Sun) -> Vec<String>
where
    Tz::Offset: Display,
{
    let tz = now.timezone();
    let sun_time = |time: DateTime<Utc>| {
        time.with_timezone(&tz).format("%Hh%M").to_string()
    };
    vec![
        now.format("%A %-d %B %Y").to_string(),
        format!("Sunrise: {}", sun_time(sun.sunrise)),
        format!("Sunset: {}", sun_time(sun.sunset)),
    ]
}

/// https://openweathermap.org/forecast5
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastPoint>,
}

#[derive(Debug, Deserialize)]
struct ForecastPoint {
    #[serde(with = "chrono::serde::ts_seconds")]
    dt: DateTime<Utc>,
    main: ForecastMain,
    clouds: Clouds,
    /// Omitted entirely when it's not raining
    #[serde(default)]
    rain: Rain,
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct ForecastMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Clouds {
    all: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Rain {
    #[serde(rename = "3h", default)]
    three_hours: f64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

/// https://openweathermap.org/current
#[derive(Debug, Deserialize)]
struct TodayResponse {
    sys: Sun,
}

#[derive(Debug, Deserialize)]
struct Sun {
    #[serde(with = "chrono::serde::ts_seconds")]
    sunrise: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    sunset: DateTime<Utc>,
}
