use anyhow::Context;
use log::info;
use serde::Deserialize;
use std::{fs::File, path::Path};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub bridge: BridgeConfig,
    pub weather: WeatherConfig,
    #[serde(default)]
    pub transit: TransitConfig,
}

impl Config {
    const PATH: &'static str = "./config.json";

    /// Load config from the working directory. Any failure here is fatal,
    /// there's no sensible default for bridge credentials.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Self::PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        info!("Loading config from `{}`", path.display());
        let file = File::open(path).with_context(|| {
            format!("Error opening config file {}", path.display())
        })?;
        serde_json::from_reader(file).with_context(|| {
            format!("Error parsing config file {}", path.display())
        })
    }
}

/// Where the lighting bridge lives, and the whitelisted user to talk to it as
#[derive(Clone, Debug, Deserialize)]
pub struct BridgeConfig {
    pub ip: String,
    pub user: String,
}

/// OpenWeatherMap settings
#[derive(Clone, Debug, Deserialize)]
pub struct WeatherConfig {
    pub api_key: String,
    #[serde(default = "WeatherConfig::default_city_id")]
    pub city_id: u64,
}

impl WeatherConfig {
    const API_HOST: &'static str = "http://api.openweathermap.org/data/2.5";

    fn default_city_id() -> u64 {
        6452019
    }

    /// 5 day / 3 hour forecast
    pub fn forecast_url(&self) -> String {
        format!(
            "{}/forecast?id={}&mode=json&appid={}&units=metric",
            Self::API_HOST,
            self.city_id,
            self.api_key
        )
    }

    /// Current conditions, which is where sunrise/sunset live
    pub fn today_url(&self) -> String {
        format!(
            "{}/weather?id={}&appid={}",
            Self::API_HOST,
            self.city_id,
            self.api_key
        )
    }
}

/// Transit API endpoints. These carry no credentials so they have sensible
/// defaults, but stops/lines are overridable.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TransitConfig {
    pub rer_schedules: String,
    pub bus_schedules: String,
    pub rer_traffic: String,
}

impl Default for TransitConfig {
    fn default() -> Self {
        Self {
            rer_schedules: "http://api-ratp.pierre-grimaud.fr/v2/rers/a/stations/10?destination=1".into(),
            bus_schedules: "https://api-ratp.pierre-grimaud.fr/v2/bus/124/stations/1596?destination=108".into(),
            rer_traffic: "https://api-ratp.pierre-grimaud.fr/v2/traffic/rers/A".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_with_defaults() {
        let file = write_config(
            r#"{
                "bridge": {"ip": "192.168.1.20", "user": "abc"},
                "weather": {"api_key": "k"}
            }"#,
        );
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.bridge.ip, "192.168.1.20");
        assert_eq!(config.bridge.user, "abc");
        assert_eq!(config.weather.city_id, 6452019);
        assert_eq!(
            config.transit.rer_traffic,
            TransitConfig::default().rer_traffic
        );
        assert_eq!(
            config.weather.today_url(),
            "http://api.openweathermap.org/data/2.5/weather?id=6452019&appid=k"
        );
    }

    #[test]
    fn test_load_transit_override() {
        let file = write_config(
            r#"{
                "bridge": {"ip": "hue.local", "user": "abc"},
                "weather": {"api_key": "k", "city_id": 1},
                "transit": {"bus_schedules": "http://localhost/bus"}
            }"#,
        );
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.transit.bus_schedules, "http://localhost/bus");
        // Unset fields keep their defaults
        assert_eq!(
            config.transit.rer_schedules,
            TransitConfig::default().rer_schedules
        );
        assert!(config.weather.forecast_url().contains("id=1&"));
    }

    #[test]
    fn test_load_missing_bridge() {
        let file = write_config(r#"{"weather": {"api_key": "k"}}"#);
        let error = Config::load_from(file.path()).unwrap_err();
        assert!(error.to_string().starts_with("Error parsing config file"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load_from("/definitely/not/here.json").is_err());
    }
}
