use crate::{
    config::TransitConfig,
    fetch::{self, HttpGet},
    refresh::{self, Refresh},
    state::Dashboard,
};
use log::warn;
use ratatui::style::Color;
use serde::Deserialize;
use std::{sync::Mutex, time::Duration};

/// The lines we watch. Each has its own schedule endpoint and list widget.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Rer,
    Bus,
}

impl Route {
    pub const ALL: &'static [Self] = &[Self::Rer, Self::Bus];

    pub fn title(self) -> &'static str {
        match self {
            Self::Rer => "RER -> Paris",
            Self::Bus => "Bus -> VDF",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Rer => Color::Red,
            Self::Bus => Color::Yellow,
        }
    }

    fn schedules_url(self, config: &TransitConfig) -> &str {
        match self {
            Self::Rer => &config.rer_schedules,
            Self::Bus => &config.bus_schedules,
        }
    }
}

/// Upcoming departures for each route, plus the RER traffic status
#[derive(Debug)]
pub struct Transit<H> {
    http: H,
    config: TransitConfig,
}

impl<H: HttpGet> Transit<H> {
    pub fn new(http: H, config: TransitConfig) -> Self {
        Self { http, config }
    }

    fn fetch_schedules(&self, route: Route) -> anyhow::Result<Vec<String>> {
        let url = route.schedules_url(&self.config);
        let schedules: SchedulesResponse = fetch::get_json(&self.http, url)?;
        Ok(schedules
            .response
            .schedules
            .into_iter()
            .map(|schedule| schedule.message)
            .collect())
    }

    fn fetch_traffic(&self) -> anyhow::Result<String> {
        let traffic: TrafficResponse =
            fetch::get_json(&self.http, &self.config.rer_traffic)?;
        Ok(traffic.response.message)
    }
}

impl<H: HttpGet + 'static> Refresh for Transit<H> {
    const INTERVAL: Duration = Duration::from_secs(15);

    fn name(&self) -> &'static str {
        "transit"
    }

    /// Each endpoint is independent. If one fails, its widget keeps the
    /// previous content and the others update as usual.
    fn on_tick(&mut self, dashboard: &Mutex<Dashboard>) -> anyhow::Result<()> {
        for &route in Route::ALL {
            match self.fetch_schedules(route) {
                Ok(schedules) => {
                    refresh::lock(dashboard)?
                        .schedules_mut(route)
                        .set_lines(schedules, false);
                }
                Err(err) => {
                    warn!("Error fetching {route:?} schedules: {err:?}")
                }
            }
        }

        match self.fetch_traffic() {
            Ok(message) => refresh::lock(dashboard)?.traffic.set_text(message),
            Err(err) => warn!("Error fetching traffic: {err:?}"),
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SchedulesResponse {
    response: Schedules,
}

#[derive(Debug, Deserialize)]
struct Schedules {
    schedules: Vec<Schedule>,
}

#[derive(Debug, Deserialize)]
struct Schedule {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TrafficResponse {
    response: Traffic,
}

#[derive(Debug, Deserialize)]
struct Traffic {
    message: String,
}
