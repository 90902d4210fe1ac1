use crate::{
    layout::{self, ScreenLayout},
    refresh::{transit::Route, weather::ForecastSeries},
};
use ratatui::{layout::Rect, style::Color, widgets::Padding};

/// Color for all widget titles
pub const ACCENT_COLOR: Color = Color::Cyan;

/// Everything that's on screen. Each refresh task owns a disjoint set of
/// fields; the event loop reads the whole thing to draw.
#[derive(Debug)]
pub struct Dashboard {
    pub clock: Widget<Vec<String>>,
    pub today: Widget<Vec<String>>,
    pub traffic: Widget<String>,
    pub rer_schedules: Widget<Vec<String>>,
    pub bus_schedules: Widget<Vec<String>>,
    /// Temperature, cloud, wind, rain
    pub charts: [Chart; 4],
    pub forecast: ForecastSeries,
}

impl Dashboard {
    pub fn new(layout: &ScreenLayout) -> Self {
        Self {
            clock: Widget::new("", Color::White, false, layout.clock),
            today: Widget::new("Today", Color::Green, true, layout.today),
            traffic: Widget::new("Traffic RER", Color::Red, true, layout.traffic),
            rer_schedules: Widget::new(
                Route::Rer.title(),
                Route::Rer.color(),
                true,
                layout.rer_schedules,
            ),
            bus_schedules: Widget::new(
                Route::Bus.title(),
                Route::Bus.color(),
                true,
                layout.bus_schedules,
            ),
            charts: [
                Chart::new(Metric::Temperature, layout.temperature),
                Chart::new(Metric::Cloud, layout.cloud),
                Chart::new(Metric::Wind, layout.wind),
                Chart::new(Metric::Rain, layout.rain),
            ],
            forecast: ForecastSeries::default(),
        }
    }

    /// Schedule list for a route
    pub fn schedules_mut(&mut self, route: Route) -> &mut Widget<Vec<String>> {
        match route {
            Route::Rer => &mut self.rer_schedules,
            Route::Bus => &mut self.bus_schedules,
        }
    }
}

/// A bordered (or not) panel of text. Content is either a list of lines or a
/// single paragraph.
#[derive(Clone, Debug, PartialEq)]
pub struct Widget<C> {
    pub title: &'static str,
    pub color: Color,
    pub border: bool,
    pub area: Rect,
    pub padding: Padding,
    pub content: C,
}

impl<C: Default> Widget<C> {
    fn new(
        title: &'static str,
        color: Color,
        border: bool,
        area: Rect,
    ) -> Self {
        Self {
            title,
            color,
            border,
            area,
            padding: Padding::zero(),
            content: C::default(),
        }
    }

    fn content_size(&self) -> (u16, u16) {
        layout::content_size(self.area, self.border)
    }
}

impl Widget<Vec<String>> {
    /// Replace the list and re-center it
    pub fn set_lines(&mut self, lines: Vec<String>, vertically: bool) {
        self.content = lines;
        self.padding =
            layout::center_lines(self.content_size(), &self.content, vertically);
    }
}

impl Widget<String> {
    /// Replace the text and re-center it
    pub fn set_text(&mut self, text: String) {
        self.content = text;
        self.padding = layout::center_text(self.content_size(), &self.content);
    }
}

/// Which forecast series a chart shows
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Metric {
    Temperature,
    Cloud,
    Wind,
    Rain,
}

impl Metric {
    pub fn title(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature (°C)",
            Self::Cloud => "Cloud cover (%)",
            Self::Wind => "Wind (m/s)",
            Self::Rain => "Rain (mm x10)",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Temperature => Color::Red,
            Self::Cloud => Color::Yellow,
            Self::Wind => Color::Cyan,
            Self::Rain => Color::Blue,
        }
    }

    /// Pick this metric's values out of the forecast
    pub fn values(self, forecast: &ForecastSeries) -> &[i64] {
        match self {
            Self::Temperature => &forecast.temperature,
            Self::Cloud => &forecast.cloud,
            Self::Wind => &forecast.wind,
            Self::Rain => &forecast.rain,
        }
    }
}

/// A forecast bar chart. The data lives in [Dashboard::forecast], shared by
/// all four charts so they can never disagree on labels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Chart {
    pub metric: Metric,
    pub area: Rect,
}

impl Chart {
    fn new(metric: Metric, area: Rect) -> Self {
        Self { metric, area }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_lines_recenters() {
        let mut dashboard = Dashboard::new(&ScreenLayout::new(160, 50));
        let widget = dashboard.schedules_mut(Route::Bus);
        // 40 wide with a border leaves 38 columns
        widget.set_lines(vec!["2 mn".into(), "12 mn".into()], false);
        assert_eq!(widget.padding, Padding::new(16, 0, 0, 0));

        let before = widget.clone();
        widget.set_lines(before.content.clone(), false);
        assert_eq!(*widget, before);
    }

    #[test]
    fn test_set_text_recenters() {
        let mut dashboard = Dashboard::new(&ScreenLayout::new(160, 50));
        dashboard.traffic.set_text("Trafic normal".into());
        assert_eq!(dashboard.traffic.padding, Padding::new(32, 0, 1, 0));
    }

    #[test]
    fn test_clock_unbordered() {
        let mut dashboard = Dashboard::new(&ScreenLayout::new(160, 50));
        dashboard
            .clock
            .set_lines(vec!["█".repeat(20), "█".repeat(20)], true);
        assert_eq!(dashboard.clock.padding, Padding::new(30, 0, 15, 0));
    }
}
