//! Static screen geometry. Everything is computed once from the terminal size
//! at startup; the only thing that changes afterwards is the padding used to
//! center each widget's content, which is recomputed after every refresh.

use ratatui::{layout::Rect, widgets::Padding};

/// Height of each transit schedule list, in rows
const SCHEDULE_HEIGHT: u16 = 8;
/// Height of the transit traffic panel
const TRAFFIC_HEIGHT: u16 = 5;
/// Height of the sunrise/sunset panel
const TODAY_HEIGHT: u16 = 5;
/// Every bar takes its width plus one column of gap
pub const BAR_WIDTH: u16 = 3;
pub const BAR_GAP: u16 = 1;

/// Where every widget goes on screen
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScreenLayout {
    pub clock: Rect,
    pub today: Rect,
    pub traffic: Rect,
    pub rer_schedules: Rect,
    pub bus_schedules: Rect,
    pub temperature: Rect,
    pub cloud: Rect,
    pub wind: Rect,
    pub rain: Rect,
}

impl ScreenLayout {
    /// Split the screen into two columns. The left one holds, top to bottom,
    /// the clock, today's info, the traffic status and the two schedule lists
    /// side by side. The right holds the four forecast charts.
    pub fn new(width: u16, height: u16) -> Self {
        let left_width = width / 2;
        let right_width = width - left_width;

        // Left column is built bottom-up, clock gets whatever is left
        let schedule_y = height.saturating_sub(SCHEDULE_HEIGHT);
        let schedule_width = width / 4;
        let rer_schedules =
            Rect::new(0, schedule_y, schedule_width, height - schedule_y);
        let bus_schedules = Rect::new(
            schedule_width,
            schedule_y,
            schedule_width,
            height - schedule_y,
        );

        let traffic_y = schedule_y.saturating_sub(TRAFFIC_HEIGHT);
        let traffic =
            Rect::new(0, traffic_y, left_width, schedule_y - traffic_y);
        let today_y = traffic_y.saturating_sub(TODAY_HEIGHT);
        let today = Rect::new(0, today_y, left_width, traffic_y - today_y);
        let clock = Rect::new(0, 0, left_width, today_y);

        // Three charts get a quarter each, temperature gets the remainder
        let chart_height = height / 4;
        let temperature_height = height - 3 * chart_height;
        let chart = |y: u16, h: u16| Rect::new(left_width, y, right_width, h);
        let temperature = chart(0, temperature_height);
        let cloud = chart(temperature_height, chart_height);
        let wind = chart(temperature_height + chart_height, chart_height);
        let rain = chart(temperature_height + 2 * chart_height, chart_height);

        Self {
            clock,
            today,
            traffic,
            rer_schedules,
            bus_schedules,
            temperature,
            cloud,
            wind,
            rain,
        }
    }

    /// How many forecast bars fit in a chart, leaving some slack for the
    /// border and group gaps. Counted off half the screen width (the left
    /// column), which on odd widths is one column short of the charts.
    pub fn max_bars(&self) -> usize {
        let per_bar = BAR_WIDTH + BAR_GAP;
        (self.clock.width / per_bar).saturating_sub(2) as usize
    }
}

/// Space available for content inside a widget's area
pub fn content_size(area: Rect, border: bool) -> (u16, u16) {
    if border {
        (area.width.saturating_sub(2), area.height.saturating_sub(2))
    } else {
        (area.width, area.height)
    }
}

/// Offset that centers `length` cells within `available` cells. Never
/// negative: content that doesn't fit just starts at the edge.
pub fn center_offset(available: u16, length: usize) -> u16 {
    let length = u16::try_from(length).unwrap_or(u16::MAX);
    available.saturating_sub(length) / 2
}

/// Padding that centers a block of lines horizontally on its longest line,
/// and optionally vertically too
pub fn center_lines(
    (width, height): (u16, u16),
    lines: &[String],
    vertically: bool,
) -> Padding {
    let longest = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or_default();
    let top = if vertically {
        center_offset(height, lines.len())
    } else {
        0
    };
    Padding::new(center_offset(width, longest), 0, top, 0)
}

/// Padding for a single line of text. Text that fits gets pushed down one row
/// and centered; text that doesn't gets no padding so it can wrap freely.
pub fn center_text((width, _): (u16, u16), text: &str) -> Padding {
    let length = text.chars().count();
    if length < width as usize {
        Padding::new(center_offset(width, length), 0, 1, 0)
    } else {
        Padding::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_center_offset() {
        for width in 0..=120u16 {
            for length in 0..=width as usize {
                let offset = center_offset(width, length);
                assert_eq!(offset, (width - length as u16) / 2);
            }
        }
        // Overflowing content doesn't go negative
        assert_eq!(center_offset(10, 25), 0);
    }

    #[test]
    fn test_center_lines() {
        let items = lines(&["abc", "abcdefg", ""]);
        assert_eq!(
            center_lines((20, 10), &items, false),
            Padding::new(6, 0, 0, 0)
        );
        assert_eq!(
            center_lines((20, 10), &items, true),
            Padding::new(6, 0, 3, 0)
        );
        // Characters are counted, not bytes
        let glyphs = lines(&["███", "█ █"]);
        assert_eq!(
            center_lines((9, 2), &glyphs, true),
            Padding::new(3, 0, 0, 0)
        );
        assert_eq!(center_lines((9, 2), &[], true), Padding::new(4, 0, 1, 0));
    }

    #[test]
    fn test_center_text() {
        assert_eq!(center_text((20, 3), "ok"), Padding::new(9, 0, 1, 0));
        assert_eq!(center_text((4, 3), "long text"), Padding::zero());
        assert_eq!(center_text((4, 3), "four"), Padding::zero());
    }

    #[test]
    fn test_layout() {
        let layout = ScreenLayout::new(160, 50);
        assert_eq!(layout.rer_schedules, Rect::new(0, 42, 40, 8));
        assert_eq!(layout.bus_schedules, Rect::new(40, 42, 40, 8));
        assert_eq!(layout.traffic, Rect::new(0, 37, 80, 5));
        assert_eq!(layout.today, Rect::new(0, 32, 80, 5));
        assert_eq!(layout.clock, Rect::new(0, 0, 80, 32));

        assert_eq!(layout.temperature, Rect::new(80, 0, 80, 14));
        assert_eq!(layout.cloud, Rect::new(80, 14, 80, 12));
        assert_eq!(layout.wind, Rect::new(80, 26, 80, 12));
        assert_eq!(layout.rain, Rect::new(80, 38, 80, 12));
        assert_eq!(layout.max_bars(), 18);
    }

    #[test]
    fn test_max_bars_odd_width() {
        // 87 / 2 = 43 columns, so 10 bars less 2
        let layout = ScreenLayout::new(87, 40);
        assert_eq!(layout.temperature.width, 44);
        assert_eq!(layout.max_bars(), 8);
        assert_eq!(ScreenLayout::new(88, 40).max_bars(), 9);
    }

    #[test]
    fn test_layout_tiny_terminal() {
        let layout = ScreenLayout::new(3, 10);
        assert_eq!(layout.clock.height, 0);
        assert_eq!(layout.today.height, 0);
        assert_eq!(layout.traffic.height, 2);
        assert_eq!(layout.rer_schedules.height, 8);
        assert_eq!(layout.max_bars(), 0);
    }

    #[test]
    fn test_idempotent() {
        assert_eq!(ScreenLayout::new(97, 31), ScreenLayout::new(97, 31));
        let items = lines(&["12:00", "sunrise"]);
        let first = center_lines((37, 3), &items, true);
        let second = center_lines((37, 3), &items, true);
        assert_eq!(first, second);
    }
}
