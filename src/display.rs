use crate::{
    layout::{BAR_GAP, BAR_WIDTH},
    refresh::weather::ForecastSeries,
    state::{Chart, Dashboard, Widget, ACCENT_COLOR},
};
use anyhow::Context;
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use itertools::Itertools;
use log::{error, info};
use ratatui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{
    io::{self, Stdout},
    panic,
};

/// Owns the terminal for as long as the app runs. Raw mode and the alternate
/// screen are released on drop, or on panic via a hook.
pub struct Screen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Screen {
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode().context("Error enabling raw mode")?;
        // From here on, any failure has to undo raw mode itself since there's
        // no Screen to drop yet
        let init = || -> anyhow::Result<Self> {
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen, Hide)?;
            let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
            terminal.clear()?;
            Ok(Self { terminal })
        };
        let screen = init().inspect_err(|_| restore_terminal())?;

        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            restore_terminal();
            original_hook(info);
        }));

        info!("Terminal initialized");
        Ok(screen)
    }

    /// Size at startup. The layout is computed from this once and never
    /// updated.
    pub fn size(&self) -> anyhow::Result<Rect> {
        self.terminal.size().context("Error getting terminal size")
    }

    /// Redraw the entire screen from the current dashboard state
    pub fn draw(&mut self, dashboard: &Dashboard) -> anyhow::Result<()> {
        self.terminal
            .draw(|frame| render(frame, dashboard))
            .context("Error drawing to terminal")?;
        Ok(())
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        restore_terminal();
        info!("Terminal restored");
    }
}

/// Put the terminal back the way we found it. Called from drop and the panic
/// hook, so errors are logged instead of returned.
fn restore_terminal() {
    let result = disable_raw_mode()
        .and_then(|()| execute!(io::stdout(), LeaveAlternateScreen, Show));
    if let Err(err) = result {
        error!("Error restoring terminal: {err}");
    }
}

fn render(frame: &mut Frame, dashboard: &Dashboard) {
    // Layout is computed from the startup size, so clip everything in case the
    // terminal has shrunk since
    let screen = frame.size();
    render_lines(frame, screen, &dashboard.clock, false);
    render_lines(frame, screen, &dashboard.today, true);
    render_text(frame, screen, &dashboard.traffic);
    render_lines(frame, screen, &dashboard.rer_schedules, true);
    render_lines(frame, screen, &dashboard.bus_schedules, true);
    for chart in &dashboard.charts {
        render_chart(frame, screen, chart, &dashboard.forecast);
    }
}

fn title(text: &str) -> Span<'_> {
    Span::styled(text, Style::default().fg(ACCENT_COLOR))
}

fn block<C>(widget: &Widget<C>) -> Block<'static> {
    let block = Block::default().padding(widget.padding);
    if widget.border {
        block.borders(Borders::ALL).title(title(widget.title))
    } else {
        block
    }
}

fn render_lines(
    frame: &mut Frame,
    screen: Rect,
    widget: &Widget<Vec<String>>,
    wrap: bool,
) {
    let area = widget.area.intersection(screen);
    if area.area() == 0 {
        return;
    }
    let lines: Vec<Line> =
        widget.content.iter().map(|line| Line::from(line.as_str())).collect();
    let mut paragraph = Paragraph::new(lines)
        .block(block(widget))
        .style(Style::default().fg(widget.color));
    if wrap {
        paragraph = paragraph.wrap(Wrap { trim: false });
    }
    frame.render_widget(paragraph, area);
}

fn render_text(frame: &mut Frame, screen: Rect, widget: &Widget<String>) {
    let area = widget.area.intersection(screen);
    if area.area() == 0 {
        return;
    }
    let paragraph = Paragraph::new(widget.content.as_str())
        .block(block(widget))
        .style(Style::default().fg(widget.color))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

/// Draw one forecast series. Bars are grouped by day, the group label is the
/// day and each bar is labeled with its hour.
fn render_chart(
    frame: &mut Frame,
    screen: Rect,
    chart: &Chart,
    forecast: &ForecastSeries,
) {
    let area = chart.area.intersection(screen);
    if area.area() == 0 {
        return;
    }
    let metric = chart.metric;
    let color = metric.color();
    let mut bar_chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title(metric.title())),
        )
        .bar_width(BAR_WIDTH)
        .bar_gap(BAR_GAP)
        .group_gap(BAR_GAP)
        .bar_style(Style::default().fg(color))
        .label_style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::White).bg(color));

    let days = forecast
        .labels
        .iter()
        .zip(metric.values(forecast))
        .chunk_by(|(label, _)| label.day);
    for (day, points) in &days {
        let bars: Vec<Bar> = points
            .map(|(label, &value)| {
                // Bars can't go negative, but the number on them can
                Bar::default()
                    .value(value.max(0) as u64)
                    .text_value(value.to_string())
                    .label(Line::from(label.hour.as_str()))
            })
            .collect();
        bar_chart = bar_chart.data(
            BarGroup::default()
                .label(Line::from(day.prefix()))
                .bars(&bars),
        );
    }
    frame.render_widget(bar_chart, area);
}
