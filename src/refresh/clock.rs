use crate::refresh::{self, Refresh};
use crate::state::Dashboard;
use anyhow::bail;
use chrono::{Local, NaiveTime};
use std::{sync::Mutex, time::Duration};

/// Jumbo characters are this many rows tall
const JUMBO_HEIGHT: usize = 5;

// Convenient consts for building up jumbo characters
const FUL: &str = "█"; // Solid block
const EMT: &str = " "; // Empty

/// Big digital clock
#[derive(Debug, Default)]
pub struct Clock;

impl Refresh for Clock {
    const INTERVAL: Duration = Duration::from_secs(1);

    fn name(&self) -> &'static str {
        "clock"
    }

    fn on_tick(&mut self, dashboard: &Mutex<Dashboard>) -> anyhow::Result<()> {
        let lines = clock_text(Local::now().time())?;
        refresh::lock(dashboard)?.clock.set_lines(lines, true);
        Ok(())
    }
}

/// Format a time as jumbo text, one string per row
fn clock_text(time: NaiveTime) -> anyhow::Result<Vec<String>> {
    // https://docs.rs/chrono/latest/chrono/format/strftime/index.html
    write_jumbo_text(&time.format("%H:%M:%S").to_string())
}

/// Render a string as jumbo text. Characters are separated by one empty
/// column.
fn write_jumbo_text(text: &str) -> anyhow::Result<Vec<String>> {
    let mut lines = vec![String::new(); JUMBO_HEIGHT];
    for (i, c) in text.chars().enumerate() {
        let jumbo = get_jumbo_character(c)?;
        for (line, row) in lines.iter_mut().zip(jumbo) {
            if i > 0 {
                line.push_str(EMT);
            }
            for pixel in row {
                line.push_str(pixel);
            }
        }
    }
    Ok(lines)
}

/// Get the pixels for a single jumbo character. Each character is exactly
/// [JUMBO_HEIGHT] rows tall; digits are 3 wide, punctuation is narrower.
#[rustfmt::skip]
fn get_jumbo_character(
    character: char,
) -> anyhow::Result<[&'static [&'static str]; JUMBO_HEIGHT]> {
    let pixels: [&[&str]; JUMBO_HEIGHT] = match character {
        '0' => [&[FUL, FUL, FUL], &[FUL, EMT, FUL], &[FUL, EMT, FUL], &[FUL, EMT, FUL], &[FUL, FUL, FUL]],
        '1' => [&[EMT, FUL, EMT], &[FUL, FUL, EMT], &[EMT, FUL, EMT], &[EMT, FUL, EMT], &[FUL, FUL, FUL]],
        '2' => [&[FUL, FUL, FUL], &[EMT, EMT, FUL], &[FUL, FUL, FUL], &[FUL, EMT, EMT], &[FUL, FUL, FUL]],
        '3' => [&[FUL, FUL, FUL], &[EMT, EMT, FUL], &[FUL, FUL, FUL], &[EMT, EMT, FUL], &[FUL, FUL, FUL]],
        '4' => [&[FUL, EMT, FUL], &[FUL, EMT, FUL], &[FUL, FUL, FUL], &[EMT, EMT, FUL], &[EMT, EMT, FUL]],
        '5' => [&[FUL, FUL, FUL], &[FUL, EMT, EMT], &[FUL, FUL, FUL], &[EMT, EMT, FUL], &[FUL, FUL, FUL]],
        '6' => [&[FUL, FUL, FUL], &[FUL, EMT, EMT], &[FUL, FUL, FUL], &[FUL, EMT, FUL], &[FUL, FUL, FUL]],
        '7' => [&[FUL, FUL, FUL], &[EMT, EMT, FUL], &[EMT, EMT, FUL], &[EMT, EMT, FUL], &[EMT, EMT, FUL]],
        '8' => [&[FUL, FUL, FUL], &[FUL, EMT, FUL], &[FUL, FUL, FUL], &[FUL, EMT, FUL], &[FUL, FUL, FUL]],
        '9' => [&[FUL, FUL, FUL], &[FUL, EMT, FUL], &[FUL, FUL, FUL], &[EMT, EMT, FUL], &[FUL, FUL, FUL]],
        ' ' => [&[EMT, EMT, EMT], &[EMT, EMT, EMT], &[EMT, EMT, EMT], &[EMT, EMT, EMT], &[EMT, EMT, EMT]],
        ':' => [&[EMT], &[FUL], &[EMT], &[FUL], &[EMT]],
        _ => {
            bail!("Cannot convert character `{character}` to jumbo text");
        }
    };
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ScreenLayout;

    #[test]
    fn test_jumbo_text() {
        let text = write_jumbo_text("10:23").unwrap();
        assert_eq!(
            text,
            vec![
                " █  ███   ███ ███",
                "██  █ █ █   █   █",
                " █  █ █   ███ ███",
                " █  █ █ █ █     █",
                "███ ███   ███ ███",
            ]
        );
    }

    #[test]
    fn test_jumbo_text_unknown_character() {
        assert!(write_jumbo_text("12h").is_err());
    }

    #[test]
    fn test_clock_text() {
        let time = NaiveTime::from_hms_opt(7, 5, 9).unwrap();
        let text = clock_text(time).unwrap();
        assert_eq!(text.len(), JUMBO_HEIGHT);
        // 6 digits, 2 colons, 7 gaps
        for line in &text {
            assert_eq!(line.chars().count(), 6 * 3 + 2 + 7);
        }
        assert_eq!(text[0], "███ ███   ███ ███   ███ ███");
    }

    #[test]
    fn test_clock_tick() {
        let dashboard = Mutex::new(Dashboard::new(&ScreenLayout::new(160, 50)));
        Clock.on_tick(&dashboard).unwrap();
        let dashboard = dashboard.lock().unwrap();
        assert_eq!(dashboard.clock.content.len(), JUMBO_HEIGHT);
        // 80x32 without a border, 27 wide and 5 tall
        assert_eq!(dashboard.clock.padding.left, 26);
        assert_eq!(dashboard.clock.padding.top, 13);
    }
}
