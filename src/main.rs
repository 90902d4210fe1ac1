mod config;
mod display;
mod event;
mod fetch;
mod input;
mod layout;
mod lights;
mod refresh;
mod state;

use crate::{
    config::Config,
    display::Screen,
    event::AppEvent,
    fetch::UreqClient,
    input::Command,
    layout::ScreenLayout,
    lights::{HueBridge, LightController, LightOutcome},
    refresh::{clock::Clock, transit::Transit, weather::Weather, Scheduler},
    state::Dashboard,
};
use anyhow::{anyhow, Context};
use crossterm::event::{self as terminal_event, Event};
use log::{error, info, warn, LevelFilter};
use std::{
    fs::OpenOptions,
    process::ExitCode,
    sync::{
        mpsc::{self, Receiver},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::runtime::Runtime;

/// The terminal belongs to the UI, so logs go here instead
const LOG_PATH: &str = "./dashterm.log";
/// How long to wait for a key press before checking on background tasks
const INPUT_POLL: Duration = Duration::from_millis(100);
/// How long to give background work to finish on exit. Requests have no
/// timeout, so anything still running after this is abandoned.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> anyhow::Result<ExitCode> {
    init_logging()?;
    let config = Config::load()?;

    let (events_tx, events_rx) = mpsc::channel();
    let signal_tx = events_tx.clone();
    ctrlc::set_handler(move || {
        let _ = signal_tx.send(AppEvent::Shutdown);
    })
    .context("Error installing signal handler")?;

    // Background work lives on the runtime, the UI loop keeps this thread
    // since it blocks on terminal input
    let runtime = Runtime::new().context("Error starting async runtime")?;
    let mut screen = Screen::new().context("Error initializing terminal")?;
    let size = screen.size()?;
    info!("Terminal size is {}x{}", size.width, size.height);
    let layout = ScreenLayout::new(size.width, size.height);
    let dashboard = Arc::new(Mutex::new(Dashboard::new(&layout)));
    screen.draw(&*refresh::lock(&dashboard)?)?;

    let mut scheduler = Scheduler::new(
        runtime.handle().clone(),
        Arc::clone(&dashboard),
        events_tx.clone(),
    );
    let http = UreqClient::new();
    scheduler.spawn(Clock);
    scheduler.spawn(Transit::new(http.clone(), config.transit));
    scheduler.spawn(Weather::new(http, &config.weather, layout.max_bars()));

    let lights = LightController::new(
        runtime.handle().clone(),
        Arc::new(HueBridge::new(&config.bridge)),
        events_tx,
        scheduler.shutdown_signal(),
    );

    let exit = run(&mut screen, &dashboard, &lights, &events_rx);
    scheduler.shutdown();
    // Restore the terminal before anything gets printed
    drop(screen);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    let exit = exit?;
    if let Exit::LightsFailed(error) = &exit {
        eprintln!("{error:?}");
    }
    Ok(ExitCode::from(exit.code()))
}

fn init_logging() -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_PATH)
        .with_context(|| format!("Error opening log file {LOG_PATH}"))?;
    env_logger::builder()
        .filter_module("dashterm", LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Why the event loop stopped
#[derive(Debug)]
enum Exit {
    /// Quit key or termination signal
    Quit,
    /// The lights couldn't be listed
    LightsFailed(anyhow::Error),
}

impl Exit {
    fn code(&self) -> u8 {
        match self {
            Self::Quit => 0,
            Self::LightsFailed(_) => 2,
        }
    }
}

/// Main loop: dispatch key presses, then handle whatever the background
/// tasks sent since last time. Redraws requested in the same pass are
/// coalesced into one.
fn run(
    screen: &mut Screen,
    dashboard: &Mutex<Dashboard>,
    lights: &LightController,
    events: &Receiver<AppEvent>,
) -> anyhow::Result<Exit> {
    loop {
        let mut redraw = false;

        if terminal_event::poll(INPUT_POLL)? {
            match terminal_event::read()? {
                Event::Key(key) => match Command::from_key(key) {
                    Some(Command::Quit) => {
                        info!("Quitting");
                        return Ok(Exit::Quit);
                    }
                    Some(Command::Lights(command)) => lights.run(command),
                    None => {}
                },
                Event::Resize(width, height) => {
                    info!("Terminal resized to {width}x{height}");
                    redraw = true;
                }
                _ => {}
            }
        }

        for event in events.try_iter() {
            if let Some(exit) = handle_event(event, &mut redraw) {
                return Ok(exit);
            }
        }

        if redraw {
            screen.draw(&*refresh::lock(dashboard)?)?;
        }
    }
}

/// Handle one message from the background. Returns why to stop, if the
/// message means we should.
fn handle_event(event: AppEvent, redraw: &mut bool) -> Option<Exit> {
    match event {
        AppEvent::Redraw => *redraw = true,
        AppEvent::Lights(outcome) if outcome.is_fatal() => {
            let LightOutcome { action, result } = outcome;
            let error = result
                .err()
                .map(anyhow::Error::new)
                .unwrap_or_else(|| anyhow!("Unknown error"))
                .context(format!("Light command {action} failed"));
            error!("{error:?}");
            return Some(Exit::LightsFailed(error));
        }
        AppEvent::Lights(outcome) => log_outcome(&outcome),
        AppEvent::Shutdown => {
            info!("Received termination signal");
            return Some(Exit::Quit);
        }
    }
    None
}

fn log_outcome(outcome: &LightOutcome) {
    match &outcome.result {
        Ok(report) if report.failed == 0 => info!(
            "Light command {}: {} updated, {} unchanged",
            outcome.action, report.updated, report.unchanged
        ),
        Ok(report) => warn!(
            "Light command {}: {} updated, {} unchanged, {} failed",
            outcome.action, report.updated, report.unchanged, report.failed
        ),
        Err(err) => error!("Light command {} failed: {err:?}", outcome.action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fetch::FetchError,
        lights::{LightError, LightReport},
    };

    fn lights(result: Result<LightReport, LightError>) -> AppEvent {
        AppEvent::Lights(LightOutcome {
            action: "toggle",
            result,
        })
    }

    #[test]
    fn test_redraws_coalesce() {
        let mut redraw = false;
        for _ in 0..3 {
            assert!(handle_event(AppEvent::Redraw, &mut redraw).is_none());
        }
        assert!(redraw);
    }

    #[test]
    fn test_light_outcomes_keep_running() {
        let mut redraw = false;
        let report = LightReport {
            updated: 1,
            unchanged: 0,
            failed: 2,
        };
        assert!(handle_event(lights(Ok(report)), &mut redraw).is_none());
        let rejected = LightError::Rejected {
            id: "3".into(),
            description: "device is not reachable".into(),
        };
        assert!(handle_event(lights(Err(rejected)), &mut redraw).is_none());
        assert!(!redraw);
    }

    #[test]
    fn test_enumerate_failure_exits() {
        let mut redraw = false;
        let error = LightError::Enumerate(FetchError::network(
            "http://bridge/api/user/lights",
            "connection refused",
        ));
        let exit = handle_event(lights(Err(error)), &mut redraw).unwrap();
        assert_eq!(exit.code(), 2);
        match exit {
            Exit::LightsFailed(error) => {
                assert_eq!(error.to_string(), "Light command toggle failed");
                assert_eq!(error.root_cause().to_string(), "connection refused");
            }
            other => panic!("Unexpected exit {other:?}"),
        }
    }

    #[test]
    fn test_signal_exits_cleanly() {
        let mut redraw = false;
        let exit = handle_event(AppEvent::Shutdown, &mut redraw).unwrap();
        assert!(matches!(exit, Exit::Quit));
        assert_eq!(exit.code(), 0);
    }
}
