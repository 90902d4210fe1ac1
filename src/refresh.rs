//! A "refresh" is one periodic job that pulls data from somewhere and pushes
//! it into the dashboard. Each submodule implements one of them.

pub mod clock;
pub mod transit;
pub mod weather;

use crate::{event::AppEvent, state::Dashboard};
use anyhow::anyhow;
use log::{error, info};
use std::{
    sync::{mpsc::Sender, Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::{
    runtime::Handle,
    sync::watch,
    task::{self, JoinHandle},
    time::{self, Instant, MissedTickBehavior},
};

/// Every task waits this long before its first tick, so the screen is laid
/// out before anything tries to fill it in
const INITIAL_DELAY: Duration = Duration::from_secs(1);

/// A periodic job. Each one gets its own task, which runs
/// [Refresh::on_tick] every [Refresh::INTERVAL] until shutdown.
pub trait Refresh: Sized + Send + 'static {
    const INTERVAL: Duration;

    /// Get a descriptive name for this job, for logging
    fn name(&self) -> &'static str;

    /// Fetch new data and write it into the dashboard. This runs on the
    /// blocking pool, so it's free to block on I/O. Do any slow work *before*
    /// grabbing the lock; other tasks and the renderer need it too.
    fn on_tick(&mut self, dashboard: &Mutex<Dashboard>) -> anyhow::Result<()>;
}

/// Tick loop for a single refresh. If a tick overruns the interval, the ticks
/// it overlapped are skipped rather than run back to back.
async fn run<R: Refresh>(
    mut refresh: R,
    dashboard: Arc<Mutex<Dashboard>>,
    events: Sender<AppEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let name = refresh.name();
    info!("Starting refresh {name}");
    let mut ticker =
        time::interval_at(Instant::now() + INITIAL_DELAY, R::INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            // A dropped sender means we're shutting down too
            _ = shutdown.changed() => break,
        }

        let tick_dashboard = Arc::clone(&dashboard);
        let tick = task::spawn_blocking(move || {
            let result = refresh.on_tick(&tick_dashboard);
            (refresh, result)
        });
        let result = match tick.await {
            Ok((returned, result)) => {
                refresh = returned;
                result
            }
            Err(err) => {
                error!("Refresh {name} panicked: {err}");
                break;
            }
        };
        if let Err(err) = result {
            error!("Error in refresh {name}: {err:?}");
        }

        // A fetch can outlive shutdown, don't bother drawing its result
        if *shutdown.borrow() {
            break;
        }
        if events.send(AppEvent::Redraw).is_err() {
            // Nobody is drawing anymore
            break;
        }
    }
    info!("Stopped refresh {name}");
}

/// Lock the dashboard. A poisoned lock means some task panicked mid-write;
/// the data is still plain strings and numbers, so we surface it as an error
/// for that tick and keep going.
pub fn lock(
    dashboard: &Mutex<Dashboard>,
) -> anyhow::Result<MutexGuard<'_, Dashboard>> {
    // Stringify the error to dump the lifetime
    dashboard.lock().map_err(|err| anyhow!("{err}"))
}

/// Spawns refresh tasks onto the runtime and owns the shutdown signal that
/// stops them
pub struct Scheduler {
    runtime: Handle,
    dashboard: Arc<Mutex<Dashboard>>,
    events: Sender<AppEvent>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Scheduler {
    pub fn new(
        runtime: Handle,
        dashboard: Arc<Mutex<Dashboard>>,
        events: Sender<AppEvent>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            runtime,
            dashboard,
            events,
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Get a receiver that's notified once [Self::shutdown] is called. Other
    /// background work (e.g. light sequences) listens on this too.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Start a refresh on its own task
    pub fn spawn(&mut self, refresh: impl Refresh) {
        let name = refresh.name();
        let handle = self.runtime.spawn(run(
            refresh,
            Arc::clone(&self.dashboard),
            self.events.clone(),
            self.shutdown_signal(),
        ));
        self.tasks.push((name, handle));
    }

    /// Signal every task to stop. Waiting tasks exit immediately, tasks that
    /// are mid-fetch exit once the fetch completes. We don't wait for those:
    /// there's no timeout on requests, so they could take forever.
    pub fn shutdown(self) {
        self.shutdown.send_replace(true);
        for (name, handle) in self.tasks {
            if !handle.is_finished() {
                info!("Refresh {name} still running at shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ScreenLayout;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc,
    };
    use tokio::runtime::Runtime;

    struct Counter {
        ticks: Arc<AtomicUsize>,
    }

    impl Refresh for Counter {
        const INTERVAL: Duration = Duration::from_millis(20);

        fn name(&self) -> &'static str {
            "counter"
        }

        fn on_tick(&mut self, _: &Mutex<Dashboard>) -> anyhow::Result<()> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn scheduler() -> (Runtime, Scheduler, mpsc::Receiver<AppEvent>) {
        let runtime = Runtime::new().unwrap();
        let dashboard =
            Arc::new(Mutex::new(Dashboard::new(&ScreenLayout::new(80, 24))));
        let (tx, rx) = mpsc::channel();
        let scheduler = Scheduler::new(runtime.handle().clone(), dashboard, tx);
        (runtime, scheduler, rx)
    }

    #[test]
    fn test_scheduler() {
        let (_runtime, mut scheduler, rx) = scheduler();
        let ticks = Arc::new(AtomicUsize::new(0));
        scheduler.spawn(Counter {
            ticks: Arc::clone(&ticks),
        });
        let mut shutdown = scheduler.shutdown_signal();

        // Initial delay, then one redraw per tick
        for _ in 0..3 {
            let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(matches!(event, AppEvent::Redraw));
        }
        assert!(ticks.load(Ordering::SeqCst) >= 3);

        scheduler.shutdown();
        assert!(*shutdown.borrow_and_update());
        // Drain whatever was in flight, then the channel closes once the
        // task exits and drops its sender
        while rx.recv_timeout(Duration::from_secs(5)).is_ok() {}
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_shutdown_during_initial_delay() {
        let (_runtime, mut scheduler, rx) = scheduler();
        let ticks = Arc::new(AtomicUsize::new(0));
        scheduler.spawn(Counter {
            ticks: Arc::clone(&ticks),
        });
        scheduler.shutdown();

        // Task exits without ever ticking
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        ));
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
