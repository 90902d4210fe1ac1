//! Messages from background tasks to the event loop

use crate::lights::LightOutcome;

#[derive(Debug)]
pub enum AppEvent {
    /// Some widget changed, redraw the whole screen
    Redraw,
    /// A light command finished, one way or another
    Lights(LightOutcome),
    /// SIGINT/SIGTERM
    Shutdown,
}
