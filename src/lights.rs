//! Control for the lights behind a Hue-style bridge. Every command lists the
//! lights, transforms each one's state and writes it back, all on a
//! background task so the UI never waits on the bridge.

use crate::{config::BridgeConfig, event::AppEvent, fetch::FetchError};
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    sync::{mpsc::Sender, Arc},
    time::Duration,
};
use thiserror::Error;
use tokio::{runtime::Handle, sync::watch, task, time};

/// Chromaticity pairs (CIE xy) for the colors we use
const STANDARD_XY: [f32; 2] = [0.38, 0.38];
const WHITE_XY: [f32; 2] = [0.35, 0.35];
const ORANGE_XY: [f32; 2] = [0.58, 0.36];
const BRIGHTNESS_MAX: u8 = 254;
const BRIGHTNESS_STEP: u8 = 40;

/// Everything the operator can ask the lights to do
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LightCommand {
    /// Standard color, full brightness, on
    StandardOn,
    /// Standard color, leave power alone
    Standard,
    White,
    Toggle,
    Brighten,
    Dim,
    /// Bedtime: orange and dim, dimmer a minute later, off two minutes after
    /// that
    WindDown,
}

impl LightCommand {
    pub fn name(self) -> &'static str {
        match self {
            Self::StandardOn => "standard color on",
            Self::Standard => "standard color",
            Self::White => "white",
            Self::Toggle => "toggle",
            Self::Brighten => "brighten",
            Self::Dim => "dim",
            Self::WindDown => "wind-down",
        }
    }

    /// Apply a single-shot command to one light's state. Wind-down is a
    /// sequence, see [LightController::wind_down].
    fn transform(self, state: &mut LightState) {
        match self {
            Self::StandardOn => {
                state.set_color(STANDARD_XY);
                state.set_brightness(|_| BRIGHTNESS_MAX);
                state.on = true;
            }
            Self::Standard => state.set_color(STANDARD_XY),
            Self::White => state.set_color(WHITE_XY),
            Self::Toggle => state.on = !state.on,
            Self::Brighten => state.set_brightness(|bri| {
                bri.saturating_add(BRIGHTNESS_STEP).min(BRIGHTNESS_MAX)
            }),
            Self::Dim => {
                state.set_brightness(|bri| bri.saturating_sub(BRIGHTNESS_STEP))
            }
            Self::WindDown => (WindDown::STAGES[0].1)(state),
        }
    }
}

/// Delays between wind-down stages. Only tests need anything but the default.
#[derive(Copy, Clone, Debug)]
pub struct WindDown {
    pub dim_after: Duration,
    pub off_after: Duration,
}

impl WindDown {
    /// Name and transform of each stage, in order
    const STAGES: [(&'static str, fn(&mut LightState)); 3] = [
        ("wind-down (orange)", |state| {
            state.set_color(ORANGE_XY);
            state.set_brightness(|_| 30);
            state.on = true;
        }),
        ("wind-down (dim)", |state| state.set_brightness(|_| 1)),
        ("wind-down (off)", |state| state.on = false),
    ];
}

impl Default for WindDown {
    fn default() -> Self {
        Self {
            dim_after: Duration::from_secs(60),
            off_after: Duration::from_secs(120),
        }
    }
}

/// One light, as the bridge reports it. There are plenty more fields, but
/// this is all we touch.
#[derive(Clone, Debug, Deserialize)]
pub struct Light {
    #[serde(default)]
    pub name: String,
    pub state: LightState,
}

/// The writable part of a light's state. Brightness and color are only
/// reported by lights that support them, and stay `None` through every
/// transform otherwise.
#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LightState {
    pub on: bool,
    /// 0-254. Absent on on/off plugs.
    #[serde(default)]
    pub bri: Option<u8>,
    /// Absent on white-only bulbs and plugs
    #[serde(default)]
    pub xy: Option<[f32; 2]>,
}

impl LightState {
    fn set_color(&mut self, xy: [f32; 2]) {
        if let Some(color) = &mut self.xy {
            *color = xy;
        }
    }

    fn set_brightness(&mut self, f: impl FnOnce(u8) -> u8) {
        if let Some(bri) = &mut self.bri {
            *bri = f(*bri);
        }
    }
}

/// The body of a state write: only the fields that changed. The bridge
/// rejects brightness and color writes to a light that's off, so a light
/// that ends up off only ever gets `on`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct LightStateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xy: Option<[f32; 2]>,
}

impl LightStateUpdate {
    pub fn diff(before: &LightState, after: &LightState) -> Self {
        let on = (before.on != after.on).then_some(after.on);
        if !after.on {
            return Self {
                on,
                ..Self::default()
            };
        }
        Self {
            on,
            bri: after.bri.filter(|_| before.bri != after.bri),
            xy: after.xy.filter(|_| before.xy != after.xy),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Error)]
pub enum LightError {
    /// Couldn't even get the list of lights. There's nothing sensible to do
    /// after this, so it's fatal.
    #[error("Error listing lights")]
    Enumerate(#[source] FetchError),
    #[error("Error setting state of light {id}")]
    Write {
        id: String,
        #[source]
        source: FetchError,
    },
    #[error("Bridge rejected state for light {id}: {description}")]
    Rejected { id: String, description: String },
}

/// The bridge that owns the lights. Object-safe so the controller can be run
/// against a fake.
pub trait Bridge: Send + Sync {
    /// All lights, keyed by bridge ID, in bridge order
    fn lights(&self) -> Result<IndexMap<String, Light>, FetchError>;

    fn set_state(
        &self,
        id: &str,
        update: &LightStateUpdate,
    ) -> Result<(), LightError>;
}

/// Hue bridge, v1 REST API
/// https://developers.meethue.com/develop/hue-api/lights-api/
#[derive(Debug)]
pub struct HueBridge {
    agent: ureq::Agent,
    base_url: String,
}

impl HueBridge {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            agent: ureq::Agent::new(),
            base_url: format!("http://{}/api/{}", config.ip, config.user),
        }
    }
}

impl Bridge for HueBridge {
    fn lights(&self) -> Result<IndexMap<String, Light>, FetchError> {
        let url = format!("{}/lights", self.base_url);
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|err| FetchError::network(&url, err))?;
        let body = response
            .into_string()
            .map_err(|err| FetchError::network(&url, err))?;
        serde_json::from_str(&body)
            .map_err(|source| FetchError::Decode { url, source })
    }

    fn set_state(
        &self,
        id: &str,
        update: &LightStateUpdate,
    ) -> Result<(), LightError> {
        let url = format!("{}/lights/{id}/state", self.base_url);
        let write_error = |source| LightError::Write {
            id: id.to_owned(),
            source,
        };
        let response = self
            .agent
            .put(&url)
            .send_json(update)
            .map_err(|err| write_error(FetchError::network(&url, err)))?;
        let body = response
            .into_string()
            .map_err(|err| write_error(FetchError::network(&url, err)))?;
        // The bridge says 200 no matter what, errors are in the body
        let replies: Vec<BridgeReply> = serde_json::from_str(&body)
            .map_err(|source| write_error(FetchError::Decode { url, source }))?;
        match replies.into_iter().find_map(BridgeReply::into_error) {
            Some(description) => Err(LightError::Rejected {
                id: id.to_owned(),
                description,
            }),
            None => Ok(()),
        }
    }
}

/// One entry in a bridge write response. Each field written gets a reply,
/// either `{"success": {..}}` or `{"error": {..}}`; we only care about the
/// latter.
#[derive(Debug, Deserialize)]
struct BridgeReply {
    #[serde(default)]
    error: Option<BridgeErrorBody>,
}

impl BridgeReply {
    fn into_error(self) -> Option<String> {
        self.error.map(|error| error.description)
    }
}

#[derive(Debug, Deserialize)]
struct BridgeErrorBody {
    description: String,
}

/// How one light command went
#[derive(Debug)]
pub struct LightOutcome {
    pub action: &'static str,
    pub result: Result<LightReport, LightError>,
}

impl LightOutcome {
    /// Did the light list fetch fail? That's the only unrecoverable case
    pub fn is_fatal(&self) -> bool {
        matches!(self.result, Err(LightError::Enumerate(_)))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LightReport {
    pub updated: usize,
    /// Lights the command didn't change, so nothing was written
    pub unchanged: usize,
    pub failed: usize,
}

/// Runs light commands in the background and reports back on the event
/// channel
pub struct LightController {
    runtime: Handle,
    bridge: Arc<dyn Bridge>,
    events: Sender<AppEvent>,
    shutdown: watch::Receiver<bool>,
    wind_down: WindDown,
}

impl LightController {
    pub fn new(
        runtime: Handle,
        bridge: Arc<dyn Bridge>,
        events: Sender<AppEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            runtime,
            bridge,
            events,
            shutdown,
            wind_down: WindDown::default(),
        }
    }

    #[cfg(test)]
    pub fn with_wind_down(mut self, wind_down: WindDown) -> Self {
        self.wind_down = wind_down;
        self
    }

    /// Kick off a command. Returns immediately, the outcome shows up on the
    /// event channel.
    pub fn run(&self, command: LightCommand) {
        info!("Running light command {}", command.name());
        match command {
            LightCommand::WindDown => self.wind_down(),
            _ => self.apply_to_all(command.name(), move |state| {
                command.transform(state)
            }),
        }
    }

    /// Apply a transform to every light on the blocking pool
    pub fn apply_to_all(
        &self,
        action: &'static str,
        transform: impl Fn(&mut LightState) + Send + 'static,
    ) {
        let bridge = Arc::clone(&self.bridge);
        let events = self.events.clone();
        self.runtime.spawn_blocking(move || {
            report(&events, action, update_all(&*bridge, &transform));
        });
    }

    /// The wind-down sequence gets its own task, waiting between stages.
    /// Shutting down abandons whatever stages are left.
    fn wind_down(&self) {
        let bridge = Arc::clone(&self.bridge);
        let events = self.events.clone();
        let mut shutdown = self.shutdown.clone();
        let delays = [
            Duration::ZERO,
            self.wind_down.dim_after,
            self.wind_down.off_after,
        ];
        self.runtime.spawn(async move {
            for ((action, transform), delay) in
                WindDown::STAGES.into_iter().zip(delays)
            {
                if !delay.is_zero() {
                    tokio::select! {
                        _ = time::sleep(delay) => {}
                        _ = shutdown.changed() => {
                            info!("Wind-down cancelled before {action}");
                            return;
                        }
                    }
                }

                let stage_bridge = Arc::clone(&bridge);
                let result = match task::spawn_blocking(move || {
                    update_all(&*stage_bridge, &transform)
                })
                .await
                {
                    Ok(result) => result,
                    Err(err) => {
                        error!("Light command {action} panicked: {err}");
                        return;
                    }
                };
                let fatal = matches!(result, Err(LightError::Enumerate(_)));
                report(&events, action, result);
                if fatal {
                    return;
                }
            }
        });
    }
}

/// List every light, transform its state, and write back whatever changed.
/// Failing to list is an error; failing to write one light is logged and
/// counted.
fn update_all(
    bridge: &dyn Bridge,
    transform: &dyn Fn(&mut LightState),
) -> Result<LightReport, LightError> {
    let lights = bridge.lights().map_err(LightError::Enumerate)?;
    let mut report = LightReport::default();
    for (id, light) in lights {
        let mut state = light.state;
        transform(&mut state);
        let update = LightStateUpdate::diff(&light.state, &state);
        if update.is_empty() {
            report.unchanged += 1;
            continue;
        }
        debug!("Updating light {id} ({}) with {update:?}", light.name);
        match bridge.set_state(&id, &update) {
            Ok(()) => report.updated += 1,
            Err(err) => {
                warn!("{err:?}");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

fn report(
    events: &Sender<AppEvent>,
    action: &'static str,
    result: Result<LightReport, LightError>,
) {
    // If the event loop is gone we're shutting down, nobody cares
    let _ = events.send(AppEvent::Lights(LightOutcome { action, result }));
}
