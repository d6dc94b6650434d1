use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::{Patch, SnapshotCallback, StateCache};
use crate::error::EntityKind;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::poller;
use crate::protocol::{self, Command};
use crate::transport::{SecretHeader, Transport};
use crate::types::{HvacMode, Mode, Snapshot};
use crate::{Error, Result};

/// Port the hub listens on out of the box.
pub const DEFAULT_PORT: u16 = 8086;

const MIN_POLL_INTERVAL_SECS: u64 = 10;
const MAX_POLL_INTERVAL_SECS: u64 = 300;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// High-level intent, the narrow surface a host platform drives.
///
/// Each variant maps one-to-one onto a facade method.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    ToggleAircon {
        aircon_id: String,
    },
    SetAirconMode {
        aircon_id: String,
        mode: Mode,
    },
    ToggleZone {
        zone_id: String,
    },
    SetTemperature {
        entity_id: String,
        is_zone: bool,
        value: f64,
    },
    SetHvacMode {
        entity_id: String,
        is_zone: bool,
        mode: HvacMode,
    },
}

/// State shared between the client and its poller task.
pub(crate) struct Inner {
    pub(crate) transport: Transport,
    pub(crate) cache: StateCache,
    pub(crate) refresh_pending: AtomicBool,
    pub(crate) refresh_notify: Notify,
    pub(crate) logger: Option<Mutex<MessageLogger>>,
}

impl Inner {
    /// Ask the poller for one out-of-band refresh. Debounced: returns
    /// false without waking the poller when one is already pending.
    pub(crate) fn request_refresh(&self) -> bool {
        if self.refresh_pending.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.refresh_notify.notify_one();
        true
    }

    fn log<F: FnOnce(&mut MessageLogger)>(&self, f: F) {
        if let Some(logger) = &self.logger
            && let Ok(mut guard) = logger.lock()
        {
            f(&mut guard);
        }
    }
}

/// Full refresh cycle: GetFullDataEvent, decode, replace the cache.
///
/// Any failure flags the cache unavailable and leaves the previous
/// snapshot in place.
pub(crate) async fn refresh_once(inner: &Inner) -> Result<Snapshot> {
    let response = match inner
        .transport
        .send_commands(&[Command::GetFullDataEvent])
        .await
    {
        Ok(response) => response,
        Err(e) => {
            inner.cache.mark_unavailable();
            return Err(e);
        }
    };
    let body = match protocol::full_data_body(&response) {
        Ok(body) => body,
        Err(e) => {
            inner.cache.mark_unavailable();
            return Err(e);
        }
    };
    inner.log(|logger| logger.log_refresh(&body));
    let snapshot = match protocol::snapshot_from_body(&body) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            inner.cache.mark_unavailable();
            return Err(e);
        }
    };
    inner.cache.replace(snapshot.clone());
    Ok(snapshot)
}

pub struct MyPlaceIqClientBuilder {
    host: String,
    port: u16,
    client_id: Option<String>,
    client_secret: Option<String>,
    secret_header: SecretHeader,
    poll_interval: Duration,
    request_timeout: Duration,
    snapshot_callbacks: Vec<SnapshotCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl MyPlaceIqClientBuilder {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: None,
            client_secret: None,
            secret_header: SecretHeader::default(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            snapshot_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Which handshake header carries the secret (`password` by default).
    pub fn secret_header(mut self, header: SecretHeader) -> Self {
        self.secret_header = header;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Observe every cache change: authoritative replaces and optimistic
    /// patches alike.
    pub fn on_snapshot(mut self, f: impl Fn(&Snapshot) + Send + Sync + 'static) -> Self {
        self.snapshot_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<MyPlaceIqClient> {
        let secs = self.poll_interval.as_secs();
        if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&secs) {
            return Err(Error::Config(format!(
                "poll interval must be {MIN_POLL_INTERVAL_SECS}-{MAX_POLL_INTERVAL_SECS}s, got {secs}s"
            )));
        }
        let client_id = self
            .client_id
            .ok_or_else(|| Error::Config("client_id is required".into()))?;
        let client_secret = self
            .client_secret
            .ok_or_else(|| Error::Config("client_secret is required".into()))?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(Mutex::new(MessageLogger::new(mode, &path)?)),
            _ => None,
        };

        let inner = Inner {
            transport: Transport::new(
                &self.host,
                self.port,
                client_id,
                client_secret,
                self.secret_header,
                self.request_timeout,
            ),
            cache: StateCache::new(self.snapshot_callbacks),
            refresh_pending: AtomicBool::new(false),
            refresh_notify: Notify::new(),
            logger,
        };

        Ok(MyPlaceIqClient {
            inner: Arc::new(inner),
            poll_interval: self.poll_interval,
            cancel: CancellationToken::new(),
            poller: None,
        })
    }
}

/// Client for a MyPlaceIQ hub.
///
/// Owns the cached snapshot and a background poller. All command methods
/// follow the same cycle: optimistic patch, one request/response socket,
/// debounced refresh. Transport failures surface to the caller while the
/// optimistic value stays cached until the next successful refresh
/// corrects it.
pub struct MyPlaceIqClient {
    inner: Arc<Inner>,
    poll_interval: Duration,
    cancel: CancellationToken,
    poller: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for MyPlaceIqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MyPlaceIqClient")
            .field("poll_interval", &self.poll_interval)
            .field("connected", &self.poller.is_some())
            .finish_non_exhaustive()
    }
}

impl MyPlaceIqClient {
    pub fn builder(host: impl Into<String>, port: u16) -> MyPlaceIqClientBuilder {
        MyPlaceIqClientBuilder::new(host, port)
    }

    /// Validate the hub connection with an initial full refresh, then
    /// start the poll schedule. No-op when already connected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.poller.is_some() {
            return Ok(());
        }
        refresh_once(&self.inner).await?;
        debug!(interval_secs = self.poll_interval.as_secs(), "starting poller");
        self.poller = Some(tokio::spawn(poller::run(
            self.inner.clone(),
            self.poll_interval,
            self.cancel.clone(),
        )));
        Ok(())
    }

    /// One immediate full refresh, outside the schedule.
    pub async fn refresh(&self) -> Result<Snapshot> {
        refresh_once(&self.inner).await
    }

    /// Last known device state. Stale (and flagged via
    /// [`is_available`](Self::is_available)) while the hub is unreachable.
    pub fn current_snapshot(&self) -> Snapshot {
        self.inner.cache.current()
    }

    pub fn is_available(&self) -> bool {
        self.inner.cache.is_available()
    }

    /// True while an optimistic edit is ahead of server confirmation,
    /// i.e. since a patch was applied and before the next replace.
    pub fn is_dirty(&self) -> bool {
        self.inner.cache.is_dirty()
    }

    /// Stop the poller and abandon any in-flight refresh.
    pub async fn close(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.poller.take() {
            let _ = handle.await;
        }
    }

    // -- Command facade --

    /// Flip an aircon's power state, based on the cached value.
    pub async fn toggle_aircon(&self, aircon_id: &str) -> Result<()> {
        let snapshot = self.inner.cache.current();
        let aircon = snapshot.aircon(aircon_id).ok_or_else(|| Error::EntityNotFound {
            kind: EntityKind::Aircon,
            id: aircon_id.to_string(),
        })?;
        let target = !aircon.is_on;
        self.dispatch(
            "toggle_aircon",
            vec![Command::SetAirconOnOff {
                aircon_id: aircon_id.to_string(),
                is_on: target,
            }],
            vec![(EntityKind::Aircon, aircon_id.to_string(), Patch::IsOn(target))],
        )
        .await
    }

    /// Set an aircon's operating mode. Leaves the power state alone.
    pub async fn set_aircon_mode(&self, aircon_id: &str, mode: Mode) -> Result<()> {
        let snapshot = self.inner.cache.current();
        if snapshot.aircon(aircon_id).is_none() {
            return Err(Error::EntityNotFound {
                kind: EntityKind::Aircon,
                id: aircon_id.to_string(),
            });
        }
        self.dispatch(
            "set_aircon_mode",
            vec![Command::SetAirconMode {
                aircon_id: aircon_id.to_string(),
                mode,
            }],
            vec![(EntityKind::Aircon, aircon_id.to_string(), Patch::Mode(mode))],
        )
        .await
    }

    /// Flip a zone's damper, based on the cached value.
    pub async fn toggle_zone(&self, zone_id: &str) -> Result<()> {
        let snapshot = self.inner.cache.current();
        let zone = snapshot.zone(zone_id).ok_or_else(|| Error::EntityNotFound {
            kind: EntityKind::Zone,
            id: zone_id.to_string(),
        })?;
        let target = !zone.is_on;
        self.dispatch(
            "toggle_zone",
            vec![Command::SetZoneOpenClose {
                zone_id: zone_id.to_string(),
                is_open: target,
            }],
            vec![(EntityKind::Zone, zone_id.to_string(), Patch::IsOn(target))],
        )
        .await
    }

    /// Set a target temperature.
    ///
    /// The owning aircon's cached mode (optimistic edits included) decides
    /// whether this is a heat or a cool setpoint, for the wire command and
    /// the cached attribute both.
    pub async fn set_temperature(&self, entity_id: &str, is_zone: bool, value: f64) -> Result<()> {
        let snapshot = self.inner.cache.current();
        let mode = if is_zone {
            snapshot
                .aircon_for_zone(entity_id)
                .map(|(_, aircon)| aircon.mode)
                .ok_or_else(|| Error::NoModeContext(entity_id.to_string()))?
        } else {
            snapshot
                .aircon(entity_id)
                .map(|aircon| aircon.mode)
                .ok_or_else(|| Error::NoModeContext(entity_id.to_string()))?
        };

        let degrees = wire_degrees(value);
        let heating = mode == Mode::Heat;
        let command = match (is_zone, heating) {
            (false, true) => Command::SetAirconHeatTemperature {
                aircon_id: entity_id.to_string(),
                temperature: degrees,
            },
            (false, false) => Command::SetAirconCoolTemperature {
                aircon_id: entity_id.to_string(),
                temperature: degrees,
            },
            (true, true) => Command::SetZoneHeatTemperature {
                zone_id: entity_id.to_string(),
                temperature: degrees,
            },
            (true, false) => Command::SetZoneCoolTemperature {
                zone_id: entity_id.to_string(),
                temperature: degrees,
            },
        };
        let kind = if is_zone {
            EntityKind::Zone
        } else {
            EntityKind::Aircon
        };
        let patch = if heating {
            Patch::TargetTemperatureHeat(degrees as f64)
        } else {
            Patch::TargetTemperatureCool(degrees as f64)
        };

        self.dispatch(
            "set_temperature",
            vec![command],
            vec![(kind, entity_id.to_string(), patch)],
        )
        .await
    }

    /// Drive an entity to a target hvac mode.
    ///
    /// Zones only open (`Auto`) or close (`Off`). Aircons power off, or
    /// power on and switch mode as two commands in one envelope.
    pub async fn set_hvac_mode(&self, entity_id: &str, is_zone: bool, mode: HvacMode) -> Result<()> {
        if is_zone {
            let open = match mode {
                HvacMode::Auto => true,
                HvacMode::Off => false,
                other => return Err(Error::UnsupportedMode(other)),
            };
            let snapshot = self.inner.cache.current();
            if snapshot.zone(entity_id).is_none() {
                return Err(Error::EntityNotFound {
                    kind: EntityKind::Zone,
                    id: entity_id.to_string(),
                });
            }
            return self
                .dispatch(
                    "set_hvac_mode",
                    vec![Command::SetZoneOpenClose {
                        zone_id: entity_id.to_string(),
                        is_open: open,
                    }],
                    vec![(EntityKind::Zone, entity_id.to_string(), Patch::IsOn(open))],
                )
                .await;
        }

        let snapshot = self.inner.cache.current();
        if snapshot.aircon(entity_id).is_none() {
            return Err(Error::EntityNotFound {
                kind: EntityKind::Aircon,
                id: entity_id.to_string(),
            });
        }
        match mode {
            HvacMode::Off => {
                self.dispatch(
                    "set_hvac_mode",
                    vec![Command::SetAirconOnOff {
                        aircon_id: entity_id.to_string(),
                        is_on: false,
                    }],
                    vec![(EntityKind::Aircon, entity_id.to_string(), Patch::IsOn(false))],
                )
                .await
            }
            other => {
                let wire_mode = other.as_aircon_mode().ok_or(Error::UnsupportedMode(other))?;
                self.dispatch(
                    "set_hvac_mode",
                    vec![
                        Command::SetAirconOnOff {
                            aircon_id: entity_id.to_string(),
                            is_on: true,
                        },
                        Command::SetAirconMode {
                            aircon_id: entity_id.to_string(),
                            mode: wire_mode,
                        },
                    ],
                    vec![
                        (EntityKind::Aircon, entity_id.to_string(), Patch::IsOn(true)),
                        (
                            EntityKind::Aircon,
                            entity_id.to_string(),
                            Patch::Mode(wire_mode),
                        ),
                    ],
                )
                .await
            }
        }
    }

    /// Dispatch one [`Intent`] to the matching facade method.
    pub async fn send_intent(&self, intent: Intent) -> Result<()> {
        match intent {
            Intent::ToggleAircon { aircon_id } => self.toggle_aircon(&aircon_id).await,
            Intent::SetAirconMode { aircon_id, mode } => {
                self.set_aircon_mode(&aircon_id, mode).await
            }
            Intent::ToggleZone { zone_id } => self.toggle_zone(&zone_id).await,
            Intent::SetTemperature {
                entity_id,
                is_zone,
                value,
            } => self.set_temperature(&entity_id, is_zone, value).await,
            Intent::SetHvacMode {
                entity_id,
                is_zone,
                mode,
            } => self.set_hvac_mode(&entity_id, is_zone, mode).await,
        }
    }

    /// Optimistic patches, then the send, then a debounced refresh.
    ///
    /// Patches land before the send so readers see the target state while
    /// the socket is in flight; a send failure leaves them in place for
    /// the next scheduled poll to settle.
    async fn dispatch(
        &self,
        action: &'static str,
        commands: Vec<Command>,
        patches: Vec<(EntityKind, String, Patch)>,
    ) -> Result<()> {
        for (kind, id, patch) in &patches {
            self.inner.cache.apply_optimistic(*kind, id, *patch);
        }
        if self.inner.logger.is_some()
            && let Ok(body) = serde_json::to_value(&commands)
        {
            self.inner.log(|logger| logger.log_command(action, &body));
        }
        self.inner.transport.send_commands(&commands).await?;
        self.inner.request_refresh();
        Ok(())
    }
}

impl Drop for MyPlaceIqClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Hubs take whole degrees on the wire.
fn wire_degrees(value: f64) -> i64 {
    value.round() as i64
}
