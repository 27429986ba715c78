// MIT License - Copyright (c) 2026 Peter Wright
// Public client facade with connection supervision

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, interval_at, sleep};
use tracing::{debug, info, warn};

use crate::comm::SatelComm;
use crate::config::{ArmMode, SatelConfig};
use crate::constants::KEEP_ALIVE_FAILURE_LIMIT;
use crate::devices::{AlarmState, Output, Partition, Zone};
use crate::error::{Result, SatelError};
use crate::event::{EventReceiver, EventSender, SatelEvent, event_channel};
use crate::protocol::{DeviceKind, DeviceName, PanelVersion, Request};
use crate::state::{PanelState, SharedState};

/// State shared between the facade and the supervisor task.
struct Inner {
    config: SatelConfig,
    state: SharedState,
    event_tx: EventSender,
    session: RwLock<Option<Arc<SatelComm>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Inner {
    /// Open and initialise a new session, then publish it.
    async fn establish(&self) -> Result<Arc<SatelComm>> {
        let comm = Arc::new(
            SatelComm::open(&self.config, self.state.clone(), self.event_tx.clone()).await?,
        );
        if *self.shutdown_tx.borrow() {
            comm.close().await;
            return Err(SatelError::Closed);
        }
        *self.session.write().await = Some(comm.clone());
        info!("Connected to Satel Integra at {}", self.config.address());
        let _ = self.event_tx.send(SatelEvent::Connected);
        Ok(comm)
    }

    /// Tear the current session down. Returns false if there was none.
    async fn drop_session(&self) -> bool {
        let Some(comm) = self.session.write().await.take() else {
            return false;
        };
        comm.close().await;
        self.state.write().await.mark_stale();
        info!("Disconnected from Satel Integra");
        let _ = self.event_tx.send(SatelEvent::Disconnected);
        true
    }

    async fn current(&self) -> Option<Arc<SatelComm>> {
        self.session.read().await.clone()
    }

    /// Watch a live session and keep it alive.
    ///
    /// Returns when the connection is lost, keep-alives keep failing, or
    /// shutdown is requested.
    async fn supervise(&self, comm: &SatelComm, shutdown_rx: &mut watch::Receiver<bool>) {
        let period = Duration::from_millis(self.config.keep_alive_interval_ms);
        let mut keep_alive = interval_at(Instant::now() + period, period);
        let mut failures = 0;

        loop {
            tokio::select! {
                _ = comm.closed() => {
                    warn!("Connection to panel lost");
                    return;
                }
                _ = shutdown_rx.changed() => return,
                _ = keep_alive.tick() => {
                    match comm.keep_alive().await {
                        Ok(()) => failures = 0,
                        Err(e) => {
                            failures += 1;
                            warn!("Keep-alive failed ({}/{}): {}", failures, KEEP_ALIVE_FAILURE_LIMIT, e);
                            if failures >= KEEP_ALIVE_FAILURE_LIMIT {
                                return;
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Reconnect forever until shutdown.
async fn run_supervisor(inner: Arc<Inner>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut attempt = 0u32;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        if attempt > 0 {
            let delay_ms = inner.config.reconnect_delay(attempt);
            debug!("Reconnecting in {:.1}s", delay_ms as f64 / 1000.0);
            tokio::select! {
                _ = sleep(Duration::from_millis(delay_ms)) => {}
                _ = shutdown_rx.changed() => break,
            }
        }

        let comm = match inner.current().await {
            Some(comm) => comm,
            None => match inner.establish().await {
                Ok(comm) => comm,
                Err(e) => {
                    attempt += 1;
                    warn!("Connection attempt {} failed: {}", attempt, e);
                    continue;
                }
            },
        };

        inner.supervise(&comm, &mut shutdown_rx).await;
        drop(comm);
        inner.drop_session().await;
        attempt = 1;
    }

    debug!("Supervisor stopped");
}

/// Asynchronous client for a Satel Integra panel behind an ETHM-1 module.
///
/// # Example
///
/// ```no_run
/// use satel_integra::{ArmMode, AsyncSatel, SatelConfig};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = SatelConfig::builder()
///         .host("192.168.1.100")
///         .monitored_zones(vec![1, 2, 3])
///         .partitions(vec![1])
///         .build();
///
///     let satel = AsyncSatel::connect(config).await?;
///
///     let mut events = satel.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("Event: {:?}", event);
///         }
///     });
///
///     satel.arm("1234", &[1], ArmMode::Mode0).await?;
///
///     tokio::signal::ctrl_c().await?;
///     satel.close().await;
///     Ok(())
/// }
/// ```
pub struct AsyncSatel {
    inner: Arc<Inner>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncSatel {
    fn new(config: SatelConfig) -> Self {
        let (event_tx, _event_rx) = event_channel(config.event_capacity);
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        let inner = Inner {
            state: PanelState::shared(&config),
            config,
            event_tx,
            session: RwLock::new(None),
            shutdown_tx,
        };
        Self {
            inner: Arc::new(inner),
            supervisor: Mutex::new(None),
        }
    }

    /// Connect to the panel and keep the connection up afterwards.
    ///
    /// The first connection is retried on transient errors (busy module,
    /// timeouts, I/O errors) with exponential backoff, at most
    /// `max_connect_retries` times. Once connected, lost connections are
    /// re-established in the background forever.
    pub async fn connect(config: SatelConfig) -> Result<Self> {
        let satel = Self::new(config);
        let max_retries = satel.inner.config.max_connect_retries;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay_ms = satel.inner.config.reconnect_delay(attempt);
                warn!(
                    "Connection attempt {} failed, retrying in {:.1}s...",
                    attempt,
                    delay_ms as f64 / 1000.0
                );
                sleep(Duration::from_millis(delay_ms)).await;
            }

            match satel.inner.establish().await {
                Ok(_) => {
                    satel.spawn_supervisor();
                    return Ok(satel);
                }
                Err(e) => {
                    if !e.is_retryable() || attempt == max_retries {
                        return Err(e);
                    }
                    warn!("Connection error (attempt {}): {}", attempt + 1, e);
                }
            }
        }

        Err(SatelError::Disconnected)
    }

    /// Return immediately and connect in the background, retrying forever.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: SatelConfig) -> Self {
        let satel = Self::new(config);
        satel.spawn_supervisor();
        satel
    }

    fn spawn_supervisor(&self) {
        let handle = tokio::spawn(run_supervisor(
            self.inner.clone(),
            self.inner.shutdown_tx.subscribe(),
        ));
        let mut slot = self.supervisor.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(handle);
    }

    /// Subscribe to client events.
    pub fn subscribe(&self) -> EventReceiver {
        self.inner.event_tx.subscribe()
    }

    pub fn config(&self) -> &SatelConfig {
        &self.inner.config
    }

    pub async fn is_connected(&self) -> bool {
        self.inner
            .current()
            .await
            .is_some_and(|comm| comm.is_connected())
    }

    /// The live session, or `Disconnected`.
    async fn session(&self) -> Result<Arc<SatelComm>> {
        match self.inner.current().await {
            Some(comm) if comm.is_connected() => Ok(comm),
            _ => Err(SatelError::Disconnected),
        }
    }

    // --- State accessors ---

    pub async fn zones(&self) -> Vec<Zone> {
        self.inner.state.read().await.zones()
    }

    pub async fn zone(&self, id: u32) -> Option<Zone> {
        self.inner.state.read().await.zone(id)
    }

    pub async fn outputs(&self) -> Vec<Output> {
        self.inner.state.read().await.outputs()
    }

    pub async fn output(&self, id: u32) -> Option<Output> {
        self.inner.state.read().await.output(id)
    }

    pub async fn partitions(&self) -> Vec<Partition> {
        self.inner.state.read().await.partitions()
    }

    pub async fn partition(&self, id: u32) -> Option<Partition> {
        self.inner.state.read().await.partition(id)
    }

    /// Ids of zones currently known to be violated.
    pub async fn violated_zones(&self) -> Vec<u32> {
        self.inner.state.read().await.violated_zones()
    }

    /// Ids of outputs currently known to be active.
    pub async fn active_outputs(&self) -> Vec<u32> {
        self.inner.state.read().await.active_outputs()
    }

    /// Partitions listed by the latest report of each state.
    pub async fn partition_states(&self) -> BTreeMap<AlarmState, Vec<u32>> {
        self.inner.state.read().await.partition_states()
    }

    /// Alarm state of a partition, `None` until a complete picture was received.
    pub async fn alarm_state(&self, partition_id: u32) -> Option<AlarmState> {
        self.inner.state.read().await.alarm_state(partition_id)
    }

    // --- Commands ---

    /// Arm partitions in the given mode.
    pub async fn arm(&self, code: &str, partitions: &[u32], mode: ArmMode) -> Result<()> {
        debug!("Arming partitions {:?} ({})", partitions, mode);
        let request = Request::arm(code, partitions, mode)?;
        self.session().await?.execute(&request).await
    }

    pub async fn disarm(&self, code: &str, partitions: &[u32]) -> Result<()> {
        debug!("Disarming partitions {:?}", partitions);
        let request = Request::disarm(code, partitions)?;
        self.session().await?.execute(&request).await
    }

    pub async fn clear_alarm(&self, code: &str, partitions: &[u32]) -> Result<()> {
        debug!("Clearing alarm on partitions {:?}", partitions);
        let request = Request::clear_alarm(code, partitions)?;
        self.session().await?.execute(&request).await
    }

    /// Switch a single output on or off.
    pub async fn set_output(&self, code: &str, output: u32, on: bool) -> Result<()> {
        debug!("Setting output {} {}", output, if on { "on" } else { "off" });
        let request = Request::set_outputs(code, &[output], on)?;
        self.session().await?.execute(&request).await
    }

    pub async fn bypass_zones(&self, code: &str, zones: &[u32]) -> Result<()> {
        debug!("Bypassing zones {:?}", zones);
        let request = Request::bypass_zones(code, zones, true)?;
        self.session().await?.execute(&request).await
    }

    pub async fn unbypass_zones(&self, code: &str, zones: &[u32]) -> Result<()> {
        debug!("Unbypassing zones {:?}", zones);
        let request = Request::bypass_zones(code, zones, false)?;
        self.session().await?.execute(&request).await
    }

    // --- Queries ---

    pub async fn read_device_name(&self, kind: DeviceKind, number: u32) -> Result<DeviceName> {
        self.session().await?.read_device_name(kind, number).await
    }

    pub async fn read_version(&self) -> Result<PanelVersion> {
        self.session().await?.read_version().await
    }

    /// Read the panel's real-time clock.
    pub async fn read_time(&self) -> Result<NaiveDateTime> {
        self.session().await?.read_time().await
    }

    /// Query every monitored report again.
    pub async fn refresh(&self) -> Result<()> {
        self.session().await?.refresh().await
    }

    /// Stop the supervisor and close the connection. Safe to call repeatedly.
    pub async fn close(&self) {
        self.inner.shutdown_tx.send_replace(true);
        let handle = self
            .supervisor
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        self.inner.drop_session().await;
    }
}

impl Drop for AsyncSatel {
    fn drop(&mut self) {
        self.inner.shutdown_tx.send_replace(true);
        if let Some(handle) = self
            .supervisor
            .get_mut()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}
