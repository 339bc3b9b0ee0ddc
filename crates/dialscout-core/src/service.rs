// ── Sink service facade ──
//
// Full lifecycle management for DIAL sink discovery. `start()` spawns the
// transport task and the engine event loop; monitoring and resync
// operations are routed to the loop over a command channel; `stop()`
// cancels the per-run child token and tears everything down. All engine
// state lives inside the loop task, so nothing here needs a lock beyond
// the run-handle slot itself.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dialscout_net::{
    AppInfo, AppInfoFetcher, DescriptionResolver, DeviceDescription, DialDevice,
    DiscoveryTransport, Error as NetError, TransportEvent,
};

use crate::config::ServiceConfig;
use crate::cycle::DiscoveryCycle;
use crate::engine::{AppFetch, Reconciler, SinkEvent};
use crate::error::ServiceError;
use crate::model::{Sink, SinkId};
use crate::stream::SinkStream;

const PROBE_CHANNEL_SIZE: usize = 4;
const TRANSPORT_CHANNEL_SIZE: usize = 32;
const OUTCOME_CHANNEL_SIZE: usize = 64;

// ── Commands ─────────────────────────────────────────────────────────

enum ServiceCommand {
    StartMonitoring(String),
    StopMonitoring(String),
    UserGesture,
    AvailableSinks {
        app: String,
        reply: oneshot::Sender<Vec<Sink>>,
    },
}

/// Terminal outcome of a spawned fetch, delivered back onto the event loop.
enum FetchOutcome {
    Description {
        device: DialDevice,
        result: Result<DeviceDescription, NetError>,
    },
    AppInfo {
        sink_id: SinkId,
        app: String,
        result: Result<AppInfo, NetError>,
    },
}

// ── SinkService ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`. Composes a discovery transport, a
/// description resolver, and an app-info fetcher into the discovery
/// lifecycle; consumers subscribe to [`SinkEvent`]s and the sink-list
/// watch channel.
#[derive(Clone)]
pub struct SinkService<T, R, F>
where
    T: DiscoveryTransport,
    R: DescriptionResolver,
    F: AppInfoFetcher,
{
    inner: Arc<ServiceInner<T, R, F>>,
}

struct ServiceInner<T, R, F> {
    config: ServiceConfig,
    transport: T,
    resolver: R,
    fetcher: F,
    events: broadcast::Sender<SinkEvent>,
    sinks_tx: Arc<watch::Sender<Vec<Sink>>>,
    cancel: CancellationToken,
    /// `Some` while running. Holds the channels into the live event loop.
    run: Mutex<Option<RunHandles>>,
}

struct RunHandles {
    command_tx: mpsc::Sender<ServiceCommand>,
    cancel_child: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<T, R, F> SinkService<T, R, F>
where
    T: DiscoveryTransport,
    R: DescriptionResolver,
    F: AppInfoFetcher,
{
    /// Create a service from its collaborators. Does NOT begin discovery —
    /// call [`start()`](Self::start).
    pub fn new(transport: T, resolver: R, fetcher: F, config: ServiceConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let sinks_tx = Arc::new(watch::Sender::new(Vec::new()));
        Self {
            inner: Arc::new(ServiceInner {
                config,
                transport,
                resolver,
                fetcher,
                events,
                sinks_tx,
                cancel: CancellationToken::new(),
                run: Mutex::new(None),
            }),
        }
    }

    /// Access the service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Begin discovery: spawns the transport task and the engine event
    /// loop, and sends the first probe immediately. Idempotent — a second
    /// call while running is a no-op.
    pub async fn start(&self) {
        let mut run = self.inner.run.lock().await;
        if run.is_some() {
            debug!("start ignored, discovery already running");
            return;
        }
        info!("starting DIAL sink discovery");

        // Fresh child token per run so a stopped service can start again.
        let cancel_child = self.inner.cancel.child_token();
        let (command_tx, command_rx) = mpsc::channel(self.inner.config.command_capacity.max(1));
        let (probe_tx, probe_rx) = mpsc::channel(PROBE_CHANNEL_SIZE);
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_CHANNEL_SIZE);

        let mut tasks = Vec::new();

        let transport = self.inner.transport.clone();
        let transport_cancel = cancel_child.clone();
        tasks.push(tokio::spawn(async move {
            transport.run(probe_rx, transport_tx, transport_cancel).await;
        }));

        tasks.push(tokio::spawn(engine_task(EngineTask {
            config: self.inner.config.clone(),
            resolver: self.inner.resolver.clone(),
            fetcher: self.inner.fetcher.clone(),
            events: self.inner.events.clone(),
            sinks_tx: Arc::clone(&self.inner.sinks_tx),
            commands: command_rx,
            transport_events: transport_rx,
            probe_tx,
            cancel: cancel_child.clone(),
        })));

        *run = Some(RunHandles {
            command_tx,
            cancel_child,
            tasks,
        });
    }

    /// Halt discovery and release all engine state (registry, cache, and
    /// app registrations die with the event loop). Idempotent.
    pub async fn stop(&self) {
        let mut run = self.inner.run.lock().await;
        let Some(handles) = run.take() else {
            debug!("stop ignored, discovery not running");
            return;
        };
        info!("stopping DIAL sink discovery");
        handles.cancel_child.cancel();
        for task in handles.tasks {
            let _ = task.await;
        }
        // Late fetch completions die on the loop's closed channels; the
        // published snapshot resets so stale sinks don't outlive the run.
        self.inner.sinks_tx.send_replace(Vec::new());
    }

    // ── Monitoring & resync ──────────────────────────────────────────

    /// Begin monitoring a receiver app. Triggers probes for all current
    /// sinks that lack a confirmed availability.
    pub async fn start_monitoring_app(
        &self,
        app: impl Into<String>,
    ) -> Result<(), ServiceError> {
        self.send_command(
            ServiceCommand::StartMonitoring(app.into()),
            "start_monitoring_app",
        )
        .await
    }

    /// Stop monitoring a receiver app and clear its cached statuses.
    pub async fn stop_monitoring_app(&self, app: impl Into<String>) -> Result<(), ServiceError> {
        self.send_command(
            ServiceCommand::StopMonitoring(app.into()),
            "stop_monitoring_app",
        )
        .await
    }

    /// Explicit resync: re-broadcasts every current sink, force-refetches
    /// every (sink, registered app) pair, and requests an immediate probe.
    pub async fn on_user_gesture(&self) -> Result<(), ServiceError> {
        self.send_command(ServiceCommand::UserGesture, "on_user_gesture")
            .await
    }

    /// Point-in-time availability set for an app, in discovery order.
    pub async fn available_sinks(
        &self,
        app: impl Into<String>,
    ) -> Result<Vec<Sink>, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.send_command(
            ServiceCommand::AvailableSinks {
                app: app.into(),
                reply,
            },
            "available_sinks",
        )
        .await?;
        response.await.map_err(|_| ServiceError::Shutdown)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Subscribe to sink events. Safe to call before `start()`.
    pub fn events(&self) -> broadcast::Receiver<SinkEvent> {
        self.inner.events.subscribe()
    }

    /// Subscribe to the current sink list (updated at round completion).
    pub fn sinks(&self) -> SinkStream {
        SinkStream::new(self.inner.sinks_tx.subscribe())
    }

    /// The sink list as of the last completed round.
    pub fn current_sinks(&self) -> Vec<Sink> {
        self.inner.sinks_tx.borrow().clone()
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn send_command(
        &self,
        command: ServiceCommand,
        operation: &'static str,
    ) -> Result<(), ServiceError> {
        let run = self.inner.run.lock().await;
        let handles = run
            .as_ref()
            .ok_or(ServiceError::NotStarted { operation })?;
        handles
            .command_tx
            .send(command)
            .await
            .map_err(|_| ServiceError::Shutdown)
    }
}

// ── Engine event loop ────────────────────────────────────────────────

struct EngineTask<R, F> {
    config: ServiceConfig,
    resolver: R,
    fetcher: F,
    events: broadcast::Sender<SinkEvent>,
    sinks_tx: Arc<watch::Sender<Vec<Sink>>>,
    commands: mpsc::Receiver<ServiceCommand>,
    transport_events: mpsc::Receiver<TransportEvent>,
    probe_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
}

/// The single task that owns all engine state. Every mutation flows
/// through here in arrival order; collaborator fetches run in spawned
/// tasks and report back over the outcome channel.
async fn engine_task<R, F>(task: EngineTask<R, F>)
where
    R: DescriptionResolver,
    F: AppInfoFetcher,
{
    let EngineTask {
        config,
        resolver,
        fetcher,
        events,
        sinks_tx,
        mut commands,
        mut transport_events,
        probe_tx,
        cancel,
    } = task;

    let mut engine = Reconciler::new(events, sinks_tx);
    let mut cycle = DiscoveryCycle::new(config.settle_window);
    cycle.start();

    let (outcome_tx, mut outcomes) = mpsc::channel::<FetchOutcome>(OUTCOME_CHANNEL_SIZE);
    let mut probe_timer = tokio::time::interval(config.probe_interval);
    // The interval's immediate first tick doubles as the initial probe.

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = probe_timer.tick() => {
                // A full probe channel means a probe is already pending;
                // the next tick covers us.
                let _ = probe_tx.try_send(());
            }
            Some(event) = transport_events.recv() => match event {
                TransportEvent::Devices(devices) => {
                    engine.on_round_start(&devices);
                    cycle.on_device_event();
                    for device in devices {
                        spawn_resolution(&resolver, device, &outcome_tx);
                    }
                }
                TransportEvent::Error(error) => {
                    warn!(error = %error, "discovery transport error");
                }
            },
            Some(outcome) = outcomes.recv() => match outcome {
                FetchOutcome::Description { device, result } => {
                    cycle.on_resolution_activity();
                    match result {
                        Ok(description) => {
                            let fetches =
                                engine.on_description_resolved(&device, &description);
                            spawn_fetches(&fetcher, fetches, &outcome_tx);
                        }
                        Err(error) => engine.on_description_error(&device, &error),
                    }
                }
                FetchOutcome::AppInfo { sink_id, app, result } => {
                    engine.on_app_info(&sink_id, &app, result);
                }
            },
            Some(command) = commands.recv() => match command {
                ServiceCommand::StartMonitoring(app) => {
                    debug!(app, "start monitoring");
                    let fetches = engine.start_monitoring(&app);
                    spawn_fetches(&fetcher, fetches, &outcome_tx);
                }
                ServiceCommand::StopMonitoring(app) => {
                    debug!(app, "stop monitoring");
                    engine.stop_monitoring(&app);
                }
                ServiceCommand::UserGesture => {
                    let fetches = engine.on_user_gesture();
                    spawn_fetches(&fetcher, fetches, &outcome_tx);
                    let _ = probe_tx.try_send(());
                }
                ServiceCommand::AvailableSinks { app, reply } => {
                    let _ = reply.send(engine.available_sinks(&app));
                }
            },
            () = cycle.settled(), if cycle.is_settling() => {
                cycle.fire();
                engine.on_round_complete();
            }
            else => break,
        }
    }
    cycle.stop();
    debug!("engine event loop stopped");
}

fn spawn_resolution<R>(resolver: &R, device: DialDevice, outcome_tx: &mpsc::Sender<FetchOutcome>)
where
    R: DescriptionResolver,
{
    let resolver = resolver.clone();
    let tx = outcome_tx.clone();
    tokio::spawn(async move {
        let result = resolver.resolve(device.clone()).await;
        let _ = tx.send(FetchOutcome::Description { device, result }).await;
    });
}

fn spawn_fetches<F>(fetcher: &F, fetches: Vec<AppFetch>, outcome_tx: &mpsc::Sender<FetchOutcome>)
where
    F: AppInfoFetcher,
{
    for fetch in fetches {
        let fetcher = fetcher.clone();
        let tx = outcome_tx.clone();
        tokio::spawn(async move {
            let result = fetcher
                .fetch_app_info(fetch.app_url, fetch.app_name.clone())
                .await;
            let _ = tx
                .send(FetchOutcome::AppInfo {
                    sink_id: fetch.sink_id,
                    app: fetch.app_name,
                    result,
                })
                .await;
        });
    }
}
