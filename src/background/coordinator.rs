use super::messages::{TileEvent, WorkerCommand};
use super::worker::TileWorker;
use crate::core::config::{TileServiceConfig, YAxisConvention};
use crate::core::geo::{Coordinate, ScenePoint};
use crate::core::viewport::{ScreenPoint, TileRangeCalculator, Viewport};
use crate::tiles::{SourceRegistry, TileRegion};
use crate::{Result, TileError};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::path::Path;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// View-side half of the tile service.
///
/// Owns the viewport and talks to one [`TileWorker`] thread. At most one
/// region is in flight. Requests made while busy collapse into a single
/// recompute from the viewport, submitted when the worker reports
/// `Finished`. If the worker goes away the coordinator turns idle and every
/// later command fails with [`TileError::WorkerDisconnected`]. Events
/// are only observed when the caller drains them with
/// [`LoadCoordinator::poll_events`] or one of the waiting variants, which
/// is also when pending work gets submitted.
pub struct LoadCoordinator {
    config: TileServiceConfig,
    commands: Sender<WorkerCommand>,
    events: Receiver<TileEvent>,
    worker: Option<JoinHandle<()>>,
    registry: SourceRegistry,
    source_id: u8,
    viewport: Viewport,
    calculator: TileRangeCalculator,
    busy: bool,
    pending_recompute: bool,
}

impl LoadCoordinator {
    /// Validates `config`, starts the worker and applies the configured
    /// source path. Failing to start the worker thread is the only error
    /// besides an invalid config.
    pub fn new(config: TileServiceConfig) -> Result<Self> {
        config.validate()?;
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let worker = TileWorker::spawn(&config, command_rx, event_tx)?;

        let viewport =
            Viewport::new(800.0, 600.0, config.initial_zoom).with_max_zoom(config.max_zoom);
        let mut coordinator = Self {
            calculator: TileRangeCalculator::new(config.tile_padding),
            config,
            commands: command_tx,
            events: event_rx,
            worker: Some(worker),
            registry: SourceRegistry::new(),
            source_id: 0,
            viewport,
            busy: false,
            pending_recompute: false,
        };
        if let Some(path) = coordinator.config.source_path.clone() {
            coordinator.set_source_path(&path)?;
        }
        Ok(coordinator)
    }

    pub fn config(&self) -> &TileServiceConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn source_id(&self) -> u8 {
        self.source_id
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// A region is being computed by the worker
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Work will be submitted once the current region finishes
    pub fn has_pending(&self) -> bool {
        self.pending_recompute
    }

    /// Switches the tile tree. An empty path unsets the source and hides
    /// every shown tile. Nothing is requested; call
    /// [`LoadCoordinator::update_tiles`] to load from the new source.
    pub fn set_source_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            self.config.source_path = None;
            return self.send(WorkerCommand::SetSourcePath(None));
        }
        let source_id = self.registry.intern(path)?;
        self.source_id = source_id;
        self.config.source_path = Some(path.to_path_buf());
        self.send(WorkerCommand::SetSourcePath(Some((source_id, path.to_path_buf()))))
    }

    pub fn set_cache_capacity(&mut self, capacity: usize) -> Result<()> {
        self.config.cache_capacity = capacity.max(1);
        self.send(WorkerCommand::SetCacheCapacity(capacity))
    }

    pub fn set_y_axis(&mut self, y_axis: YAxisConvention) -> Result<()> {
        self.config.y_axis = y_axis;
        self.send(WorkerCommand::SetYAxis(y_axis))
    }

    pub fn set_y_axis_convention(&mut self, tms: bool) -> Result<()> {
        self.set_y_axis(YAxisConvention::from_tms(tms))
    }

    /// Submits `region` for evaluation. While busy the region is dropped
    /// and the viewport is recomputed once the worker finishes.
    pub fn request_region(&mut self, region: TileRegion) -> Result<()> {
        if self.busy {
            log::debug!("busy, {:?} becomes a viewport recompute", region);
            self.pending_recompute = true;
            return Ok(());
        }
        self.submit(region)
    }

    /// Region the current viewport needs
    pub fn current_region(&self) -> TileRegion {
        self.calculator.region_for(&self.viewport, self.source_id)
    }

    /// Requests the tiles for the current viewport, or marks a recompute as
    /// pending while the worker is busy.
    pub fn update_tiles(&mut self) -> Result<()> {
        if self.busy {
            self.pending_recompute = true;
            return Ok(());
        }
        let region = self.current_region();
        self.submit(region)
    }

    pub fn set_zoom_level(&mut self, zoom: f64) -> Result<()> {
        self.viewport.set_zoom(zoom);
        self.update_tiles()
    }

    pub fn zoom_in(&mut self) -> Result<()> {
        self.viewport.zoom_by(self.config.zoom_step);
        self.update_tiles()
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.viewport.zoom_by(-self.config.zoom_step);
        self.update_tiles()
    }

    pub fn center_on(&mut self, coord: &Coordinate) -> Result<()> {
        self.viewport.center_on(coord);
        self.update_tiles()
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Result<()> {
        self.viewport.pan_by(dx, dy);
        self.update_tiles()
    }

    pub fn resize(&mut self, width: f64, height: f64) -> Result<()> {
        self.viewport.resize(width, height);
        self.update_tiles()
    }

    pub fn set_rotation(&mut self, degrees: f64) -> Result<()> {
        self.viewport.set_rotation(degrees);
        self.update_tiles()
    }

    /// Geographic coordinate under a view pixel
    pub fn to_coordinate(&self, point: ScreenPoint) -> Coordinate {
        self.viewport.to_coordinate(point)
    }

    pub fn to_scene(&self, point: ScreenPoint) -> ScenePoint {
        self.viewport.to_scene(point)
    }

    /// Drains every event already delivered. Never blocks.
    pub fn poll_events(&mut self) -> Vec<TileEvent> {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.observe(&event);
                    events.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.worker.is_some() {
                        self.mark_disconnected();
                    }
                    break;
                }
            }
        }
        events
    }

    /// Waits up to `timeout` for the next event
    pub fn wait_event(&mut self, timeout: Duration) -> Result<Option<TileEvent>> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => {
                self.observe(&event);
                Ok(Some(event))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.mark_disconnected();
                Err(TileError::WorkerDisconnected)
            }
        }
    }

    /// Collects events until nothing is in flight or pending, or until
    /// `timeout` runs out. Check [`LoadCoordinator::is_busy`] afterwards to
    /// tell the two apart.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> Result<Vec<TileEvent>> {
        let deadline = Instant::now() + timeout;
        let mut events = self.poll_events();
        while self.busy {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::warn!("tile worker still busy after {:?}", timeout);
                break;
            }
            match self.wait_event(remaining)? {
                Some(event) => events.push(event),
                None => break,
            }
        }
        Ok(events)
    }

    /// Stops the worker and waits for it to exit. Further commands fail
    /// with [`TileError::WorkerDisconnected`].
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if worker.join().is_err() {
            log::error!("tile worker panicked");
        }
        self.busy = false;
        self.pending_recompute = false;
    }

    /// The worker hung up on its own. Nothing is in flight any more.
    fn mark_disconnected(&mut self) {
        self.busy = false;
        self.pending_recompute = false;
        let Some(worker) = self.worker.take() else {
            return;
        };
        log::error!("tile worker hung up");
        if worker.join().is_err() {
            log::error!("tile worker panicked");
        }
    }

    fn submit(&mut self, region: TileRegion) -> Result<()> {
        self.send(WorkerCommand::RequestRegion(region))?;
        self.busy = true;
        Ok(())
    }

    fn send(&mut self, command: WorkerCommand) -> Result<()> {
        if self.worker.is_none() {
            return Err(TileError::WorkerDisconnected);
        }
        if self.commands.send(command).is_err() {
            self.mark_disconnected();
            return Err(TileError::WorkerDisconnected);
        }
        Ok(())
    }

    fn observe(&mut self, event: &TileEvent) {
        let TileEvent::Finished { region, outcome } = event else {
            return;
        };
        log::debug!("finished {:?}: {:?}", region, outcome);
        self.busy = false;
        if !std::mem::take(&mut self.pending_recompute) {
            return;
        }
        let next = self.current_region();
        if let Err(e) = self.submit(next) {
            log::error!("failed to submit pending region: {}", e);
        }
    }
}

impl Drop for LoadCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
