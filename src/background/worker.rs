use super::messages::{RegionOutcome, TileEvent, WorkerCommand};
use crate::core::config::{TileServiceConfig, YAxisConvention};
use crate::tiles::{FileTileSource, TileCache, TileRegion, TileSource, VisibilityTracker};
use crate::{Result, TileError};
use crossbeam_channel::{Receiver, Sender};
use std::path::PathBuf;
use std::thread::JoinHandle;

/// Owns the cache, the visibility state and all file I/O.
///
/// The worker is a plain state machine driven by [`TileWorker::handle`], so
/// it can be exercised synchronously; [`TileWorker::spawn`] runs it on its
/// own named thread.
pub struct TileWorker {
    cache: TileCache,
    tracker: VisibilityTracker,
    source: Option<FileTileSource>,
    y_axis: YAxisConvention,
    extensions: Vec<String>,
    events: Sender<TileEvent>,
}

impl TileWorker {
    pub fn new(config: &TileServiceConfig, events: Sender<TileEvent>) -> Self {
        Self {
            cache: TileCache::new(config.cache_capacity),
            tracker: VisibilityTracker::new(),
            source: None,
            y_axis: config.y_axis,
            extensions: config.extensions.clone(),
            events,
        }
    }

    /// Starts a worker thread that serves `commands` until it receives
    /// [`WorkerCommand::Shutdown`] or every sender is dropped.
    pub fn spawn(
        config: &TileServiceConfig,
        commands: Receiver<WorkerCommand>,
        events: Sender<TileEvent>,
    ) -> Result<JoinHandle<()>> {
        let worker = Self::new(config, events);
        std::thread::Builder::new()
            .name(config.worker_thread_name.clone())
            .spawn(move || worker.run(commands))
            .map_err(TileError::WorkerSpawn)
    }

    pub fn run(mut self, commands: Receiver<WorkerCommand>) {
        log::info!("tile worker started");
        for command in commands.iter() {
            if !self.handle(command) {
                break;
            }
        }
        log::info!(
            "tile worker stopped with {} tiles visible, {:?}",
            self.tracker.visible_count(),
            self.cache.stats()
        );
    }

    /// Processes one command. Returns `false` once the worker should stop.
    pub fn handle(&mut self, command: WorkerCommand) -> bool {
        match command {
            WorkerCommand::RequestRegion(region) => self.process_region(region),
            WorkerCommand::SetSourcePath(source) => self.set_source(source),
            WorkerCommand::SetCacheCapacity(capacity) => {
                log::debug!("cache capacity {} -> {}", self.cache.capacity(), capacity);
                self.cache.set_capacity(capacity);
            }
            WorkerCommand::SetYAxis(y_axis) => self.set_y_axis(y_axis),
            WorkerCommand::Shutdown => return false,
        }
        true
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn tracker(&self) -> &VisibilityTracker {
        &self.tracker
    }

    pub fn source(&self) -> Option<&FileTileSource> {
        self.source.as_ref()
    }

    fn set_source(&mut self, source: Option<(u8, PathBuf)>) {
        self.cache.clear();
        match source {
            Some((source_id, path)) => {
                if !path.is_dir() {
                    log::warn!("tile source {} is not a directory", path.display());
                }
                log::info!("tile source set to {} (id {})", path.display(), source_id);
                self.source = Some(FileTileSource::new(
                    source_id,
                    path,
                    self.y_axis,
                    self.extensions.clone(),
                ));
                self.tracker.invalidate();
            }
            None => {
                log::info!("tile source unset");
                self.source = None;
                self.hide_all();
            }
        }
    }

    fn set_y_axis(&mut self, y_axis: YAxisConvention) {
        if y_axis == self.y_axis {
            return;
        }
        log::info!("tile rows now numbered {:?}", y_axis);
        self.y_axis = y_axis;
        if let Some(source) = self.source.as_mut() {
            source.set_y_axis(y_axis);
        }
        // cached and shown images were read with the other row numbering
        self.cache.clear();
        self.hide_all();
    }

    fn process_region(&mut self, region: TileRegion) {
        let Some(source) = self.source.as_ref().filter(|source| source.is_available()) else {
            log::debug!("no usable tile source for {:?}", region);
            self.hide_all();
            emit(&self.events, TileEvent::Finished {
                region,
                outcome: RegionOutcome::NoSource,
            });
            return;
        };

        let region = if region.origin.source_id == source.source_id() {
            region
        } else {
            log::debug!(
                "rebinding region from source {} to {}",
                region.origin.source_id,
                source.source_id()
            );
            region.with_source(source.source_id())
        };

        let change = self.tracker.update(&region, &mut self.cache, source);
        let outcome = if change.unchanged {
            RegionOutcome::Unchanged
        } else {
            RegionOutcome::Computed
        };
        for (address, tile) in change.shown {
            emit(&self.events, TileEvent::Show { address, tile });
        }
        for (address, tile) in change.hidden {
            emit(&self.events, TileEvent::Hide { address, tile });
        }
        emit(&self.events, TileEvent::Finished { region, outcome });
        log::debug!("{:?}", self.cache.stats());
    }

    fn hide_all(&mut self) {
        for (address, tile) in self.tracker.hide_all() {
            emit(&self.events, TileEvent::Hide { address, tile });
        }
    }
}

fn emit(events: &Sender<TileEvent>, event: TileEvent) {
    if events.send(event).is_err() {
        log::warn!("tile event dropped, view side is gone");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::TileAddress;
    use crossbeam_channel::unbounded;
    use std::path::Path;

    fn write_tile(base: &Path, zoom: u8, x: u32, row: u32, ext: &str) {
        let dir = base.join(zoom.to_string()).join(x.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        image::RgbImage::new(2, 2)
            .save(dir.join(format!("{}.{}", row, ext)))
            .unwrap();
    }

    fn worker() -> (TileWorker, Receiver<TileEvent>) {
        let (tx, rx) = unbounded();
        (TileWorker::new(&TileServiceConfig::for_testing(), tx), rx)
    }

    fn drain(rx: &Receiver<TileEvent>) -> Vec<TileEvent> {
        rx.try_iter().collect()
    }

    fn shown(events: &[TileEvent]) -> Vec<TileAddress> {
        events
            .iter()
            .filter(|e| matches!(e, TileEvent::Show { .. }))
            .filter_map(TileEvent::address)
            .collect()
    }

    fn hidden(events: &[TileEvent]) -> Vec<TileAddress> {
        events
            .iter()
            .filter(|e| matches!(e, TileEvent::Hide { .. }))
            .filter_map(TileEvent::address)
            .collect()
    }

    fn outcome(events: &[TileEvent]) -> Option<RegionOutcome> {
        events.iter().rev().find_map(|e| match e {
            TileEvent::Finished { outcome, .. } => Some(*outcome),
            _ => None,
        })
    }

    #[test]
    fn test_region_without_source_finishes_with_no_source() {
        let (mut worker, rx) = worker();
        let region = TileRegion::new(TileAddress::new(0, 1, 0, 0), 2, 2);
        assert!(worker.handle(WorkerCommand::RequestRegion(region)));

        let events = drain(&rx);
        assert_eq!(events.len(), 1);
        assert_eq!(outcome(&events), Some(RegionOutcome::NoSource));
    }

    #[test]
    fn test_missing_directory_hides_everything() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), 0, 0, 0, "png");
        let (mut worker, rx) = worker();
        worker.handle(WorkerCommand::SetSourcePath(Some((0, dir.path().to_path_buf()))));
        let region = TileRegion::new(TileAddress::new(0, 0, 0, 0), 1, 1);
        worker.handle(WorkerCommand::RequestRegion(region));
        assert_eq!(shown(&drain(&rx)), vec![TileAddress::new(0, 0, 0, 0)]);

        let gone = dir.path().join("gone");
        worker.handle(WorkerCommand::SetSourcePath(Some((1, gone))));
        worker.handle(WorkerCommand::RequestRegion(region));
        let events = drain(&rx);
        assert_eq!(hidden(&events), vec![TileAddress::new(0, 0, 0, 0)]);
        assert_eq!(outcome(&events), Some(RegionOutcome::NoSource));
    }

    #[test]
    fn test_repeated_region_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), 1, 0, 0, "jpg");
        let (mut worker, rx) = worker();
        worker.handle(WorkerCommand::SetSourcePath(Some((0, dir.path().to_path_buf()))));

        let region = TileRegion::new(TileAddress::new(0, 1, 0, 0), 2, 2);
        worker.handle(WorkerCommand::RequestRegion(region));
        let first = drain(&rx);
        assert_eq!(shown(&first), vec![TileAddress::new(0, 1, 0, 0)]);
        assert_eq!(outcome(&first), Some(RegionOutcome::Computed));

        worker.handle(WorkerCommand::RequestRegion(region));
        let second = drain(&rx);
        assert_eq!(second.len(), 1);
        assert_eq!(outcome(&second), Some(RegionOutcome::Unchanged));
    }

    #[test]
    fn test_out_of_range_zoom_finishes_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), 1, 0, 0, "jpg");
        let (mut worker, rx) = worker();
        worker.handle(WorkerCommand::SetSourcePath(Some((0, dir.path().to_path_buf()))));
        let region = TileRegion::new(TileAddress::new(0, 1, 0, 0), 1, 1);
        worker.handle(WorkerCommand::RequestRegion(region));
        assert_eq!(shown(&drain(&rx)), vec![TileAddress::new(0, 1, 0, 0)]);

        let deep = TileRegion::new(TileAddress::new(0, 40, 0, 0), 2, 2);
        assert!(worker.handle(WorkerCommand::RequestRegion(deep)));
        let events = drain(&rx);
        assert_eq!(hidden(&events), vec![TileAddress::new(0, 1, 0, 0)]);
        assert_eq!(outcome(&events), Some(RegionOutcome::Computed));
    }

    #[test]
    fn test_switching_source_leaves_no_stale_cache_entries() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        write_tile(a.path(), 0, 0, 0, "png");
        write_tile(b.path(), 0, 0, 0, "png");
        let (mut worker, rx) = worker();

        worker.handle(WorkerCommand::SetSourcePath(Some((0, a.path().to_path_buf()))));
        worker.handle(WorkerCommand::SetSourcePath(Some((1, b.path().to_path_buf()))));
        // the region still carries the old id and is rebound
        let region = TileRegion::new(TileAddress::new(0, 2, 0, 0), 2, 2);
        worker.handle(WorkerCommand::RequestRegion(region));

        assert!(!worker.cache().is_empty());
        assert!(worker.cache().addresses().iter().all(|a| a.source_id == 1));
        let events = drain(&rx);
        assert_eq!(shown(&events), vec![TileAddress::new(1, 0, 0, 0)]);
        match events.last() {
            Some(TileEvent::Finished { region, .. }) => assert_eq!(region.origin.source_id, 1),
            other => panic!("expected finished, got {:?}", other),
        }
    }

    #[test]
    fn test_source_switch_hides_old_tiles_on_next_region() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        write_tile(a.path(), 1, 0, 0, "png");
        write_tile(b.path(), 1, 0, 0, "png");
        let (mut worker, rx) = worker();

        worker.handle(WorkerCommand::SetSourcePath(Some((0, a.path().to_path_buf()))));
        worker.handle(WorkerCommand::RequestRegion(TileRegion::new(
            TileAddress::new(0, 1, 0, 0),
            1,
            1,
        )));
        drain(&rx);

        worker.handle(WorkerCommand::SetSourcePath(Some((1, b.path().to_path_buf()))));
        assert!(drain(&rx).is_empty());
        worker.handle(WorkerCommand::RequestRegion(TileRegion::new(
            TileAddress::new(1, 1, 0, 0),
            1,
            1,
        )));
        let events = drain(&rx);
        assert_eq!(shown(&events), vec![TileAddress::new(1, 1, 0, 0)]);
        assert_eq!(hidden(&events), vec![TileAddress::new(0, 1, 0, 0)]);
    }

    #[test]
    fn test_unsetting_source_hides_immediately() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), 1, 1, 1, "png");
        let (mut worker, rx) = worker();
        worker.handle(WorkerCommand::SetSourcePath(Some((0, dir.path().to_path_buf()))));
        worker.handle(WorkerCommand::RequestRegion(TileRegion::new(
            TileAddress::new(0, 1, 0, 0),
            2,
            2,
        )));
        drain(&rx);

        worker.handle(WorkerCommand::SetSourcePath(None));
        let events = drain(&rx);
        assert_eq!(hidden(&events), vec![TileAddress::new(0, 1, 1, 1)]);
        assert!(!events.iter().any(TileEvent::is_finished));
        assert!(worker.cache().is_empty());
        assert_eq!(worker.tracker().visible_count(), 0);
    }

    #[test]
    fn test_tms_rows_are_flipped_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        // zoom 2: address row 0 lives in file row 3
        write_tile(dir.path(), 2, 1, 3, "png");
        let (mut worker, rx) = worker();
        worker.handle(WorkerCommand::SetYAxis(YAxisConvention::Tms));
        worker.handle(WorkerCommand::SetSourcePath(Some((0, dir.path().to_path_buf()))));

        let region = TileRegion::new(TileAddress::new(0, 2, 1, 0), 1, 1);
        worker.handle(WorkerCommand::RequestRegion(region));
        assert_eq!(shown(&drain(&rx)), vec![TileAddress::new(0, 2, 1, 0)]);

        // back to XYZ: shown tiles go at once and row 0 is absent on disk
        worker.handle(WorkerCommand::SetYAxis(YAxisConvention::Xyz));
        assert_eq!(hidden(&drain(&rx)), vec![TileAddress::new(0, 2, 1, 0)]);
        worker.handle(WorkerCommand::RequestRegion(region));
        let events = drain(&rx);
        assert!(shown(&events).is_empty());
        assert_eq!(outcome(&events), Some(RegionOutcome::Computed));
    }

    #[test]
    fn test_capacity_change_and_shutdown() {
        let (mut worker, _rx) = worker();
        assert!(worker.handle(WorkerCommand::SetCacheCapacity(0)));
        assert_eq!(worker.cache().capacity(), 1);
        assert!(!worker.handle(WorkerCommand::Shutdown));
    }
}
