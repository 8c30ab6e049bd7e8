use crate::core::config::YAxisConvention;
use crate::tiles::{TileAddress, TileHandle, TileRegion};
use std::path::PathBuf;

/// Commands sent from the view thread to the worker
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// Evaluate a region and report the visibility diff
    RequestRegion(TileRegion),
    /// Switch to another tile tree. `None` unsets the source.
    SetSourcePath(Option<(u8, PathBuf)>),
    SetCacheCapacity(usize),
    SetYAxis(YAxisConvention),
    Shutdown,
}

/// How a region request was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionOutcome {
    /// Leaves were expanded and diffed
    Computed,
    /// Same region as last time, nothing evaluated
    Unchanged,
    /// No usable source; everything shown was hidden
    NoSource,
}

/// Events delivered to the view thread in the order the worker produced
/// them. A region's `Show`/`Hide` events always precede its `Finished`.
#[derive(Debug, Clone)]
pub enum TileEvent {
    Show {
        address: TileAddress,
        tile: TileHandle,
    },
    Hide {
        address: TileAddress,
        tile: TileHandle,
    },
    Finished {
        region: TileRegion,
        outcome: RegionOutcome,
    },
}

impl TileEvent {
    pub fn is_finished(&self) -> bool {
        matches!(self, TileEvent::Finished { .. })
    }

    /// Address of a show or hide event
    pub fn address(&self) -> Option<TileAddress> {
        match self {
            TileEvent::Show { address, .. } | TileEvent::Hide { address, .. } => Some(*address),
            TileEvent::Finished { .. } => None,
        }
    }
}
