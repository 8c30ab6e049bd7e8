use super::address::TileAddress;
use super::loader::RenderableTile;
use crate::{Result, TileError};
use fxhash::FxHashMap;
use std::path::{Path, PathBuf};

/// Trait representing anything that can produce renderable tiles for an address.
///
/// Implementations run on the worker thread only. Returning `None` means the
/// tile is confirmed absent; the cache remembers that until it is cleared.
pub trait TileSource: Send {
    /// Load the tile at `address`, or `None` if there is no data for it.
    fn load(&self, address: &TileAddress) -> Option<RenderableTile>;

    /// Whether the source can serve anything at all.
    fn is_available(&self) -> bool {
        true
    }
}

impl<F> TileSource for F
where
    F: Fn(&TileAddress) -> Option<RenderableTile> + Send,
{
    fn load(&self, address: &TileAddress) -> Option<RenderableTile> {
        self(address)
    }
}

/// Bidirectional interning of source paths to the compact ids carried by
/// [`TileAddress`]. Each coordinator owns its own registry, so ids never
/// leak between independent map views.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    ids: FxHashMap<PathBuf, u8>,
    paths: Vec<PathBuf>,
}

impl SourceRegistry {
    /// Largest number of distinct sources a registry can hold
    pub const CAPACITY: usize = u8::MAX as usize + 1;

    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `path`, registering it on first use.
    pub fn intern(&mut self, path: &Path) -> Result<u8> {
        if let Some(&id) = self.ids.get(path) {
            return Ok(id);
        }
        if self.paths.len() >= Self::CAPACITY {
            return Err(TileError::SourceRegistryFull(Self::CAPACITY));
        }
        let id = self.paths.len() as u8;
        self.paths.push(path.to_path_buf());
        self.ids.insert(path.to_path_buf(), id);
        log::debug!("registered tile source {} as id {}", path.display(), id);
        Ok(id)
    }

    pub fn id_of(&self, path: &Path) -> Option<u8> {
        self.ids.get(path).copied()
    }

    pub fn path_of(&self, id: u8) -> Option<&Path> {
        self.paths.get(id as usize).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
