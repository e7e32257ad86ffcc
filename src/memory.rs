//! In-memory [`WorldHost`].
//!
//! Each world keeps its chunks encoded as [`codec`](crate::codec) payloads, which
//! stand in for region files, and decodes them into a resident window on load.
//! Writes stay resident and dirty until [`WorldHost::unload_unused_chunks`]
//! flushes and evicts them, so the resident window shows what the converter
//! actually holds between ticks.

use crate::chunk::{ChunkCoord, ChunkData};
use crate::codec::{decode_chunk, encode_chunk};
use crate::formats::ProviderRegistry;
use crate::host::{ChunkStore, HostError, WorldHost, WorldInfo, WorldSpec};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub chunk_loads: u64,
    pub chunk_writes: u64,
    pub flushed: u64,
    pub evicted: u64,
    pub cache_clears: u64,
    pub gc_runs: u64,
}

#[derive(Debug)]
struct MemoryWorld {
    info: WorldInfo,
    loaded: bool,
    stored: FxHashMap<ChunkCoord, Vec<u8>>,
    resident: FxHashMap<ChunkCoord, ChunkData>,
    dirty: FxHashSet<ChunkCoord>,
    /// Positions already known to hold no chunk.
    absent: FxHashSet<ChunkCoord>,
}

impl MemoryWorld {
    fn new(info: WorldInfo) -> Self {
        Self {
            info,
            loaded: true,
            stored: FxHashMap::default(),
            resident: FxHashMap::default(),
            dirty: FxHashSet::default(),
            absent: FxHashSet::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    worlds: BTreeMap<String, MemoryWorld>,
    formats: ProviderRegistry,
    load_faults: FxHashMap<(String, ChunkCoord), u32>,
    write_faults: FxHashMap<(String, ChunkCoord), u32>,
    stats: HostStats,
    peak_resident: usize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formats(formats: ProviderRegistry) -> Self {
        Self {
            formats,
            ..Self::default()
        }
    }

    /// Adds an empty, loaded world.
    pub fn add_world(&mut self, name: &str, format: &str, seed: i64, generator: &str) {
        let info = WorldInfo {
            name: name.to_string(),
            format: format.to_string(),
            seed,
            generator: generator.to_string(),
        };
        self.worlds.insert(name.to_string(), MemoryWorld::new(info));
    }

    /// Keeps the world on "disk" but drops it from the loaded set.
    pub fn unload_world(&mut self, name: &str) {
        if let Some(world) = self.worlds.get_mut(name) {
            world.resident.clear();
            world.dirty.clear();
            world.absent.clear();
            world.loaded = false;
        }
    }

    /// Stores a chunk directly, bypassing the resident window.
    pub fn put_chunk(&mut self, world: &str, chunk: ChunkData) -> Result<(), HostError> {
        let bytes = encode_chunk(&chunk)?;
        let world = self.world_mut(world)?;
        world.stored.insert(chunk.coord(), bytes);
        Ok(())
    }

    /// Reads a chunk back from storage. Unflushed writes are not visible here.
    pub fn stored_chunk(&self, world: &str, coord: ChunkCoord) -> Result<Option<ChunkData>, HostError> {
        let world = self
            .worlds
            .get(world)
            .ok_or_else(|| HostError::UnknownWorld(world.to_string()))?;
        match world.stored.get(&coord) {
            Some(bytes) => Ok(Some(decode_chunk(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn stored_coords(&self, world: &str) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self
            .worlds
            .get(world)
            .map(|w| w.stored.keys().copied().collect())
            .unwrap_or_default();
        coords.sort();
        coords
    }

    pub fn resident_count(&self, world: &str) -> usize {
        self.worlds.get(world).map_or(0, |w| w.resident.len())
    }

    /// Largest number of chunks resident across all worlds at any point.
    pub fn peak_resident(&self) -> usize {
        self.peak_resident
    }

    pub fn stats(&self) -> HostStats {
        self.stats
    }

    pub fn register_format(&mut self, name: &str) {
        self.formats.register(name);
    }

    /// Makes the next `count` loads of `coord` in `world` fail with an I/O error.
    pub fn fail_next_loads(&mut self, world: &str, coord: ChunkCoord, count: u32) {
        self.load_faults.insert((world.to_string(), coord), count);
    }

    /// Makes the next `count` writes of `coord` in `world` fail with an I/O error.
    pub fn fail_next_writes(&mut self, world: &str, coord: ChunkCoord, count: u32) {
        self.write_faults.insert((world.to_string(), coord), count);
    }

    fn world_mut(&mut self, name: &str) -> Result<&mut MemoryWorld, HostError> {
        self.worlds
            .get_mut(name)
            .ok_or_else(|| HostError::UnknownWorld(name.to_string()))
    }

    fn loaded_world_mut(&mut self, name: &str) -> Result<&mut MemoryWorld, HostError> {
        match self.worlds.get_mut(name) {
            Some(world) if world.loaded => Ok(world),
            _ => Err(HostError::UnknownWorld(name.to_string())),
        }
    }

    fn track_peak(&mut self) {
        let resident = self.worlds.values().map(|w| w.resident.len()).sum();
        self.peak_resident = self.peak_resident.max(resident);
    }
}

fn take_fault(
    faults: &mut FxHashMap<(String, ChunkCoord), u32>,
    world: &str,
    coord: ChunkCoord,
    op: &str,
) -> Result<(), HostError> {
    let key = (world.to_string(), coord);
    match faults.get_mut(&key) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            Err(HostError::Io {
                world: world.to_string(),
                coord,
                reason: format!("injected {} failure", op),
            })
        }
        _ => Ok(()),
    }
}

impl ChunkStore for MemoryHost {
    fn load_chunk(&mut self, world: &str, coord: ChunkCoord) -> Result<bool, HostError> {
        take_fault(&mut self.load_faults, world, coord, "read")?;
        self.stats.chunk_loads += 1;

        let w = self.loaded_world_mut(world)?;
        if w.resident.contains_key(&coord) {
            return Ok(true);
        }
        if w.absent.contains(&coord) {
            return Ok(false);
        }
        let Some(bytes) = w.stored.get(&coord) else {
            w.absent.insert(coord);
            return Ok(false);
        };
        let chunk = decode_chunk(bytes)?;
        w.resident.insert(coord, chunk);
        self.track_peak();
        Ok(true)
    }

    fn chunk(&self, world: &str, coord: ChunkCoord) -> Option<&ChunkData> {
        self.worlds
            .get(world)
            .filter(|w| w.loaded)
            .and_then(|w| w.resident.get(&coord))
    }

    fn set_chunk(
        &mut self,
        world: &str,
        coord: ChunkCoord,
        chunk: ChunkData,
    ) -> Result<(), HostError> {
        take_fault(&mut self.write_faults, world, coord, "write")?;
        self.stats.chunk_writes += 1;

        let w = self.loaded_world_mut(world)?;
        w.resident.insert(coord, chunk);
        w.dirty.insert(coord);
        w.absent.remove(&coord);
        self.track_peak();
        Ok(())
    }
}

impl WorldHost for MemoryHost {
    fn is_world_loaded(&self, name: &str) -> bool {
        self.worlds.get(name).is_some_and(|w| w.loaded)
    }

    fn load_world(&mut self, name: &str) -> bool {
        match self.worlds.get_mut(name) {
            Some(world) => {
                world.loaded = true;
                true
            }
            None => false,
        }
    }

    fn world_exists(&self, name: &str) -> bool {
        self.worlds.contains_key(name)
    }

    fn world_info(&self, name: &str) -> Option<WorldInfo> {
        self.worlds.get(name).map(|w| w.info.clone())
    }

    fn has_format(&self, format: &str) -> bool {
        self.formats.contains(format)
    }

    fn create_world(&mut self, spec: WorldSpec) -> Result<(), HostError> {
        if self.worlds.contains_key(&spec.name) {
            return Err(HostError::Create {
                name: spec.name,
                reason: "a world with this name already exists".to_string(),
            });
        }
        let Some(format) = self.formats.get(&spec.format).map(str::to_string) else {
            return Err(HostError::Create {
                name: spec.name,
                reason: format!("no provider registered for \"{}\"", spec.format),
            });
        };
        self.add_world(&spec.name, &format, spec.seed, &spec.generator);
        Ok(())
    }

    fn loaded_worlds(&self) -> Vec<String> {
        self.worlds
            .iter()
            .filter(|(_, w)| w.loaded)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn unload_unused_chunks(&mut self, world: &str) {
        let Some(w) = self.worlds.get_mut(world) else {
            return;
        };

        let mut dirty: Vec<_> = w.dirty.drain().collect();
        dirty.sort();
        for coord in dirty {
            let Some(chunk) = w.resident.get(&coord) else {
                continue;
            };
            match encode_chunk(chunk) {
                Ok(bytes) => {
                    w.stored.insert(coord, bytes);
                    self.stats.flushed += 1;
                }
                Err(e) => {
                    warn!("Failed to flush chunk {} of \"{}\": {}", coord, world, e);
                    // keep it resident so the next sweep retries
                    w.dirty.insert(coord);
                }
            }
        }

        let before = w.resident.len();
        let still_dirty = &w.dirty;
        w.resident.retain(|coord, _| still_dirty.contains(coord));
        self.stats.evicted += (before - w.resident.len()) as u64;
    }

    fn clear_cache(&mut self, world: &str) {
        if let Some(w) = self.worlds.get_mut(world) {
            w.absent.clear();
            self.stats.cache_clears += 1;
        }
    }

    fn collect_garbage(&mut self) {
        for world in self.worlds.values_mut() {
            world.resident.shrink_to_fit();
            world.absent.shrink_to_fit();
        }
        self.stats.gc_runs += 1;
    }
}
