//! Boundary traits for host services
//!
//! The engine core treats visibility computation, persistence, rendering,
//! owner tracking, and font measurement as black boxes behind these traits.
//! In-memory and no-op implementations ship for tests and headless use.

use std::collections::HashMap;

use glam::Vec2;

use crate::error::SplatError;
use crate::history::HistoryLog;
use crate::record::{AlphaTier, SplatRecord};

/// Line-of-sight polygon provider.
pub trait VisibilityQuery {
    /// Flattened x,y pairs relative to `origin`, limiting where a decal at
    /// that origin is visible. An empty result means "no mask"; the decal
    /// draws unmasked.
    fn visibility_polygon(&self, origin: Vec2, max_radius: f32) -> Vec<f32>;
}

/// No line-of-sight limiting; every decal draws unmasked
pub struct NoVisibility;

impl VisibilityQuery for NoVisibility {
    fn visibility_polygon(&self, _origin: Vec2, _max_radius: f32) -> Vec<f32> {
        Vec::new()
    }
}

/// Persistence for scene logs and per-owner record collections.
///
/// Writes are fire-and-forget from the engine's perspective, but a completed
/// write must be visible to the next read (read-after-write consistency is
/// assumed, not verified).
pub trait SplatStore {
    fn load_scene_log(&mut self, scene_id: &str) -> Result<Option<HistoryLog>, SplatError>;
    fn save_scene_log(&mut self, scene_id: &str, log: &HistoryLog) -> Result<(), SplatError>;
    fn load_owner_records(&mut self, owner_id: &str) -> Result<Vec<SplatRecord>, SplatError>;
    fn save_owner_records(
        &mut self,
        owner_id: &str,
        records: &[SplatRecord],
    ) -> Result<(), SplatError>;
}

/// In-memory store backed by JSON round-trips.
///
/// Serializing through JSON rather than cloning keeps tests honest about
/// what actually survives persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    scenes: HashMap<String, String>,
    owners: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SplatStore for MemoryStore {
    fn load_scene_log(&mut self, scene_id: &str) -> Result<Option<HistoryLog>, SplatError> {
        match self.scenes.get(scene_id) {
            Some(json) => serde_json::from_str(json)
                .map(Some)
                .map_err(|e| SplatError::Store(e.to_string())),
            None => Ok(None),
        }
    }

    fn save_scene_log(&mut self, scene_id: &str, log: &HistoryLog) -> Result<(), SplatError> {
        let json = serde_json::to_string(log).map_err(|e| SplatError::Store(e.to_string()))?;
        self.scenes.insert(scene_id.to_string(), json);
        Ok(())
    }

    fn load_owner_records(&mut self, owner_id: &str) -> Result<Vec<SplatRecord>, SplatError> {
        match self.owners.get(owner_id) {
            Some(json) => serde_json::from_str(json).map_err(|e| SplatError::Store(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    fn save_owner_records(
        &mut self,
        owner_id: &str,
        records: &[SplatRecord],
    ) -> Result<(), SplatError> {
        let json = serde_json::to_string(records).map_err(|e| SplatError::Store(e.to_string()))?;
        self.owners.insert(owner_id.to_string(), json);
        Ok(())
    }
}

/// Opaque handle to a drawn decal container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecalHandle(pub u64);

/// Host rendering surface for decals.
pub trait RenderSink {
    fn draw_record(&mut self, record: &SplatRecord) -> DecalHandle;
    fn destroy(&mut self, handle: DecalHandle);
    fn set_alpha(&mut self, handle: DecalHandle, tier: AlphaTier);
    fn set_rotation(&mut self, handle: DecalHandle, degrees: f32);
    /// Destroy every drawn decal container (wipe / full re-render)
    fn destroy_all(&mut self);
}

/// Owner-entity decal collections, kept by the host's token layer.
pub trait OwnerRegistry {
    /// Remove specific records from the owner's collection
    fn remove_records(&mut self, owner_id: &str, record_ids: &[u64]);
    /// Clear the owner's collection entirely; it rebuilds from surviving
    /// history on the next replay
    fn clear_owner(&mut self, owner_id: &str);
    /// Redraw the owner's decals against its current sprite
    fn redraw_owner(&mut self, owner_id: &str);
    /// Persist the owner's updated collection
    fn persist_owner(&mut self, owner_id: &str);
}

/// Glyph measurement under a given style.
pub trait FontMetrics {
    /// Measured (width, height) of one glyph at the given pixel size
    fn measure(&self, glyph: char, font_size: u32) -> (f32, f32);
}

/// Square-advance fallback when host font metrics are unavailable
pub struct SquareMetrics;

impl FontMetrics for SquareMetrics {
    fn measure(&self, _glyph: char, font_size: u32) -> (f32, f32) {
        (font_size as f32, font_size as f32)
    }
}
