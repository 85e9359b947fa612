//! Per-scene splat context
//!
//! Owns everything the engine mutates for one scene: the bounded history,
//! per-entity bleed accumulators, the seeded RNG, registered glyph sets, and
//! the resolved configuration stack. No ambient globals; hosts hold one
//! context per active scene and feed it entity events.
//!
//! One entity update runs classify -> layout -> build -> stage synchronously,
//! then commits and persists. Exclusive access serializes cross-entity
//! interleaving; hosts driving one scene from several threads wrap it in
//! their own lock.

use std::collections::HashMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde_json::Value;

use crate::config::{ConfigStack, SplatConfig};
use crate::error::SplatError;
use crate::geometry::{direction_sign, distance};
use crate::history::HistoryManager;
use crate::layout::{generate_cluster, generate_trail, scaled_font_size, splat_amount};
use crate::record::{SplatKind, StyleDescriptor, TextAlign, build_record};
use crate::services::{FontMetrics, OwnerRegistry, RenderSink, SplatStore, VisibilityQuery};
use crate::severity::{BleedState, SeverityEvent, classify};
use crate::systems::{adapter_for, blood_color};

/// Fallback glyph set until the host registers real font glyphs
const DEFAULT_GLYPHS: &[char] = &['!', '#', '%', '&', '*', '+', ',', '-', '.', ':', ';'];

/// Host collaborators threaded through every operation
pub struct Services<'a> {
    pub store: &'a mut dyn SplatStore,
    pub visibility: &'a dyn VisibilityQuery,
    pub metrics: &'a dyn FontMetrics,
    pub sink: &'a mut dyn RenderSink,
    pub owners: &'a mut dyn OwnerRegistry,
}

/// One observed entity change, as delivered by the host event system
#[derive(Debug, Clone)]
pub struct EntityUpdate<'a> {
    pub entity_id: &'a str,
    /// World position of the entity center
    pub pos: Vec2,
    /// Entity footprint in pixels (width, height)
    pub footprint: Vec2,
    /// Raw entity data; read through the active system adapter
    pub data: &'a Value,
    /// Host timestamp (ms)
    pub timestamp: f64,
}

/// Per-scene splat engine context
pub struct SceneSplats {
    scene_id: String,
    system_id: String,
    grid_size: f32,
    pub config: ConfigStack,
    history: HistoryManager,
    bleed: HashMap<String, BleedState>,
    fonts: HashMap<String, Vec<char>>,
    rng: Pcg32,
    next_id: u64,
    next_z: i32,
    /// Last replayed stop index; compared against the log pointer per render
    rendered: usize,
    active: bool,
}

impl SceneSplats {
    pub fn new(
        scene_id: &str,
        system_id: &str,
        grid_size: f32,
        seed: u64,
        config: SplatConfig,
    ) -> Self {
        let capacity = config.scene_splat_pool_size;
        Self {
            scene_id: scene_id.to_string(),
            system_id: system_id.to_string(),
            grid_size,
            config: ConfigStack::new(config),
            history: HistoryManager::new(capacity),
            bleed: HashMap::new(),
            fonts: HashMap::new(),
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
            next_z: 0,
            rendered: 0,
            active: true,
        }
    }

    /// Resume a scene from the persisted log, if one exists
    pub fn load(
        scene_id: &str,
        system_id: &str,
        grid_size: f32,
        seed: u64,
        config: SplatConfig,
        store: &mut dyn SplatStore,
    ) -> Result<Self, SplatError> {
        let mut scene = Self::new(scene_id, system_id, grid_size, seed, config);
        if let Some(log) = store.load_scene_log(scene_id)? {
            scene.next_id = log.events.iter().map(|r| r.id + 1).max().unwrap_or(1);
            scene.next_z = log.events.iter().map(|r| r.z_order + 1).max().unwrap_or(0);
            let capacity = scene.config.global.scene_splat_pool_size;
            scene.history = HistoryManager::from_log(log, capacity);
        }
        Ok(scene)
    }

    /// Register the glyph set for a loaded font
    pub fn register_font(&mut self, name: &str, glyphs: Vec<char>) {
        self.fonts.insert(name.to_string(), glyphs);
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn alloc_z(&mut self) -> i32 {
        let z = self.next_z;
        self.next_z += 1;
        z
    }

    fn ensure_active(&self) -> Result<(), SplatError> {
        if self.active {
            Ok(())
        } else {
            Err(SplatError::InactiveScene(self.scene_id.clone()))
        }
    }

    fn glyphs_for(&self, name: &str) -> Vec<char> {
        self.fonts
            .get(name)
            .cloned()
            .unwrap_or_else(|| DEFAULT_GLYPHS.to_vec())
    }

    fn style(font: &str, size: u32, color: &str) -> StyleDescriptor {
        StyleDescriptor {
            font_family: font.to_string(),
            font_size: size,
            fill_color: color.to_string(),
            alignment: TextAlign::Center,
        }
    }

    /// React to one entity update: classify the health change, generate and
    /// stage decals, commit, and persist the log.
    ///
    /// Entities without readable health data are logged and skipped; store
    /// failures propagate.
    pub fn entity_updated(
        &mut self,
        update: &EntityUpdate,
        services: &mut Services,
    ) -> Result<(), SplatError> {
        self.ensure_active()?;

        let adapter = adapter_for(&self.system_id);
        let (Some(hp), Some(max_hp)) =
            ((adapter.current_hp)(update.data), (adapter.max_hp)(update.data))
        else {
            log::warn!(
                "entity {} has no readable health data for system {}, skipping",
                update.entity_id,
                adapter.id
            );
            return Ok(());
        };
        let (hp, max_hp) = (hp as f32, max_hp as f32);

        let cfg = self.config.resolve(Some(update.entity_id));
        let prev = self
            .bleed
            .get(update.entity_id)
            .cloned()
            .unwrap_or_else(|| BleedState::new(update.pos, hp, max_hp));

        let severity = classify(hp, prev.last_hp, max_hp, &cfg.thresholds());
        let moved = update.pos != prev.last_pos;
        let event = SeverityEvent {
            entity_id: update.entity_id.to_string(),
            severity,
            direction: moved.then(|| direction_sign(prev.last_pos, update.pos)),
            timestamp: update.timestamp,
        };
        log::debug!(
            "entity {} severity {:.2} direction {:?}",
            event.entity_id,
            event.severity,
            event.direction
        );

        let mut state = prev.clone();
        state.observe(update.pos, hp, max_hp, severity);

        let mut dirty = false;
        if event.severity > 0.0 {
            self.spawn_wound_splats(update, &cfg, event.severity, services)?;
        } else if event.severity < 0.0 {
            dirty = self.remove_heal_splats(update.entity_id, &cfg, event.severity, services);
        }

        // trails run while the entity is still bleeding, independent of this
        // tick's hit
        if moved && state.severity > 0.0 {
            self.spawn_trail_splats(update, &cfg, &prev, &mut state, services);
        }

        self.bleed.insert(update.entity_id.to_string(), state);

        if self.history.commit(services.sink, services.owners) {
            dirty = true;
        }
        if dirty {
            services.store.save_scene_log(&self.scene_id, self.history.log())?;
        }
        Ok(())
    }

    /// Floor cluster at the wound position plus a token cluster riding the
    /// entity; the token record is also appended to the owner's persisted
    /// collection.
    fn spawn_wound_splats(
        &mut self,
        update: &EntityUpdate,
        cfg: &SplatConfig,
        severity: f32,
        services: &mut Services,
    ) -> Result<(), SplatError> {
        let color = blood_color((adapter_for(&self.system_id).creature_type)(update.data).as_deref());
        let spread = update.footprint * cfg.splat_spread;

        let floor_amount = splat_amount(cfg.floor_splat_density, severity);
        if floor_amount > 0 {
            let size =
                scaled_font_size(cfg.floor_splat_size, update.footprint, self.grid_size, severity);
            let glyphs = self.glyphs_for(&cfg.floor_splat_font);
            let prims = generate_cluster(
                &mut self.rng,
                floor_amount,
                spread,
                &glyphs,
                size,
                services.metrics,
            );
            if let Some(record) = build_record(
                self.alloc_id(),
                SplatKind::Floor,
                None,
                prims,
                Self::style(&cfg.floor_splat_font, size, color),
                update.pos,
                self.alloc_z(),
                update.timestamp,
                services.visibility,
            ) {
                self.history.stage(record);
            }
        }

        let token_amount = splat_amount(cfg.token_splat_density, severity);
        if token_amount > 0 {
            let size =
                scaled_font_size(cfg.token_splat_size, update.footprint, self.grid_size, severity);
            let glyphs = self.glyphs_for(&cfg.token_splat_font);
            let prims = generate_cluster(
                &mut self.rng,
                token_amount,
                spread,
                &glyphs,
                size,
                services.metrics,
            );
            if let Some(record) = build_record(
                self.alloc_id(),
                SplatKind::Token,
                Some(update.entity_id.to_string()),
                prims,
                Self::style(&cfg.token_splat_font, size, color),
                update.pos,
                self.alloc_z(),
                update.timestamp,
                services.visibility,
            ) {
                let mut owned = services.store.load_owner_records(update.entity_id)?;
                owned.push(record.clone());
                services.store.save_owner_records(update.entity_id, &owned)?;
                self.history.stage(record);
            }
        }
        Ok(())
    }

    /// Healing removes this entity's records, oldest first, proportional to
    /// the heal magnitude; a full heal (severity -1) clears them all.
    ///
    /// Returns whether the log changed.
    fn remove_heal_splats(
        &mut self,
        entity_id: &str,
        cfg: &SplatConfig,
        severity: f32,
        services: &mut Services,
    ) -> bool {
        let owned = self.history.owned_record_ids(entity_id);
        if owned.is_empty() {
            return false;
        }
        let take = if severity <= -1.0 {
            owned.len()
        } else {
            splat_amount(cfg.token_splat_density, -severity).min(owned.len())
        };
        if take == 0 {
            return false;
        }
        self.history
            .delete(&owned[..take], &[], services.sink, services.owners);
        true
    }

    /// Trail along the movement vector: one curve of decals per tick at
    /// density >= 1, sparse distance-spaced drips below that.
    fn spawn_trail_splats(
        &mut self,
        update: &EntityUpdate,
        cfg: &SplatConfig,
        prev: &BleedState,
        state: &mut BleedState,
        services: &mut Services,
    ) {
        let severity = state.severity;
        let amount = splat_amount(cfg.trail_splat_density, severity);
        if amount == 0 {
            return;
        }
        let size = scaled_font_size(cfg.trail_splat_size, update.footprint, self.grid_size, severity);
        let glyphs = self.glyphs_for(&cfg.trail_splat_font);
        let color = blood_color((adapter_for(&self.system_id).creature_type)(update.data).as_deref());
        let lateral = (update.footprint.x + update.footprint.y) / 4.0 * cfg.splat_spread;

        if cfg.trail_splat_density >= 1.0 {
            let prims = generate_trail(
                &mut self.rng,
                prev.last_pos,
                update.pos,
                amount,
                lateral,
                &glyphs,
                size,
                services.metrics,
            );
            if let Some(record) = build_record(
                self.alloc_id(),
                SplatKind::Trail,
                None,
                prims,
                Self::style(&cfg.trail_splat_font, size, color),
                prev.last_pos,
                self.alloc_z(),
                update.timestamp,
                services.visibility,
            ) {
                self.history.stage(record);
            }
        } else {
            // drip mode: accumulate sub-grid distance, emit single splats at
            // spaced intervals
            let spacing = self.grid_size / amount as f32;
            let moved = distance(prev.last_pos, update.pos);
            let drips = state.drip.advance(moved, spacing);
            for _ in 0..drips {
                let prims = generate_cluster(
                    &mut self.rng,
                    1,
                    update.footprint * cfg.splat_spread,
                    &glyphs,
                    size,
                    services.metrics,
                );
                if let Some(record) = build_record(
                    self.alloc_id(),
                    SplatKind::Trail,
                    None,
                    prims,
                    Self::style(&cfg.trail_splat_font, size, color),
                    update.pos,
                    self.alloc_z(),
                    update.timestamp,
                    services.visibility,
                ) {
                    self.history.stage(record);
                }
            }
        }
    }

    /// The owner entity rotated; its token decals follow.
    pub fn entity_rotated(
        &mut self,
        entity_id: &str,
        degrees: f32,
        services: &mut Services,
    ) -> Result<(), SplatError> {
        self.ensure_active()?;
        if entity_id.is_empty() {
            return Err(SplatError::MissingRecordId);
        }
        if self.history.set_owner_rotation(entity_id, degrees) > 0 {
            services.owners.redraw_owner(entity_id);
            services.store.save_scene_log(&self.scene_id, self.history.log())?;
        }
        Ok(())
    }

    /// Entity left the scene; drop its accumulator
    pub fn entity_removed(&mut self, entity_id: &str) {
        self.bleed.remove(entity_id);
    }

    /// Diff the log against what has been rendered and replay the difference.
    ///
    /// A pointer behind the rendered mark, or a pending eviction reset, means
    /// history shrank; the replay pass rebuilds from zero in that case. An
    /// eviction can leave the pointer exactly where it was, so the pointer
    /// alone is not enough.
    pub fn render(&mut self, services: &mut Services) {
        let stop = self.history.log().pointer;
        if stop == self.rendered && !self.history.needs_full_replay() {
            return;
        }
        self.history
            .replay(self.rendered, stop, services.sink, services.owners);
        self.rendered = stop;
    }

    /// Walk history back `steps` and persist the shortened log
    pub fn undo(&mut self, steps: usize, services: &mut Services) -> Result<(), SplatError> {
        self.ensure_active()?;
        self.history.undo(steps, services.sink, services.owners);
        services.store.save_scene_log(&self.scene_id, self.history.log())?;
        Ok(())
    }

    /// Remove records by record id or owner id
    pub fn delete(
        &mut self,
        record_ids: &[u64],
        owner_ids: &[&str],
        services: &mut Services,
    ) -> Result<(), SplatError> {
        self.ensure_active()?;
        self.history
            .delete(record_ids, owner_ids, services.sink, services.owners);
        services.store.save_scene_log(&self.scene_id, self.history.log())?;
        Ok(())
    }

    /// Clear the scene's history and every drawn decal
    pub fn wipe(&mut self, services: &mut Services) -> Result<(), SplatError> {
        self.ensure_active()?;
        self.history.wipe(services.sink);
        self.rendered = 0;
        services.store.save_scene_log(&self.scene_id, self.history.log())?;
        Ok(())
    }
}
