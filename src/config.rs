//! Engine configuration and layered overrides
//!
//! Options match the host-facing settings surface. Overrides resolve through
//! an explicit, fixed-order stack (entity patch, then scene patch, then
//! global defaults) rather than anything reflective.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::severity::SeverityThresholds;

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplatConfig {
    // === Fonts ===
    pub floor_splat_font: String,
    pub token_splat_font: String,
    pub trail_splat_font: String,

    // === Base glyph sizes (pixels) ===
    pub floor_splat_size: u32,
    pub token_splat_size: u32,
    pub trail_splat_size: u32,

    // === Densities (decals per severity unit) ===
    pub floor_splat_density: f32,
    pub token_splat_density: f32,
    pub trail_splat_density: f32,

    /// Fraction of the entity footprint used as jitter spread
    pub splat_spread: f32,

    // === Severity thresholds ===
    /// HP fraction below which an entity counts as bloodied, [0,1]
    pub health_threshold: f32,
    /// Minimum fractional damage worth a splat, [0,1]
    pub damage_threshold: f32,
    /// Severity multiplier on a killing blow, >= 1
    pub death_multiplier: f32,

    /// History capacity per scene; insertion beyond it evicts from the head
    pub scene_splat_pool_size: usize,
}

impl Default for SplatConfig {
    fn default() -> Self {
        Self {
            floor_splat_font: "splatter".into(),
            token_splat_font: "splatter".into(),
            trail_splat_font: "splatter".into(),

            floor_splat_size: 50,
            token_splat_size: 30,
            trail_splat_size: 30,

            floor_splat_density: 2.0,
            token_splat_density: 2.0,
            trail_splat_density: 1.0,

            splat_spread: 0.8,

            health_threshold: 0.75,
            damage_threshold: 0.0,
            death_multiplier: 2.0,

            scene_splat_pool_size: 50,
        }
    }
}

impl SplatConfig {
    /// The classifier inputs carried by this config
    pub fn thresholds(&self) -> SeverityThresholds {
        SeverityThresholds {
            health_threshold: self.health_threshold,
            damage_threshold: self.damage_threshold,
            death_multiplier: self.death_multiplier,
        }
    }
}

/// Partial override; `None` fields fall through to the next layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplatConfigPatch {
    pub floor_splat_font: Option<String>,
    pub token_splat_font: Option<String>,
    pub trail_splat_font: Option<String>,
    pub floor_splat_size: Option<u32>,
    pub token_splat_size: Option<u32>,
    pub trail_splat_size: Option<u32>,
    pub floor_splat_density: Option<f32>,
    pub token_splat_density: Option<f32>,
    pub trail_splat_density: Option<f32>,
    pub splat_spread: Option<f32>,
    pub health_threshold: Option<f32>,
    pub damage_threshold: Option<f32>,
    pub death_multiplier: Option<f32>,
    pub scene_splat_pool_size: Option<usize>,
}

impl SplatConfigPatch {
    fn apply(&self, base: &mut SplatConfig) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = &self.$field {
                    base.$field = v.clone();
                })*
            };
        }
        merge!(
            floor_splat_font,
            token_splat_font,
            trail_splat_font,
            floor_splat_size,
            token_splat_size,
            trail_splat_size,
            floor_splat_density,
            token_splat_density,
            trail_splat_density,
            splat_spread,
            health_threshold,
            damage_threshold,
            death_multiplier,
            scene_splat_pool_size,
        );
    }
}

/// Fixed-order override resolution: global defaults, then the scene patch,
/// then the entity patch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigStack {
    pub global: SplatConfig,
    pub scene: Option<SplatConfigPatch>,
    pub entities: HashMap<String, SplatConfigPatch>,
}

impl ConfigStack {
    pub fn new(global: SplatConfig) -> Self {
        Self {
            global,
            scene: None,
            entities: HashMap::new(),
        }
    }

    /// Resolve the effective config for an entity (or the scene itself when
    /// no entity is in play)
    pub fn resolve(&self, entity_id: Option<&str>) -> SplatConfig {
        let mut cfg = self.global.clone();
        if let Some(patch) = &self.scene {
            patch.apply(&mut cfg);
        }
        if let Some(id) = entity_id
            && let Some(patch) = self.entities.get(id)
        {
            patch.apply(&mut cfg);
        }
        cfg
    }

    pub fn set_entity_patch(&mut self, entity_id: &str, patch: SplatConfigPatch) {
        self.entities.insert(entity_id.to_string(), patch);
    }

    pub fn clear_entity_patch(&mut self, entity_id: &str) {
        self.entities.remove(entity_id);
    }
}
