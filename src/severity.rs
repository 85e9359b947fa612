//! Damage and healing classification
//!
//! Converts raw health deltas into a signed severity scalar:
//! - `-1` — fully healed; clear any residual decals
//! - negative — healing; drives decal removal proportional to magnitude
//! - `0` — no effect (hit too small, still above the bloodied threshold)
//! - `>= 1` — qualifying wound; drives decal creation scaled by severity

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::layout::DripAccumulator;

/// Thresholds governing when a hit draws blood
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    /// HP fraction below which an entity counts as bloodied, [0,1]
    pub health_threshold: f32,
    /// Minimum fractional damage worth a splat, [0,1]
    pub damage_threshold: f32,
    /// Severity multiplier applied on a killing blow, >= 1
    pub death_multiplier: f32,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            health_threshold: 0.75,
            damage_threshold: 0.0,
            death_multiplier: 2.0,
        }
    }
}

/// Classify a health change into a signed severity.
///
/// Order matters: full health wins over everything, then unchanged HP, then
/// healing, then the two no-op damage gates, then the qualifying hit.
pub fn classify(current_hp: f32, last_hp: f32, max_hp: f32, t: &SeverityThresholds) -> f32 {
    if max_hp <= 0.0 {
        // missing or malformed health data; upstream already logged it
        return 0.0;
    }
    if current_hp >= max_hp {
        return -1.0;
    }
    if current_hp == last_hp {
        return 0.0;
    }
    if current_hp > last_hp {
        // healing severity scales inversely with how far below the
        // bloodied threshold the entity sits
        let threshold = t.health_threshold.max(f32::EPSILON);
        return -(current_hp / max_hp) / threshold;
    }
    if current_hp / max_hp > t.health_threshold {
        return 0.0;
    }
    let fractional = (last_hp - current_hp) / max_hp;
    if fractional < t.damage_threshold {
        return 0.0;
    }
    let death = if current_hp <= 0.0 { t.death_multiplier } else { 1.0 };
    1.0 + (fractional / 2.0) * death
}

/// Ephemeral classification result, consumed immediately by layout
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityEvent {
    pub entity_id: String,
    pub severity: f32,
    /// Per-axis movement sign, present only when the position changed
    pub direction: Option<Vec2>,
    pub timestamp: f64,
}

/// Per-entity accumulator tracking the last observed position and health.
///
/// One instance per live entity; created on first observation, discarded
/// when the entity leaves the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BleedState {
    pub last_pos: Vec2,
    pub last_hp: f32,
    pub max_hp: f32,
    /// Highest qualifying severity since the last qualifying heal
    pub severity: f32,
    /// Sub-grid movement distance carried between drip emissions
    #[serde(default)]
    pub drip: DripAccumulator,
}

impl BleedState {
    pub fn new(pos: Vec2, hp: f32, max_hp: f32) -> Self {
        Self {
            last_pos: pos,
            last_hp: hp,
            max_hp,
            severity: 0.0,
            drip: DripAccumulator::default(),
        }
    }

    /// Fold one observed update into the accumulator.
    ///
    /// The bleeding severity only ratchets upward; a qualifying heal
    /// (negative severity) resets it to zero and drops any carried drip
    /// distance.
    pub fn observe(&mut self, pos: Vec2, hp: f32, max_hp: f32, severity: f32) {
        self.last_pos = pos;
        self.last_hp = hp;
        self.max_hp = max_hp;
        if severity < 0.0 {
            self.severity = 0.0;
            self.drip.reset();
        } else {
            self.severity = self.severity.max(severity);
        }
    }
}
