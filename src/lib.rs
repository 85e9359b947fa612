//! Splatkit - procedural blood splat decals for 2D scenes
//!
//! Reacts to combat and movement events by generating, positioning, and
//! pooling decorative decal records, replayable against a host renderer.
//!
//! Core modules:
//! - `geometry`: Pure math (direction signs, quadratic curves, normal sampling)
//! - `severity`: Damage/healing classification and per-entity bleed state
//! - `layout`: Procedural cluster, trail, and drip placement
//! - `record`: Persistable splat records and bounding-box alignment
//! - `history`: Bounded FIFO event log with fade tiers, undo, and replay
//! - `scene`: Per-scene context wiring the pipeline together
//! - `config`: Settings with layered entity/scene/global overrides
//! - `services`: Boundary traits for visibility, persistence, and rendering
//! - `systems`: Per-ruleset entity data accessors and blood colors
//!
//! The pipeline is deterministic: all randomness flows through a seeded RNG
//! owned by the scene context, so the same seed and event sequence always
//! produces the same decals.

pub mod config;
pub mod error;
pub mod geometry;
pub mod history;
pub mod layout;
pub mod record;
pub mod scene;
pub mod services;
pub mod severity;
pub mod systems;

pub use config::{ConfigStack, SplatConfig, SplatConfigPatch};
pub use error::SplatError;
pub use history::{HistoryLog, HistoryManager};
pub use record::{AlphaTier, SplatKind, SplatPrimitive, SplatRecord, StyleDescriptor};
pub use scene::{EntityUpdate, SceneSplats, Services};
pub use severity::{BleedState, SeverityEvent, SeverityThresholds};
