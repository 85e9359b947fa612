//! Procedural splat layout
//!
//! Three layout modes share one skeleton: pick glyphs, jitter positions with
//! normal-distributed noise, randomize rotation. Clusters (floor and token
//! splats) jitter around a stationary origin; trails sample a quadratic curve
//! along the movement vector; sparse trails ("drips") accumulate sub-grid
//! distance and emit single splats at spaced intervals.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::{derivative_on_curve, normal_sample, point_on_curve};
use crate::record::SplatPrimitive;
use crate::services::FontMetrics;

/// Number of primitives a severity event produces at a given density
#[inline]
pub fn splat_amount(density: f32, severity: f32) -> usize {
    (density * severity).round().max(0.0) as usize
}

/// Decal font size under the sizing rule: bigger entities and bigger hits
/// produce visibly larger glyphs.
///
/// `base * ((footprint.x + footprint.y) / grid / 2) * severity`, rounded,
/// floored at 1.
pub fn scaled_font_size(base: u32, footprint: Vec2, grid_size: f32, severity: f32) -> u32 {
    let scale = (footprint.x + footprint.y) / grid_size / 2.0;
    ((base as f32) * scale * severity).round().max(1.0) as u32
}

fn random_glyph<R: Rng + ?Sized>(rng: &mut R, glyphs: &[char]) -> char {
    glyphs[rng.random_range(0..glyphs.len())]
}

/// Generate a stationary cluster of `amount` primitives jittered around the
/// local origin.
///
/// Positions follow `normal_sample() * spread - spread/2 - glyph_extent/2`
/// per axis, so the cluster centers on the origin with normal falloff.
/// `amount == 0` or an empty glyph set yields no primitives.
pub fn generate_cluster<R: Rng + ?Sized>(
    rng: &mut R,
    amount: usize,
    spread: Vec2,
    glyphs: &[char],
    font_size: u32,
    metrics: &dyn FontMetrics,
) -> Vec<SplatPrimitive> {
    if glyphs.is_empty() {
        log::warn!("cluster layout requested with an empty glyph set");
        return Vec::new();
    }
    let mut out = Vec::with_capacity(amount);
    for _ in 0..amount {
        let glyph = random_glyph(rng, glyphs);
        let (width, height) = metrics.measure(glyph, font_size);
        out.push(SplatPrimitive {
            glyph,
            x: normal_sample(rng) * spread.x - spread.x / 2.0 - width / 2.0,
            y: normal_sample(rng) * spread.y - spread.y / 2.0 - height / 2.0,
            rotation: rng.random_range(0.0..360.0),
            width,
            height,
        });
    }
    out
}

/// Generate a trail of `amount` primitives along the movement from `from` to
/// `to`.
///
/// The curve's control point sits laterally off the straight-line midpoint by
/// a normal-sampled distance; the endpoint gets a small extra lateral nudge
/// so consecutive trails never read as perfectly straight. Primitives are
/// placed at evenly spaced `t = 1/amount .. 1`, oriented along the curve
/// tangent.
#[allow(clippy::too_many_arguments)]
pub fn generate_trail<R: Rng + ?Sized>(
    rng: &mut R,
    from: Vec2,
    to: Vec2,
    amount: usize,
    lateral_spread: f32,
    glyphs: &[char],
    font_size: u32,
    metrics: &dyn FontMetrics,
) -> Vec<SplatPrimitive> {
    if amount == 0 {
        return Vec::new();
    }
    if glyphs.is_empty() {
        log::warn!("trail layout requested with an empty glyph set");
        return Vec::new();
    }

    let dir = (to - from).normalize_or_zero();
    let lateral = Vec2::new(-dir.y, dir.x);
    let mid = (from + to) / 2.0;
    let ctrl = mid + lateral * ((normal_sample(rng) - 0.5) * 2.0 * lateral_spread);
    let end = to + lateral * ((normal_sample(rng) - 0.5) * lateral_spread);

    let mut out = Vec::with_capacity(amount);
    for i in 1..=amount {
        let t = i as f32 / amount as f32;
        let p = point_on_curve(from, ctrl, end, t);
        let tangent = derivative_on_curve(from, ctrl, end, t);
        let glyph = random_glyph(rng, glyphs);
        let (width, height) = metrics.measure(glyph, font_size);
        out.push(SplatPrimitive {
            glyph,
            x: p.x - from.x - width / 2.0,
            y: p.y - from.y - height / 2.0,
            rotation: tangent.y.atan2(tangent.x).to_degrees().rem_euclid(360.0),
            width,
            height,
        });
    }
    out
}

/// Sub-grid movement accumulator for sparse drip trails (density < 1).
///
/// Instead of one decal per tick, movement distance accumulates across ticks
/// and a single floor-style splat is emitted each time the running total
/// crosses the spacing threshold, carrying the remainder forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DripAccumulator {
    /// Distance carried over from previous ticks
    pub carried: f32,
}

impl DripAccumulator {
    /// Add this tick's movement distance; returns how many drips to emit.
    pub fn advance(&mut self, moved: f32, spacing: f32) -> usize {
        if spacing <= 0.0 || moved < 0.0 {
            return 0;
        }
        self.carried += moved;
        let emitted = (self.carried / spacing).floor() as usize;
        self.carried -= emitted as f32 * spacing;
        emitted
    }

    pub fn reset(&mut self) {
        self.carried = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SquareMetrics;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const GLYPHS: &[char] = &['a', 'b', 'c', 'd'];

    #[test]
    fn test_splat_amount_rounding() {
        assert_eq!(splat_amount(4.0, 1.5), 6);
        assert_eq!(splat_amount(4.0, 0.0), 0);
        assert_eq!(splat_amount(0.0, 2.0), 0);
        assert_eq!(splat_amount(1.0, 0.4), 0);
        assert_eq!(splat_amount(1.0, 0.5), 1);
    }

    #[test]
    fn test_scaled_font_size() {
        // one-grid-square entity at severity 1 keeps the base size
        let footprint = Vec2::new(100.0, 100.0);
        assert_eq!(scaled_font_size(24, footprint, 100.0, 1.0), 24);
        // double severity doubles the size
        assert_eq!(scaled_font_size(24, footprint, 100.0, 2.0), 48);
        // never collapses to zero
        assert_eq!(scaled_font_size(24, Vec2::new(1.0, 1.0), 100.0, 0.1), 1);
    }

    #[test]
    fn test_cluster_zero_amount_is_noop() {
        let mut rng = Pcg32::seed_from_u64(1);
        let prims = generate_cluster(&mut rng, 0, Vec2::splat(50.0), GLYPHS, 24, &SquareMetrics);
        assert!(prims.is_empty());
    }

    #[test]
    fn test_cluster_count_and_bounds() {
        let mut rng = Pcg32::seed_from_u64(99);
        let spread = Vec2::new(80.0, 60.0);
        let prims = generate_cluster(&mut rng, 6, spread, GLYPHS, 24, &SquareMetrics);
        assert_eq!(prims.len(), 6);
        for p in &prims {
            // normal_sample is in (0,1), so centers stay within spread/2 of origin
            let cx = p.x + p.width / 2.0;
            let cy = p.y + p.height / 2.0;
            assert!(cx.abs() <= spread.x / 2.0, "center x {cx} outside spread");
            assert!(cy.abs() <= spread.y / 2.0, "center y {cy} outside spread");
            assert!((0.0..360.0).contains(&p.rotation));
            assert!(GLYPHS.contains(&p.glyph));
        }
    }

    #[test]
    fn test_cluster_empty_glyphs_is_noop() {
        let mut rng = Pcg32::seed_from_u64(1);
        let prims = generate_cluster(&mut rng, 5, Vec2::splat(50.0), &[], 24, &SquareMetrics);
        assert!(prims.is_empty());
    }

    #[test]
    fn test_trail_count_and_progression() {
        let mut rng = Pcg32::seed_from_u64(7);
        let from = Vec2::new(0.0, 0.0);
        let to = Vec2::new(200.0, 0.0);
        let prims = generate_trail(&mut rng, from, to, 5, 30.0, GLYPHS, 16, &SquareMetrics);
        assert_eq!(prims.len(), 5);
        // primitives advance along the movement axis
        for pair in prims.windows(2) {
            assert!(pair[1].x > pair[0].x, "trail not monotonic along x");
        }
        // lateral wobble stays within the curve's reach
        for p in &prims {
            assert!(p.y.abs() <= 30.0 + 16.0, "trail strayed too far laterally");
        }
    }

    #[test]
    fn test_trail_zero_amount_is_noop() {
        let mut rng = Pcg32::seed_from_u64(7);
        let prims = generate_trail(
            &mut rng,
            Vec2::ZERO,
            Vec2::new(100.0, 0.0),
            0,
            30.0,
            GLYPHS,
            16,
            &SquareMetrics,
        );
        assert!(prims.is_empty());
    }

    #[test]
    fn test_trail_deterministic_per_seed() {
        let make_trail = |seed| {
            let mut rng = Pcg32::seed_from_u64(seed);
            generate_trail(
                &mut rng,
                Vec2::ZERO,
                Vec2::new(120.0, 80.0),
                4,
                25.0,
                GLYPHS,
                16,
                &SquareMetrics,
            )
        };
        assert_eq!(make_trail(5), make_trail(5));
        assert_ne!(make_trail(5), make_trail(6));
    }

    #[test]
    fn test_drip_accumulator_carries_remainder() {
        let mut drip = DripAccumulator::default();
        // spacing 100: three 40-unit moves emit one drip with 20 carried
        assert_eq!(drip.advance(40.0, 100.0), 0);
        assert_eq!(drip.advance(40.0, 100.0), 0);
        assert_eq!(drip.advance(40.0, 100.0), 1);
        assert!((drip.carried - 20.0).abs() < 1e-4);
        // a long move can emit several at once
        assert_eq!(drip.advance(280.0, 100.0), 3);
    }

    #[test]
    fn test_drip_accumulator_guards_bad_spacing() {
        let mut drip = DripAccumulator::default();
        assert_eq!(drip.advance(50.0, 0.0), 0);
        assert_eq!(drip.carried, 0.0);
    }
}
