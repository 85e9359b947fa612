//! Pure geometry kernel for splat placement
//!
//! Everything here is stateless: direction vectors, quadratic Bézier
//! evaluation, normal-distributed sampling, and bounding-box accumulation.
//! Randomness always comes in through the caller's seeded RNG.

use glam::Vec2;
use rand::Rng;

/// Retry budget for [`normal_sample`] before falling back to clamping
const NORMAL_SAMPLE_RETRIES: u32 = 100;

/// Per-axis sign of movement between two positions.
///
/// Each component is -1.0, 0.0, or +1.0 depending on the delta on that axis.
#[inline]
pub fn direction_sign(last: Vec2, current: Vec2) -> Vec2 {
    Vec2::new(axis_sign(current.x - last.x), axis_sign(current.y - last.y))
}

#[inline]
fn axis_sign(delta: f32) -> f32 {
    if delta > 0.0 {
        1.0
    } else if delta < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Evaluate a quadratic Bézier curve at `t`, snapped to whole pixels.
///
/// Callers must clamp `t` to [0,1]; values outside the interval extrapolate.
pub fn point_on_curve(p1: Vec2, ctrl: Vec2, p2: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    (p1 * (u * u) + ctrl * (2.0 * u * t) + p2 * (t * t)).round()
}

/// Tangent of a quadratic Bézier curve at `t` (unrounded).
///
/// Used to orient glyphs along a trail.
pub fn derivative_on_curve(p1: Vec2, ctrl: Vec2, p2: Vec2, t: f32) -> Vec2 {
    (ctrl - p1) * (2.0 * (1.0 - t)) + (p2 - ctrl) * (2.0 * t)
}

/// Euclidean distance between two points
#[inline]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

/// Normal-ish sample in the open interval (0,1).
///
/// Box–Muller draw mapped to `0.5 ± z/10`; draws landing outside (0,1) are
/// retried with a bounded budget, after which the last draw is clamped into
/// range. The clamp makes termination unconditional rather than merely
/// overwhelmingly likely.
pub fn normal_sample<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let mut n = 0.5;
    for _ in 0..NORMAL_SAMPLE_RETRIES {
        let u: f32 = rng.random();
        let v: f32 = rng.random();
        if u <= f32::EPSILON {
            continue; // ln(0) is -inf
        }
        let z = (-2.0 * u.ln()).sqrt() * (std::f32::consts::TAU * v).cos();
        n = z / 10.0 + 0.5;
        if n > 0.0 && n < 1.0 {
            return n;
        }
    }
    log::warn!("normal_sample exhausted retry budget, clamping");
    n.clamp(f32::EPSILON, 1.0 - f32::EPSILON)
}

/// Min/max accumulator for tight bounding boxes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// An empty accumulator; including any rect makes it valid
    pub fn empty() -> Self {
        Self {
            min: Vec2::splat(f32::MAX),
            max: Vec2::splat(f32::MIN),
        }
    }

    /// Grow to include an axis-aligned rect given by its min/max corners
    pub fn include(&mut self, min: Vec2, max: Vec2) {
        self.min = self.min.min(min);
        self.max = self.max.max(max);
    }

    /// True if nothing has been included yet
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Width and height of the accumulated box
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}
