//! Splat records - the persistable decal unit
//!
//! A record bundles one or more glyph placements with style and visibility
//! metadata. Primitives are stored in a record-local frame with non-negative
//! coordinates, so the whole decal repositions by translating `(x, y)` alone.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;
use crate::services::VisibilityQuery;

/// What surface a record decorates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplatKind {
    /// Stationary cluster on the scene floor
    Floor,
    /// Cluster tracking a moving owner entity
    Token,
    /// Chain following recent movement
    Trail,
}

/// Discrete opacity bucket assigned as records age toward eviction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlphaTier {
    #[default]
    Full,
    Faded,
    VeryFaded,
}

impl AlphaTier {
    /// Opacity multiplier for rendering
    pub fn alpha(&self) -> f32 {
        match self {
            AlphaTier::Full => 1.0,
            AlphaTier::Faded => 0.45,
            AlphaTier::VeryFaded => 0.2,
        }
    }
}

/// Horizontal text alignment for glyph drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Font and fill styling attached once at record creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    pub font_family: String,
    pub font_size: u32,
    /// CSS-style hex color
    pub fill_color: String,
    pub alignment: TextAlign,
}

/// One placed decal glyph, local to its parent record. Never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplatPrimitive {
    pub glyph: char,
    pub x: f32,
    pub y: f32,
    /// Rotation in degrees, [0, 360)
    pub rotation: f32,
    /// Measured glyph extents under the active style
    pub width: f32,
    pub height: f32,
}

/// The persistable decal unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplatRecord {
    /// Unique per scene
    pub id: u64,
    pub kind: SplatKind,
    /// Set when `kind == Token`; the entity this decal tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub primitives: Vec<SplatPrimitive>,
    pub style: StyleDescriptor,
    /// Negated minimum corner of the pre-alignment primitives
    pub offset: Vec2,
    /// World position of the decal origin
    pub x: f32,
    pub y: f32,
    /// Tight bounding box of the aligned primitives
    pub width: f32,
    pub height: f32,
    /// Flattened x,y pairs limiting where the decal is visible, in the same
    /// record-local frame as the primitives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_polygon: Option<Vec<f32>>,
    pub z_order: i32,
    #[serde(default)]
    pub alpha_tier: AlphaTier,
    #[serde(default)]
    pub rotation: f32,
    /// Host timestamp (ms) at creation
    pub created_at: f64,
}

/// Shift primitives into a record-local frame with non-negative coordinates.
///
/// Returns `(offset, width, height)` where `offset` is the negated minimum
/// corner of the input and width/height are the tight bounding box of the
/// shifted set. Re-applying to already-aligned input yields a zero offset and
/// unchanged dimensions.
pub fn align_primitives(primitives: &mut [SplatPrimitive]) -> (Vec2, f32, f32) {
    let mut bounds = Bounds::empty();
    for p in primitives.iter() {
        bounds.include(
            Vec2::new(p.x, p.y),
            Vec2::new(p.x + p.width, p.y + p.height),
        );
    }
    if bounds.is_empty() {
        return (Vec2::ZERO, 0.0, 0.0);
    }
    for p in primitives.iter_mut() {
        p.x -= bounds.min.x;
        p.y -= bounds.min.y;
    }
    let size = bounds.size();
    (-bounds.min, size.x, size.y)
}

/// Assemble a self-contained record from primitive candidates.
///
/// Floor and trail records fetch a visibility mask keyed on the world origin
/// and the bounding box's max dimension; the polygon is re-expressed in the
/// record-local frame. Token records skip the mask (computed at render time
/// against the owner's current sprite) and carry `owner_id` instead.
/// An empty primitive set yields `None`: an explicit no-op, not an error.
#[allow(clippy::too_many_arguments)]
pub fn build_record(
    id: u64,
    kind: SplatKind,
    owner_id: Option<String>,
    mut primitives: Vec<SplatPrimitive>,
    style: StyleDescriptor,
    origin: Vec2,
    z_order: i32,
    created_at: f64,
    visibility: &dyn VisibilityQuery,
) -> Option<SplatRecord> {
    if primitives.is_empty() {
        return None;
    }

    let (offset, width, height) = align_primitives(&mut primitives);

    let mask_polygon = if kind == SplatKind::Token {
        None
    } else {
        let radius = width.max(height);
        let raw = visibility.visibility_polygon(origin, radius);
        if raw.len() < 6 {
            // fewer than 3 vertices: treat as "no mask", draw unmasked
            if !raw.is_empty() {
                log::debug!("degenerate visibility polygon ({} values), ignoring", raw.len());
            }
            None
        } else {
            Some(
                raw.chunks_exact(2)
                    .flat_map(|pair| [pair[0] + offset.x, pair[1] + offset.y])
                    .collect(),
            )
        }
    };

    Some(SplatRecord {
        id,
        kind,
        owner_id,
        primitives,
        style,
        offset,
        x: origin.x,
        y: origin.y,
        width,
        height,
        mask_polygon,
        z_order,
        alpha_tier: AlphaTier::Full,
        rotation: 0.0,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::NoVisibility;
    use proptest::prelude::*;

    fn prim(x: f32, y: f32, w: f32, h: f32) -> SplatPrimitive {
        SplatPrimitive {
            glyph: '*',
            x,
            y,
            rotation: 0.0,
            width: w,
            height: h,
        }
    }

    fn style() -> StyleDescriptor {
        StyleDescriptor {
            font_family: "splatter".into(),
            font_size: 24,
            fill_color: "#8a0707".into(),
            alignment: TextAlign::Center,
        }
    }

    #[test]
    fn test_align_shifts_to_origin() {
        let mut prims = vec![prim(-10.0, 5.0, 4.0, 4.0), prim(3.0, -2.0, 6.0, 6.0)];
        let (offset, w, h) = align_primitives(&mut prims);
        assert_eq!(offset, Vec2::new(10.0, 2.0));
        // x spans [-10, 9] -> width 19; y spans [-2, 9] -> height 11
        assert_eq!(w, 19.0);
        assert_eq!(h, 11.0);
        assert_eq!(prims[0].x, 0.0);
        assert_eq!(prims[1].y, 0.0);
    }

    #[test]
    fn test_align_idempotent() {
        let mut prims = vec![prim(-7.0, 12.0, 5.0, 3.0), prim(8.0, -4.0, 2.0, 9.0)];
        let (_, w1, h1) = align_primitives(&mut prims);
        let before = prims.clone();
        let (offset2, w2, h2) = align_primitives(&mut prims);
        assert_eq!(offset2, Vec2::ZERO);
        assert_eq!((w1, h1), (w2, h2));
        assert_eq!(prims, before);
    }

    #[test]
    fn test_align_empty() {
        let mut prims: Vec<SplatPrimitive> = Vec::new();
        assert_eq!(align_primitives(&mut prims), (Vec2::ZERO, 0.0, 0.0));
    }

    #[test]
    fn test_build_record_no_primitives_is_noop() {
        let rec = build_record(
            1,
            SplatKind::Floor,
            None,
            Vec::new(),
            style(),
            Vec2::ZERO,
            0,
            0.0,
            &NoVisibility,
        );
        assert!(rec.is_none());
    }

    #[test]
    fn test_build_token_record_skips_mask() {
        let rec = build_record(
            2,
            SplatKind::Token,
            Some("tok-1".into()),
            vec![prim(0.0, 0.0, 4.0, 4.0)],
            style(),
            Vec2::new(50.0, 60.0),
            0,
            0.0,
            &NoVisibility,
        )
        .unwrap();
        assert!(rec.mask_polygon.is_none());
        assert_eq!(rec.owner_id.as_deref(), Some("tok-1"));
        assert_eq!((rec.x, rec.y), (50.0, 60.0));
    }

    #[test]
    fn test_build_record_reoffsets_mask() {
        struct Square;
        impl VisibilityQuery for Square {
            fn visibility_polygon(&self, _origin: Vec2, r: f32) -> Vec<f32> {
                vec![-r, -r, r, -r, r, r, -r, r]
            }
        }
        let rec = build_record(
            3,
            SplatKind::Floor,
            None,
            vec![prim(-5.0, -5.0, 10.0, 10.0)],
            style(),
            Vec2::ZERO,
            0,
            0.0,
            &Square,
        )
        .unwrap();
        // offset is (5, 5); every mask vertex shifts with the primitives
        let mask = rec.mask_polygon.unwrap();
        assert_eq!(mask[0], -10.0 + 5.0);
        assert_eq!(mask[1], -10.0 + 5.0);
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let rec = build_record(
            4,
            SplatKind::Floor,
            None,
            vec![prim(1.0, 2.0, 3.0, 4.0), prim(-2.0, 0.0, 5.0, 5.0)],
            style(),
            Vec2::new(10.0, 20.0),
            7,
            1234.5,
            &NoVisibility,
        )
        .unwrap();
        let json = serde_json::to_string(&rec).unwrap();
        let back: SplatRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }

    proptest! {
        #[test]
        fn prop_align_leaves_non_negative_coords(
            coords in proptest::collection::vec((-1000.0f32..1000.0, -1000.0f32..1000.0, 0.1f32..50.0), 1..20)
        ) {
            let mut prims: Vec<SplatPrimitive> =
                coords.iter().map(|&(x, y, s)| prim(x, y, s, s)).collect();
            let (_, w, h) = align_primitives(&mut prims);
            for p in &prims {
                prop_assert!(p.x >= 0.0 && p.y >= 0.0);
                prop_assert!(p.x + p.width <= w + 1e-3);
                prop_assert!(p.y + p.height <= h + 1e-3);
            }
        }
    }
}
