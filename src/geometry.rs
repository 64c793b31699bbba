//! Geometric intersection tests for placed cargo.
//!
//! Collision checks are exact per shape pair (box-box, box-cylinder,
//! cylinder-cylinder): cylinders are tested against their circular
//! cross-section, not a bounding box, so diagonal neighbours whose corners
//! would overlap as boxes are not falsely reported.
//!
//! All tests are strict: face or edge contact does not count as a collision,
//! which keeps items packed flush by the planner margin out of the collision
//! set.

use crate::model::{CargoItem, Shape};
use crate::types::{Vec3, overlap_1d};

/// Checks whether two placed cargo items overlap as solids.
///
/// # Parameters
/// * `a` - First placed item
/// * `b` - Second placed item
///
/// # Returns
/// `true` if the solids intersect, otherwise `false`. Symmetric in its
/// arguments.
pub fn intersects(a: &CargoItem, b: &CargoItem) -> bool {
    match (a.shape, b.shape) {
        (Shape::Box { .. }, Shape::Box { .. }) => a.aabb().intersects(&b.aabb()),
        (Shape::Cylinder { diameter: da, .. }, Shape::Cylinder { diameter: db, .. }) => {
            vertical_overlap(a, b) && a.position.distance_xz(&b.position) < (da + db) / 2.0
        }
        (Shape::Box { l, w, .. }, Shape::Cylinder { diameter, .. }) => {
            vertical_overlap(a, b)
                && circle_intersects_rect_xz(b.position, diameter / 2.0, a.position, l, w)
        }
        (Shape::Cylinder { diameter, .. }, Shape::Box { l, w, .. }) => {
            vertical_overlap(a, b)
                && circle_intersects_rect_xz(a.position, diameter / 2.0, b.position, l, w)
        }
    }
}

/// Strict overlap of the two items' y-extents.
fn vertical_overlap(a: &CargoItem, b: &CargoItem) -> bool {
    let ha = a.shape.footprint().y / 2.0;
    let hb = b.shape.footprint().y / 2.0;
    overlap_1d(
        a.position.y - ha,
        a.position.y + ha,
        b.position.y - hb,
        b.position.y + hb,
    ) > 0.0
}

/// Tests a circle against an axis-aligned rectangle in the xz-plane.
///
/// Clamps the circle center onto the rectangle and compares the residual
/// distance against the radius (strictly).
fn circle_intersects_rect_xz(
    circle_center: Vec3,
    radius: f64,
    rect_center: Vec3,
    rect_l: f64,
    rect_w: f64,
) -> bool {
    let nearest_x = circle_center
        .x
        .clamp(rect_center.x - rect_l / 2.0, rect_center.x + rect_l / 2.0);
    let nearest_z = circle_center
        .z
        .clamp(rect_center.z - rect_w / 2.0, rect_center.z + rect_w / 2.0);

    let dx = circle_center.x - nearest_x;
    let dz = circle_center.z - nearest_z;
    dx * dx + dz * dz < radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(id: u64, pos: (f64, f64, f64), dims: (f64, f64, f64)) -> CargoItem {
        CargoItem {
            id,
            shape: Shape::Box {
                l: dims.0,
                w: dims.1,
                h: dims.2,
            },
            position: Vec3::from_tuple(pos),
            color: "#8B4513".to_string(),
        }
    }

    fn cylinder(id: u64, pos: (f64, f64, f64), diameter: f64, height: f64) -> CargoItem {
        CargoItem {
            id,
            shape: Shape::Cylinder { diameter, height },
            position: Vec3::from_tuple(pos),
            color: "#8B4513".to_string(),
        }
    }

    #[test]
    fn coincident_boxes_intersect() {
        let a = boxed(1, (0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        let b = boxed(2, (0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        assert!(intersects(&a, &b));
        assert!(intersects(&b, &a));
    }

    #[test]
    fn distant_boxes_do_not_intersect() {
        let a = boxed(1, (0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        let b = boxed(2, (10.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        assert!(!intersects(&a, &b));
    }

    #[test]
    fn flush_boxes_do_not_intersect() {
        // Faces exactly in contact, as the planner never leaves them (it
        // always adds a margin), must not count as a collision.
        let a = boxed(1, (0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        let b = boxed(2, (1.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        assert!(!intersects(&a, &b));
    }

    #[test]
    fn cylinders_use_circular_cross_section() {
        // Corner-to-corner diagonal placement: bounding boxes overlap, the
        // circular cross-sections do not.
        let a = cylinder(1, (0.0, 0.0, 0.0), 1.0, 1.0);
        let b = cylinder(2, (0.8, 0.0, 0.8), 1.0, 1.0);
        assert!(
            a.aabb().intersects(&b.aabb()),
            "broad phase must flag the pair"
        );
        assert!(!intersects(&a, &b), "narrow phase must clear the pair");

        let c = cylinder(3, (0.5, 0.0, 0.5), 1.0, 1.0);
        assert!(intersects(&a, &c));
    }

    #[test]
    fn stacked_cylinders_do_not_intersect() {
        let a = cylinder(1, (0.0, 0.5, 0.0), 1.0, 1.0);
        let b = cylinder(2, (0.0, 1.5, 0.0), 1.0, 1.0);
        assert!(!intersects(&a, &b));
    }

    #[test]
    fn box_cylinder_corner_miss() {
        // The cylinder sits diagonally off the box corner: close enough for
        // the bounding boxes to touch territory, but the circle misses.
        let b = boxed(1, (0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        let c = cylinder(2, (0.9, 0.0, 0.9), 1.0, 1.0);
        assert!(!intersects(&b, &c));
        assert!(!intersects(&c, &b));
    }

    #[test]
    fn box_cylinder_overlap_hits() {
        let b = boxed(1, (0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        let c = cylinder(2, (0.7, 0.0, 0.0), 1.0, 1.0);
        assert!(intersects(&b, &c));
        assert!(intersects(&c, &b));
    }

    #[test]
    fn box_cylinder_center_inside_box() {
        let b = boxed(1, (0.0, 0.0, 0.0), (4.0, 4.0, 4.0));
        let c = cylinder(2, (0.5, 0.0, -0.5), 1.0, 1.0);
        assert!(intersects(&b, &c));
    }
}
