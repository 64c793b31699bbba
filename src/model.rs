//! Data model for the stowage simulation.
//!
//! This module defines the fundamental structures of the loading core:
//! - `Shape`: the closed set of cargo geometries (box or cylinder)
//! - `CargoItem`: one placed, individually addressable unit of freight
//! - `Batch`: a pending, not-yet-placed group of identical cargo units
//! - `Container`: the rectangular loading volume
//! - `Pallet`: the flat base units distributed across the container floor

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{Aabb, Vec3};

/// Validation error for cargo and container data.
#[derive(Debug, Clone)]
pub enum ValidationError {
    InvalidDimension(String),
    InvalidQuantity(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidDimension(msg) => write!(f, "Invalid dimension: {}", msg),
            ValidationError::InvalidQuantity(msg) => write!(f, "Invalid quantity: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Helper function to validate a single dimension.
fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Cargo geometry, as a closed set of shape kinds.
///
/// Each kind carries its own dimension fields and its own intersection math;
/// the per-kind geometry functions live here and in the `geometry` module.
///
/// All dimensions are in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Rectangular box: length (x), width (z), height (y).
    Box { l: f64, w: f64, h: f64 },
    /// Upright cylinder: diameter in the xz-plane, height along y.
    Cylinder { diameter: f64, height: f64 },
}

impl Shape {
    /// Validates that every dimension is positive and finite.
    ///
    /// Runs before any placement attempt; a shape that fails here is
    /// rejected outright and never reaches the planner.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match *self {
            Shape::Box { l, w, h } => {
                validate_dimension(l, "Length")?;
                validate_dimension(w, "Width")?;
                validate_dimension(h, "Height")?;
            }
            Shape::Cylinder { diameter, height } => {
                validate_dimension(diameter, "Diameter")?;
                validate_dimension(height, "Height")?;
            }
        }
        Ok(())
    }

    /// Axis-aligned extent of the shape: x = row axis, y = up, z = depth.
    ///
    /// For cylinders this is the square prism around the circular
    /// cross-section; the planner steps the cursor by this footprint.
    #[inline]
    pub fn footprint(&self) -> Vec3 {
        match *self {
            Shape::Box { l, w, h } => Vec3::new(l, h, w),
            Shape::Cylinder { diameter, height } => Vec3::new(diameter, height, diameter),
        }
    }

    /// Exact solid volume.
    #[inline]
    pub fn volume(&self) -> f64 {
        match *self {
            Shape::Box { l, w, h } => l * w * h,
            Shape::Cylinder { diameter, height } => {
                std::f64::consts::PI * (diameter / 2.0).powi(2) * height
            }
        }
    }
}

/// A placed unit of freight.
///
/// Shape dimensions are immutable after creation; only the position changes
/// (manual move) until the item is deleted. The collision flag is *not*
/// stored here; it is recomputed by the auditor after every mutation.
#[derive(Clone, Debug)]
pub struct CargoItem {
    /// Session-unique identifier, monotonically assigned, never reused.
    pub id: u64,
    pub shape: Shape,
    /// Center of the solid, in container coordinates.
    pub position: Vec3,
    /// Display color as passed in by the caller (hex string).
    pub color: String,
}

impl CargoItem {
    /// Bounding box of the item, used by the broad-phase collision filter.
    #[inline]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_dims(self.position, self.shape.footprint())
    }
}

/// A pending request to place `qty` identical cargo units.
///
/// Batches live in an ordered queue; insertion order is placement priority.
#[derive(Clone, Debug)]
pub struct Batch {
    pub id: u64,
    pub shape: Shape,
    pub qty: u32,
    pub color: String,
}

impl Batch {
    /// Creates a new batch after validating the shape.
    ///
    /// Zero-quantity batches are allowed; the planner treats them as no-ops.
    pub fn new(id: u64, shape: Shape, qty: u32, color: String) -> Result<Self, ValidationError> {
        shape.validate()?;
        Ok(Self {
            id,
            shape,
            qty,
            color,
        })
    }
}

/// The rectangular loading volume.
///
/// Coordinate frame: the floor sits at `y = 0`, the footprint is centered on
/// the origin (x over `[-l/2, l/2]`, z over `[-w/2, w/2]`). Replaced
/// wholesale on resize, never partially mutated; cargo positions are
/// container-relative and must be cleared by the owner when resizing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Container {
    pub l: f64,
    pub w: f64,
    pub h: f64,
}

impl Container {
    /// Standard ISO 20 ft container interior, in meters.
    pub const DEFAULT_DIMS: (f64, f64, f64) = (6.058, 2.438, 2.591);

    /// Creates a new container with validation.
    pub fn new(l: f64, w: f64, h: f64) -> Result<Self, ValidationError> {
        validate_dimension(l, "Container length")?;
        validate_dimension(w, "Container width")?;
        validate_dimension(h, "Container height")?;
        Ok(Self { l, w, h })
    }

    /// Total interior volume.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.l * self.w * self.h
    }
}

impl Default for Container {
    fn default() -> Self {
        let (l, w, h) = Self::DEFAULT_DIMS;
        Self { l, w, h }
    }
}

/// Fixed pallet extent (x = length, y = height, z = width), in meters.
pub const PALLET_DIMENSIONS: Vec3 = Vec3::new(1.2, 0.15, 1.0);

/// An auxiliary flat base unit on the container floor.
///
/// Purely visual and volume-accounting; pallets never participate in
/// collision detection or in the placement cursor beyond the deck offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pallet {
    /// Center of the pallet solid.
    pub position: Vec3,
}

/// Distributes `qty` pallets across the container floor in a near-square
/// grid.
///
/// The grid is sized so columns and rows roughly match the container aspect
/// ratio; surplus grid cells beyond `qty` stay empty.
pub fn pallet_grid(container: &Container, qty: u32) -> Vec<Pallet> {
    if qty == 0 {
        return Vec::new();
    }

    let qty = qty as usize;
    let nx = ((qty as f64 * container.l / container.w).sqrt().floor() as usize).max(1);
    let nz = qty.div_ceil(nx);

    let step_x = container.l / nx as f64;
    let step_z = container.w / nz as f64;

    let mut pallets = Vec::with_capacity(qty);
    for i in 0..nx {
        for j in 0..nz {
            if pallets.len() >= qty {
                break;
            }
            let x = -container.l / 2.0 + step_x / 2.0 + i as f64 * step_x;
            let z = -container.w / 2.0 + step_z / 2.0 + j as f64 * step_z;
            pallets.push(Pallet {
                position: Vec3::new(x, PALLET_DIMENSIONS.y / 2.0, z),
            });
        }
    }
    pallets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EPSILON;

    #[test]
    fn box_shape_validates_dimensions() {
        assert!(
            Shape::Box {
                l: 1.0,
                w: 2.0,
                h: 3.0
            }
            .validate()
            .is_ok()
        );
        assert!(
            Shape::Box {
                l: -1.0,
                w: 2.0,
                h: 3.0
            }
            .validate()
            .is_err()
        );
        assert!(
            Shape::Cylinder {
                diameter: 0.0,
                height: 1.0
            }
            .validate()
            .is_err()
        );
        assert!(
            Shape::Cylinder {
                diameter: f64::NAN,
                height: 1.0
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn shape_volume_and_footprint() {
        let b = Shape::Box {
            l: 2.0,
            w: 3.0,
            h: 4.0,
        };
        assert!((b.volume() - 24.0).abs() < EPSILON);
        assert_eq!(b.footprint(), Vec3::new(2.0, 4.0, 3.0));

        let c = Shape::Cylinder {
            diameter: 2.0,
            height: 5.0,
        };
        assert!((c.volume() - std::f64::consts::PI * 5.0).abs() < EPSILON);
        assert_eq!(c.footprint(), Vec3::new(2.0, 5.0, 2.0));
    }

    #[test]
    fn shape_serde_uses_type_tag() {
        let shape: Shape =
            serde_json::from_str(r#"{"type": "box", "l": 1.0, "w": 2.0, "h": 3.0}"#)
                .expect("should parse tagged box");
        assert_eq!(
            shape,
            Shape::Box {
                l: 1.0,
                w: 2.0,
                h: 3.0
            }
        );

        let shape: Shape =
            serde_json::from_str(r#"{"type": "cylinder", "diameter": 0.5, "height": 1.2}"#)
                .expect("should parse tagged cylinder");
        assert_eq!(
            shape,
            Shape::Cylinder {
                diameter: 0.5,
                height: 1.2
            }
        );
    }

    #[test]
    fn container_rejects_invalid_dimensions() {
        assert!(Container::new(6.0, 2.4, 2.6).is_ok());
        assert!(Container::new(0.0, 2.4, 2.6).is_err());
        assert!(Container::new(6.0, f64::INFINITY, 2.6).is_err());
    }

    #[test]
    fn default_container_is_twenty_foot_box() {
        let c = Container::default();
        assert!((c.l - 6.058).abs() < EPSILON);
        assert!((c.w - 2.438).abs() < EPSILON);
        assert!((c.h - 2.591).abs() < EPSILON);
    }

    #[test]
    fn pallet_grid_places_requested_quantity() {
        let container = Container::default();
        for qty in [0u32, 1, 2, 4, 7, 10] {
            let pallets = pallet_grid(&container, qty);
            assert_eq!(pallets.len(), qty as usize);
        }
    }

    #[test]
    fn pallet_grid_stays_inside_floor() {
        let container = Container::default();
        let pallets = pallet_grid(&container, 8);
        for p in &pallets {
            assert!(p.position.x.abs() <= container.l / 2.0);
            assert!(p.position.z.abs() <= container.w / 2.0);
            assert!((p.position.y - PALLET_DIMENSIONS.y / 2.0).abs() < EPSILON);
        }
    }
}
