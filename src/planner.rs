//! Placement planning for the loading simulator.
//!
//! This module implements the deterministic greedy placement scan used by the
//! "load all batches" action: a single 3D cursor sweeps the container
//! row by row (x), depth by depth (z), layer by layer (y), emitting one
//! placement per cargo unit. There is no rotation, no backtracking and no
//! backfill of space left by footprint mismatches between batches. This is
//! a shelf scan, not an optimizing packer.

use serde::Serialize;

use crate::model::{Batch, Container, Shape};
use crate::types::Vec3;

/// Configuration for the placement scan.
#[derive(Copy, Clone, Debug)]
pub struct PlannerConfig {
    /// Additive gap left between neighbouring items on every axis.
    pub margin: f64,
}

impl PlannerConfig {
    pub const DEFAULT_MARGIN: f64 = 0.01;
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            margin: Self::DEFAULT_MARGIN,
        }
    }
}

/// One planned cargo placement, not yet materialized as a `CargoItem`.
///
/// The caller drives the cargo-creation capability with these and assigns
/// the session-unique item ids.
#[derive(Clone, Debug)]
pub struct Placement {
    /// Batch this unit came from.
    pub batch_id: u64,
    pub shape: Shape,
    /// Center position in container coordinates, deck offset included.
    pub position: Vec3,
    pub color: String,
}

/// Capacity-exceeded report: which batch overflowed and how far it got.
///
/// Non-fatal by contract: placements made before the overflow are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overflow {
    pub batch_id: u64,
    /// Units of the offending batch that were placed before space ran out.
    pub placed_from_batch: u32,
    pub requested: u32,
}

/// Result of a planning run.
#[derive(Clone, Debug)]
pub struct PlanOutcome {
    pub placements: Vec<Placement>,
    pub overflow: Option<Overflow>,
}

impl PlanOutcome {
    /// Indicates whether every requested unit found a spot.
    pub fn is_complete(&self) -> bool {
        self.overflow.is_none()
    }
}

/// Events emitted while planning, for live visualization over SSE.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PlanEvent {
    /// Planning has started.
    Started { batches: usize, units: u32 },
    /// One cargo unit received a position.
    UnitPlaced {
        batch_id: u64,
        index_in_batch: u32,
        pos: (f64, f64, f64),
        shape: Shape,
    },
    /// The container ran out of space; planning stops here.
    Overflowed {
        batch_id: u64,
        placed_from_batch: u32,
        requested: u32,
    },
    /// Planning finished.
    Finished { placed: usize, overflow: bool },
}

/// The row/layer/depth position tracker of the greedy scan.
struct Cursor {
    x: f64,
    y: f64,
    z: f64,
}

/// Computes placements for an ordered sequence of batches.
///
/// The cursor starts at the container's minimum corner offset by half the
/// first placed unit's footprint, and persists across batches: a later batch
/// continues wherever the previous one stopped, even when footprints differ.
/// That carries over the observed behavior of the simulator and is an
/// accepted approximation, not a packing optimum.
///
/// # Parameters
/// * `container` - The loading volume
/// * `batches` - Pending batches in placement priority order
/// * `pallet_offset` - Deck height added to every emitted y position
///   (0.0 when no pallets are on the floor)
/// * `config` - Margin configuration
///
/// # Returns
/// `PlanOutcome` with the emitted placements and, if space ran out, the
/// capacity-exceeded report. On overflow all remaining units and batches are
/// skipped; nothing is rolled back.
pub fn plan_placements(
    container: &Container,
    batches: &[Batch],
    pallet_offset: f64,
    config: &PlannerConfig,
) -> PlanOutcome {
    plan_with_progress(container, batches, pallet_offset, config, |_| {})
}

/// Planning with a live progress callback.
///
/// Invokes `on_event` for every significant step (suitable for SSE).
pub fn plan_with_progress(
    container: &Container,
    batches: &[Batch],
    pallet_offset: f64,
    config: &PlannerConfig,
    mut on_event: impl FnMut(&PlanEvent),
) -> PlanOutcome {
    let total_units: u32 = batches.iter().map(|b| b.qty).sum();
    on_event(&PlanEvent::Started {
        batches: batches.len(),
        units: total_units,
    });

    let half_l = container.l / 2.0;
    let half_w = container.w / 2.0;

    let mut placements: Vec<Placement> = Vec::with_capacity(total_units as usize);
    let mut overflow: Option<Overflow> = None;
    let mut cursor: Option<Cursor> = None;

    'batches: for batch in batches {
        // Zero-quantity batches are no-ops and must not seed the cursor.
        if batch.qty == 0 {
            continue;
        }

        let fp = batch.shape.footprint();

        // A unit larger than the container in any axis can never fit;
        // report capacity-exceeded before touching the cursor.
        if fp.x > container.l || fp.z > container.w || fp.y > container.h {
            let report = Overflow {
                batch_id: batch.id,
                placed_from_batch: 0,
                requested: batch.qty,
            };
            on_event(&PlanEvent::Overflowed {
                batch_id: report.batch_id,
                placed_from_batch: report.placed_from_batch,
                requested: report.requested,
            });
            overflow = Some(report);
            break 'batches;
        }

        let step_x = fp.x + config.margin;
        let step_y = fp.y + config.margin;
        let step_z = fp.z + config.margin;

        let cur = cursor.get_or_insert_with(|| Cursor {
            x: -half_l + fp.x / 2.0,
            y: fp.y / 2.0,
            z: -half_w + fp.z / 2.0,
        });

        for index_in_batch in 0..batch.qty {
            // Row full: wrap to the next depth row.
            if cur.x + fp.x / 2.0 > half_l {
                cur.z += step_z;
                cur.x = -half_l + fp.x / 2.0;
            }

            // Floor area full: wrap to the next layer.
            if cur.z + fp.z / 2.0 > half_w {
                cur.y += step_y;
                cur.x = -half_l + fp.x / 2.0;
                cur.z = -half_w + fp.z / 2.0;
            }

            // Container full: stop this batch and everything after it.
            if cur.y + fp.y / 2.0 > container.h {
                let report = Overflow {
                    batch_id: batch.id,
                    placed_from_batch: index_in_batch,
                    requested: batch.qty,
                };
                on_event(&PlanEvent::Overflowed {
                    batch_id: report.batch_id,
                    placed_from_batch: report.placed_from_batch,
                    requested: report.requested,
                });
                overflow = Some(report);
                break 'batches;
            }

            let position = Vec3::new(cur.x, cur.y + pallet_offset, cur.z);
            on_event(&PlanEvent::UnitPlaced {
                batch_id: batch.id,
                index_in_batch,
                pos: position.as_tuple(),
                shape: batch.shape,
            });
            placements.push(Placement {
                batch_id: batch.id,
                shape: batch.shape,
                position,
                color: batch.color.clone(),
            });

            cur.x += step_x;
        }
    }

    on_event(&PlanEvent::Finished {
        placed: placements.len(),
        overflow: overflow.is_some(),
    });
    PlanOutcome {
        placements,
        overflow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EPSILON;

    fn unit_box() -> Shape {
        Shape::Box {
            l: 1.0,
            w: 1.0,
            h: 1.0,
        }
    }

    fn batch(id: u64, shape: Shape, qty: u32) -> Batch {
        Batch::new(id, shape, qty, "#0077ff".to_string()).unwrap()
    }

    fn teu() -> Container {
        Container::default()
    }

    #[test]
    fn four_unit_boxes_fill_a_single_row() {
        let config = PlannerConfig::default();
        let outcome = plan_placements(&teu(), &[batch(1, unit_box(), 4)], 0.0, &config);

        assert!(outcome.is_complete());
        assert_eq!(outcome.placements.len(), 4);

        let first = &outcome.placements[0];
        assert!((first.position.x - (-6.058 / 2.0 + 0.5)).abs() < EPSILON);
        assert!((first.position.y - 0.5).abs() < EPSILON);
        assert!((first.position.z - (-2.438 / 2.0 + 0.5)).abs() < EPSILON);

        for (i, p) in outcome.placements.iter().enumerate() {
            // Same row: only x advances, by footprint plus margin.
            assert!((p.position.x - (first.position.x + i as f64 * 1.01)).abs() < EPSILON);
            assert!((p.position.y - first.position.y).abs() < EPSILON);
            assert!((p.position.z - first.position.z).abs() < EPSILON);
        }
    }

    #[test]
    fn placements_stay_strictly_inside_bounds() {
        let config = PlannerConfig::default();
        let container = teu();
        let outcome = plan_placements(&container, &[batch(1, unit_box(), 10)], 0.0, &config);

        assert!(outcome.is_complete());
        assert_eq!(outcome.placements.len(), 10);
        for p in &outcome.placements {
            assert!(p.position.x.abs() < container.l / 2.0);
            assert!(p.position.z.abs() < container.w / 2.0);
            assert!(p.position.y > 0.0 && p.position.y < container.h);
        }
    }

    #[test]
    fn oversized_unit_fails_immediately() {
        let config = PlannerConfig::default();
        let container = Container::new(1.0, 1.0, 1.0).unwrap();
        let big = Shape::Box {
            l: 2.0,
            w: 1.0,
            h: 1.0,
        };

        let outcome = plan_placements(&container, &[batch(7, big, 1)], 0.0, &config);
        assert!(outcome.placements.is_empty());
        assert_eq!(
            outcome.overflow,
            Some(Overflow {
                batch_id: 7,
                placed_from_batch: 0,
                requested: 1,
            })
        );
    }

    #[test]
    fn overflow_keeps_partial_placements() {
        let config = PlannerConfig::default();
        let container = Container::new(1.0, 1.0, 1.0).unwrap();

        let outcome = plan_placements(&container, &[batch(1, unit_box(), 3)], 0.0, &config);
        assert_eq!(outcome.placements.len(), 1);
        assert_eq!(
            outcome.overflow,
            Some(Overflow {
                batch_id: 1,
                placed_from_batch: 1,
                requested: 3,
            })
        );
    }

    #[test]
    fn overflow_aborts_all_subsequent_batches() {
        let config = PlannerConfig::default();
        let container = Container::new(1.0, 1.0, 1.0).unwrap();
        let big = Shape::Box {
            l: 2.0,
            w: 1.0,
            h: 1.0,
        };
        let small = Shape::Box {
            l: 0.4,
            w: 0.4,
            h: 0.4,
        };

        let outcome = plan_placements(
            &container,
            &[batch(1, big, 1), batch(2, small, 1)],
            0.0,
            &config,
        );
        assert!(outcome.placements.is_empty());
        assert_eq!(outcome.overflow.map(|o| o.batch_id), Some(1));
    }

    #[test]
    fn zero_quantity_batch_does_not_seed_cursor() {
        let config = PlannerConfig::default();
        let big = Shape::Box {
            l: 3.0,
            w: 2.0,
            h: 2.0,
        };

        let outcome = plan_placements(
            &teu(),
            &[batch(1, big, 0), batch(2, unit_box(), 1)],
            0.0,
            &config,
        );
        assert!(outcome.is_complete());
        assert_eq!(outcome.placements.len(), 1);

        // The cursor start reflects the unit box, not the empty batch.
        let p = &outcome.placements[0];
        assert!((p.position.x - (-6.058 / 2.0 + 0.5)).abs() < EPSILON);
        assert!((p.position.y - 0.5).abs() < EPSILON);
    }

    #[test]
    fn cursor_persists_across_batches() {
        let config = PlannerConfig::default();
        let outcome = plan_placements(
            &teu(),
            &[batch(1, unit_box(), 2), batch(2, unit_box(), 1)],
            0.0,
            &config,
        );

        assert!(outcome.is_complete());
        assert_eq!(outcome.placements.len(), 3);
        let xs: Vec<f64> = outcome.placements.iter().map(|p| p.position.x).collect();
        assert!(xs[2] > xs[1] && xs[1] > xs[0]);
        assert_eq!(outcome.placements[2].batch_id, 2);
    }

    #[test]
    fn row_and_layer_wrap_advance_depth_and_height() {
        let config = PlannerConfig::default();
        // Two units per row, one row per layer.
        let container = Container::new(2.1, 1.05, 3.3).unwrap();

        let outcome = plan_placements(&container, &[batch(1, unit_box(), 3)], 0.0, &config);
        assert!(outcome.is_complete());
        assert_eq!(outcome.placements.len(), 3);

        let p = &outcome.placements;
        assert!((p[0].position.y - p[1].position.y).abs() < EPSILON);
        assert!(p[2].position.y > p[0].position.y, "third unit starts layer 2");
        assert!((p[2].position.x - p[0].position.x).abs() < EPSILON);
    }

    #[test]
    fn pallet_offset_raises_emitted_positions() {
        let config = PlannerConfig::default();
        let outcome = plan_placements(&teu(), &[batch(1, unit_box(), 1)], 0.15, &config);

        assert!((outcome.placements[0].position.y - 0.65).abs() < EPSILON);
    }

    #[test]
    fn cylinder_batches_step_by_diameter() {
        let config = PlannerConfig::default();
        let drum = Shape::Cylinder {
            diameter: 0.6,
            height: 0.9,
        };

        let outcome = plan_placements(&teu(), &[batch(1, drum, 2)], 0.0, &config);
        assert!(outcome.is_complete());
        let p = &outcome.placements;
        assert!((p[1].position.x - p[0].position.x - 0.61).abs() < EPSILON);
        assert!((p[0].position.y - 0.45).abs() < EPSILON);
    }

    #[test]
    fn progress_events_bracket_the_run() {
        let config = PlannerConfig::default();
        let mut events: Vec<String> = Vec::new();
        let outcome = plan_with_progress(
            &teu(),
            &[batch(1, unit_box(), 2)],
            0.0,
            &config,
            |evt| {
                events.push(match evt {
                    PlanEvent::Started { .. } => "started".to_string(),
                    PlanEvent::UnitPlaced { .. } => "placed".to_string(),
                    PlanEvent::Overflowed { .. } => "overflowed".to_string(),
                    PlanEvent::Finished { .. } => "finished".to_string(),
                });
            },
        );

        assert!(outcome.is_complete());
        assert_eq!(events, vec!["started", "placed", "placed", "finished"]);
    }

    #[test]
    fn overflow_event_is_emitted_before_finished() {
        let config = PlannerConfig::default();
        let container = Container::new(1.0, 1.0, 1.0).unwrap();
        let mut kinds: Vec<&'static str> = Vec::new();

        plan_with_progress(
            &container,
            &[batch(1, unit_box(), 3)],
            0.0,
            &config,
            |evt| {
                kinds.push(match evt {
                    PlanEvent::Started { .. } => "started",
                    PlanEvent::UnitPlaced { .. } => "placed",
                    PlanEvent::Overflowed { .. } => "overflowed",
                    PlanEvent::Finished { .. } => "finished",
                });
            },
        );

        assert_eq!(kinds, vec!["started", "placed", "overflowed", "finished"]);
    }
}
