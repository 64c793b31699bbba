//! XP leveling for the learner profile.
//!
//! A pure, total lookup over a strictly ascending threshold table: every
//! non-negative XP value maps to exactly one level, and the progress display
//! saturates at the top level instead of erroring.

use serde::Serialize;
use utoipa::ToSchema;

/// One row of the progression table.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelRow {
    pub level: u32,
    pub xp_required: u64,
    pub title: &'static str,
}

/// Resolved level for a given XP value.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct LevelInfo {
    pub level: u32,
    pub title: String,
    /// XP threshold of the current level.
    pub current_threshold_xp: u64,
    /// XP threshold of the next level; equals `current_threshold_xp` at the
    /// top level, so a progress bar saturates at 100%.
    pub next_threshold_xp: u64,
}

/// The customs curriculum progression table. The lowest level starts at 0 XP
/// and thresholds ascend strictly.
pub const LEVELS: &[LevelRow] = &[
    LevelRow {
        level: 1,
        xp_required: 0,
        title: "Aprendiz Aduanero",
    },
    LevelRow {
        level: 2,
        xp_required: 1000,
        title: "Estudiante Avanzado",
    },
    LevelRow {
        level: 3,
        xp_required: 2500,
        title: "Practicante Destacado",
    },
    LevelRow {
        level: 4,
        xp_required: 5000,
        title: "Asistente Profesional",
    },
    LevelRow {
        level: 5,
        xp_required: 10000,
        title: "Adu-Experto",
    },
];

/// Resolves the level for an XP value against the default table.
pub fn level_for(xp: u64) -> LevelInfo {
    level_for_table(LEVELS, xp)
}

/// Resolves the level against an explicit table.
///
/// Picks the highest row whose threshold is at or below `xp`. The table must
/// be non-empty with its lowest row at 0 XP, which makes the function total.
pub fn level_for_table(table: &[LevelRow], xp: u64) -> LevelInfo {
    let index = table
        .iter()
        .rposition(|row| row.xp_required <= xp)
        .unwrap_or(0);
    let row = &table[index];
    let next_threshold_xp = table
        .get(index + 1)
        .map(|next| next.xp_required)
        .unwrap_or(row.xp_required);

    LevelInfo {
        level: row.level,
        title: row.title.to_string(),
        current_threshold_xp: row.xp_required,
        next_threshold_xp,
    }
}
