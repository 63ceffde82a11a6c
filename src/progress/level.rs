//! Level curve
//!
//! Level 1 spans the first `BASE_XP` points; every level after that costs a
//! flat `XP_PER_LEVEL`. The lower boundary of a level belongs to that level,
//! so exactly 1000 XP is level 2 with nothing banked toward level 3.

use serde::{Deserialize, Serialize};

pub const BASE_XP: u32 = 1000;
pub const XP_PER_LEVEL: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub current_level: u32,
    pub xp_for_next_level: u32,
    pub xp_in_current_level: u32,
}

impl Default for LevelProgress {
    fn default() -> Self {
        calculate_level(0)
    }
}

pub fn calculate_level(xp: u32) -> LevelProgress {
    if xp < BASE_XP {
        return LevelProgress {
            current_level: 1,
            xp_for_next_level: BASE_XP,
            xp_in_current_level: xp,
        };
    }

    let additional_xp = xp - BASE_XP;
    LevelProgress {
        current_level: 2 + additional_xp / XP_PER_LEVEL,
        xp_for_next_level: XP_PER_LEVEL,
        xp_in_current_level: additional_xp % XP_PER_LEVEL,
    }
}

/// Call with the totals before and after a gain, never intermediate values,
/// so a transition is reported exactly once.
pub fn check_for_level_up(old_xp: u32, new_xp: u32) -> bool {
    calculate_level(new_xp).current_level > calculate_level(old_xp).current_level
}
