//! Grid split modes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// Number of tiles shown at once.
///
/// The grid is always square: `grid_size = columns²`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// 1×1
    One,
    /// 2×2
    #[default]
    Four,
    /// 3×3
    Nine,
    /// 4×4
    Sixteen,
}

impl SplitMode {
    /// All modes in ascending size.
    pub const ALL: [Self; 4] = [Self::One, Self::Four, Self::Nine, Self::Sixteen];

    /// Columns (and rows) of the grid.
    #[must_use]
    pub const fn columns(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Four => 2,
            Self::Nine => 3,
            Self::Sixteen => 4,
        }
    }

    /// Number of slots on a page.
    #[must_use]
    pub const fn grid_size(self) -> u32 {
        self.columns() * self.columns()
    }

    /// Looks up the mode with the given slot count.
    #[must_use]
    pub fn from_grid_size(grid_size: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.grid_size() == grid_size)
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = self.columns();
        write!(f, "{columns}x{columns}")
    }
}

impl FromStr for SplitMode {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "one" | "1x1" => Ok(Self::One),
            "4" | "four" | "2x2" => Ok(Self::Four),
            "9" | "nine" | "3x3" => Ok(Self::Nine),
            "16" | "sixteen" | "4x4" => Ok(Self::Sixteen),
            other => Err(LayoutError::InvalidSplitMode(other.to_string())),
        }
    }
}
