//! Choice of how the renderer enumerates block positions.
//!
//! Stores with an index answer "which blocks exist here" cheaply. For
//! key-value stores it can be faster to probe every candidate position
//! than to walk the position index, as long as the volume is small.

use std::fmt;
use std::str::FromStr;

use voxmap_core::{Geometry, HeightRange};

/// Below this many candidate blocks every position is probed.
pub const FULL_EXHAUSTIVE_LIMIT: u64 = 200_000;

/// Below this many block layers each known column is probed at every height.
pub const Y_EXHAUSTIVE_LIMIT: u64 = 42;

/// Requested traversal, as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustiveMode {
    Never,
    Y,
    Full,
    #[default]
    Auto,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid exhaustive search mode '{0}' (expected never, y, full or auto)")]
pub struct ParseModeError(pub String);

impl FromStr for ExhaustiveMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(Self::Never),
            "y" => Ok(Self::Y),
            "full" => Ok(Self::Full),
            "auto" => Ok(Self::Auto),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Resolved traversal for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Ask the store which positions exist, then fetch columns.
    Never,
    /// Ask the store which columns exist, then probe every height in them.
    YExhaustive,
    /// Probe every position in the requested volume.
    FullExhaustive,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Never => "never",
            Self::YExhaustive => "y",
            Self::FullExhaustive => "full",
        })
    }
}

/// Pick the strategy for a run over `geometry` and `heights`.
pub fn plan(
    mode: ExhaustiveMode,
    prefers_range_queries: bool,
    geometry: &Geometry,
    heights: &HeightRange,
) -> Strategy {
    match mode {
        ExhaustiveMode::Auto => {
            if prefers_range_queries {
                return Strategy::Never;
            }
            let y_range = heights.block_span() as u64;
            let block_count = (geometry.width() as u64)
                .saturating_mul(y_range)
                .saturating_mul(geometry.depth() as u64);
            log::debug!(
                "Heuristic parameters: prefers_range_queries={prefers_range_queries} \
                 y_range={y_range} blocks={block_count}"
            );
            auto_strategy(block_count, y_range)
        }
        ExhaustiveMode::Never => Strategy::Never,
        ExhaustiveMode::Y | ExhaustiveMode::Full => {
            if prefers_range_queries {
                log::info!(
                    "Note: the current database backend supports efficient range queries, \
                     forcing exhaustive search should always result in worse performance"
                );
            }
            if mode == ExhaustiveMode::Full {
                Strategy::FullExhaustive
            } else {
                Strategy::YExhaustive
            }
        }
    }
}

fn auto_strategy(block_count: u64, y_range: u64) -> Strategy {
    if block_count < FULL_EXHAUSTIVE_LIMIT {
        Strategy::FullExhaustive
    } else if y_range < Y_EXHAUSTIVE_LIMIT {
        Strategy::YExhaustive
    } else {
        Strategy::Never
    }
}
