use std::collections::{HashMap, HashSet};

use voxmap_core::BlockPos;

/// In-memory index of the positions present in a key-value store, grouped by Z.
#[derive(Debug, Default)]
pub struct PositionIndex {
    by_z: HashMap<i16, HashSet<(i16, i16)>>,
    len: usize,
}

impl PositionIndex {
    /// Returns false when the position was already indexed.
    pub fn insert(&mut self, pos: BlockPos) -> bool {
        let added = self.by_z.entry(pos.z).or_default().insert((pos.x, pos.y));
        if added {
            self.len += 1;
        }
        added
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Positions with `min <= pos < max` on every axis.
    pub fn in_range(&self, min: BlockPos, max: BlockPos) -> Vec<BlockPos> {
        let mut out = Vec::new();
        for (&z, entries) in &self.by_z {
            if z < min.z || z >= max.z {
                continue;
            }
            out.extend(
                entries
                    .iter()
                    .filter(|&&(x, y)| x >= min.x && x < max.x && y >= min.y && y < max.y)
                    .map(|&(x, y)| BlockPos::new(x, y, z)),
            );
        }
        out
    }

    /// Positions at column `(x, z)` with `min_y <= y < max_y`.
    pub fn column(&self, x: i16, z: i16, min_y: i16, max_y: i16) -> Vec<BlockPos> {
        let Some(entries) = self.by_z.get(&z) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter(|&&(ex, y)| ex == x && y >= min_y && y < max_y)
            .map(|&(_, y)| BlockPos::new(x, y, z))
            .collect()
    }
}
