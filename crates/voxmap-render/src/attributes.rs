//! Rolling per-pixel height buffer for relief shading.
//!
//! Logical rows run from -1 to 16: row -1 is the last row of the previous
//! block row, rows 0 to 15 belong to the block row being drawn and row 16
//! is kept blank. Column -1 exists so every pixel has a west neighbour; it is
//! never written.

/// Marks a pixel whose height was never recorded.
pub const UNKNOWN_HEIGHT: i32 = i32::MIN;

const LINE_COUNT: usize = 18;
const FIRST_LINE: usize = 0;
const LAST_LINE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelAttribute {
    pub height: i32,
    pub thickness: u8,
}

impl Default for PixelAttribute {
    fn default() -> Self {
        Self {
            height: UNKNOWN_HEIGHT,
            thickness: 0,
        }
    }
}

impl PixelAttribute {
    pub fn valid_height(&self) -> bool {
        self.height != UNKNOWN_HEIGHT
    }
}

/// Eighteen rows of attributes addressed through an index table, so that
/// scrolling moves a row index instead of copying a row.
#[derive(Debug)]
pub struct PixelAttributes {
    rows: Vec<Vec<PixelAttribute>>,
    order: [usize; LINE_COUNT],
}

impl PixelAttributes {
    /// Buffer for an image `width` pixels wide.
    pub fn new(width: usize) -> Self {
        let mut order = [0; LINE_COUNT];
        for (i, slot) in order.iter_mut().enumerate() {
            *slot = i;
        }
        Self {
            rows: vec![vec![PixelAttribute::default(); width + 1]; LINE_COUNT],
            order,
        }
    }

    pub fn width(&self) -> usize {
        self.rows[0].len() - 1
    }

    /// Attribute at logical row `z` (-1..=16) and column `x` (-1..width).
    pub fn get(&self, z: i32, x: i32) -> &PixelAttribute {
        &self.rows[self.order[(z + 1) as usize]][(x + 1) as usize]
    }

    pub fn get_mut(&mut self, z: i32, x: i32) -> &mut PixelAttribute {
        &mut self.rows[self.order[(z + 1) as usize]][(x + 1) as usize]
    }

    /// Make the last row of the finished block row the new row -1 and clear
    /// rows 0 to 15.
    pub fn scroll(&mut self) {
        self.order.swap(FIRST_LINE, LAST_LINE);
        for line in FIRST_LINE + 1..LAST_LINE + 1 {
            self.rows[self.order[line]].fill(PixelAttribute::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rows_are_unknown() {
        let attrs = PixelAttributes::new(32);
        assert_eq!(attrs.width(), 32);
        assert!(!attrs.get(-1, -1).valid_height());
        assert!(!attrs.get(16, 31).valid_height());
    }

    #[test]
    fn test_scroll_keeps_last_row() {
        let mut attrs = PixelAttributes::new(4);
        for z in 0..16 {
            for x in 0..4 {
                attrs.get_mut(z, x).height = z * 10 + x;
            }
        }
        attrs.get_mut(15, 2).thickness = 7;
        attrs.scroll();

        assert_eq!(attrs.get(-1, 2).height, 152);
        assert_eq!(attrs.get(-1, 2).thickness, 7);
        for z in 0..16 {
            for x in -1..4 {
                assert_eq!(*attrs.get(z, x), PixelAttribute::default());
            }
        }
    }

    #[test]
    fn test_repeated_scrolls() {
        let mut attrs = PixelAttributes::new(2);
        for round in 0..5 {
            attrs.get_mut(15, 0).height = round;
            attrs.get_mut(3, 1).height = 99;
            attrs.scroll();
            assert_eq!(attrs.get(-1, 0).height, round);
            assert!(!attrs.get(3, 1).valid_height());
            assert!(!attrs.get(16, 0).valid_height());
        }
    }
}
