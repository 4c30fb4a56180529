/// One bit per pixel of a 16x16 block column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionMask {
    rows: [u16; 16],
}

impl CompletionMask {
    pub fn reset(&mut self) {
        self.rows = [0; 16];
    }

    pub fn set(&mut self, x: usize, z: usize) {
        self.rows[z] |= 1 << x;
    }

    pub fn get(&self, x: usize, z: usize) -> bool {
        self.rows[z] & (1 << x) != 0
    }

    pub fn full(&self) -> bool {
        self.rows.iter().all(|&row| row == u16::MAX)
    }

    pub fn any(&self) -> bool {
        self.rows.iter().any(|&row| row != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_fill() {
        let mut mask = CompletionMask::default();
        assert!(!mask.any());
        mask.set(15, 3);
        assert!(mask.get(15, 3));
        assert!(!mask.get(14, 3));
        assert!(mask.any());
        assert!(!mask.full());

        for z in 0..16 {
            for x in 0..16 {
                mask.set(x, z);
            }
        }
        assert!(mask.full());
        mask.reset();
        assert!(!mask.any());
    }
}
