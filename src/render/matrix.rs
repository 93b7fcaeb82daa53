//! The scrolling output pixel matrix.

/// RGBA float pixel matrix of `(history_depth + 1)` rows. Row 0 is the
/// frame being written; rows 1.. hold previous frames, shifted down one
/// row per frame. B and A stay at their initialized 0.
pub struct FrameMatrix {
    rows: usize,
    width: usize,
    data: Vec<f32>,
}

impl FrameMatrix {
    pub fn new(width: usize, history_depth: usize) -> Self {
        let rows = history_depth + 1;
        Self {
            rows,
            width,
            data: vec![0.0; rows * width * 4],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Moves every historic row one position deeper, dropping the oldest.
    /// No-op without history.
    pub fn shift_history(&mut self) {
        if self.rows < 2 {
            return;
        }
        let row_len = self.width * 4;
        self.data.copy_within(0..(self.rows - 1) * row_len, row_len);
    }

    /// Writes one processed frame into row 0: magnitude into R, phase
    /// into G.
    pub fn write_front(&mut self, magnitude: &[f32], phase: &[f32]) {
        debug_assert_eq!(magnitude.len(), self.width);
        debug_assert_eq!(phase.len(), self.width);
        for (x, (&m, &p)) in magnitude.iter().zip(phase).enumerate() {
            self.data[x * 4] = m;
            self.data[x * 4 + 1] = p;
        }
    }

    /// Row-major RGBA float pixels, row 0 first.
    pub fn pixels(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(mat: &FrameMatrix, row: usize, x: usize, c: usize) -> f32 {
        mat.pixels()[(row * mat.width() + x) * 4 + c]
    }

    #[test]
    fn front_row_carries_magnitude_and_phase() {
        let mut mat = FrameMatrix::new(3, 0);
        mat.write_front(&[0.1, 0.2, 0.3], &[-0.1, 0.0, 0.1]);
        assert_eq!(channel(&mat, 0, 1, 0), 0.2);
        assert_eq!(channel(&mat, 0, 1, 1), 0.0);
        assert_eq!(channel(&mat, 0, 1, 2), 0.0);
        assert_eq!(channel(&mat, 0, 1, 3), 0.0);
    }

    #[test]
    fn history_scrolls_down() {
        let mut mat = FrameMatrix::new(2, 2);
        mat.write_front(&[1.0, 1.0], &[0.0, 0.0]);
        mat.shift_history();
        mat.write_front(&[2.0, 2.0], &[0.0, 0.0]);
        mat.shift_history();
        mat.write_front(&[3.0, 3.0], &[0.0, 0.0]);

        assert_eq!(channel(&mat, 0, 0, 0), 3.0);
        assert_eq!(channel(&mat, 1, 0, 0), 2.0);
        assert_eq!(channel(&mat, 2, 0, 0), 1.0);

        // Oldest row falls off the end on the next shift
        mat.shift_history();
        mat.write_front(&[4.0, 4.0], &[0.0, 0.0]);
        assert_eq!(channel(&mat, 2, 0, 0), 2.0);
    }

    #[test]
    fn shift_without_history_is_noop() {
        let mut mat = FrameMatrix::new(2, 0);
        mat.write_front(&[1.0, 2.0], &[0.0, 0.0]);
        mat.shift_history();
        assert_eq!(channel(&mat, 0, 0, 0), 1.0);
    }
}
