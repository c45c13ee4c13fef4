//! Progressive per-pixel running means.

use crate::config::ResetKind;
use crate::material::Color;

/// Running mean and sample count for one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccumCell {
    pub mean: Color,
    pub samples: u32,
}

impl AccumCell {
    /// Fold one sample into the mean.
    #[inline]
    pub fn add(&mut self, sample: Color) {
        self.samples = self.samples.saturating_add(1);
        self.mean += (sample - self.mean) / self.samples as f32;
    }

    #[inline]
    pub fn reset(&mut self, kind: ResetKind) {
        match kind {
            ResetKind::Full => *self = AccumCell::default(),
            // Keep the picture; the next sample gets weight 1/2
            ResetKind::Partial => self.samples = 1,
        }
    }
}

/// One cell per pixel, row-major.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    width: u32,
    height: u32,
    cells: Vec<AccumCell>,
}

impl Accumulator {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![AccumCell::default(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resize to a new resolution; contents are fully reset when it changes.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width != self.width || height != self.height {
            *self = Accumulator::new(width, height);
        }
    }

    pub fn reset(&mut self, kind: ResetKind) {
        self.cells.iter_mut().for_each(|cell| cell.reset(kind));
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&AccumCell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get((y * self.width + x) as usize)
    }

    pub fn cells(&self) -> &[AccumCell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [AccumCell] {
        &mut self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let mut cell = AccumCell::default();
        for v in [1.0, 2.0, 3.0, 4.0] {
            cell.add(Color::splat(v));
        }
        assert_eq!(cell.samples, 4);
        assert!((cell.mean - Color::splat(2.5)).length() < 1e-6);
    }

    #[test]
    fn test_full_reset() {
        let mut acc = Accumulator::new(4, 2);
        acc.cells_mut().iter_mut().for_each(|c| c.add(Color::ONE));
        acc.reset(ResetKind::Full);
        assert!(acc.cells().iter().all(|c| c.mean == Color::ZERO && c.samples == 0));
    }

    #[test]
    fn test_partial_reset_keeps_mean() {
        let mut acc = Accumulator::new(2, 2);
        for _ in 0..10 {
            acc.cells_mut().iter_mut().for_each(|c| c.add(Color::ONE));
        }
        acc.reset(ResetKind::Partial);
        assert!(acc.cells().iter().all(|c| c.mean == Color::ONE && c.samples == 1));

        // The next sample moves the mean halfway
        acc.cells_mut()[0].add(Color::ZERO);
        assert_eq!(acc.cells()[0].mean, Color::splat(0.5));
    }

    #[test]
    fn test_get_bounds() {
        let acc = Accumulator::new(3, 2);
        assert!(acc.get(2, 1).is_some());
        assert!(acc.get(3, 0).is_none());
        assert_eq!(acc.len(), 6);
    }

    #[test]
    fn test_resize_resets() {
        let mut acc = Accumulator::new(2, 2);
        acc.cells_mut()[0].add(Color::ONE);
        acc.resize(2, 2);
        assert_eq!(acc.cells()[0].samples, 1);
        acc.resize(4, 4);
        assert_eq!(acc.len(), 16);
        assert_eq!(acc.cells()[0].samples, 0);
    }
}
