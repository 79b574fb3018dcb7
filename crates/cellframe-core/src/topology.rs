use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Number of cardinal directions on the grid.
pub const NUM_DIRS: usize = 4;

pub const UP: usize = 0;
pub const RIGHT: usize = 1;
pub const DOWN: usize = 2;
pub const LEFT: usize = 3;

/// Direction pointing back at the sender.
#[must_use]
pub const fn opposite(dir: usize) -> usize {
    (dir + NUM_DIRS / 2) % NUM_DIRS
}

/// Absolute direction for a relative direction read from program memory.
///
/// Any value is valid: it is truncated toward zero, wrapped modulo [`NUM_DIRS`]
/// and offset by `facing`. Non-finite values count as zero.
#[must_use]
pub fn rotate(facing: usize, relative: f64) -> usize {
    let relative = if relative.is_finite() {
        relative as i64
    } else {
        0
    };
    let wrapped = relative.rem_euclid(NUM_DIRS as i64) as usize;
    (wrapped + facing) % NUM_DIRS
}

/// Toroidal grid of `width * height` cells indexed row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTopology {
    width: u32,
    height: u32,
}

impl GridTopology {
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn coords(&self, pos: usize) -> (u32, u32) {
        let width = self.width as usize;
        ((pos % width) as u32, (pos / width) as u32)
    }

    #[must_use]
    pub const fn index(&self, x: u32, y: u32) -> usize {
        (y % self.height) as usize * self.width as usize + (x % self.width) as usize
    }

    /// Cell adjacent to `pos` in direction `dir`, wrapping at the edges.
    #[must_use]
    pub const fn neighbor(&self, pos: usize, dir: usize) -> usize {
        let (x, y) = self.coords(pos);
        let (w, h) = (self.width, self.height);
        match dir % NUM_DIRS {
            UP => self.index(x, (y + h - 1) % h),
            RIGHT => self.index((x + 1) % w, y),
            DOWN => self.index(x, (y + 1) % h),
            _ => self.index((x + w - 1) % w, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_wrap_around_edges() {
        let grid = GridTopology::new(3, 2).expect("grid");
        assert_eq!(grid.len(), 6);
        assert_eq!(grid.neighbor(0, UP), 3);
        assert_eq!(grid.neighbor(0, LEFT), 2);
        assert_eq!(grid.neighbor(2, RIGHT), 0);
        assert_eq!(grid.neighbor(4, DOWN), 1);
    }

    #[test]
    fn opposite_steps_back() {
        let grid = GridTopology::new(5, 4).expect("grid");
        for pos in 0..grid.len() {
            for dir in 0..NUM_DIRS {
                let there = grid.neighbor(pos, dir);
                assert_eq!(grid.neighbor(there, opposite(dir)), pos);
            }
        }
    }

    #[test]
    fn rotation_wraps_any_relative_value() {
        assert_eq!(rotate(0, 0.0), 0);
        assert_eq!(rotate(1, 2.0), 3);
        assert_eq!(rotate(3, 1.0), 0);
        assert_eq!(rotate(0, -1.0), 3);
        assert_eq!(rotate(2, 9.7), 3);
        assert_eq!(rotate(1, f64::NAN), 1);
        assert_eq!(rotate(0, f64::INFINITY), 0);
    }

    #[test]
    fn rejects_empty_grid() {
        assert!(GridTopology::new(0, 4).is_err());
    }
}
