// Copyright 2020 Zachary Stewart
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Rectangular board dimensions and neighborhood iteration.

use enumflags2::BitFlags;

use crate::board::Position;

/// Which kinds of neighboring cells to visit when iterating neighbors.
#[derive(BitFlags, Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Adjacency {
    /// Cells sharing an edge with the center cell.
    Edge = 0b01,
    /// Cells touching the center cell only at a corner.
    Corner = 0b10,
}

/// Offsets visited by [`Neighbors`], and which [`Adjacency`] each belongs to.
const OFFSETS: [(isize, isize, Adjacency); 8] = [
    (0, -1, Adjacency::Edge),
    (0, 1, Adjacency::Edge),
    (-1, 0, Adjacency::Edge),
    (1, 0, Adjacency::Edge),
    (-1, -1, Adjacency::Corner),
    (1, -1, Adjacency::Corner),
    (-1, 1, Adjacency::Corner),
    (1, 1, Adjacency::Corner),
];

/// Simple rectangular dimensions without wrapping.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Dimensions {
    /// Width of the board. This cooresponds to the `x` [`Position`].
    width: usize,
    /// Height of the board. This cooresponds to the `y` [`Position`].
    height: usize,
}

impl Dimensions {
    /// Create new [`Dimensions`] with the specified width and height.
    /// Panics if `width * height` exceeds `usize::MAX` or if `width` or `height` is 0.
    pub fn new(width: usize, height: usize) -> Self {
        match Self::try_new(width, height) {
            Some(dim) => dim,
            None if width == 0 || height == 0 => {
                panic!("Dimensions must be nonzero, got {}x{}", width, height)
            }
            None => panic!(
                "Dimensions too large: {} * {} > {}",
                width,
                height,
                usize::MAX
            ),
        }
    }

    /// Create square `size` x `size` dimensions. Panics under the same conditions as
    /// [`Dimensions::new`].
    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    /// Create new [`Dimensions`] with the specified width and height.
    /// Returns `None` if `width * height` exceeds `usize::MAX` or if `width` or `height`
    /// is 0.
    pub fn try_new(width: usize, height: usize) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            width
                .checked_mul(height)
                .map(|_| Self { width, height })
        }
    }

    /// Get the width of these [`Dimensions`].
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get the height of these [`Dimensions`].
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    pub fn total_size(&self) -> usize {
        self.width * self.height
    }

    /// Check if the given [`Position`] is in bounds.
    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Convert a position to a row-major linear index.
    /// Returns `None` if the position is out of range.
    pub fn try_linearize(&self, pos: Position) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.y * self.width + pos.x)
        } else {
            None
        }
    }

    /// Convert a linear index back into a [`Position`].
    pub fn un_linearize(&self, idx: usize) -> Position {
        Position {
            x: idx % self.width,
            y: idx / self.width,
        }
    }

    /// Iterate every position on the board in row-major order.
    pub fn iter_positions(&self) -> impl Iterator<Item = Position> {
        let dim = *self;
        (0..dim.total_size()).map(move |idx| dim.un_linearize(idx))
    }

    /// Iterate the in-bounds neighbors of `pos` of the requested kinds. An out of bounds
    /// center has no neighbors.
    pub fn neighbors<B: Into<BitFlags<Adjacency>>>(&self, pos: Position, kinds: B) -> Neighbors {
        let kinds = kinds.into();
        Neighbors {
            dim: *self,
            center: pos,
            kinds,
            // Skip straight to the end for out of bounds centers.
            step: if self.contains(pos) { 0 } else { OFFSETS.len() },
        }
    }
}

impl Default for Dimensions {
    /// Construct the default dimensions, a 10x10 board.
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
        }
    }
}

/// Iterator over the neighbors of a position.
#[derive(Debug, Clone)]
pub struct Neighbors {
    dim: Dimensions,
    center: Position,
    kinds: BitFlags<Adjacency>,
    step: usize,
}

impl Iterator for Neighbors {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        while let Some(&(dx, dy, kind)) = OFFSETS.get(self.step) {
            self.step += 1;
            if !self.kinds.contains(kind) {
                continue;
            }
            match self.center.offset(dx, dy) {
                Some(pos) if self.dim.contains(pos) => return Some(pos),
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_cell_has_three_neighbors() {
        let dim = Dimensions::square(10);
        let mut all: Vec<_> = dim.neighbors(Position::new(0, 0), BitFlags::all()).collect();
        all.sort();
        assert_eq!(
            all,
            vec![Position::new(0, 1), Position::new(1, 0), Position::new(1, 1)]
        );
        assert_eq!(dim.neighbors(Position::new(0, 0), Adjacency::Edge).count(), 2);
    }

    #[test]
    fn interior_cell_neighborhoods() {
        let dim = Dimensions::square(10);
        let center = Position::new(4, 4);
        assert_eq!(dim.neighbors(center, Adjacency::Edge).count(), 4);
        assert_eq!(dim.neighbors(center, Adjacency::Corner).count(), 4);
        assert_eq!(dim.neighbors(center, BitFlags::all()).count(), 8);
    }

    #[test]
    fn out_of_bounds_center_has_no_neighbors() {
        let dim = Dimensions::square(3);
        assert_eq!(dim.neighbors(Position::new(3, 1), BitFlags::all()).count(), 0);
    }

    #[test]
    fn linearize_round_trips_in_bounds() {
        let dim = Dimensions::new(4, 3);
        assert_eq!(dim.try_linearize(Position::new(3, 2)), Some(11));
        assert_eq!(dim.un_linearize(11), Position::new(3, 2));
        assert_eq!(dim.try_linearize(Position::new(4, 0)), None);
        assert_eq!(dim.iter_positions().count(), 12);
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert!(Dimensions::try_new(0, 10).is_none());
        assert!(Dimensions::try_new(usize::MAX, 2).is_none());
    }
}
