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
//! Dense per-cell storage, and the record of cells an attacker has fired at.

use std::ops::{Index, IndexMut};

use crate::board::{Dimensions, Position};

/// Row-major grid of cells covering a set of [`Dimensions`].
#[derive(Debug, Clone)]
pub(crate) struct Grid<T> {
    /// Dimensions of this grid.
    pub(crate) dim: Dimensions,
    /// Cells that make up this grid.
    cells: Box<[T]>,
}

impl<T: Default> Grid<T> {
    pub(crate) fn new(dim: Dimensions) -> Self {
        let cells = (0..dim.total_size()).map(|_| T::default()).collect();
        Self { dim, cells }
    }
}

impl<T> Grid<T> {
    /// Get a reference to the cell at the given [`Position`].
    pub(crate) fn get(&self, pos: Position) -> Option<&T> {
        self.dim.try_linearize(pos).and_then(|i| self.cells.get(i))
    }

    /// Get a mutable reference to the cell at the given [`Position`].
    pub(crate) fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.dim
            .try_linearize(pos)
            .and_then(move |i| self.cells.get_mut(i))
    }

    /// Iterate over all cells along with their positions, in row-major order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Position, &T)> {
        let dim = self.dim;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (dim.un_linearize(i), cell))
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    fn index(&self, pos: Position) -> &Self::Output {
        self.get(pos).expect("position out of bounds")
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    fn index_mut(&mut self, pos: Position) -> &mut Self::Output {
        self.get_mut(pos).expect("position out of bounds")
    }
}

/// The set of cells one participant has fired at on their opponent's board. Cells
/// marked by a kill's contour count as fired too.
#[derive(Debug, Clone)]
pub struct ShotGrid {
    grid: Grid<bool>,
    /// Number of cells not yet fired at.
    remaining: usize,
}

impl ShotGrid {
    /// Create an empty record covering the given [`Dimensions`].
    pub fn new(dim: Dimensions) -> Self {
        Self {
            grid: Grid::new(dim),
            remaining: dim.total_size(),
        }
    }

    /// Get the [`Dimensions`] this record covers.
    pub fn dimensions(&self) -> &Dimensions {
        &self.grid.dim
    }

    /// Whether the given cell was already fired at. Out of bounds cells never are.
    pub fn contains(&self, pos: Position) -> bool {
        self.grid.get(pos).copied().unwrap_or(false)
    }

    /// Mark the cell as fired at. Returns true if the cell is in bounds and was not
    /// already marked.
    pub fn mark(&mut self, pos: Position) -> bool {
        match self.grid.get_mut(pos) {
            Some(cell) if !*cell => {
                *cell = true;
                self.remaining -= 1;
                true
            }
            _ => false,
        }
    }

    /// Number of cells still available to fire at.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Iterate the cells not yet fired at, in row-major order.
    pub fn unfired(&self) -> impl Iterator<Item = Position> + '_ {
        self.grid
            .iter()
            .filter_map(|(pos, &fired)| if fired { None } else { Some(pos) })
    }
}
