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
//! Types that make up the game board.

use std::collections::{HashMap, HashSet};

use crate::{
    fleet::Fleet,
    ships::{Placement, ShipId},
};

pub(crate) use self::grid::Grid;
pub use self::{
    dimensions::{Adjacency, Dimensions, Neighbors},
    grid::ShotGrid,
    position::Position,
};

mod dimensions;
mod grid;
mod position;

/// Status of a single ship on a [`BoardState`].
#[derive(Debug, Clone)]
pub struct ShipState {
    /// Where the ship was placed.
    placement: Placement,
    /// Every cell the ship occupies.
    cells: HashSet<Position>,
    /// Cells of this ship that have been hit.
    hits: HashSet<Position>,
}

impl ShipState {
    fn new(placement: Placement) -> Self {
        Self {
            placement,
            cells: placement.cells().collect(),
            hits: HashSet::with_capacity(placement.len()),
        }
    }

    /// The placement this ship was built from.
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Iterate the cells this ship occupies, in no particular order.
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.iter().copied()
    }

    /// Whether the given cell of this ship has been hit.
    pub fn is_hit(&self, pos: Position) -> bool {
        self.hits.contains(&pos)
    }

    /// A ship is sunk once every one of its cells has been hit.
    pub fn is_sunk(&self) -> bool {
        self.hits.len() == self.cells.len()
    }
}

/// Result of recording a hit on a ship.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HitOutcome {
    /// The hit completed the ship.
    pub killed: bool,
}

/// Index of one participant's fleet: which ship owns each cell and which ships have
/// been hit or sunk. Built once from a validated [`Fleet`] and only mutated one hit at
/// a time afterwards.
#[derive(Debug, Clone)]
pub struct BoardState {
    /// Dimensions of the board the fleet was placed on.
    dim: Dimensions,
    /// Occupied cells mapped to the ship occupying them.
    cells: HashMap<Position, ShipId>,
    /// Ship status, indexed by [`ShipId`].
    ships: Vec<ShipState>,
    /// Ships that have been fully hit.
    sunk: HashSet<ShipId>,
}

impl BoardState {
    /// Build the board index for a validated fleet.
    pub fn new(fleet: &Fleet) -> Self {
        let mut cells = HashMap::new();
        let mut ships = Vec::with_capacity(fleet.placements().len());
        for (idx, placement) in fleet.placements().iter().enumerate() {
            let id = ShipId(idx);
            cells.extend(placement.cells().map(|pos| (pos, id)));
            ships.push(ShipState::new(*placement));
        }
        Self {
            dim: *fleet.dimensions(),
            cells,
            ships,
            sunk: HashSet::new(),
        }
    }

    /// Get the [`Dimensions`] of this board.
    pub fn dimensions(&self) -> &Dimensions {
        &self.dim
    }

    /// Get the ship occupying the given cell, if any.
    pub fn ship_at(&self, pos: Position) -> Option<ShipId> {
        self.cells.get(&pos).copied()
    }

    /// Get the status of the given ship.
    pub fn ship(&self, id: ShipId) -> Option<&ShipState> {
        self.ships.get(id.0)
    }

    /// Record a hit on `ship` at `pos`. The caller guarantees that `pos` belongs to the
    /// ship and has not been recorded before.
    pub fn record_hit(&mut self, ship: ShipId, pos: Position) -> HitOutcome {
        let state = &mut self.ships[ship.0];
        debug_assert!(state.cells.contains(&pos), "{} is not part of {:?}", pos, ship);
        let fresh = state.hits.insert(pos);
        debug_assert!(fresh, "hit at {} recorded twice", pos);
        let killed = state.is_sunk();
        if killed {
            self.sunk.insert(ship);
        }
        HitOutcome { killed }
    }

    /// Whether the given ship is sunk.
    pub fn is_sunk(&self, ship: ShipId) -> bool {
        self.sunk.contains(&ship)
    }

    /// Returns true once every ship on this board has been sunk.
    pub fn is_fleet_destroyed(&self) -> bool {
        self.sunk.len() == self.ships.len()
    }
}
