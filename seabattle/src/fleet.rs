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
//! Validation and random generation of fleet layouts.
//!
//! A [`Fleet`] can only be obtained by validating a set of placements against the
//! board rules (every cell in bounds, no overlap, and no two ships touching, not even
//! diagonally) or by generating one at random. [`BoardState`](crate::board::BoardState)
//! relies on those rules: the contour around a sunk ship is always empty water.

use enumflags2::BitFlags;
use rand::Rng;
use thiserror::Error;

use crate::{
    board::{Dimensions, Grid, Position},
    ships::{Placement, ShipClass},
};

/// Attempts per ship before giving up on a random layout and starting over.
const PLACEMENT_ATTEMPTS: usize = 500;

/// Full restarts of a random layout before reporting that the fleet does not fit.
const LAYOUT_RESTARTS: usize = 50;

/// Reason why a ship could not be placed with a given placement.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum CannotPlaceReason {
    /// Part of the ship lies outside the board.
    #[error("the ship does not fit on the board")]
    OutOfBounds,
    /// One or more of the ship's cells is already occupied.
    #[error("the requested position was already occupied")]
    AlreadyOccupied,
    /// The ship touches another ship, including diagonally.
    #[error("the ship touches another ship")]
    Touching,
}

/// Error returned when a fleet layout is rejected.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FleetError {
    /// A single placement broke the placement rules.
    #[error("could not place ship {placement:?}: {reason}")]
    Placement {
        #[source]
        reason: CannotPlaceReason,
        placement: Placement,
    },
    /// The ship classes do not match the expected fleet.
    #[error("fleet does not match the expected composition")]
    Composition,
    /// A fleet must have at least one ship.
    #[error("fleet has no ships")]
    Empty,
    /// No random layout could fit the fleet on the board.
    #[error("no room to arrange the fleet on the board")]
    NoRoom,
}

impl FleetError {
    fn placement(reason: CannotPlaceReason, placement: Placement) -> Self {
        FleetError::Placement { reason, placement }
    }
}

/// Tracks occupied and buffered cells while a layout is assembled.
struct LayoutGrid {
    /// `Some(true)` for ship cells, `Some(false)` for the buffer around ships.
    cells: Grid<Option<bool>>,
}

impl LayoutGrid {
    fn new(dim: Dimensions) -> Self {
        Self {
            cells: Grid::new(dim),
        }
    }

    /// Check whether the placement can go on the board as it currently stands.
    fn check(&self, placement: &Placement) -> Result<(), CannotPlaceReason> {
        let mut touching = false;
        for pos in placement.cells() {
            match self.cells.get(pos) {
                None => return Err(CannotPlaceReason::OutOfBounds),
                Some(Some(true)) => return Err(CannotPlaceReason::AlreadyOccupied),
                Some(Some(false)) => touching = true,
                Some(None) => {}
            }
        }
        if touching {
            Err(CannotPlaceReason::Touching)
        } else {
            Ok(())
        }
    }

    /// Occupy the placement's cells and buffer their neighborhood. Placement must
    /// have passed [`LayoutGrid::check`].
    fn occupy(&mut self, placement: &Placement) {
        let dim = self.cells.dim;
        for pos in placement.cells() {
            self.cells[pos] = Some(true);
            for neighbor in dim.neighbors(pos, BitFlags::all()) {
                let cell = &mut self.cells[neighbor];
                if cell.is_none() {
                    *cell = Some(false);
                }
            }
        }
    }
}

/// A validated fleet layout for one participant.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Fleet {
    dim: Dimensions,
    placements: Vec<Placement>,
}

impl Fleet {
    /// Validate a set of placements against the board rules and the expected fleet
    /// composition. Placements are checked in order, so the reported placement is the
    /// first one that conflicts with the ones before it.
    pub fn validate(
        dim: Dimensions,
        expected: &[ShipClass],
        placements: Vec<Placement>,
    ) -> Result<Self, FleetError> {
        if placements.is_empty() {
            return Err(FleetError::Empty);
        }
        let mut layout = LayoutGrid::new(dim);
        for placement in &placements {
            layout
                .check(placement)
                .map_err(|reason| FleetError::placement(reason, *placement))?;
            layout.occupy(placement);
        }
        let mut have: Vec<_> = placements.iter().map(|p| p.class).collect();
        let mut want = expected.to_vec();
        have.sort();
        want.sort();
        if have != want {
            return Err(FleetError::Composition);
        }
        Ok(Self { dim, placements })
    }

    /// Arrange the given ship classes at random positions that satisfy the board
    /// rules.
    pub fn random<R: Rng + ?Sized>(
        dim: Dimensions,
        classes: &[ShipClass],
        rng: &mut R,
    ) -> Result<Self, FleetError> {
        if classes.is_empty() {
            return Err(FleetError::Empty);
        }
        for _ in 0..LAYOUT_RESTARTS {
            if let Some(placements) = try_random_layout(dim, classes, rng) {
                return Ok(Self { dim, placements });
            }
        }
        Err(FleetError::NoRoom)
    }

    /// Get the [`Dimensions`] this fleet was validated against.
    pub fn dimensions(&self) -> &Dimensions {
        &self.dim
    }

    /// Get the placements of this fleet, in submission order.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Extract the placements of this fleet.
    pub fn into_placements(self) -> Vec<Placement> {
        self.placements
    }
}

/// Make one pass at placing every ship. Returns `None` if some ship ran out of
/// attempts.
fn try_random_layout<R: Rng + ?Sized>(
    dim: Dimensions,
    classes: &[ShipClass],
    rng: &mut R,
) -> Option<Vec<Placement>> {
    let mut layout = LayoutGrid::new(dim);
    let mut placements = Vec::with_capacity(classes.len());
    for &class in classes {
        let placement = (0..PLACEMENT_ATTEMPTS)
            .map(|_| {
                let origin = Position::new(
                    rng.gen_range(0, dim.width()),
                    rng.gen_range(0, dim.height()),
                );
                Placement::new(class, origin, rng.gen())
            })
            .find(|placement| layout.check(placement).is_ok())?;
        layout.occupy(&placement);
        placements.push(placement);
    }
    Some(placements)
}
