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
//! Resolution of a single attack against a defender's board.
//!
//! [`resolve`] assumes its caller already checked that the session is active, that the
//! attacker owns the turn, and that the target is in bounds and not yet fired at.

use std::collections::BTreeSet;

use enumflags2::BitFlags;

use crate::{
    board::{BoardState, Dimensions, Position, ShipState, ShotGrid},
    ships::ShipId,
};

/// Outcome of a resolved attack.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttackOutcome {
    /// Nothing was hit. The turn passes to the defender.
    Miss,
    /// A ship was hit but not sunk.
    Shot,
    /// A ship was hit and sunk.
    Killed,
}

impl AttackOutcome {
    /// Whether the attacker keeps the turn after this outcome.
    pub fn keeps_turn(self) -> bool {
        !matches!(self, AttackOutcome::Miss)
    }
}

/// Everything that changed as a result of one attack.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Resolution {
    /// What the attack did.
    pub outcome: AttackOutcome,
    /// The ship that was hit, if any.
    pub ship: Option<ShipId>,
    /// Cells around a killed ship that were marked as fired at. Empty unless the
    /// outcome is [`AttackOutcome::Killed`].
    pub contour: Vec<Position>,
    /// The defender has no ships left.
    pub fleet_destroyed: bool,
}

/// Resolve an attack at `pos` against `defender`, recording the shot (and any contour)
/// in the attacker's `shots`.
pub fn resolve(pos: Position, defender: &mut BoardState, shots: &mut ShotGrid) -> Resolution {
    shots.mark(pos);

    let ship = match defender.ship_at(pos) {
        None => {
            return Resolution {
                outcome: AttackOutcome::Miss,
                ship: None,
                contour: Vec::new(),
                fleet_destroyed: false,
            }
        }
        Some(ship) => ship,
    };

    if !defender.record_hit(ship, pos).killed {
        return Resolution {
            outcome: AttackOutcome::Shot,
            ship: Some(ship),
            contour: Vec::new(),
            fleet_destroyed: false,
        };
    }

    let dim = *defender.dimensions();
    let contour = match defender.ship(ship) {
        Some(state) => contour(state, &dim),
        None => Vec::new(),
    };
    for &cell in &contour {
        shots.mark(cell);
    }
    Resolution {
        outcome: AttackOutcome::Killed,
        ship: Some(ship),
        contour,
        fleet_destroyed: defender.is_fleet_destroyed(),
    }
}

/// Cells in the 8-neighborhood of the ship, excluding the ship's own cells, clipped to
/// the board and sorted.
pub fn contour(ship: &ShipState, dim: &Dimensions) -> Vec<Position> {
    let own: BTreeSet<_> = ship.cells().collect();
    let ring: BTreeSet<_> = own
        .iter()
        .flat_map(|&pos| dim.neighbors(pos, BitFlags::all()))
        .filter(|pos| !own.contains(pos))
        .collect();
    ring.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fleet::Fleet,
        ships::{Orientation, Placement, ShipClass},
    };

    fn setup(placements: Vec<Placement>) -> (BoardState, ShotGrid) {
        let dim = Dimensions::square(10);
        let classes: Vec<_> = placements.iter().map(|p| p.class).collect();
        let fleet = Fleet::validate(dim, &classes, placements).unwrap();
        (BoardState::new(&fleet), ShotGrid::new(dim))
    }

    #[test]
    fn miss_is_recorded_and_passes_turn() {
        let (mut board, mut shots) = setup(vec![Placement::new(
            ShipClass::Small,
            Position::new(5, 5),
            Orientation::Horizontal,
        )]);
        let res = resolve(Position::new(0, 0), &mut board, &mut shots);
        assert_eq!(res.outcome, AttackOutcome::Miss);
        assert!(!res.outcome.keeps_turn());
        assert!(shots.contains(Position::new(0, 0)));
        assert_eq!(shots.remaining(), 99);
    }

    #[test]
    fn kill_marks_clipped_contour() {
        let (mut board, mut shots) = setup(vec![
            Placement::new(ShipClass::Medium, Position::new(0, 0), Orientation::Vertical),
            Placement::new(ShipClass::Small, Position::new(9, 9), Orientation::Vertical),
        ]);
        let first = resolve(Position::new(0, 0), &mut board, &mut shots);
        assert_eq!(first.outcome, AttackOutcome::Shot);
        assert!(first.contour.is_empty());

        let second = resolve(Position::new(0, 1), &mut board, &mut shots);
        assert_eq!(second.outcome, AttackOutcome::Killed);
        assert!(!second.fleet_destroyed);
        let expected: Vec<_> = [(0, 2), (1, 0), (1, 1), (1, 2)]
            .iter()
            .map(|&p| Position::from(p))
            .collect();
        assert_eq!(second.contour, expected);
        for pos in expected {
            assert!(shots.contains(pos));
        }
        assert_eq!(shots.remaining(), 100 - 6);
    }

    #[test]
    fn last_kill_destroys_fleet() {
        let (mut board, mut shots) = setup(vec![Placement::new(
            ShipClass::Small,
            Position::new(4, 4),
            Orientation::Horizontal,
        )]);
        let res = resolve(Position::new(4, 4), &mut board, &mut shots);
        assert_eq!(res.outcome, AttackOutcome::Killed);
        assert!(res.fleet_destroyed);
        assert_eq!(res.contour.len(), 8);
    }
}
