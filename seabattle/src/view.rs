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
//! Snapshots of a session as one participant is allowed to see it.

use crate::{
    board::{BoardState, Dimensions, Position, ShotGrid},
    errors::GameError,
    participant::{ParticipantId, SessionId},
    session::{Session, Status},
};

/// What is known about a single cell.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CellView {
    /// Not fired at, and either empty or hidden.
    Water,
    /// An intact ship cell. Only shown on the participant's own board.
    Ship,
    /// Fired at (or ruled out by a kill) and empty.
    Miss,
    /// A hit on a ship that is still afloat.
    Hit,
    /// Part of a sunk ship.
    Sunk,
}

/// A board as seen by one participant.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BoardView {
    dim: Dimensions,
    cells: Vec<CellView>,
}

impl BoardView {
    /// Build the view of `board` given the shots fired at it. Intact ship cells are
    /// only shown when `reveal` is set.
    fn new(dim: Dimensions, board: Option<&BoardState>, fired: &ShotGrid, reveal: bool) -> Self {
        let cells = dim
            .iter_positions()
            .map(|pos| {
                let ship = board.and_then(|b| b.ship_at(pos).and_then(|id| b.ship(id)));
                match ship {
                    None if fired.contains(pos) => CellView::Miss,
                    None => CellView::Water,
                    Some(ship) if ship.is_sunk() => CellView::Sunk,
                    Some(ship) if ship.is_hit(pos) => CellView::Hit,
                    Some(_) if reveal => CellView::Ship,
                    Some(_) => CellView::Water,
                }
            })
            .collect();
        Self { dim, cells }
    }

    /// Get the [`Dimensions`] of the viewed board.
    pub fn dimensions(&self) -> &Dimensions {
        &self.dim
    }

    /// Get the view of a single cell. Returns `None` if out of bounds.
    pub fn get(&self, pos: Position) -> Option<CellView> {
        self.dim
            .try_linearize(pos)
            .and_then(|idx| self.cells.get(idx))
            .copied()
    }

    /// Iterate the rows of the board, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[CellView]> {
        self.cells.chunks(self.dim.width())
    }
}

/// A session as seen by one of its participants.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SessionView {
    /// Session being viewed.
    pub session: SessionId,
    /// The participant this view was rendered for.
    pub me: ParticipantId,
    /// The other participant in the session.
    pub opponent: ParticipantId,
    /// Display name of the other participant.
    pub opponent_name: String,
    /// Lifecycle state of the session.
    pub status: Status,
    /// Who may attack next. `None` until the session is active.
    pub turn_owner: Option<ParticipantId>,
    /// Who sank the other fleet, once the session has ended that way.
    pub winner: Option<ParticipantId>,
    /// The participant's own fleet, with the opponent's shots on it.
    pub own: BoardView,
    /// The opponent's board, showing only what the participant's shots revealed.
    pub target: BoardView,
}

impl SessionView {
    pub(crate) fn new(session: &Session, pid: ParticipantId) -> Result<Self, GameError> {
        let me = session.participant(pid)?;
        let them = session.opponent(pid)?;
        let dim = *session.dimensions();
        Ok(Self {
            session: session.id(),
            me: pid,
            opponent: them.id(),
            opponent_name: them.name().to_owned(),
            status: session.status(),
            turn_owner: session.turn_owner(),
            winner: session.winner(),
            own: BoardView::new(dim, me.board(), them.shots(), true),
            target: BoardView::new(dim, them.board(), me.shots(), false),
        })
    }
}
