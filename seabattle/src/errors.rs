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
//! Errors reported by sessions and the engine.

use thiserror::Error;

use crate::{
    board::Position,
    fleet::FleetError,
    participant::{ParticipantId, SessionId},
};

/// Reason an operation on a session was refused.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum GameError {
    /// No live session has the given ID.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The participant does not belong to the session.
    #[error("participant {0} not found in session")]
    ParticipantNotFound(ParticipantId),

    /// Attacks are only allowed while the session is active.
    #[error("session is not active")]
    SessionNotActive,

    /// The participant attempted to act out of turn.
    #[error("not your turn")]
    NotYourTurn,

    /// The target cell is not on the board.
    #[error("target {0} is out of bounds")]
    OutOfBounds(Position),

    /// The attacker already fired at the target cell.
    #[error("cell {0} already targeted")]
    CellAlreadyTargeted(Position),

    /// Every cell of the opponent's board has already been fired at.
    #[error("no legal targets remain")]
    NoLegalTargets,

    /// The participant's fleet was already submitted.
    #[error("fleet already submitted")]
    FleetAlreadySubmitted,

    /// The submitted fleet layout broke the placement rules.
    #[error("invalid fleet: {0}")]
    InvalidFleet(#[from] FleetError),

    /// A human identity is already playing in another session.
    #[error("{0} is already in an active session")]
    IdentityBusy(String),

    /// The configured board size cannot form a board.
    #[error("board size {0} is not usable")]
    InvalidBoardSize(usize),

    /// The engine's dispatcher has shut down.
    #[error("engine is no longer running")]
    EngineClosed,
}
