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
//! Participants in a session and how they pick their targets.

use std::fmt;

use rand::{rngs::StdRng, seq::SliceRandom, RngCore, SeedableRng};

use crate::{
    board::{BoardState, Dimensions, Position, ShotGrid},
    fleet::{Fleet, FleetError},
    ships::ShipClass,
};

/// Identifies a session within a registry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "s-{}", self.0)
    }
}

/// Identifies a participant. Unique across every session of a registry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "p-{}", self.0)
    }
}

/// Opaque handle to the transport connection a human participant plays through.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ConnectionId(pub u64);

/// Position of a participant in a session's fixed order. Either `First` or `Second`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    /// Both seats, in order.
    pub const BOTH: [Seat; 2] = [Seat::First, Seat::Second];

    /// Get the opponent of this seat.
    pub fn opponent(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }
}

/// Decision making for an automated participant.
pub trait Strategy: Send {
    /// Choose a target among cells that have not been fired at yet. `options` is never
    /// empty.
    fn choose_target(&mut self, options: &[Position]) -> Option<Position>;

    /// Arrange a fleet of the given classes.
    fn arrange_fleet(&mut self, dim: Dimensions, classes: &[ShipClass]) -> Result<Fleet, FleetError>;
}

/// Automated strategy that fires uniformly at random and arranges its fleet at random.
#[derive(Debug)]
pub struct RandomStrategy {
    rng: StdRng,
}

impl RandomStrategy {
    /// Create a strategy seeded from system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a strategy with a fixed seed, for reproducible play.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RandomStrategy {
    fn choose_target(&mut self, options: &[Position]) -> Option<Position> {
        options.choose(&mut self.rng).copied()
    }

    fn arrange_fleet(&mut self, dim: Dimensions, classes: &[ShipClass]) -> Result<Fleet, FleetError> {
        Fleet::random(dim, classes, &mut self.rng)
    }
}

/// Who is in control of a participant.
pub enum Controller {
    /// A human playing over the given connection.
    Human(ConnectionId),
    /// An automated player driven by a strategy.
    Automated(Box<dyn Strategy>),
}

impl Controller {
    /// Whether this participant is automated.
    pub fn is_automated(&self) -> bool {
        matches!(self, Controller::Automated(_))
    }

    /// Choose a target among `options`. Humans asking for a random attack get a uniform
    /// choice from `rng`; automated participants consult their strategy.
    pub(crate) fn choose_target(
        &mut self,
        options: &[Position],
        rng: &mut dyn RngCore,
    ) -> Option<Position> {
        if options.is_empty() {
            return None;
        }
        match self {
            Controller::Human(_) => options.choose(rng).copied(),
            Controller::Automated(strategy) => strategy.choose_target(options),
        }
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Controller::Human(conn) => f.debug_tuple("Human").field(conn).finish(),
            Controller::Automated(_) => f.write_str("Automated"),
        }
    }
}

/// A contestant handed over by the pairing layer to start a session.
#[derive(Debug)]
pub struct Entrant {
    /// Display name. Doubles as the identity for humans.
    pub name: String,
    /// Who controls this entrant.
    pub controller: Controller,
}

impl Entrant {
    /// A human entrant playing over `conn`.
    pub fn human(name: impl Into<String>, conn: ConnectionId) -> Self {
        Self {
            name: name.into(),
            controller: Controller::Human(conn),
        }
    }

    /// An automated entrant using the given strategy.
    pub fn automated(name: impl Into<String>, strategy: impl Strategy + 'static) -> Self {
        Self {
            name: name.into(),
            controller: Controller::Automated(Box::new(strategy)),
        }
    }
}

/// One side of a session.
#[derive(Debug)]
pub struct Participant {
    pub(crate) id: ParticipantId,
    pub(crate) name: String,
    pub(crate) controller: Controller,
    /// Absent until a fleet is submitted.
    pub(crate) board: Option<BoardState>,
    pub(crate) ready: bool,
    /// Cells fired at on the opponent's board.
    pub(crate) shots: ShotGrid,
}

impl Participant {
    pub(crate) fn new(id: ParticipantId, entrant: Entrant, dim: Dimensions) -> Self {
        Self {
            id,
            name: entrant.name,
            controller: entrant.controller,
            board: None,
            ready: false,
            shots: ShotGrid::new(dim),
        }
    }

    /// Get the ID of this participant.
    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// Get the display name of this participant.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this participant is automated.
    pub fn is_automated(&self) -> bool {
        self.controller.is_automated()
    }

    /// Whether this participant has submitted their fleet.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The participant's own board, once their fleet is submitted.
    pub fn board(&self) -> Option<&BoardState> {
        self.board.as_ref()
    }

    /// Cells this participant has fired at.
    pub fn shots(&self) -> &ShotGrid {
        &self.shots
    }
}
