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
//! A single contest between two participants.

use rand::{Rng, RngCore};
use tracing::debug;

use crate::{
    attack::{self, AttackOutcome},
    board::{BoardState, Dimensions, Position},
    errors::GameError,
    fleet::Fleet,
    participant::{Participant, ParticipantId, Seat, SessionId},
    ships::ShipClass,
};

/// Lifecycle of a session.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Status {
    /// Waiting for both fleets.
    Forming,
    /// Both fleets are in and attacks are being exchanged.
    Active,
    /// A fleet was destroyed or the session was terminated.
    Finished,
}

/// Result of submitting a fleet.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FleetReport {
    /// Both participants are ready and the session is now active.
    pub ready: bool,
    /// Who attacks first, once the session is active.
    pub turn_owner: Option<ParticipantId>,
}

/// Result of a successful attack.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AttackReport {
    /// Session the attack happened in.
    pub session: SessionId,
    /// Who fired.
    pub attacker: ParticipantId,
    /// The targeted cell.
    pub position: Position,
    /// What the attack did.
    pub outcome: AttackOutcome,
    /// Class of the ship that was hit, if any.
    pub ship: Option<ShipClass>,
    /// Cells around a killed ship that are now known to be empty.
    pub contour: Vec<Position>,
    /// Who owns the turn after this attack.
    pub next_turn: ParticipantId,
    /// The attacker, if this attack won the session.
    pub winner: Option<ParticipantId>,
}

/// One contest between exactly two participants in a fixed order.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    dim: Dimensions,
    participants: [Participant; 2],
    /// Absent until the session is active.
    turn: Option<Seat>,
    status: Status,
    /// Absent until a fleet is destroyed. Forced terminations leave no winner.
    winner: Option<Seat>,
    /// Seat that attacks first. Picked at random when the session activates if unset.
    pub(crate) first_seat: Option<Seat>,
}

impl Session {
    pub(crate) fn new(id: SessionId, dim: Dimensions, participants: [Participant; 2]) -> Self {
        Self {
            id,
            dim,
            participants,
            turn: None,
            status: Status::Forming,
            winner: None,
            first_seat: None,
        }
    }

    /// Get the ID of this session.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Get the board dimensions used by this session.
    pub fn dimensions(&self) -> &Dimensions {
        &self.dim
    }

    /// Get the current status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Get the participant who owns the turn, once active.
    pub fn turn_owner(&self) -> Option<ParticipantId> {
        self.turn.map(|seat| self.seat(seat).id)
    }

    /// Get the winner, if the session was won.
    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner.map(|seat| self.seat(seat).id)
    }

    /// Get both participants, in order.
    pub fn participants(&self) -> &[Participant; 2] {
        &self.participants
    }

    /// Get the participant with the given ID.
    pub fn participant(&self, pid: ParticipantId) -> Result<&Participant, GameError> {
        self.seat_of(pid).map(|seat| self.seat(seat))
    }

    /// Get the opponent of the given participant.
    pub fn opponent(&self, pid: ParticipantId) -> Result<&Participant, GameError> {
        self.seat_of(pid).map(|seat| self.seat(seat.opponent()))
    }

    /// Find which seat the participant occupies.
    pub fn seat_of(&self, pid: ParticipantId) -> Result<Seat, GameError> {
        Seat::BOTH
            .iter()
            .copied()
            .find(|&seat| self.seat(seat).id == pid)
            .ok_or(GameError::ParticipantNotFound(pid))
    }

    pub(crate) fn seat(&self, seat: Seat) -> &Participant {
        &self.participants[seat.index()]
    }

    pub(crate) fn seat_mut(&mut self, seat: Seat) -> &mut Participant {
        &mut self.participants[seat.index()]
    }

    /// Split the participants into (actor, opponent).
    fn pair_mut(&mut self, seat: Seat) -> (&mut Participant, &mut Participant) {
        let [first, second] = &mut self.participants;
        match seat {
            Seat::First => (first, second),
            Seat::Second => (second, first),
        }
    }

    /// Install a participant's validated fleet. Once both participants are ready the
    /// session becomes active and, unless a first seat was configured, the first turn
    /// owner is picked uniformly at random.
    pub fn submit_fleet<R: Rng + ?Sized>(
        &mut self,
        pid: ParticipantId,
        fleet: &Fleet,
        rng: &mut R,
    ) -> Result<FleetReport, GameError> {
        let seat = self.seat_of(pid)?;
        if self.status != Status::Forming || self.seat(seat).ready {
            return Err(GameError::FleetAlreadySubmitted);
        }
        let participant = self.seat_mut(seat);
        participant.board = Some(BoardState::new(fleet));
        participant.ready = true;

        if self.participants.iter().all(|p| p.ready) {
            let first = match self.first_seat {
                Some(seat) => seat,
                None if rng.gen() => Seat::First,
                None => Seat::Second,
            };
            self.turn = Some(first);
            self.status = Status::Active;
            debug!(session = %self.id, first = %self.seat(first).id, "session active");
            Ok(FleetReport {
                ready: true,
                turn_owner: self.turn_owner(),
            })
        } else {
            Ok(FleetReport {
                ready: false,
                turn_owner: None,
            })
        }
    }

    /// Check that `pid` may attack right now, returning their seat.
    fn check_turn(&self, pid: ParticipantId) -> Result<Seat, GameError> {
        let seat = self.seat_of(pid)?;
        if self.status != Status::Active {
            return Err(GameError::SessionNotActive);
        }
        if self.turn != Some(seat) {
            return Err(GameError::NotYourTurn);
        }
        Ok(seat)
    }

    /// Fire at `pos` on the opponent's board.
    pub fn attack(&mut self, pid: ParticipantId, pos: Position) -> Result<AttackReport, GameError> {
        let seat = self.check_turn(pid)?;
        if !self.dim.contains(pos) {
            return Err(GameError::OutOfBounds(pos));
        }
        if self.seat(seat).shots.contains(pos) {
            return Err(GameError::CellAlreadyTargeted(pos));
        }
        self.fire(seat, pos)
    }

    /// Fire at a cell chosen by the participant's controller among the cells they have
    /// not fired at yet.
    pub fn random_attack(
        &mut self,
        pid: ParticipantId,
        rng: &mut dyn RngCore,
    ) -> Result<AttackReport, GameError> {
        let seat = self.check_turn(pid)?;
        let attacker = self.seat_mut(seat);
        let options: Vec<_> = attacker.shots.unfired().collect();
        let pos = attacker
            .controller
            .choose_target(&options, rng)
            .ok_or(GameError::NoLegalTargets)?;
        self.attack(pid, pos)
    }

    /// Apply an attack whose preconditions were already checked.
    fn fire(&mut self, seat: Seat, pos: Position) -> Result<AttackReport, GameError> {
        let id = self.id;
        let (attacker, defender) = self.pair_mut(seat);
        let attacker_id = attacker.id;
        let defender_id = defender.id;
        let board = defender.board.as_mut().ok_or(GameError::SessionNotActive)?;
        let res = attack::resolve(pos, board, &mut attacker.shots);
        let ship = res
            .ship
            .and_then(|ship| board.ship(ship))
            .map(|ship| ship.placement().class);

        let next_turn = if res.outcome.keeps_turn() {
            attacker_id
        } else {
            self.turn = Some(seat.opponent());
            defender_id
        };
        let winner = if res.fleet_destroyed {
            self.winner = Some(seat);
            self.status = Status::Finished;
            Some(attacker_id)
        } else {
            None
        };
        debug!(
            session = %id,
            attacker = %attacker_id,
            %pos,
            outcome = ?res.outcome,
            "attack resolved"
        );
        Ok(AttackReport {
            session: id,
            attacker: attacker_id,
            position: pos,
            outcome: res.outcome,
            ship,
            contour: res.contour,
            next_turn,
            winner,
        })
    }

    /// End the session without a winner.
    pub(crate) fn terminate(&mut self) {
        self.status = Status::Finished;
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        participant::{ConnectionId, Entrant},
        ships::{Orientation, Placement},
    };

    fn session() -> Session {
        let dim = Dimensions::square(10);
        Session::new(
            SessionId(1),
            dim,
            [
                Participant::new(ParticipantId(1), Entrant::human("ann", ConnectionId(1)), dim),
                Participant::new(ParticipantId(2), Entrant::human("bob", ConnectionId(2)), dim),
            ],
        )
    }

    fn fleet(placements: Vec<Placement>) -> Fleet {
        let classes: Vec<_> = placements.iter().map(|p| p.class).collect();
        Fleet::validate(Dimensions::square(10), &classes, placements).unwrap()
    }

    fn huge_at_2_2() -> Fleet {
        fleet(vec![Placement::new(
            ShipClass::Huge,
            Position::new(2, 2),
            Orientation::Horizontal,
        )])
    }

    /// Build an active session where `ParticipantId(1)` has the first turn.
    fn active_session() -> Session {
        let mut s = session();
        let mut rng = StdRng::seed_from_u64(0);
        s.submit_fleet(ParticipantId(1), &huge_at_2_2(), &mut rng).unwrap();
        s.submit_fleet(ParticipantId(2), &huge_at_2_2(), &mut rng).unwrap();
        s.turn = Some(Seat::First);
        s
    }

    #[test]
    fn becomes_active_once_both_ready() {
        let mut s = session();
        let mut rng = StdRng::seed_from_u64(5);
        let first = s.submit_fleet(ParticipantId(1), &huge_at_2_2(), &mut rng).unwrap();
        assert_eq!(first, FleetReport { ready: false, turn_owner: None });
        assert_eq!(s.status(), Status::Forming);
        assert_eq!(
            s.submit_fleet(ParticipantId(1), &huge_at_2_2(), &mut rng),
            Err(GameError::FleetAlreadySubmitted)
        );

        let second = s.submit_fleet(ParticipantId(2), &huge_at_2_2(), &mut rng).unwrap();
        assert!(second.ready);
        assert_eq!(s.status(), Status::Active);
        assert!(second.turn_owner.is_some());
        assert_eq!(second.turn_owner, s.turn_owner());
    }

    #[test]
    fn first_turn_is_picked_for_both_seats() {
        let mut seen = [false; 2];
        for seed in 0..64 {
            let mut s = session();
            let mut rng = StdRng::seed_from_u64(seed);
            s.submit_fleet(ParticipantId(1), &huge_at_2_2(), &mut rng).unwrap();
            s.submit_fleet(ParticipantId(2), &huge_at_2_2(), &mut rng).unwrap();
            seen[s.turn.unwrap().index()] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn configured_first_seat_always_starts() {
        for seed in 0..16 {
            let mut s = session();
            s.first_seat = Some(Seat::Second);
            let mut rng = StdRng::seed_from_u64(seed);
            s.submit_fleet(ParticipantId(1), &huge_at_2_2(), &mut rng).unwrap();
            let report = s.submit_fleet(ParticipantId(2), &huge_at_2_2(), &mut rng).unwrap();
            assert_eq!(report.turn_owner, Some(ParticipantId(2)));
        }
    }

    #[test]
    fn attacks_are_refused_before_active() {
        let mut s = session();
        assert_eq!(
            s.attack(ParticipantId(1), Position::new(0, 0)),
            Err(GameError::SessionNotActive)
        );
        assert_eq!(
            s.attack(ParticipantId(9), Position::new(0, 0)),
            Err(GameError::ParticipantNotFound(ParticipantId(9)))
        );
    }

    #[test]
    fn miss_passes_turn_and_hits_keep_it() {
        let mut s = active_session();
        assert_eq!(
            s.attack(ParticipantId(2), Position::new(0, 0)),
            Err(GameError::NotYourTurn)
        );
        let hit = s.attack(ParticipantId(1), Position::new(2, 2)).unwrap();
        assert_eq!(hit.outcome, AttackOutcome::Shot);
        assert_eq!(hit.ship, Some(ShipClass::Huge));
        assert_eq!(hit.next_turn, ParticipantId(1));
        assert_eq!(s.turn_owner(), Some(ParticipantId(1)));

        let miss = s.attack(ParticipantId(1), Position::new(9, 9)).unwrap();
        assert_eq!(miss.outcome, AttackOutcome::Miss);
        assert_eq!(miss.next_turn, ParticipantId(2));
        assert_eq!(s.turn_owner(), Some(ParticipantId(2)));
    }

    #[test]
    fn repeated_target_is_refused_whatever_the_outcome() {
        let mut s = active_session();
        s.attack(ParticipantId(1), Position::new(2, 2)).unwrap();
        assert_eq!(
            s.attack(ParticipantId(1), Position::new(2, 2)),
            Err(GameError::CellAlreadyTargeted(Position::new(2, 2)))
        );
        s.attack(ParticipantId(1), Position::new(0, 9)).unwrap();
        s.attack(ParticipantId(2), Position::new(0, 0)).unwrap();
        assert_eq!(s.turn_owner(), Some(ParticipantId(1)));
        assert_eq!(
            s.attack(ParticipantId(1), Position::new(0, 9)),
            Err(GameError::CellAlreadyTargeted(Position::new(0, 9)))
        );
        assert_eq!(
            s.attack(ParticipantId(1), Position::new(10, 0)),
            Err(GameError::OutOfBounds(Position::new(10, 0)))
        );
    }

    #[test]
    fn sinking_the_fleet_wins_without_passing_turn() {
        let mut s = active_session();
        for x in 2..5 {
            let report = s.attack(ParticipantId(1), Position::new(x, 2)).unwrap();
            assert_eq!(report.outcome, AttackOutcome::Shot);
            assert_eq!(report.next_turn, ParticipantId(1));
            assert_eq!(report.winner, None);
        }
        let last = s.attack(ParticipantId(1), Position::new(5, 2)).unwrap();
        assert_eq!(last.outcome, AttackOutcome::Killed);
        assert_eq!(last.winner, Some(ParticipantId(1)));
        assert_eq!(last.next_turn, ParticipantId(1));
        assert_eq!(s.status(), Status::Finished);
        assert_eq!(s.winner(), Some(ParticipantId(1)));
        assert_eq!(s.turn_owner(), Some(ParticipantId(1)));

        // 1-cell perimeter around (2,2)-(5,2).
        let shots = s.participant(ParticipantId(1)).unwrap().shots();
        let mut perimeter = Vec::new();
        for y in 1..=3 {
            for x in 1..=6 {
                if y != 2 || x == 1 || x == 6 {
                    perimeter.push(Position::new(x, y));
                }
            }
        }
        assert_eq!(last.contour.len(), perimeter.len());
        for pos in perimeter {
            assert!(shots.contains(pos), "{} not marked", pos);
            assert!(last.contour.contains(&pos));
        }
        assert_eq!(
            s.attack(ParticipantId(1), Position::new(0, 0)),
            Err(GameError::SessionNotActive)
        );
    }

    #[test]
    fn random_attack_takes_the_last_cell_then_runs_dry() {
        let mut s = active_session();
        let mut rng = StdRng::seed_from_u64(9);
        let last = Position::new(9, 9);
        {
            let shots = &mut s.seat_mut(Seat::First).shots;
            let all: Vec<_> = shots.unfired().filter(|&pos| pos != last).collect();
            for pos in all {
                shots.mark(pos);
            }
        }
        let report = s.random_attack(ParticipantId(1), &mut rng).unwrap();
        assert_eq!(report.position, last);
        assert_eq!(report.outcome, AttackOutcome::Miss);

        s.turn = Some(Seat::First);
        assert_eq!(
            s.random_attack(ParticipantId(1), &mut rng),
            Err(GameError::NoLegalTargets)
        );
    }

    #[test]
    fn random_attack_never_lands_on_contour() {
        let mut s = active_session();
        let mut rng = StdRng::seed_from_u64(21);
        let mut contour = Vec::new();
        for x in 2..6 {
            contour = s.attack(ParticipantId(1), Position::new(x, 2)).unwrap().contour;
        }
        // Revive the session so random attacks can continue after the kill.
        s.status = Status::Active;
        s.winner = None;
        while s.seat(Seat::First).shots.remaining() > 0 {
            s.turn = Some(Seat::First);
            let report = s.random_attack(ParticipantId(1), &mut rng).unwrap();
            assert!(!contour.contains(&report.position));
        }
    }
}
