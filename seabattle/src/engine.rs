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
//! The operations the engine exposes to the transport and matchmaking layers.
//!
//! [`Engine`] is plain mutable state: it expects to be driven one call at a time, which
//! is what the [`dispatcher`](crate::dispatcher) guarantees. Operations that arm an
//! automated move must run inside a tokio runtime.

use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    board::{Dimensions, Position},
    config::EngineConfig,
    errors::GameError,
    fleet::Fleet,
    participant::{Controller, Entrant, ParticipantId, Seat, SessionId},
    registry::{LookupEntry, SessionRegistry},
    scheduler::{TimerKey, TurnScheduler, Wake},
    session::{AttackReport, FleetReport, Status},
    ships::Placement,
    view::SessionView,
};

/// Outcome of a forced termination, for notifying the remaining participant.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Disconnected {
    /// The session that was torn down.
    pub session: SessionId,
    /// The participant left behind.
    pub opponent: ParticipantId,
    /// Display name of the participant left behind.
    pub opponent_name: String,
}

/// Owns every live session and the timers of their automated participants.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    dim: Dimensions,
    registry: SessionRegistry,
    scheduler: TurnScheduler,
    rng: StdRng,
}

impl Engine {
    /// Create an engine. Elapsed automated-move timers are posted to `wakes` and must be
    /// fed back through [`Engine::wake`]. Fails if the configured board size is zero.
    pub fn new(
        config: EngineConfig,
        wakes: mpsc::UnboundedSender<Wake>,
    ) -> Result<Self, GameError> {
        let dim = config
            .dimensions()
            .ok_or(GameError::InvalidBoardSize(config.board_size))?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            dim,
            scheduler: TurnScheduler::new(config.think_delay, wakes),
            registry: SessionRegistry::new(),
            config,
            rng,
        })
    }

    /// Get the configuration of this engine.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the registry of live sessions.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Get the scheduler of automated moves.
    pub fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    /// Whether the human identity is in a live session.
    pub fn is_busy(&self, name: &str) -> bool {
        self.registry.is_busy(name)
    }

    /// Find where a human identity is playing.
    pub fn lookup(&self, name: &str) -> Option<LookupEntry> {
        self.registry.lookup(name)
    }

    /// Pair two entrants in a new session. Automated entrants arrange their fleet and
    /// are ready immediately.
    pub fn create_session(&mut self, first: Entrant, second: Entrant) -> Result<SessionId, GameError> {
        let id = self.registry.create(self.dim, first, second)?;
        self.registry.get_mut(id)?.first_seat = self.config.first_seat;
        if let Err(err) = self.ready_automated(id) {
            warn!(session = %id, %err, "automated fleet rejected");
            self.registry.remove(id);
            return Err(err);
        }
        self.schedule_turn(id);
        Ok(id)
    }

    /// Arrange and submit fleets for the automated participants of a session.
    fn ready_automated(&mut self, id: SessionId) -> Result<(), GameError> {
        let session = self.registry.get_mut(id)?;
        for &seat in Seat::BOTH.iter() {
            let participant = session.seat_mut(seat);
            let arranged = match &mut participant.controller {
                Controller::Automated(strategy) => {
                    strategy.arrange_fleet(self.dim, &self.config.fleet)?
                }
                Controller::Human(_) => continue,
            };
            let pid = participant.id;
            let fleet = Fleet::validate(self.dim, &self.config.fleet, arranged.into_placements())?;
            session.submit_fleet(pid, &fleet, &mut self.rng)?;
        }
        Ok(())
    }

    /// Submit a participant's fleet. Once both fleets are in the session becomes active.
    pub fn submit_fleet(
        &mut self,
        session: SessionId,
        participant: ParticipantId,
        placements: Vec<Placement>,
    ) -> Result<FleetReport, GameError> {
        let state = self.registry.get_mut(session)?;
        state.seat_of(participant)?;
        let fleet = Fleet::validate(self.dim, &self.config.fleet, placements)?;
        let report = state.submit_fleet(participant, &fleet, &mut self.rng)?;
        if report.ready {
            info!(session = %session, turn = ?report.turn_owner, "session started");
            self.schedule_turn(session);
        }
        Ok(report)
    }

    /// Fire at a chosen cell.
    pub fn attack(
        &mut self,
        session: SessionId,
        participant: ParticipantId,
        pos: Position,
    ) -> Result<AttackReport, GameError> {
        let report = self.registry.get_mut(session)?.attack(participant, pos)?;
        self.after_attack(&report);
        Ok(report)
    }

    /// Fire at a cell picked by the participant's controller.
    pub fn random_attack(
        &mut self,
        session: SessionId,
        participant: ParticipantId,
    ) -> Result<AttackReport, GameError> {
        let report = self
            .registry
            .get_mut(session)?
            .random_attack(participant, &mut self.rng)?;
        self.after_attack(&report);
        Ok(report)
    }

    /// Forcibly end the session the human identity is playing in. Returns `None` if the
    /// identity is not in a live session.
    pub fn disconnect(&mut self, name: &str) -> Option<Disconnected> {
        let entry = self.registry.lookup(name)?;
        let session = self.registry.get_mut(entry.session).ok()?;
        let opponent = session.opponent(entry.participant).ok()?;
        let left = Disconnected {
            session: entry.session,
            opponent: opponent.id(),
            opponent_name: opponent.name().to_owned(),
        };
        session.terminate();
        info!(session = %entry.session, %name, "participant disconnected");
        self.teardown(entry.session);
        Some(left)
    }

    /// Apply an elapsed automated-move timer. Stale timers, and timers whose session is
    /// gone or no longer waiting on that participant, do nothing.
    pub fn wake(&mut self, wake: Wake) -> Option<AttackReport> {
        if !self.scheduler.claim(wake) {
            debug!(session = %wake.key.session, "stale automated move ignored");
            return None;
        }
        let key = wake.key;
        let session = self.registry.get_mut(key.session).ok()?;
        if session.status() != Status::Active || session.turn_owner() != Some(key.participant) {
            return None;
        }
        match session.random_attack(key.participant, &mut self.rng) {
            Ok(report) => {
                self.after_attack(&report);
                Some(report)
            }
            Err(err) => {
                warn!(session = %key.session, participant = %key.participant, %err, "automated move failed");
                None
            }
        }
    }

    /// Snapshot the session as the given participant sees it.
    pub fn view(&self, session: SessionId, participant: ParticipantId) -> Result<SessionView, GameError> {
        SessionView::new(self.registry.get(session)?, participant)
    }

    /// Tear the session down if the attack won it, otherwise arm the next automated move
    /// if one is due.
    fn after_attack(&mut self, report: &AttackReport) {
        if let Some(winner) = report.winner {
            info!(session = %report.session, %winner, "session won");
            self.teardown(report.session);
        } else {
            self.schedule_turn(report.session);
        }
    }

    /// Arm a timer if the session is active and the turn owner is automated.
    fn schedule_turn(&mut self, id: SessionId) {
        let session = match self.registry.get(id) {
            Ok(session) if session.status() == Status::Active => session,
            _ => return,
        };
        let owner = match session.turn_owner() {
            Some(owner) => owner,
            None => return,
        };
        let automated = session
            .participant(owner)
            .map(|p| p.is_automated())
            .unwrap_or(false);
        if automated {
            self.scheduler.arm(TimerKey {
                session: id,
                participant: owner,
            });
        }
    }

    /// Cancel the session's timers and drop it from the registry.
    fn teardown(&mut self, id: SessionId) {
        self.scheduler.cancel_session(id);
        self.registry.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        attack::AttackOutcome,
        participant::{ConnectionId, RandomStrategy},
        ships::{Orientation, ShipClass},
    };

    fn config() -> EngineConfig {
        EngineConfig {
            fleet: vec![ShipClass::Huge],
            seed: Some(11),
            think_delay: Duration::from_millis(700),
            ..EngineConfig::default()
        }
    }

    fn engine() -> (Engine, mpsc::UnboundedReceiver<Wake>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Engine::new(config(), tx).unwrap(), rx)
    }

    fn huge_at(x: usize, y: usize) -> Vec<Placement> {
        vec![Placement::new(
            ShipClass::Huge,
            Position::new(x, y),
            Orientation::Horizontal,
        )]
    }

    fn ids(engine: &Engine, session: SessionId) -> (ParticipantId, ParticipantId) {
        let parts = engine.registry().get(session).unwrap().participants();
        (parts[0].id(), parts[1].id())
    }

    /// Start a human-vs-human session and return (session, turn owner, other).
    fn started(engine: &mut Engine, a: &str, b: &str) -> (SessionId, ParticipantId, ParticipantId) {
        let id = engine
            .create_session(Entrant::human(a, ConnectionId(1)), Entrant::human(b, ConnectionId(2)))
            .unwrap();
        let (p1, p2) = ids(engine, id);
        assert!(!engine.submit_fleet(id, p1, huge_at(2, 2)).unwrap().ready);
        let report = engine.submit_fleet(id, p2, huge_at(2, 2)).unwrap();
        let first = report.turn_owner.unwrap();
        let other = if first == p1 { p2 } else { p1 };
        (id, first, other)
    }

    #[test]
    fn zero_board_size_is_refused() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = EngineConfig {
            board_size: 0,
            ..config()
        };
        assert!(matches!(
            Engine::new(config, tx),
            Err(GameError::InvalidBoardSize(0))
        ));
    }

    #[test]
    fn unknown_session_and_participant() {
        let (mut engine, _wakes) = engine();
        assert_eq!(
            engine.attack(SessionId(99), ParticipantId(1), Position::new(0, 0)),
            Err(GameError::SessionNotFound(SessionId(99)))
        );
        let (id, _, _) = started(&mut engine, "ann", "bob");
        assert_eq!(
            engine.random_attack(id, ParticipantId(99)),
            Err(GameError::ParticipantNotFound(ParticipantId(99)))
        );
        assert_eq!(
            engine.submit_fleet(id, ParticipantId(99), huge_at(0, 0)),
            Err(GameError::ParticipantNotFound(ParticipantId(99)))
        );
    }

    #[test]
    fn invalid_fleets_are_rejected() {
        let (mut engine, _wakes) = engine();
        let id = engine
            .create_session(Entrant::human("ann", ConnectionId(1)), Entrant::human("bob", ConnectionId(2)))
            .unwrap();
        let (p1, _) = ids(&engine, id);
        assert!(matches!(
            engine.submit_fleet(id, p1, huge_at(8, 0)),
            Err(GameError::InvalidFleet(_))
        ));
        assert!(!engine.registry().get(id).unwrap().participant(p1).unwrap().is_ready());
    }

    #[test]
    fn winning_tears_the_session_down() {
        let (mut engine, _wakes) = engine();
        let (id, first, _) = started(&mut engine, "ann", "bob");
        for x in 2..5 {
            let report = engine.attack(id, first, Position::new(x, 2)).unwrap();
            assert_eq!(report.outcome, AttackOutcome::Shot);
        }
        let last = engine.attack(id, first, Position::new(5, 2)).unwrap();
        assert_eq!(last.outcome, AttackOutcome::Killed);
        assert_eq!(last.winner, Some(first));
        assert_eq!(last.next_turn, first);
        assert_eq!(last.contour.len(), 14);
        assert!(engine.registry().is_empty());
        assert!(!engine.is_busy("ann"));
        assert!(!engine.is_busy("bob"));
    }

    #[test]
    fn sessions_are_isolated() {
        let (mut engine, _wakes) = engine();
        let (one, one_first, _) = started(&mut engine, "ann", "bob");
        let (two, two_first, two_other) = started(&mut engine, "cat", "dan");
        let before = (
            engine.view(two, two_first).unwrap(),
            engine.view(two, two_other).unwrap(),
        );
        engine.attack(one, one_first, Position::new(2, 2)).unwrap();
        engine.attack(one, one_first, Position::new(0, 0)).unwrap();
        let after = (
            engine.view(two, two_first).unwrap(),
            engine.view(two, two_other).unwrap(),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn disconnect_reports_the_opponent() {
        let (mut engine, _wakes) = engine();
        let (id, _, _) = started(&mut engine, "ann", "bob");
        let (_, bob) = ids(&engine, id);
        let left = engine.disconnect("ann").unwrap();
        assert_eq!(left.session, id);
        assert_eq!(left.opponent, bob);
        assert_eq!(left.opponent_name, "bob");
        assert!(engine.registry().is_empty());
        assert_eq!(engine.disconnect("ann"), None);
        assert_eq!(engine.disconnect("bob"), None);
    }

    #[test]
    fn disconnect_while_forming_reports_the_opponent() {
        let (mut engine, _wakes) = engine();
        let id = engine
            .create_session(Entrant::human("ann", ConnectionId(1)), Entrant::human("bob", ConnectionId(2)))
            .unwrap();
        let (ann, bob) = ids(&engine, id);
        engine.submit_fleet(id, ann, huge_at(2, 2)).unwrap();
        let left = engine.disconnect("bob").unwrap();
        assert_eq!(
            left,
            Disconnected {
                session: id,
                opponent: ann,
                opponent_name: "ann".into(),
            }
        );
        assert!(!engine.is_busy("ann"));
        assert_eq!(engine.submit_fleet(id, bob, huge_at(2, 2)), Err(GameError::SessionNotFound(id)));
    }

    #[tokio::test(start_paused = true)]
    async fn automated_participant_is_ready_at_creation() {
        let (mut engine, _wakes) = engine();
        let id = engine
            .create_session(
                Entrant::human("ann", ConnectionId(1)),
                Entrant::automated("bot", RandomStrategy::seeded(4)),
            )
            .unwrap();
        let (ann, bot) = ids(&engine, id);
        let session = engine.registry().get(id).unwrap();
        assert!(session.participant(bot).unwrap().is_ready());
        assert_eq!(session.status(), Status::Forming);

        let report = engine.submit_fleet(id, ann, huge_at(0, 0)).unwrap();
        assert!(report.ready);
        let key = TimerKey {
            session: id,
            participant: bot,
        };
        assert_eq!(engine.scheduler().is_pending(key), report.turn_owner == Some(bot));
    }

    #[tokio::test(start_paused = true)]
    async fn bot_moves_after_think_delay_and_stops_on_disconnect() {
        let (mut engine, mut wakes) = engine();
        let id = engine
            .create_session(
                Entrant::human("ann", ConnectionId(1)),
                Entrant::automated("bot", RandomStrategy::seeded(4)),
            )
            .unwrap();
        let (ann, bot) = ids(&engine, id);
        let report = engine.submit_fleet(id, ann, huge_at(0, 0)).unwrap();
        if report.turn_owner == Some(ann) {
            // Miss on purpose to hand the turn to the bot.
            let board = engine
                .registry()
                .get(id)
                .unwrap()
                .participant(bot)
                .unwrap()
                .board()
                .unwrap();
            let water = Dimensions::default()
                .iter_positions()
                .find(|&pos| board.ship_at(pos).is_none())
                .unwrap();
            let report = engine.attack(id, ann, water).unwrap();
            assert_eq!(report.next_turn, bot);
        }
        let key = TimerKey {
            session: id,
            participant: bot,
        };
        assert!(engine.scheduler().is_pending(key));

        let wake = wakes.recv().await.unwrap();
        let report = engine.wake(wake).unwrap();
        assert_eq!(report.attacker, bot);

        if report.next_turn == bot {
            assert!(engine.scheduler().is_pending(key));
        }
        engine.disconnect("ann").unwrap();
        assert!(engine.scheduler().is_empty());
        tokio::time::advance(Duration::from_secs(5)).await;
        while let Ok(wake) = wakes.try_recv() {
            assert_eq!(engine.wake(wake), None);
        }
        assert!(engine.registry().is_empty());
    }
}
