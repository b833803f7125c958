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
//! Serialized access to an [`Engine`] from any number of tasks.
//!
//! One task owns the engine. Requests from [`EngineHandle`]s and elapsed automated-move
//! timers are pulled from a single loop and applied one at a time, so no two operations
//! ever touch a session concurrently.

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    board::Position,
    config::EngineConfig,
    engine::{Disconnected, Engine},
    errors::GameError,
    participant::{Entrant, ParticipantId, SessionId},
    registry::LookupEntry,
    scheduler::Wake,
    session::{AttackReport, FleetReport, Status},
    ships::Placement,
    view::SessionView,
};

/// Notifications for the transport layer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum GameEvent {
    /// Both fleets are in.
    Started {
        session: SessionId,
        turn_owner: ParticipantId,
    },
    /// An attack was applied, by a human request or an automated move.
    Attacked(AttackReport),
    /// A fleet was destroyed. The session is gone.
    Finished {
        session: SessionId,
        winner: ParticipantId,
    },
    /// A participant disconnected. The session is gone.
    OpponentLeft {
        session: SessionId,
        opponent: ParticipantId,
        opponent_name: String,
    },
}

/// Stream of [`GameEvent`]s published by the dispatcher.
pub type EventStream = mpsc::UnboundedReceiver<GameEvent>;

type Reply<T> = oneshot::Sender<Result<T, GameError>>;

#[derive(Debug)]
enum Command {
    CreateSession {
        first: Entrant,
        second: Entrant,
        reply: Reply<SessionId>,
    },
    SubmitFleet {
        session: SessionId,
        participant: ParticipantId,
        placements: Vec<Placement>,
        reply: Reply<FleetReport>,
    },
    Attack {
        session: SessionId,
        participant: ParticipantId,
        pos: Position,
        reply: Reply<AttackReport>,
    },
    RandomAttack {
        session: SessionId,
        participant: ParticipantId,
        reply: Reply<AttackReport>,
    },
    Disconnect {
        name: String,
        reply: oneshot::Sender<Option<Disconnected>>,
    },
    IsBusy {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    Lookup {
        name: String,
        reply: oneshot::Sender<Option<LookupEntry>>,
    },
    View {
        session: SessionId,
        participant: ParticipantId,
        reply: Reply<SessionView>,
    },
}

/// Clonable handle for sending requests to a running dispatcher.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl EngineHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, GameError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| GameError::EngineClosed)?;
        rx.await.map_err(|_| GameError::EngineClosed)
    }

    /// See [`Engine::create_session`].
    pub async fn create_session(&self, first: Entrant, second: Entrant) -> Result<SessionId, GameError> {
        self.request(|reply| Command::CreateSession {
            first,
            second,
            reply,
        })
        .await?
    }

    /// See [`Engine::submit_fleet`].
    pub async fn submit_fleet(
        &self,
        session: SessionId,
        participant: ParticipantId,
        placements: Vec<Placement>,
    ) -> Result<FleetReport, GameError> {
        self.request(|reply| Command::SubmitFleet {
            session,
            participant,
            placements,
            reply,
        })
        .await?
    }

    /// See [`Engine::attack`].
    pub async fn attack(
        &self,
        session: SessionId,
        participant: ParticipantId,
        pos: Position,
    ) -> Result<AttackReport, GameError> {
        self.request(|reply| Command::Attack {
            session,
            participant,
            pos,
            reply,
        })
        .await?
    }

    /// See [`Engine::random_attack`].
    pub async fn random_attack(
        &self,
        session: SessionId,
        participant: ParticipantId,
    ) -> Result<AttackReport, GameError> {
        self.request(|reply| Command::RandomAttack {
            session,
            participant,
            reply,
        })
        .await?
    }

    /// See [`Engine::disconnect`].
    pub async fn disconnect(&self, name: impl Into<String>) -> Result<Option<Disconnected>, GameError> {
        let name = name.into();
        self.request(|reply| Command::Disconnect { name, reply }).await
    }

    /// See [`Engine::is_busy`].
    pub async fn is_busy(&self, name: impl Into<String>) -> Result<bool, GameError> {
        let name = name.into();
        self.request(|reply| Command::IsBusy { name, reply }).await
    }

    /// See [`Engine::lookup`].
    pub async fn lookup(&self, name: impl Into<String>) -> Result<Option<LookupEntry>, GameError> {
        let name = name.into();
        self.request(|reply| Command::Lookup { name, reply }).await
    }

    /// See [`Engine::view`].
    pub async fn view(
        &self,
        session: SessionId,
        participant: ParticipantId,
    ) -> Result<SessionView, GameError> {
        self.request(|reply| Command::View {
            session,
            participant,
            reply,
        })
        .await?
    }
}

/// Start a dispatcher task owning a new engine. Must be called from within a tokio
/// runtime. The task stops once every [`EngineHandle`] is dropped. Fails if the config
/// cannot build an [`Engine`].
pub fn spawn(
    config: EngineConfig,
) -> Result<(EngineHandle, EventStream, JoinHandle<()>), GameError> {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (wakes_tx, wakes_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let engine = Engine::new(config, wakes_tx)?;
    let task = tokio::spawn(run(engine, commands_rx, wakes_rx, events_tx));
    Ok((
        EngineHandle {
            commands: commands_tx,
        },
        events_rx,
        task,
    ))
}

async fn run(
    mut engine: Engine,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut wakes: mpsc::UnboundedReceiver<Wake>,
    events: mpsc::UnboundedSender<GameEvent>,
) {
    info!("dispatcher started");
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => handle(&mut engine, command, &events),
                None => break,
            },
            Some(wake) = wakes.recv() => {
                if let Some(report) = engine.wake(wake) {
                    publish_attack(&events, report);
                }
            }
        }
    }
    info!(live_sessions = engine.registry().len(), "dispatcher stopped");
}

fn handle(engine: &mut Engine, command: Command, events: &mpsc::UnboundedSender<GameEvent>) {
    match command {
        Command::CreateSession {
            first,
            second,
            reply,
        } => {
            let res = engine.create_session(first, second);
            if let Ok(id) = res {
                // Two automated entrants are both ready at creation.
                if let Ok(session) = engine.registry().get(id) {
                    if let (Status::Active, Some(turn_owner)) = (session.status(), session.turn_owner()) {
                        publish(events, GameEvent::Started { session: id, turn_owner });
                    }
                }
            }
            let _ = reply.send(res);
        }
        Command::SubmitFleet {
            session,
            participant,
            placements,
            reply,
        } => {
            let res = engine.submit_fleet(session, participant, placements);
            if let Ok(FleetReport {
                ready: true,
                turn_owner: Some(turn_owner),
            }) = res
            {
                publish(events, GameEvent::Started { session, turn_owner });
            }
            let _ = reply.send(res);
        }
        Command::Attack {
            session,
            participant,
            pos,
            reply,
        } => {
            let res = engine.attack(session, participant, pos);
            if let Ok(report) = &res {
                publish_attack(events, report.clone());
            }
            let _ = reply.send(res);
        }
        Command::RandomAttack {
            session,
            participant,
            reply,
        } => {
            let res = engine.random_attack(session, participant);
            if let Ok(report) = &res {
                publish_attack(events, report.clone());
            }
            let _ = reply.send(res);
        }
        Command::Disconnect { name, reply } => {
            let left = engine.disconnect(&name);
            if let Some(left) = &left {
                publish(
                    events,
                    GameEvent::OpponentLeft {
                        session: left.session,
                        opponent: left.opponent,
                        opponent_name: left.opponent_name.clone(),
                    },
                );
            }
            let _ = reply.send(left);
        }
        Command::IsBusy { name, reply } => {
            let _ = reply.send(engine.is_busy(&name));
        }
        Command::Lookup { name, reply } => {
            let _ = reply.send(engine.lookup(&name));
        }
        Command::View {
            session,
            participant,
            reply,
        } => {
            let _ = reply.send(engine.view(session, participant));
        }
    }
}

fn publish_attack(events: &mpsc::UnboundedSender<GameEvent>, report: AttackReport) {
    let finished = report.winner.map(|winner| GameEvent::Finished {
        session: report.session,
        winner,
    });
    publish(events, GameEvent::Attacked(report));
    if let Some(finished) = finished {
        publish(events, finished);
    }
}

fn publish(events: &mpsc::UnboundedSender<GameEvent>, event: GameEvent) {
    if events.send(event).is_err() {
        debug!("no event listener");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        participant::ConnectionId,
        ships::{Orientation, ShipClass},
    };

    fn config() -> EngineConfig {
        EngineConfig {
            fleet: vec![ShipClass::Small],
            seed: Some(5),
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn human_session_publishes_lifecycle() {
        let (handle, mut events, _task) = spawn(config()).unwrap();
        let id = handle
            .create_session(Entrant::human("ann", ConnectionId(1)), Entrant::human("bob", ConnectionId(2)))
            .await
            .unwrap();
        let entry = handle.lookup("ann").await.unwrap().unwrap();
        assert_eq!(entry.session, id);
        assert_eq!(entry.participant, ParticipantId(1));
        let view = handle.view(id, ParticipantId(1)).await.unwrap();
        assert_eq!(view.opponent, ParticipantId(2));
        assert_eq!(view.opponent_name, "bob");

        let small = |x, y| vec![Placement::new(ShipClass::Small, Position::new(x, y), Orientation::Vertical)];
        handle.submit_fleet(id, ParticipantId(1), small(0, 0)).await.unwrap();
        let report = handle.submit_fleet(id, ParticipantId(2), small(5, 5)).await.unwrap();
        let first = report.turn_owner.unwrap();
        assert_eq!(
            events.recv().await,
            Some(GameEvent::Started {
                session: id,
                turn_owner: first,
            })
        );

        let target = if first == ParticipantId(1) {
            Position::new(5, 5)
        } else {
            Position::new(0, 0)
        };
        let report = handle.attack(id, first, target).await.unwrap();
        assert_eq!(report.winner, Some(first));
        assert_eq!(events.recv().await, Some(GameEvent::Attacked(report)));
        assert_eq!(
            events.recv().await,
            Some(GameEvent::Finished {
                session: id,
                winner: first,
            })
        );
        assert!(!handle.is_busy("ann").await.unwrap());
        assert_eq!(
            handle.view(id, first).await,
            Err(GameError::SessionNotFound(id))
        );
    }

    #[tokio::test]
    async fn disconnect_publishes_opponent_left() {
        let (handle, mut events, _task) = spawn(config()).unwrap();
        let id = handle
            .create_session(Entrant::human("ann", ConnectionId(1)), Entrant::human("bob", ConnectionId(2)))
            .await
            .unwrap();
        let left = handle.disconnect("bob").await.unwrap().unwrap();
        assert_eq!(left.opponent_name, "ann");
        assert_eq!(
            events.recv().await,
            Some(GameEvent::OpponentLeft {
                session: id,
                opponent: left.opponent,
                opponent_name: "ann".into(),
            })
        );
        assert_eq!(handle.disconnect("bob").await, Ok(None));
    }

    #[tokio::test]
    async fn dropping_handles_stops_the_loop() {
        let (handle, _events, task) = spawn(config()).unwrap();
        let other = handle.clone();
        drop(handle);
        assert!(!other.is_busy("ann").await.unwrap());
        drop(other);
        task.await.unwrap();
    }
}
