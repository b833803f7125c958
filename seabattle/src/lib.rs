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
//! Session engine for real-time, two-player Battleship contests.
//!
//! Humans and automated opponents are paired into [`Session`]s held by a
//! [`SessionRegistry`]. Each session tracks both fleets, resolves attacks (hits keep the
//! turn, kills reveal the water around the sunk ship), and declares a winner once a fleet
//! is destroyed. Automated opponents move after a short think-delay driven by the
//! [`TurnScheduler`].
//!
//! Most users want [`dispatcher::spawn`], which runs an [`Engine`] on a tokio task and
//! hands back an [`EngineHandle`] plus a stream of [`GameEvent`]s:
//!
//! ```no_run
//! use seabattle::{dispatcher, ConnectionId, EngineConfig, Entrant, RandomStrategy};
//!
//! # async fn demo() -> Result<(), seabattle::GameError> {
//! let (engine, mut events, _task) = dispatcher::spawn(EngineConfig::default())?;
//! let session = engine
//!     .create_session(
//!         Entrant::human("ann", ConnectionId(1)),
//!         Entrant::automated("bot", RandomStrategy::new()),
//!     )
//!     .await?;
//! # let _ = (session, events.recv().await);
//! # Ok(())
//! # }
//! ```

pub use self::{
    attack::AttackOutcome,
    board::{Dimensions, Position},
    config::EngineConfig,
    dispatcher::{EngineHandle, EventStream, GameEvent},
    engine::{Disconnected, Engine},
    errors::GameError,
    fleet::{CannotPlaceReason, Fleet, FleetError},
    participant::{
        ConnectionId, Controller, Entrant, ParticipantId, RandomStrategy, Seat, SessionId,
        Strategy,
    },
    registry::{LookupEntry, SessionRegistry},
    scheduler::TurnScheduler,
    session::{AttackReport, FleetReport, Session, Status},
    ships::{Orientation, Placement, ShipClass},
    view::{BoardView, CellView, SessionView},
};

pub mod attack;
pub mod board;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod errors;
pub mod fleet;
pub mod participant;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod ships;
pub mod view;
