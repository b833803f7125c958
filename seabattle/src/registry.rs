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
//! Ownership of live sessions, and the index of which human is playing where.

use std::collections::HashMap;

use tracing::info;

use crate::{
    board::Dimensions,
    errors::GameError,
    participant::{Entrant, Participant, ParticipantId, SessionId},
    session::Session,
};

/// Where a human identity is currently playing.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LookupEntry {
    /// The live session the identity is in.
    pub session: SessionId,
    /// The identity's participant in that session.
    pub participant: ParticipantId,
}

/// Live sessions indexed by ID, plus an index from human identity to their session. A
/// human identity is in at most one live session at a time.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    identities: HashMap<String, LookupEntry>,
    next_session: u64,
    next_participant: u64,
}

impl SessionRegistry {
    /// Construct an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forming session for two entrants. Fails without side effects if either
    /// human entrant is already in a live session, or if both are the same human.
    pub fn create(
        &mut self,
        dim: Dimensions,
        first: Entrant,
        second: Entrant,
    ) -> Result<SessionId, GameError> {
        for entrant in [&first, &second].iter() {
            if !entrant.controller.is_automated() && self.is_busy(&entrant.name) {
                return Err(GameError::IdentityBusy(entrant.name.clone()));
            }
        }
        if !first.controller.is_automated()
            && !second.controller.is_automated()
            && first.name == second.name
        {
            return Err(GameError::IdentityBusy(second.name));
        }

        self.next_session += 1;
        let id = SessionId(self.next_session);
        let participants = [
            Participant::new(self.next_participant_id(), first, dim),
            Participant::new(self.next_participant_id(), second, dim),
        ];
        for participant in participants.iter().filter(|p| !p.is_automated()) {
            self.identities.insert(
                participant.name.clone(),
                LookupEntry {
                    session: id,
                    participant: participant.id,
                },
            );
        }
        info!(
            session = %id,
            first = participants[0].name(),
            second = participants[1].name(),
            "session created"
        );
        self.sessions.insert(id, Session::new(id, dim, participants));
        Ok(id)
    }

    fn next_participant_id(&mut self) -> ParticipantId {
        self.next_participant += 1;
        ParticipantId(self.next_participant)
    }

    /// Get the session with the given ID.
    pub fn get(&self, id: SessionId) -> Result<&Session, GameError> {
        self.sessions.get(&id).ok_or(GameError::SessionNotFound(id))
    }

    /// Mutably get the session with the given ID.
    pub fn get_mut(&mut self, id: SessionId) -> Result<&mut Session, GameError> {
        self.sessions
            .get_mut(&id)
            .ok_or(GameError::SessionNotFound(id))
    }

    /// Find where a human identity is playing.
    pub fn lookup(&self, name: &str) -> Option<LookupEntry> {
        self.identities.get(name).copied()
    }

    /// Whether the human identity is in a live session.
    pub fn is_busy(&self, name: &str) -> bool {
        self.identities.contains_key(name)
    }

    /// Remove a session and the identity entries pointing at it.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        for participant in session.participants() {
            if self.lookup(participant.name()).map(|entry| entry.session) == Some(id) {
                self.identities.remove(participant.name());
            }
        }
        info!(session = %id, "session removed");
        Some(session)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
