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
//! Deferred automated moves.
//!
//! A timer is a spawned task that sleeps for the think-delay and then posts a [`Wake`]
//! back to the dispatcher's event stream. The scheduler keeps one abort handle per
//! `(session, participant)` key. A wake only counts if its generation still matches the
//! armed timer, so a wake that was already queued when its timer got cancelled or
//! re-armed is ignored.

use std::{collections::HashMap, time::Duration};

use tokio::{sync::mpsc, task::AbortHandle, time::Instant};
use tracing::debug;

use crate::participant::{ParticipantId, SessionId};

/// Key of a pending automated move.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TimerKey {
    /// Session the move belongs to.
    pub session: SessionId,
    /// Automated participant due to move.
    pub participant: ParticipantId,
}

/// Notification that a timer elapsed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Wake {
    /// The timer that elapsed.
    pub key: TimerKey,
    /// Arming this wake belongs to. Stale once the key is cancelled or re-armed.
    generation: u64,
}

#[derive(Debug)]
struct Pending {
    generation: u64,
    handle: AbortHandle,
}

/// Arms and cancels deferred automated moves.
#[derive(Debug)]
pub struct TurnScheduler {
    think_delay: Duration,
    wakes: mpsc::UnboundedSender<Wake>,
    pending: HashMap<TimerKey, Pending>,
    next_generation: u64,
}

impl TurnScheduler {
    /// Create a scheduler that posts elapsed timers to `wakes`.
    pub fn new(think_delay: Duration, wakes: mpsc::UnboundedSender<Wake>) -> Self {
        Self {
            think_delay,
            wakes,
            pending: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Get the delay applied to every timer.
    pub fn think_delay(&self) -> Duration {
        self.think_delay
    }

    /// Arm the timer for `key`, replacing any timer already pending for it. The delay
    /// counts from this call, not from when the timer task first runs. Must be called
    /// from within a tokio runtime.
    pub fn arm(&mut self, key: TimerKey) {
        self.cancel(key);
        self.next_generation += 1;
        let wake = Wake {
            key,
            generation: self.next_generation,
        };
        let deadline = Instant::now() + self.think_delay;
        let wakes = self.wakes.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // The dispatcher may already be gone.
            let _ = wakes.send(wake);
        });
        debug!(session = %key.session, participant = %key.participant, "automated move armed");
        self.pending.insert(
            key,
            Pending {
                generation: wake.generation,
                handle: task.abort_handle(),
            },
        );
    }

    /// Cancel the timer for `key`. Cancelling a key with no pending timer is a no-op.
    /// Returns true if a timer was pending.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        match self.pending.remove(&key) {
            Some(pending) => {
                pending.handle.abort();
                debug!(session = %key.session, participant = %key.participant, "automated move cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer belonging to `session`.
    pub fn cancel_session(&mut self, session: SessionId) {
        let keys: Vec<_> = self
            .pending
            .keys()
            .filter(|key| key.session == session)
            .copied()
            .collect();
        for key in keys {
            self.cancel(key);
        }
    }

    /// Claim an elapsed timer. Returns false if the wake is stale: its timer was
    /// cancelled or re-armed after it fired.
    pub fn claim(&mut self, wake: Wake) -> bool {
        match self.pending.get(&wake.key) {
            Some(pending) if pending.generation == wake.generation => {
                self.pending.remove(&wake.key);
                true
            }
            _ => false,
        }
    }

    /// Whether a timer is pending for `key`.
    pub fn is_pending(&self, key: TimerKey) -> bool {
        self.pending.contains_key(&key)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no timers are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::advance;

    use super::*;

    const DELAY: Duration = Duration::from_millis(700);

    fn key(session: u64, participant: u64) -> TimerKey {
        TimerKey {
            session: SessionId(session),
            participant: ParticipantId(participant),
        }
    }

    /// Let spawned timer tasks observe the advanced clock.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn armed_timer_wakes_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TurnScheduler::new(DELAY, tx);
        scheduler.arm(key(1, 2));
        settle().await;
        assert!(rx.try_recv().is_err());

        advance(DELAY).await;
        settle().await;
        let wake = rx.try_recv().unwrap();
        assert_eq!(wake.key, key(1, 2));
        assert!(scheduler.claim(wake));
        assert!(!scheduler.claim(wake));
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delay_counts_from_arming() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TurnScheduler::new(DELAY, tx);
        scheduler.arm(key(1, 2));
        // The timer task has not run yet when the clock moves.
        advance(DELAY).await;
        settle().await;
        let wake = rx.try_recv().unwrap();
        assert!(scheduler.claim(wake));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_wakes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TurnScheduler::new(DELAY, tx);
        scheduler.arm(key(1, 2));
        scheduler.arm(key(3, 4));
        scheduler.cancel_session(SessionId(1));
        assert!(!scheduler.cancel(key(1, 2)));
        assert!(scheduler.is_pending(key(3, 4)));

        advance(DELAY * 2).await;
        settle().await;
        assert_eq!(rx.try_recv().unwrap().key, key(3, 4));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_pending_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TurnScheduler::new(DELAY, tx);
        scheduler.arm(key(1, 2));
        advance(DELAY).await;
        settle().await;
        let stale = rx.try_recv().unwrap();

        // Re-armed before the first wake was processed.
        scheduler.arm(key(1, 2));
        assert_eq!(scheduler.len(), 1);
        assert!(!scheduler.claim(stale));

        advance(DELAY).await;
        settle().await;
        let fresh = rx.try_recv().unwrap();
        assert!(scheduler.claim(fresh));
    }
}
