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
//! Engine configuration.

use std::time::Duration;

use crate::{
    board::Dimensions,
    participant::Seat,
    ships::{standard_fleet, ShipClass},
};

/// Default side length of the square board.
pub const BOARD_SIZE: usize = 10;

/// Default delay before an automated participant's move is applied.
pub const THINK_DELAY: Duration = Duration::from_millis(700);

/// Settings shared by every session of an engine.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EngineConfig {
    /// Side length of the square board.
    pub board_size: usize,
    /// Delay before an automated participant's move is applied.
    pub think_delay: Duration,
    /// Ship classes every participant must field.
    pub fleet: Vec<ShipClass>,
    /// Seed for the engine's random choices. Seeded from entropy when absent.
    pub seed: Option<u64>,
    /// Seat that attacks first in every session. Random when absent.
    pub first_seat: Option<Seat>,
}

impl EngineConfig {
    /// The board dimensions described by this config. Returns `None` for a zero size.
    pub fn dimensions(&self) -> Option<Dimensions> {
        Dimensions::try_new(self.board_size, self.board_size)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board_size: BOARD_SIZE,
            think_delay: THINK_DELAY,
            fleet: standard_fleet(),
            seed: None,
            first_seat: None,
        }
    }
}
