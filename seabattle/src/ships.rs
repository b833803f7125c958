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
//! Types used for defining ships and their placements.

use rand::{
    distributions::{Distribution, Standard},
    Rng,
};

use crate::board::Position;

/// Size class of a ship. Determines its length.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ShipClass {
    /// Small: length 1.
    Small,
    /// Medium: length 2.
    Medium,
    /// Large: length 3.
    Large,
    /// Huge: length 4.
    Huge,
}

impl ShipClass {
    /// All ship classes, shortest first.
    pub const ALL: &'static [ShipClass] = &[
        ShipClass::Small,
        ShipClass::Medium,
        ShipClass::Large,
        ShipClass::Huge,
    ];

    /// Get the length of this ship class.
    pub fn length(self) -> usize {
        match self {
            ShipClass::Small => 1,
            ShipClass::Medium => 2,
            ShipClass::Large => 3,
            ShipClass::Huge => 4,
        }
    }
}

/// The standard fleet: one huge, two large, three medium and four small ships.
pub fn standard_fleet() -> Vec<ShipClass> {
    let mut fleet = Vec::with_capacity(10);
    for &class in ShipClass::ALL.iter().rev() {
        let count = 5 - class.length();
        fleet.extend(std::iter::repeat(class).take(count));
    }
    fleet
}

/// Direction a ship extends from its origin.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Orientation {
    /// Extends along increasing `x`.
    Horizontal,
    /// Extends along increasing `y`.
    Vertical,
}

impl Distribution<Orientation> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Orientation {
        if rng.gen() {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// Placement of a single ship on a board.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Placement {
    /// Class of the ship, which sets its length.
    pub class: ShipClass,
    /// Cell the ship starts from.
    pub origin: Position,
    /// Direction the ship extends from the origin.
    pub orientation: Orientation,
}

impl Placement {
    /// Construct a placement.
    pub fn new(class: ShipClass, origin: Position, orientation: Orientation) -> Self {
        Self {
            class,
            origin,
            orientation,
        }
    }

    /// Get the length of the placed ship.
    pub fn len(&self) -> usize {
        self.class.length()
    }

    /// Iterate the cells this ship occupies, starting from the origin. Cells are not
    /// bounds-checked.
    pub fn cells(&self) -> impl Iterator<Item = Position> {
        let Placement {
            origin,
            orientation,
            ..
        } = *self;
        (0..self.len()).map(move |i| match orientation {
            Orientation::Horizontal => Position::new(origin.x + i, origin.y),
            Orientation::Vertical => Position::new(origin.x, origin.y + i),
        })
    }
}

/// Identifies a ship within one participant's board. Assigned in fleet order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ShipId(pub usize);
