//! Host primitives.
//!
//! The crate does not prescribe how a host talks to the agent; it only needs
//! these queries and effects. Only [`WorldMut::step`] and [`WorldMut::turn`]
//! consume fuel, exactly one unit each when they succeed.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Heading, ItemStack, ParseNameError, Position, StorageError, Turn};

/// Where a manipulator acts, relative to the agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    Front,
    Up,
    Down,
}

impl Side {
    pub fn delta(self, facing: Heading) -> Position {
        match self {
            Side::Front => facing.delta(1),
            Side::Up => Heading::Up.delta(1),
            Side::Down => Heading::Down.delta(1),
        }
    }
}

impl FromStr for Side {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" | "forward" => Ok(Side::Front),
            "up" => Ok(Side::Up),
            "down" => Ok(Side::Down),
            _ => Err(ParseNameError::new("side", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Forward,
    Back,
    Up,
    Down,
}

impl MoveDirection {
    /// The side that can be probed for an obstruction before moving. Nothing
    /// can be detected behind the agent.
    pub fn probe_side(self) -> Option<Side> {
        match self {
            MoveDirection::Forward => Some(Side::Front),
            MoveDirection::Up => Some(Side::Up),
            MoveDirection::Down => Some(Side::Down),
            MoveDirection::Back => None,
        }
    }

    pub fn delta(self, facing: Heading, steps: i32) -> Position {
        match self {
            MoveDirection::Forward => facing.delta(steps),
            MoveDirection::Back => facing.delta(-steps),
            MoveDirection::Up => Heading::Up.delta(steps),
            MoveDirection::Down => Heading::Down.delta(steps),
        }
    }
}

impl FromStr for MoveDirection {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" | "front" => Ok(MoveDirection::Forward),
            "back" => Ok(MoveDirection::Back),
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            _ => Err(ParseNameError::new("move direction", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved,
    Obstructed,
    NoFuel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Turned,
    NoFuel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigOutcome {
    Dug,
    NothingToDig,
    Unbreakable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceOutcome {
    Placed,
    Obstructed,
    NothingToPlace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropOutcome {
    Dropped,
    NothingToDrop,
    NoRoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuckOutcome {
    Sucked,
    NothingToSuck,
    InventoryFull,
}

/// Read-only access to the agent's live state.
pub trait WorldView {
    fn fuel_level(&self) -> u32;

    /// True if a block occupies the cell on `side`.
    fn detect(&self, side: Side) -> bool;

    /// Currently selected slot, 1-based.
    fn selected_slot(&self) -> u8;

    /// Contents of a 1-based slot.
    fn item_in_slot(&self, slot: u8) -> Option<ItemStack>;
}

/// Effects against the world. Implementations must not retry internally.
pub trait WorldMut: WorldView {
    fn step(&mut self, direction: MoveDirection) -> MoveOutcome;

    fn turn(&mut self, turn: Turn) -> TurnOutcome;

    fn dig(&mut self, side: Side) -> DigOutcome;

    fn place(&mut self, side: Side) -> PlaceOutcome;

    /// Drop up to `count` items from the selected slot (the whole stack when
    /// `None`).
    fn drop_items(&mut self, side: Side, count: Option<u32>) -> DropOutcome;

    /// Pick up to `count` items into the inventory.
    fn suck(&mut self, side: Side, count: Option<u32>) -> SuckOutcome;

    /// Returns false if the slot does not exist.
    fn select(&mut self, slot: u8) -> bool;

    /// Make every effect issued so far durable. Called by the tracker after
    /// each effect and before the effect is committed to its own records.
    /// Hosts whose world persists itself need not override this.
    fn sync(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}
