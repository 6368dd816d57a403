//! Crash-tolerant state tracking for a fuel-limited grid agent.
//!
//! The host process driving the agent may be killed at any instant. Everything
//! in this crate exists so that, on the next start, the agent's position,
//! heading, fuel and inventory can be reconciled with the world instead of
//! guessed.

#![forbid(unsafe_code)]

pub mod error;
pub mod geometry;
pub mod inventory;
pub mod result;
pub mod rng;
pub mod sim;
pub mod storage;
pub mod tracker;
pub mod world;

pub use error::{ParseNameError, StorageError, TrackerError};
pub use geometry::{Heading, Position, Turn};
pub use inventory::{Inventory, InventoryDelta, ItemMatch, ItemStack, SLOT_COUNT, STACK_LIMIT};
pub use result::{ActionResult, OutcomeKind, ResultCode};
pub use rng::{DeterministicRng, SplitMix64};
pub use sim::{Block, JournaledWorld, SimWorld, WorldSnapshot};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use tracker::{
    Halt, InFlightRecord, Manipulation, Primitive, Recovery, SaveRecord, Startup, Tracker,
};
pub use world::{
    DigOutcome, DropOutcome, MoveDirection, MoveOutcome, PlaceOutcome, Side, SuckOutcome,
    TurnOutcome, WorldMut, WorldView,
};
