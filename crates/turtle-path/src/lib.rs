//! Resumable behavior trees ("action paths") for a tracked grid agent.
//!
//! An [`ActionPath`] owns a head [`Node`], the [`Registry`] used to load saved
//! trees, and the [`PathState`] scratch space. Each [`ActionPath::tick`]
//! evaluates the tree once; nodes that span several ticks keep their progress
//! in their own fields or in the path state, so the whole path can be saved
//! after any tick and resumed in a new process.

#![forbid(unsafe_code)]

pub mod composites;
pub mod decorators;
pub mod error;
pub mod leaves;
pub mod node;
pub mod path;
pub mod registry;
pub mod state;

pub use composites::{RandomSelector, Selector, Sequence};
pub use decorators::{
    DieOnFailure, Inverter, Repeater, RepeatUntilFailure, ResultInterpreter, RetryOnFailure,
    Succeeder,
};
pub use error::{ConfigError, PathError};
pub use leaves::{
    CountMode, DigAction, DropAction, FuelCheck, InventoryCheck, InventorySelect, MoveAction,
    OnBlocked, PlaceAction, SelectSlot, SuckAction, TurnAction,
};
pub use node::{CustomNode, Node, NodeRecord};
pub use path::{ActionPath, PathRecord};
pub use registry::{DecodeFn, Registry};
pub use state::{PathState, StateKey};
