//! Primitive actions built on the tracker.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use turtle_core::inventory::valid_slot;
use turtle_core::{
    ActionResult, Heading, ItemMatch, Manipulation, MoveDirection, MoveOutcome, Position,
    ResultCode, Side, Tracker, Turn, TurnOutcome,
};

use crate::node::from_params;
use crate::state::StateKey;
use crate::{ConfigError, Node, PathError, PathState, Registry};

/// What a multi-step leaf does when a step is refused (obstruction, no fuel).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnBlocked {
    /// Keep returning `Running` and try again next tick. Guard against
    /// permanent obstructions with a decorator.
    #[default]
    Wait,
    /// Forget the destination and fail.
    Fail,
}

const MOVE_DESTINATION: StateKey<Position> = StateKey::new("move.destination");
const TURN_DESTINATION: StateKey<Heading> = StateKey::new("turn.destination");

/// Move `count` steps in one direction, one step per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveAction {
    pub direction: MoveDirection,
    pub count: u32,
    #[serde(default)]
    pub on_blocked: OnBlocked,
}

impl MoveAction {
    pub const TAG: &'static str = "move";

    pub fn new(direction: MoveDirection, count: u32) -> Result<Self, ConfigError> {
        let node = Self {
            direction,
            count,
            on_blocked: OnBlocked::Wait,
        };
        node.validate()?;
        Ok(node)
    }

    pub fn with_on_blocked(mut self, on_blocked: OnBlocked) -> Self {
        self.on_blocked = on_blocked;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::ZeroCount(Self::TAG));
        }
        if i32::try_from(self.count).is_err() {
            return Err(ConfigError::CountTooLarge {
                tag: Self::TAG,
                count: self.count,
            });
        }
        Ok(())
    }

    pub fn decode(params: Value, _registry: &Registry) -> Result<Node, PathError> {
        let node: Self = from_params(Self::TAG, params)?;
        node.validate().map_err(PathError::config(Self::TAG))?;
        Ok(Node::Move(node))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        let Some(destination) = state.local(MOVE_DESTINATION)? else {
            let destination = i32::try_from(self.count).ok().and_then(|steps| {
                agent
                    .position()
                    .checked_add(self.direction.delta(agent.heading(), steps))
            });
            let Some(destination) = destination else {
                debug!(count = self.count, direction = ?self.direction, "destination off the grid");
                return Ok(ActionResult::Failure);
            };
            state.set_local(MOVE_DESTINATION, &destination)?;
            debug!(?destination, direction = ?self.direction, "move destination set");
            return Ok(ActionResult::Running);
        };

        if agent.position() == destination {
            state.set_last_code(ResultCode::Move(MoveOutcome::Moved));
            return Ok(ActionResult::Success);
        }

        let outcome = agent.step(self.direction)?;
        state.set_last_code(ResultCode::Move(outcome));
        match (outcome, self.on_blocked) {
            (MoveOutcome::Moved, _) | (_, OnBlocked::Wait) => Ok(ActionResult::Running),
            (_, OnBlocked::Fail) => {
                state.remove_local(MOVE_DESTINATION);
                Ok(ActionResult::Failure)
            }
        }
    }

    pub fn commit(&mut self, state: &mut PathState) {
        state.remove_local(MOVE_DESTINATION);
    }
}

/// Turn `count` quarter turns in one direction, one turn per tick.
///
/// The node aims at a heading, not a number of turns: `count` is taken modulo
/// four, so whole circles are skipped and a multiple of four succeeds without
/// issuing a turn or burning fuel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnAction {
    pub turn: Turn,
    pub count: u32,
    #[serde(default)]
    pub on_blocked: OnBlocked,
}

impl TurnAction {
    pub const TAG: &'static str = "turn";

    pub fn new(turn: Turn, count: u32) -> Result<Self, ConfigError> {
        let node = Self {
            turn,
            count,
            on_blocked: OnBlocked::Wait,
        };
        node.validate()?;
        Ok(node)
    }

    /// Two right turns.
    pub fn around() -> Self {
        Self {
            turn: Turn::Right,
            count: 2,
            on_blocked: OnBlocked::Wait,
        }
    }

    pub fn with_on_blocked(mut self, on_blocked: OnBlocked) -> Self {
        self.on_blocked = on_blocked;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::ZeroCount(Self::TAG));
        }
        Ok(())
    }

    pub fn decode(params: Value, _registry: &Registry) -> Result<Node, PathError> {
        let node: Self = from_params(Self::TAG, params)?;
        node.validate().map_err(PathError::config(Self::TAG))?;
        Ok(Node::Turn(node))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        let Some(destination) = state.local(TURN_DESTINATION)? else {
            let destination =
                (0..self.count % 4).fold(agent.heading(), |h, _| h.turned(self.turn));
            state.set_local(TURN_DESTINATION, &destination)?;
            debug!(?destination, turn = ?self.turn, "turn destination set");
            return Ok(ActionResult::Running);
        };

        if agent.heading() == destination {
            state.set_last_code(ResultCode::Turn(TurnOutcome::Turned));
            return Ok(ActionResult::Success);
        }

        let outcome = agent.turn(self.turn)?;
        state.set_last_code(ResultCode::Turn(outcome));
        match (outcome, self.on_blocked) {
            (TurnOutcome::Turned, _) | (_, OnBlocked::Wait) => Ok(ActionResult::Running),
            (_, OnBlocked::Fail) => {
                state.remove_local(TURN_DESTINATION);
                Ok(ActionResult::Failure)
            }
        }
    }

    pub fn commit(&mut self, state: &mut PathState) {
        state.remove_local(TURN_DESTINATION);
    }
}

/// Succeeds while live fuel is at least `at_least`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelCheck {
    pub at_least: u32,
}

impl FuelCheck {
    pub const TAG: &'static str = "fuel_check";

    pub fn new(at_least: u32) -> Self {
        Self { at_least }
    }

    pub fn decode(params: Value, _registry: &Registry) -> Result<Node, PathError> {
        Ok(Node::FuelCheck(from_params(Self::TAG, params)?))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        _state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        Ok(ActionResult::from_success(
            agent.world().fuel_level() >= self.at_least,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountMode {
    Exactly,
    AtLeast,
    AtMost,
}

impl CountMode {
    pub fn accepts(self, actual: u32, wanted: u32) -> bool {
        match self {
            CountMode::Exactly => actual == wanted,
            CountMode::AtLeast => actual >= wanted,
            CountMode::AtMost => actual <= wanted,
        }
    }
}

impl FromStr for CountMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "exactly" | "eq" => Ok(CountMode::Exactly),
            "at_least" | "ge" => Ok(CountMode::AtLeast),
            "at_most" | "le" => Ok(CountMode::AtMost),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

/// Compare how many matching items a slot (or the whole inventory) holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCheck {
    /// 1-based slot; `None` counts across all slots.
    #[serde(default)]
    pub slot: Option<u8>,
    #[serde(default)]
    pub item: ItemMatch,
    pub count: u32,
    pub mode: CountMode,
}

impl InventoryCheck {
    pub const TAG: &'static str = "inventory_check";

    pub fn new(
        slot: Option<u8>,
        item: ItemMatch,
        count: u32,
        mode: CountMode,
    ) -> Result<Self, ConfigError> {
        let node = Self {
            slot,
            item,
            count,
            mode,
        };
        node.validate()?;
        Ok(node)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.slot {
            Some(slot) if !valid_slot(slot) => Err(ConfigError::InvalidSlot(slot)),
            _ => Ok(()),
        }
    }

    pub fn decode(params: Value, _registry: &Registry) -> Result<Node, PathError> {
        let node: Self = from_params(Self::TAG, params)?;
        node.validate().map_err(PathError::config(Self::TAG))?;
        Ok(Node::InventoryCheck(node))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        _state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        let inventory = agent.inventory();
        let actual = match self.slot {
            Some(slot) => inventory.count_in(slot, &self.item),
            None => inventory.count_matching(&self.item),
        };
        Ok(ActionResult::from_success(
            self.mode.accepts(actual, self.count),
        ))
    }
}

/// Select the first slot holding a matching item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySelect {
    pub item: ItemMatch,
}

impl InventorySelect {
    pub const TAG: &'static str = "inventory_select";

    pub fn new(item: ItemMatch) -> Self {
        Self { item }
    }

    pub fn decode(params: Value, _registry: &Registry) -> Result<Node, PathError> {
        Ok(Node::InventorySelect(from_params(Self::TAG, params)?))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        _state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        let Some(slot) = agent.inventory().first_slot_matching(&self.item) else {
            return Ok(ActionResult::Failure);
        };
        agent.select(slot)?;
        Ok(ActionResult::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectSlot {
    pub slot: u8,
}

impl SelectSlot {
    pub const TAG: &'static str = "select_slot";

    pub fn new(slot: u8) -> Result<Self, ConfigError> {
        let node = Self { slot };
        node.validate()?;
        Ok(node)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !valid_slot(self.slot) {
            return Err(ConfigError::InvalidSlot(self.slot));
        }
        Ok(())
    }

    pub fn decode(params: Value, _registry: &Registry) -> Result<Node, PathError> {
        let node: Self = from_params(Self::TAG, params)?;
        node.validate().map_err(PathError::config(Self::TAG))?;
        Ok(Node::SelectSlot(node))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        _state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        agent.select(self.slot)?;
        Ok(ActionResult::Success)
    }
}

fn manipulate(
    agent: &mut Tracker,
    state: &mut PathState,
    manipulation: Manipulation,
) -> Result<ActionResult, PathError> {
    // Keyed by tree position and tick, so replaying a tick from a stale path
    // gets the recorded outcome instead of a second effect.
    let key = format!("{}@{}", state.scoped_key(manipulation.name()), state.tick());
    let code = agent.manipulate_once(&key, manipulation)?;
    state.set_last_code(code);
    Ok(ActionResult::from_success(code.succeeded()))
}

fn validate_count(tag: &'static str, count: Option<u32>) -> Result<(), ConfigError> {
    match count {
        Some(0) => Err(ConfigError::ZeroCount(tag)),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigAction {
    #[serde(default)]
    pub side: Side,
}

impl DigAction {
    pub const TAG: &'static str = "dig";

    pub fn new(side: Side) -> Self {
        Self { side }
    }

    pub fn decode(params: Value, _registry: &Registry) -> Result<Node, PathError> {
        Ok(Node::Dig(from_params(Self::TAG, params)?))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        manipulate(agent, state, Manipulation::Dig(self.side))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceAction {
    #[serde(default)]
    pub side: Side,
}

impl PlaceAction {
    pub const TAG: &'static str = "place";

    pub fn new(side: Side) -> Self {
        Self { side }
    }

    pub fn decode(params: Value, _registry: &Registry) -> Result<Node, PathError> {
        Ok(Node::Place(from_params(Self::TAG, params)?))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        manipulate(agent, state, Manipulation::Place(self.side))
    }
}

/// Drop from the selected slot; the whole stack when `count` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropAction {
    #[serde(default)]
    pub side: Side,
    #[serde(default)]
    pub count: Option<u32>,
}

impl DropAction {
    pub const TAG: &'static str = "drop";

    pub fn new(side: Side, count: Option<u32>) -> Result<Self, ConfigError> {
        validate_count(Self::TAG, count)?;
        Ok(Self { side, count })
    }

    pub fn decode(params: Value, _registry: &Registry) -> Result<Node, PathError> {
        let node: Self = from_params(Self::TAG, params)?;
        validate_count(Self::TAG, node.count).map_err(PathError::config(Self::TAG))?;
        Ok(Node::Drop(node))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        manipulate(
            agent,
            state,
            Manipulation::Drop {
                side: self.side,
                count: self.count,
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuckAction {
    #[serde(default)]
    pub side: Side,
    #[serde(default)]
    pub count: Option<u32>,
}

impl SuckAction {
    pub const TAG: &'static str = "suck";

    pub fn new(side: Side, count: Option<u32>) -> Result<Self, ConfigError> {
        validate_count(Self::TAG, count)?;
        Ok(Self { side, count })
    }

    pub fn decode(params: Value, _registry: &Registry) -> Result<Node, PathError> {
        let node: Self = from_params(Self::TAG, params)?;
        validate_count(Self::TAG, node.count).map_err(PathError::config(Self::TAG))?;
        Ok(Node::Suck(node))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        manipulate(
            agent,
            state,
            Manipulation::Suck {
                side: self.side,
                count: self.count,
            },
        )
    }
}
