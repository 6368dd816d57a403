use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use turtle_core::{ActionResult, Tracker};

use crate::composites::{RandomSelector, Selector, Sequence};
use crate::decorators::{
    DieOnFailure, Inverter, Repeater, RepeatUntilFailure, ResultInterpreter, RetryOnFailure,
    Succeeder,
};
use crate::leaves::{
    DigAction, DropAction, FuelCheck, InventoryCheck, InventorySelect, MoveAction, PlaceAction,
    SelectSlot, SuckAction, TurnAction,
};
use crate::{PathError, PathState};

/// Persisted form of a node: its type tag plus its own parameters, which for
/// decorators and composites include their children's records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub tag: String,
    #[serde(default)]
    pub params: Value,
}

impl NodeRecord {
    pub fn new(tag: impl Into<String>, params: Value) -> Self {
        Self {
            tag: tag.into(),
            params,
        }
    }
}

/// A node type supplied by the host program.
///
/// Register its decode function under the same tag before loading a tree
/// that contains it.
pub trait CustomNode: Debug {
    fn type_tag(&self) -> &str;

    fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError>;

    fn commit(&mut self, _agent: &mut Tracker, _state: &mut PathState) -> Result<(), PathError> {
        Ok(())
    }

    fn params(&self) -> Result<Value, PathError>;
}

#[derive(Debug)]
pub enum Node {
    // Leaves
    Move(MoveAction),
    Turn(TurnAction),
    FuelCheck(FuelCheck),
    InventoryCheck(InventoryCheck),
    InventorySelect(InventorySelect),
    SelectSlot(SelectSlot),
    Dig(DigAction),
    Place(PlaceAction),
    Drop(DropAction),
    Suck(SuckAction),
    // Decorators
    Inverter(Inverter),
    Succeeder(Succeeder),
    RepeatUntilFailure(RepeatUntilFailure),
    Repeater(Repeater),
    DieOnFailure(DieOnFailure),
    RetryOnFailure(RetryOnFailure),
    ResultInterpreter(ResultInterpreter),
    // Composites
    Sequence(Sequence),
    Selector(Selector),
    RandomSelector(RandomSelector),
    Custom(Box<dyn CustomNode>),
}

impl Node {
    pub fn type_tag(&self) -> &str {
        match self {
            Node::Move(_) => MoveAction::TAG,
            Node::Turn(_) => TurnAction::TAG,
            Node::FuelCheck(_) => FuelCheck::TAG,
            Node::InventoryCheck(_) => InventoryCheck::TAG,
            Node::InventorySelect(_) => InventorySelect::TAG,
            Node::SelectSlot(_) => SelectSlot::TAG,
            Node::Dig(_) => DigAction::TAG,
            Node::Place(_) => PlaceAction::TAG,
            Node::Drop(_) => DropAction::TAG,
            Node::Suck(_) => SuckAction::TAG,
            Node::Inverter(_) => Inverter::TAG,
            Node::Succeeder(_) => Succeeder::TAG,
            Node::RepeatUntilFailure(_) => RepeatUntilFailure::TAG,
            Node::Repeater(_) => Repeater::TAG,
            Node::DieOnFailure(_) => DieOnFailure::TAG,
            Node::RetryOnFailure(_) => RetryOnFailure::TAG,
            Node::ResultInterpreter(_) => ResultInterpreter::TAG,
            Node::Sequence(_) => Sequence::TAG,
            Node::Selector(_) => Selector::TAG,
            Node::RandomSelector(_) => RandomSelector::TAG,
            Node::Custom(node) => node.type_tag(),
        }
    }

    /// Evaluate once for this tick. Issues at most one primitive effect per leaf.
    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        match self {
            Node::Move(n) => n.evaluate(agent, state),
            Node::Turn(n) => n.evaluate(agent, state),
            Node::FuelCheck(n) => n.evaluate(agent, state),
            Node::InventoryCheck(n) => n.evaluate(agent, state),
            Node::InventorySelect(n) => n.evaluate(agent, state),
            Node::SelectSlot(n) => n.evaluate(agent, state),
            Node::Dig(n) => n.evaluate(agent, state),
            Node::Place(n) => n.evaluate(agent, state),
            Node::Drop(n) => n.evaluate(agent, state),
            Node::Suck(n) => n.evaluate(agent, state),
            Node::Inverter(n) => n.evaluate(agent, state),
            Node::Succeeder(n) => n.evaluate(agent, state),
            Node::RepeatUntilFailure(n) => n.evaluate(agent, state),
            Node::Repeater(n) => n.evaluate(agent, state),
            Node::DieOnFailure(n) => n.evaluate(agent, state),
            Node::RetryOnFailure(n) => n.evaluate(agent, state),
            Node::ResultInterpreter(n) => n.evaluate(agent, state),
            Node::Sequence(n) => n.evaluate(agent, state),
            Node::Selector(n) => n.evaluate(agent, state),
            Node::RandomSelector(n) => n.evaluate(agent, state),
            Node::Custom(n) => n.evaluate(agent, state),
        }
    }

    /// Called by the parent right after this node reports `Success`, at the
    /// same tree position it was evaluated at.
    pub fn commit(&mut self, agent: &mut Tracker, state: &mut PathState) -> Result<(), PathError> {
        match self {
            Node::Move(n) => {
                n.commit(state);
                Ok(())
            }
            Node::Turn(n) => {
                n.commit(state);
                Ok(())
            }
            Node::Custom(n) => n.commit(agent, state),
            _ => Ok(()),
        }
    }

    pub fn encode(&self) -> Result<NodeRecord, PathError> {
        let tag = self.type_tag();
        let params = match self {
            Node::Move(n) => to_params(tag, n)?,
            Node::Turn(n) => to_params(tag, n)?,
            Node::FuelCheck(n) => to_params(tag, n)?,
            Node::InventoryCheck(n) => to_params(tag, n)?,
            Node::InventorySelect(n) => to_params(tag, n)?,
            Node::SelectSlot(n) => to_params(tag, n)?,
            Node::Dig(n) => to_params(tag, n)?,
            Node::Place(n) => to_params(tag, n)?,
            Node::Drop(n) => to_params(tag, n)?,
            Node::Suck(n) => to_params(tag, n)?,
            Node::Inverter(n) => n.params()?,
            Node::Succeeder(n) => n.params()?,
            Node::RepeatUntilFailure(n) => n.params()?,
            Node::Repeater(n) => n.params()?,
            Node::DieOnFailure(n) => n.params()?,
            Node::RetryOnFailure(n) => n.params()?,
            Node::ResultInterpreter(n) => n.params()?,
            Node::Sequence(n) => n.params()?,
            Node::Selector(n) => n.params()?,
            Node::RandomSelector(n) => n.params()?,
            Node::Custom(n) => n.params()?,
        };
        Ok(NodeRecord::new(tag, params))
    }
}

macro_rules! impl_into_node {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Node {
                fn from(node: $ty) -> Self {
                    Node::$variant(node)
                }
            }
        )*
    };
}

impl_into_node!(
    Move(MoveAction),
    Turn(TurnAction),
    FuelCheck(FuelCheck),
    InventoryCheck(InventoryCheck),
    InventorySelect(InventorySelect),
    SelectSlot(SelectSlot),
    Dig(DigAction),
    Place(PlaceAction),
    Drop(DropAction),
    Suck(SuckAction),
    Inverter(Inverter),
    Succeeder(Succeeder),
    RepeatUntilFailure(RepeatUntilFailure),
    Repeater(Repeater),
    DieOnFailure(DieOnFailure),
    RetryOnFailure(RetryOnFailure),
    ResultInterpreter(ResultInterpreter),
    Sequence(Sequence),
    Selector(Selector),
    RandomSelector(RandomSelector),
    Custom(Box<dyn CustomNode>),
);

impl Node {
    pub fn custom(node: impl CustomNode + 'static) -> Self {
        Node::Custom(Box::new(node))
    }
}

pub(crate) fn to_params<T: Serialize>(tag: &str, value: &T) -> Result<Value, PathError> {
    serde_json::to_value(value).map_err(PathError::malformed(tag))
}

pub(crate) fn from_params<T: serde::de::DeserializeOwned>(
    tag: &str,
    params: Value,
) -> Result<T, PathError> {
    serde_json::from_value(params).map_err(PathError::malformed(tag))
}

/// Evaluate child `index` one level down and commit it if it succeeded.
pub(crate) fn run_child(
    child: &mut Node,
    index: usize,
    agent: &mut Tracker,
    state: &mut PathState,
) -> Result<ActionResult, PathError> {
    state.with_child(index, |state| {
        let result = child.evaluate(agent, state)?;
        if result == ActionResult::Success {
            child.commit(agent, state)?;
        }
        Ok(result)
    })
}

pub(crate) fn encode_children(children: &[Node]) -> Result<Vec<NodeRecord>, PathError> {
    children.iter().map(Node::encode).collect()
}
