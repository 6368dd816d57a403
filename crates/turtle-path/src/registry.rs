use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::composites::{RandomSelector, Selector, Sequence};
use crate::decorators::{
    DieOnFailure, Inverter, Repeater, RepeatUntilFailure, ResultInterpreter, RetryOnFailure,
    Succeeder,
};
use crate::leaves::{
    DigAction, DropAction, FuelCheck, InventoryCheck, InventorySelect, MoveAction, PlaceAction,
    SelectSlot, SuckAction, TurnAction,
};
use crate::{Node, NodeRecord, PathError};

/// Rebuilds a node (and, through the registry, its children) from its params.
pub type DecodeFn = fn(Value, &Registry) -> Result<Node, PathError>;

/// Type tag → decode function.
///
/// Owned by the engine rather than process-wide, so two paths (in tests, or in
/// one host driving several agents) never see each other's registrations.
#[derive(Clone, Default)]
pub struct Registry {
    decoders: BTreeMap<String, DecodeFn>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tags", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// An empty registry; nothing can be loaded until tags are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in node type.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_builtin();
        registry
    }

    pub fn register_builtin(&mut self) {
        let builtin: [(&str, DecodeFn); 20] = [
            (MoveAction::TAG, MoveAction::decode),
            (TurnAction::TAG, TurnAction::decode),
            (FuelCheck::TAG, FuelCheck::decode),
            (InventoryCheck::TAG, InventoryCheck::decode),
            (InventorySelect::TAG, InventorySelect::decode),
            (SelectSlot::TAG, SelectSlot::decode),
            (DigAction::TAG, DigAction::decode),
            (PlaceAction::TAG, PlaceAction::decode),
            (DropAction::TAG, DropAction::decode),
            (SuckAction::TAG, SuckAction::decode),
            (Inverter::TAG, Inverter::decode),
            (Succeeder::TAG, Succeeder::decode),
            (RepeatUntilFailure::TAG, RepeatUntilFailure::decode),
            (Repeater::TAG, Repeater::decode),
            (DieOnFailure::TAG, DieOnFailure::decode),
            (RetryOnFailure::TAG, RetryOnFailure::decode),
            (ResultInterpreter::TAG, ResultInterpreter::decode),
            (Sequence::TAG, Sequence::decode),
            (Selector::TAG, Selector::decode),
            (RandomSelector::TAG, RandomSelector::decode),
        ];
        for (tag, decode) in builtin {
            self.register(tag, decode);
        }
    }

    /// Register `decode` under `tag`, replacing any earlier registration.
    pub fn register(&mut self, tag: impl Into<String>, decode: DecodeFn) {
        let tag = tag.into();
        if self.decoders.insert(tag.clone(), decode).is_some() {
            debug!(%tag, "node type re-registered");
        }
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }

    pub fn decode(&self, record: NodeRecord) -> Result<Node, PathError> {
        let Some(decode) = self.decoders.get(&record.tag) else {
            return Err(PathError::UnknownTag(record.tag));
        };
        decode(record.params, self)
    }
}
