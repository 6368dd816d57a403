#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use turtle_core::{ActionResult, MemoryStorage, SimWorld, Tracker};
use turtle_path::{ActionPath, CustomNode, Node, PathError, PathState, Registry};

/// Host-defined test node that replays a fixed script of results, one per
/// evaluation, cycling when it runs out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scripted {
    pub script: Vec<ActionResult>,
    #[serde(default)]
    pub cursor: usize,
    #[serde(skip)]
    pub calls: Rc<Cell<u32>>,
    #[serde(skip)]
    pub commits: Rc<Cell<u32>>,
}

impl Scripted {
    pub const TAG: &'static str = "scripted";

    pub fn new(script: impl Into<Vec<ActionResult>>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }

    pub fn always(result: ActionResult) -> Self {
        Self::new(vec![result])
    }

    pub fn decode(params: Value, _registry: &Registry) -> Result<Node, PathError> {
        let node: Scripted =
            serde_json::from_value(params).map_err(|source| PathError::Malformed {
                tag: Self::TAG.to_string(),
                source,
            })?;
        Ok(Node::custom(node))
    }

    pub fn node(&self) -> Node {
        Node::custom(self.clone())
    }
}

impl CustomNode for Scripted {
    fn type_tag(&self) -> &str {
        Self::TAG
    }

    fn evaluate(
        &mut self,
        _agent: &mut Tracker,
        _state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        self.calls.set(self.calls.get() + 1);
        if self.script.is_empty() {
            return Ok(ActionResult::Failure);
        }
        let result = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        Ok(result)
    }

    fn commit(&mut self, _agent: &mut Tracker, _state: &mut PathState) -> Result<(), PathError> {
        self.commits.set(self.commits.get() + 1);
        Ok(())
    }

    fn params(&self) -> Result<Value, PathError> {
        serde_json::to_value(self).map_err(|source| PathError::Malformed {
            tag: Self::TAG.to_string(),
            source,
        })
    }
}

pub fn registry() -> Registry {
    let mut registry = Registry::builtin();
    registry.register(Scripted::TAG, Scripted::decode);
    registry
}

pub fn tracker(world: &SimWorld) -> Tracker {
    tracker_with(world, &MemoryStorage::new())
}

pub fn tracker_with(world: &SimWorld, storage: &MemoryStorage) -> Tracker {
    Tracker::load_or_init("t", Box::new(world.clone()), Box::new(storage.clone()))
        .unwrap()
        .0
}

pub fn path(head: impl Into<Node>) -> ActionPath {
    ActionPath::with_registry(head, registry())
}

/// Tick until a terminal result, failing the test after `limit` ticks.
pub fn run_to_end(path: &mut ActionPath, tracker: &mut Tracker, limit: usize) -> ActionResult {
    for _ in 0..limit {
        let result = path.tick(tracker).unwrap();
        if result.is_terminal() {
            return result;
        }
    }
    panic!("path still running after {limit} ticks");
}
