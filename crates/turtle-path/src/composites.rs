//! Multi-child nodes that walk their children across ticks.
//!
//! Composites run at most one child per tick and remember where they are in
//! their own fields, so a path saved mid-walk resumes at the same child.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use turtle_core::{ActionResult, DeterministicRng, Tracker};

use crate::node::{encode_children, from_params, run_child, to_params, NodeRecord};
use crate::{ConfigError, Node, PathError, PathState, Registry};

#[derive(Serialize, Deserialize)]
struct IndexedParams {
    children: Vec<NodeRecord>,
    #[serde(default)]
    index: usize,
}

fn decode_children(
    tag: &'static str,
    records: Vec<NodeRecord>,
    registry: &Registry,
) -> Result<Vec<Node>, PathError> {
    if records.is_empty() {
        return Err(PathError::config(tag)(ConfigError::NoChildren(tag)));
    }
    records
        .into_iter()
        .map(|record| registry.decode(record))
        .collect()
}

fn check_index(tag: &'static str, index: usize, len: usize) -> Result<(), PathError> {
    if index >= len {
        return Err(PathError::config(tag)(ConfigError::IndexOutOfRange {
            tag,
            index,
            len,
        }));
    }
    Ok(())
}

/// Runs children in order, one per tick, until one fails.
#[derive(Debug)]
pub struct Sequence {
    children: Vec<Node>,
    /// Child to run on the next tick (0-based).
    index: usize,
}

impl Sequence {
    pub const TAG: &'static str = "sequence";

    pub fn new(children: Vec<Node>) -> Result<Self, ConfigError> {
        if children.is_empty() {
            return Err(ConfigError::NoChildren(Self::TAG));
        }
        Ok(Self { children, index: 0 })
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn params(&self) -> Result<Value, PathError> {
        to_params(
            Self::TAG,
            &IndexedParams {
                children: encode_children(&self.children)?,
                index: self.index,
            },
        )
    }

    pub fn decode(params: Value, registry: &Registry) -> Result<Node, PathError> {
        let params: IndexedParams = from_params(Self::TAG, params)?;
        let children = decode_children(Self::TAG, params.children, registry)?;
        check_index(Self::TAG, params.index, children.len())?;
        Ok(Node::Sequence(Self {
            children,
            index: params.index,
        }))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        let index = self.index;
        match run_child(&mut self.children[index], index, agent, state)? {
            ActionResult::Running => Ok(ActionResult::Running),
            ActionResult::Failure => {
                self.index = 0;
                Ok(ActionResult::Failure)
            }
            ActionResult::Success if index + 1 == self.children.len() => {
                self.index = 0;
                Ok(ActionResult::Success)
            }
            ActionResult::Success => {
                self.index = index + 1;
                Ok(ActionResult::Running)
            }
        }
    }
}

/// Tries children in order, one per tick, until one succeeds.
#[derive(Debug)]
pub struct Selector {
    children: Vec<Node>,
    index: usize,
}

impl Selector {
    pub const TAG: &'static str = "selector";

    pub fn new(children: Vec<Node>) -> Result<Self, ConfigError> {
        if children.is_empty() {
            return Err(ConfigError::NoChildren(Self::TAG));
        }
        Ok(Self { children, index: 0 })
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn params(&self) -> Result<Value, PathError> {
        to_params(
            Self::TAG,
            &IndexedParams {
                children: encode_children(&self.children)?,
                index: self.index,
            },
        )
    }

    pub fn decode(params: Value, registry: &Registry) -> Result<Node, PathError> {
        let params: IndexedParams = from_params(Self::TAG, params)?;
        let children = decode_children(Self::TAG, params.children, registry)?;
        check_index(Self::TAG, params.index, children.len())?;
        Ok(Node::Selector(Self {
            children,
            index: params.index,
        }))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        let index = self.index;
        match run_child(&mut self.children[index], index, agent, state)? {
            ActionResult::Running => Ok(ActionResult::Running),
            ActionResult::Success => {
                self.index = 0;
                Ok(ActionResult::Success)
            }
            ActionResult::Failure if index + 1 == self.children.len() => {
                self.index = 0;
                Ok(ActionResult::Failure)
            }
            ActionResult::Failure => {
                self.index = index + 1;
                Ok(ActionResult::Running)
            }
        }
    }
}

/// A selector that tries children in random order, each at most once per
/// activation.
///
/// Picks come from the path state's RNG, so a resumed path continues the same
/// stream.
#[derive(Debug)]
pub struct RandomSelector {
    children: Vec<Node>,
    /// Children that failed since the last terminal result.
    tried: BTreeSet<usize>,
    /// Child picked on an earlier tick that has not finished yet.
    running: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct RandomParams {
    children: Vec<NodeRecord>,
    #[serde(default)]
    tried: BTreeSet<usize>,
    #[serde(default)]
    running: Option<usize>,
}

impl RandomSelector {
    pub const TAG: &'static str = "random_selector";

    pub fn new(children: Vec<Node>) -> Result<Self, ConfigError> {
        if children.is_empty() {
            return Err(ConfigError::NoChildren(Self::TAG));
        }
        Ok(Self {
            children,
            tried: BTreeSet::new(),
            running: None,
        })
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn tried(&self) -> &BTreeSet<usize> {
        &self.tried
    }

    pub fn running(&self) -> Option<usize> {
        self.running
    }

    pub fn params(&self) -> Result<Value, PathError> {
        to_params(
            Self::TAG,
            &RandomParams {
                children: encode_children(&self.children)?,
                tried: self.tried.clone(),
                running: self.running,
            },
        )
    }

    pub fn decode(params: Value, registry: &Registry) -> Result<Node, PathError> {
        let params: RandomParams = from_params(Self::TAG, params)?;
        let children = decode_children(Self::TAG, params.children, registry)?;
        let len = children.len();
        for &index in params.tried.iter().chain(params.running.iter()) {
            check_index(Self::TAG, index, len)?;
        }
        // A fully tried set is never persisted; treat it as a blank slate.
        let tried = if params.tried.len() == len {
            BTreeSet::new()
        } else {
            params.tried
        };
        Ok(Node::RandomSelector(Self {
            children,
            tried,
            running: params.running,
        }))
    }

    fn pick(&self, state: &mut PathState) -> usize {
        let untried: Vec<usize> = (0..self.children.len())
            .filter(|index| !self.tried.contains(index))
            .collect();
        untried[state.rng_mut().next_below(untried.len())]
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        let index = match self.running {
            Some(index) => index,
            None => {
                let index = self.pick(state);
                debug!(index, tried = self.tried.len(), "random selector picked child");
                index
            }
        };

        match run_child(&mut self.children[index], index, agent, state)? {
            ActionResult::Running => {
                self.running = Some(index);
                Ok(ActionResult::Running)
            }
            ActionResult::Success => {
                self.tried.clear();
                self.running = None;
                Ok(ActionResult::Success)
            }
            ActionResult::Failure => {
                self.running = None;
                self.tried.insert(index);
                if self.tried.len() == self.children.len() {
                    self.tried.clear();
                    Ok(ActionResult::Failure)
                } else {
                    Ok(ActionResult::Running)
                }
            }
        }
    }
}
