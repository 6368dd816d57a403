use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use turtle_core::storage::{load_json, save_json};
use turtle_core::{ActionResult, Storage, Tracker};

use crate::{Node, NodeRecord, PathError, PathState, Registry};

/// Persisted form of an [`ActionPath`]: the head's record plus the path state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    #[serde(flatten)]
    pub head: NodeRecord,
    pub state: PathState,
}

/// A behavior tree driven one tick at a time against a tracked agent.
#[derive(Debug)]
pub struct ActionPath {
    head: Node,
    registry: Registry,
    state: PathState,
    last: Option<ActionResult>,
}

impl ActionPath {
    /// A path over `head` with an empty registry.
    pub fn new(head: impl Into<Node>) -> Self {
        Self::with_registry(head, Registry::new())
    }

    pub fn with_registry(head: impl Into<Node>, registry: Registry) -> Self {
        Self {
            head: head.into(),
            registry,
            state: PathState::default(),
            last: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.state = PathState::new(seed);
        self
    }

    pub fn head(&self) -> &Node {
        &self.head
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn state(&self) -> &PathState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PathState {
        &mut self.state
    }

    /// Result of the most recent tick, if any.
    pub fn last_result(&self) -> Option<ActionResult> {
        self.last
    }

    /// Evaluate the tree once.
    pub fn tick(&mut self, agent: &mut Tracker) -> Result<ActionResult, PathError> {
        self.state.begin_tick();
        let result = self.head.evaluate(agent, &mut self.state)?;
        if result == ActionResult::Success {
            self.head.commit(agent, &mut self.state)?;
        }
        self.last = Some(result);
        debug!(
            label = agent.label(),
            tick = self.state.tick(),
            head = self.head.type_tag(),
            ?result,
            "path ticked"
        );
        Ok(result)
    }

    pub fn to_record(&self) -> Result<PathRecord, PathError> {
        Ok(PathRecord {
            head: self.head.encode()?,
            state: self.state.clone(),
        })
    }

    /// Replace the head and path state with a previously saved record. Every
    /// tag in the record must already be registered.
    pub fn restore(&mut self, record: PathRecord) -> Result<(), PathError> {
        self.head = self.registry.decode(record.head)?;
        self.state = record.state;
        self.last = None;
        Ok(())
    }

    pub fn save(&self) -> Result<Vec<u8>, PathError> {
        let record = self.to_record()?;
        serde_json::to_vec_pretty(&record).map_err(PathError::malformed("path"))
    }

    pub fn load(&mut self, bytes: &[u8]) -> Result<(), PathError> {
        let record: PathRecord =
            serde_json::from_slice(bytes).map_err(PathError::malformed("path"))?;
        self.restore(record)
    }

    pub fn save_to(&self, storage: &mut dyn Storage, name: &str) -> Result<(), PathError> {
        save_json(storage, name, &self.to_record()?)?;
        debug!(%name, tick = self.state.tick(), "path saved");
        Ok(())
    }

    /// Load from `name` if present. Returns whether a record was found.
    pub fn load_from(&mut self, storage: &dyn Storage, name: &str) -> Result<bool, PathError> {
        let Some(record) = load_json::<PathRecord>(storage, name)? else {
            return Ok(false);
        };
        self.restore(record)?;
        info!(%name, tick = self.state.tick(), head = self.head.type_tag(), "path resumed");
        Ok(true)
    }

    /// Storage name of the path record for agent `label`.
    pub fn record_name(label: &str) -> String {
        format!("{label}.path.json")
    }
}
