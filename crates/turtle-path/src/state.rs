//! Path state: cross-tick scratch space shared by the nodes of one tree.
//!
//! Values are stored as JSON so the whole thing persists with the path. Node
//! scratch is scoped by the node's position in the tree (the chain of child
//! indices from the head), so two instances of the same leaf never collide.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use turtle_core::{ResultCode, SplitMix64};

use crate::PathError;

/// Typed name for a node-scoped scratch entry.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey<T: 'static> {
    name: &'static str,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for StateKey<T> {}

impl<T: 'static> Clone for StateKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> StateKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathState {
    tick: u64,
    rng: SplitMix64,
    #[serde(default)]
    values: BTreeMap<String, Value>,
    #[serde(default)]
    last_code: Option<ResultCode>,
    #[serde(skip)]
    scope: Vec<usize>,
}

impl PathState {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SplitMix64::new(seed),
            ..Self::default()
        }
    }

    /// Number of ticks started so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn begin_tick(&mut self) {
        self.tick += 1;
        self.scope.clear();
    }

    pub fn rng_mut(&mut self) -> &mut SplitMix64 {
        &mut self.rng
    }

    /// Run `f` one level down the tree, at child `index`.
    pub fn with_child<R>(&mut self, index: usize, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scope.push(index);
        let out = f(self);
        self.scope.pop();
        out
    }

    /// The full key for `name` at the current tree position.
    pub fn scoped_key(&self, name: &str) -> String {
        let mut key = String::from("h");
        for index in &self.scope {
            key.push('.');
            key.push_str(&index.to_string());
        }
        key.push(':');
        key.push_str(name);
        key
    }

    pub fn local<T: DeserializeOwned + 'static>(
        &self,
        key: StateKey<T>,
    ) -> Result<Option<T>, PathError> {
        let full = self.scoped_key(key.name());
        self.get_as(&full)
    }

    pub fn set_local<T: Serialize + 'static>(
        &mut self,
        key: StateKey<T>,
        value: &T,
    ) -> Result<(), PathError> {
        let full = self.scoped_key(key.name());
        let value = serde_json::to_value(value).map_err(|source| PathError::State {
            key: full.clone(),
            source,
        })?;
        self.values.insert(full, value);
        Ok(())
    }

    pub fn remove_local<T: 'static>(&mut self, key: StateKey<T>) {
        let full = self.scoped_key(key.name());
        self.values.remove(&full);
    }

    /// Unscoped entry, for host programs.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PathError> {
        let Some(value) = self.values.get(key) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|source| PathError::State {
                key: key.to_string(),
                source,
            })
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Outcome code of the most recent primitive a leaf issued.
    pub fn last_code(&self) -> Option<ResultCode> {
        self.last_code
    }

    pub fn set_last_code(&mut self, code: ResultCode) {
        self.last_code = Some(code);
    }

    pub fn clear_last_code(&mut self) {
        self.last_code = None;
    }
}
