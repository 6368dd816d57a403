//! Single-child nodes that reinterpret or retry their child's result.
//!
//! Every decorator runs its child at child index 0 through
//! [`run_child`](crate::node::run_child), so the child is committed as soon as
//! it reports `Success`, before the decorator decides what that means.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};
use turtle_core::{ActionResult, OutcomeKind, ResultCode, Tracker};

use crate::node::{from_params, run_child, to_params, NodeRecord};
use crate::{ConfigError, Node, PathError, PathState, Registry};

#[derive(Serialize, Deserialize)]
struct ChildParams {
    child: NodeRecord,
}

fn child_params(tag: &str, child: &Node) -> Result<Value, PathError> {
    to_params(
        tag,
        &ChildParams {
            child: child.encode()?,
        },
    )
}

fn decode_child(tag: &str, params: Value, registry: &Registry) -> Result<Box<Node>, PathError> {
    let params: ChildParams = from_params(tag, params)?;
    Ok(Box::new(registry.decode(params.child)?))
}

/// Success ⇄ Failure.
#[derive(Debug)]
pub struct Inverter {
    pub child: Box<Node>,
}

impl Inverter {
    pub const TAG: &'static str = "inverter";

    pub fn new(child: impl Into<Node>) -> Self {
        Self {
            child: Box::new(child.into()),
        }
    }

    pub fn params(&self) -> Result<Value, PathError> {
        child_params(Self::TAG, &self.child)
    }

    pub fn decode(params: Value, registry: &Registry) -> Result<Node, PathError> {
        let child = decode_child(Self::TAG, params, registry)?;
        Ok(Node::Inverter(Self { child }))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        Ok(match run_child(&mut self.child, 0, agent, state)? {
            ActionResult::Success => ActionResult::Failure,
            ActionResult::Failure => ActionResult::Success,
            ActionResult::Running => ActionResult::Running,
        })
    }
}

/// Turns Failure into Success.
#[derive(Debug)]
pub struct Succeeder {
    pub child: Box<Node>,
}

impl Succeeder {
    pub const TAG: &'static str = "succeeder";

    pub fn new(child: impl Into<Node>) -> Self {
        Self {
            child: Box::new(child.into()),
        }
    }

    pub fn params(&self) -> Result<Value, PathError> {
        child_params(Self::TAG, &self.child)
    }

    pub fn decode(params: Value, registry: &Registry) -> Result<Node, PathError> {
        let child = decode_child(Self::TAG, params, registry)?;
        Ok(Node::Succeeder(Self { child }))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        Ok(match run_child(&mut self.child, 0, agent, state)? {
            ActionResult::Running => ActionResult::Running,
            ActionResult::Success | ActionResult::Failure => ActionResult::Success,
        })
    }
}

/// Loops its child until it fails, then fails.
#[derive(Debug)]
pub struct RepeatUntilFailure {
    pub child: Box<Node>,
}

impl RepeatUntilFailure {
    pub const TAG: &'static str = "repeat_until_failure";

    pub fn new(child: impl Into<Node>) -> Self {
        Self {
            child: Box::new(child.into()),
        }
    }

    pub fn params(&self) -> Result<Value, PathError> {
        child_params(Self::TAG, &self.child)
    }

    pub fn decode(params: Value, registry: &Registry) -> Result<Node, PathError> {
        let child = decode_child(Self::TAG, params, registry)?;
        Ok(Node::RepeatUntilFailure(Self { child }))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        Ok(match run_child(&mut self.child, 0, agent, state)? {
            ActionResult::Failure => ActionResult::Failure,
            ActionResult::Success | ActionResult::Running => ActionResult::Running,
        })
    }
}

/// Succeeds once its child has succeeded `times` times.
///
/// Only child successes count; a tick on which the child is still running is
/// not an attempt. A child failure resets the counter and fails immediately.
#[derive(Debug)]
pub struct Repeater {
    pub times: u32,
    pub count: u32,
    pub child: Box<Node>,
}

#[derive(Serialize, Deserialize)]
struct RepeaterParams {
    times: u32,
    #[serde(default)]
    count: u32,
    child: NodeRecord,
}

impl Repeater {
    pub const TAG: &'static str = "repeater";

    pub fn new(times: u32, child: impl Into<Node>) -> Result<Self, ConfigError> {
        if times == 0 {
            return Err(ConfigError::ZeroCount(Self::TAG));
        }
        Ok(Self {
            times,
            count: 0,
            child: Box::new(child.into()),
        })
    }

    pub fn params(&self) -> Result<Value, PathError> {
        to_params(
            Self::TAG,
            &RepeaterParams {
                times: self.times,
                count: self.count,
                child: self.child.encode()?,
            },
        )
    }

    pub fn decode(params: Value, registry: &Registry) -> Result<Node, PathError> {
        let params: RepeaterParams = from_params(Self::TAG, params)?;
        if params.times == 0 {
            return Err(PathError::config(Self::TAG)(ConfigError::ZeroCount(
                Self::TAG,
            )));
        }
        Ok(Node::Repeater(Self {
            times: params.times,
            count: params.count.min(params.times),
            child: Box::new(registry.decode(params.child)?),
        }))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        match run_child(&mut self.child, 0, agent, state)? {
            ActionResult::Running => Ok(ActionResult::Running),
            ActionResult::Failure => {
                self.count = 0;
                Ok(ActionResult::Failure)
            }
            ActionResult::Success => {
                self.count += 1;
                if self.count >= self.times {
                    self.count = 0;
                    Ok(ActionResult::Success)
                } else {
                    Ok(ActionResult::Running)
                }
            }
        }
    }
}

/// Escalates a child failure into a fatal error that stops the program.
#[derive(Debug)]
pub struct DieOnFailure {
    pub child: Box<Node>,
}

impl DieOnFailure {
    pub const TAG: &'static str = "die_on_failure";

    pub fn new(child: impl Into<Node>) -> Self {
        Self {
            child: Box::new(child.into()),
        }
    }

    pub fn params(&self) -> Result<Value, PathError> {
        child_params(Self::TAG, &self.child)
    }

    pub fn decode(params: Value, registry: &Registry) -> Result<Node, PathError> {
        let child = decode_child(Self::TAG, params, registry)?;
        Ok(Node::DieOnFailure(Self { child }))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        match run_child(&mut self.child, 0, agent, state)? {
            ActionResult::Failure => {
                let tag = self.child.type_tag().to_string();
                error!(
                    label = agent.label(),
                    child = %tag,
                    code = ?state.last_code(),
                    position = ?agent.position(),
                    "child failed under die-on-failure"
                );
                Err(PathError::Died { tag })
            }
            result => Ok(result),
        }
    }
}

/// Keeps a failing child alive: after a failure, waits `delay_ticks` ticks
/// (returning `Running` without touching the child) and then tries again.
#[derive(Debug)]
pub struct RetryOnFailure {
    pub delay_ticks: u32,
    /// Ticks left to wait before the next attempt.
    pub cooldown: u32,
    pub child: Box<Node>,
}

fn default_delay_ticks() -> u32 {
    1
}

#[derive(Serialize, Deserialize)]
struct RetryParams {
    #[serde(default = "default_delay_ticks")]
    delay_ticks: u32,
    #[serde(default)]
    cooldown: u32,
    child: NodeRecord,
}

impl RetryOnFailure {
    pub const TAG: &'static str = "retry_on_failure";

    pub fn new(child: impl Into<Node>) -> Self {
        Self::with_delay(default_delay_ticks(), child)
    }

    pub fn with_delay(delay_ticks: u32, child: impl Into<Node>) -> Self {
        Self {
            delay_ticks,
            cooldown: 0,
            child: Box::new(child.into()),
        }
    }

    pub fn params(&self) -> Result<Value, PathError> {
        to_params(
            Self::TAG,
            &RetryParams {
                delay_ticks: self.delay_ticks,
                cooldown: self.cooldown,
                child: self.child.encode()?,
            },
        )
    }

    pub fn decode(params: Value, registry: &Registry) -> Result<Node, PathError> {
        let params: RetryParams = from_params(Self::TAG, params)?;
        Ok(Node::RetryOnFailure(Self {
            delay_ticks: params.delay_ticks,
            cooldown: params.cooldown.min(params.delay_ticks),
            child: Box::new(registry.decode(params.child)?),
        }))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return Ok(ActionResult::Running);
        }
        match run_child(&mut self.child, 0, agent, state)? {
            ActionResult::Failure => {
                self.cooldown = self.delay_ticks;
                debug!(
                    child = self.child.type_tag(),
                    delay_ticks = self.delay_ticks,
                    "child failed; retrying"
                );
                Ok(ActionResult::Running)
            }
            result => Ok(result),
        }
    }
}

/// Maps the domain result code recorded by its child onto Success/Failure.
///
/// The recorded code is cleared before the child runs, so a child that
/// finishes without issuing a primitive of `kind` counts as a failure.
#[derive(Debug)]
pub struct ResultInterpreter {
    pub kind: OutcomeKind,
    pub accept: Vec<ResultCode>,
    pub child: Box<Node>,
}

#[derive(Serialize, Deserialize)]
struct InterpreterParams {
    kind: OutcomeKind,
    accept: Vec<ResultCode>,
    child: NodeRecord,
}

impl ResultInterpreter {
    pub const TAG: &'static str = "result_interpreter";

    pub fn new(
        kind: OutcomeKind,
        accept: impl IntoIterator<Item = ResultCode>,
        child: impl Into<Node>,
    ) -> Result<Self, ConfigError> {
        let accept: Vec<ResultCode> = accept.into_iter().collect();
        validate_accept(kind, &accept)?;
        Ok(Self {
            kind,
            accept,
            child: Box::new(child.into()),
        })
    }

    /// Whether `code` counts as success for this interpreter.
    pub fn accepts(&self, code: Option<ResultCode>) -> bool {
        code.is_some_and(|code| code.kind() == self.kind && self.accept.contains(&code))
    }

    pub fn params(&self) -> Result<Value, PathError> {
        to_params(
            Self::TAG,
            &InterpreterParams {
                kind: self.kind,
                accept: self.accept.clone(),
                child: self.child.encode()?,
            },
        )
    }

    pub fn decode(params: Value, registry: &Registry) -> Result<Node, PathError> {
        let params: InterpreterParams = from_params(Self::TAG, params)?;
        validate_accept(params.kind, &params.accept).map_err(PathError::config(Self::TAG))?;
        Ok(Node::ResultInterpreter(Self {
            kind: params.kind,
            accept: params.accept,
            child: Box::new(registry.decode(params.child)?),
        }))
    }

    pub fn evaluate(
        &mut self,
        agent: &mut Tracker,
        state: &mut PathState,
    ) -> Result<ActionResult, PathError> {
        state.clear_last_code();
        let result = run_child(&mut self.child, 0, agent, state)?;
        if result == ActionResult::Running {
            return Ok(ActionResult::Running);
        }
        let code = state.last_code();
        let accepted = self.accepts(code);
        debug!(kind = ?self.kind, ?code, ?result, accepted, "interpreted result code");
        Ok(ActionResult::from_success(accepted))
    }
}

fn validate_accept(kind: OutcomeKind, accept: &[ResultCode]) -> Result<(), ConfigError> {
    if accept.is_empty() || accept.iter().any(|code| code.kind() != kind) {
        return Err(ConfigError::BadAcceptSet { kind });
    }
    Ok(())
}
