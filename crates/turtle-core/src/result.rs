use serde::{Deserialize, Serialize};

use crate::world::{DigOutcome, DropOutcome, MoveOutcome, PlaceOutcome, SuckOutcome, TurnOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionResult {
    Success,
    Running,
    Failure,
}

impl ActionResult {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ActionResult::Running)
    }

    pub fn from_success(ok: bool) -> Self {
        if ok {
            ActionResult::Success
        } else {
            ActionResult::Failure
        }
    }
}

/// Domain-specific outcome of the last primitive a leaf issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "outcome", rename_all = "snake_case")]
pub enum ResultCode {
    Move(MoveOutcome),
    Turn(TurnOutcome),
    Dig(DigOutcome),
    Place(PlaceOutcome),
    Drop(DropOutcome),
    Suck(SuckOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Move,
    Turn,
    Dig,
    Place,
    Drop,
    Suck,
}

impl ResultCode {
    pub fn kind(self) -> OutcomeKind {
        match self {
            ResultCode::Move(_) => OutcomeKind::Move,
            ResultCode::Turn(_) => OutcomeKind::Turn,
            ResultCode::Dig(_) => OutcomeKind::Dig,
            ResultCode::Place(_) => OutcomeKind::Place,
            ResultCode::Drop(_) => OutcomeKind::Drop,
            ResultCode::Suck(_) => OutcomeKind::Suck,
        }
    }

    /// True for the "it happened" variant of each outcome family.
    pub fn succeeded(self) -> bool {
        matches!(
            self,
            ResultCode::Move(MoveOutcome::Moved)
                | ResultCode::Turn(TurnOutcome::Turned)
                | ResultCode::Dig(DigOutcome::Dug)
                | ResultCode::Place(PlaceOutcome::Placed)
                | ResultCode::Drop(DropOutcome::Dropped)
                | ResultCode::Suck(SuckOutcome::Sucked)
        )
    }
}
