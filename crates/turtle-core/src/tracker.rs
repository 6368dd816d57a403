//! Agent state tracking and the crash-recovery protocol.
//!
//! Every fuel-consuming primitive goes through [`Tracker::step`] or
//! [`Tracker::turn`]:
//!
//! 1. `prepare` writes the in-flight record (pre-op state + the op itself),
//! 2. the primitive is issued against the world and the world is synced,
//! 3. on success the op's commit step advances the tracked state,
//! 4. the save record is written,
//! 5. `finish` deletes the in-flight record.
//!
//! The in-flight record exists iff an op was prepared but not finished. Finding
//! one at startup means the previous process died mid-op; [`Tracker::recover`]
//! then uses live fuel as the completion oracle: unchanged means the op never
//! reached the world, one less means it did, anything else is fatal.
//!
//! Manipulations (dig, place, drop, suck) use the same record. They burn no
//! fuel, so recovery reads the inventory back instead: unchanged means not
//! applied, a change the manipulation can explain means applied.
//!
//! When an op is found to disagree with the world, the in-flight record is
//! marked halted and kept. Every later start refuses to run until an operator
//! removes it.

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::inventory::{valid_slot, INVENTORY_KEY, SELECTED_SLOT_KEY};
use crate::storage::{load_json, save_json};
use crate::{
    DigOutcome, DropOutcome, Heading, Inventory, InventoryDelta, MoveDirection, MoveOutcome,
    PlaceOutcome, Position, ResultCode, Side, Storage, StorageError, SuckOutcome, TrackerError,
    Turn, TurnOutcome, WorldMut,
};

/// Save-record extension holding the outcome of the last keyed manipulation.
pub const LAST_MANIPULATION_KEY: &str = "last_manipulation";

/// The long-lived save record.
///
/// Collaborators may add their own fields (inventory snapshot, selected slot)
/// through [`Tracker::set_extension`]; they are flattened into the same record
/// and round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub position: Position,
    pub heading: Heading,
    pub fuel: u32,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl SaveRecord {
    pub fn fresh(fuel: u32) -> Self {
        Self {
            position: Position::ORIGIN,
            heading: Heading::North,
            fuel,
            extensions: BTreeMap::new(),
        }
    }
}

/// Storage name of the save record for agent `label`.
pub fn save_record_name(label: &str) -> String {
    format!("{label}.save.json")
}

/// Storage name of the in-flight record for agent `label`.
pub fn in_flight_record_name(label: &str) -> String {
    format!("{label}.action.json")
}

/// A risky, fuel-consuming primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Move(MoveDirection),
    Turn(Turn),
}

#[derive(Debug, Serialize, Deserialize)]
struct MoveParams {
    direction: MoveDirection,
}

#[derive(Debug, Serialize, Deserialize)]
struct TurnParams {
    turn: Turn,
}

impl Primitive {
    pub fn type_tag(self) -> &'static str {
        match self {
            Primitive::Move(_) => "move",
            Primitive::Turn(_) => "turn",
        }
    }

    pub fn params(self) -> Result<Value, serde_json::Error> {
        match self {
            Primitive::Move(direction) => serde_json::to_value(MoveParams { direction }),
            Primitive::Turn(turn) => serde_json::to_value(TurnParams { turn }),
        }
    }

    pub fn decode(tag: &str, params: Value) -> Result<Self, serde_json::Error> {
        match tag {
            "move" => {
                let p: MoveParams = serde_json::from_value(params)?;
                Ok(Primitive::Move(p.direction))
            }
            "turn" => {
                let p: TurnParams = serde_json::from_value(params)?;
                Ok(Primitive::Turn(p.turn))
            }
            other => Err(serde::de::Error::custom(format!(
                "unknown primitive `{other}`"
            ))),
        }
    }

    /// Advance `state` the way a successful execution does. Replayed verbatim
    /// by recovery when the oracle says the op landed.
    pub fn commit(self, state: &mut SaveRecord) {
        match self {
            Primitive::Move(direction) => {
                state.position = state.position + direction.delta(state.heading, 1);
            }
            Primitive::Turn(turn) => {
                state.heading = state.heading.turned(turn);
            }
        }
        state.fuel = state.fuel.saturating_sub(1);
    }
}

/// Why an in-flight record was halted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Halt {
    FuelMismatch { expected: u32, live: u32 },
    InventoryMismatch { detail: String },
}

impl Halt {
    fn to_error(&self, op: &'static str) -> TrackerError {
        match self {
            Halt::FuelMismatch { expected, live } => TrackerError::FuelMismatch {
                op,
                expected: *expected,
                live: *live,
            },
            Halt::InventoryMismatch { detail } => TrackerError::InventoryMismatch {
                action: op,
                detail: detail.clone(),
            },
        }
    }
}

/// The transient in-flight record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InFlightRecord {
    pub save: SaveRecord,
    pub op_tag: String,
    pub op_params: Value,
    /// Set once the op was found to disagree with the world.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halted: Option<Halt>,
}

/// What recovery concluded about the interrupted op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    NotApplied,
    Applied,
}

/// How [`Tracker::load_or_init`] obtained its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startup {
    Fresh,
    Resumed,
    Recovered(Recovery),
}

/// An inventory-affecting primitive. These do not consume fuel, so there is no
/// completion oracle; the world's inventory is read back instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Manipulation {
    Dig(Side),
    Place(Side),
    Drop { side: Side, count: Option<u32> },
    Suck { side: Side, count: Option<u32> },
}

#[derive(Debug, Serialize, Deserialize)]
struct ManipulationParams {
    side: Side,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
}

impl Manipulation {
    pub fn name(self) -> &'static str {
        match self {
            Manipulation::Dig(_) => "dig",
            Manipulation::Place(_) => "place",
            Manipulation::Drop { .. } => "drop",
            Manipulation::Suck { .. } => "suck",
        }
    }

    /// The code a manipulation reports when it happened.
    pub fn landed_code(self) -> ResultCode {
        match self {
            Manipulation::Dig(_) => ResultCode::Dig(DigOutcome::Dug),
            Manipulation::Place(_) => ResultCode::Place(PlaceOutcome::Placed),
            Manipulation::Drop { .. } => ResultCode::Drop(DropOutcome::Dropped),
            Manipulation::Suck { .. } => ResultCode::Suck(SuckOutcome::Sucked),
        }
    }

    fn params(self, key: Option<&str>) -> Result<Value, serde_json::Error> {
        let (side, count) = match self {
            Manipulation::Dig(side) | Manipulation::Place(side) => (side, None),
            Manipulation::Drop { side, count } | Manipulation::Suck { side, count } => {
                (side, count)
            }
        };
        serde_json::to_value(ManipulationParams {
            side,
            count,
            key: key.map(str::to_string),
        })
    }

    fn decode(tag: &str, params: Value) -> Result<(Self, Option<String>), serde_json::Error> {
        let p: ManipulationParams = serde_json::from_value(params)?;
        let manipulation = match tag {
            "dig" => Manipulation::Dig(p.side),
            "place" => Manipulation::Place(p.side),
            "drop" => Manipulation::Drop {
                side: p.side,
                count: p.count,
            },
            "suck" => Manipulation::Suck {
                side: p.side,
                count: p.count,
            },
            other => {
                return Err(serde::de::Error::custom(format!(
                    "unknown manipulation `{other}`"
                )))
            }
        };
        Ok((manipulation, p.key))
    }
}

/// Anything an in-flight record can describe.
#[derive(Debug, Clone, Copy)]
enum Op {
    Primitive(Primitive),
    Manipulation(Manipulation),
}

impl Op {
    fn type_tag(self) -> &'static str {
        match self {
            Op::Primitive(op) => op.type_tag(),
            Op::Manipulation(op) => op.name(),
        }
    }

    fn decode(tag: &str, params: Value) -> Result<(Self, Option<String>), serde_json::Error> {
        match tag {
            "move" | "turn" => Ok((Op::Primitive(Primitive::decode(tag, params)?), None)),
            _ => {
                let (manipulation, key) = Manipulation::decode(tag, params)?;
                Ok((Op::Manipulation(manipulation), key))
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JournalEntry {
    key: String,
    code: ResultCode,
}

pub struct Tracker {
    label: String,
    world: Box<dyn WorldMut>,
    storage: Box<dyn Storage>,
    state: SaveRecord,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("label", &self.label)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    /// Start tracking: recover from an in-flight record if one exists, else
    /// resume from the save record, else start fresh at the origin facing
    /// north.
    pub fn load_or_init(
        label: impl Into<String>,
        world: Box<dyn WorldMut>,
        storage: Box<dyn Storage>,
    ) -> Result<(Self, Startup), TrackerError> {
        let label = label.into();
        let fuel = world.fuel_level();
        let mut tracker = Self {
            label,
            world,
            storage,
            state: SaveRecord::fresh(fuel),
        };

        let startup = if tracker.storage.exists(&tracker.in_flight_record_name())? {
            Startup::Recovered(tracker.recover()?)
        } else if let Some(saved) =
            load_json::<SaveRecord>(tracker.storage.as_ref(), &tracker.save_record_name())?
        {
            tracker.state = saved;
            if tracker.state.fuel != fuel {
                warn!(
                    label = %tracker.label,
                    saved = tracker.state.fuel,
                    live = fuel,
                    "fuel changed while stopped; adopting live level"
                );
                tracker.state.fuel = fuel;
            }
            Startup::Resumed
        } else {
            Startup::Fresh
        };

        tracker.record_inventory()?;
        tracker.save()?;
        info!(
            label = %tracker.label,
            ?startup,
            position = ?tracker.state.position,
            heading = ?tracker.state.heading,
            fuel = tracker.state.fuel,
            "tracker ready"
        );
        Ok((tracker, startup))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn position(&self) -> Position {
        self.state.position
    }

    pub fn heading(&self) -> Heading {
        self.state.heading
    }

    /// Tracked fuel, as of the last primitive or load.
    pub fn fuel(&self) -> u32 {
        self.state.fuel
    }

    pub fn state(&self) -> &SaveRecord {
        &self.state
    }

    pub fn world(&self) -> &dyn WorldMut {
        self.world.as_ref()
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn storage_mut(&mut self) -> &mut dyn Storage {
        self.storage.as_mut()
    }

    /// Live inventory snapshot.
    pub fn inventory(&self) -> Inventory {
        Inventory::capture(self.world.as_ref())
    }

    pub fn selected_slot(&self) -> u8 {
        self.world.selected_slot()
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.state.extensions.get(key)
    }

    pub fn set_extension(&mut self, key: impl Into<String>, value: Value) {
        self.state.extensions.insert(key.into(), value);
    }

    pub fn save_record_name(&self) -> String {
        save_record_name(&self.label)
    }

    pub fn in_flight_record_name(&self) -> String {
        in_flight_record_name(&self.label)
    }

    pub fn save(&mut self) -> Result<(), TrackerError> {
        let name = self.save_record_name();
        save_json(self.storage.as_mut(), &name, &self.state)?;
        Ok(())
    }

    /// Durably record `op` and the pre-op state. Must complete before the
    /// primitive is attempted.
    pub fn prepare(&mut self, op: Primitive) -> Result<(), TrackerError> {
        self.state.fuel = self.world.fuel_level();
        let params = op.params().map_err(StorageError::from)?;
        self.write_in_flight(op.type_tag(), params)
    }

    /// Durably record `manipulation` together with the inventory it starts
    /// from. `key` is journaled with the outcome if the manipulation lands.
    pub fn prepare_manipulation(
        &mut self,
        manipulation: Manipulation,
        key: Option<&str>,
    ) -> Result<(), TrackerError> {
        self.record_inventory()?;
        let params = manipulation.params(key).map_err(StorageError::from)?;
        self.write_in_flight(manipulation.name(), params)
    }

    fn write_in_flight(&mut self, tag: &str, params: Value) -> Result<(), TrackerError> {
        // A journaled outcome only answers a replay of the very next op.
        self.state.extensions.remove(LAST_MANIPULATION_KEY);
        let record = InFlightRecord {
            save: self.state.clone(),
            op_tag: tag.to_string(),
            op_params: params,
            halted: None,
        };
        let name = self.in_flight_record_name();
        save_json(self.storage.as_mut(), &name, &record)?;
        Ok(())
    }

    /// The tracked state is known-correct again; drop the in-flight record.
    pub fn finish(&mut self, op: Primitive) -> Result<(), TrackerError> {
        self.clear_in_flight(op.type_tag())
    }

    fn clear_in_flight(&mut self, tag: &str) -> Result<(), TrackerError> {
        let name = self.in_flight_record_name();
        self.storage.remove(&name)?;
        debug!(label = %self.label, op = tag, "op finished");
        Ok(())
    }

    /// Mark the in-flight record so no later start reconciles it.
    fn halt(&mut self, halt: Halt) -> Result<(), TrackerError> {
        let name = self.in_flight_record_name();
        if let Some(mut record) = load_json::<InFlightRecord>(self.storage.as_ref(), &name)? {
            record.halted = Some(halt);
            save_json(self.storage.as_mut(), &name, &record)?;
        }
        Ok(())
    }

    /// Reconcile an interrupted op against the world.
    pub fn recover(&mut self) -> Result<Recovery, TrackerError> {
        let name = self.in_flight_record_name();
        let record: InFlightRecord =
            load_json(self.storage.as_ref(), &name)?.ok_or_else(|| TrackerError::InvalidRecord {
                name: name.clone(),
                detail: "no in-flight record to recover from".to_string(),
            })?;
        let (op, key) = Op::decode(&record.op_tag, record.op_params).map_err(|e| {
            TrackerError::InvalidRecord {
                name: name.clone(),
                detail: e.to_string(),
            }
        })?;

        if let Some(halt) = &record.halted {
            error!(
                label = %self.label,
                op = op.type_tag(),
                ?halt,
                "in-flight record was halted; remove it after inspection"
            );
            return Err(halt.to_error(op.type_tag()));
        }

        self.state = record.save;
        let recovery = match op {
            Op::Primitive(primitive) => self.recover_primitive(primitive)?,
            Op::Manipulation(manipulation) => {
                self.recover_manipulation(manipulation, key.as_deref())?
            }
        };

        self.save()?;
        self.clear_in_flight(op.type_tag())?;
        info!(
            label = %self.label,
            op = op.type_tag(),
            ?recovery,
            position = ?self.state.position,
            heading = ?self.state.heading,
            "recovered interrupted op"
        );
        Ok(recovery)
    }

    fn recover_primitive(&mut self, op: Primitive) -> Result<Recovery, TrackerError> {
        let expected = self.state.fuel;
        let live = self.world.fuel_level();

        if live == expected {
            Ok(Recovery::NotApplied)
        } else if expected.checked_sub(1) == Some(live) {
            op.commit(&mut self.state);
            Ok(Recovery::Applied)
        } else {
            error!(
                label = %self.label,
                op = op.type_tag(),
                expected,
                live,
                "fuel oracle inconsistent; refusing to reconcile"
            );
            self.halt(Halt::FuelMismatch { expected, live })?;
            Err(TrackerError::FuelMismatch {
                op: op.type_tag(),
                expected,
                live,
            })
        }
    }

    /// A manipulation that left no trace in the inventory (a dig that yielded
    /// nothing) reads as not applied and will be issued again.
    fn recover_manipulation(
        &mut self,
        manipulation: Manipulation,
        key: Option<&str>,
    ) -> Result<Recovery, TrackerError> {
        let (before, selected) = self.recorded_inventory()?;
        let after = self.inventory();
        let delta = before.diff(&after);
        if delta.is_empty() {
            return Ok(Recovery::NotApplied);
        }

        let code = manipulation.landed_code();
        self.check_accounting(manipulation, code, selected, &delta)?;
        self.store_inventory(&after, selected)?;
        if let Some(key) = key {
            self.journal(key, code)?;
        }
        Ok(Recovery::Applied)
    }

    fn recorded_inventory(&self) -> Result<(Inventory, u8), TrackerError> {
        let invalid = |detail: &str| TrackerError::InvalidRecord {
            name: self.in_flight_record_name(),
            detail: detail.to_string(),
        };
        let inventory = self
            .state
            .extensions
            .get(INVENTORY_KEY)
            .ok_or_else(|| invalid("manipulation record has no inventory snapshot"))?;
        let inventory: Inventory =
            serde_json::from_value(inventory.clone()).map_err(StorageError::from)?;
        let selected = self
            .state
            .extensions
            .get(SELECTED_SLOT_KEY)
            .and_then(Value::as_u64)
            .and_then(|slot| u8::try_from(slot).ok())
            .filter(|&slot| valid_slot(slot))
            .ok_or_else(|| invalid("manipulation record has no selected slot"))?;
        Ok((inventory, selected))
    }

    fn move_refusal(&self, direction: MoveDirection) -> Option<MoveOutcome> {
        if self.world.fuel_level() == 0 {
            return Some(MoveOutcome::NoFuel);
        }
        direction
            .probe_side()
            .filter(|&side| self.world.detect(side))
            .map(|_| MoveOutcome::Obstructed)
    }

    /// Run one recoverable primitive.
    pub fn perform(&mut self, op: Primitive) -> Result<ResultCode, TrackerError> {
        match op {
            Primitive::Move(direction) => self.step(direction).map(ResultCode::Move),
            Primitive::Turn(turn) => self.turn(turn).map(ResultCode::Turn),
        }
    }

    pub fn step(&mut self, direction: MoveDirection) -> Result<MoveOutcome, TrackerError> {
        let refusal = self.move_refusal(direction);
        self.tracked(
            Primitive::Move(direction),
            refusal,
            |tracker| tracker.world.step(direction),
            |outcome| outcome == MoveOutcome::Moved,
        )
    }

    pub fn turn(&mut self, turn: Turn) -> Result<TurnOutcome, TrackerError> {
        let refusal = (self.world.fuel_level() == 0).then_some(TurnOutcome::NoFuel);
        self.tracked(
            Primitive::Turn(turn),
            refusal,
            |tracker| tracker.world.turn(turn),
            |outcome| outcome == TurnOutcome::Turned,
        )
    }

    /// Prepare, issue, commit, save, finish. A `refusal` is returned as is
    /// without touching the world or the records.
    fn tracked<T: Copy + Debug>(
        &mut self,
        op: Primitive,
        refusal: Option<T>,
        issue: impl FnOnce(&mut Self) -> T,
        landed: impl FnOnce(T) -> bool,
    ) -> Result<T, TrackerError> {
        if let Some(outcome) = refusal {
            debug!(label = %self.label, op = op.type_tag(), ?outcome, "refused before prepare");
            return Ok(outcome);
        }

        self.prepare(op)?;
        let before = self.state.fuel;
        let outcome = issue(self);
        self.world.sync()?;
        let live = self.world.fuel_level();

        if landed(outcome) {
            op.commit(&mut self.state);
        }
        if live != self.state.fuel {
            let expected = self.state.fuel;
            error!(
                label = %self.label,
                op = op.type_tag(),
                ?outcome,
                before,
                live,
                "fuel did not track the primitive"
            );
            self.halt(Halt::FuelMismatch { expected, live })?;
            return Err(TrackerError::FuelMismatch {
                op: op.type_tag(),
                expected,
                live,
            });
        }

        self.save()?;
        self.finish(op)?;
        debug!(
            label = %self.label,
            op = op.type_tag(),
            ?outcome,
            position = ?self.state.position,
            heading = ?self.state.heading,
            fuel = self.state.fuel,
            "primitive done"
        );
        Ok(outcome)
    }

    /// Run an inventory-affecting primitive and check that the inventory
    /// changed only in ways the primitive can explain.
    pub fn manipulate(&mut self, manipulation: Manipulation) -> Result<ResultCode, TrackerError> {
        self.manipulate_keyed(manipulation, None)
    }

    /// Like [`manipulate`](Self::manipulate), but issued at most once per
    /// `key`: if the last keyed manipulation landed under the same key, its
    /// outcome is returned without touching the world.
    pub fn manipulate_once(
        &mut self,
        key: &str,
        manipulation: Manipulation,
    ) -> Result<ResultCode, TrackerError> {
        if let Some(code) = self.journaled(key)? {
            debug!(
                label = %self.label,
                action = manipulation.name(),
                %key,
                ?code,
                "already applied; replaying outcome"
            );
            return Ok(code);
        }
        self.manipulate_keyed(manipulation, Some(key))
    }

    fn manipulate_keyed(
        &mut self,
        manipulation: Manipulation,
        key: Option<&str>,
    ) -> Result<ResultCode, TrackerError> {
        self.prepare_manipulation(manipulation, key)?;
        let before = self.inventory();
        let selected = self.world.selected_slot();
        let code = match manipulation {
            Manipulation::Dig(side) => ResultCode::Dig(self.world.dig(side)),
            Manipulation::Place(side) => ResultCode::Place(self.world.place(side)),
            Manipulation::Drop { side, count } => {
                ResultCode::Drop(self.world.drop_items(side, count))
            }
            Manipulation::Suck { side, count } => ResultCode::Suck(self.world.suck(side, count)),
        };
        self.world.sync()?;
        let after = self.inventory();
        let delta = before.diff(&after);

        self.check_accounting(manipulation, code, selected, &delta)?;
        self.store_inventory(&after, selected)?;
        if let (Some(key), true) = (key, code.succeeded()) {
            self.journal(key, code)?;
        }
        self.save()?;
        self.clear_in_flight(manipulation.name())?;
        debug!(
            label = %self.label,
            action = manipulation.name(),
            ?code,
            gained = delta.gained_count(),
            lost = delta.lost_count(),
            "manipulation done"
        );
        Ok(code)
    }

    fn check_accounting(
        &mut self,
        manipulation: Manipulation,
        code: ResultCode,
        selected: u8,
        delta: &InventoryDelta,
    ) -> Result<(), TrackerError> {
        let Err(detail) = account(manipulation, code, selected, delta) else {
            return Ok(());
        };
        error!(
            label = %self.label,
            action = manipulation.name(),
            ?code,
            %detail,
            "inventory diverged from the attempted primitive"
        );
        self.halt(Halt::InventoryMismatch {
            detail: detail.clone(),
        })?;
        Err(TrackerError::InventoryMismatch {
            action: manipulation.name(),
            detail,
        })
    }

    fn journaled(&self, key: &str) -> Result<Option<ResultCode>, TrackerError> {
        let Some(value) = self.state.extensions.get(LAST_MANIPULATION_KEY) else {
            return Ok(None);
        };
        let entry: JournalEntry =
            serde_json::from_value(value.clone()).map_err(StorageError::from)?;
        Ok((entry.key == key).then_some(entry.code))
    }

    fn journal(&mut self, key: &str, code: ResultCode) -> Result<(), TrackerError> {
        let entry = JournalEntry {
            key: key.to_string(),
            code,
        };
        let value = serde_json::to_value(entry).map_err(StorageError::from)?;
        self.set_extension(LAST_MANIPULATION_KEY, value);
        Ok(())
    }

    /// Select a 1-based slot.
    pub fn select(&mut self, slot: u8) -> Result<(), TrackerError> {
        if !valid_slot(slot) || !self.world.select(slot) {
            return Err(TrackerError::InvalidSlot(slot));
        }
        self.world.sync()?;
        self.state.extensions.remove(LAST_MANIPULATION_KEY);
        self.record_inventory()?;
        self.save()
    }

    fn record_inventory(&mut self) -> Result<(), TrackerError> {
        let inventory = self.inventory();
        let selected = self.world.selected_slot();
        self.store_inventory(&inventory, selected)
    }

    fn store_inventory(&mut self, inventory: &Inventory, selected: u8) -> Result<(), TrackerError> {
        let value = serde_json::to_value(inventory).map_err(StorageError::from)?;
        self.set_extension(INVENTORY_KEY, value);
        self.set_extension(SELECTED_SLOT_KEY, Value::from(selected));
        Ok(())
    }
}

/// Check that `delta` is explainable by `manipulation` having produced `code`.
fn account(
    manipulation: Manipulation,
    code: ResultCode,
    selected: u8,
    delta: &InventoryDelta,
) -> Result<(), String> {
    if !code.succeeded() {
        return if delta.is_empty() {
            Ok(())
        } else {
            Err(format!("failed with {code:?} but inventory changed: {delta:?}"))
        };
    }

    match manipulation {
        Manipulation::Dig(_) => {
            if !delta.lost.is_empty() {
                return Err(format!("dig lost items: {:?}", delta.lost));
            }
        }
        Manipulation::Suck { count, .. } => {
            if !delta.lost.is_empty() {
                return Err(format!("suck lost items: {:?}", delta.lost));
            }
            if delta.gained_count() == 0 {
                return Err("suck reported success but nothing was gained".to_string());
            }
            if let Some(limit) = count {
                if delta.gained_count() > limit {
                    return Err(format!(
                        "suck gained {} items, more than the {limit} requested",
                        delta.gained_count()
                    ));
                }
            }
        }
        Manipulation::Place(_) => {
            if !delta.gained.is_empty() {
                return Err(format!("place gained items: {:?}", delta.gained));
            }
            if delta.lost_count() != 1 || !delta.lost_only_from(selected) {
                return Err(format!(
                    "place must consume exactly one item from slot {selected}, lost {:?}",
                    delta.lost
                ));
            }
        }
        Manipulation::Drop { count, .. } => {
            if !delta.gained.is_empty() {
                return Err(format!("drop gained items: {:?}", delta.gained));
            }
            if delta.lost_count() == 0 || !delta.lost_only_from(selected) {
                return Err(format!(
                    "drop must only take from slot {selected}, lost {:?}",
                    delta.lost
                ));
            }
            if let Some(limit) = count {
                if delta.lost_count() > limit {
                    return Err(format!(
                        "drop lost {} items, more than the {limit} requested",
                        delta.lost_count()
                    ));
                }
            }
        }
    }
    Ok(())
}
