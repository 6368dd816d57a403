//! A small simulated voxel world.
//!
//! Used by tests, benches and the CLI in place of a real host. Clones share
//! the same world, so a test can hand one clone to a tracker, "kill" the
//! tracker, and keep inspecting or mutating the world through another.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::inventory::valid_slot;
use crate::storage::{load_json, save_json};
use crate::{
    DigOutcome, DropOutcome, Heading, Inventory, ItemStack, MoveDirection, MoveOutcome,
    PlaceOutcome, Position, Side, Storage, StorageError, SuckOutcome, Turn, TurnOutcome,
    WorldMut, WorldView,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    #[serde(default)]
    pub unbreakable: bool,
}

impl Block {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unbreakable: false,
        }
    }

    pub fn unbreakable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unbreakable: true,
        }
    }
}

#[derive(Debug)]
struct SimState {
    position: Position,
    heading: Heading,
    fuel: u32,
    blocks: BTreeMap<Position, Block>,
    floor: BTreeMap<Position, Vec<ItemStack>>,
    inventory: Inventory,
    selected: u8,
    primitives: u64,
}

#[derive(Debug, Clone)]
pub struct SimWorld {
    inner: Rc<RefCell<SimState>>,
}

/// Serializable copy of a [`SimWorld`], so a host can keep the same world
/// across process restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub position: Position,
    pub heading: Heading,
    pub fuel: u32,
    #[serde(default)]
    pub blocks: Vec<(Position, Block)>,
    #[serde(default)]
    pub floor: Vec<(Position, Vec<ItemStack>)>,
    #[serde(default)]
    pub inventory: Inventory,
    pub selected: u8,
}

impl SimWorld {
    /// An empty world with the agent at the origin facing north.
    pub fn new(fuel: u32) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SimState {
                position: Position::ORIGIN,
                heading: Heading::North,
                fuel,
                blocks: BTreeMap::new(),
                floor: BTreeMap::new(),
                inventory: Inventory::new(),
                selected: 1,
                primitives: 0,
            })),
        }
    }

    pub fn with_block(self, at: Position, block: Block) -> Self {
        self.set_block(at, Some(block));
        self
    }

    pub fn set_block(&self, at: Position, block: Option<Block>) {
        let mut s = self.inner.borrow_mut();
        match block {
            Some(block) => s.blocks.insert(at, block),
            None => s.blocks.remove(&at),
        };
    }

    pub fn block_at(&self, at: Position) -> Option<Block> {
        self.inner.borrow().blocks.get(&at).cloned()
    }

    pub fn position(&self) -> Position {
        self.inner.borrow().position
    }

    pub fn heading(&self) -> Heading {
        self.inner.borrow().heading
    }

    /// Overwrite fuel directly, as an outside actor would.
    pub fn set_fuel(&self, fuel: u32) {
        self.inner.borrow_mut().fuel = fuel;
    }

    pub fn give(&self, slot: u8, stack: ItemStack) {
        self.inner.borrow_mut().inventory.set(slot, Some(stack));
    }

    pub fn inventory(&self) -> Inventory {
        self.inner.borrow().inventory.clone()
    }

    pub fn floor_items(&self, at: Position) -> Vec<ItemStack> {
        self.inner
            .borrow()
            .floor
            .get(&at)
            .cloned()
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let s = self.inner.borrow();
        WorldSnapshot {
            position: s.position,
            heading: s.heading,
            fuel: s.fuel,
            blocks: s.blocks.iter().map(|(at, b)| (*at, b.clone())).collect(),
            floor: s.floor.iter().map(|(at, p)| (*at, p.clone())).collect(),
            inventory: s.inventory.clone(),
            selected: s.selected,
        }
    }

    pub fn from_snapshot(snapshot: WorldSnapshot) -> Self {
        let selected = if valid_slot(snapshot.selected) {
            snapshot.selected
        } else {
            1
        };
        Self {
            inner: Rc::new(RefCell::new(SimState {
                position: snapshot.position,
                heading: snapshot.heading,
                fuel: snapshot.fuel,
                blocks: snapshot.blocks.into_iter().collect(),
                floor: snapshot.floor.into_iter().collect(),
                inventory: snapshot.inventory,
                selected,
                primitives: 0,
            })),
        }
    }

    /// Number of effectful primitives issued so far.
    pub fn primitive_count(&self) -> u64 {
        self.inner.borrow().primitives
    }

    fn target(&self, side: Side) -> Position {
        let s = self.inner.borrow();
        s.position + side.delta(s.heading)
    }
}

impl WorldView for SimWorld {
    fn fuel_level(&self) -> u32 {
        self.inner.borrow().fuel
    }

    fn detect(&self, side: Side) -> bool {
        let at = self.target(side);
        self.inner.borrow().blocks.contains_key(&at)
    }

    fn selected_slot(&self) -> u8 {
        self.inner.borrow().selected
    }

    fn item_in_slot(&self, slot: u8) -> Option<ItemStack> {
        self.inner.borrow().inventory.slot(slot).cloned()
    }
}

impl WorldMut for SimWorld {
    fn step(&mut self, direction: MoveDirection) -> MoveOutcome {
        let mut s = self.inner.borrow_mut();
        s.primitives += 1;
        if s.fuel == 0 {
            return MoveOutcome::NoFuel;
        }
        let next = s.position + direction.delta(s.heading, 1);
        if s.blocks.contains_key(&next) {
            return MoveOutcome::Obstructed;
        }
        s.position = next;
        s.fuel -= 1;
        MoveOutcome::Moved
    }

    fn turn(&mut self, turn: Turn) -> TurnOutcome {
        let mut s = self.inner.borrow_mut();
        s.primitives += 1;
        if s.fuel == 0 {
            return TurnOutcome::NoFuel;
        }
        s.heading = s.heading.turned(turn);
        s.fuel -= 1;
        TurnOutcome::Turned
    }

    fn dig(&mut self, side: Side) -> DigOutcome {
        let at = self.target(side);
        let mut s = self.inner.borrow_mut();
        s.primitives += 1;
        let Some(block) = s.blocks.get(&at) else {
            return DigOutcome::NothingToDig;
        };
        if block.unbreakable {
            return DigOutcome::Unbreakable;
        }
        let name = block.name.clone();
        s.blocks.remove(&at);
        if let Some(leftover) = s.inventory.insert(ItemStack::new(name, 1)) {
            let here = s.position;
            s.floor.entry(here).or_default().push(leftover);
        }
        DigOutcome::Dug
    }

    fn place(&mut self, side: Side) -> PlaceOutcome {
        let at = self.target(side);
        let mut s = self.inner.borrow_mut();
        s.primitives += 1;
        let selected = s.selected;
        if s.inventory.slot(selected).is_none() {
            return PlaceOutcome::NothingToPlace;
        }
        if s.blocks.contains_key(&at) {
            return PlaceOutcome::Obstructed;
        }
        let Some(item) = s.inventory.take(selected, 1) else {
            return PlaceOutcome::NothingToPlace;
        };
        s.blocks.insert(at, Block::new(item.name));
        PlaceOutcome::Placed
    }

    fn drop_items(&mut self, side: Side, count: Option<u32>) -> DropOutcome {
        let at = self.target(side);
        let mut s = self.inner.borrow_mut();
        s.primitives += 1;
        let selected = s.selected;
        if s.inventory.slot(selected).is_none() {
            return DropOutcome::NothingToDrop;
        }
        if s.blocks.contains_key(&at) {
            return DropOutcome::NoRoom;
        }
        let Some(items) = s.inventory.take(selected, count.unwrap_or(u32::MAX)) else {
            return DropOutcome::NothingToDrop;
        };
        s.floor.entry(at).or_default().push(items);
        DropOutcome::Dropped
    }

    fn suck(&mut self, side: Side, count: Option<u32>) -> SuckOutcome {
        let at = self.target(side);
        let mut s = self.inner.borrow_mut();
        s.primitives += 1;
        let Some(pile) = s.floor.get(&at) else {
            return SuckOutcome::NothingToSuck;
        };
        let Some(top) = pile.last().cloned() else {
            return SuckOutcome::NothingToSuck;
        };
        if !s.inventory.has_room_for(&top.name) {
            return SuckOutcome::InventoryFull;
        }

        let wanted = count.unwrap_or(u32::MAX).min(top.count);
        let leftover = s.inventory.insert(ItemStack::new(top.name.clone(), wanted));
        let taken = wanted - leftover.map(|l| l.count).unwrap_or(0);

        let emptied = match s.floor.get_mut(&at) {
            Some(pile) => {
                if let Some(last) = pile.last_mut() {
                    last.count -= taken;
                    if last.count == 0 {
                        pile.pop();
                    }
                }
                pile.is_empty()
            }
            None => false,
        };
        if emptied {
            s.floor.remove(&at);
        }
        SuckOutcome::Sucked
    }

    fn select(&mut self, slot: u8) -> bool {
        if !valid_slot(slot) {
            return false;
        }
        self.inner.borrow_mut().selected = slot;
        true
    }
}

/// A [`SimWorld`] that writes its snapshot through to storage on every
/// [`WorldMut::sync`], so the world on disk never lags the tracker's records.
pub struct JournaledWorld {
    world: SimWorld,
    storage: Box<dyn Storage>,
    name: String,
}

impl JournaledWorld {
    /// Load the world saved under `name`, or build one with `init` and save it.
    pub fn open(
        storage: Box<dyn Storage>,
        name: impl Into<String>,
        init: impl FnOnce() -> SimWorld,
    ) -> Result<Self, StorageError> {
        let name = name.into();
        let (world, fresh) = match load_json::<WorldSnapshot>(storage.as_ref(), &name)? {
            Some(snapshot) => (SimWorld::from_snapshot(snapshot), false),
            None => (init(), true),
        };
        let mut journaled = Self {
            world,
            storage,
            name,
        };
        if fresh {
            journaled.sync()?;
        }
        Ok(journaled)
    }

    /// A handle on the live world, shared with this journal.
    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    pub fn record_name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for JournaledWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournaledWorld")
            .field("name", &self.name)
            .field("world", &self.world)
            .finish_non_exhaustive()
    }
}

impl WorldView for JournaledWorld {
    fn fuel_level(&self) -> u32 {
        self.world.fuel_level()
    }

    fn detect(&self, side: Side) -> bool {
        self.world.detect(side)
    }

    fn selected_slot(&self) -> u8 {
        self.world.selected_slot()
    }

    fn item_in_slot(&self, slot: u8) -> Option<ItemStack> {
        self.world.item_in_slot(slot)
    }
}

impl WorldMut for JournaledWorld {
    fn step(&mut self, direction: MoveDirection) -> MoveOutcome {
        self.world.step(direction)
    }

    fn turn(&mut self, turn: Turn) -> TurnOutcome {
        self.world.turn(turn)
    }

    fn dig(&mut self, side: Side) -> DigOutcome {
        self.world.dig(side)
    }

    fn place(&mut self, side: Side) -> PlaceOutcome {
        self.world.place(side)
    }

    fn drop_items(&mut self, side: Side, count: Option<u32>) -> DropOutcome {
        self.world.drop_items(side, count)
    }

    fn suck(&mut self, side: Side, count: Option<u32>) -> SuckOutcome {
        self.world.suck(side, count)
    }

    fn select(&mut self, slot: u8) -> bool {
        self.world.select(slot)
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        save_json(self.storage.as_mut(), &self.name, &self.world.snapshot())
    }
}
