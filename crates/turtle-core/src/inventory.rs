//! Slot snapshots and the per-manipulation diff used for accounting.

use serde::{Deserialize, Serialize};

use crate::WorldView;

pub const SLOT_COUNT: u8 = 16;
pub const STACK_LIMIT: u32 = 64;

/// Save-record extension keys written by the tracker.
pub const INVENTORY_KEY: &str = "inventory";
pub const SELECTED_SLOT_KEY: &str = "selected_slot";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub name: String,
    pub count: u32,
}

impl ItemStack {
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemMatch {
    #[default]
    Any,
    Named(String),
}

impl ItemMatch {
    pub fn matches(&self, stack: &ItemStack) -> bool {
        match self {
            ItemMatch::Any => true,
            ItemMatch::Named(name) => stack.name == *name,
        }
    }
}

pub fn valid_slot(slot: u8) -> bool {
    (1..=SLOT_COUNT).contains(&slot)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    slots: [Option<ItemStack>; SLOT_COUNT as usize],
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture<W: WorldView + ?Sized>(world: &W) -> Self {
        let mut inventory = Self::new();
        for slot in 1..=SLOT_COUNT {
            inventory.set(slot, world.item_in_slot(slot));
        }
        inventory
    }

    pub fn slot(&self, slot: u8) -> Option<&ItemStack> {
        if !valid_slot(slot) {
            return None;
        }
        self.slots[(slot - 1) as usize].as_ref()
    }

    pub fn set(&mut self, slot: u8, stack: Option<ItemStack>) {
        if valid_slot(slot) {
            self.slots[(slot - 1) as usize] = stack.filter(|s| s.count > 0);
        }
    }

    pub fn count_in(&self, slot: u8, item: &ItemMatch) -> u32 {
        self.slot(slot)
            .filter(|s| item.matches(s))
            .map(|s| s.count)
            .unwrap_or(0)
    }

    pub fn count_matching(&self, item: &ItemMatch) -> u32 {
        (1..=SLOT_COUNT).map(|slot| self.count_in(slot, item)).sum()
    }

    pub fn first_slot_matching(&self, item: &ItemMatch) -> Option<u8> {
        (1..=SLOT_COUNT).find(|&slot| self.count_in(slot, item) > 0)
    }

    /// Insert a stack, topping up matching slots before filling empty ones.
    /// Returns whatever did not fit.
    pub fn insert(&mut self, mut stack: ItemStack) -> Option<ItemStack> {
        for existing in self.slots.iter_mut().flatten() {
            if stack.count == 0 {
                break;
            }
            if existing.name == stack.name && existing.count < STACK_LIMIT {
                let moved = (STACK_LIMIT - existing.count).min(stack.count);
                existing.count += moved;
                stack.count -= moved;
            }
        }
        for slot in self.slots.iter_mut() {
            if stack.count == 0 {
                break;
            }
            if slot.is_none() {
                let moved = stack.count.min(STACK_LIMIT);
                *slot = Some(ItemStack::new(stack.name.clone(), moved));
                stack.count -= moved;
            }
        }
        (stack.count > 0).then_some(stack)
    }

    /// Remove up to `count` items from a slot, returning what was taken.
    pub fn take(&mut self, slot: u8, count: u32) -> Option<ItemStack> {
        if !valid_slot(slot) {
            return None;
        }
        let entry = &mut self.slots[(slot - 1) as usize];
        let current = entry.as_mut()?;
        let taken = count.min(current.count);
        if taken == 0 {
            return None;
        }
        current.count -= taken;
        let name = current.name.clone();
        if current.count == 0 {
            *entry = None;
        }
        Some(ItemStack::new(name, taken))
    }

    pub fn has_room_for(&self, name: &str) -> bool {
        self.slots.iter().any(|slot| match slot {
            None => true,
            Some(s) => s.name == name && s.count < STACK_LIMIT,
        })
    }

    /// Per-slot difference from `self` to `after`.
    pub fn diff(&self, after: &Inventory) -> InventoryDelta {
        let mut delta = InventoryDelta::default();
        for slot in 1..=SLOT_COUNT {
            match (self.slot(slot), after.slot(slot)) {
                (None, None) => {}
                (Some(b), Some(a)) if b.name == a.name => {
                    if a.count > b.count {
                        delta
                            .gained
                            .push((slot, ItemStack::new(a.name.clone(), a.count - b.count)));
                    } else if b.count > a.count {
                        delta
                            .lost
                            .push((slot, ItemStack::new(b.name.clone(), b.count - a.count)));
                    }
                }
                (before, after) => {
                    if let Some(b) = before {
                        delta.lost.push((slot, b.clone()));
                    }
                    if let Some(a) = after {
                        delta.gained.push((slot, a.clone()));
                    }
                }
            }
        }
        delta
    }
}

/// Items gained and lost across one manipulation, by 1-based slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryDelta {
    pub gained: Vec<(u8, ItemStack)>,
    pub lost: Vec<(u8, ItemStack)>,
}

impl InventoryDelta {
    pub fn is_empty(&self) -> bool {
        self.gained.is_empty() && self.lost.is_empty()
    }

    pub fn gained_count(&self) -> u32 {
        self.gained.iter().map(|(_, s)| s.count).sum()
    }

    pub fn lost_count(&self) -> u32 {
        self.lost.iter().map(|(_, s)| s.count).sum()
    }

    /// True if every loss came from `slot`.
    pub fn lost_only_from(&self, slot: u8) -> bool {
        self.lost.iter().all(|(s, _)| *s == slot)
    }
}
