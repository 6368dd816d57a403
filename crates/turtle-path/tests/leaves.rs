mod common;

use std::str::FromStr;

use common::{path, run_to_end, tracker, tracker_with, Scripted};
use turtle_core::storage::save_json;
use turtle_core::ActionResult::{Failure, Running, Success};
use turtle_core::{
    Block, DropOutcome, Heading, ItemMatch, ItemStack, MemoryStorage, MoveDirection, Position,
    ResultCode, SaveRecord, Side, SimWorld, SuckOutcome, Turn, WorldView,
};
use turtle_path::{
    ConfigError, CountMode, DropAction, FuelCheck, InventoryCheck, InventorySelect, MoveAction,
    PlaceAction, SelectSlot, Sequence, SuckAction, TurnAction,
};

#[test]
fn move_stores_a_destination_then_steps_once_per_tick() {
    let world = SimWorld::new(10);
    let mut agent = tracker(&world);
    let mut path = path(MoveAction::new(MoveDirection::Forward, 3).unwrap());

    // First tick only plans.
    assert_eq!(path.tick(&mut agent).unwrap(), Running);
    assert_eq!(world.primitive_count(), 0);
    assert_eq!(
        path.state().get_as::<Position>("h:move.destination").unwrap(),
        Some(Position::new(0, 0, -3))
    );

    for expected_fuel in [9, 8, 7] {
        assert_eq!(path.tick(&mut agent).unwrap(), Running);
        assert_eq!(agent.fuel(), expected_fuel);
    }
    assert_eq!(path.tick(&mut agent).unwrap(), Success);
    assert_eq!(agent.position(), Position::new(0, 0, -3));
    assert_eq!(world.position(), agent.position());
    // Committed: the destination is gone, so the next run plans afresh.
    assert!(path.state().is_empty());
}

#[test]
fn move_waits_out_an_obstruction() {
    let ahead = Position::new(0, 0, -1);
    let world = SimWorld::new(10).with_block(ahead, Block::new("gravel"));
    let mut agent = tracker(&world);
    let mut path = path(MoveAction::new(MoveDirection::Forward, 1).unwrap());

    for _ in 0..5 {
        assert_eq!(path.tick(&mut agent).unwrap(), Running);
    }
    assert_eq!(agent.fuel(), 10);

    world.set_block(ahead, None);
    assert_eq!(run_to_end(&mut path, &mut agent, 5), Success);
    assert_eq!(agent.position(), ahead);
}

#[test]
fn move_up_and_back_ignore_heading() {
    let world = SimWorld::new(10);
    let mut agent = tracker(&world);
    let head = Sequence::new(vec![
        TurnAction::new(Turn::Right, 1).unwrap().into(),
        MoveAction::new(MoveDirection::Up, 2).unwrap().into(),
        MoveAction::new(MoveDirection::Back, 1).unwrap().into(),
    ])
    .unwrap();
    let mut path = path(head);

    assert_eq!(run_to_end(&mut path, &mut agent, 20), Success);
    assert_eq!(agent.heading(), Heading::East);
    assert_eq!(agent.position(), Position::new(-1, 2, 0));
    assert_eq!(agent.fuel(), 6);
}

#[test]
fn sibling_moves_keep_separate_destinations() {
    let world = SimWorld::new(10);
    let mut agent = tracker(&world);
    let head = Sequence::new(vec![
        MoveAction::new(MoveDirection::Forward, 1).unwrap().into(),
        MoveAction::new(MoveDirection::Forward, 1).unwrap().into(),
    ])
    .unwrap();
    let mut path = path(head);

    path.tick(&mut agent).unwrap();
    assert!(path.state().get("h.0:move.destination").is_some());
    assert!(path.state().get("h.1:move.destination").is_none());

    assert_eq!(run_to_end(&mut path, &mut agent, 10), Success);
    assert_eq!(agent.position(), Position::new(0, 0, -2));
    assert!(path.state().is_empty());
}

#[test]
fn turn_around_takes_two_turns() {
    let world = SimWorld::new(10);
    let mut agent = tracker(&world);
    let mut path = path(TurnAction::around());

    let results: Vec<_> = (0..4).map(|_| path.tick(&mut agent).unwrap()).collect();
    assert_eq!(results, vec![Running, Running, Running, Success]);
    assert_eq!(agent.heading(), Heading::South);
    assert_eq!(world.heading(), Heading::South);
    assert_eq!(agent.fuel(), 8);
}

#[test]
fn whole_circles_of_turns_are_skipped() {
    let world = SimWorld::new(10);
    let mut agent = tracker(&world);
    let mut circle = path(TurnAction::new(Turn::Right, 4).unwrap());
    assert_eq!(run_to_end(&mut circle, &mut agent, 5), Success);
    assert_eq!(agent.heading(), Heading::North);
    assert_eq!(agent.fuel(), 10);
    assert_eq!(world.primitive_count(), 0);

    let mut five = path(TurnAction::new(Turn::Right, 5).unwrap());
    assert_eq!(run_to_end(&mut five, &mut agent, 5), Success);
    assert_eq!(agent.heading(), Heading::East);
    assert_eq!(agent.fuel(), 9);
}

#[test]
fn move_counts_beyond_the_grid_are_rejected() {
    assert_eq!(
        MoveAction::new(MoveDirection::Forward, u32::MAX).unwrap_err(),
        ConfigError::CountTooLarge {
            tag: "move",
            count: u32::MAX,
        }
    );
    assert!(MoveAction::new(MoveDirection::Forward, i32::MAX as u32).is_ok());
}

#[test]
fn move_off_the_grid_fails_without_stepping() {
    let world = SimWorld::new(10);
    let storage = MemoryStorage::new();
    let mut saved = SaveRecord::fresh(10);
    saved.position = Position::new(0, 0, i32::MIN + 1);
    save_json(&mut storage.clone(), "t.save.json", &saved).unwrap();
    let mut agent = tracker_with(&world, &storage);

    let mut path = path(MoveAction::new(MoveDirection::Forward, 2).unwrap());
    assert_eq!(path.tick(&mut agent).unwrap(), Failure);
    assert_eq!(world.primitive_count(), 0);
    assert_eq!(agent.position(), Position::new(0, 0, i32::MIN + 1));
}

#[test]
fn turn_without_fuel_waits() {
    let world = SimWorld::new(0);
    let mut agent = tracker(&world);
    let mut path = path(TurnAction::new(Turn::Left, 1).unwrap());

    for _ in 0..3 {
        assert_eq!(path.tick(&mut agent).unwrap(), Running);
    }
    assert_eq!(agent.heading(), Heading::North);
    // Refused before reaching the world.
    assert_eq!(world.primitive_count(), 0);

    // Refuelling from outside lets the turn finish.
    world.set_fuel(1);
    assert_eq!(run_to_end(&mut path, &mut agent, 5), Success);
    assert_eq!(agent.heading(), Heading::West);
    assert_eq!(world.fuel_level(), 0);
}

#[test]
fn zero_counts_are_rejected() {
    assert_eq!(
        MoveAction::new(MoveDirection::Forward, 0).unwrap_err(),
        ConfigError::ZeroCount("move")
    );
    assert_eq!(
        TurnAction::new(Turn::Left, 0).unwrap_err(),
        ConfigError::ZeroCount("turn")
    );
    assert_eq!(
        DropAction::new(Side::Front, Some(0)).unwrap_err(),
        ConfigError::ZeroCount("drop")
    );
}

#[test]
fn fuel_check_compares_live_fuel() {
    let world = SimWorld::new(5);
    let mut agent = tracker(&world);

    assert_eq!(path(FuelCheck::new(5)).tick(&mut agent).unwrap(), Success);
    assert_eq!(path(FuelCheck::new(6)).tick(&mut agent).unwrap(), Failure);
}

#[test]
fn inventory_check_modes() {
    let world = SimWorld::new(0);
    world.give(3, ItemStack::new("stone", 10));
    world.give(7, ItemStack::new("stone", 4));
    world.give(9, ItemStack::new("coal", 2));
    let mut agent = tracker(&world);
    let stone = || ItemMatch::Named("stone".into());

    let cases = [
        (Some(3), stone(), 10, CountMode::Exactly, Success),
        (Some(3), stone(), 11, CountMode::AtLeast, Failure),
        (Some(3), stone(), 10, CountMode::AtMost, Success),
        (Some(9), stone(), 0, CountMode::Exactly, Success),
        (None, stone(), 14, CountMode::Exactly, Success),
        (None, ItemMatch::Any, 16, CountMode::AtLeast, Success),
        (Some(16), ItemMatch::Any, 64, CountMode::Exactly, Failure),
    ];
    for (slot, item, count, mode, expected) in cases {
        let check = InventoryCheck::new(slot, item, count, mode).unwrap();
        let mut path = path(check);
        assert_eq!(
            path.tick(&mut agent).unwrap(),
            expected,
            "slot {slot:?} count {count} mode {mode:?}"
        );
    }
}

#[test]
fn count_modes_parse_from_text() {
    assert_eq!(CountMode::from_str("exactly").unwrap(), CountMode::Exactly);
    assert_eq!(CountMode::from_str("at-least").unwrap(), CountMode::AtLeast);
    assert_eq!(CountMode::from_str("AT_MOST").unwrap(), CountMode::AtMost);
    assert_eq!(
        CountMode::from_str("sometimes").unwrap_err(),
        ConfigError::InvalidMode("sometimes".into())
    );
}

#[test]
fn slot_indices_are_validated_up_front() {
    assert_eq!(
        InventoryCheck::new(Some(17), ItemMatch::Any, 1, CountMode::AtLeast).unwrap_err(),
        ConfigError::InvalidSlot(17)
    );
    assert_eq!(SelectSlot::new(0).unwrap_err(), ConfigError::InvalidSlot(0));
    assert!(SelectSlot::new(16).is_ok());
}

#[test]
fn inventory_select_finds_the_first_match() {
    let world = SimWorld::new(0);
    world.give(5, ItemStack::new("torch", 3));
    world.give(8, ItemStack::new("torch", 1));
    let mut agent = tracker(&world);

    let torch = InventorySelect::new(ItemMatch::Named("torch".into()));
    assert_eq!(path(torch).tick(&mut agent).unwrap(), Success);
    assert_eq!(agent.selected_slot(), 5);

    let coal = InventorySelect::new(ItemMatch::Named("coal".into()));
    assert_eq!(path(coal).tick(&mut agent).unwrap(), Failure);
    assert_eq!(agent.selected_slot(), 5);
}

#[test]
fn drop_then_suck_round_trips_items() {
    let world = SimWorld::new(0);
    world.give(1, ItemStack::new("dirt", 5));
    let mut agent = tracker(&world);
    let ahead = Position::new(0, 0, -1);

    let mut drop = path(DropAction::new(Side::Front, Some(2)).unwrap());
    assert_eq!(drop.tick(&mut agent).unwrap(), Success);
    assert_eq!(
        drop.state().last_code(),
        Some(ResultCode::Drop(DropOutcome::Dropped))
    );
    assert_eq!(world.floor_items(ahead), vec![ItemStack::new("dirt", 2)]);
    assert_eq!(agent.inventory().count_in(1, &ItemMatch::Any), 3);

    let mut suck = path(SuckAction::new(Side::Front, None).unwrap());
    assert_eq!(suck.tick(&mut agent).unwrap(), Success);
    assert_eq!(agent.inventory().count_in(1, &ItemMatch::Any), 5);
    assert!(world.floor_items(ahead).is_empty());

    assert_eq!(suck.tick(&mut agent).unwrap(), Failure);
    assert_eq!(
        suck.state().last_code(),
        Some(ResultCode::Suck(SuckOutcome::NothingToSuck))
    );
}

#[test]
fn place_needs_something_selected() {
    let world = SimWorld::new(0);
    let mut agent = tracker(&world);
    let mut place = path(PlaceAction::new(Side::Down));
    assert_eq!(place.tick(&mut agent).unwrap(), Failure);

    world.give(1, ItemStack::new("cobblestone", 1));
    assert_eq!(place.tick(&mut agent).unwrap(), Success);
    assert_eq!(
        world.block_at(Position::new(0, -1, 0)).map(|b| b.name),
        Some("cobblestone".to_string())
    );
}

#[test]
fn custom_leaves_mix_with_builtins() {
    let world = SimWorld::new(10);
    let mut agent = tracker(&world);
    let gate = Scripted::new(vec![Success, Failure]);
    let head = Sequence::new(vec![
        gate.node(),
        MoveAction::new(MoveDirection::Forward, 1).unwrap().into(),
    ])
    .unwrap();
    let mut path = path(head);

    assert_eq!(run_to_end(&mut path, &mut agent, 10), Success);
    assert_eq!(agent.position(), Position::new(0, 0, -1));
    assert_eq!(run_to_end(&mut path, &mut agent, 10), Failure);
    assert_eq!(agent.position(), Position::new(0, 0, -1));
}
