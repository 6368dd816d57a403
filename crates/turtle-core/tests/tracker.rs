use serde_json::json;
use turtle_core::{
    Block, Heading, MemoryStorage, MoveDirection, MoveOutcome, Position, Primitive, ResultCode,
    SaveRecord, SimWorld, Storage, Tracker, Turn, TurnOutcome,
};

#[test]
fn save_record_roundtrips_with_extensions() {
    let mut record = SaveRecord::fresh(42);
    record.position = Position::new(3, -2, 7);
    record.heading = Heading::West;
    record
        .extensions
        .insert("selected_slot".to_string(), json!(4));
    record
        .extensions
        .insert("custom".to_string(), json!({"note": "keep me", "n": [1, 2]}));

    let json = serde_json::to_string(&record).expect("serialize");
    let back: SaveRecord = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, record);
}

#[test]
fn extension_fields_sit_beside_core_fields() {
    let mut record = SaveRecord::fresh(1);
    record.extensions.insert("label".to_string(), json!("x"));
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["label"], json!("x"));
    assert_eq!(value["heading"], json!("north"));
    assert_eq!(value["fuel"], json!(1));
}

#[test]
fn host_extensions_survive_a_restart() {
    let world = SimWorld::new(4);
    let storage = MemoryStorage::new();

    let (mut tracker, _) =
        Tracker::load_or_init("a", Box::new(world.clone()), Box::new(storage.clone())).unwrap();
    tracker.set_extension("job", json!({"rows_done": 3}));
    tracker.turn(Turn::Right).unwrap();
    tracker.step(MoveDirection::Forward).unwrap();
    drop(tracker);

    let (tracker, _) =
        Tracker::load_or_init("a", Box::new(world.clone()), Box::new(storage.clone())).unwrap();
    assert_eq!(tracker.extension("job"), Some(&json!({"rows_done": 3})));
    assert_eq!(tracker.position(), Position::new(1, 0, 0));
    assert_eq!(tracker.heading(), Heading::East);
    assert_eq!(tracker.position(), world.position());
}

#[test]
fn resume_adopts_live_fuel_after_external_refuel() {
    let world = SimWorld::new(2);
    let storage = MemoryStorage::new();

    let (tracker, _) =
        Tracker::load_or_init("a", Box::new(world.clone()), Box::new(storage.clone())).unwrap();
    drop(tracker);
    world.set_fuel(80);

    let (tracker, _) =
        Tracker::load_or_init("a", Box::new(world.clone()), Box::new(storage.clone())).unwrap();
    assert_eq!(tracker.fuel(), 80);
}

#[test]
fn records_are_named_after_the_label() {
    let storage = MemoryStorage::new();
    let (tracker, _) =
        Tracker::load_or_init("digger", Box::new(SimWorld::new(1)), Box::new(storage.clone()))
            .unwrap();
    assert_eq!(tracker.save_record_name(), "digger.save.json");
    assert_eq!(tracker.in_flight_record_name(), "digger.action.json");
    assert_eq!(storage.names(), vec!["digger.save.json".to_string()]);
    assert!(!storage.exists("digger.action.json").unwrap());
}

#[test]
fn perform_reports_the_typed_outcome_as_a_result_code() {
    let world = SimWorld::new(3).with_block(Position::new(1, 0, 0), Block::new("log"));
    let (mut tracker, _) =
        Tracker::load_or_init("p", Box::new(world.clone()), Box::new(MemoryStorage::new()))
            .unwrap();

    assert_eq!(
        tracker.perform(Primitive::Turn(Turn::Right)).unwrap(),
        ResultCode::Turn(TurnOutcome::Turned)
    );
    assert_eq!(
        tracker.perform(Primitive::Move(MoveDirection::Forward)).unwrap(),
        ResultCode::Move(MoveOutcome::Obstructed)
    );
    assert_eq!(tracker.heading(), Heading::East);
    assert_eq!(tracker.fuel(), 2);
    assert_eq!(world.primitive_count(), 1);
}
