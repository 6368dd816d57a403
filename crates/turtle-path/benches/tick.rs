use criterion::{black_box, criterion_group, criterion_main, Criterion};
use turtle_core::{ItemMatch, MemoryStorage, SimWorld, Tracker};
use turtle_path::{
    ActionPath, CountMode, FuelCheck, InventoryCheck, Node, Registry, Sequence, TurnAction,
};

fn bench_checks_tick(c: &mut Criterion) {
    let world = SimWorld::new(0);
    let (mut tracker, _) =
        Tracker::load_or_init("bench", Box::new(world), Box::new(MemoryStorage::new())).unwrap();

    let checks: Vec<Node> = (0..32)
        .map(|i| {
            if i % 2 == 0 {
                FuelCheck::new(0).into()
            } else {
                InventoryCheck::new(None, ItemMatch::Any, 0, CountMode::AtLeast)
                    .unwrap()
                    .into()
            }
        })
        .collect();
    let mut path = ActionPath::with_registry(Sequence::new(checks).unwrap(), Registry::builtin());

    c.bench_function("turtle-path/tick(checks=32)", |b| {
        b.iter(|| black_box(path.tick(&mut tracker).unwrap()))
    });
}

fn bench_turning_tick(c: &mut Criterion) {
    // Each tick issues at most one tracked turn, with its record writes.
    let world = SimWorld::new(u32::MAX);
    let (mut tracker, _) =
        Tracker::load_or_init("bench", Box::new(world), Box::new(MemoryStorage::new())).unwrap();
    let mut path = ActionPath::with_registry(TurnAction::around(), Registry::builtin());

    c.bench_function("turtle-path/tick(turn-around)", |b| {
        b.iter(|| black_box(path.tick(&mut tracker).unwrap()))
    });
}

fn bench_save_load(c: &mut Criterion) {
    let children: Vec<Node> = (0..32).map(|_| FuelCheck::new(0).into()).collect();
    let path = ActionPath::with_registry(Sequence::new(children).unwrap(), Registry::builtin());
    let bytes = path.save().unwrap();
    let mut restored = ActionPath::with_registry(FuelCheck::new(0), Registry::builtin());

    c.bench_function("turtle-path/load(children=32)", |b| {
        b.iter(|| restored.load(black_box(&bytes)).unwrap())
    });
}

criterion_group!(benches, bench_checks_tick, bench_turning_tick, bench_save_load);
criterion_main!(benches);
