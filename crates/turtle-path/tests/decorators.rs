mod common;

use common::{path, run_to_end, tracker, Scripted};
use turtle_core::ActionResult::{self, Failure, Running, Success};
use turtle_core::{
    Block, DigOutcome, MoveDirection, MoveOutcome, OutcomeKind, Position, ResultCode, Side,
    SimWorld,
};
use turtle_path::{
    ConfigError, DieOnFailure, DigAction, Inverter, MoveAction, Node, OnBlocked, PathError,
    Repeater, RepeatUntilFailure, ResultInterpreter, RetryOnFailure, Succeeder,
};

/// Tick `head` once per scripted child result and collect what it returned.
fn run(head: impl Into<Node>, ticks: usize) -> Vec<ActionResult> {
    let world = SimWorld::new(0);
    let mut agent = tracker(&world);
    let mut path = path(head);
    (0..ticks).map(|_| path.tick(&mut agent).unwrap()).collect()
}

#[test]
fn inverter_swaps_terminal_results() {
    let child = Scripted::new(vec![Success, Running, Failure]);
    assert_eq!(
        run(Inverter::new(child.node()), 3),
        vec![Failure, Running, Success]
    );
}

#[test]
fn succeeder_never_fails() {
    let child = Scripted::new(vec![Success, Running, Failure]);
    assert_eq!(
        run(Succeeder::new(child.node()), 3),
        vec![Success, Running, Success]
    );
}

#[test]
fn repeat_until_failure_loops() {
    let child = Scripted::new(vec![Success, Running, Success, Failure]);
    assert_eq!(
        run(RepeatUntilFailure::new(child.node()), 4),
        vec![Running, Running, Running, Failure]
    );
    assert_eq!(child.commits.get(), 2);
}

#[test]
fn repeater_counts_successes_not_ticks() {
    let child = Scripted::new(vec![Success, Running, Success]);
    let repeater = Repeater::new(2, child.node()).unwrap();
    assert_eq!(run(repeater, 3), vec![Running, Running, Success]);
    assert_eq!(child.calls.get(), 3);
}

#[test]
fn repeater_resets_after_each_terminal_result() {
    let world = SimWorld::new(0);
    let mut agent = tracker(&world);
    let child = Scripted::new(vec![Success, Failure, Success, Success]);
    let mut path = path(Repeater::new(2, child.node()).unwrap());

    assert_eq!(path.tick(&mut agent).unwrap(), Running);
    assert_eq!(path.tick(&mut agent).unwrap(), Failure);
    match path.head() {
        Node::Repeater(repeater) => assert_eq!(repeater.count, 0),
        other => panic!("unexpected head {}", other.type_tag()),
    }
    assert_eq!(path.tick(&mut agent).unwrap(), Running);
    assert_eq!(path.tick(&mut agent).unwrap(), Success);
}

#[test]
fn repeater_rejects_zero_times() {
    let err = Repeater::new(0, Scripted::always(Success).node()).unwrap_err();
    assert_eq!(err, ConfigError::ZeroCount("repeater"));
}

#[test]
fn die_on_failure_is_fatal() {
    let world = SimWorld::new(0);
    let mut agent = tracker(&world);
    let child = Scripted::new(vec![Success, Running, Failure]);
    let mut path = path(DieOnFailure::new(child.node()));

    assert_eq!(path.tick(&mut agent).unwrap(), Success);
    assert_eq!(path.tick(&mut agent).unwrap(), Running);
    let err = path.tick(&mut agent).unwrap_err();
    assert!(matches!(&err, PathError::Died { tag } if tag == "scripted"));
    assert!(err.is_fatal());
}

#[test]
fn retry_waits_out_the_delay_before_retrying() {
    let child = Scripted::new(vec![Failure, Success]);
    let retry = RetryOnFailure::with_delay(2, child.node());
    assert_eq!(run(retry, 4), vec![Running, Running, Running, Success]);
    // The child is left alone while cooling down.
    assert_eq!(child.calls.get(), 2);
}

#[test]
fn retry_with_default_delay_skips_one_tick() {
    let child = Scripted::new(vec![Failure, Failure, Success]);
    assert_eq!(
        run(RetryOnFailure::new(child.node()), 5),
        vec![Running, Running, Running, Running, Success]
    );
    assert_eq!(child.calls.get(), 3);
}

#[test]
fn retry_without_delay_retries_next_tick() {
    let child = Scripted::new(vec![Failure, Success]);
    assert_eq!(
        run(RetryOnFailure::with_delay(0, child.node()), 2),
        vec![Running, Success]
    );
}

#[test]
fn interpreter_maps_dig_outcomes() {
    let world = SimWorld::new(0)
        .with_block(Position::new(0, 0, -1), Block::new("stone"))
        .with_block(Position::new(0, 1, 0), Block::unbreakable("bedrock"));
    let mut agent = tracker(&world);

    let dug = ResultCode::Dig(DigOutcome::Dug);
    let nothing = ResultCode::Dig(DigOutcome::NothingToDig);

    let mut strict = path(ResultInterpreter::new(
        OutcomeKind::Dig,
        [dug],
        DigAction::new(Side::Front),
    )
    .unwrap());
    assert_eq!(strict.tick(&mut agent).unwrap(), Success);
    assert_eq!(strict.tick(&mut agent).unwrap(), Failure);
    assert_eq!(strict.state().last_code(), Some(nothing));

    // Clearing the way counts as success whether or not there was a block.
    let mut lenient = path(ResultInterpreter::new(
        OutcomeKind::Dig,
        [dug, nothing],
        DigAction::new(Side::Front),
    )
    .unwrap());
    assert_eq!(lenient.tick(&mut agent).unwrap(), Success);

    let mut up = path(ResultInterpreter::new(
        OutcomeKind::Dig,
        [dug, nothing],
        DigAction::new(Side::Up),
    )
    .unwrap());
    assert_eq!(up.tick(&mut agent).unwrap(), Failure);
    assert_eq!(
        up.state().last_code(),
        Some(ResultCode::Dig(DigOutcome::Unbreakable))
    );
}

#[test]
fn interpreter_fails_without_a_matching_code() {
    // The child succeeds but never issues a primitive, so there is no code.
    let interpreter = ResultInterpreter::new(
        OutcomeKind::Move,
        [ResultCode::Move(MoveOutcome::Moved)],
        Scripted::always(Success).node(),
    )
    .unwrap();
    assert_eq!(run(interpreter, 2), vec![Failure, Failure]);
}

#[test]
fn interpreter_reads_blocked_moves() {
    let world = SimWorld::new(10).with_block(Position::new(0, 0, -2), Block::new("dirt"));
    let mut agent = tracker(&world);
    let walk = MoveAction::new(MoveDirection::Forward, 3)
        .unwrap()
        .with_on_blocked(OnBlocked::Fail);
    let mut path = path(
        ResultInterpreter::new(
            OutcomeKind::Move,
            [ResultCode::Move(MoveOutcome::Obstructed)],
            walk,
        )
        .unwrap(),
    );

    assert_eq!(run_to_end(&mut path, &mut agent, 10), Success);
    assert_eq!(agent.position(), Position::new(0, 0, -1));
    assert_eq!(agent.fuel(), 9);
    // The blocked move forgot its destination.
    assert!(path.state().is_empty());
}

#[test]
fn interpreter_rejects_bad_accept_sets() {
    let empty = ResultInterpreter::new(
        OutcomeKind::Dig,
        Vec::<ResultCode>::new(),
        DigAction::new(Side::Front),
    );
    assert_eq!(
        empty.unwrap_err(),
        ConfigError::BadAcceptSet {
            kind: OutcomeKind::Dig
        }
    );

    let mixed = ResultInterpreter::new(
        OutcomeKind::Dig,
        [
            ResultCode::Dig(DigOutcome::Dug),
            ResultCode::Move(MoveOutcome::Moved),
        ],
        DigAction::new(Side::Front),
    );
    assert!(mixed.is_err());
}
