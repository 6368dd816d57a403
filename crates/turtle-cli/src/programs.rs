//! Built-in demo programs.

use turtle_core::{ItemMatch, MoveDirection, Side, Turn, STACK_LIMIT};
use turtle_path::{
    ConfigError, CountMode, DigAction, DropAction, FuelCheck, InventoryCheck, MoveAction, Node,
    OnBlocked, RepeatUntilFailure, Repeater, RetryOnFailure, SelectSlot, Selector, Sequence,
    Succeeder, TurnAction,
};

use crate::config::{Program, TurtleConfig};

pub fn build(config: &TurtleConfig) -> Result<Node, ConfigError> {
    match config.program {
        Program::Tunnel => tunnel(config.retry_delay_ticks),
        Program::Square => square(config.square_side),
    }
}

/// Once slot 16 holds a full stack, turn around, empty it behind and turn
/// back; otherwise clear the block in front.
pub fn unload_or_dig(retry_delay_ticks: u32) -> Result<Node, ConfigError> {
    let unload = Sequence::new(vec![
        InventoryCheck::new(Some(16), ItemMatch::Any, STACK_LIMIT, CountMode::Exactly)?.into(),
        SelectSlot::new(16)?.into(),
        TurnAction::around().into(),
        RetryOnFailure::with_delay(retry_delay_ticks, DropAction::new(Side::Front, None)?).into(),
        TurnAction::around().into(),
    ])?;
    let dig = Succeeder::new(DigAction::new(Side::Front));
    Ok(Selector::new(vec![unload.into(), dig.into()])?.into())
}

/// Dig forward until out of fuel or stopped by something unbreakable.
pub fn tunnel(retry_delay_ticks: u32) -> Result<Node, ConfigError> {
    let advance = Sequence::new(vec![
        FuelCheck::new(1).into(),
        unload_or_dig(retry_delay_ticks)?,
        // After an unload the block ahead is still there.
        Succeeder::new(DigAction::new(Side::Front)).into(),
        MoveAction::new(MoveDirection::Forward, 1)?
            .with_on_blocked(OnBlocked::Fail)
            .into(),
    ])?;
    Ok(RepeatUntilFailure::new(advance).into())
}

/// One lap of a square with sides of `side` blocks.
pub fn square(side: u32) -> Result<Node, ConfigError> {
    let edge = Sequence::new(vec![
        MoveAction::new(MoveDirection::Forward, side)?.into(),
        TurnAction::new(Turn::Right, 1)?.into(),
    ])?;
    Ok(Repeater::new(4, edge)?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use turtle_core::{
        ActionResult, Block, Heading, ItemStack, MemoryStorage, Position, SimWorld, Tracker,
    };
    use turtle_path::{ActionPath, Registry};

    fn run(head: Node, world: &SimWorld, limit: usize) -> (Tracker, ActionResult) {
        let (mut tracker, _) =
            Tracker::load_or_init("demo", Box::new(world.clone()), Box::new(MemoryStorage::new()))
                .unwrap();
        let mut path = ActionPath::with_registry(head, Registry::builtin());
        for _ in 0..limit {
            let result = path.tick(&mut tracker).unwrap();
            if result.is_terminal() {
                return (tracker, result);
            }
        }
        panic!("program still running after {limit} ticks");
    }

    #[test]
    fn square_ends_where_it_started() {
        let world = SimWorld::new(100);
        let (tracker, result) = run(square(2).unwrap(), &world, 100);
        assert_eq!(result, ActionResult::Success);
        assert_eq!(tracker.position(), Position::ORIGIN);
        assert_eq!(tracker.heading(), Heading::North);
        assert_eq!(tracker.fuel(), 100 - 4 * 2 - 4);
    }

    #[test]
    fn tunnel_stops_at_bedrock() {
        let world = SimWorld::new(50)
            .with_block(Position::new(0, 0, -1), Block::new("stone"))
            .with_block(Position::new(0, 0, -2), Block::new("stone"))
            .with_block(Position::new(0, 0, -3), Block::unbreakable("bedrock"));
        let (tracker, result) = run(tunnel(1).unwrap(), &world, 200);

        assert_eq!(result, ActionResult::Failure);
        assert_eq!(tracker.position(), Position::new(0, 0, -2));
        assert_eq!(
            tracker
                .inventory()
                .count_matching(&ItemMatch::Named("stone".into())),
            2
        );
    }

    #[test]
    fn tunnel_unloads_a_full_slot_behind() {
        let world = SimWorld::new(50)
            .with_block(Position::new(0, 0, -1), Block::unbreakable("bedrock"));
        world.give(16, ItemStack::new("gravel", STACK_LIMIT));
        let (tracker, result) = run(tunnel(1).unwrap(), &world, 200);

        assert_eq!(result, ActionResult::Failure);
        assert_eq!(tracker.heading(), Heading::North);
        assert_eq!(tracker.inventory().slot(16), None);
        assert_eq!(
            world.floor_items(Position::new(0, 0, 1)),
            vec![ItemStack::new("gravel", STACK_LIMIT)]
        );
    }

    #[test]
    fn tunnel_stops_when_fuel_runs_out() {
        let world = SimWorld::new(3);
        let (tracker, result) = run(tunnel(1).unwrap(), &world, 200);
        assert_eq!(result, ActionResult::Failure);
        assert_eq!(tracker.position(), Position::new(0, 0, -3));
        assert_eq!(tracker.fuel(), 0);
    }
}
