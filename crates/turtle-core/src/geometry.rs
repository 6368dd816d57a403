//! Axis-aligned grid geometry: absolute headings, relative turns and
//! coordinate deltas.

use core::ops::Add;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseNameError;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const ORIGIN: Position = Position::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// `None` if any axis leaves the `i32` range.
    pub fn checked_add(self, rhs: Position) -> Option<Position> {
        Some(Position::new(
            self.x.checked_add(rhs.x)?,
            self.y.checked_add(rhs.y)?,
            self.z.checked_add(rhs.z)?,
        ))
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Absolute direction. The agent only ever faces one of the four horizontal
/// headings; `Up`/`Down` exist for vertical deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heading {
    #[default]
    North,
    East,
    South,
    West,
    Up,
    Down,
}

impl Heading {
    pub fn is_horizontal(self) -> bool {
        !matches!(self, Heading::Up | Heading::Down)
    }

    /// Apply one relative turn. Vertical headings are unaffected.
    pub fn turned(self, turn: Turn) -> Heading {
        use Heading::{Down, East, North, South, Up, West};
        match (self, turn) {
            (North, Turn::Right) | (South, Turn::Left) => East,
            (East, Turn::Right) | (West, Turn::Left) => South,
            (South, Turn::Right) | (North, Turn::Left) => West,
            (West, Turn::Right) | (East, Turn::Left) => North,
            (Up, _) => Up,
            (Down, _) => Down,
        }
    }

    pub fn opposite(self) -> Heading {
        match self {
            Heading::North => Heading::South,
            Heading::East => Heading::West,
            Heading::South => Heading::North,
            Heading::West => Heading::East,
            Heading::Up => Heading::Down,
            Heading::Down => Heading::Up,
        }
    }

    /// Coordinate delta for `steps` steps along this heading (north is -z,
    /// east is +x, up is +y).
    pub fn delta(self, steps: i32) -> Position {
        match self {
            Heading::North => Position::new(0, 0, -steps),
            Heading::East => Position::new(steps, 0, 0),
            Heading::South => Position::new(0, 0, steps),
            Heading::West => Position::new(-steps, 0, 0),
            Heading::Up => Position::new(0, steps, 0),
            Heading::Down => Position::new(0, -steps, 0),
        }
    }
}

impl FromStr for Heading {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "north" => Ok(Heading::North),
            "east" => Ok(Heading::East),
            "south" => Ok(Heading::South),
            "west" => Ok(Heading::West),
            "up" => Ok(Heading::Up),
            "down" => Ok(Heading::Down),
            _ => Err(ParseNameError::new("heading", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Left,
    Right,
}

impl FromStr for Turn {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Turn::Left),
            "right" => Ok(Turn::Right),
            _ => Err(ParseNameError::new("turn", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_right_turns_return_to_start() {
        let mut h = Heading::North;
        for _ in 0..4 {
            h = h.turned(Turn::Right);
        }
        assert_eq!(h, Heading::North);
        assert_eq!(Heading::North.turned(Turn::Left), Heading::West);
    }

    #[test]
    fn delta_follows_axis_convention() {
        assert_eq!(Heading::North.delta(2), Position::new(0, 0, -2));
        assert_eq!(Heading::East.delta(-1), Position::new(-1, 0, 0));
        assert_eq!(Heading::Down.delta(1), Position::new(0, -1, 0));
    }

    #[test]
    fn checked_add_rejects_overflow() {
        let edge = Position::new(i32::MAX - 1, 0, i32::MIN);
        assert_eq!(
            edge.checked_add(Position::new(1, 5, 0)),
            Some(Position::new(i32::MAX, 5, i32::MIN))
        );
        assert_eq!(edge.checked_add(Position::new(2, 0, 0)), None);
        assert_eq!(edge.checked_add(Position::new(0, 0, -1)), None);
    }
}
