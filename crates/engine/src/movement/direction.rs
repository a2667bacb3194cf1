use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Facing of an actor. The discriminant is the persisted code and doubles
/// as the index into [`Direction::ALL`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Direction {
    #[default]
    Down = 0,
    Left = 1,
    Right = 2,
    Up = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectionError {
    #[error("unknown direction code {0}")]
    UnknownCode(u8),
    #[error("unknown direction name '{0}'")]
    UnknownName(String),
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Up,
    ];

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
        }
    }

    pub const fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// Pixel offset of one step, y growing downward.
    pub(crate) fn step_offset(self, speed: f32) -> (f32, f32) {
        match self {
            Direction::Down => (0.0, speed),
            Direction::Left => (-speed, 0.0),
            Direction::Right => (speed, 0.0),
            Direction::Up => (0.0, -speed),
        }
    }
}

impl From<Direction> for u8 {
    fn from(direction: Direction) -> Self {
        direction.code()
    }
}

impl TryFrom<u8> for Direction {
    type Error = DirectionError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Direction::from_code(code).ok_or(DirectionError::UnknownCode(code))
    }
}

impl FromStr for Direction {
    type Err = DirectionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim();
        Direction::ALL
            .into_iter()
            .find(|direction| direction.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| DirectionError::UnknownName(name.to_string()))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Steps needed to cross one tile: the tile dimension along the facing axis
/// divided by `speed`. An unknown direction code yields `NaN`; callers must
/// check before doing arithmetic with it.
pub fn pixels_per_tile(direction_code: u8, tile_width: f32, tile_height: f32, speed: f32) -> f32 {
    match Direction::from_code(direction_code) {
        Some(direction) if direction.is_vertical() => tile_height / speed,
        Some(_) => tile_width / speed,
        None => f32::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_fixed_table() {
        assert_eq!(Direction::Down.code(), 0);
        assert_eq!(Direction::Left.code(), 1);
        assert_eq!(Direction::Right.code(), 2);
        assert_eq!(Direction::Up.code(), 3);
        for (index, direction) in Direction::ALL.into_iter().enumerate() {
            assert_eq!(direction.code() as usize, index);
        }
    }

    #[test]
    fn name_to_code_to_name_round_trips() {
        let code = "left".parse::<Direction>().expect("left").code();
        assert_eq!(Direction::from_code(code), Some(Direction::Left));
        assert_eq!(Direction::try_from(Direction::Left.code()), Ok(Direction::Left));
        assert_eq!(Direction::Left.to_string(), "left");
    }

    #[test]
    fn unknown_codes_and_names_are_errors() {
        assert_eq!(Direction::from_code(4), None);
        assert_eq!(Direction::try_from(7), Err(DirectionError::UnknownCode(7)));
        assert_eq!(
            "north".parse::<Direction>(),
            Err(DirectionError::UnknownName("north".to_string()))
        );
        assert_eq!(" UP ".parse::<Direction>(), Ok(Direction::Up));
    }

    #[test]
    fn serializes_as_numeric_code() {
        let json = serde_json::to_string(&Direction::Right).expect("serialize");
        assert_eq!(json, "2");
        let parsed: Direction = serde_json::from_str("3").expect("deserialize");
        assert_eq!(parsed, Direction::Up);
        assert!(serde_json::from_str::<Direction>("9").is_err());
    }

    #[test]
    fn pixels_per_tile_uses_axis_dimension() {
        assert_eq!(pixels_per_tile(Direction::Up.code(), 16.0, 32.0, 2.0), 16.0);
        assert_eq!(pixels_per_tile(Direction::Down.code(), 16.0, 32.0, 2.0), 16.0);
        assert_eq!(pixels_per_tile(Direction::Left.code(), 16.0, 32.0, 2.0), 8.0);
        assert_eq!(pixels_per_tile(Direction::Right.code(), 16.0, 32.0, 4.0), 4.0);
        assert!(pixels_per_tile(42, 16.0, 32.0, 2.0).is_nan());
    }
}
