use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Axis along which a container lays out its children.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn perpendicular(self) -> Orientation {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        })
    }
}

/// Where a dragged container lands relative to the drop target.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertKind {
    Left,
    Right,
    Top,
    Bottom,
    /// Swap contents with the target.
    Middle,
    #[default]
    Unset,
}

impl InsertKind {
    /// Axis the insertion splits along; `None` for `Middle` and `Unset`.
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            InsertKind::Left | InsertKind::Right => Some(Orientation::Horizontal),
            InsertKind::Top | InsertKind::Bottom => Some(Orientation::Vertical),
            InsertKind::Middle | InsertKind::Unset => None,
        }
    }

    /// Whether the source lands before the target.
    pub fn is_leading(self) -> bool { matches!(self, InsertKind::Left | InsertKind::Top) }

    pub fn is_directional(self) -> bool { self.orientation().is_some() }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown insert kind `{0}`, expected one of left, right, top, bottom, middle")]
pub struct ParseInsertKindError(String);

impl FromStr for InsertKind {
    type Err = ParseInsertKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(InsertKind::Left),
            "right" => Ok(InsertKind::Right),
            "top" => Ok(InsertKind::Top),
            "bottom" => Ok(InsertKind::Bottom),
            "middle" => Ok(InsertKind::Middle),
            "" | "unset" => Ok(InsertKind::Unset),
            _ => Err(ParseInsertKindError(s.to_owned())),
        }
    }
}
