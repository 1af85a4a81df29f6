//! Shared types used across multiple modules.
//!
//! Geometry and window identity live here so the registry, the layout
//! engine and the display backends agree on one vocabulary.

use serde::{Deserialize, Serialize};

/// Server-assigned window identifier (an X11 window id).
pub type Handle = u32;

/// A rectangle representing geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// The fields a client asked to change in a geometry request.
///
/// Each `Some` field was present in the request's value mask; `None` fields
/// keep whatever the server currently has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigureValues {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub border_width: Option<u32>,
    /// Sibling window for restacking
    pub sibling: Option<Handle>,
    /// Raw stack mode code (Above, Below, TopIf, BottomIf, Opposite)
    pub stack_mode: Option<u32>,
}

impl ConfigureValues {
    /// True if the request carries no fields at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_request() {
        assert!(ConfigureValues::default().is_empty());
        assert!(!ConfigureValues { stack_mode: Some(0), ..Default::default() }.is_empty());
    }
}
