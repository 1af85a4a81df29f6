//! Focus controller.
//!
//! Tracks which registry index holds input focus. The controller only
//! computes indices; the dispatcher turns a returned target into raise and
//! input-focus requests.

/// Direction for focus cycling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Focused registry index, if any
#[derive(Debug, Default)]
pub struct FocusController {
    focused: Option<usize>,
}

impl FocusController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    /// A client was appended at `new_index`; `total_before` is the registry
    /// size before the add. Returns the index to focus, if focus changed.
    pub fn on_add(&mut self, new_index: usize, total_before: usize) -> Option<usize> {
        if total_before == 0 {
            self.focused = Some(new_index);
            return self.focused;
        }
        None
    }

    /// The client at `removed_index` is gone and `remaining` clients are
    /// left. Returns the index to focus if focus moved to a different client.
    pub fn on_remove(&mut self, removed_index: usize, remaining: usize) -> Option<usize> {
        let focused = self.focused?;

        if focused == removed_index {
            self.focused = if removed_index > 0 {
                Some(removed_index - 1)
            } else if remaining > 0 {
                Some(0)
            } else {
                None
            };
            return self.focused;
        }

        // Same client, shifted down by the compaction
        if focused > removed_index {
            self.focused = Some(focused - 1);
        }
        None
    }

    /// Move focus one step through `count` clients, wrapping at both ends.
    pub fn cycle(&mut self, direction: Direction, count: usize) -> Option<usize> {
        if count < 2 {
            return None;
        }

        let current = self.focused.unwrap_or(0).min(count - 1);
        let next = match direction {
            Direction::Forward => (current + 1) % count,
            Direction::Backward => (current + count - 1) % count,
        };
        self.focused = Some(next);
        self.focused
    }

    pub fn clear(&mut self) {
        self.focused = None;
    }
}
