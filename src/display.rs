//! Interfaces between the window manager core and the outside world.
//!
//! The dispatcher only talks to the display server and to the process
//! launcher through these traits. The X11 backend lives in [`crate::x11`],
//! the shell launcher in [`crate::launcher`], and tests use in-memory fakes.

use std::ops::BitOr;

use anyhow::Result;

use crate::config::ParsedBinding;
use crate::types::{ConfigureValues, Handle, Rect};

/// Inbound events the control loop reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A client asked to be shown
    WindowAppeared(Handle),
    /// A window was destroyed
    WindowDestroyed(Handle),
    /// A grabbed key combination was pressed (lock modifiers already removed)
    KeyPressed { keysym: u32, modifiers: u16 },
    /// A client asked for new geometry
    GeometryRequested {
        handle: Handle,
        values: ConfigureValues,
    },
}

impl Event {
    /// Short name used in traces
    pub fn name(&self) -> &'static str {
        match self {
            Event::WindowAppeared(_) => "WindowAppeared",
            Event::WindowDestroyed(_) => "WindowDestroyed",
            Event::KeyPressed { .. } => "KeyPressed",
            Event::GeometryRequested { .. } => "GeometryRequested",
        }
    }

    /// Window the event refers to, if any
    pub fn window(&self) -> Option<Handle> {
        match self {
            Event::WindowAppeared(w) | Event::WindowDestroyed(w) => Some(*w),
            Event::GeometryRequested { handle, .. } => Some(*handle),
            Event::KeyPressed { .. } => None,
        }
    }
}

/// Per-client event interest selected when a window becomes managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputInterest(u8);

impl InputInterest {
    pub const ENTER_WINDOW: Self = Self(1);
    pub const FOCUS_CHANGE: Self = Self(1 << 1);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for InputInterest {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The display server as seen by the window manager core
pub trait DisplayServer {
    /// Size of the screen being tiled, as a rectangle at the origin
    fn screen(&self) -> Rect;

    /// Take over window management on the root window and start listening
    /// for structural and key-press events.
    fn become_wm(&mut self) -> Result<()>;

    /// Grab a key combination on the root window
    fn grab_key(&mut self, binding: ParsedBinding) -> Result<()>;

    /// Top-level windows that are already visible, bottom to top
    fn existing_windows(&self) -> Result<Vec<Handle>>;

    fn get_window_geometry(&self, handle: Handle) -> Result<Rect>;

    fn select_input_events(&mut self, handle: Handle, interest: InputInterest) -> Result<()>;

    fn map_window(&mut self, handle: Handle) -> Result<()>;

    fn move_resize_window(&mut self, handle: Handle, rect: Rect) -> Result<()>;

    fn set_input_focus(&mut self, handle: Handle) -> Result<()>;

    fn raise_window(&mut self, handle: Handle) -> Result<()>;

    /// Apply exactly the fields present in `values`
    fn apply_configure(&mut self, handle: Handle, values: &ConfigureValues) -> Result<()>;

    /// Block until the next event the core cares about arrives
    fn next_event(&mut self) -> Result<Event>;
}

/// Launches external programs without waiting for them
pub trait ProcessLauncher {
    /// Start `command_line` detached. Failures are logged, never returned.
    fn spawn_detached(&mut self, command_line: &str);

    /// Collect exited children, returning how many were collected.
    /// Called between events.
    fn reap(&mut self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_interest_flags() {
        let interest = InputInterest::ENTER_WINDOW | InputInterest::FOCUS_CHANGE;
        assert!(interest.contains(InputInterest::ENTER_WINDOW));
        assert!(interest.contains(InputInterest::FOCUS_CHANGE));
        assert!(!InputInterest::default().contains(InputInterest::ENTER_WINDOW));
    }

    #[test]
    fn test_event_window() {
        assert_eq!(Event::WindowAppeared(5).window(), Some(5));
        assert_eq!(
            Event::KeyPressed {
                keysym: 0x71,
                modifiers: 4
            }
            .window(),
            None
        );
        assert_eq!(Event::WindowDestroyed(9).name(), "WindowDestroyed");
    }
}
