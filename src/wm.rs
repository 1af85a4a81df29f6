//! The window manager: event dispatcher and control loop.
//!
//! `Wm` owns the registry and the focus state and is the only place either
//! is mutated. Each event is handled to completion (registry update, layout,
//! focus, and every resulting display command) before the next is read.

use std::collections::HashSet;

use anyhow::Result;

use crate::config::{Config, KeyBindings, WmAction};
use crate::display::{DisplayServer, Event, InputInterest, ProcessLauncher};
use crate::focus::{Direction, FocusController};
use crate::layout;
use crate::registry::{Registry, RegistryError};
use crate::state::{StateTransition, StateViolation, ViolationKind};
use crate::tracing::EventTracer;
use crate::types::{ConfigureValues, Handle};

/// Trace entries dumped when an event handler fails
const RECENT_TRACE: usize = 10;

/// The main window manager state
pub struct Wm<D: DisplayServer, L: ProcessLauncher> {
    display: D,
    launcher: L,
    /// Managed clients in tiling order
    registry: Registry,
    /// Which client has input focus
    focus: FocusController,
    /// Key combination -> action
    keybindings: KeyBindings,
    /// Commands launched once after setup
    autostart: Vec<String>,
    /// Whether we should keep running
    running: bool,
    /// Event tracer for debugging
    tracer: EventTracer,
}

impl<D: DisplayServer, L: ProcessLauncher> Wm<D, L> {
    pub fn new(display: D, launcher: L, config: &Config) -> Self {
        Self {
            display,
            launcher,
            registry: Registry::with_capacity(config.general.capacity),
            focus: FocusController::new(),
            keybindings: config.parse_keybindings(),
            autostart: config.general.autostart.clone(),
            running: true,
            tracer: EventTracer::new(),
        }
    }

    /// Take over the display, grab our keys and manage what is already open
    pub fn setup(&mut self) -> Result<()> {
        self.display.become_wm()?;
        self.grab_keys();
        self.adopt_existing_windows()?;
        Ok(())
    }

    /// Grab every configured binding. A key that cannot be grabbed is skipped.
    fn grab_keys(&mut self) {
        if self.keybindings.is_empty() {
            log::warn!("No keybindings configured; bebop can only be stopped externally");
            return;
        }

        for (binding, action) in self.keybindings.bindings() {
            match self.display.grab_key(*binding) {
                Ok(()) => log::info!(
                    "Grabbed {:?} (keysym 0x{:x}, mods 0x{:x})",
                    action,
                    binding.keysym,
                    binding.modifiers
                ),
                Err(e) => log::warn!("Could not grab {:?}: {:#}", action, e),
            }
        }
        log::info!("{} keybindings active", self.keybindings.len());
    }

    /// Manage any windows that were mapped before we started
    fn adopt_existing_windows(&mut self) -> Result<()> {
        for window in self.display.existing_windows()? {
            log::info!("Found existing window 0x{:x}", window);
            if let Err(e) = self.manage_window(window) {
                log::warn!("Failed to adopt window 0x{:x}: {:#}", window, e);
            }
        }
        Ok(())
    }

    /// Launch the autostart commands
    pub fn autostart(&mut self) {
        for command in &self.autostart {
            self.launcher.spawn_detached(command);
        }
    }

    /// Main event loop. Returns once the quit binding fires.
    pub fn run(&mut self) -> Result<()> {
        log::info!("Entering event loop");

        while self.running {
            let event = match self.display.next_event() {
                Ok(event) => event,
                Err(e) => {
                    self.shutdown();
                    return Err(e);
                }
            };
            if let Err(e) = self.handle_event(event) {
                log::error!("Error handling event: {:#}", e);
                for entry in self.tracer.get_last(RECENT_TRACE) {
                    log::debug!(
                        "  #{} +{}ms {} {:?} {}",
                        entry.sequence,
                        entry.timestamp_ms,
                        entry.event_type,
                        entry.window,
                        entry.details
                    );
                }
            }

            self.launcher.reap();

            if cfg!(debug_assertions) {
                for violation in self.validate_state() {
                    log::warn!("State violation ({:?}): {}", violation.kind, violation.description);
                }
            }
        }

        self.shutdown();
        log::info!("Exiting window manager");
        Ok(())
    }

    /// Handle a single event
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        let details = match &event {
            Event::KeyPressed { keysym, modifiers } => {
                format!("keysym=0x{:x} mods=0x{:x}", keysym, modifiers)
            }
            Event::GeometryRequested { values, .. } => format!("{:?}", values),
            _ => String::new(),
        };
        self.tracer.trace_event(event.name(), event.window(), &details);

        match event {
            Event::WindowAppeared(window) => {
                log::debug!("Window 0x{:x} appeared", window);
                self.manage_window(window)?;
            }
            Event::WindowDestroyed(window) => {
                log::debug!("Window 0x{:x} destroyed", window);
                self.unmanage_window(window)?;
            }
            Event::KeyPressed { keysym, modifiers } => {
                self.handle_key_press(keysym, modifiers)?;
            }
            Event::GeometryRequested { handle, values } => {
                self.handle_geometry_request(handle, values)?;
            }
        }

        Ok(())
    }

    /// Start managing a window
    fn manage_window(&mut self, window: Handle) -> Result<()> {
        if self.registry.contains(window) {
            // Client unmapped itself and wants to be shown again
            log::debug!("Window 0x{:x} is already managed, mapping again", window);
            self.display.map_window(window)?;
            return self.apply_layout();
        }

        let geometry = self.display.get_window_geometry(window)?;
        let total_before = self.registry.count();

        let index = match self.registry.add(window, geometry) {
            Ok(index) => index,
            Err(RegistryError::AlreadyManaged(_)) => return Ok(()),
            Err(e) => {
                log::warn!("Not managing window 0x{:x}: {}", window, e);
                self.tracer.trace_transition(&StateTransition::ClientRejected {
                    window,
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };

        log::info!("Managing window 0x{:x} at index {}", window, index);
        self.tracer
            .trace_transition(&StateTransition::ClientManaged { window, index });
        let focus_target = self.focus.on_add(index, total_before);

        if let Err(e) = self.show_window(window) {
            self.registry.remove(window);
            self.focus.on_remove(index, self.registry.count());
            self.tracer.trace_transition(&StateTransition::ClientUnmanaged { window, index });
            return Err(e);
        }

        self.apply_layout()?;

        if let Some(target) = focus_target {
            self.focus_client(target, None)?;
        }
        Ok(())
    }

    /// Subscribe to events on a new client, then show it
    fn show_window(&mut self, window: Handle) -> Result<()> {
        self.display.select_input_events(
            window,
            InputInterest::ENTER_WINDOW | InputInterest::FOCUS_CHANGE,
        )?;
        self.display.map_window(window)
    }

    /// Stop managing a window. Unknown windows are ignored.
    fn unmanage_window(&mut self, window: Handle) -> Result<()> {
        let previous = self.focused_window();

        let Some(index) = self.registry.remove(window) else {
            return Ok(());
        };

        log::info!("Unmanaging window 0x{:x} (was index {})", window, index);
        self.tracer
            .trace_transition(&StateTransition::ClientUnmanaged { window, index });

        match self.focus.on_remove(index, self.registry.count()) {
            Some(target) => self.focus_client(target, previous)?,
            None if self.focus.focused().is_none() && previous.is_some() => {
                self.tracer.trace_transition(&StateTransition::FocusChanged {
                    from: previous,
                    to: None,
                });
            }
            None => {}
        }

        self.apply_layout()
    }

    fn handle_key_press(&mut self, keysym: u32, modifiers: u16) -> Result<()> {
        match self.keybindings.lookup(keysym, modifiers).cloned() {
            Some(action) => self.execute_action(action),
            None => {
                log::trace!("Unbound key: keysym=0x{:x} mods=0x{:x}", keysym, modifiers);
                Ok(())
            }
        }
    }

    /// Execute a window manager action
    fn execute_action(&mut self, action: WmAction) -> Result<()> {
        match action {
            WmAction::Quit => {
                log::info!("Quitting window manager");
                self.running = false;
            }
            WmAction::Spawn(command) => self.launcher.spawn_detached(&command),
            WmAction::CycleFocus(direction) => self.cycle_focus(direction)?,
        }
        Ok(())
    }

    /// Cycle focus to the next/previous client
    fn cycle_focus(&mut self, direction: Direction) -> Result<()> {
        let previous = self.focused_window();
        if let Some(index) = self.focus.cycle(direction, self.registry.count()) {
            self.focus_client(index, previous)?;
            log::info!("Cycled focus {:?} to index {}", direction, index);
        }
        Ok(())
    }

    /// Apply the requested fields, then re-tile. Tiling wins for managed windows.
    fn handle_geometry_request(&mut self, window: Handle, values: ConfigureValues) -> Result<()> {
        log::debug!("Geometry request for 0x{:x}: {:?}", window, values);
        if !values.is_empty() {
            self.display.apply_configure(window, &values)?;
        }
        self.apply_layout()
    }

    /// Raise and give input focus to the client at `index`
    fn focus_client(&mut self, index: usize, previous: Option<Handle>) -> Result<()> {
        let Some(window) = self.registry.get(index).map(|c| c.handle()) else {
            return Ok(());
        };

        self.display.raise_window(window)?;
        self.display.set_input_focus(window)?;

        if previous != Some(window) {
            log::debug!("Focus 0x{:x} -> 0x{:x}", previous.unwrap_or(0), window);
            self.tracer.trace_transition(&StateTransition::FocusChanged {
                from: previous,
                to: Some(window),
            });
        }
        Ok(())
    }

    /// Run the layout engine over every client and push the result out
    fn apply_layout(&mut self) -> Result<()> {
        let screen = self.display.screen();
        let windows = self.registry.handles();
        let geometries = layout::master_stack(windows.len(), screen);

        for (index, (window, rect)) in windows.into_iter().zip(geometries).enumerate() {
            self.display.move_resize_window(window, rect)?;
            self.registry.set_geometry(index, rect);
        }
        Ok(())
    }

    /// Currently focused window (if any)
    pub fn focused_window(&self) -> Option<Handle> {
        self.focus
            .focused()
            .and_then(|i| self.registry.get(i))
            .map(|c| c.handle())
    }

    /// Check the registry and focus invariants
    pub fn validate_state(&self) -> Vec<StateViolation> {
        let mut violations = Vec::new();
        let count = self.registry.count();

        let mut seen = HashSet::new();
        for client in self.registry.clients() {
            if !seen.insert(client.handle()) {
                violations.push(StateViolation {
                    kind: ViolationKind::DuplicateHandle,
                    description: format!(
                        "Window 0x{:x} is tracked more than once",
                        client.handle()
                    ),
                });
            }
        }

        if count > self.registry.capacity() {
            violations.push(StateViolation {
                kind: ViolationKind::CapacityOverflow,
                description: format!(
                    "{} clients exceed capacity {}",
                    count,
                    self.registry.capacity()
                ),
            });
        }

        match self.focus.focused() {
            Some(index) if index >= count => violations.push(StateViolation {
                kind: ViolationKind::FocusOutOfRange,
                description: format!("Focus index {} with {} clients", index, count),
            }),
            None if count > 0 => violations.push(StateViolation {
                kind: ViolationKind::FocusMissing,
                description: format!("{} clients but nothing focused", count),
            }),
            _ => {}
        }

        violations
    }

    /// Release every client
    fn shutdown(&mut self) {
        let released = self.registry.count();
        self.registry.clear();
        self.focus.clear();
        log::info!("Released {} clients", released);
    }
}
