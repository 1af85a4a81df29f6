//! X11 display backend.
//!
//! Implements [`DisplayServer`] on top of an x11rb connection: translates
//! raw X events into the core's [`Event`]s and forwards geometry and focus
//! commands to the server.

use anyhow::{Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event as XEvent;
use x11rb::rust_connection::RustConnection;

use crate::config::ParsedBinding;
use crate::display::{DisplayServer, Event, InputInterest};
use crate::types::{ConfigureValues, Handle, Rect};

/// Modifier bits that are real modifiers (not pointer buttons)
const MODIFIER_BITS: u16 = 0x00ff;
/// CapsLock
const LOCK_MASK: u16 = 1 << 1;
/// NumLock is usually Mod2
const NUMLOCK_MASK: u16 = 1 << 4;

/// Strip lock keys and button state from a key event's modifier state
pub fn clean_modifiers(state: u16) -> u16 {
    state & MODIFIER_BITS & !(LOCK_MASK | NUMLOCK_MASK)
}

/// Keycode <-> keysym table, first column only
#[derive(Debug, Clone)]
pub struct KeyboardMap {
    min_keycode: Keycode,
    keysyms_per_keycode: usize,
    keysyms: Vec<Keysym>,
}

impl KeyboardMap {
    pub fn new(min_keycode: Keycode, keysyms_per_keycode: u8, keysyms: Vec<Keysym>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode: keysyms_per_keycode as usize,
            keysyms,
        }
    }

    fn fetch(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let max_keycode = setup.max_keycode;

        let mapping = conn
            .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)?
            .reply()
            .context("Failed to read keyboard mapping")?;

        Ok(Self::new(
            min_keycode,
            mapping.keysyms_per_keycode,
            mapping.keysyms,
        ))
    }

    /// Unshifted keysym for a keycode, 0 if unknown
    pub fn keysym(&self, keycode: Keycode) -> Keysym {
        if keycode < self.min_keycode || self.keysyms_per_keycode == 0 {
            return 0;
        }
        let idx = (keycode - self.min_keycode) as usize * self.keysyms_per_keycode;
        self.keysyms.get(idx).copied().unwrap_or(0)
    }

    /// Lowest keycode producing `keysym` in any column
    pub fn keycode(&self, keysym: Keysym) -> Option<Keycode> {
        if self.keysyms_per_keycode == 0 || keysym == 0 {
            return None;
        }
        self.keysyms
            .chunks(self.keysyms_per_keycode)
            .position(|chunk| chunk.contains(&keysym))
            .map(|i| self.min_keycode + i as u8)
    }
}

/// Extract the fields a client actually asked for
pub fn configure_values(event: &ConfigureRequestEvent) -> ConfigureValues {
    let mask = u16::from(event.value_mask);
    let has = |flag: ConfigWindow| mask & u16::from(flag) != 0;

    ConfigureValues {
        x: has(ConfigWindow::X).then_some(i32::from(event.x)),
        y: has(ConfigWindow::Y).then_some(i32::from(event.y)),
        width: has(ConfigWindow::WIDTH).then_some(u32::from(event.width)),
        height: has(ConfigWindow::HEIGHT).then_some(u32::from(event.height)),
        border_width: has(ConfigWindow::BORDER_WIDTH).then_some(u32::from(event.border_width)),
        sibling: has(ConfigWindow::SIBLING).then_some(event.sibling),
        stack_mode: has(ConfigWindow::STACK_MODE).then_some(u32::from(event.stack_mode)),
    }
}

/// A live connection to an X server
pub struct X11Display {
    conn: RustConnection,
    screen_num: usize,
    root: Window,
    keymap: KeyboardMap,
}

impl X11Display {
    /// Connect to the X server named by `$DISPLAY`
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) =
            RustConnection::connect(None).context("Failed to connect to X11 server")?;

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        log::info!(
            "Connected to X11, screen {}, root window 0x{:x}, {}x{}",
            screen_num,
            root,
            screen.width_in_pixels,
            screen.height_in_pixels
        );

        let keymap = KeyboardMap::fetch(&conn)?;

        Ok(Self {
            conn,
            screen_num,
            root,
            keymap,
        })
    }

    fn screen_info(&self) -> &Screen {
        &self.conn.setup().roots[self.screen_num]
    }

    /// Map a raw X event to a core event, or `None` for events we ignore
    fn translate(&mut self, event: XEvent) -> Result<Option<Event>> {
        let translated = match event {
            XEvent::MapRequest(e) => Some(Event::WindowAppeared(e.window)),
            XEvent::DestroyNotify(e) => Some(Event::WindowDestroyed(e.window)),
            XEvent::KeyPress(e) => {
                let state = u16::from(e.state);
                let keysym = self.keymap.keysym(e.detail);
                log::debug!(
                    "KeyPress: keycode={}, keysym=0x{:x}, state=0x{:x}",
                    e.detail,
                    keysym,
                    state
                );
                Some(Event::KeyPressed {
                    keysym,
                    modifiers: clean_modifiers(state),
                })
            }
            XEvent::ConfigureRequest(e) => Some(Event::GeometryRequested {
                handle: e.window,
                values: configure_values(&e),
            }),
            XEvent::MappingNotify(e) => {
                if e.request == Mapping::KEYBOARD {
                    self.keymap = KeyboardMap::fetch(&self.conn)?;
                    log::info!("Keyboard mapping changed, reloaded keysyms");
                }
                None
            }
            XEvent::Error(e) => {
                log::warn!("X11 error: {:?}", e);
                None
            }
            _ => None,
        };
        Ok(translated)
    }
}

impl DisplayServer for X11Display {
    fn screen(&self) -> Rect {
        let screen = self.screen_info();
        Rect::new(
            0,
            0,
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        )
    }

    fn become_wm(&mut self) -> Result<()> {
        // SubstructureRedirect is the key - it makes us the WM
        let event_mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::KEY_PRESS;

        let result = self.conn.change_window_attributes(
            self.root,
            &ChangeWindowAttributesAux::new().event_mask(event_mask),
        );

        self.conn.flush()?;

        if let Err(e) = result?.check() {
            anyhow::bail!("Another window manager is already running! Error: {}", e);
        }

        log::info!("Successfully became the window manager");
        Ok(())
    }

    fn grab_key(&mut self, binding: ParsedBinding) -> Result<()> {
        let keycode = self.keymap.keycode(binding.keysym).with_context(|| {
            format!("No keycode for keysym 0x{:x}", binding.keysym)
        })?;
        let modifiers = ModMask::from(binding.modifiers);

        // Grab with and without NumLock/CapsLock to handle those states
        for extra_mods in [
            ModMask::from(0u16),
            ModMask::LOCK,
            ModMask::M2,
            ModMask::LOCK | ModMask::M2,
        ] {
            self.conn.grab_key(
                false, // owner_events
                self.root,
                modifiers | extra_mods,
                keycode,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?;
        }
        self.conn.flush()?;
        Ok(())
    }

    fn existing_windows(&self) -> Result<Vec<Handle>> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        let mut windows = Vec::new();

        for &window in &tree.children {
            // Window may have vanished since the tree was read
            let attrs = match self.conn.get_window_attributes(window)?.reply() {
                Ok(attrs) => attrs,
                Err(_) => continue,
            };

            // Skip popups, menus and anything not on screen
            if attrs.override_redirect || attrs.map_state != MapState::VIEWABLE {
                continue;
            }
            windows.push(window);
        }

        Ok(windows)
    }

    fn get_window_geometry(&self, handle: Handle) -> Result<Rect> {
        let geometry = self
            .conn
            .get_geometry(handle)?
            .reply()
            .with_context(|| format!("Failed to query geometry of 0x{:x}", handle))?;
        Ok(Rect::new(
            i32::from(geometry.x),
            i32::from(geometry.y),
            u32::from(geometry.width),
            u32::from(geometry.height),
        ))
    }

    fn select_input_events(&mut self, handle: Handle, interest: InputInterest) -> Result<()> {
        let mut mask = EventMask::NO_EVENT;
        if interest.contains(InputInterest::ENTER_WINDOW) {
            mask = mask | EventMask::ENTER_WINDOW;
        }
        if interest.contains(InputInterest::FOCUS_CHANGE) {
            mask = mask | EventMask::FOCUS_CHANGE;
        }

        self.conn.change_window_attributes(
            handle,
            &ChangeWindowAttributesAux::new().event_mask(mask),
        )?;
        Ok(())
    }

    fn map_window(&mut self, handle: Handle) -> Result<()> {
        self.conn.map_window(handle)?;
        Ok(())
    }

    fn move_resize_window(&mut self, handle: Handle, rect: Rect) -> Result<()> {
        // X rejects zero-sized windows
        self.conn.configure_window(
            handle,
            &ConfigureWindowAux::new()
                .x(rect.x)
                .y(rect.y)
                .width(rect.width.max(1))
                .height(rect.height.max(1)),
        )?;
        Ok(())
    }

    fn set_input_focus(&mut self, handle: Handle) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, handle, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn raise_window(&mut self, handle: Handle) -> Result<()> {
        self.conn.configure_window(
            handle,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn apply_configure(&mut self, handle: Handle, values: &ConfigureValues) -> Result<()> {
        let aux = ConfigureWindowAux::new()
            .x(values.x)
            .y(values.y)
            .width(values.width)
            .height(values.height)
            .border_width(values.border_width)
            .sibling(values.sibling)
            .stack_mode(values.stack_mode.map(StackMode::from));
        self.conn.configure_window(handle, &aux)?;
        Ok(())
    }

    fn next_event(&mut self) -> Result<Event> {
        loop {
            // Everything issued for the previous event goes out before we block
            self.conn.flush()?;
            let event = self
                .conn
                .wait_for_event()
                .context("Lost connection to X11 server")?;
            if let Some(event) = self.translate(event)? {
                return Ok(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> KeyboardMap {
        // Keycodes 8..=11, two columns each
        KeyboardMap::new(
            8,
            2,
            vec![
                0x71, 0x51, // 8: q Q
                0xff09, 0xfe20, // 9: Tab ISO_Left_Tab
                0xff0d, 0, // 10: Return
                0x62, 0x42, // 11: b B
            ],
        )
    }

    #[test]
    fn test_keysym_lookup() {
        let map = sample_map();
        assert_eq!(map.keysym(8), 0x71);
        assert_eq!(map.keysym(9), 0xff09);
        assert_eq!(map.keysym(11), 0x62);
        assert_eq!(map.keysym(7), 0);
        assert_eq!(map.keysym(200), 0);
    }

    #[test]
    fn test_keycode_lookup() {
        let map = sample_map();
        assert_eq!(map.keycode(0xff0d), Some(10));
        assert_eq!(map.keycode(0x42), Some(11));
        assert_eq!(map.keycode(0x7a), None);
        assert_eq!(map.keycode(0), None);
    }

    #[test]
    fn test_empty_map() {
        let map = KeyboardMap::new(8, 0, Vec::new());
        assert_eq!(map.keysym(8), 0);
        assert_eq!(map.keycode(0x71), None);
    }

    #[test]
    fn test_clean_modifiers() {
        // Mod4 + CapsLock + NumLock + Button1
        assert_eq!(clean_modifiers(64 | 2 | 16 | 256), 64);
        // Control + Shift stay
        assert_eq!(clean_modifiers(4 | 1), 5);
    }

    #[test]
    fn test_configure_values_keep_stack_mode() {
        let event = ConfigureRequestEvent {
            response_type: CONFIGURE_REQUEST_EVENT,
            stack_mode: StackMode::BELOW,
            sequence: 0,
            parent: 1,
            window: 2,
            sibling: 3,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            border_width: 0,
            value_mask: ConfigWindow::SIBLING | ConfigWindow::STACK_MODE,
        };

        let values = configure_values(&event);
        assert_eq!(values.sibling, Some(3));
        assert_eq!(values.stack_mode, Some(u32::from(StackMode::BELOW)));
        assert_eq!(StackMode::from(values.stack_mode.unwrap()), StackMode::BELOW);
        assert_eq!(values.width, None);
    }

    #[test]
    fn test_configure_values_follow_mask() {
        let event = ConfigureRequestEvent {
            response_type: CONFIGURE_REQUEST_EVENT,
            stack_mode: StackMode::ABOVE,
            sequence: 0,
            parent: 1,
            window: 2,
            sibling: 3,
            x: 10,
            y: 20,
            width: 300,
            height: 200,
            border_width: 4,
            value_mask: ConfigWindow::WIDTH | ConfigWindow::HEIGHT,
        };

        let values = configure_values(&event);
        assert_eq!(values.x, None);
        assert_eq!(values.y, None);
        assert_eq!(values.width, Some(300));
        assert_eq!(values.height, Some(200));
        assert_eq!(values.border_width, None);
        assert_eq!(values.sibling, None);
        assert_eq!(values.stack_mode, None);
    }
}
