use x11rb::atom_manager;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::error::Result;

atom_manager! {
    pub Atoms: AtomsCookie {
        WM_STATE,
        WM_CLASS,
        WM_NAME,
        WM_WINDOW_ROLE,
        UTF8_STRING,
        _NET_WM_NAME,
        // EWMH window type atoms
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_NORMAL,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_WM_WINDOW_TYPE_DESKTOP,
        _NET_WM_WINDOW_TYPE_TOOLBAR,
        _NET_WM_WINDOW_TYPE_MENU,
        _NET_WM_WINDOW_TYPE_UTILITY,
        _NET_WM_WINDOW_TYPE_SPLASH,
        _NET_WM_WINDOW_TYPE_DIALOG,
        _NET_WM_WINDOW_TYPE_DROPDOWN_MENU,
        _NET_WM_WINDOW_TYPE_POPUP_MENU,
        _NET_WM_WINDOW_TYPE_TOOLTIP,
        _NET_WM_WINDOW_TYPE_NOTIFICATION,
        _NET_WM_WINDOW_TYPE_COMBO,
        _NET_WM_WINDOW_TYPE_DND,
        // EWMH window state atoms
        _NET_WM_STATE,
        _NET_WM_STATE_MODAL,
        _NET_WM_STATE_STICKY,
        _NET_WM_STATE_MAXIMIZED_VERT,
        _NET_WM_STATE_MAXIMIZED_HORZ,
        _NET_WM_STATE_SHADED,
        _NET_WM_STATE_SKIP_TASKBAR,
        _NET_WM_STATE_SKIP_PAGER,
        _NET_WM_STATE_HIDDEN,
        _NET_WM_STATE_FULLSCREEN,
        _NET_WM_STATE_ABOVE,
        _NET_WM_STATE_BELOW,
        _NET_WM_STATE_DEMANDS_ATTENTION,
        _NET_WM_WINDOW_OPACITY,
        // Root window desktop atoms
        _NET_SHOWING_DESKTOP,
        _NET_DESKTOP_VIEWPORT,
        _NET_CURRENT_DESKTOP,
        _NET_WORKAREA,
    }
}

pub struct XConnection {
    pub conn: RustConnection,
    pub screen_num: usize,
    pub atoms: Atoms,
    pub root: Window,
    pub screen_width: u16,
    pub screen_height: u16,
}

impl XConnection {
    pub fn new() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let screen = &conn.setup().roots[screen_num];

        let atoms = Atoms::new(&conn)?.reply()?;

        Ok(Self {
            root: screen.root,
            screen_width: screen.width_in_pixels,
            screen_height: screen.height_in_pixels,
            conn,
            screen_num,
            atoms,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    /// Sync with X server - ensures all previous requests are fully processed.
    pub fn sync(&self) -> Result<()> {
        // GetInputFocus is a cheap round-trip that forces the server to process all pending requests
        self.conn.get_input_focus()?.reply()?;
        Ok(())
    }

    /// Listen for window lifecycle, moves and root property changes.
    pub fn select_root_events(&self) -> Result<()> {
        self.conn.change_window_attributes(
            self.root,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::SUBSTRUCTURE_NOTIFY | EventMask::PROPERTY_CHANGE),
        )?;
        Ok(())
    }

    /// Read a 32-bit property. Missing properties read as empty.
    pub fn get_cardinals(&self, window: Window, property: Atom, type_: impl Into<Atom>) -> Result<Vec<u32>> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, 1024)?
            .reply()?;
        Ok(reply.value32().map(|values| values.collect()).unwrap_or_default())
    }

    pub fn get_atoms(&self, window: Window, property: Atom) -> Result<Vec<Atom>> {
        self.get_cardinals(window, property, AtomEnum::ATOM)
    }

    pub fn set_atoms(&self, window: Window, property: Atom, atoms: &[Atom]) -> Result<()> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, AtomEnum::ATOM, atoms)?;
        Ok(())
    }

    pub fn set_cardinal(&self, window: Window, property: Atom, value: u32) -> Result<()> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, AtomEnum::CARDINAL, &[value])?;
        Ok(())
    }

    pub fn delete_property(&self, window: Window, property: Atom) -> Result<()> {
        self.conn.delete_property(window, property)?;
        Ok(())
    }

    /// Whether the root window currently advertises show-desktop mode.
    pub fn showing_desktop(&self) -> Result<bool> {
        let values = self.get_cardinals(self.root, self.atoms._NET_SHOWING_DESKTOP, AtomEnum::CARDINAL)?;
        Ok(values.first().is_some_and(|v| *v != 0))
    }

    /// Ask whoever manages the desktop to enter or leave show-desktop mode.
    pub fn request_showing_desktop(&self, show: bool) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            self.root,
            self.atoms._NET_SHOWING_DESKTOP,
            [u32::from(show), 0, 0, 0, 0],
        );
        self.conn.send_event(
            false,
            self.root,
            EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
            event,
        )?;
        log::debug!("Sent _NET_SHOWING_DESKTOP={}", show);
        Ok(())
    }

    pub fn focus_root(&self) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, self.root, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    pub fn move_frame(&self, frame: Window, x: i32, y: i32) -> Result<()> {
        self.conn
            .configure_window(frame, &ConfigureWindowAux::new().x(x).y(y))?;
        Ok(())
    }

    /// Top-level window under the pointer while some other client holds the
    /// pointer grab. Interactive moves and resizes run under such a grab.
    pub fn grabbed_frame(&self) -> Result<Option<Window>> {
        let status = self
            .conn
            .grab_pointer(
                false,
                self.root,
                EventMask::NO_EVENT,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                x11rb::CURRENT_TIME,
            )?
            .reply()?
            .status;
        if status == GrabStatus::SUCCESS {
            self.conn.ungrab_pointer(x11rb::CURRENT_TIME)?;
            return Ok(None);
        }
        let child = self.conn.query_pointer(self.root)?.reply()?.child;
        Ok(grab_target(status, child))
    }
}

/// Which top-level window a failed grab attempt points at.
fn grab_target(status: GrabStatus, pointer_child: Window) -> Option<Window> {
    let held_elsewhere = status == GrabStatus::ALREADY_GRABBED || status == GrabStatus::FROZEN;
    (held_elsewhere && pointer_child != x11rb::NONE).then_some(pointer_child)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grab_target() {
        assert_eq!(grab_target(GrabStatus::ALREADY_GRABBED, 0x1200007), Some(0x1200007));
        assert_eq!(grab_target(GrabStatus::FROZEN, 0x1200007), Some(0x1200007));
        // Grabbed, but the pointer is over the root itself
        assert_eq!(grab_target(GrabStatus::ALREADY_GRABBED, x11rb::NONE), None);
        assert_eq!(grab_target(GrabStatus::NOT_VIEWABLE, 0x1200007), None);
        assert_eq!(grab_target(GrabStatus::INVALID_TIME, 0x1200007), None);
    }
}
