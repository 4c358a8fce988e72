use x11rb::protocol::xproto::*;

use crate::connection::{Atoms, XConnection};
use crate::error::Result;
use crate::host::{Extents, WindowStateFlags, WindowType};

#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub client_window: Window,
    pub frame_window: Window,
    /// Client origin in root coordinates
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Frame decoration around the client
    pub extents: Extents,
    pub window_type: WindowType,
    pub state: WindowStateFlags,
    /// WM_CLASS instance part
    pub wm_instance: Option<String>,
    /// WM_CLASS class part
    pub wm_class: Option<String>,
    pub title: Option<String>,
    pub role: Option<String>,
    /// Whether the window was mapped (visible) when discovered
    pub is_mapped: bool,
}

/// State atoms paired with the flag each one stands for.
fn state_table(atoms: &Atoms) -> [(Atom, WindowStateFlags); 12] {
    [
        (atoms._NET_WM_STATE_MODAL, WindowStateFlags::MODAL),
        (atoms._NET_WM_STATE_STICKY, WindowStateFlags::STICKY),
        (atoms._NET_WM_STATE_MAXIMIZED_VERT, WindowStateFlags::MAXIMIZED_VERT),
        (atoms._NET_WM_STATE_MAXIMIZED_HORZ, WindowStateFlags::MAXIMIZED_HORZ),
        (atoms._NET_WM_STATE_SHADED, WindowStateFlags::SHADED),
        (atoms._NET_WM_STATE_SKIP_TASKBAR, WindowStateFlags::SKIP_TASKBAR),
        (atoms._NET_WM_STATE_SKIP_PAGER, WindowStateFlags::SKIP_PAGER),
        (atoms._NET_WM_STATE_HIDDEN, WindowStateFlags::HIDDEN),
        (atoms._NET_WM_STATE_FULLSCREEN, WindowStateFlags::FULLSCREEN),
        (atoms._NET_WM_STATE_ABOVE, WindowStateFlags::ABOVE),
        (atoms._NET_WM_STATE_BELOW, WindowStateFlags::BELOW),
        (atoms._NET_WM_STATE_DEMANDS_ATTENTION, WindowStateFlags::DEMANDS_ATTENTION),
    ]
}

pub fn state_from_atoms(atoms: &Atoms, values: &[Atom]) -> WindowStateFlags {
    state_table(atoms)
        .into_iter()
        .filter(|(atom, _)| values.contains(atom))
        .fold(WindowStateFlags::empty(), |acc, (_, flag)| acc | flag)
}

pub fn state_to_atoms(atoms: &Atoms, state: WindowStateFlags) -> Vec<Atom> {
    state_table(atoms)
        .into_iter()
        .filter(|(_, flag)| state.contains(*flag))
        .map(|(atom, _)| atom)
        .collect()
}

/// First recognised type in a `_NET_WM_WINDOW_TYPE` list.
pub fn window_type_from_atoms(atoms: &Atoms, values: &[Atom]) -> WindowType {
    // No _NET_WM_WINDOW_TYPE set = assume NORMAL
    if values.is_empty() {
        return WindowType::Normal;
    }
    let table = [
        (atoms._NET_WM_WINDOW_TYPE_DESKTOP, WindowType::Desktop),
        (atoms._NET_WM_WINDOW_TYPE_DOCK, WindowType::Dock),
        (atoms._NET_WM_WINDOW_TYPE_TOOLBAR, WindowType::Toolbar),
        (atoms._NET_WM_WINDOW_TYPE_MENU, WindowType::Menu),
        (atoms._NET_WM_WINDOW_TYPE_UTILITY, WindowType::Utility),
        (atoms._NET_WM_WINDOW_TYPE_SPLASH, WindowType::Splash),
        (atoms._NET_WM_WINDOW_TYPE_DIALOG, WindowType::Dialog),
        (atoms._NET_WM_WINDOW_TYPE_NORMAL, WindowType::Normal),
        (atoms._NET_WM_WINDOW_TYPE_DROPDOWN_MENU, WindowType::DropdownMenu),
        (atoms._NET_WM_WINDOW_TYPE_POPUP_MENU, WindowType::PopupMenu),
        (atoms._NET_WM_WINDOW_TYPE_TOOLTIP, WindowType::Tooltip),
        (atoms._NET_WM_WINDOW_TYPE_NOTIFICATION, WindowType::Notification),
        (atoms._NET_WM_WINDOW_TYPE_COMBO, WindowType::Combo),
        (atoms._NET_WM_WINDOW_TYPE_DND, WindowType::Dnd),
    ];
    values
        .iter()
        .find_map(|value| table.iter().find(|(atom, _)| atom == value).map(|(_, t)| *t))
        .unwrap_or(WindowType::Unknown)
}

/// Split a raw WM_CLASS value ("instance\0class\0") into its parts.
pub fn split_wm_class(raw: &[u8]) -> (Option<String>, Option<String>) {
    let mut parts = raw
        .split(|b| *b == 0)
        .map(|part| String::from_utf8_lossy(part).to_string());
    let instance = parts.next().filter(|s| !s.is_empty());
    let class = parts.next().filter(|s| !s.is_empty());
    (instance, class)
}

/// Decoration sizes from the client rectangle inside its frame rectangle.
pub fn frame_extents(frame: (i32, i32, i32, i32), client: (i32, i32, i32, i32)) -> Extents {
    let (fx, fy, fw, fh) = frame;
    let (cx, cy, cw, ch) = client;
    Extents {
        left: (cx - fx).max(0),
        right: (fx + fw - (cx + cw)).max(0),
        top: (cy - fy).max(0),
        bottom: (fy + fh - (cy + ch)).max(0),
    }
}

impl XConnection {
    /// Enumerate all application windows, bottom to top.
    pub fn find_windows(&self) -> Result<Vec<WindowInfo>> {
        let mut windows = Vec::new();

        // Get all children of root (these are frame windows)
        // tree.children is in X11 stacking order (bottom-to-top)
        let tree = self.conn.query_tree(self.root)?.reply()?;

        for frame_window in tree.children {
            match self.examine_frame(frame_window) {
                Ok(Some(info)) => {
                    log::debug!(
                        "Found window: {:?} ({:?}) frame=0x{:x} {:?} at {}x{}+{}+{}",
                        info.title,
                        info.wm_class,
                        info.frame_window,
                        info.window_type,
                        info.width,
                        info.height,
                        info.x,
                        info.y
                    );
                    windows.push(info);
                }
                Ok(None) => {}
                Err(e) => {
                    // Window may have been destroyed, skip it
                    log::debug!("Error examining frame 0x{:x}: {}", frame_window, e);
                }
            }
        }

        log::info!("Found {} application windows", windows.len());
        Ok(windows)
    }

    /// Examine a potential frame window to find the client window inside.
    pub fn examine_frame(&self, frame: Window) -> Result<Option<WindowInfo>> {
        let attrs = self.conn.get_window_attributes(frame)?.reply()?;

        // Skip override-redirect windows (menus, tooltips, popups)
        if attrs.override_redirect {
            return Ok(None);
        }

        let geom = self.conn.get_geometry(frame)?.reply()?;

        // Skip tiny windows (1x1 placeholders used by some apps)
        if geom.width <= 1 || geom.height <= 1 {
            return Ok(None);
        }

        // Find client window with WM_STATE property
        let Some(client) = self.find_client_window(frame)? else {
            return Ok(None);
        };

        let client_geom = self.conn.get_geometry(client)?.reply()?;
        let origin = self
            .conn
            .translate_coordinates(client, self.root, 0, 0)?
            .reply()?;

        let (x, y) = (i32::from(origin.dst_x), i32::from(origin.dst_y));
        let (width, height) = (i32::from(client_geom.width), i32::from(client_geom.height));
        let extents = frame_extents(
            (
                i32::from(geom.x),
                i32::from(geom.y),
                i32::from(geom.width),
                i32::from(geom.height),
            ),
            (x, y, width, height),
        );

        let (wm_instance, wm_class) = self.get_wm_class(client).ok().flatten().unwrap_or_default();

        Ok(Some(WindowInfo {
            client_window: client,
            frame_window: frame,
            x,
            y,
            width,
            height,
            extents,
            window_type: self.get_window_type(client)?,
            state: self.get_window_state(client)?,
            wm_instance,
            wm_class,
            title: self.get_title(client).ok().flatten(),
            role: self.get_string(client, self.atoms.WM_WINDOW_ROLE).ok().flatten(),
            is_mapped: attrs.map_state == MapState::VIEWABLE,
        }))
    }

    /// Depth-first search for a window with WM_STATE property.
    /// The WM_STATE property indicates a real client window managed by the WM.
    fn find_client_window(&self, window: Window) -> Result<Option<Window>> {
        if self.has_wm_state(window)? {
            return Ok(Some(window));
        }

        let tree = self.conn.query_tree(window)?.reply()?;
        for child in tree.children {
            if let Some(client) = self.find_client_window(child)? {
                return Ok(Some(client));
            }
        }

        Ok(None)
    }

    fn has_wm_state(&self, window: Window) -> Result<bool> {
        let reply = self
            .conn
            .get_property(false, window, self.atoms.WM_STATE, AtomEnum::ANY, 0, 0)?
            .reply()?;

        Ok(reply.type_ != u32::from(AtomEnum::NONE))
    }

    pub fn get_window_type(&self, window: Window) -> Result<WindowType> {
        let values = self.get_atoms(window, self.atoms._NET_WM_WINDOW_TYPE)?;
        Ok(window_type_from_atoms(&self.atoms, &values))
    }

    pub fn get_window_state(&self, window: Window) -> Result<WindowStateFlags> {
        let values = self.get_atoms(window, self.atoms._NET_WM_STATE)?;
        Ok(state_from_atoms(&self.atoms, &values))
    }

    pub fn set_window_state(&self, window: Window, state: WindowStateFlags) -> Result<()> {
        self.set_atoms(window, self.atoms._NET_WM_STATE, &state_to_atoms(&self.atoms, state))
    }

    /// Get WM_CLASS property as (instance, class).
    fn get_wm_class(&self, window: Window) -> Result<Option<(Option<String>, Option<String>)>> {
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 256)?
            .reply()?;

        if reply.type_ == u32::from(AtomEnum::NONE) || reply.value.is_empty() {
            return Ok(None);
        }

        Ok(Some(split_wm_class(&reply.value)))
    }

    /// _NET_WM_NAME, falling back to WM_NAME.
    fn get_title(&self, window: Window) -> Result<Option<String>> {
        let reply = self
            .conn
            .get_property(false, window, self.atoms._NET_WM_NAME, self.atoms.UTF8_STRING, 0, 256)?
            .reply()?;
        if !reply.value.is_empty() {
            return Ok(Some(String::from_utf8_lossy(&reply.value).to_string()));
        }
        self.get_string(window, self.atoms.WM_NAME)
    }

    fn get_string(&self, window: Window, property: Atom) -> Result<Option<String>> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, 256)?
            .reply()?;

        if reply.type_ == u32::from(AtomEnum::NONE) || reply.value.is_empty() {
            return Ok(None);
        }

        let value = String::from_utf8_lossy(&reply.value);
        Ok(Some(value.trim_end_matches('\0').to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_wm_class() {
        assert_eq!(
            split_wm_class(b"xterm\0XTerm\0"),
            (Some("xterm".to_string()), Some("XTerm".to_string()))
        );
        assert_eq!(split_wm_class(b"solo"), (Some("solo".to_string()), None));
        assert_eq!(split_wm_class(b""), (None, None));
    }

    #[test]
    fn test_frame_extents() {
        // 4px border, 20px title bar
        let extents = frame_extents((96, 80, 408, 324), (100, 100, 400, 300));
        assert_eq!(
            extents,
            Extents {
                left: 4,
                right: 4,
                top: 20,
                bottom: 4,
            }
        );

        // Unframed client: no extents
        assert_eq!(frame_extents((10, 10, 50, 50), (10, 10, 50, 50)), Extents::default());
    }
}
