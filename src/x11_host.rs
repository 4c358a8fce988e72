//! [`Host`] backed by a live X11 display.
//!
//! Without a compositor to draw transformed windows, "painting" a window
//! means configuring its frame to the rendered position and writing its
//! opacity hint. The engine's logical positions are kept separately so a
//! window can be drawn somewhere other than where it really is.

use std::collections::HashMap;

use x11rb::protocol::xproto::{ConfigureNotifyEvent, Window};

use crate::connection::XConnection;
use crate::error::Result;
use crate::host::{
    DisplayEvent, Host, Output, PaintWindowMask, Rect, ScreenGeometry, ScreenId, Transform,
    WindowGeometry, WindowId, WindowPaintAttrib, WindowProperties, WindowStateFlags, WindowType,
};
use crate::window_finder::WindowInfo;

/// The only screen this host drives.
pub const SCREEN: ScreenId = 0;

struct HostWindow {
    info: WindowInfo,
    /// Client origin as the engine sees it
    x: i32,
    y: i32,
    /// Frame origin last sent to the server
    configured: (i32, i32),
    opacity: f32,
    managed: bool,
    in_show_desktop_mode: bool,
    /// Position synced but not painted yet
    needs_sync: bool,
}

impl HostWindow {
    fn new(info: WindowInfo) -> Self {
        Self {
            x: info.x,
            y: info.y,
            configured: (info.x - info.extents.left, info.y - info.extents.top),
            opacity: 1.0,
            managed: info.is_mapped,
            in_show_desktop_mode: false,
            needs_sync: false,
            info,
        }
    }

    /// Frame origin that puts the client at `(x, y)`.
    fn frame_origin(&self, x: i32, y: i32) -> (i32, i32) {
        (x - self.info.extents.left, y - self.info.extents.top)
    }
}

pub struct X11Host {
    xconn: XConnection,
    windows: HashMap<Window, HostWindow>,
    /// Frames bottom to top
    stacking: Vec<Window>,
    work_area: Rect,
    viewport: (i32, i32),
    damaged: bool,
    /// Frame under a foreign pointer grab, as of the last `refresh_grab`
    grabbed: Option<Window>,
}

impl X11Host {
    pub fn new(xconn: XConnection) -> Result<Self> {
        let full = Rect::new(
            0,
            0,
            i32::from(xconn.screen_width),
            i32::from(xconn.screen_height),
        );
        let mut host = Self {
            xconn,
            windows: HashMap::new(),
            stacking: Vec::new(),
            work_area: full,
            viewport: (0, 0),
            damaged: false,
            grabbed: None,
        };
        host.refresh_screen()?;
        for info in host.xconn.find_windows()? {
            host.insert(info);
        }
        Ok(host)
    }

    pub fn xconn(&self) -> &XConnection {
        &self.xconn
    }

    fn insert(&mut self, info: WindowInfo) {
        let frame = info.frame_window;
        self.stacking.retain(|w| *w != frame);
        self.stacking.push(frame);
        self.windows.insert(frame, HostWindow::new(info));
    }

    pub fn knows(&self, frame: Window) -> bool {
        self.windows.contains_key(&frame)
    }

    /// Track a newly mapped frame. Returns its id when it was not known yet.
    pub fn add_frame(&mut self, frame: Window) -> Result<Option<WindowId>> {
        if let Some(window) = self.windows.get_mut(&frame) {
            window.info.is_mapped = true;
            window.managed = true;
            return Ok(None);
        }
        match self.xconn.examine_frame(frame)? {
            Some(info) => {
                log::debug!("Tracking frame 0x{:x} ({:?})", frame, info.title);
                self.insert(info);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    pub fn set_mapped(&mut self, frame: Window, mapped: bool) {
        if let Some(window) = self.windows.get_mut(&frame) {
            window.info.is_mapped = mapped;
        }
    }

    pub fn remove_frame(&mut self, frame: Window) {
        if self.windows.remove(&frame).is_some() {
            self.stacking.retain(|w| *w != frame);
            log::debug!("Forgot frame 0x{:x}", frame);
        }
    }

    /// Look for an interactive move or resize in progress. The server does
    /// not report other clients' grabs, so this has to be polled.
    pub fn refresh_grab(&mut self) {
        self.grabbed = match self.xconn.grabbed_frame() {
            Ok(frame) => frame.filter(|frame| self.windows.contains_key(frame)),
            Err(e) => {
                log::debug!("Cannot query pointer grab: {}", e);
                None
            }
        };
        if let Some(frame) = self.grabbed {
            log::debug!("Frame 0x{:x} is grabbed", frame);
        }
    }

    /// Re-read work area and viewport from the root window.
    pub fn refresh_screen(&mut self) -> Result<()> {
        let atoms = &self.xconn.atoms;
        let root = self.xconn.root;
        let cardinal = x11rb::protocol::xproto::AtomEnum::CARDINAL;

        let desktop = self
            .xconn
            .get_cardinals(root, atoms._NET_CURRENT_DESKTOP, cardinal)?
            .first()
            .copied()
            .unwrap_or(0) as usize;

        let workarea = self.xconn.get_cardinals(root, atoms._NET_WORKAREA, cardinal)?;
        if let Some(area) = workarea.chunks_exact(4).nth(desktop).or(workarea.chunks_exact(4).next()) {
            self.work_area = Rect::new(area[0] as i32, area[1] as i32, area[2] as i32, area[3] as i32);
        }

        let viewport = self.xconn.get_cardinals(root, atoms._NET_DESKTOP_VIEWPORT, cardinal)?;
        if let Some(origin) = viewport.chunks_exact(2).nth(desktop).or(viewport.chunks_exact(2).next()) {
            self.viewport = (origin[0] as i32, origin[1] as i32);
        }

        log::debug!("Work area {:?}, viewport {:?}", self.work_area, self.viewport);
        Ok(())
    }

    /// Follow moves made by someone else (the user or the window manager).
    pub fn observe_configure(&mut self, event: &ConfigureNotifyEvent) {
        let Some(window) = self.windows.get_mut(&event.window) else {
            return;
        };
        let origin = (i32::from(event.x), i32::from(event.y));
        if origin == window.configured {
            return;
        }
        window.configured = origin;
        window.x = origin.0 + window.info.extents.left;
        window.y = origin.1 + window.info.extents.top;
        window.info.x = window.x;
        window.info.y = window.y;
    }

    /// Whether anything asked for a repaint since the last call.
    pub fn take_damage(&mut self) -> bool {
        std::mem::take(&mut self.damaged)
    }

    pub fn flush(&self) -> Result<()> {
        self.xconn.flush()
    }

    fn place_frame(&mut self, frame: Window, x: i32, y: i32) {
        let Some(window) = self.windows.get_mut(&frame) else {
            return;
        };
        let origin = window.frame_origin(x, y);
        if origin == window.configured {
            return;
        }
        window.configured = origin;
        if let Err(e) = self.xconn.move_frame(frame, origin.0, origin.1) {
            log::warn!("Cannot move frame 0x{:x}: {}", frame, e);
        }
    }

    fn write_opacity(&mut self, frame: Window, opacity: f32) {
        let Some(window) = self.windows.get_mut(&frame) else {
            return;
        };
        if (window.opacity - opacity).abs() < f32::EPSILON {
            return;
        }
        window.opacity = opacity;
        let atom = self.xconn.atoms._NET_WM_WINDOW_OPACITY;
        let result = if opacity >= 1.0 {
            self.xconn.delete_property(frame, atom)
        } else {
            let value = (f64::from(opacity.max(0.0)) * f64::from(u32::MAX)) as u32;
            self.xconn.set_cardinal(frame, atom, value)
        };
        if let Err(e) = result {
            log::warn!("Cannot set opacity of 0x{:x}: {}", frame, e);
        }
    }

    fn set_showing_desktop(&self, showing: bool) {
        let result = self.xconn.set_cardinal(
            self.xconn.root,
            self.xconn.atoms._NET_SHOWING_DESKTOP,
            u32::from(showing),
        );
        if let Err(e) = result {
            log::warn!("Cannot publish _NET_SHOWING_DESKTOP: {}", e);
        }
    }
}

impl Host for X11Host {
    fn screen_windows(&self, screen: ScreenId) -> Vec<WindowId> {
        if screen == SCREEN {
            self.stacking.clone()
        } else {
            Vec::new()
        }
    }

    fn screen_geometry(&self, screen: ScreenId) -> Option<ScreenGeometry> {
        if screen != SCREEN {
            return None;
        }
        let width = i32::from(self.xconn.screen_width).max(1);
        let height = i32::from(self.xconn.screen_height).max(1);
        Some(ScreenGeometry {
            width,
            height,
            work_area: self.work_area,
            viewport_x: self.viewport.0 / width,
            viewport_y: self.viewport.1 / height,
        })
    }

    fn outputs(&self, screen: ScreenId) -> Vec<Output> {
        if screen != SCREEN {
            return Vec::new();
        }
        vec![Output {
            id: 0,
            region: Rect::new(
                0,
                0,
                i32::from(self.xconn.screen_width),
                i32::from(self.xconn.screen_height),
            ),
        }]
    }

    fn window_screen(&self, window: WindowId) -> Option<ScreenId> {
        self.windows.contains_key(&window).then_some(SCREEN)
    }

    fn window_geometry(&self, window: WindowId) -> Option<WindowGeometry> {
        self.windows.get(&window).map(|w| WindowGeometry {
            x: w.x,
            y: w.y,
            width: w.info.width,
            height: w.info.height,
            input: w.info.extents,
        })
    }

    fn window_type(&self, window: WindowId) -> WindowType {
        self.windows
            .get(&window)
            .map_or(WindowType::Unknown, |w| w.info.window_type)
    }

    fn window_state(&self, window: WindowId) -> WindowStateFlags {
        self.windows
            .get(&window)
            .map_or_else(WindowStateFlags::empty, |w| w.info.state)
    }

    fn change_window_state(&mut self, window: WindowId, state: WindowStateFlags) {
        let Some(w) = self.windows.get_mut(&window) else {
            return;
        };
        w.info.state = state;
        if let Err(e) = self.xconn.set_window_state(w.info.client_window, state) {
            log::warn!("Cannot write _NET_WM_STATE of 0x{:x}: {}", window, e);
        }
    }

    fn window_properties(&self, window: WindowId) -> Option<WindowProperties> {
        self.windows.get(&window).map(|w| WindowProperties {
            id: w.info.client_window,
            window_type: w.info.window_type,
            state: w.info.state,
            class: w.info.wm_class.clone(),
            name: w.info.wm_instance.clone(),
            title: w.info.title.clone(),
            role: w.info.role.clone(),
        })
    }

    fn is_grabbed(&self, window: WindowId) -> bool {
        self.grabbed == Some(window)
    }

    fn is_managed(&self, window: WindowId) -> bool {
        self.windows.get(&window).is_some_and(|w| w.managed)
    }

    fn set_managed(&mut self, window: WindowId, managed: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.managed = managed;
        }
    }

    fn in_show_desktop_mode(&self, window: WindowId) -> bool {
        self.windows.get(&window).is_some_and(|w| w.in_show_desktop_mode)
    }

    fn set_in_show_desktop_mode(&mut self, window: WindowId, enabled: bool) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.in_show_desktop_mode = enabled;
        }
    }

    fn move_window(&mut self, window: WindowId, dx: i32, dy: i32) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.x += dx;
            w.y += dy;
        }
    }

    fn sync_window_position(&mut self, window: WindowId) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.needs_sync = true;
        }
    }

    fn damage_screen(&mut self, _screen: ScreenId) {
        self.damaged = true;
    }

    fn focus_root(&mut self, _screen: ScreenId) {
        if let Err(e) = self.xconn.focus_root() {
            log::warn!("Cannot focus root window: {}", e);
        }
    }

    fn paint_window(
        &mut self,
        window: WindowId,
        attrib: &WindowPaintAttrib,
        transform: &Transform,
        _mask: PaintWindowMask,
    ) -> bool {
        let Some(w) = self.windows.get_mut(&window) else {
            return false;
        };
        w.needs_sync = false;
        let (x, y) = transform.apply(w.x as f32, w.y as f32);
        self.place_frame(window, x.round() as i32, y.round() as i32);
        self.write_opacity(window, attrib.opacity);
        true
    }

    fn done_paint_screen(&mut self, _screen: ScreenId) {
        let pending: Vec<(Window, i32, i32)> = self
            .windows
            .iter_mut()
            .filter(|(_, w)| w.needs_sync)
            .map(|(frame, w)| {
                w.needs_sync = false;
                (*frame, w.x, w.y)
            })
            .collect();
        for (frame, x, y) in pending {
            self.place_frame(frame, x, y);
        }
    }

    fn enter_show_desktop_mode(&mut self, _screen: ScreenId) {
        self.set_showing_desktop(true);
    }

    fn leave_show_desktop_mode(&mut self, _screen: ScreenId, window: Option<WindowId>) {
        // A single restored window leaves the rest hidden
        if window.is_none() {
            self.set_showing_desktop(false);
        }
    }

    fn handle_event(&mut self, event: &DisplayEvent) {
        log::debug!("Display event {:?}", event);
    }

    fn focus_window(&mut self, window: WindowId) -> bool {
        self.windows.get(&window).is_some_and(|w| {
            w.managed
                && w.info.is_mapped
                && !matches!(w.info.window_type, WindowType::Desktop | WindowType::Dock)
                && !w.info.state.contains(WindowStateFlags::HIDDEN)
        })
    }
}
