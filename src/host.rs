//! Host compositor object model as seen by the show-desktop engine.
//!
//! The engine never owns windows or screens. It reads and mutates them
//! through the [`Host`] trait, which also supplies the terminal ("default")
//! implementation of every hook in the [`HookChain`](crate::hooks::HookChain).

use bitflags::bitflags;

use crate::matcher::WindowMatch;

pub type WindowId = u32;
pub type ScreenId = u32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// Decoration extents around the client area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extents {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

/// Client position and size plus the input extents of its frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub input: Extents,
}

impl WindowGeometry {
    pub fn outer_x(&self) -> i32 {
        self.x - self.input.left
    }

    pub fn outer_y(&self) -> i32 {
        self.y - self.input.top
    }

    pub fn outer_width(&self) -> i32 {
        self.width + self.input.left + self.input.right
    }

    pub fn outer_height(&self) -> i32 {
        self.height + self.input.top + self.input.bottom
    }

    /// Same window with its client origin moved to `(x, y)`.
    pub fn at(&self, x: i32, y: i32) -> Self {
        Self { x, y, ..*self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub width: i32,
    pub height: i32,
    pub work_area: Rect,
    /// Viewport column currently shown.
    pub viewport_x: i32,
    /// Viewport row currently shown.
    pub viewport_y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WindowType {
    Desktop,
    Dock,
    Toolbar,
    Menu,
    Utility,
    Splash,
    Dialog,
    ModalDialog,
    #[default]
    Normal,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Notification,
    Combo,
    Dnd,
    Fullscreen,
    Unknown,
}

impl WindowType {
    const ALL: [WindowType; 17] = [
        WindowType::Desktop,
        WindowType::Dock,
        WindowType::Toolbar,
        WindowType::Menu,
        WindowType::Utility,
        WindowType::Splash,
        WindowType::Dialog,
        WindowType::ModalDialog,
        WindowType::Normal,
        WindowType::DropdownMenu,
        WindowType::PopupMenu,
        WindowType::Tooltip,
        WindowType::Notification,
        WindowType::Combo,
        WindowType::Dnd,
        WindowType::Fullscreen,
        WindowType::Unknown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WindowType::Desktop => "Desktop",
            WindowType::Dock => "Dock",
            WindowType::Toolbar => "Toolbar",
            WindowType::Menu => "Menu",
            WindowType::Utility => "Utility",
            WindowType::Splash => "Splash",
            WindowType::Dialog => "Dialog",
            WindowType::ModalDialog => "ModalDialog",
            WindowType::Normal => "Normal",
            WindowType::DropdownMenu => "DropdownMenu",
            WindowType::PopupMenu => "PopupMenu",
            WindowType::Tooltip => "Tooltip",
            WindowType::Notification => "Notification",
            WindowType::Combo => "Combo",
            WindowType::Dnd => "Dnd",
            WindowType::Fullscreen => "Fullscreen",
            WindowType::Unknown => "Unknown",
        }
    }

    /// Case-insensitive lookup by [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }
}

bitflags! {
    /// Window state bits (EWMH `_NET_WM_STATE`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowStateFlags: u32 {
        const MODAL = 1 << 0;
        const STICKY = 1 << 1;
        const MAXIMIZED_VERT = 1 << 2;
        const MAXIMIZED_HORZ = 1 << 3;
        const SHADED = 1 << 4;
        const SKIP_TASKBAR = 1 << 5;
        const SKIP_PAGER = 1 << 6;
        const HIDDEN = 1 << 7;
        const FULLSCREEN = 1 << 8;
        const ABOVE = 1 << 9;
        const BELOW = 1 << 10;
        const DEMANDS_ATTENTION = 1 << 11;
    }
}

bitflags! {
    /// Actions the window manager allows on a window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowActions: u32 {
        const MOVE = 1 << 0;
        const RESIZE = 1 << 1;
        const STICK = 1 << 2;
        const MINIMIZE = 1 << 3;
        const MAXIMIZE_HORZ = 1 << 4;
        const MAXIMIZE_VERT = 1 << 5;
        const FULLSCREEN = 1 << 6;
        const CLOSE = 1 << 7;
        const SHADE = 1 << 8;
        const CHANGE_DESKTOP = 1 << 9;
        const ABOVE = 1 << 10;
        const BELOW = 1 << 11;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PaintScreenMask: u32 {
        const REGION = 1 << 0;
        const WITH_TRANSFORMED_WINDOWS = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PaintWindowMask: u32 {
        const TRANSFORMED = 1 << 0;
        const TRANSLUCENT = 1 << 1;
    }
}

/// Actions a hook chain adds and removes for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllowedActions {
    pub set: WindowActions,
    pub clear: WindowActions,
}

impl AllowedActions {
    pub fn effective(&self) -> WindowActions {
        self.set - self.clear
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPaintAttrib {
    /// 0.0 (transparent) to 1.0 (opaque).
    pub opacity: f32,
}

impl Default for WindowPaintAttrib {
    fn default() -> Self {
        Self { opacity: 1.0 }
    }
}

/// Translation applied to a window while painting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub translate_x: f32,
    pub translate_y: f32,
}

impl Transform {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.translate_x += dx;
        self.translate_y += dy;
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x + self.translate_x, y + self.translate_y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    pub id: u32,
    pub region: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    DesktopViewportChanged { screen: ScreenId },
    WorkAreaChanged { screen: ScreenId },
}

/// Window attributes a match rule can test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowProperties {
    pub id: WindowId,
    pub window_type: WindowType,
    pub state: WindowStateFlags,
    /// WM_CLASS class part.
    pub class: Option<String>,
    /// WM_CLASS instance part.
    pub name: Option<String>,
    pub title: Option<String>,
    pub role: Option<String>,
}

/// Everything the engine needs from the compositor.
///
/// The query/mutate methods are the outbound API. The hook methods at the end
/// are the terminal implementations reached after every registered plugin has
/// run; their defaults do nothing.
pub trait Host {
    /// Windows of a screen in stacking order, bottom to top.
    fn screen_windows(&self, screen: ScreenId) -> Vec<WindowId>;
    fn screen_geometry(&self, screen: ScreenId) -> Option<ScreenGeometry>;
    fn outputs(&self, screen: ScreenId) -> Vec<Output>;

    fn window_screen(&self, window: WindowId) -> Option<ScreenId>;
    fn window_geometry(&self, window: WindowId) -> Option<WindowGeometry>;
    fn window_type(&self, window: WindowId) -> WindowType;
    fn window_state(&self, window: WindowId) -> WindowStateFlags;
    fn change_window_state(&mut self, window: WindowId, state: WindowStateFlags);
    fn window_properties(&self, window: WindowId) -> Option<WindowProperties>;
    fn is_grabbed(&self, window: WindowId) -> bool;
    fn is_managed(&self, window: WindowId) -> bool;
    fn set_managed(&mut self, window: WindowId, managed: bool);
    fn in_show_desktop_mode(&self, window: WindowId) -> bool;
    fn set_in_show_desktop_mode(&mut self, window: WindowId, enabled: bool);

    fn move_window(&mut self, window: WindowId, dx: i32, dy: i32);
    fn sync_window_position(&mut self, window: WindowId);

    fn damage_screen(&mut self, screen: ScreenId);
    /// Move input focus to the root window of `screen`.
    fn focus_root(&mut self, screen: ScreenId);

    fn evaluate_match(&self, window: WindowId, rule: &WindowMatch) -> bool {
        self.window_properties(window)
            .is_some_and(|props| rule.matches(&props))
    }

    fn prepare_paint_screen(&mut self, _screen: ScreenId, _ms_since_last_paint: u32) {}

    fn paint_output(&mut self, _screen: ScreenId, _output: &Output, _mask: PaintScreenMask) -> bool {
        true
    }

    fn paint_window(
        &mut self,
        window: WindowId,
        attrib: &WindowPaintAttrib,
        transform: &Transform,
        mask: PaintWindowMask,
    ) -> bool;

    fn done_paint_screen(&mut self, _screen: ScreenId) {}

    fn enter_show_desktop_mode(&mut self, _screen: ScreenId) {}

    fn leave_show_desktop_mode(&mut self, _screen: ScreenId, _window: Option<WindowId>) {}

    fn handle_event(&mut self, _event: &DisplayEvent) {}

    fn allowed_actions(&mut self, _window: WindowId, actions: &mut AllowedActions) {
        actions.set |= WindowActions::all();
    }

    /// Focus policy: whether `window` may receive focus.
    fn focus_window(&mut self, window: WindowId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_composition() {
        let mut t = Transform::identity();
        t.translate(100.0, 50.0);
        t.translate(-100.0, -50.0 + 30.0);
        assert_eq!(t.apply(100.0, 50.0), (100.0, 80.0));
        assert_eq!(Transform::default(), Transform::identity());
    }

    #[test]
    fn test_outer_geometry() {
        let geom = WindowGeometry {
            x: 100,
            y: 120,
            width: 400,
            height: 300,
            input: Extents {
                left: 4,
                right: 4,
                top: 20,
                bottom: 4,
            },
        };
        assert_eq!(geom.outer_x(), 96);
        assert_eq!(geom.outer_y(), 100);
        assert_eq!(geom.outer_width(), 408);
        assert_eq!(geom.outer_height(), 324);
        assert_eq!(geom.at(0, 0).input, geom.input);
    }

    #[test]
    fn test_window_type_names() {
        assert_eq!(WindowType::from_name("normal"), Some(WindowType::Normal));
        assert_eq!(WindowType::from_name("DOCK"), Some(WindowType::Dock));
        assert_eq!(WindowType::from_name("bogus"), None);
    }

    #[test]
    fn test_allowed_actions_effective() {
        let actions = AllowedActions {
            set: WindowActions::all(),
            clear: WindowActions::MOVE | WindowActions::RESIZE,
        };
        assert!(!actions.effective().contains(WindowActions::MOVE));
        assert!(actions.effective().contains(WindowActions::CLOSE));
    }
}
