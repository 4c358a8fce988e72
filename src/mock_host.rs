//! In-memory host that records what the chain asked of it.

use std::collections::HashMap;

use crate::host::{
    DisplayEvent, Extents, Host, Output, PaintScreenMask, PaintWindowMask, Rect, ScreenGeometry,
    ScreenId, Transform, WindowGeometry, WindowId, WindowPaintAttrib, WindowProperties,
    WindowStateFlags, WindowType,
};

pub const SCREEN_WIDTH: i32 = 1280;
pub const SCREEN_HEIGHT: i32 = 800;

/// Frame extents every mock window gets.
pub const INPUT: Extents = Extents {
    left: 2,
    right: 2,
    top: 20,
    bottom: 2,
};

#[derive(Debug, Clone)]
pub struct MockWindow {
    pub geometry: WindowGeometry,
    pub window_type: WindowType,
    pub state: WindowStateFlags,
    pub managed: bool,
    pub grabbed: bool,
    pub focusable: bool,
    pub in_show_desktop_mode: bool,
    pub class: Option<String>,
    pub title: Option<String>,
    pub syncs: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct PaintRecord {
    pub attrib: WindowPaintAttrib,
    pub transform: Transform,
    pub mask: PaintWindowMask,
}

pub struct MockHost {
    pub screen: ScreenGeometry,
    windows: HashMap<WindowId, MockWindow>,
    stacking: Vec<WindowId>,
    paints: HashMap<WindowId, PaintRecord>,
    pub output_masks: Vec<PaintScreenMask>,
    pub damage_count: usize,
    pub focus_root_calls: usize,
    pub enter_calls: usize,
    pub leave_calls: Vec<Option<WindowId>>,
    pub events: Vec<DisplayEvent>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            screen: ScreenGeometry {
                width: SCREEN_WIDTH,
                height: SCREEN_HEIGHT,
                work_area: Rect::new(0, 0, SCREEN_WIDTH, SCREEN_HEIGHT),
                viewport_x: 0,
                viewport_y: 0,
            },
            windows: HashMap::new(),
            stacking: Vec::new(),
            paints: HashMap::new(),
            output_masks: Vec::new(),
            damage_count: 0,
            focus_root_calls: 0,
            enter_calls: 0,
            leave_calls: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Add a managed, focusable normal window on top of the stack.
    pub fn add_window(&mut self, id: WindowId, x: i32, y: i32, width: i32, height: i32) -> WindowId {
        self.windows.insert(
            id,
            MockWindow {
                geometry: WindowGeometry {
                    x,
                    y,
                    width,
                    height,
                    input: INPUT,
                },
                window_type: WindowType::Normal,
                state: WindowStateFlags::empty(),
                managed: true,
                grabbed: false,
                focusable: true,
                in_show_desktop_mode: false,
                class: None,
                title: None,
                syncs: 0,
            },
        );
        self.stacking.push(id);
        id
    }

    pub fn window(&self, id: WindowId) -> &MockWindow {
        &self.windows[&id]
    }

    pub fn window_mut(&mut self, id: WindowId) -> &mut MockWindow {
        self.windows.get_mut(&id).expect("mock window exists")
    }

    pub fn remove_window(&mut self, id: WindowId) {
        self.windows.remove(&id);
        self.stacking.retain(|w| *w != id);
    }

    pub fn position(&self, id: WindowId) -> (i32, i32) {
        let geometry = self.window(id).geometry;
        (geometry.x, geometry.y)
    }

    pub fn last_paint(&self, id: WindowId) -> Option<PaintRecord> {
        self.paints.get(&id).copied()
    }

    /// Where the last paint put the window's client origin.
    pub fn rendered_position(&self, id: WindowId) -> Option<(f32, f32)> {
        let paint = self.last_paint(id)?;
        let (x, y) = self.position(id);
        Some(paint.transform.apply(x as f32, y as f32))
    }

    pub fn set_viewport(&mut self, x: i32, y: i32) {
        self.screen.viewport_x = x;
        self.screen.viewport_y = y;
    }
}

impl Host for MockHost {
    fn screen_windows(&self, screen: ScreenId) -> Vec<WindowId> {
        if screen == 0 {
            self.stacking.clone()
        } else {
            Vec::new()
        }
    }

    fn screen_geometry(&self, screen: ScreenId) -> Option<ScreenGeometry> {
        (screen == 0).then_some(self.screen)
    }

    fn outputs(&self, screen: ScreenId) -> Vec<Output> {
        if screen == 0 {
            vec![Output {
                id: 0,
                region: Rect::new(0, 0, self.screen.width, self.screen.height),
            }]
        } else {
            Vec::new()
        }
    }

    fn window_screen(&self, window: WindowId) -> Option<ScreenId> {
        self.windows.contains_key(&window).then_some(0)
    }

    fn window_geometry(&self, window: WindowId) -> Option<WindowGeometry> {
        self.windows.get(&window).map(|w| w.geometry)
    }

    fn window_type(&self, window: WindowId) -> WindowType {
        self.windows
            .get(&window)
            .map_or(WindowType::Unknown, |w| w.window_type)
    }

    fn window_state(&self, window: WindowId) -> WindowStateFlags {
        self.windows.get(&window).map_or_else(WindowStateFlags::empty, |w| w.state)
    }

    fn change_window_state(&mut self, window: WindowId, state: WindowStateFlags) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.state = state;
        }
    }

    fn window_properties(&self, window: WindowId) -> Option<WindowProperties> {
        self.windows.get(&window).map(|w| WindowProperties {
            id: window,
            window_type: w.window_type,
            state: w.state,
            class: w.class.clone(),
            name: None,
            title: w.title.clone(),
            role: None,
        })
    }

    fn is_grabbed(&self, window: WindowId) -> bool {
        self.windows.get(&window).is_some_and(|w| w.grabbed)
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
            w.geometry.x += dx;
            w.geometry.y += dy;
        }
    }

    fn sync_window_position(&mut self, window: WindowId) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.syncs += 1;
        }
    }

    fn damage_screen(&mut self, _screen: ScreenId) {
        self.damage_count += 1;
    }

    fn focus_root(&mut self, _screen: ScreenId) {
        self.focus_root_calls += 1;
    }

    fn paint_output(&mut self, _screen: ScreenId, _output: &Output, mask: PaintScreenMask) -> bool {
        self.output_masks.push(mask);
        true
    }

    fn paint_window(
        &mut self,
        window: WindowId,
        attrib: &WindowPaintAttrib,
        transform: &Transform,
        mask: PaintWindowMask,
    ) -> bool {
        self.paints.insert(
            window,
            PaintRecord {
                attrib: *attrib,
                transform: *transform,
                mask,
            },
        );
        true
    }

    fn enter_show_desktop_mode(&mut self, _screen: ScreenId) {
        self.enter_calls += 1;
    }

    fn leave_show_desktop_mode(&mut self, _screen: ScreenId, window: Option<WindowId>) {
        self.leave_calls.push(window);
    }

    fn handle_event(&mut self, event: &DisplayEvent) {
        self.events.push(*event);
    }

    fn focus_window(&mut self, window: WindowId) -> bool {
        self.windows
            .get(&window)
            .is_some_and(|w| w.managed && w.focusable)
    }
}
