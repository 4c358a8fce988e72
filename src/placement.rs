//! Off-screen target computation.

use crate::config::Direction;
use crate::host::{ScreenGeometry, WindowGeometry};

/// On/off-screen coordinates of one window for one show-desktop cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Placer {
    /// Window currently sits at (or is heading to) its off-screen target.
    pub placed: bool,
    pub on_screen_x: i32,
    pub on_screen_y: i32,
    pub off_screen_x: i32,
    pub off_screen_y: i32,
    pub origin_viewport_x: i32,
    pub origin_viewport_y: i32,
}

impl Placer {
    /// Anchor the placer at the window's current position and viewport.
    pub fn anchored(geometry: &WindowGeometry, screen: &ScreenGeometry) -> Self {
        Self {
            placed: false,
            on_screen_x: geometry.x,
            on_screen_y: geometry.y,
            off_screen_x: geometry.x,
            off_screen_y: geometry.y,
            origin_viewport_x: screen.viewport_x,
            origin_viewport_y: screen.viewport_y,
        }
    }

    /// Refresh the off-screen target. The anchor is kept.
    pub fn reposition(
        &mut self,
        geometry: &WindowGeometry,
        screen: &ScreenGeometry,
        direction: Direction,
        part_size: i32,
    ) {
        let at_anchor = geometry.at(self.on_screen_x, self.on_screen_y);
        let (x, y) = off_screen_target(&at_anchor, screen, direction, part_size);
        self.off_screen_x = x;
        self.off_screen_y = y;
    }

    /// Shift the anchor by the number of screens the viewport moved since
    /// the window was anchored. The current viewport becomes the new origin.
    pub fn correct_for_viewport(&mut self, screen: &ScreenGeometry) {
        self.on_screen_x += (self.origin_viewport_x - screen.viewport_x) * screen.width;
        self.on_screen_y += (self.origin_viewport_y - screen.viewport_y) * screen.height;
        self.origin_viewport_x = screen.viewport_x;
        self.origin_viewport_y = screen.viewport_y;
    }

    /// Displacement from anchor to off-screen target.
    pub fn travel(&self) -> (f32, f32) {
        (
            (self.off_screen_x - self.on_screen_x) as f32,
            (self.off_screen_y - self.on_screen_y) as f32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

/// Client position that puts the window just past a work-area edge with
/// `part_size` pixels still showing.
pub fn off_screen_target(
    geometry: &WindowGeometry,
    screen: &ScreenGeometry,
    direction: Direction,
    part_size: i32,
) -> (i32, i32) {
    let mut x = geometry.x;
    let mut y = geometry.y;

    let vertical = match direction {
        Direction::Up => Some(Edge::Top),
        Direction::Down => Some(Edge::Bottom),
        Direction::UpDown | Direction::ToCorners => Some(nearer_vertical_edge(geometry, screen)),
        Direction::Left | Direction::Right | Direction::LeftRight => None,
    };
    let horizontal = match direction {
        Direction::Left => Some(Edge::Left),
        Direction::Right => Some(Edge::Right),
        Direction::LeftRight | Direction::ToCorners => {
            Some(nearer_horizontal_edge(geometry, screen))
        }
        Direction::Up | Direction::Down | Direction::UpDown => None,
    };

    if let Some(edge) = vertical {
        y = edge_coordinate(edge, geometry, screen, part_size);
    }
    if let Some(edge) = horizontal {
        x = edge_coordinate(edge, geometry, screen, part_size);
    }
    (x, y)
}

fn edge_coordinate(edge: Edge, geometry: &WindowGeometry, screen: &ScreenGeometry, part_size: i32) -> i32 {
    let area = &screen.work_area;
    match edge {
        Edge::Top => area.y - (geometry.height + geometry.input.bottom) + part_size,
        Edge::Bottom => area.bottom() + geometry.input.top - part_size,
        Edge::Left => area.x - (geometry.width + geometry.input.right) + part_size,
        Edge::Right => area.right() + geometry.input.left - part_size,
    }
}

/// Windows centered exactly on the middle line go down.
fn nearer_vertical_edge(geometry: &WindowGeometry, screen: &ScreenGeometry) -> Edge {
    let center = geometry.outer_y() + geometry.outer_height() / 2;
    if center < screen.height / 2 {
        Edge::Top
    } else {
        Edge::Bottom
    }
}

/// Windows centered exactly on the middle line go right.
fn nearer_horizontal_edge(geometry: &WindowGeometry, screen: &ScreenGeometry) -> Edge {
    let center = geometry.outer_x() + geometry.outer_width() / 2;
    if center < screen.width / 2 {
        Edge::Left
    } else {
        Edge::Right
    }
}
