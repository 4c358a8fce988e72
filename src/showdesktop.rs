//! The show-desktop plugin.
//!
//! Each attached screen runs a small state machine:
//!
//! ```text
//! OFF --enter--> ACTIVATING --settled--> ON --leave--> DEACTIVATING --settled--> OFF
//!                    ^                                      |
//!                    +----------------enter-----------------+
//! ```
//!
//! A partial leave (one window) settles back to ON while other windows are
//! still hidden. Windows are moved to their final position immediately; the
//! slide is drawn with a paint-time translation so the rendered position is
//! always `anchor + trajectory offset`.

use std::collections::HashMap;

use crate::animation::{tick_budget, Step, Trajectory};
use crate::config::Config;
use crate::eligibility::is_eligible;
use crate::error::{Result, ShowdeskError};
use crate::hooks::{
    AllowedActionsNext, ChainRequest, DonePaintNext, EnterShowDesktopNext, FocusPolicy,
    FocusWindowNext, HandleEventNext, LeaveShowDesktopNext, PaintOutputNext, PaintWindowNext,
    Plugin, PreparePaintNext,
};
use crate::host::{
    AllowedActions, DisplayEvent, Host, Output, PaintScreenMask, PaintWindowMask, ScreenId,
    Transform, WindowActions, WindowId, WindowPaintAttrib, WindowStateFlags,
};
use crate::placement::Placer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SdState {
    #[default]
    Off,
    Activating,
    On,
    Deactivating,
}

impl SdState {
    pub fn is_animating(self) -> bool {
        matches!(self, SdState::Activating | SdState::Deactivating)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ScreenState {
    state: SdState,
    /// Some window was still moving after the last tick.
    more_adjust: bool,
}

/// Per-window bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct WindowState {
    pub placer: Option<Placer>,
    pub trajectory: Trajectory,
    pub adjusting: bool,
    /// Hints below are saved and must be restored on leave.
    pub showdesktoped: bool,
    pub was_managed: bool,
    pub state_mask: WindowStateFlags,
    pub not_allowed_mask: WindowActions,
}

impl WindowState {
    /// Trajectory offset the window is heading for.
    fn goal(&self) -> (f32, f32) {
        match &self.placer {
            Some(placer) if placer.placed => placer.travel(),
            _ => (0.0, 0.0),
        }
    }

    /// Translation from the window's real position to `anchor + offset`.
    /// Placed windows really sit at their off-screen target, others at the
    /// anchor.
    fn paint_offset(&self) -> Option<(f32, f32)> {
        let placer = self.placer.as_ref()?;
        let (mut dx, mut dy) = (self.trajectory.tx, self.trajectory.ty);
        if placer.placed {
            let (travel_x, travel_y) = placer.travel();
            dx -= travel_x;
            dy -= travel_y;
        }
        Some((dx, dy))
    }
}

pub struct ShowDesktop {
    config: Config,
    screens: HashMap<ScreenId, ScreenState>,
    windows: HashMap<WindowId, WindowState>,
    requests: Vec<ChainRequest>,
}

impl ShowDesktop {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            screens: HashMap::new(),
            windows: HashMap::new(),
            requests: Vec::new(),
        }
    }

    pub fn screen_state(&self, screen: ScreenId) -> Option<SdState> {
        self.screens.get(&screen).map(|ss| ss.state)
    }

    pub fn window_state(&self, window: WindowId) -> Option<&WindowState> {
        self.windows.get(&window)
    }

    /// Any screen mid-transition.
    pub fn is_animating(&self) -> bool {
        self.screens.values().any(|ss| ss.state.is_animating())
    }

    fn set_state(&mut self, screen: ScreenId, state: SdState) {
        if let Some(ss) = self.screens.get_mut(&screen) {
            if ss.state != state {
                log::debug!("Screen {}: {:?} -> {:?}", screen, ss.state, state);
                ss.state = state;
            }
        }
    }

    /// Place every eligible window off-screen. Returns how many were placed.
    fn prepare_windows(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        old_state: SdState,
        focus: &FocusPolicy,
    ) -> usize {
        let Some(screen_geometry) = host.screen_geometry(screen) else {
            log::warn!("Screen {} has no geometry", screen);
            return 0;
        };

        let mut count = 0;
        for window in host.screen_windows(screen) {
            if !is_eligible(&*host, &self.config, window, focus.can_focus(window)) {
                continue;
            }
            let Some(geometry) = host.window_geometry(window) else {
                continue;
            };
            let Some(ws) = self.windows.get_mut(&window) else {
                log::debug!("Window 0x{:x} has no show-desktop record", window);
                continue;
            };

            if old_state == SdState::Off || ws.placer.is_none() {
                ws.placer = Some(Placer::anchored(&geometry, &screen_geometry));
                ws.trajectory.reset();
            }
            let Some(placer) = ws.placer.as_mut() else {
                continue;
            };
            placer.reposition(
                &geometry,
                &screen_geometry,
                self.config.direction,
                self.config.window_part_size,
            );
            placer.placed = true;
            let (off_x, off_y) = (placer.off_screen_x, placer.off_screen_y);
            ws.adjusting = true;

            if !ws.showdesktoped {
                let state = host.window_state(window);
                ws.state_mask = state & WindowStateFlags::SKIP_PAGER;
                host.change_window_state(window, state | WindowStateFlags::SKIP_PAGER);
                ws.not_allowed_mask = WindowActions::MOVE | WindowActions::RESIZE;
                ws.was_managed = host.is_managed(window);
                host.set_managed(window, false);
                ws.showdesktoped = true;
            }
            host.set_in_show_desktop_mode(window, true);

            host.move_window(window, off_x - geometry.x, off_y - geometry.y);
            host.sync_window_position(window);
            count += 1;
        }
        count
    }

    /// Send placed windows (all, or just `only`) back to their anchors.
    fn restore_windows(&mut self, host: &mut dyn Host, screen: ScreenId, only: Option<WindowId>) {
        let screen_geometry = host.screen_geometry(screen);

        for window in host.screen_windows(screen) {
            if only.is_some_and(|target| target != window) {
                continue;
            }
            let Some(ws) = self.windows.get_mut(&window) else {
                continue;
            };
            let Some(placer) = ws.placer.as_mut().filter(|p| p.placed) else {
                continue;
            };

            ws.adjusting = true;
            placer.placed = false;
            if let Some(screen_geometry) = &screen_geometry {
                placer.correct_for_viewport(screen_geometry);
            }
            let (on_x, on_y) = (placer.on_screen_x, placer.on_screen_y);

            if let Some(geometry) = host.window_geometry(window) {
                host.move_window(window, on_x - geometry.x, on_y - geometry.y);
                host.sync_window_position(window);
            }

            if ws.showdesktoped {
                let state = host.window_state(window) - WindowStateFlags::SKIP_PAGER;
                host.change_window_state(window, state | ws.state_mask);
                ws.not_allowed_mask = WindowActions::empty();
                host.set_managed(window, ws.was_managed);
                ws.showdesktoped = false;
            }
            host.set_in_show_desktop_mode(window, false);
        }
    }

    /// Advance every adjusting window on `screen` by one paint tick.
    fn adjust_windows(&mut self, host: &dyn Host, screen: ScreenId, ms_since_last_paint: u32) -> bool {
        let budget = tick_budget(ms_since_last_paint, self.config.speed, self.config.timestep);
        let windows = host.screen_windows(screen);

        let mut more_adjust = false;
        for _ in 0..budget.steps {
            more_adjust = false;
            for window in &windows {
                let Some(ws) = self.windows.get_mut(window) else {
                    continue;
                };
                if !ws.adjusting {
                    continue;
                }
                if ws.placer.is_none() {
                    ws.adjusting = false;
                    continue;
                }
                let goal = ws.goal();
                match ws.trajectory.step(goal, budget.chunk) {
                    Step::Moving => more_adjust = true,
                    Step::Settled => ws.adjusting = false,
                }
            }
            if !more_adjust {
                break;
            }
        }
        more_adjust
    }
}

impl Plugin for ShowDesktop {
    fn name(&self) -> &'static str {
        "showdesktop"
    }

    fn attach_screen(&mut self, host: &mut dyn Host, screen: ScreenId) -> Result<()> {
        host.screen_geometry(screen)
            .ok_or(ShowdeskError::UnknownScreen(screen))?;
        self.screens.insert(screen, ScreenState::default());
        Ok(())
    }

    fn detach_screen(&mut self, _host: &mut dyn Host, screen: ScreenId) {
        self.screens.remove(&screen);
    }

    fn attach_window(&mut self, host: &mut dyn Host, window: WindowId) -> Result<()> {
        host.window_geometry(window)
            .ok_or(ShowdeskError::UnknownWindow(window))?;
        self.windows.insert(window, WindowState::default());
        Ok(())
    }

    fn detach_window(&mut self, _host: &mut dyn Host, window: WindowId) {
        if let Some(ws) = self.windows.remove(&window) {
            if ws.showdesktoped {
                log::debug!("Window 0x{:x} went away while hidden", window);
            }
        }
    }

    fn prepare_paint_screen(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        ms_since_last_paint: u32,
        next: &mut PreparePaintNext<'_>,
    ) {
        if self.screen_state(screen).is_some_and(SdState::is_animating) {
            let more_adjust = self.adjust_windows(&*host, screen, ms_since_last_paint);
            if let Some(ss) = self.screens.get_mut(&screen) {
                ss.more_adjust = more_adjust;
            }
        }
        next(host, screen, ms_since_last_paint)
    }

    fn paint_output(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        output: &Output,
        mut mask: PaintScreenMask,
        next: &mut PaintOutputNext<'_>,
    ) -> bool {
        if self.screen_state(screen).is_some_and(SdState::is_animating) {
            mask |= PaintScreenMask::WITH_TRANSFORMED_WINDOWS;
        }
        next(host, screen, output, mask)
    }

    fn done_paint_screen(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        next: &mut DonePaintNext<'_>,
    ) {
        if let Some(ss) = self.screens.get(&screen).copied() {
            if ss.more_adjust {
                host.damage_screen(screen);
            } else {
                match ss.state {
                    SdState::Activating => {
                        self.set_state(screen, SdState::On);
                        host.damage_screen(screen);
                    }
                    SdState::Deactivating => {
                        let mut still_hidden = false;
                        for window in host.screen_windows(screen) {
                            if host.in_show_desktop_mode(window) {
                                still_hidden = true;
                            } else if let Some(ws) = self.windows.get_mut(&window) {
                                ws.placer = None;
                                ws.trajectory.reset();
                            }
                        }
                        let state = if still_hidden { SdState::On } else { SdState::Off };
                        self.set_state(screen, state);
                        host.damage_screen(screen);
                    }
                    SdState::On | SdState::Off => {}
                }
            }
        }
        next(host, screen)
    }

    fn paint_window(
        &mut self,
        host: &mut dyn Host,
        window: WindowId,
        attrib: &WindowPaintAttrib,
        transform: &Transform,
        mask: PaintWindowMask,
        next: &mut PaintWindowNext<'_>,
    ) -> bool {
        let state = host
            .window_screen(window)
            .and_then(|screen| self.screen_state(screen));

        match state {
            Some(SdState::Activating | SdState::Deactivating) => {
                let offset = self
                    .windows
                    .get(&window)
                    .filter(|ws| ws.adjusting)
                    .and_then(WindowState::paint_offset);
                if let Some((dx, dy)) = offset {
                    let mut transform = *transform;
                    transform.translate(dx, dy);
                    return next(host, window, attrib, &transform, mask | PaintWindowMask::TRANSFORMED);
                }
                next(host, window, attrib, transform, mask)
            }
            Some(SdState::On) if host.in_show_desktop_mode(window) => {
                let attrib = WindowPaintAttrib {
                    opacity: attrib.opacity * self.config.window_opacity,
                };
                let mask = if attrib.opacity < 1.0 {
                    mask | PaintWindowMask::TRANSLUCENT
                } else {
                    mask
                };
                next(host, window, &attrib, transform, mask)
            }
            _ => next(host, window, attrib, transform, mask),
        }
    }

    fn enter_show_desktop_mode(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        focus: &FocusPolicy,
        next: &mut EnterShowDesktopNext<'_>,
    ) {
        if let Some(old_state) = self.screen_state(screen) {
            if matches!(old_state, SdState::Off | SdState::Deactivating) {
                let count = self.prepare_windows(host, screen, old_state, focus);
                if count > 0 {
                    log::info!("Showing desktop on screen {}: {} window(s) hidden", screen, count);
                    host.focus_root(screen);
                    self.set_state(screen, SdState::Activating);
                    if let Some(ss) = self.screens.get_mut(&screen) {
                        ss.more_adjust = true;
                    }
                    host.damage_screen(screen);
                } else {
                    log::debug!("Screen {}: no eligible windows", screen);
                }
            }
        }
        next(host, screen)
    }

    fn leave_show_desktop_mode(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        window: Option<WindowId>,
        next: &mut LeaveShowDesktopNext<'_>,
    ) {
        if self.screen_state(screen).is_some_and(|state| state != SdState::Off) {
            match window {
                Some(window) => log::info!("Restoring window 0x{:x} on screen {}", window, screen),
                None => log::info!("Leaving show desktop on screen {}", screen),
            }
            self.restore_windows(host, screen, window);
            self.set_state(screen, SdState::Deactivating);
            if let Some(ss) = self.screens.get_mut(&screen) {
                ss.more_adjust = true;
            }
            host.damage_screen(screen);
        }
        next(host, screen, window)
    }

    fn handle_event(
        &mut self,
        host: &mut dyn Host,
        event: &DisplayEvent,
        next: &mut HandleEventNext<'_>,
    ) {
        if let DisplayEvent::DesktopViewportChanged { screen } = *event {
            if matches!(
                self.screen_state(screen),
                Some(SdState::On | SdState::Activating)
            ) {
                log::debug!("Screen {}: viewport changed while showing desktop", screen);
                self.requests.push(ChainRequest::LeaveShowDesktop {
                    screen,
                    window: None,
                });
            }
        }
        next(host, event)
    }

    fn allowed_actions(
        &mut self,
        host: &mut dyn Host,
        window: WindowId,
        actions: &mut AllowedActions,
        next: &mut AllowedActionsNext<'_>,
    ) {
        next(host, window, actions);
        if let Some(ws) = self.windows.get(&window) {
            actions.clear |= ws.not_allowed_mask;
        }
    }

    fn focus_window(
        &mut self,
        host: &mut dyn Host,
        window: WindowId,
        next: &mut FocusWindowNext<'_>,
    ) -> bool {
        match self.windows.get(&window) {
            Some(ws) if ws.showdesktoped => {
                host.set_managed(window, ws.was_managed);
                let focusable = next(host, window);
                host.set_managed(window, false);
                focusable
            }
            _ => next(host, window),
        }
    }

    fn take_requests(&mut self) -> Vec<ChainRequest> {
        std::mem::take(&mut self.requests)
    }
}
