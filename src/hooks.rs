//! Ordered hook chain.
//!
//! Every plugin registers once. For each hook the chain calls the plugins in
//! registration order; each receives a `next` continuation that runs the rest
//! of the chain and finally the host's own implementation. A plugin can act
//! before `next`, after it, or around it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Result, ShowdeskError};
use crate::host::{
    AllowedActions, DisplayEvent, Host, Output, PaintScreenMask, PaintWindowMask, ScreenId,
    Transform, WindowId, WindowPaintAttrib,
};

/// Bound on how many rounds of queued requests one dispatch may trigger.
const MAX_REQUEST_ROUNDS: usize = 8;

pub type PreparePaintNext<'a> = dyn FnMut(&mut dyn Host, ScreenId, u32) + 'a;
pub type PaintOutputNext<'a> =
    dyn FnMut(&mut dyn Host, ScreenId, &Output, PaintScreenMask) -> bool + 'a;
pub type DonePaintNext<'a> = dyn FnMut(&mut dyn Host, ScreenId) + 'a;
pub type PaintWindowNext<'a> = dyn FnMut(
        &mut dyn Host,
        WindowId,
        &WindowPaintAttrib,
        &Transform,
        PaintWindowMask,
    ) -> bool
    + 'a;
pub type EnterShowDesktopNext<'a> = dyn FnMut(&mut dyn Host, ScreenId) + 'a;
pub type LeaveShowDesktopNext<'a> = dyn FnMut(&mut dyn Host, ScreenId, Option<WindowId>) + 'a;
pub type HandleEventNext<'a> = dyn FnMut(&mut dyn Host, &DisplayEvent) + 'a;
pub type AllowedActionsNext<'a> = dyn FnMut(&mut dyn Host, WindowId, &mut AllowedActions) + 'a;
pub type FocusWindowNext<'a> = dyn FnMut(&mut dyn Host, WindowId) -> bool + 'a;

/// A chain-level hook a plugin wants run after the current dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainRequest {
    LeaveShowDesktop {
        screen: ScreenId,
        window: Option<WindowId>,
    },
}

/// What the whole `focus_window` chain answered for each window of a screen,
/// collected right before an enter dispatch. Plugins cannot run the chain
/// from inside a hook, so they read this instead.
#[derive(Debug, Clone, Default)]
pub struct FocusPolicy {
    focusable: HashMap<WindowId, bool>,
}

impl FocusPolicy {
    /// Windows the snapshot never saw are treated as unfocusable.
    pub fn can_focus(&self, window: WindowId) -> bool {
        self.focusable.get(&window).copied().unwrap_or(false)
    }
}

impl FromIterator<(WindowId, bool)> for FocusPolicy {
    fn from_iter<I: IntoIterator<Item = (WindowId, bool)>>(iter: I) -> Self {
        Self {
            focusable: iter.into_iter().collect(),
        }
    }
}

/// A compositor plugin. Every hook defaults to pass-through.
#[allow(unused_variables)]
pub trait Plugin {
    fn name(&self) -> &'static str;

    fn attach_screen(&mut self, host: &mut dyn Host, screen: ScreenId) -> Result<()> {
        Ok(())
    }

    fn detach_screen(&mut self, host: &mut dyn Host, screen: ScreenId) {}

    fn attach_window(&mut self, host: &mut dyn Host, window: WindowId) -> Result<()> {
        Ok(())
    }

    fn detach_window(&mut self, host: &mut dyn Host, window: WindowId) {}

    fn prepare_paint_screen(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        ms_since_last_paint: u32,
        next: &mut PreparePaintNext<'_>,
    ) {
        next(host, screen, ms_since_last_paint)
    }

    fn paint_output(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        output: &Output,
        mask: PaintScreenMask,
        next: &mut PaintOutputNext<'_>,
    ) -> bool {
        next(host, screen, output, mask)
    }

    fn done_paint_screen(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        next: &mut DonePaintNext<'_>,
    ) {
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
        next(host, window, attrib, transform, mask)
    }

    fn enter_show_desktop_mode(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        focus: &FocusPolicy,
        next: &mut EnterShowDesktopNext<'_>,
    ) {
        next(host, screen)
    }

    fn leave_show_desktop_mode(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        window: Option<WindowId>,
        next: &mut LeaveShowDesktopNext<'_>,
    ) {
        next(host, screen, window)
    }

    fn handle_event(
        &mut self,
        host: &mut dyn Host,
        event: &DisplayEvent,
        next: &mut HandleEventNext<'_>,
    ) {
        next(host, event)
    }

    fn allowed_actions(
        &mut self,
        host: &mut dyn Host,
        window: WindowId,
        actions: &mut AllowedActions,
        next: &mut AllowedActionsNext<'_>,
    ) {
        next(host, window, actions)
    }

    fn focus_window(
        &mut self,
        host: &mut dyn Host,
        window: WindowId,
        next: &mut FocusWindowNext<'_>,
    ) -> bool {
        next(host, window)
    }

    /// Requests queued during the last hook call.
    fn take_requests(&mut self) -> Vec<ChainRequest> {
        Vec::new()
    }
}

/// A plugin shared between the chain and its owner, so the owner can read
/// its state between cycles. The chain borrows it for the length of a hook.
impl<P: Plugin> Plugin for Rc<RefCell<P>> {
    fn name(&self) -> &'static str {
        self.borrow().name()
    }

    fn attach_screen(&mut self, host: &mut dyn Host, screen: ScreenId) -> Result<()> {
        self.borrow_mut().attach_screen(host, screen)
    }

    fn detach_screen(&mut self, host: &mut dyn Host, screen: ScreenId) {
        self.borrow_mut().detach_screen(host, screen)
    }

    fn attach_window(&mut self, host: &mut dyn Host, window: WindowId) -> Result<()> {
        self.borrow_mut().attach_window(host, window)
    }

    fn detach_window(&mut self, host: &mut dyn Host, window: WindowId) {
        self.borrow_mut().detach_window(host, window)
    }

    fn prepare_paint_screen(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        ms_since_last_paint: u32,
        next: &mut PreparePaintNext<'_>,
    ) {
        self.borrow_mut()
            .prepare_paint_screen(host, screen, ms_since_last_paint, next)
    }

    fn paint_output(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        output: &Output,
        mask: PaintScreenMask,
        next: &mut PaintOutputNext<'_>,
    ) -> bool {
        self.borrow_mut().paint_output(host, screen, output, mask, next)
    }

    fn done_paint_screen(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        next: &mut DonePaintNext<'_>,
    ) {
        self.borrow_mut().done_paint_screen(host, screen, next)
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
        self.borrow_mut()
            .paint_window(host, window, attrib, transform, mask, next)
    }

    fn enter_show_desktop_mode(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        focus: &FocusPolicy,
        next: &mut EnterShowDesktopNext<'_>,
    ) {
        self.borrow_mut()
            .enter_show_desktop_mode(host, screen, focus, next)
    }

    fn leave_show_desktop_mode(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        window: Option<WindowId>,
        next: &mut LeaveShowDesktopNext<'_>,
    ) {
        self.borrow_mut()
            .leave_show_desktop_mode(host, screen, window, next)
    }

    fn handle_event(
        &mut self,
        host: &mut dyn Host,
        event: &DisplayEvent,
        next: &mut HandleEventNext<'_>,
    ) {
        self.borrow_mut().handle_event(host, event, next)
    }

    fn allowed_actions(
        &mut self,
        host: &mut dyn Host,
        window: WindowId,
        actions: &mut AllowedActions,
        next: &mut AllowedActionsNext<'_>,
    ) {
        self.borrow_mut().allowed_actions(host, window, actions, next)
    }

    fn focus_window(
        &mut self,
        host: &mut dyn Host,
        window: WindowId,
        next: &mut FocusWindowNext<'_>,
    ) -> bool {
        self.borrow_mut().focus_window(host, window, next)
    }

    fn take_requests(&mut self) -> Vec<ChainRequest> {
        self.borrow_mut().take_requests()
    }
}

#[derive(Default)]
pub struct HookChain {
    plugins: Vec<Box<dyn Plugin>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        log::debug!("Registering plugin '{}'", plugin.name());
        self.plugins.push(plugin);
    }

    /// Attach a screen to every plugin. A plugin that fails simply has no
    /// state for the screen; the first failure is returned after all tried.
    pub fn attach_screen(&mut self, host: &mut dyn Host, screen: ScreenId) -> Result<()> {
        let mut first_err: Option<ShowdeskError> = None;
        for plugin in &mut self.plugins {
            if let Err(e) = plugin.attach_screen(host, screen) {
                log::warn!("Plugin '{}' failed to attach screen {}: {}", plugin.name(), screen, e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn detach_screen(&mut self, host: &mut dyn Host, screen: ScreenId) {
        for plugin in self.plugins.iter_mut().rev() {
            plugin.detach_screen(host, screen);
        }
    }

    pub fn attach_window(&mut self, host: &mut dyn Host, window: WindowId) -> Result<()> {
        let mut first_err: Option<ShowdeskError> = None;
        for plugin in &mut self.plugins {
            if let Err(e) = plugin.attach_window(host, window) {
                log::debug!(
                    "Plugin '{}' failed to attach window 0x{:x}: {}",
                    plugin.name(),
                    window,
                    e
                );
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn detach_window(&mut self, host: &mut dyn Host, window: WindowId) {
        for plugin in self.plugins.iter_mut().rev() {
            plugin.detach_window(host, window);
        }
    }

    /// Run one full paint cycle for `screen`.
    pub fn paint_screen(&mut self, host: &mut dyn Host, screen: ScreenId, ms_since_last_paint: u32) {
        self.prepare_paint_screen(host, screen, ms_since_last_paint);
        for output in host.outputs(screen) {
            self.paint_output(host, screen, &output, PaintScreenMask::REGION);
        }
        let attrib = WindowPaintAttrib::default();
        let transform = Transform::identity();
        for window in host.screen_windows(screen) {
            self.paint_window(host, window, &attrib, &transform, PaintWindowMask::empty());
        }
        self.done_paint_screen(host, screen);
    }

    pub fn prepare_paint_screen(&mut self, host: &mut dyn Host, screen: ScreenId, ms: u32) {
        dispatch_prepare_paint(&mut self.plugins, host, screen, ms);
        self.run_requests(host);
    }

    pub fn paint_output(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        output: &Output,
        mask: PaintScreenMask,
    ) -> bool {
        let status = dispatch_paint_output(&mut self.plugins, host, screen, output, mask);
        self.run_requests(host);
        status
    }

    pub fn done_paint_screen(&mut self, host: &mut dyn Host, screen: ScreenId) {
        dispatch_done_paint(&mut self.plugins, host, screen);
        self.run_requests(host);
    }

    pub fn paint_window(
        &mut self,
        host: &mut dyn Host,
        window: WindowId,
        attrib: &WindowPaintAttrib,
        transform: &Transform,
        mask: PaintWindowMask,
    ) -> bool {
        let status = dispatch_paint_window(&mut self.plugins, host, window, attrib, transform, mask);
        self.run_requests(host);
        status
    }

    pub fn enter_show_desktop_mode(&mut self, host: &mut dyn Host, screen: ScreenId) {
        let focus = self.focus_policy(host, screen);
        dispatch_enter(&mut self.plugins, host, screen, &focus);
        self.run_requests(host);
    }

    /// Ask the full focus chain about every window on `screen`.
    fn focus_policy(&mut self, host: &mut dyn Host, screen: ScreenId) -> FocusPolicy {
        let mut answers = Vec::new();
        for window in host.screen_windows(screen) {
            answers.push((window, dispatch_focus(&mut self.plugins, host, window)));
        }
        answers.into_iter().collect()
    }

    pub fn leave_show_desktop_mode(
        &mut self,
        host: &mut dyn Host,
        screen: ScreenId,
        window: Option<WindowId>,
    ) {
        dispatch_leave(&mut self.plugins, host, screen, window);
        self.run_requests(host);
    }

    pub fn handle_event(&mut self, host: &mut dyn Host, event: &DisplayEvent) {
        dispatch_event(&mut self.plugins, host, event);
        self.run_requests(host);
    }

    pub fn allowed_actions(&mut self, host: &mut dyn Host, window: WindowId) -> AllowedActions {
        let mut actions = AllowedActions::default();
        dispatch_allowed_actions(&mut self.plugins, host, window, &mut actions);
        self.run_requests(host);
        actions
    }

    pub fn focus_window(&mut self, host: &mut dyn Host, window: WindowId) -> bool {
        let focusable = dispatch_focus(&mut self.plugins, host, window);
        self.run_requests(host);
        focusable
    }

    fn run_requests(&mut self, host: &mut dyn Host) {
        for _ in 0..MAX_REQUEST_ROUNDS {
            let requests: Vec<ChainRequest> = self
                .plugins
                .iter_mut()
                .flat_map(|plugin| plugin.take_requests())
                .collect();
            if requests.is_empty() {
                return;
            }
            for request in requests {
                log::debug!("Running queued request {:?}", request);
                match request {
                    ChainRequest::LeaveShowDesktop { screen, window } => {
                        dispatch_leave(&mut self.plugins, host, screen, window)
                    }
                }
            }
        }
        log::warn!("Dropping queued requests after {} rounds", MAX_REQUEST_ROUNDS);
    }
}

fn dispatch_prepare_paint(
    plugins: &mut [Box<dyn Plugin>],
    host: &mut dyn Host,
    screen: ScreenId,
    ms: u32,
) {
    match plugins.split_first_mut() {
        Some((plugin, rest)) => plugin.prepare_paint_screen(
            host,
            screen,
            ms,
            &mut |host: &mut dyn Host, screen: ScreenId, ms: u32| {
                dispatch_prepare_paint(&mut *rest, host, screen, ms)
            },
        ),
        None => host.prepare_paint_screen(screen, ms),
    }
}

fn dispatch_paint_output(
    plugins: &mut [Box<dyn Plugin>],
    host: &mut dyn Host,
    screen: ScreenId,
    output: &Output,
    mask: PaintScreenMask,
) -> bool {
    match plugins.split_first_mut() {
        Some((plugin, rest)) => plugin.paint_output(
            host,
            screen,
            output,
            mask,
            &mut |host: &mut dyn Host, screen: ScreenId, output: &Output, mask: PaintScreenMask| {
                dispatch_paint_output(&mut *rest, host, screen, output, mask)
            },
        ),
        None => host.paint_output(screen, output, mask),
    }
}

fn dispatch_done_paint(plugins: &mut [Box<dyn Plugin>], host: &mut dyn Host, screen: ScreenId) {
    match plugins.split_first_mut() {
        Some((plugin, rest)) => plugin.done_paint_screen(
            host,
            screen,
            &mut |host: &mut dyn Host, screen: ScreenId| dispatch_done_paint(&mut *rest, host, screen),
        ),
        None => host.done_paint_screen(screen),
    }
}

fn dispatch_paint_window(
    plugins: &mut [Box<dyn Plugin>],
    host: &mut dyn Host,
    window: WindowId,
    attrib: &WindowPaintAttrib,
    transform: &Transform,
    mask: PaintWindowMask,
) -> bool {
    match plugins.split_first_mut() {
        Some((plugin, rest)) => plugin.paint_window(
            host,
            window,
            attrib,
            transform,
            mask,
            &mut |host: &mut dyn Host,
                  window: WindowId,
                  attrib: &WindowPaintAttrib,
                  transform: &Transform,
                  mask: PaintWindowMask| {
                dispatch_paint_window(&mut *rest, host, window, attrib, transform, mask)
            },
        ),
        None => host.paint_window(window, attrib, transform, mask),
    }
}

fn dispatch_enter(
    plugins: &mut [Box<dyn Plugin>],
    host: &mut dyn Host,
    screen: ScreenId,
    focus: &FocusPolicy,
) {
    match plugins.split_first_mut() {
        Some((plugin, rest)) => plugin.enter_show_desktop_mode(
            host,
            screen,
            focus,
            &mut |host: &mut dyn Host, screen: ScreenId| {
                dispatch_enter(&mut *rest, host, screen, focus)
            },
        ),
        None => host.enter_show_desktop_mode(screen),
    }
}

fn dispatch_leave(
    plugins: &mut [Box<dyn Plugin>],
    host: &mut dyn Host,
    screen: ScreenId,
    window: Option<WindowId>,
) {
    match plugins.split_first_mut() {
        Some((plugin, rest)) => plugin.leave_show_desktop_mode(
            host,
            screen,
            window,
            &mut |host: &mut dyn Host, screen: ScreenId, window: Option<WindowId>| {
                dispatch_leave(&mut *rest, host, screen, window)
            },
        ),
        None => host.leave_show_desktop_mode(screen, window),
    }
}

fn dispatch_event(plugins: &mut [Box<dyn Plugin>], host: &mut dyn Host, event: &DisplayEvent) {
    match plugins.split_first_mut() {
        Some((plugin, rest)) => plugin.handle_event(
            host,
            event,
            &mut |host: &mut dyn Host, event: &DisplayEvent| dispatch_event(&mut *rest, host, event),
        ),
        None => host.handle_event(event),
    }
}

fn dispatch_allowed_actions(
    plugins: &mut [Box<dyn Plugin>],
    host: &mut dyn Host,
    window: WindowId,
    actions: &mut AllowedActions,
) {
    match plugins.split_first_mut() {
        Some((plugin, rest)) => plugin.allowed_actions(
            host,
            window,
            actions,
            &mut |host: &mut dyn Host, window: WindowId, actions: &mut AllowedActions| {
                dispatch_allowed_actions(&mut *rest, host, window, actions)
            },
        ),
        None => host.allowed_actions(window, actions),
    }
}

fn dispatch_focus(plugins: &mut [Box<dyn Plugin>], host: &mut dyn Host, window: WindowId) -> bool {
    match plugins.split_first_mut() {
        Some((plugin, rest)) => plugin.focus_window(
            host,
            window,
            &mut |host: &mut dyn Host, window: WindowId| dispatch_focus(&mut *rest, host, window),
        ),
        None => host.focus_window(window),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::WindowActions;
    use crate::mock_host::MockHost;

    /// Records the order hooks run in and tweaks what it passes down.
    struct Tracer {
        label: &'static str,
        log: Rc<RefCell<Vec<String>>>,
        queued: Vec<ChainRequest>,
    }

    impl Tracer {
        fn new(label: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                label,
                log: Rc::clone(log),
                queued: Vec::new(),
            }
        }
    }

    impl Plugin for Tracer {
        fn name(&self) -> &'static str {
            self.label
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
            self.log.borrow_mut().push(format!("{}:paint", self.label));
            let attrib = WindowPaintAttrib {
                opacity: attrib.opacity * 0.5,
            };
            next(host, window, &attrib, transform, mask)
        }

        fn enter_show_desktop_mode(
            &mut self,
            host: &mut dyn Host,
            screen: ScreenId,
            _focus: &FocusPolicy,
            next: &mut EnterShowDesktopNext<'_>,
        ) {
            self.log.borrow_mut().push(format!("{}:enter", self.label));
            if self.label == "first" {
                self.queued.push(ChainRequest::LeaveShowDesktop {
                    screen,
                    window: None,
                });
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
            self.log.borrow_mut().push(format!("{}:leave", self.label));
            next(host, screen, window)
        }

        fn allowed_actions(
            &mut self,
            host: &mut dyn Host,
            window: WindowId,
            actions: &mut AllowedActions,
            next: &mut AllowedActionsNext<'_>,
        ) {
            next(host, window, actions);
            actions.clear |= WindowActions::CLOSE;
        }

        fn take_requests(&mut self) -> Vec<ChainRequest> {
            std::mem::take(&mut self.queued)
        }
    }

    /// Refuses focus to one window.
    struct Veto(WindowId);

    impl Plugin for Veto {
        fn name(&self) -> &'static str {
            "veto"
        }

        fn focus_window(
            &mut self,
            host: &mut dyn Host,
            window: WindowId,
            next: &mut FocusWindowNext<'_>,
        ) -> bool {
            window != self.0 && next(host, window)
        }
    }

    /// Keeps the focus answers handed to the enter hook.
    #[derive(Default)]
    struct FocusRecorder {
        seen: Vec<(WindowId, bool)>,
    }

    impl Plugin for FocusRecorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn enter_show_desktop_mode(
            &mut self,
            host: &mut dyn Host,
            screen: ScreenId,
            focus: &FocusPolicy,
            next: &mut EnterShowDesktopNext<'_>,
        ) {
            for window in host.screen_windows(screen) {
                self.seen.push((window, focus.can_focus(window)));
            }
            next(host, screen)
        }
    }

    #[test]
    fn test_hooks_run_in_registration_order_then_host() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut chain = HookChain::new();
        chain.register(Box::new(Tracer::new("first", &log)));
        chain.register(Box::new(Tracer::new("second", &log)));

        let mut host = MockHost::new();
        let w = host.add_window(1, 100, 100, 200, 100);

        chain.paint_window(
            &mut host,
            w,
            &WindowPaintAttrib::default(),
            &Transform::identity(),
            PaintWindowMask::empty(),
        );
        assert_eq!(*log.borrow(), vec!["first:paint", "second:paint"]);
        // Each layer halved the opacity before the host saw it.
        let painted = host.last_paint(w).expect("host painted window");
        assert!((painted.attrib.opacity - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_queued_requests_run_through_whole_chain() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut chain = HookChain::new();
        chain.register(Box::new(Tracer::new("first", &log)));
        chain.register(Box::new(Tracer::new("second", &log)));

        let mut host = MockHost::new();
        chain.enter_show_desktop_mode(&mut host, 0);

        assert_eq!(
            *log.borrow(),
            vec!["first:enter", "second:enter", "first:leave", "second:leave"]
        );
        assert_eq!(host.enter_calls, 1);
        assert_eq!(host.leave_calls, vec![None]);
    }

    #[test]
    fn test_allowed_actions_layers_compose() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut chain = HookChain::new();
        chain.register(Box::new(Tracer::new("only", &log)));

        let mut host = MockHost::new();
        let w = host.add_window(1, 0, 0, 10, 10);
        let actions = chain.allowed_actions(&mut host, w);
        assert_eq!(actions.set, WindowActions::all());
        assert!(!actions.effective().contains(WindowActions::CLOSE));
    }

    #[test]
    fn test_empty_chain_reaches_host() {
        let mut chain = HookChain::new();
        let mut host = MockHost::new();
        let w = host.add_window(1, 0, 0, 10, 10);
        assert!(chain.focus_window(&mut host, w));
        chain.leave_show_desktop_mode(&mut host, 0, Some(w));
        assert_eq!(host.leave_calls, vec![Some(w)]);
    }

    #[test]
    fn test_enter_sees_whole_focus_chain() {
        let recorder = Rc::new(RefCell::new(FocusRecorder::default()));
        let mut host = MockHost::new();
        let open = host.add_window(1, 0, 0, 10, 10);
        let vetoed = host.add_window(2, 20, 0, 10, 10);
        let unfocusable = host.add_window(3, 40, 0, 10, 10);
        host.window_mut(unfocusable).focusable = false;

        // The veto sits after the recorder, so only the snapshot can see it.
        let mut chain = HookChain::new();
        chain.register(Box::new(Rc::clone(&recorder)));
        chain.register(Box::new(Veto(vetoed)));
        chain.enter_show_desktop_mode(&mut host, 0);

        assert_eq!(
            recorder.borrow().seen,
            vec![(open, true), (vetoed, false), (unfocusable, false)]
        );
        assert!(!FocusPolicy::default().can_focus(open));
        assert_eq!(host.enter_calls, 1);
    }
}
