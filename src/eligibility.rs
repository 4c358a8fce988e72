//! Which windows take part in show-desktop.

use crate::config::Config;
use crate::host::{Host, WindowId, WindowStateFlags, WindowType};

/// Whether `window` should slide away when show-desktop starts.
///
/// `focusable` is the focus policy's verdict for the window; the caller asks
/// for it because the policy is a hook and may need mutable access.
pub fn is_eligible(host: &dyn Host, config: &Config, window: WindowId, focusable: bool) -> bool {
    if host.is_grabbed(window) {
        return false;
    }
    if !focusable {
        return false;
    }
    if !host.evaluate_match(window, &config.window_match) {
        return false;
    }
    if matches!(host.window_type(window), WindowType::Desktop | WindowType::Dock) {
        return false;
    }
    !host.window_state(window).contains(WindowStateFlags::SKIP_PAGER)
}
