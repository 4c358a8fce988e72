//! Animated "show desktop" for compositing window managers.
//!
//! The engine ([`showdesktop::ShowDesktop`]) is a [`hooks::Plugin`] that
//! slides eligible windows off-screen and back. It talks to the window
//! manager only through the [`host::Host`] trait; [`x11_host::X11Host`]
//! implements that trait for a plain X11 display.

pub mod animation;
pub mod config;
pub mod connection;
pub mod eligibility;
pub mod error;
pub mod hooks;
pub mod host;
pub mod matcher;
pub mod placement;
pub mod showdesktop;
pub mod window_finder;
pub mod x11_host;

#[cfg(test)]
mod mock_host;
