use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use x11rb::connection::Connection;
use x11rb::protocol::Event;

use showdesk::config::Config;
use showdesk::connection::XConnection;
use showdesk::error::Result;
use showdesk::hooks::HookChain;
use showdesk::host::{DisplayEvent, Host};
use showdesk::showdesktop::ShowDesktop;
use showdesk::x11_host::{X11Host, SCREEN};

/// Animated show-desktop for X11.
#[derive(Parser, Debug)]
#[command(name = "showdesk", about = "Animated show-desktop for X11", version)]
struct Cli {
    /// Read configuration from this file instead of ~/.showdeskrc.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Send a request to the running daemon instead of starting one.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Slide windows away and show the desktop.
    Show,
    /// Bring hidden windows back.
    Hide,
    /// Show or hide depending on the current state.
    Toggle,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        log::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    match cli.command {
        Some(command) => {
            let xconn = XConnection::new()?;
            let show = match command {
                Command::Show => true,
                Command::Hide => false,
                Command::Toggle => !xconn.showing_desktop()?,
            };
            xconn.request_showing_desktop(show)?;
            xconn.sync()?;
            Ok(())
        }
        None => run_daemon(config),
    }
}

fn run_daemon(config: Config) -> Result<()> {
    log::info!("Starting showdesk");

    let xconn = XConnection::new()?;
    log::info!(
        "Connected to X server, screen {} is {}x{}",
        xconn.screen_num,
        xconn.screen_width,
        xconn.screen_height
    );
    xconn.select_root_events()?;

    let frame_duration = config.frame_duration();
    let showdesktop = Rc::new(RefCell::new(ShowDesktop::new(config)));
    let mut chain = HookChain::new();
    chain.register(Box::new(Rc::clone(&showdesktop)));

    let mut host = X11Host::new(xconn)?;
    chain.attach_screen(&mut host, SCREEN)?;
    for window in host.screen_windows(SCREEN) {
        attach(&mut chain, &mut host, window);
    }
    host.flush()?;

    log::info!("Waiting for _NET_SHOWING_DESKTOP requests");

    let mut last_paint: Option<Instant> = None;
    loop {
        let busy = last_paint.is_some();
        let first = if busy {
            host.xconn().conn.poll_for_event()?
        } else {
            Some(host.xconn().conn.wait_for_event()?)
        };
        if let Some(event) = first {
            handle_x_event(&mut chain, &mut host, event)?;
            while let Some(event) = host.xconn().conn.poll_for_event()? {
                handle_x_event(&mut chain, &mut host, event)?;
            }
        }

        if host.take_damage() || showdesktop.borrow().is_animating() {
            // Coming out of idle, pretend exactly one frame passed
            let now = Instant::now();
            let elapsed = last_paint.map_or(frame_duration, |at| now.duration_since(at));
            last_paint = Some(now);

            chain.paint_screen(&mut host, SCREEN, millis(elapsed));
            host.flush()?;
            thread::sleep(frame_duration);
        } else {
            last_paint = None;
        }
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

fn attach(chain: &mut HookChain, host: &mut X11Host, window: u32) {
    if chain.attach_window(host, window).is_err() {
        log::debug!("Window 0x{:x} has no show-desktop support", window);
    }
}

fn handle_x_event(chain: &mut HookChain, host: &mut X11Host, event: Event) -> Result<()> {
    let atoms = host.xconn().atoms;
    let root = host.xconn().root;

    match event {
        Event::ClientMessage(e) if e.type_ == atoms._NET_SHOWING_DESKTOP => {
            if e.data.as_data32()[0] != 0 {
                host.refresh_grab();
                chain.enter_show_desktop_mode(host, SCREEN);
            } else {
                chain.leave_show_desktop_mode(host, SCREEN, None);
            }
        }
        Event::PropertyNotify(e) if e.window == root => {
            if e.atom == atoms._NET_DESKTOP_VIEWPORT || e.atom == atoms._NET_CURRENT_DESKTOP {
                host.refresh_screen()?;
                chain.handle_event(host, &DisplayEvent::DesktopViewportChanged { screen: SCREEN });
            } else if e.atom == atoms._NET_WORKAREA {
                host.refresh_screen()?;
                chain.handle_event(host, &DisplayEvent::WorkAreaChanged { screen: SCREEN });
            }
        }
        Event::MapNotify(e) if e.event == root && !e.override_redirect => {
            match host.add_frame(e.window) {
                Ok(Some(window)) => attach(chain, host, window),
                Ok(None) => {}
                // Window may have been destroyed, skip it
                Err(err) => log::debug!("Error examining frame 0x{:x}: {}", e.window, err),
            }
        }
        Event::UnmapNotify(e) if e.event == root => host.set_mapped(e.window, false),
        Event::DestroyNotify(e) if host.knows(e.window) => {
            chain.detach_window(host, e.window);
            host.remove_frame(e.window);
        }
        Event::ConfigureNotify(e) if e.event == root => host.observe_configure(&e),
        Event::Error(e) => log::debug!("X11 error: {:?}", e),
        _ => {}
    }
    Ok(())
}
