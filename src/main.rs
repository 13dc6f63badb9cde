#![cfg_attr(target_arch = "wasm32", allow(dead_code, unused_imports))]

use std::any::Any;
use std::fmt;

use anyhow::{anyhow, bail, Context, Result};

use portfolio_runtime::app::SessionScript;
use portfolio_runtime::Section;

#[cfg(not(target_arch = "wasm32"))]
use desktop::run;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

/// Keys `1`..`6` jump to the sections in page order.
fn section_for_digit(text: &str) -> Option<Section> {
    let digit: usize = text.parse().ok()?;
    Section::ALL.get(digit.checked_sub(1)?).copied()
}

#[cfg(not(target_arch = "wasm32"))]
mod desktop {
    use std::env;
    use std::panic::{self, AssertUnwindSafe};
    use std::rc::Rc;
    use std::sync::Arc;
    use std::time::Instant;

    use anyhow::{Context, Result};
    use log::{info, warn};
    use winit::application::ApplicationHandler;
    use winit::dpi::LogicalSize;
    use winit::event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
    use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
    use winit::keyboard::{Key, NamedKey};
    use winit::window::{Window, WindowAttributes, WindowId};

    use portfolio_runtime::app::{self, PageSession, SessionScript};
    use portfolio_runtime::host::window::WindowRegion;
    use portfolio_runtime::render::native::{create_window_renderer, WindowRenderer};
    use portfolio_runtime::{HeroConfig, NavConfig, SiteContent};

    use super::{section_for_digit, CliOptions, WindowInitError};

    /// Pixels scrolled per wheel line.
    const LINE_HEIGHT: f64 = 40.0;

    pub(crate) fn run() -> Result<()> {
        let options = CliOptions::parse(env::args().skip(1))?;
        let content = match &options.content {
            Some(path) => SiteContent::load(path)
                .with_context(|| format!("failed to load content from {path}"))?,
            None => SiteContent::default(),
        };
        app::print_content_summary(&content);

        if options.summary_only {
            return Ok(());
        }

        let hero = HeroConfig::default();
        let nav = NavConfig::default();
        if options.headless {
            return app::run_headless(&options.script, hero, nav);
        }

        match run_interactive(&options.script, &content, hero.clone(), nav) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --headless mode (set DISPLAY or install X11 libs to enable rendering)."
                    );
                    app::run_headless(&options.script, hero, nav)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn run_interactive(
        script: &SessionScript,
        content: &SiteContent,
        hero: HeroConfig,
        nav: NavConfig,
    ) -> Result<()> {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
        panic::set_hook(default_hook);
        let event_loop = event_loop
            .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
            .map_err(|err| WindowInitError::from_error("event loop", err))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = NativeApp {
            title: format!("{} | Portfolio", content.profile.name),
            size: script.size,
            hero,
            nav,
            session: None,
            window: None,
            last_frame: None,
            last_error: None,
        };
        event_loop
            .run_app(&mut app)
            .context("event loop terminated abnormally")?;

        if let Some(err) = app.last_error.take() {
            return Err(err);
        }
        if let Some(session) = app.session.as_ref() {
            app::print_final_state(session.nav_state());
        }
        Ok(())
    }

    type WindowSession = PageSession<WindowRegion, WindowRenderer>;

    struct NativeApp {
        title: String,
        size: (u32, u32),
        hero: HeroConfig,
        nav: NavConfig,
        session: Option<WindowSession>,
        window: Option<Arc<Window>>,
        last_frame: Option<Instant>,
        last_error: Option<anyhow::Error>,
    }

    impl NativeApp {
        fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
            let (width, height) = self.size;
            let attributes = WindowAttributes::default()
                .with_title(self.title.clone())
                .with_inner_size(LogicalSize::new(width, height));
            let window = Arc::new(
                event_loop
                    .create_window(attributes)
                    .map_err(|err| WindowInitError::from_error("window", err))?,
            );

            let inner = window.inner_size();
            let region = Rc::new(WindowRegion::new(Arc::clone(&window)));
            let mut session = PageSession::new(
                region,
                inner.width,
                inner.height,
                self.hero.clone(),
                self.nav,
            );
            let target = Arc::clone(&window);
            if !session.mount_hero(|width, height, options| {
                create_window_renderer(target, width, height, options)
            }) {
                warn!("hero animation unavailable; the page keeps working without it");
            }

            window.request_redraw();
            self.window = Some(window);
            self.session = Some(session);
            Ok(())
        }

        fn handle_key(&mut self, event: &KeyEvent) {
            if event.state != ElementState::Pressed || event.repeat {
                return;
            }
            let Some(session) = self.session.as_mut() else {
                return;
            };
            match event.logical_key.as_ref() {
                Key::Character(text) => {
                    if text.eq_ignore_ascii_case("m") {
                        let open = session.toggle_menu();
                        info!("menu open: {open}");
                    } else if let Some(section) = section_for_digit(text) {
                        if let Err(err) = session.navigate(section) {
                            warn!("{err}");
                        }
                    }
                }
                Key::Named(NamedKey::Home) => session.scroll_to(0.0),
                Key::Named(NamedKey::PageDown) => {
                    let height = self.window.as_ref().map_or(0, |w| w.inner_size().height);
                    session.scroll_by(f64::from(height));
                }
                Key::Named(NamedKey::PageUp) => {
                    let height = self.window.as_ref().map_or(0, |w| w.inner_size().height);
                    session.scroll_by(-f64::from(height));
                }
                _ => {}
            }
        }
    }

    impl ApplicationHandler for NativeApp {
        fn resumed(&mut self, event_loop: &ActiveEventLoop) {
            if self.window.is_some() {
                return;
            }
            if let Err(err) = self.open(event_loop) {
                self.last_error = Some(err);
                event_loop.exit();
            }
        }

        fn window_event(
            &mut self,
            event_loop: &ActiveEventLoop,
            window_id: WindowId,
            event: WindowEvent,
        ) {
            let Some(window) = self.window.clone() else {
                return;
            };
            if window.id() != window_id {
                return;
            }

            match event {
                WindowEvent::CloseRequested => {
                    if let Some(session) = self.session.as_mut() {
                        session.unmount_hero();
                    }
                    event_loop.exit();
                }
                WindowEvent::Resized(size) => {
                    if let Some(session) = self.session.as_mut() {
                        session.resize(size.width, size.height);
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let dy = match delta {
                        MouseScrollDelta::LineDelta(_, y) => f64::from(y) * LINE_HEIGHT,
                        MouseScrollDelta::PixelDelta(position) => position.y,
                    };
                    if let Some(session) = self.session.as_mut() {
                        session.scroll_by(-dy);
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event),
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = self
                        .last_frame
                        .map_or(app::FRAME_MS, |last| (now - last).as_secs_f64() * 1000.0);
                    self.last_frame = Some(now);
                    if let Some(session) = self.session.as_mut() {
                        session.frame(dt);
                    }
                    window.request_redraw();
                }
                _ => {}
            }
        }
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

const USAGE: &str = "Usage: portfolio-runtime [--headless] [--summary-only] [--content FILE] \
[--size WxH] [--frames N] [--resize WxH]... [--scroll PX]... [--toggle-menu] [--navigate SECTION]";

#[derive(Debug, Default)]
struct CliOptions {
    content: Option<String>,
    headless: bool,
    summary_only: bool,
    script: SessionScript,
}

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value\n{USAGE}"))
            };
            match arg.as_str() {
                "--headless" => options.headless = true,
                "--summary-only" => options.summary_only = true,
                "--toggle-menu" => options.script.toggle_menu = true,
                "--content" => options.content = Some(value("--content")?),
                "--size" => options.script.size = parse_size(&value("--size")?)?,
                "--resize" => {
                    let size = parse_size(&value("--resize")?)?;
                    options.script.resizes.push(size);
                }
                "--frames" => {
                    let raw = value("--frames")?;
                    options.script.frames = raw
                        .parse()
                        .with_context(|| format!("invalid frame count {raw:?}"))?;
                }
                "--scroll" => {
                    let raw = value("--scroll")?;
                    let offset = raw
                        .parse()
                        .with_context(|| format!("invalid scroll offset {raw:?}"))?;
                    options.script.scrolls.push(offset);
                }
                "--navigate" => options.script.navigate = Some(value("--navigate")?),
                "--help" | "-h" => bail!("{USAGE}"),
                other => bail!("Unknown argument: {other}\n{USAGE}"),
            }
        }
        Ok(options)
    }
}

fn parse_size(text: &str) -> Result<(u32, u32)> {
    let (width, height) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got {text:?}"))?;
    let width = width
        .trim()
        .parse()
        .with_context(|| format!("invalid width in {text:?}"))?;
    let height = height
        .trim()
        .parse()
        .with_context(|| format!("invalid height in {text:?}"))?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn repeated_flags_accumulate() {
        let options = parse(&[
            "--headless",
            "--resize",
            "1024x768",
            "--resize",
            "0x0",
            "--scroll",
            "25",
            "--navigate",
            "projects",
        ])
        .unwrap();
        assert!(options.headless);
        assert_eq!(options.script.resizes, vec![(1024, 768), (0, 0)]);
        assert_eq!(options.script.scrolls, vec![25.0]);
        assert_eq!(options.script.navigate.as_deref(), Some("projects"));
        assert_eq!(options.script.size, (800, 600));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(parse(&["--size", "800"]).is_err());
        assert!(parse(&["--frames"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
    }

    #[test]
    fn digits_map_to_sections() {
        assert_eq!(section_for_digit("1"), Some(Section::About));
        assert_eq!(section_for_digit("6"), Some(Section::Connect));
        assert_eq!(section_for_digit("0"), None);
        assert_eq!(section_for_digit("7"), None);
    }
}
