//! In-process page session: the hero mount, the navigation controller and a
//! virtual page driven by a [`QueuedScheduler`] and a [`SignalHub`].
//!
//! The native binary drives one of these from winit events; the headless
//! mode and the integration tests drive it from a script.

use std::rc::Rc;

use anyhow::{Context, Result};
use log::info;

use crate::config::{HeroConfig, NavConfig, RendererOptions};
use crate::content::SiteContent;
use crate::error::{NavError, RenderError};
use crate::hero::{HeroMount, HeroScene};
use crate::host::queued::{HeadlessRegion, QueuedScheduler, SignalHub};
use crate::host::{HostRegion, HostServices, ViewportEvent, ViewportSignals};
use crate::nav::{NavigationController, ScrollBehavior, Section, SectionRegistry, ViewportState};
use crate::render::{HeadlessRenderer, RenderStats, Renderer};
use crate::reveal::RevealTracker;
use crate::scroll::{PageAnchor, PageScroller};

/// Frame interval used when no real display clock is available.
pub const FRAME_MS: f64 = 1000.0 / 60.0;

pub struct PageSession<H, R>
where
    H: HostRegion,
    R: Renderer<Surface = H::Surface>,
{
    scheduler: Rc<QueuedScheduler>,
    hub: Rc<SignalHub>,
    scroller: Rc<PageScroller>,
    services: HostServices,
    region: Rc<H>,
    nav: NavigationController<PageAnchor>,
    hero: HeroMount<H, R>,
    hero_config: HeroConfig,
    reveal: RevealTracker,
    clock_ms: f64,
}

impl<H, R> PageSession<H, R>
where
    H: HostRegion + 'static,
    R: Renderer<Surface = H::Surface> + 'static,
{
    pub fn new(
        region: Rc<H>,
        width: u32,
        height: u32,
        hero_config: HeroConfig,
        nav_config: NavConfig,
    ) -> Self {
        let scheduler = Rc::new(QueuedScheduler::new());
        let hub = Rc::new(SignalHub::new(width, height));
        let services = HostServices::new(scheduler.clone(), hub.clone());
        let scroller = Rc::new(PageScroller::new(
            Rc::clone(&hub),
            nav_config.smooth_scroll_ms,
        ));
        let registry = SectionRegistry::new(PageAnchor::for_all(&scroller));
        let mut nav = NavigationController::new(registry, nav_config);
        nav.attach(hub.as_ref());

        Self {
            scheduler,
            hub,
            scroller,
            services,
            region,
            nav,
            hero: HeroMount::new(),
            hero_config,
            reveal: RevealTracker::new(),
            clock_ms: 0.0,
        }
    }

    /// Mounts the hero; returns whether a scene is live afterwards.
    pub fn mount_hero<F>(&mut self, create: F) -> bool
    where
        F: FnOnce(u32, u32, &RendererOptions) -> Result<R, RenderError>,
    {
        self.hero.mount(
            Rc::clone(&self.region),
            &self.services,
            &self.hero_config,
            create,
        )
    }

    pub fn unmount_hero(&mut self) {
        self.hero.unmount();
    }

    /// Runs one display refresh: advances any smooth scroll, then the frame
    /// callbacks. Returns the number of callbacks that ran.
    pub fn frame(&mut self, dt_ms: f64) -> usize {
        self.clock_ms += dt_ms;
        self.scroller.advance(dt_ms);
        let ran = self.scheduler.run_frame(self.clock_ms);
        self.observe_reveal();
        ran
    }

    /// Applies a new viewport size and emits a resize event.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.hub.resize(width, height);
        self.observe_reveal();
    }

    /// Jumps the page to `offset`, clamped to the page height.
    pub fn scroll_to(&mut self, offset: f64) {
        self.scroller.scroll_to(offset, ScrollBehavior::Instant);
        self.observe_reveal();
    }

    pub fn scroll_by(&mut self, delta: f64) {
        self.scroll_to(self.scroller.offset() + delta);
    }

    pub fn toggle_menu(&self) -> bool {
        self.nav.toggle_menu()
    }

    pub fn navigate(&self, section: Section) -> Result<(), NavError> {
        self.nav.navigate_to(section)
    }

    pub fn navigate_by_name(&self, name: &str) -> Result<Section, NavError> {
        self.nav.navigate_by_name(name)
    }

    /// Runs frames until the current smooth scroll has landed; returns how
    /// many were needed.
    pub fn settle_scroll(&mut self) -> u32 {
        let mut frames = 0;
        while self.scroller.is_animating() {
            self.frame(FRAME_MS);
            frames += 1;
        }
        frames
    }

    fn observe_reveal(&mut self) {
        let layout = self.scroller.layout();
        self.reveal.observe_page(&layout, self.scroller.offset());
    }

    pub fn nav_state(&self) -> ViewportState {
        self.nav.state()
    }

    pub fn hero(&self) -> Option<&HeroScene<H, R>> {
        self.hero.scene()
    }

    pub fn is_hero_live(&self) -> bool {
        self.hero.is_live()
    }

    pub fn region(&self) -> &Rc<H> {
        &self.region
    }

    pub fn pending_frames(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn resize_listeners(&self) -> usize {
        self.hub.listener_count(ViewportEvent::Resize)
    }

    pub fn scroll_offset(&self) -> f64 {
        self.hub.reading().scroll_y
    }

    pub fn smooth_scroll_requests(&self) -> u32 {
        self.scroller.smooth_requests()
    }

    pub fn is_scrolling(&self) -> bool {
        self.scroller.is_animating()
    }

    pub fn revealed(&self) -> Vec<Section> {
        self.reveal.revealed().collect()
    }
}

pub type HeadlessSession = PageSession<HeadlessRegion, HeadlessRenderer>;

impl PageSession<HeadlessRegion, HeadlessRenderer> {
    pub fn headless(width: u32, height: u32, hero: HeroConfig, nav: NavConfig) -> Self {
        Self::new(
            Rc::new(HeadlessRegion::new(width, height)),
            width,
            height,
            hero,
            nav,
        )
    }

    /// Mounts the hero with a [`HeadlessRenderer`] and returns its counters.
    pub fn mount_headless_hero(&mut self) -> Option<Rc<RenderStats>> {
        let mut stats = None;
        let live = self.mount_hero(|width, height, options| {
            let renderer = HeadlessRenderer::new(width, height, *options);
            stats = Some(renderer.stats());
            Ok(renderer)
        });
        if live {
            stats
        } else {
            None
        }
    }

    /// Resizes the region together with the viewport, the way a full-window
    /// hero follows the browser window.
    pub fn resize_window(&mut self, width: u32, height: u32) {
        self.region.set_size(width, height);
        self.resize(width, height);
    }
}

/// Steps of a scripted headless run.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionScript {
    pub size: (u32, u32),
    pub frames: u32,
    pub resizes: Vec<(u32, u32)>,
    pub scrolls: Vec<f64>,
    pub toggle_menu: bool,
    pub navigate: Option<String>,
}

impl Default for SessionScript {
    fn default() -> Self {
        Self {
            size: (800, 600),
            frames: 3,
            resizes: Vec::new(),
            scrolls: Vec::new(),
            toggle_menu: false,
            navigate: None,
        }
    }
}

pub fn print_content_summary(content: &SiteContent) {
    println!(
        "Loaded content for {}: {} project(s), {} skill(s), {} education entr{}, {} position(s), {} contact(s)",
        content.profile.name,
        content.projects.len(),
        content.section_items(Section::Skills),
        content.education.len(),
        if content.education.len() == 1 { "y" } else { "ies" },
        content.experience.len(),
        content.contacts.len(),
    );
}

pub fn print_final_state(state: ViewportState) {
    println!(
        "Viewport state: scrolled={} menu_open={}",
        state.scrolled, state.menu_open
    );
}

fn section_list(sections: &[Section]) -> String {
    if sections.is_empty() {
        return "none".to_string();
    }
    sections
        .iter()
        .map(|section| section.title())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Runs `script` against a headless page and prints each lifecycle step.
pub fn run_headless(script: &SessionScript, hero: HeroConfig, nav: NavConfig) -> Result<()> {
    let (width, height) = script.size;
    let mut session = HeadlessSession::headless(width, height, hero, nav);

    let stats = session.mount_headless_hero();
    match (&stats, session.hero().and_then(|hero| hero.renderer_size())) {
        (Some(_), Some((width, height))) => println!("Hero mounted at {width}x{height}"),
        _ => println!("Hero unavailable; continuing without animation"),
    }

    for _ in 0..script.frames {
        session.frame(FRAME_MS);
    }

    for &(width, height) in &script.resizes {
        session.resize_window(width, height);
        session.frame(FRAME_MS);
        if let Some(hero) = session.hero() {
            let (width, height) = hero.renderer_size().unwrap_or_default();
            let aspect = hero.camera_aspect().unwrap_or_default();
            println!("Resized to {width}x{height} (aspect {aspect:.3})");
        }
    }

    for &offset in &script.scrolls {
        session.scroll_to(offset);
        println!(
            "Scrolled to {:.0}: scrolled={}",
            session.scroll_offset(),
            session.nav_state().scrolled
        );
    }

    if script.toggle_menu {
        let open = session.toggle_menu();
        println!("Menu open: {open}");
    }

    if let Some(name) = &script.navigate {
        let section = session
            .navigate_by_name(name)
            .with_context(|| format!("cannot navigate to {name:?}"))?;
        let steps = session.settle_scroll();
        println!(
            "Navigated to {section} (offset {:.0} after {steps} frame(s))",
            session.scroll_offset()
        );
    }

    if let Some(stats) = &stats {
        println!("Rendered {} frame(s)", stats.frames());
    }
    println!("Revealed sections: {}", section_list(&session.revealed()));

    session.unmount_hero();
    println!(
        "Hero unmounted; outstanding frames: {}, surfaces: {}",
        session.pending_frames(),
        session.region().surface_count()
    );
    info!("headless session finished");
    print_final_state(session.nav_state());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> HeadlessSession {
        HeadlessSession::headless(800, 600, HeroConfig::default(), NavConfig::default())
    }

    #[test]
    fn smooth_navigation_lands_on_the_anchor() {
        let mut session = session();
        session.toggle_menu();
        session.navigate(Section::Skills).unwrap();
        assert!(!session.nav_state().menu_open);
        assert!(session.is_scrolling());
        let frames = session.settle_scroll();
        assert!(frames >= 36);
        assert_eq!(session.scroll_offset(), 1800.0);
        assert!(session.nav_state().scrolled);
        assert!(session.revealed().contains(&Section::Skills));
    }

    #[test]
    fn scroll_is_clamped_to_the_page() {
        let mut session = session();
        session.scroll_by(-50.0);
        assert_eq!(session.scroll_offset(), 0.0);
        session.scroll_to(1.0e9);
        assert_eq!(session.scroll_offset(), 3600.0);
    }

    #[test]
    fn hero_frames_only_run_while_mounted() {
        let mut session = session();
        let stats = session.mount_headless_hero().unwrap();
        assert_eq!(session.frame(FRAME_MS), 1);
        assert_eq!(session.frame(FRAME_MS), 1);
        session.unmount_hero();
        assert_eq!(session.frame(FRAME_MS), 0);
        assert_eq!(stats.frames(), 2);
        assert_eq!(session.resize_listeners(), 0);
    }

    #[test]
    fn section_list_reads_naturally() {
        assert_eq!(section_list(&[]), "none");
        assert_eq!(
            section_list(&[Section::About, Section::Connect]),
            "About, Connect"
        );
    }
}
